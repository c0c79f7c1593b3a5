use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::CallbackConfig;
use crate::controllers::{self, CallbackState};
use crate::error::{AppError, AppResult};

/// Локальный HTTP-сервер для возвратов из браузера (OAuth, оплата).
pub struct CallbackServer {
    addr: SocketAddr,
    state: Arc<CallbackState>,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
    wait_timeout: Duration,
}

impl CallbackServer {
    pub async fn start(config: &CallbackConfig) -> AppResult<Self> {
        let state = CallbackState::new();
        let app = Router::new()
            .route("/health", get(|| async { "OK" }))
            .merge(controllers::routes())
            .with_state(state.clone())
            .layer(TraceLayer::new_for_http());

        let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();

        let signal = shutdown.clone();
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(async move { signal.cancelled().await })
                .await;
            if let Err(e) = result {
                error!("Callback server failed: {}", e);
            }
        });

        info!("Callback server listening on {}", addr);
        Ok(Self {
            addr,
            state,
            shutdown,
            handle,
            wait_timeout: Duration::from_secs(config.wait_timeout_seconds),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn state(&self) -> Arc<CallbackState> {
        self.state.clone()
    }

    /// Ждет событие не дольше `callback.wait_timeout_seconds`.
    pub async fn wait<T>(&self, rx: oneshot::Receiver<T>) -> AppResult<T> {
        match tokio::time::timeout(self.wait_timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(AppError::Validation("Callback was cancelled".to_string())),
            Err(_) => Err(AppError::Validation(format!(
                "No response from browser within {}s",
                self.wait_timeout.as_secs()
            ))),
        }
    }

    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.handle.await {
            error!("Callback server task panicked: {}", e);
        }
        info!("Callback server stopped");
    }
}
