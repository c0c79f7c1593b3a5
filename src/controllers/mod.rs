//! Маршруты локального callback-сервера.
//!
//! Браузер возвращается сюда после OAuth-входа и после платежного виджета.
//! Каждый маршрут отдает одно событие в заранее зарегистрированный канал.

pub mod checkout;
pub mod oauth;

use axum::Router;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::warn;

use crate::booking::WidgetEvent;
use crate::models::order::WidgetOptions;

/// Итог OAuth-редиректа: токен или текст ошибки провайдера.
pub type OAuthResult = Result<String, String>;

/// Ожидающие события callback-сервера.
#[derive(Default)]
pub struct CallbackState {
    oauth: Mutex<Option<oneshot::Sender<OAuthResult>>>,
    payment: Mutex<Option<(WidgetOptions, oneshot::Sender<WidgetEvent>)>>,
}

impl CallbackState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Регистрирует ожидание токена. Предыдущее ожидание отменяется.
    pub async fn expect_oauth(&self) -> oneshot::Receiver<OAuthResult> {
        let (tx, rx) = oneshot::channel();
        if self.oauth.lock().await.replace(tx).is_some() {
            warn!("Replacing a pending OAuth callback");
        }
        rx
    }

    /// Регистрирует платеж, который покажет `/checkout`.
    pub async fn expect_payment(&self, options: WidgetOptions) -> oneshot::Receiver<WidgetEvent> {
        let (tx, rx) = oneshot::channel();
        if self.payment.lock().await.replace((options, tx)).is_some() {
            warn!("Replacing a pending payment widget");
        }
        rx
    }

    pub(crate) async fn pending_checkout(&self) -> Option<WidgetOptions> {
        self.payment.lock().await.as_ref().map(|(options, _)| options.clone())
    }

    pub(crate) async fn deliver_oauth(&self, result: OAuthResult) -> bool {
        match self.oauth.lock().await.take() {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }

    pub(crate) async fn deliver_payment(&self, event: WidgetEvent) -> bool {
        match self.payment.lock().await.take() {
            Some((_, tx)) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

pub fn routes() -> Router<Arc<CallbackState>> {
    Router::new()
        .merge(oauth::routes())
        .merge(checkout::routes())
}

/// Простая страница-ответ для браузера.
pub(crate) fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body style=\"font-family:sans-serif;background:#09090b;color:#fff;text-align:center;padding-top:15vh\">\
         <h2>{title}</h2><p>{body}</p></body></html>"
    )
}
