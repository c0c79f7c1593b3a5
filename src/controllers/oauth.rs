use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::{page, CallbackState};
use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::server::CallbackServer;
use crate::AppState;

pub fn routes() -> Router<Arc<CallbackState>> {
    Router::new().route("/oauth-success", get(oauth_success))
}

#[derive(Debug, Deserialize)]
struct OAuthParams {
    token: Option<String>,
    error: Option<String>,
}

// GET /oauth-success?token=...
async fn oauth_success(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<OAuthParams>,
) -> impl IntoResponse {
    let result = match (params.token.filter(|t| !t.trim().is_empty()), params.error) {
        (Some(token), _) => Ok(token),
        (None, Some(error)) => Err(error),
        (None, None) => Err("No token received".to_string()),
    };
    let ok = result.is_ok();

    if !state.deliver_oauth(result).await {
        warn!("OAuth callback arrived with nobody waiting");
        return (
            StatusCode::CONFLICT,
            Html(page("Nothing to complete", "No sign-in is in progress.")),
        );
    }

    if ok {
        info!("OAuth token received");
        (
            StatusCode::OK,
            Html(page("Signed in", "You can close this window and return to the terminal.")),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Html(page("Authentication failed", "Please try again.")),
        )
    }
}

/// Вход через OAuth-провайдера: адрес авторизации отдается наружу, токен приходит на `/oauth-success`.
pub async fn sign_in_with_browser(
    app: &AppState,
    server: &CallbackServer,
    provider: &str,
    announce: impl FnOnce(&url::Url),
) -> AppResult<User> {
    let authorize_url = app.api.oauth_authorize_url(provider)?;
    let rx = server.state().expect_oauth().await;
    announce(&authorize_url);

    match server.wait(rx).await? {
        Ok(token) => app.session.login_with_oauth_token(&token).await,
        Err(reason) => {
            warn!("OAuth sign-in failed: {}", reason);
            Err(AppError::Validation("Authentication failed. Please try again.".to_string()))
        }
    }
}
