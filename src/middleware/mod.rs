use secrecy::SecretString;
use std::future::Future;
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::session::SessionManager;

/// Куда отправить пользователя, если guard не пропустил.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    SignIn,
    Home,
}

impl Redirect {
    pub fn path(&self) -> &'static str {
        match self {
            Redirect::SignIn => "/signin",
            Redirect::Home => "/",
        }
    }
}

/// Пользователь, прошедший guard, вместе с токеном для запросов.
pub struct AuthUser {
    pub user: User,
    pub token: SecretString,
}

/// Маршрут только для вошедших.
pub async fn require_auth(session: &SessionManager) -> AppResult<AuthUser> {
    match (session.current_user().await, session.token().await) {
        (Some(user), Some(token)) => Ok(AuthUser { user, token }),
        _ => Err(AppError::AuthenticationRequired),
    }
}

/// Маршрут только для администраторов.
pub async fn require_admin(session: &SessionManager) -> AppResult<AuthUser> {
    let auth = require_auth(session).await?;
    if !auth.user.is_admin() {
        warn!("{} tried to open an admin route", auth.user.email);
        return Err(AppError::Forbidden);
    }
    Ok(auth)
}

/// Куда уводит ошибка guard'а: без сессии на вход, без прав на главную.
pub fn redirect_for(error: &AppError) -> Option<Redirect> {
    match error {
        AppError::AuthenticationRequired | AppError::Unauthorized => Some(Redirect::SignIn),
        AppError::Forbidden => Some(Redirect::Home),
        _ => None,
    }
}

/// Выполняет авторизованный вызов. 401 от бэкенда стирает сессию и пробрасывается дальше.
pub async fn authorized<T, F, Fut>(session: &SessionManager, op: F) -> AppResult<T>
where
    F: FnOnce(SecretString) -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let token = session.token().await.ok_or(AppError::AuthenticationRequired)?;
    match op(token).await {
        Err(AppError::Unauthorized) => {
            session.handle_unauthorized().await;
            Err(AppError::Unauthorized)
        }
        other => other,
    }
}

/// Как `authorized`, но токен необязателен: публичные запросы идут без него.
/// 401 на запросе с токеном все равно сбрасывает сессию.
pub async fn with_optional_token<T, F, Fut>(session: &SessionManager, op: F) -> AppResult<T>
where
    F: FnOnce(Option<SecretString>) -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let token = session.token().await;
    let had_token = token.is_some();
    match op(token).await {
        Err(AppError::Unauthorized) if had_token => {
            session.handle_unauthorized().await;
            Err(AppError::Unauthorized)
        }
        other => other,
    }
}
