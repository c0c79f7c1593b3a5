use crate::cache::CacheService;
use crate::error::AppResult;
use crate::models::User;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

pub const TOKEN_KEY: &str = "token";
pub const USER_DATA_KEY: &str = "userData";

impl CacheService {
    /// Сохранить сессию: токен и профиль
    pub async fn save_session(&self, token: &SecretString, user: &User) -> AppResult<()> {
        self.db.set(TOKEN_KEY, token.expose_secret()).await?;
        self.save_user(user).await
    }

    pub async fn save_user(&self, user: &User) -> AppResult<()> {
        let json = serde_json::to_string(user)?;
        self.db.set(USER_DATA_KEY, &json).await?;
        Ok(())
    }

    pub async fn load_token(&self) -> AppResult<Option<SecretString>> {
        Ok(self
            .db
            .get(TOKEN_KEY)
            .await?
            .filter(|t| !t.is_empty())
            .map(SecretString::from))
    }

    /// Профиль из хранилища. Битый JSON считается отсутствием профиля
    pub async fn load_user(&self) -> AppResult<Option<User>> {
        let Some(raw) = self.db.get(USER_DATA_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                warn!("Stored userData is corrupted, ignoring: {}", e);
                Ok(None)
            }
        }
    }

    /// Удалить токен и профиль (logout, 401)
    pub async fn clear_session(&self) -> AppResult<()> {
        self.db.remove(TOKEN_KEY).await?;
        self.db.remove(USER_DATA_KEY).await?;
        info!("🧹 Stored session cleared");
        Ok(())
    }

    /// Корзины, последний заказ и адрес возврата (logout)
    pub async fn clear_session_scope(&self) -> AppResult<()> {
        self.session.clear().await?;
        Ok(())
    }
}
