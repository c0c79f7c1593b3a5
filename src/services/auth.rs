use reqwest::Method;
use secrecy::SecretString;
use tracing::info;

use super::ApiClient;
use crate::error::{AppError, AppResult};
use crate::models::user::{
    AuthResponse, ForgotPasswordRequest, ResetPasswordRequest, SigninRequest, SignupRequest, User,
};

impl ApiClient {
    pub async fn sign_up(&self, full_name: &str, email: &str, password: &str) -> AppResult<AuthResponse> {
        info!("Signing up {}", email);
        let body = SignupRequest { full_name, email, password };
        self.send_json(self.request(Method::POST, "/api/auth/signup", None).json(&body))
            .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthResponse> {
        info!("Signing in {}", email);
        let body = SigninRequest { email, password };
        self.send_json(self.request(Method::POST, "/api/auth/signin", None).json(&body))
            .await
    }

    /// Профиль владельца токена.
    pub async fn current_user(&self, token: &SecretString) -> AppResult<User> {
        self.send_json(self.request(Method::GET, "/api/auth/me", Some(token)))
            .await
    }

    /// Отправляет OTP на почту. Ответ сервера - простой текст.
    pub async fn forgot_password(&self, email: &str) -> AppResult<()> {
        let body = ForgotPasswordRequest { email };
        self.send_empty(self.request(Method::POST, "/api/auth/forgot-password", None).json(&body))
            .await
    }

    pub async fn reset_password(&self, email: &str, otp: &str, new_password: &str) -> AppResult<()> {
        let body = ResetPasswordRequest { email, otp, new_password };
        self.send_empty(self.request(Method::POST, "/api/auth/reset-password", None).json(&body))
            .await
    }

    /// Адрес, на который нужно отправить браузер для входа через OAuth-провайдера.
    pub fn oauth_authorize_url(&self, provider: &str) -> AppResult<url::Url> {
        let mut url = url::Url::parse(self.base_url())
            .map_err(|e| AppError::Validation(format!("Invalid backend URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Validation("Backend URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["oauth2", "authorize", provider]);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::services::ApiClient;

    #[test]
    fn oauth_url_is_built_from_base() {
        let api = ApiClient::from_config(&Config::for_backend("http://localhost:8080").api).unwrap();
        assert_eq!(
            api.oauth_authorize_url("google").unwrap().as_str(),
            "http://localhost:8080/oauth2/authorize/google"
        );
    }
}
