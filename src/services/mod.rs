//! HTTP-клиент бэкенда.
//!
//! `ApiClient` один на процесс. Эндпоинты разложены по файлам (`auth`, `concerts`, `tickets`,
//! `payment`, `charts`, `matching`, `admin`), каждый добавляет свой `impl ApiClient`.
//! Здесь только общая часть: сборка запроса, bearer-токен, разбор ответа и маппинг ошибок.
//! Повторов нет: любая сетевая ошибка сразу уходит пользователю.

mod admin;
mod auth;
mod charts;
mod concerts;
mod matching;
mod payment;
mod tickets;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::{AppError, AppResult};

pub const TIMEZONE_HEADER: &str = "X-Timezone-Offset";

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http_client: reqwest::Client,
    timezone_offset_minutes: i32,
}

impl ApiClient {
    pub fn from_config(config: &ApiConfig) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client,
            timezone_offset_minutes: config.timezone_offset_minutes,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timezone_offset_minutes(&self) -> i32 {
        self.timezone_offset_minutes
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Запрос с необязательным bearer-токеном.
    fn request(&self, method: Method, path: &str, token: Option<&SecretString>) -> RequestBuilder {
        let builder = self.http_client.request(method, self.url(path));
        match token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    fn with_timezone(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(TIMEZONE_HEADER, self.timezone_offset_minutes.to_string())
    }

    /// Отправляет запрос и декодирует JSON-ответ в строгую схему.
    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> AppResult<T> {
        let response = Self::check(builder.send().await?).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!("Response did not match expected schema: {}", e);
            AppError::InvalidResponse(e.to_string())
        })
    }

    /// Отправляет запрос, тело ответа игнорируется.
    async fn send_empty(&self, builder: RequestBuilder) -> AppResult<()> {
        Self::check(builder.send().await?).await?;
        Ok(())
    }

    /// 401 превращается в `Unauthorized`, остальные не-2xx в `Api` с текстом от сервера.
    async fn check(response: Response) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        debug!("Backend responded with {} for {}", status, response.url());
        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        Err(AppError::Api {
            status: status.as_u16(),
            message: error_message(status, &body),
        })
    }
}

/// Достает человекочитаемое сообщение из тела ошибки (`message`, `error` или сырой текст).
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(msg) = json.get(key).and_then(|v| v.as_str()) {
                if !msg.is_empty() {
                    return msg.to_string();
                }
            }
        }
    }

    let body = body.trim();
    if body.is_empty() {
        format!("Request failed with status {}", status.as_u16())
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_json_fields() {
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, r#"{"error":"Ticket code is required"}"#),
            "Ticket code is required"
        );
        assert_eq!(
            error_message(StatusCode::CONFLICT, r#"{"message":"Email already exists","error":"x"}"#),
            "Email already exists"
        );
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "upstream down"), "upstream down");
        assert_eq!(
            error_message(StatusCode::INTERNAL_SERVER_ERROR, ""),
            "Request failed with status 500"
        );
    }
}
