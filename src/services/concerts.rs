use reqwest::Method;
use secrecy::SecretString;

use super::ApiClient;
use crate::error::AppResult;
use crate::models::concert::{Concert, ConcertPayload};

impl ApiClient {
    pub async fn list_concerts(&self, token: &SecretString) -> AppResult<Vec<Concert>> {
        self.send_json(self.request(Method::GET, "/api/concerts", Some(token)))
            .await
    }

    /// Токен не обязателен: страница бронирования открывается и анонимно.
    pub async fn get_concert(&self, id: &str, token: Option<&SecretString>) -> AppResult<Concert> {
        let path = format!("/api/concerts/{}", id);
        self.send_json(self.with_timezone(self.request(Method::GET, &path, token)))
            .await
    }

    pub async fn create_concert(&self, token: &SecretString, payload: &ConcertPayload) -> AppResult<Concert> {
        self.send_json(self.request(Method::POST, "/api/concerts", Some(token)).json(payload))
            .await
    }

    pub async fn update_concert(
        &self,
        token: &SecretString,
        id: &str,
        payload: &ConcertPayload,
    ) -> AppResult<Concert> {
        let path = format!("/api/concerts/{}", id);
        self.send_json(self.request(Method::PUT, &path, Some(token)).json(payload))
            .await
    }

    /// PUT без разбора ответа (обратная запись ссылки на билеты).
    pub async fn replace_concert(&self, token: &SecretString, id: &str, payload: &ConcertPayload) -> AppResult<()> {
        let path = format!("/api/concerts/{}", id);
        self.send_empty(self.request(Method::PUT, &path, Some(token)).json(payload))
            .await
    }

    pub async fn delete_concert(&self, token: &SecretString, id: &str) -> AppResult<()> {
        let path = format!("/api/concerts/{}", id);
        self.send_empty(self.request(Method::DELETE, &path, Some(token)))
            .await
    }
}
