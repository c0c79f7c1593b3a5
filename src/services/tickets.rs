use reqwest::{Method, StatusCode};
use secrecy::SecretString;

use super::ApiClient;
use crate::error::{AppError, AppResult};
use crate::models::ticket::{CreateTicketPageResponse, TicketPage, TicketPageRequest};

impl ApiClient {
    /// `POST /api/tickets`. Возвращает booking URL, если сервер его прислал.
    pub(crate) async fn create_ticket_page(
        &self,
        token: &SecretString,
        request: &TicketPageRequest,
    ) -> AppResult<Option<String>> {
        let builder = self.with_timezone(self.request(Method::POST, "/api/tickets", Some(token)).json(request));
        let response: CreateTicketPageResponse = self.send_json(builder).await?;
        Ok(response.booking_url.filter(|url| !url.trim().is_empty()))
    }

    pub async fn get_ticket_page(&self, uuid: &str, token: Option<&SecretString>) -> AppResult<TicketPage> {
        let path = format!("/api/tickets/{}", uuid);
        self.send_json(self.with_timezone(self.request(Method::GET, &path, token)))
            .await
    }

    /// Страница билетов концерта. 404 означает, что ее просто нет.
    pub async fn ticket_page_for_concert(
        &self,
        concert_id: &str,
        token: Option<&SecretString>,
    ) -> AppResult<Option<TicketPage>> {
        let path = format!("/api/tickets/concert/{}", concert_id);
        match self.send_json(self.with_timezone(self.request(Method::GET, &path, token))).await {
            Ok(page) => Ok(Some(page)),
            Err(AppError::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
