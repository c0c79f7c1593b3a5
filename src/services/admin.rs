use reqwest::Method;
use secrecy::SecretString;
use tracing::info;

use super::ApiClient;
use crate::error::AppResult;
use crate::models::song::TicketCodeRequest;
use crate::models::TicketVerification;

impl ApiClient {
    /// Проверка билета на входе (только для администратора).
    pub async fn verify_ticket(&self, token: &SecretString, ticket_code: &str) -> AppResult<TicketVerification> {
        info!("Verifying ticket {}", ticket_code);
        let body = TicketCodeRequest { ticket_code };
        self.send_json(self.request(Method::POST, "/api/admin/verify-ticket", Some(token)).json(&body))
            .await
    }

    pub async fn mark_ticket_used(&self, token: &SecretString, ticket_code: &str) -> AppResult<TicketVerification> {
        info!("Marking ticket {} as used", ticket_code);
        let body = TicketCodeRequest { ticket_code };
        self.send_json(self.request(Method::POST, "/api/admin/mark-ticket-used", Some(token)).json(&body))
            .await
    }
}
