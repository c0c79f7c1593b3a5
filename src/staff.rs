//! Проверка билетов на входе.

use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::middleware::{authorized, require_admin};
use crate::models::{TicketStatus, TicketVerification};
use crate::AppState;

pub const EMPTY_CODE: &str = "Please enter a ticket code";

/// Коды билетов печатаются заглавными (`VI-25X7-AB93`).
pub fn normalize_code(raw: &str) -> AppResult<String> {
    let code = raw.trim().to_uppercase();
    if code.is_empty() {
        return Err(AppError::Validation(EMPTY_CODE.to_string()));
    }
    Ok(code)
}

/// 400 от бэкенда это ответ "билет не прошел проверку", а не сбой.
pub async fn verify_ticket(app: &AppState, raw_code: &str) -> AppResult<TicketVerification> {
    let code = normalize_code(raw_code)?;
    require_admin(&app.session).await?;

    let code_ref = code.as_str();
    let result = authorized(&app.session, |token| async move {
        app.api.verify_ticket(&token, code_ref).await
    })
    .await;

    match result {
        Ok(verification) => {
            info!("Ticket {} is {:?}", code, verification.status);
            Ok(verification)
        }
        Err(AppError::Api { status: 400, message }) => {
            warn!("Ticket {} rejected: {}", code, message);
            Ok(TicketVerification {
                status: TicketStatus::Invalid,
                ticket_code: Some(code),
                concert_id: None,
                user_email: None,
                user_name: None,
                ticket_type: None,
                issued_at: None,
                message: Some(message),
            })
        }
        Err(e) => Err(e),
    }
}

/// Гасит билет. В ответе статус всегда `Used`, остальное сервер может не прислать.
pub async fn mark_ticket_used(app: &AppState, raw_code: &str) -> AppResult<TicketVerification> {
    let code = normalize_code(raw_code)?;
    require_admin(&app.session).await?;

    let code_ref = code.as_str();
    let mut verification = authorized(&app.session, |token| async move {
        app.api.mark_ticket_used(&token, code_ref).await
    })
    .await?;

    info!("✅ Ticket {} marked as used", code);
    verification.status = TicketStatus::Used;
    verification.ticket_code.get_or_insert(code);
    Ok(verification)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_trimmed_and_uppercased() {
        assert_eq!(normalize_code("  vi-25x7-ab93 ").unwrap(), "VI-25X7-AB93");
        assert_eq!(normalize_code("   ").unwrap_err().to_string(), EMPTY_CODE);
    }
}
