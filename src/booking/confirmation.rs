use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::middleware::authorized;
use crate::models::OrderDetails;
use crate::AppState;

pub const LOAD_FAILED: &str = "Failed to load booking details";

/// Загружает подтверждение заказа.
///
/// Id берется из аргумента, иначе из последнего успешного заказа. После успешной
/// загрузки запомненный id стирается, повторный показ требует явного id.
pub async fn load_confirmation(app: &AppState, order_id: Option<&str>) -> AppResult<OrderDetails> {
    let order_id = match order_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => id.to_string(),
        None => app
            .cache
            .last_order()
            .await
            .ok_or_else(|| AppError::Validation("No order ID found".to_string()))?,
    };

    if !app.session.is_authenticated().await {
        return Err(AppError::AuthenticationRequired);
    }

    let id = order_id.as_str();
    let details = authorized(&app.session, |token| async move {
        app.api.order_details(&token, id).await
    })
    .await
    .map_err(|e| {
        error!("{} for order {}: {}", LOAD_FAILED, id, e);
        e
    })?;

    app.cache.forget_last_order().await;
    info!(
        "Booking confirmation loaded: order={} tickets={}",
        details.order_id,
        details.tickets.len()
    );
    Ok(details)
}
