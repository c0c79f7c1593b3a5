use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::null_as_default;
use crate::error::{AppError, PaymentError};

/// Строка заказа: сколько билетов какого типа и по какой цене.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDetail {
    pub ticket_type: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// Тело `POST /api/payments/create-order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    /// Подытог + 18% налога
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub concert_name: String,
    pub ticket_count: u32,
    pub concert_id: String,
    pub ticket_details: Vec<TicketDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prefill {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateOrderResponse {
    pub success: bool,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, rename = "key_id")]
    pub key_id: Option<String>,
    #[serde(default)]
    pub prefill: Option<Prefill>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Непрозрачный дескриптор заказа у платежного провайдера.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderHandle {
    pub order_id: String,
    /// В пайсах
    pub amount_minor: i64,
    pub currency: String,
    pub key_id: String,
    pub prefill: Prefill,
}

impl TryFrom<CreateOrderResponse> for OrderHandle {
    type Error = AppError;

    fn try_from(response: CreateOrderResponse) -> Result<Self, Self::Error> {
        if !response.success {
            let message = response
                .message
                .unwrap_or_else(|| "Failed to create order".to_string());
            return Err(PaymentError::OrderCreation(message).into());
        }

        let missing = |field: &str| AppError::InvalidResponse(format!("create-order response missing {}", field));
        Ok(OrderHandle {
            order_id: response.order_id.ok_or_else(|| missing("orderId"))?,
            amount_minor: response.amount.ok_or_else(|| missing("amount"))?,
            currency: response.currency.ok_or_else(|| missing("currency"))?,
            key_id: response.key_id.ok_or_else(|| missing("key_id"))?,
            prefill: response.prefill.unwrap_or_default(),
        })
    }
}

/// Параметры, с которыми открывается платежный виджет.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetOptions {
    pub key: String,
    pub amount: i64,
    pub currency: String,
    pub name: String,
    pub description: String,
    pub order_id: String,
    pub prefill: Prefill,
}

pub const MERCHANT_NAME: &str = "Veritas VI";

impl WidgetOptions {
    pub fn new(handle: &OrderHandle, concert_name: &str) -> Self {
        WidgetOptions {
            key: handle.key_id.clone(),
            amount: handle.amount_minor,
            currency: handle.currency.clone(),
            name: MERCHANT_NAME.to_string(),
            description: format!("Tickets for {}", concert_name),
            order_id: handle.order_id.clone(),
            prefill: handle.prefill.clone(),
        }
    }
}

/// Тело `POST /api/payments/verify`: поля провайдера + исходный контекст заказа.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VerifyPaymentRequest<'a> {
    pub order_id: &'a str,
    pub payment_id: &'a str,
    pub signature: &'a str,
    pub concert_id: &'a str,
    pub concert_name: &'a str,
    pub email: &'a str,
    pub name: &'a str,
    pub phone: &'a str,
    pub ticket_count: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub ticket_details: &'a [TicketDetail],
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VerifyPaymentResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Выпущенный билет.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedTicket {
    pub code: String,
    #[serde(rename = "type")]
    pub ticket_type: String,
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// Ответ `GET /api/payments/order/{orderId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub order_id: String,
    pub concert_name: String,
    pub amount: Decimal,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tickets: Vec<IssuedTicket>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_create_order_maps_to_payment_error() {
        let response: CreateOrderResponse =
            serde_json::from_str(r#"{"success":false,"message":"Razorpay down"}"#).unwrap();
        let err = OrderHandle::try_from(response).unwrap_err();
        assert!(matches!(
            err,
            AppError::Payment(PaymentError::OrderCreation(ref m)) if m == "Razorpay down"
        ));
    }

    #[test]
    fn successful_create_order_without_order_id_fails_fast() {
        let response: CreateOrderResponse =
            serde_json::from_str(r#"{"success":true,"amount":295000,"currency":"INR","key_id":"rzp"}"#)
                .unwrap();
        assert!(matches!(
            OrderHandle::try_from(response),
            Err(AppError::InvalidResponse(_))
        ));
    }

    #[test]
    fn widget_options_use_merchant_branding() {
        let handle = OrderHandle {
            order_id: "order_1".into(),
            amount_minor: 295000,
            currency: "INR".into(),
            key_id: "rzp_test".into(),
            prefill: Prefill::default(),
        };
        let options = WidgetOptions::new(&handle, "Sunburn");
        assert_eq!(options.name, "Veritas VI");
        assert_eq!(options.description, "Tickets for Sunburn");
        assert_eq!(options.amount, 295000);
    }

    #[test]
    fn order_details_accept_null_user_fields() {
        let details: OrderDetails = serde_json::from_str(
            r#"{"orderId":"order_1","concertName":"Sunburn","amount":2950.0,
                "userEmail":null,"userName":"Asha",
                "tickets":[{"code":"TCK-1","type":"VIP","price":1500.0}]}"#,
        )
        .unwrap();
        assert_eq!(details.tickets[0].ticket_type, "VIP");
        assert_eq!(details.user_email, None);
        assert_eq!(details.amount, Decimal::new(2950, 0));
    }
}
