//! payment.rs
//!
//! Платёжная часть API бэкенда. Сам платёж проводит внешний провайдер (Razorpay),
//! бэкенд только создаёт заказ и проверяет подпись.
//!
//! Ключевые вызовы:
//! 1.  **create_order**: Создаёт заказ у провайдера и возвращает непрозрачный `OrderHandle`
//!     (id заказа, сумма в пайсах, валюта, публичный ключ, prefill покупателя).
//! 2.  **verify_payment**: Отправляет поля провайдера (order id, payment id, подпись)
//!     вместе с исходным контекстом заказа. Невалидная подпись приходит как 400 с
//!     `{"success": false}` и превращается в `PaymentError::VerificationFailed`.
//! 3.  **order_details**: Данные для страницы подтверждения и PDF с билетами.

use reqwest::{Method, StatusCode};
use secrecy::SecretString;
use tracing::{error, info};

use super::ApiClient;
use crate::error::{AppError, AppResult, PaymentError};
use crate::models::order::{
    CreateOrderResponse, OrderDetails, OrderHandle, OrderRequest, VerifyPaymentRequest,
    VerifyPaymentResponse,
};

impl ApiClient {
    /// Создаёт заказ. Неуспех от сервера - `PaymentError::OrderCreation`.
    pub async fn create_order(&self, token: &SecretString, order: &OrderRequest) -> AppResult<OrderHandle> {
        info!(
            "Creating order: concert={}, tickets={}, amount={}",
            order.concert_id, order.ticket_count, order.amount
        );

        let builder = self
            .request(Method::POST, "/api/payments/create-order", Some(token))
            .json(order);
        let response: CreateOrderResponse = match self.send_json(builder).await {
            Ok(response) => response,
            // 401 должен дойти до обработчика сессии без изменений
            Err(AppError::Unauthorized) => return Err(AppError::Unauthorized),
            Err(AppError::Api { message, .. }) => {
                error!("Order creation rejected: {}", message);
                return Err(PaymentError::OrderCreation(message).into());
            }
            Err(e) => return Err(e),
        };

        let handle = OrderHandle::try_from(response)?;
        info!("Order created: order_id={}, amount_minor={}", handle.order_id, handle.amount_minor);
        Ok(handle)
    }

    /// Проверка подписи платежа на бэкенде.
    pub(crate) async fn verify_payment(
        &self,
        token: &SecretString,
        request: &VerifyPaymentRequest<'_>,
    ) -> AppResult<()> {
        info!("Verifying payment: order_id={}, payment_id={}", request.order_id, request.payment_id);

        let builder = self
            .request(Method::POST, "/api/payments/verify", Some(token))
            .json(request);
        let response: VerifyPaymentResponse = match self.send_json(builder).await {
            Ok(response) => response,
            Err(AppError::Api { status, message }) if status == StatusCode::BAD_REQUEST.as_u16() => {
                VerifyPaymentResponse {
                    success: false,
                    message: Some(message),
                }
            }
            Err(e) => return Err(e),
        };

        if response.success {
            info!("✅ Payment verified: order_id={}", request.order_id);
            Ok(())
        } else {
            let message = response
                .message
                .unwrap_or_else(|| "Invalid payment signature".to_string());
            error!("Payment verification failed for {}: {}", request.order_id, message);
            Err(PaymentError::VerificationFailed(message).into())
        }
    }

    pub async fn order_details(&self, token: &SecretString, order_id: &str) -> AppResult<OrderDetails> {
        let path = format!("/api/payments/order/{}", order_id);
        self.send_json(self.request(Method::GET, &path, Some(token)))
            .await
    }
}
