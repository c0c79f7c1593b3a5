use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use super::{page, CallbackState};
use crate::booking::{PaymentConfirmation, PaymentWidget, WidgetEvent};
use crate::error::PaymentError;
use crate::models::order::WidgetOptions;

pub fn routes() -> Router<Arc<CallbackState>> {
    Router::new()
        .route("/checkout", get(checkout_page))
        .route("/checkout/complete", post(complete))
        .route("/checkout/dismiss", post(dismiss))
}

const CHECKOUT_TEMPLATE: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Veritas checkout</title></head>
<body style="font-family:sans-serif;background:#09090b;color:#fff;text-align:center;padding-top:15vh">
<p>Opening secure payment...</p>
<script src="https://checkout.razorpay.com/v1/checkout.js"></script>
<script>
const options = __OPTIONS__;
function send(path, data) {
  const form = document.createElement('form');
  form.method = 'POST';
  form.action = path;
  for (const key in data) {
    const input = document.createElement('input');
    input.type = 'hidden';
    input.name = key;
    input.value = data[key];
    form.appendChild(input);
  }
  document.body.appendChild(form);
  form.submit();
}
options.handler = function (response) { send('/checkout/complete', response); };
options.modal = { ondismiss: function () { send('/checkout/dismiss', {}); }, escape: false, backdropclose: false };
options.theme = { color: '#6366f1' };
new Razorpay(options).open();
</script>
</body>
</html>"#;

/// Страница, которая открывает виджет провайдера с параметрами заказа.
pub fn render_checkout(options: &WidgetOptions) -> Result<String, serde_json::Error> {
    // `<` экранируем, чтобы строка из заказа не закрыла тег script
    let json = serde_json::to_string(options)?.replace('<', "\\u003c");
    Ok(CHECKOUT_TEMPLATE.replace("__OPTIONS__", &json))
}

// GET /checkout
async fn checkout_page(State(state): State<Arc<CallbackState>>) -> impl IntoResponse {
    let Some(options) = state.pending_checkout().await else {
        return (
            StatusCode::NOT_FOUND,
            Html(page("No payment pending", "Start checkout from the terminal first.")),
        );
    };

    match render_checkout(&options) {
        Ok(html) => (StatusCode::OK, Html(html)),
        Err(e) => {
            error!("Failed to render checkout page: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(page("Checkout unavailable", "Failed to initialize payment. Please try again.")),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompleteForm {
    razorpay_order_id: String,
    razorpay_payment_id: String,
    razorpay_signature: String,
}

// POST /checkout/complete
async fn complete(
    State(state): State<Arc<CallbackState>>,
    Form(form): Form<CompleteForm>,
) -> impl IntoResponse {
    let event = WidgetEvent::Completed(PaymentConfirmation {
        order_id: form.razorpay_order_id,
        payment_id: form.razorpay_payment_id,
        signature: form.razorpay_signature,
    });

    if state.deliver_payment(event).await {
        info!("Payment widget completed");
        (
            StatusCode::OK,
            Html(page("Verifying payment...", "You can close this window and return to the terminal.")),
        )
    } else {
        warn!("Payment completion arrived with nobody waiting");
        (StatusCode::CONFLICT, Html(page("No payment pending", "")))
    }
}

// POST /checkout/dismiss
async fn dismiss(State(state): State<Arc<CallbackState>>) -> impl IntoResponse {
    if state.deliver_payment(WidgetEvent::Dismissed).await {
        info!("Payment modal dismissed");
    }
    Html(page("Payment cancelled", "Payment cancelled. Please try again."))
}

/// Виджет в браузере: регистрирует заказ на callback-сервере и сообщает адрес страницы оплаты.
pub struct BrowserPaymentWidget {
    state: Arc<CallbackState>,
    checkout_url: String,
    announce: Box<dyn Fn(&str) + Send + Sync>,
}

impl BrowserPaymentWidget {
    pub fn new(
        state: Arc<CallbackState>,
        checkout_url: impl Into<String>,
        announce: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        Self {
            state,
            checkout_url: checkout_url.into(),
            announce: Box::new(announce),
        }
    }
}

impl PaymentWidget for BrowserPaymentWidget {
    fn open(
        &self,
        options: WidgetOptions,
    ) -> impl Future<Output = Result<oneshot::Receiver<WidgetEvent>, PaymentError>> + Send {
        async move {
            if options.key.trim().is_empty() {
                return Err(PaymentError::Widget("payment key missing".to_string()));
            }
            info!("Opening payment widget for order {}", options.order_id);
            let events = self.state.expect_payment(options).await;
            (self.announce)(&self.checkout_url);
            Ok(events)
        }
    }
}
