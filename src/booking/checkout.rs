//! Оформление заказа.
//!
//! Переходы описаны чистой функцией `CheckoutState::apply`. Драйвер `run_checkout`
//! выполняет сетевые шаги и кормит автомат событиями. Платежный виджет для автомата
//! просто источник одного события: `Completed` или `Dismissed`.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use super::page::BookingPage;
use super::pricing::OrderTotals;
use crate::error::{AppError, AppResult, PaymentError};
use crate::middleware::authorized;
use crate::models::order::{OrderHandle, VerifyPaymentRequest, WidgetOptions};
use crate::models::OrderRequest;
use crate::AppState;

pub const DEFAULT_BUYER_NAME: &str = "Concert Goer";
pub const ORDER_INIT_FAILED: &str = "Failed to initialize payment. Please try again.";
pub const PAYMENT_CANCELLED: &str = "Payment cancelled. Please try again.";
pub const VERIFICATION_FAILED: &str = "Payment verification failed. Please contact support.";
pub const NOT_ON_SALE: &str = "Tickets are not on sale yet";

/// Поля, которые провайдер возвращает после успешной оплаты.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    Completed(PaymentConfirmation),
    Dismissed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutEvent {
    OrderCreated(OrderHandle),
    OrderFailed(String),
    WidgetOpened,
    WidgetUnavailable(String),
    Widget(WidgetEvent),
    VerificationSucceeded,
    VerificationFailed(String),
    Retry,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutState {
    SelectingTickets,
    OrderCreated { handle: OrderHandle },
    AwaitingExternalPayment { handle: OrderHandle },
    Verifying { handle: OrderHandle, payment: PaymentConfirmation },
    Confirmed { order_id: String },
    Failed { message: String },
    Cancelled { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Illegal checkout transition: {event} while {state}")]
pub struct TransitionError {
    pub state: &'static str,
    pub event: &'static str,
}

impl CheckoutEvent {
    fn name(&self) -> &'static str {
        match self {
            CheckoutEvent::OrderCreated(_) => "OrderCreated",
            CheckoutEvent::OrderFailed(_) => "OrderFailed",
            CheckoutEvent::WidgetOpened => "WidgetOpened",
            CheckoutEvent::WidgetUnavailable(_) => "WidgetUnavailable",
            CheckoutEvent::Widget(WidgetEvent::Completed(_)) => "WidgetCompleted",
            CheckoutEvent::Widget(WidgetEvent::Dismissed) => "WidgetDismissed",
            CheckoutEvent::VerificationSucceeded => "VerificationSucceeded",
            CheckoutEvent::VerificationFailed(_) => "VerificationFailed",
            CheckoutEvent::Retry => "Retry",
        }
    }
}

impl CheckoutState {
    pub fn name(&self) -> &'static str {
        match self {
            CheckoutState::SelectingTickets => "SelectingTickets",
            CheckoutState::OrderCreated { .. } => "OrderCreated",
            CheckoutState::AwaitingExternalPayment { .. } => "AwaitingExternalPayment",
            CheckoutState::Verifying { .. } => "Verifying",
            CheckoutState::Confirmed { .. } => "Confirmed",
            CheckoutState::Failed { .. } => "Failed",
            CheckoutState::Cancelled { .. } => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CheckoutState::Confirmed { .. } | CheckoutState::Failed { .. } | CheckoutState::Cancelled { .. }
        )
    }

    /// Таблица переходов.
    pub fn apply(self, event: CheckoutEvent) -> Result<CheckoutState, TransitionError> {
        use CheckoutEvent as E;
        use CheckoutState as S;

        let illegal = TransitionError {
            state: self.name(),
            event: event.name(),
        };

        match (self, event) {
            (S::SelectingTickets, E::OrderCreated(handle)) => Ok(S::OrderCreated { handle }),
            (S::SelectingTickets, E::OrderFailed(_)) => Ok(S::Failed {
                message: ORDER_INIT_FAILED.to_string(),
            }),
            (S::OrderCreated { handle }, E::WidgetOpened) => Ok(S::AwaitingExternalPayment { handle }),
            (S::OrderCreated { .. }, E::WidgetUnavailable(_)) => Ok(S::Failed {
                message: ORDER_INIT_FAILED.to_string(),
            }),
            (S::AwaitingExternalPayment { handle }, E::Widget(WidgetEvent::Completed(payment))) => {
                Ok(S::Verifying { handle, payment })
            }
            (S::AwaitingExternalPayment { .. }, E::Widget(WidgetEvent::Dismissed)) => Ok(S::Cancelled {
                message: PAYMENT_CANCELLED.to_string(),
            }),
            (S::Verifying { payment, .. }, E::VerificationSucceeded) => Ok(S::Confirmed {
                order_id: payment.order_id,
            }),
            (S::Verifying { .. }, E::VerificationFailed(_)) => Ok(S::Failed {
                message: VERIFICATION_FAILED.to_string(),
            }),
            (S::Failed { .. } | S::Cancelled { .. }, E::Retry) => Ok(S::SelectingTickets),
            _ => Err(illegal),
        }
    }
}

/// Внешний платежный виджет. `open` показывает виджет и отдает канал,
/// в который придет ровно одно событие.
pub trait PaymentWidget {
    fn open(
        &self,
        options: WidgetOptions,
    ) -> impl std::future::Future<Output = Result<oneshot::Receiver<WidgetEvent>, PaymentError>> + Send;
}

/// Итог успешной оплаты.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutReceipt {
    pub order_id: String,
    pub totals: OrderTotals,
}

struct Machine {
    state: CheckoutState,
}

impl Machine {
    fn fire(&mut self, event: CheckoutEvent) -> AppResult<()> {
        let from = self.state.name();
        let next = std::mem::replace(&mut self.state, CheckoutState::SelectingTickets)
            .apply(event)
            .map_err(|e| AppError::Payment(PaymentError::Widget(e.to_string())))?;
        info!("checkout: {} -> {}", from, next.name());
        self.state = next;
        Ok(())
    }
}

/// Полный проход: guard'ы, создание заказа, виджет, проверка, сохранение id заказа.
pub async fn run_checkout<W: PaymentWidget>(
    app: &AppState,
    page: &BookingPage,
    widget: &W,
) -> AppResult<CheckoutReceipt> {
    if !page.is_bookable() {
        warn!("Checkout refused, page {} is not on sale", page.ticket_page_id);
        return Err(AppError::Validation(NOT_ON_SALE.to_string()));
    }
    if !app.session.is_authenticated().await {
        app.cache.save_redirect(&page.path()).await;
        info!("Sign-in required before checkout, will return to {}", page.path());
        return Err(AppError::AuthenticationRequired);
    }
    let user = app
        .session
        .current_user()
        .await
        .ok_or(AppError::AuthenticationRequired)?;

    let selection = page.selection();
    selection.ensure_checkout_ready()?;

    let totals = selection.totals();
    let ticket_details = selection.ticket_details();
    let buyer_name = if user.full_name.trim().is_empty() {
        DEFAULT_BUYER_NAME.to_string()
    } else {
        user.full_name.clone()
    };
    let order = OrderRequest {
        amount: totals.total,
        email: user.email.clone(),
        name: buyer_name.clone(),
        phone: String::new(),
        concert_name: page.concert.name.clone(),
        ticket_count: selection.total_quantity(),
        concert_id: page.ticket_page.concert_id.clone(),
        ticket_details: ticket_details.clone(),
    };

    let mut machine = Machine {
        state: CheckoutState::SelectingTickets,
    };

    // 1. Заказ
    let order_ref = &order;
    let (handle, token): (OrderHandle, SecretString) = match authorized(&app.session, |token| async move {
        app.api.create_order(&token, order_ref).await.map(|h| (h, token))
    })
    .await
    {
        Ok(result) => result,
        Err(AppError::Unauthorized) => return Err(AppError::Unauthorized),
        Err(e) => {
            error!("Payment initialization failed: {}", e);
            machine.fire(CheckoutEvent::OrderFailed(e.to_string()))?;
            return Err(match e {
                AppError::Payment(p) => AppError::Payment(p),
                other => PaymentError::OrderCreation(other.user_message()).into(),
            });
        }
    };
    machine.fire(CheckoutEvent::OrderCreated(handle.clone()))?;

    // 2. Виджет
    let options = WidgetOptions::new(&handle, &page.concert.name);
    let events = match widget.open(options).await {
        Ok(rx) => rx,
        Err(e) => {
            error!("Payment widget failed to open: {}", e);
            machine.fire(CheckoutEvent::WidgetUnavailable(e.to_string()))?;
            return Err(e.into());
        }
    };
    machine.fire(CheckoutEvent::WidgetOpened)?;

    // Закрытый без события канал считаем закрытием виджета
    let event = events.await.unwrap_or(WidgetEvent::Dismissed);
    machine.fire(CheckoutEvent::Widget(event.clone()))?;
    let payment = match event {
        WidgetEvent::Completed(payment) => payment,
        WidgetEvent::Dismissed => {
            warn!("Payment modal dismissed for order {}", handle.order_id);
            return Err(PaymentError::Cancelled.into());
        }
    };

    // 3. Проверка
    let request = VerifyPaymentRequest {
        order_id: &payment.order_id,
        payment_id: &payment.payment_id,
        signature: &payment.signature,
        concert_id: &order.concert_id,
        concert_name: &order.concert_name,
        email: &order.email,
        name: &buyer_name,
        phone: &order.phone,
        ticket_count: order.ticket_count,
        amount: order.amount,
        ticket_details: &ticket_details,
    };

    match app.api.verify_payment(&token, &request).await {
        Ok(()) => machine.fire(CheckoutEvent::VerificationSucceeded)?,
        Err(AppError::Unauthorized) => {
            app.session.handle_unauthorized().await;
            return Err(AppError::Unauthorized);
        }
        Err(e) => {
            machine.fire(CheckoutEvent::VerificationFailed(e.to_string()))?;
            let reason = match e {
                AppError::Payment(PaymentError::VerificationFailed(reason)) => reason,
                other => other.to_string(),
            };
            return Err(PaymentError::VerificationFailed(reason).into());
        }
    }

    app.cache.remember_last_order(&payment.order_id).await;
    info!("✅ Payment Successful! order_id={}", payment.order_id);

    Ok(CheckoutReceipt {
        order_id: payment.order_id,
        totals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::Prefill;

    fn handle() -> OrderHandle {
        OrderHandle {
            order_id: "order_1".into(),
            amount_minor: 295000,
            currency: "INR".into(),
            key_id: "rzp_test".into(),
            prefill: Prefill::default(),
        }
    }

    fn payment() -> PaymentConfirmation {
        PaymentConfirmation {
            order_id: "order_1".into(),
            payment_id: "pay_1".into(),
            signature: "sig".into(),
        }
    }

    #[test]
    fn happy_path_reaches_confirmed() {
        let state = CheckoutState::SelectingTickets
            .apply(CheckoutEvent::OrderCreated(handle()))
            .and_then(|s| s.apply(CheckoutEvent::WidgetOpened))
            .and_then(|s| s.apply(CheckoutEvent::Widget(WidgetEvent::Completed(payment()))))
            .and_then(|s| s.apply(CheckoutEvent::VerificationSucceeded))
            .unwrap();
        assert_eq!(state, CheckoutState::Confirmed { order_id: "order_1".into() });
        assert!(state.is_terminal());
    }

    #[test]
    fn dismissal_cancels_with_message() {
        let state = CheckoutState::AwaitingExternalPayment { handle: handle() }
            .apply(CheckoutEvent::Widget(WidgetEvent::Dismissed))
            .unwrap();
        assert_eq!(
            state,
            CheckoutState::Cancelled { message: PAYMENT_CANCELLED.into() }
        );
        assert_eq!(state.apply(CheckoutEvent::Retry).unwrap(), CheckoutState::SelectingTickets);
    }

    #[test]
    fn verification_failure_asks_to_contact_support() {
        let state = CheckoutState::Verifying { handle: handle(), payment: payment() }
            .apply(CheckoutEvent::VerificationFailed("Invalid payment signature".into()))
            .unwrap();
        assert_eq!(state, CheckoutState::Failed { message: VERIFICATION_FAILED.into() });
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        let err = CheckoutState::SelectingTickets
            .apply(CheckoutEvent::VerificationSucceeded)
            .unwrap_err();
        assert_eq!(err.state, "SelectingTickets");
        assert_eq!(err.event, "VerificationSucceeded");

        assert!(CheckoutState::Confirmed { order_id: "o".into() }
            .apply(CheckoutEvent::Retry)
            .is_err());
        assert!(CheckoutState::OrderCreated { handle: handle() }
            .apply(CheckoutEvent::Widget(WidgetEvent::Dismissed))
            .is_err());
    }
}
