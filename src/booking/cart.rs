use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

use super::pricing::OrderTotals;
use crate::error::{AppError, AppResult};
use crate::models::{TicketDetail, TicketType};

pub const MAX_TICKETS_PER_BOOKING: u32 = 4;
/// Сколько вариантов (0..N) показывать в выпадающем списке типа
pub const MAX_OPTIONS_PER_TYPE: u32 = 5;

/// Выбор билетов на странице бронирования.
///
/// Инварианты: сумма по всем типам <= 4, по каждому типу <= остатку.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketSelection {
    ticket_types: Vec<TicketType>,
    quantities: BTreeMap<String, u32>,
}

/// Строка для отображения типа билета.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketTypeView {
    pub name: String,
    pub price: Decimal,
    pub remaining: u32,
    pub selected: u32,
    pub sold_out: bool,
    pub selling_fast: bool,
    /// Варианты количества: 0..option_cap
    pub option_cap: u32,
}

impl TicketSelection {
    pub fn new(ticket_types: Vec<TicketType>) -> Self {
        let quantities = ticket_types
            .iter()
            .map(|t| (t.type_name.clone(), 0))
            .collect();
        Self {
            ticket_types,
            quantities,
        }
    }

    /// Восстановить сохраненную корзину как есть. Пустая или не проходящая
    /// инварианты корзина заменяется нулями.
    pub fn restore(ticket_types: Vec<TicketType>, saved: Option<BTreeMap<String, u32>>) -> Self {
        let mut selection = Self::new(ticket_types);
        let Some(saved) = saved.filter(|s| !s.is_empty()) else {
            return selection;
        };

        if selection.admits(&saved) {
            selection.quantities = saved;
        } else {
            warn!("Saved cart no longer fits inventory, starting from zero");
        }
        selection
    }

    fn admits(&self, candidate: &BTreeMap<String, u32>) -> bool {
        let total: u32 = candidate.values().sum();
        total <= MAX_TICKETS_PER_BOOKING
            && candidate.iter().all(|(name, qty)| {
                self.ticket_type(name)
                    .map(|t| *qty <= t.quantity)
                    .unwrap_or(false)
            })
    }

    fn ticket_type(&self, name: &str) -> Option<&TicketType> {
        self.ticket_types.iter().find(|t| t.type_name == name)
    }

    pub fn quantity(&self, name: &str) -> u32 {
        self.quantities.get(name).copied().unwrap_or(0)
    }

    pub fn set_quantity(&mut self, name: &str, quantity: u32) -> AppResult<()> {
        let ticket_type = self
            .ticket_type(name)
            .ok_or_else(|| AppError::Validation(format!("Unknown ticket type: {}", name)))?;

        let current = self.quantity(name);
        let remaining = ticket_type.quantity.saturating_sub(current);
        if quantity > current && quantity - current > remaining {
            return Err(AppError::Validation(format!(
                "Only {} tickets available for {}",
                remaining, name
            )));
        }

        let others: u32 = self
            .quantities
            .iter()
            .filter(|(n, _)| n.as_str() != name)
            .map(|(_, q)| *q)
            .sum();
        if others + quantity > MAX_TICKETS_PER_BOOKING {
            return Err(AppError::Validation(format!(
                "Maximum {} tickets allowed per booking",
                MAX_TICKETS_PER_BOOKING
            )));
        }

        self.quantities.insert(name.to_string(), quantity);
        Ok(())
    }

    pub fn quantities(&self) -> &BTreeMap<String, u32> {
        &self.quantities
    }

    pub fn total_quantity(&self) -> u32 {
        self.quantities.values().sum()
    }

    pub fn totals(&self) -> OrderTotals {
        OrderTotals::from_lines(
            self.ticket_types
                .iter()
                .map(|t| (t.price, self.quantity(&t.type_name))),
        )
    }

    /// Выбранные строки в порядке типов на странице.
    pub fn ticket_details(&self) -> Vec<TicketDetail> {
        self.ticket_types
            .iter()
            .filter(|t| self.quantity(&t.type_name) > 0)
            .map(|t| TicketDetail {
                ticket_type: t.type_name.clone(),
                quantity: self.quantity(&t.type_name),
                price: t.price,
            })
            .collect()
    }

    pub fn views(&self) -> Vec<TicketTypeView> {
        self.ticket_types
            .iter()
            .map(|t| TicketTypeView {
                name: t.type_name.clone(),
                price: t.price,
                remaining: t.quantity,
                selected: self.quantity(&t.type_name),
                sold_out: t.is_sold_out(),
                selling_fast: t.is_selling_fast(),
                option_cap: (t.quantity + 1).min(MAX_OPTIONS_PER_TYPE),
            })
            .collect()
    }

    /// Guard перехода к оплате.
    pub fn ensure_checkout_ready(&self) -> AppResult<()> {
        if self.total_quantity() == 0 {
            return Err(AppError::Validation("Please select at least one ticket".to_string()));
        }
        if !self.admits(&self.quantities) {
            return Err(AppError::Validation(format!(
                "Maximum {} tickets allowed per booking",
                MAX_TICKETS_PER_BOOKING
            )));
        }
        Ok(())
    }
}
