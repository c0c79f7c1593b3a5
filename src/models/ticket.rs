use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::null_as_default;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketPageType {
    #[default]
    ComingSoon,
    AvailableLater,
    Bookable,
}

impl std::str::FromStr for TicketPageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "COMING_SOON" => Ok(TicketPageType::ComingSoon),
            "AVAILABLE_LATER" => Ok(TicketPageType::AvailableLater),
            "BOOKABLE" => Ok(TicketPageType::Bookable),
            other => Err(format!("Unknown ticket page type: {}", other)),
        }
    }
}

/// Тип билета на странице бронирования.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketType {
    pub type_name: String,
    pub price: Decimal,
    /// Остаток
    pub quantity: u32,
}

impl TicketType {
    pub fn is_sold_out(&self) -> bool {
        self.quantity == 0
    }

    pub fn is_selling_fast(&self) -> bool {
        self.quantity > 0 && self.quantity < 6
    }
}

/// Тип билета, введенный администратором (еще не сохранен).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TicketTypeDraft {
    pub type_name: String,
    pub price: Decimal,
    pub quantity: u32,
}

impl TicketTypeDraft {
    pub fn new(type_name: &str, price: Decimal, quantity: u32) -> Self {
        TicketTypeDraft {
            type_name: type_name.to_string(),
            price,
            quantity,
        }
    }
}

impl std::str::FromStr for TicketTypeDraft {
    type Err = String;

    /// Формат `Name:price:quantity`, например `VIP:1500:20`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.rsplitn(3, ':');
        let (quantity, price, name) = match (parts.next(), parts.next(), parts.next()) {
            (Some(q), Some(p), Some(n)) => (q, p, n),
            _ => return Err(format!("Expected NAME:PRICE:QUANTITY, got '{}'", s)),
        };
        let price = price
            .trim()
            .parse::<Decimal>()
            .map_err(|e| format!("Invalid price '{}': {}", price, e))?;
        let quantity = quantity
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("Invalid quantity '{}': {}", quantity, e))?;
        Ok(TicketTypeDraft::new(name.trim(), price, quantity))
    }
}

/// Страница продажи билетов, `GET /api/tickets/{uuid}` и `/api/tickets/concert/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPage {
    pub concert_id: String,
    pub page_type: TicketPageType,
    #[serde(default)]
    pub available_from: Option<NaiveDateTime>,
    #[serde(default)]
    pub booking_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ticket_types: Vec<TicketType>,
}

impl TicketPage {
    pub fn ticket_type(&self, name: &str) -> Option<&TicketType> {
        self.ticket_types.iter().find(|t| t.type_name == name)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TicketTypeRequest {
    pub type_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
}

/// Тело `POST /api/tickets`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TicketPageRequest {
    pub concert_id: String,
    pub page_type: TicketPageType,
    /// ISO-8601 в UTC, только для AVAILABLE_LATER
    pub available_from: Option<String>,
    /// Только для BOOKABLE
    pub ticket_types: Vec<TicketTypeRequest>,
}

impl TicketPageRequest {
    /// `available_from` вводится в локальном времени, бэкенд ждет UTC.
    pub fn new(
        concert_id: &str,
        page_type: TicketPageType,
        available_from: Option<NaiveDateTime>,
        drafts: &[TicketTypeDraft],
        timezone_offset_minutes: i32,
    ) -> Self {
        let available_from = match page_type {
            TicketPageType::AvailableLater => available_from.map(|local| {
                let utc = local + Duration::minutes(i64::from(timezone_offset_minutes));
                utc.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
            }),
            _ => None,
        };
        let ticket_types = match page_type {
            TicketPageType::Bookable => drafts
                .iter()
                .map(|d| TicketTypeRequest {
                    type_name: d.type_name.clone(),
                    price: d.price,
                    quantity: d.quantity,
                })
                .collect(),
            _ => Vec::new(),
        };

        TicketPageRequest {
            concert_id: concert_id.to_string(),
            page_type,
            available_from,
            ticket_types,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateTicketPageResponse {
    #[serde(default)]
    pub booking_url: Option<String>,
}
