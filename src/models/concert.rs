use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use super::null_as_default;
use super::ticket::{TicketPageType, TicketTypeDraft};
use crate::error::{AppError, AppResult};

pub const DEFAULT_DESCRIPTION: &str = "No description available";
pub const DEFAULT_IMAGE: &str = "/concert-placeholder.jpg";
pub const DEFAULT_GRADIENT: [&str; 2] = ["from-violet-600", "to-indigo-500"];

/// Концерт в том виде, в каком его отдает `/api/concerts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concert {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub venue: Option<String>,
    pub location: String,
    pub date: NaiveDate,
    pub time: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub artists: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub gradient: Vec<String>,
    #[serde(default)]
    pub ticket_link: Option<String>,
}

impl Concert {
    /// Совпадение по имени, артистам или городу без учета регистра.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        [&self.name, &self.artists, &self.location]
            .iter()
            .any(|field| field.to_lowercase().contains(&query))
    }
}

// Локальный baseline-каталог хранит числовые id
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// URL-friendly slug: нижний регистр, все кроме `[a-z0-9]` схлопывается в `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Форма создания/редактирования концерта из админки.
#[derive(Debug, Clone, Default, Validate)]
pub struct ConcertForm {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub location: String,
    #[validate(required)]
    pub date: Option<NaiveDate>,
    #[validate(length(min = 1))]
    pub time: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(length(min = 1))]
    pub short_description: String,
    #[validate(length(min = 1))]
    pub artists: String,
    #[validate(length(min = 1))]
    pub image: String,
    pub gradient: Option<Vec<String>>,
    pub ticket_link: Option<String>,
    pub ticket_page_type: Option<TicketPageType>,
    pub available_from: Option<chrono::NaiveDateTime>,
    pub ticket_types: Vec<TicketTypeDraft>,
}

// Порядок полей в сообщении об ошибке
const REQUIRED_FIELDS: [(&str, &str); 8] = [
    ("name", "name"),
    ("location", "location"),
    ("date", "date"),
    ("time", "time"),
    ("description", "description"),
    ("short_description", "shortDescription"),
    ("artists", "artists"),
    ("image", "image"),
];

impl ConcertForm {
    /// Проверка формы до любого сетевого вызова.
    pub fn check(&self) -> AppResult<()> {
        if let Err(errors) = self.validate() {
            let field_errors = errors.field_errors();
            let missing: Vec<&str> = REQUIRED_FIELDS
                .iter()
                .filter(|(field, _)| field_errors.contains_key(*field))
                .map(|(_, label)| *label)
                .collect();
            if !missing.is_empty() {
                return Err(AppError::Validation(format!(
                    "Please fill in all required fields: {}",
                    missing.join(", ")
                )));
            }
        }

        match self.ticket_page_type {
            Some(TicketPageType::AvailableLater) if self.available_from.is_none() => Err(
                AppError::Validation("Please specify when tickets will be available".to_string()),
            ),
            Some(TicketPageType::Bookable) => self.check_ticket_types(),
            _ => Ok(()),
        }
    }

    fn check_ticket_types(&self) -> AppResult<()> {
        if self.ticket_types.is_empty() {
            return Err(AppError::Validation("Please add at least one ticket type".to_string()));
        }

        for ticket in &self.ticket_types {
            if ticket.type_name.trim().is_empty() {
                return Err(AppError::Validation("All ticket types must have a name".to_string()));
            }
            if ticket.price <= rust_decimal::Decimal::ZERO {
                return Err(AppError::Validation(
                    "All ticket types must have a valid price greater than 0".to_string(),
                ));
            }
            if ticket.quantity == 0 {
                return Err(AppError::Validation(
                    "All ticket types must have a valid quantity greater than 0".to_string(),
                ));
            }
        }

        let mut names: Vec<String> = self
            .ticket_types
            .iter()
            .map(|t| t.type_name.trim().to_lowercase())
            .collect();
        names.sort();
        names.dedup();
        if names.len() != self.ticket_types.len() {
            return Err(AppError::Validation("Each ticket type must have a unique name".to_string()));
        }
        Ok(())
    }

    /// Тело запроса POST/PUT `/api/concerts` с заполненными значениями по умолчанию.
    pub fn to_payload(&self) -> ConcertPayload {
        let slug = slugify(&self.name);
        let description = non_empty(&self.description).unwrap_or(DEFAULT_DESCRIPTION).to_string();
        let short_description = match non_empty(&self.short_description) {
            Some(s) => s.to_string(),
            None if !self.description.trim().is_empty() => {
                let head: String = self.description.chars().take(100).collect();
                format!("{}...", head)
            }
            None => DEFAULT_DESCRIPTION.to_string(),
        };
        let ticket_link = self
            .ticket_link
            .clone()
            .filter(|link| !link.trim().is_empty())
            .unwrap_or_else(|| format!("/book-ticket/{}", slug));

        ConcertPayload {
            name: self.name.clone(),
            location: self.location.clone(),
            venue: self.location.clone(),
            date: self.date,
            time: self.time.clone(),
            description,
            short_description,
            artists: self.artists.clone(),
            image: non_empty(&self.image).unwrap_or(DEFAULT_IMAGE).to_string(),
            gradient: self
                .gradient
                .clone()
                .filter(|g| !g.is_empty())
                .unwrap_or_else(|| DEFAULT_GRADIENT.iter().map(|s| s.to_string()).collect()),
            slug,
            ticket_link,
        }
    }
}

fn non_empty(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcertPayload {
    pub name: String,
    pub location: String,
    pub venue: String,
    pub date: Option<NaiveDate>,
    pub time: String,
    pub description: String,
    pub short_description: String,
    pub artists: String,
    pub image: String,
    pub gradient: Vec<String>,
    pub slug: String,
    pub ticket_link: String,
}

impl ConcertPayload {
    /// Повторная отправка уже созданного концерта с новой ссылкой на билеты.
    pub fn with_ticket_link(concert: &Concert, ticket_link: &str) -> Self {
        ConcertPayload {
            name: concert.name.clone(),
            location: concert.location.clone(),
            venue: concert.venue.clone().unwrap_or_else(|| concert.location.clone()),
            date: Some(concert.date),
            time: concert.time.clone(),
            description: concert.description.clone().unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            short_description: concert
                .short_description
                .clone()
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            artists: concert.artists.clone(),
            image: concert.image.clone().unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
            gradient: concert.gradient.clone(),
            slug: concert.slug.clone(),
            ticket_link: ticket_link.to_string(),
        }
    }
}

impl From<&Concert> for ConcertForm {
    fn from(concert: &Concert) -> Self {
        ConcertForm {
            name: concert.name.clone(),
            location: concert.location.clone(),
            date: Some(concert.date),
            time: concert.time.clone(),
            description: concert.description.clone().unwrap_or_default(),
            short_description: concert.short_description.clone().unwrap_or_default(),
            artists: concert.artists.clone(),
            image: concert.image.clone().unwrap_or_default(),
            gradient: Some(concert.gradient.clone()),
            ticket_link: concert.ticket_link.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn complete_form() -> ConcertForm {
        ConcertForm {
            name: "Arijit Live: Soulful Nights!".into(),
            location: "Mumbai".into(),
            date: NaiveDate::from_ymd_opt(2026, 12, 31),
            time: "19:30".into(),
            description: "An evening of ballads".into(),
            short_description: "Ballads".into(),
            artists: "Arijit Singh".into(),
            image: "https://img.example.com/a.jpg".into(),
            ..Default::default()
        }
    }

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("Arijit Live: Soulful Nights!"), "arijit-live-soulful-nights");
        assert_eq!(slugify("  --AP Dhillon 2026--  "), "ap-dhillon-2026");
        assert_eq!(slugify("Ñoño"), "o-o");
    }

    #[test]
    fn missing_fields_listed_in_form_order() {
        let form = ConcertForm {
            location: String::new(),
            short_description: String::new(),
            date: None,
            ..complete_form()
        };
        let err = form.check().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Please fill in all required fields: location, date, shortDescription"
        );
    }

    #[test]
    fn bookable_requires_ticket_types() {
        let form = ConcertForm {
            ticket_page_type: Some(TicketPageType::Bookable),
            ..complete_form()
        };
        assert_eq!(form.check().unwrap_err().to_string(), "Please add at least one ticket type");
    }

    #[test]
    fn bookable_rejects_duplicate_names_case_insensitively() {
        let form = ConcertForm {
            ticket_page_type: Some(TicketPageType::Bookable),
            ticket_types: vec![
                TicketTypeDraft::new("VIP", Decimal::new(1500, 0), 10),
                TicketTypeDraft::new(" vip ", Decimal::new(1000, 0), 10),
            ],
            ..complete_form()
        };
        assert_eq!(
            form.check().unwrap_err().to_string(),
            "Each ticket type must have a unique name"
        );
    }

    #[test]
    fn available_later_needs_date() {
        let form = ConcertForm {
            ticket_page_type: Some(TicketPageType::AvailableLater),
            ..complete_form()
        };
        assert!(form.check().is_err());
    }

    #[test]
    fn payload_fills_defaults() {
        let form = ConcertForm {
            image: String::new(),
            short_description: String::new(),
            ..complete_form()
        };
        let payload = form.to_payload();
        assert_eq!(payload.slug, "arijit-live-soulful-nights");
        assert_eq!(payload.ticket_link, "/book-ticket/arijit-live-soulful-nights");
        assert_eq!(payload.image, DEFAULT_IMAGE);
        assert_eq!(payload.short_description, "An evening of ballads...");
        assert_eq!(payload.venue, "Mumbai");
        assert_eq!(payload.gradient, vec!["from-violet-600", "to-indigo-500"]);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["date"], "2026-12-31");
        assert!(json.get("shortDescription").is_some());
    }

    #[test]
    fn concert_accepts_numeric_id_and_null_gradient() {
        let concert: Concert = serde_json::from_str(
            r#"{"id":7,"name":"X","location":"Delhi","date":"2026-01-02","time":"20:00:00",
                "artists":"A","slug":"x","gradient":null}"#,
        )
        .unwrap();
        assert_eq!(concert.id, "7");
        assert!(concert.gradient.is_empty());
        assert!(concert.matches("delhi"));
    }

    #[test]
    fn concert_without_name_is_rejected() {
        let result = serde_json::from_str::<Concert>(
            r#"{"id":"1","location":"Delhi","date":"2026-01-02","time":"20:00"}"#,
        );
        assert!(result.is_err());
    }
}
