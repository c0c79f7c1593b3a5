use chrono::NaiveDateTime;
use tracing::{info, warn};

use super::cart::{TicketSelection, TicketTypeView};
use super::pricing::OrderTotals;
use crate::cache::CacheService;
use crate::error::{AppError, AppResult};
use crate::middleware::with_optional_token;
use crate::models::{Concert, TicketPage, TicketPageType};
use crate::AppState;

/// Что показывает страница бронирования.
#[derive(Debug, Clone, PartialEq)]
pub enum BookingView {
    ComingSoon,
    AvailableLater { available_from: NaiveDateTime },
    Bookable,
}

/// Открытая страница бронирования `/book-ticket/{uuid}`.
pub struct BookingPage {
    pub ticket_page_id: String,
    pub ticket_page: TicketPage,
    pub concert: Concert,
    pub view: BookingView,
    selection: TicketSelection,
    cache: CacheService,
}

pub fn booking_path(ticket_page_id: &str) -> String {
    format!("/book-ticket/{}", ticket_page_id)
}

impl BookingPage {
    /// Загружает страницу билетов, затем ее концерт. Сохраненная корзина восстанавливается.
    pub async fn open(app: &AppState, ticket_page_id: &str) -> AppResult<Self> {
        let ticket_page = with_optional_token(&app.session, |token| async move {
            app.api.get_ticket_page(ticket_page_id, token.as_ref()).await
        })
        .await?;
        if ticket_page.concert_id.trim().is_empty() {
            return Err(AppError::InvalidResponse("Ticket data missing concert ID".to_string()));
        }

        let concert = app.catalog.fetch_one(&ticket_page.concert_id).await?;
        if concert.name.trim().is_empty() {
            return Err(AppError::InvalidResponse("Invalid concert data received".to_string()));
        }

        let view = match (ticket_page.page_type, ticket_page.available_from) {
            (TicketPageType::Bookable, _) => BookingView::Bookable,
            (TicketPageType::AvailableLater, Some(available_from)) => {
                BookingView::AvailableLater { available_from }
            }
            (TicketPageType::AvailableLater, None) => {
                warn!("AVAILABLE_LATER page {} has no date, showing coming soon", ticket_page_id);
                BookingView::ComingSoon
            }
            (TicketPageType::ComingSoon, _) => BookingView::ComingSoon,
        };

        let saved = app.cache.load_cart(ticket_page_id).await;
        let selection = TicketSelection::restore(ticket_page.ticket_types.clone(), saved);
        info!(
            "Booking page {} opened for '{}' ({:?}), {} tickets in cart",
            ticket_page_id,
            concert.name,
            view,
            selection.total_quantity()
        );

        Ok(Self {
            ticket_page_id: ticket_page_id.to_string(),
            ticket_page,
            concert,
            view,
            selection,
            cache: app.cache.clone(),
        })
    }

    pub fn path(&self) -> String {
        booking_path(&self.ticket_page_id)
    }

    pub fn is_bookable(&self) -> bool {
        self.view == BookingView::Bookable
    }

    /// Меняет количество и сразу сохраняет корзину.
    pub async fn set_quantity(&mut self, ticket_type: &str, quantity: u32) -> AppResult<()> {
        if !self.is_bookable() {
            return Err(AppError::Validation(super::checkout::NOT_ON_SALE.to_string()));
        }
        self.selection.set_quantity(ticket_type, quantity)?;
        self.cache
            .save_cart(&self.ticket_page_id, self.selection.quantities())
            .await;
        Ok(())
    }

    pub fn selection(&self) -> &TicketSelection {
        &self.selection
    }

    pub fn ticket_views(&self) -> Vec<TicketTypeView> {
        self.selection.views()
    }

    pub fn totals(&self) -> OrderTotals {
        self.selection.totals()
    }
}
