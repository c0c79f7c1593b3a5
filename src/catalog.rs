//! Каталог концертов.
//!
//! При старте сохраненный снимок накладывается на базовый список (совпадение по id заменяет,
//! новые добавляются в конец). После входа список целиком заменяется ответом сервера.
//! Каждое изменение сразу пишется в снимок.

use secrecy::SecretString;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::cache::CacheService;
use crate::error::{AppError, AppResult};
use crate::middleware::{authorized, require_admin, with_optional_token};
use crate::models::concert::ConcertPayload;
use crate::models::ticket::TicketPageRequest;
use crate::models::{Concert, ConcertForm, TicketPage, TicketPageType};
use crate::services::ApiClient;
use crate::session::SessionManager;

pub struct ConcertCatalog {
    cache: CacheService,
    api: ApiClient,
    session: Arc<SessionManager>,
    concerts: RwLock<Vec<Concert>>,
}

/// Накладывает сохраненные записи на базовый список.
pub fn merge_by_id(baseline: Vec<Concert>, stored: Vec<Concert>) -> Vec<Concert> {
    let mut merged = baseline;
    for concert in stored {
        match merged.iter_mut().find(|c| c.id == concert.id) {
            Some(existing) => *existing = concert,
            None => merged.push(concert),
        }
    }
    merged
}

impl ConcertCatalog {
    pub fn new(cache: CacheService, api: ApiClient, session: Arc<SessionManager>) -> Self {
        Self {
            cache,
            api,
            session,
            concerts: RwLock::new(Vec::new()),
        }
    }

    /// Начальное состояние: базовый список + снимок из хранилища.
    pub async fn load(&self, baseline: Vec<Concert>) -> AppResult<()> {
        let stored = self.cache.load_concert_snapshot().await?;
        let merged = merge_by_id(baseline, stored);
        info!("Catalog loaded with {} concerts", merged.len());
        self.replace_all(merged).await
    }

    async fn replace_all(&self, concerts: Vec<Concert>) -> AppResult<()> {
        self.cache.save_concert_snapshot(&concerts).await?;
        *self.concerts.write().await = concerts;
        Ok(())
    }

    async fn persist(&self) -> AppResult<()> {
        let snapshot = self.concerts.read().await.clone();
        self.cache.save_concert_snapshot(&snapshot).await
    }

    pub async fn concerts(&self) -> Vec<Concert> {
        self.concerts.read().await.clone()
    }

    pub async fn by_slug(&self, slug: &str) -> Option<Concert> {
        self.concerts.read().await.iter().find(|c| c.slug == slug).cloned()
    }

    pub async fn by_id(&self, id: &str) -> Option<Concert> {
        self.concerts.read().await.iter().find(|c| c.id == id).cloned()
    }

    pub async fn search(&self, query: &str) -> Vec<Concert> {
        self.concerts
            .read()
            .await
            .iter()
            .filter(|c| c.matches(query))
            .cloned()
            .collect()
    }

    /// Загрузка с сервера. Без сессии ничего не делает и возвращает `false`.
    pub async fn fetch(&self) -> AppResult<bool> {
        if !self.session.is_authenticated().await {
            info!("User not authenticated, skipping concert fetch");
            return Ok(false);
        }

        let concerts = authorized(&self.session, |token| async move {
            self.api.list_concerts(&token).await
        })
        .await?;

        info!("Fetched {} concerts from server", concerts.len());
        self.replace_all(concerts).await?;
        Ok(true)
    }

    /// Концерт с сервера по id (без кеша).
    pub async fn fetch_one(&self, id: &str) -> AppResult<Concert> {
        with_optional_token(&self.session, |token| async move {
            self.api.get_concert(id, token.as_ref()).await
        })
        .await
    }

    /// Страница билетов концерта, если она есть.
    pub async fn ticket_details(&self, concert_id: &str) -> AppResult<Option<TicketPage>> {
        with_optional_token(&self.session, |token| async move {
            self.api.ticket_page_for_concert(concert_id, token.as_ref()).await
        })
        .await
    }

    // --- Админка ---

    pub async fn add(&self, form: &ConcertForm) -> AppResult<Concert> {
        require_admin(&self.session).await?;
        form.check()?;
        let payload = form.to_payload();
        info!("Creating concert '{}' (slug={})", payload.name, payload.slug);

        let concert = authorized(&self.session, |token| async move {
            let created = self.api.create_concert(&token, &payload).await?;
            self.with_ticket_page(&token, created, form, true).await
        })
        .await?;

        self.concerts.write().await.push(concert.clone());
        self.persist().await?;
        info!("✅ Concert created: id={}", concert.id);
        Ok(concert)
    }

    pub async fn update(&self, id: &str, form: &ConcertForm) -> AppResult<Concert> {
        require_admin(&self.session).await?;
        form.check()?;
        let payload = form.to_payload();
        info!("Updating concert {}", id);

        let concert = authorized(&self.session, |token| async move {
            let updated = self.api.update_concert(&token, id, &payload).await?;
            self.with_ticket_page(&token, updated, form, false).await
        })
        .await?;

        {
            let mut concerts = self.concerts.write().await;
            match concerts.iter_mut().find(|c| c.id == id) {
                Some(existing) => *existing = concert.clone(),
                None => concerts.push(concert.clone()),
            }
        }
        self.persist().await?;
        Ok(concert)
    }

    pub async fn remove(&self, id: &str) -> AppResult<()> {
        require_admin(&self.session).await?;
        authorized(&self.session, |token| async move {
            self.api.delete_concert(&token, id).await
        })
        .await?;

        self.concerts.write().await.retain(|c| c.id != id);
        self.persist().await?;
        info!("Concert {} deleted", id);
        Ok(())
    }

    /// Создает страницу билетов и записывает ее адрес в концерт.
    ///
    /// Для BOOKABLE ошибка фатальна: при создании только что созданный концерт удаляется.
    /// Для остальных типов ошибка логируется, концерт остается как есть.
    async fn with_ticket_page(
        &self,
        token: &SecretString,
        concert: Concert,
        form: &ConcertForm,
        rollback_on_failure: bool,
    ) -> AppResult<Concert> {
        let Some(page_type) = form.ticket_page_type else {
            return Ok(concert);
        };

        match self.attach_ticket_page(token, &concert, page_type, form).await {
            Ok(linked) => Ok(linked),
            Err(AppError::Unauthorized) => Err(AppError::Unauthorized),
            Err(e) if page_type == TicketPageType::Bookable => {
                error!("Error creating ticket page for {}: {}", concert.id, e);
                if rollback_on_failure {
                    if let Err(delete_err) = self.api.delete_concert(token, &concert.id).await {
                        warn!("Rollback of concert {} failed: {}", concert.id, delete_err);
                    }
                }
                Err(AppError::TicketPage(e.to_string()))
            }
            Err(e) => {
                warn!("Ticket page for {} not created, continuing: {}", concert.id, e);
                Ok(concert)
            }
        }
    }

    async fn attach_ticket_page(
        &self,
        token: &SecretString,
        concert: &Concert,
        page_type: TicketPageType,
        form: &ConcertForm,
    ) -> AppResult<Concert> {
        let request = TicketPageRequest::new(
            &concert.id,
            page_type,
            form.available_from,
            &form.ticket_types,
            self.api.timezone_offset_minutes(),
        );
        let booking_url = self
            .api
            .create_ticket_page(token, &request)
            .await?
            .unwrap_or_else(|| format!("/book-ticket/{}", concert.slug));

        let payload = ConcertPayload::with_ticket_link(concert, &booking_url);
        self.api
            .replace_concert(token, &concert.id, &payload)
            .await
            .map_err(|e| match e {
                AppError::Unauthorized => AppError::Unauthorized,
                _ => AppError::Validation("Failed to update concert with ticket link".to_string()),
            })?;

        info!("Ticket page attached to {}: {}", concert.id, booking_url);
        let mut linked = concert.clone();
        linked.ticket_link = Some(booking_url);
        Ok(linked)
    }
}
