use crate::{database::Database, session_store::SessionStore};
use tracing::info;

pub mod auth;
pub mod booking;
pub mod concerts;

/// Типизированное клиентское состояние поверх двух хранилищ:
/// долговременного (`Database`) и сессионного (`SessionStore`, живет до выхода из аккаунта).
#[derive(Clone)]
pub struct CacheService {
    db: Database,
    session: SessionStore,
}

impl CacheService {
    pub fn new(db: Database) -> Self {
        let session = SessionStore::new(db.clone());
        Self { db, session }
    }

    pub fn session_store(&self) -> &SessionStore {
        &self.session
    }

    // Проверка хранилища при старте
    pub async fn warmup(&self) {
        info!("Starting storage warmup...");

        let has_token = matches!(self.load_token().await, Ok(Some(_)));
        let concerts = self.load_concert_snapshot().await.map(|c| c.len()).unwrap_or(0);

        info!("Storage warmup done: stored_session={}, cached_concerts={}", has_token, concerts);
    }
}
