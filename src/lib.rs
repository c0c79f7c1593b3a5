pub mod audio;
pub mod booking;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod server;
pub mod services;
pub mod session;
pub mod session_store;
pub mod staff;

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::AppResult;
use crate::models::Concert;

// Shared state для всех сценариев клиента
pub struct AppState {
    pub config: config::Config,
    pub db: database::Database,
    pub cache: cache::CacheService,
    pub api: services::ApiClient,
    pub session: Arc<session::SessionManager>,
    pub catalog: catalog::ConcertCatalog,
}

impl AppState {
    pub async fn new(config: config::Config) -> AppResult<Arc<Self>> {
        let db = database::Database::new(&config.storage.database_url, config.storage.pool_size).await?;
        db.run_migrations().await?;

        let cache = cache::CacheService::new(db.clone());
        let api = services::ApiClient::from_config(&config.api)?;
        let session = Arc::new(session::SessionManager::new(cache.clone(), api.clone()));
        let catalog = catalog::ConcertCatalog::new(cache.clone(), api.clone(), session.clone());

        let baseline = load_baseline(config.storage.baseline_catalog.as_deref()).await;
        catalog.load(baseline).await?;
        cache.warmup().await;

        Ok(Arc::new(Self {
            config,
            db,
            cache,
            api,
            session,
            catalog,
        }))
    }
}

/// Базовый список концертов из JSON-файла. Нечитаемый файл не мешает старту.
async fn load_baseline(path: Option<&str>) -> Vec<Concert> {
    let Some(path) = path else {
        return Vec::new();
    };

    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Baseline catalog {} not readable: {}", path, e);
            return Vec::new();
        }
    };
    match serde_json::from_str::<Vec<Concert>>(&raw) {
        Ok(concerts) => {
            info!("Baseline catalog: {} concerts from {}", concerts.len(), path);
            concerts
        }
        Err(e) => {
            warn!("Baseline catalog {} is invalid: {}", path, e);
            Vec::new()
        }
    }
}
