use crate::cache::CacheService;
use crate::error::AppResult;
use crate::models::Concert;
use tracing::{debug, warn};

pub const CONCERTS_KEY: &str = "concerts";

impl CacheService {
    /// Снимок каталога из долговременного хранилища
    pub async fn load_concert_snapshot(&self) -> AppResult<Vec<Concert>> {
        let Some(raw) = self.db.get(CONCERTS_KEY).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<Concert>>(&raw) {
            Ok(concerts) => Ok(concerts),
            Err(e) => {
                warn!("Error parsing stored concerts, falling back to baseline: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Сохраняется при каждом изменении каталога
    pub async fn save_concert_snapshot(&self, concerts: &[Concert]) -> AppResult<()> {
        let json = serde_json::to_string(concerts)?;
        self.db.set(CONCERTS_KEY, &json).await?;
        debug!("Concert snapshot saved ({} entries)", concerts.len());
        Ok(())
    }
}
