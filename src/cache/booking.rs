use crate::cache::CacheService;
use std::collections::BTreeMap;
use tracing::warn;

pub const LAST_ORDER_KEY: &str = "lastSuccessfulOrder";
pub const REDIRECT_KEY: &str = "redirectAfterSignIn";

fn cart_key(ticket_page_id: &str) -> String {
    format!("booking_{}", ticket_page_id)
}

// Сбой сессионного хранилища не должен ломать бронирование: пишем в лог и идем дальше
impl CacheService {
    /// Корзина страницы бронирования: тип билета -> количество
    pub async fn save_cart(&self, ticket_page_id: &str, quantities: &BTreeMap<String, u32>) {
        let json = match serde_json::to_string(quantities) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize cart for {}: {}", ticket_page_id, e);
                return;
            }
        };
        if let Err(e) = self.session.set(&cart_key(ticket_page_id), &json).await {
            warn!("Failed to save cart for {}: {}", ticket_page_id, e);
        }
    }

    pub async fn load_cart(&self, ticket_page_id: &str) -> Option<BTreeMap<String, u32>> {
        let raw = self.session_value(&cart_key(ticket_page_id)).await?;
        match serde_json::from_str(&raw) {
            Ok(cart) => Some(cart),
            Err(e) => {
                warn!("Ignoring unreadable cart for {}: {}", ticket_page_id, e);
                None
            }
        }
    }

    pub async fn remember_last_order(&self, order_id: &str) {
        if let Err(e) = self.session.set(LAST_ORDER_KEY, order_id).await {
            warn!("Failed to remember order {}: {}", order_id, e);
        }
    }

    pub async fn last_order(&self) -> Option<String> {
        self.session_value(LAST_ORDER_KEY).await
    }

    pub async fn forget_last_order(&self) {
        if let Err(e) = self.session.remove(LAST_ORDER_KEY).await {
            warn!("Failed to forget last order: {}", e);
        }
    }

    /// Куда вернуть пользователя после входа
    pub async fn save_redirect(&self, path: &str) {
        if let Err(e) = self.session.set(REDIRECT_KEY, path).await {
            warn!("Failed to save redirect {}: {}", path, e);
        }
    }

    pub async fn take_redirect(&self) -> Option<String> {
        match self.session.remove(REDIRECT_KEY).await {
            Ok(path) => path,
            Err(e) => {
                warn!("Failed to read redirect: {}", e);
                None
            }
        }
    }

    async fn session_value(&self, key: &str) -> Option<String> {
        match self.session.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read {} from session storage: {}", key, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    #[tokio::test]
    async fn cart_is_keyed_by_ticket_page() {
        let cache = CacheService::new(Database::in_memory().await.unwrap());
        let cart = BTreeMap::from([("General".to_string(), 2), ("VIP".to_string(), 1)]);

        cache.save_cart("page-1", &cart).await;
        assert_eq!(cache.load_cart("page-1").await, Some(cart));
        assert_eq!(cache.load_cart("page-2").await, None);
        assert_eq!(
            cache.session_store().get("booking_page-1").await.unwrap().as_deref(),
            Some(r#"{"General":2,"VIP":1}"#)
        );
    }

    #[tokio::test]
    async fn redirect_is_taken_once() {
        let cache = CacheService::new(Database::in_memory().await.unwrap());
        cache.save_redirect("/book/page-1").await;
        assert_eq!(cache.take_redirect().await.as_deref(), Some("/book/page-1"));
        assert_eq!(cache.take_redirect().await, None);
    }

    #[tokio::test]
    async fn scope_clear_drops_booking_state() {
        let cache = CacheService::new(Database::in_memory().await.unwrap());
        cache.remember_last_order("order_1").await;
        cache.save_redirect("/book-ticket/page-1").await;

        cache.clear_session_scope().await.unwrap();
        assert_eq!(cache.last_order().await, None);
        assert_eq!(cache.take_redirect().await, None);
    }
}
