use tracing::info;

use crate::database::Database;

/// Сессионное хранилище (аналог sessionStorage): корзины, последний заказ, адрес возврата
/// после входа. Лежит в той же базе, что и долговременные ключи, чтобы пережить переход
/// между командами, и очищается целиком при выходе из аккаунта.
#[derive(Clone)]
pub struct SessionStore {
    db: Database,
}

impl SessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT value FROM session_kv WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.db.pool)
            .await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO session_kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now())
        .execute(&self.db.pool)
        .await?;
        Ok(())
    }

    /// Удаляет ключ и отдает прежнее значение.
    pub async fn remove(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("DELETE FROM session_kv WHERE key = ?1 RETURNING value")
            .bind(key)
            .fetch_optional(&self.db.pool)
            .await
    }

    pub async fn clear(&self) -> Result<(), sqlx::Error> {
        let removed = sqlx::query("DELETE FROM session_kv")
            .execute(&self.db.pool)
            .await?
            .rows_affected();
        info!("🧹 Session storage cleared ({} keys)", removed);
        Ok(())
    }
}
