// db/backend.rs
use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use sqlx::{Pool, Postgres};
use tokio::sync::RwLock;

use crate::error::StoreError;

/// Durable string-keyed namespace holding JSON text.
#[async_trait]
pub trait KeyValueBackend: Send + Sync + std::fmt::Debug {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend::default()
    }

    /// Backend pre-filled with raw values, used to stage stored data in tests.
    #[cfg(test)]
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        MemoryBackend {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Postgres-backed namespace: one row per key in `record_store`.
#[derive(Debug, Clone)]
pub struct PgBackend {
    pool: Pool<Postgres>,
}

impl PgBackend {
    pub fn new(pool: Pool<Postgres>) -> Self {
        PgBackend { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS record_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl KeyValueBackend for PgBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = sqlx::query_scalar::<_, String>(
            r#"SELECT value FROM record_store WHERE key = $1"#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO record_store (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value, updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query(r#"DELETE FROM record_store WHERE key = $1"#)
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Redis-backed namespace. Values are written without TTL.
#[derive(Clone)]
pub struct RedisBackend {
    conn: Arc<ConnectionManager>,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("conn", &"ConnectionManager")
            .finish()
    }
}

impl RedisBackend {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("✅ Redis connection established successfully");
        Ok(RedisBackend {
            conn: Arc::new(conn),
        })
    }
}

#[async_trait]
impl KeyValueBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = ConnectionManager::clone(&self.conn);
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut conn = ConnectionManager::clone(&self.conn);
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = ConnectionManager::clone(&self.conn);
        let _: () = conn.del(key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_get_set_remove() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get("reports").await.unwrap(), None);

        backend.set("reports", "[]".to_string()).await.unwrap();
        assert_eq!(backend.get("reports").await.unwrap().as_deref(), Some("[]"));

        backend.remove("reports").await.unwrap();
        backend.remove("reports").await.unwrap();
        assert_eq!(backend.get("reports").await.unwrap(), None);
    }

    #[tokio::test]
    async fn pg_backend_builds_from_lazy_pool() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/siwes")
            .unwrap();
        let backend = PgBackend::new(pool);
        assert!(format!("{:?}", backend).contains("PgBackend"));
    }
}
