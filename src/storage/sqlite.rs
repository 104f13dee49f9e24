//! SQLite-backed key-value store.
//!
//! A single `kv` table keyed by string. Upserts give last-write-wins
//! semantics. Pass `:memory:` for a throwaway in-process database.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

use super::KvStore;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(path: &str) -> Result<Self> {
        let options = if path == ":memory:" {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else {
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
        };

        // One long-lived connection: an in-memory database lives and dies
        // with its connection.
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open SQLite store at {path}"))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY NOT NULL, value TEXT NOT NULL)",
        )
        .execute(&pool)
        .await
        .context("Failed to create kv table")?;

        info!(path, "SQLite store ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl KvStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read key {key}"))
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to write key {key}"))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete key {key}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_and_remove() {
        let store = SqliteStore::connect(":memory:").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());

        store.put("k", "v1").await.unwrap();
        store.put("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));

        store.remove("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let mut path = std::env::temp_dir();
        path.push(format!("betbot_test_{}.db", uuid::Uuid::new_v4()));
        let path = path.to_string_lossy().to_string();

        {
            let store = SqliteStore::connect(&path).await.unwrap();
            store.put("betbot_users", "[]").await.unwrap();
            store.pool.close().await;
        }

        let store = SqliteStore::connect(&path).await.unwrap();
        assert_eq!(store.get("betbot_users").await.unwrap().as_deref(), Some("[]"));
        store.pool.close().await;

        std::fs::remove_file(&path).unwrap();
    }
}
