//! Shared cache store for probe records, geo entries and the summary
//!
//! The store is a plain string key/value surface with optional expiry. It
//! deliberately provides no transactions or compare-and-swap: callers doing
//! read-modify-write cycles (the summary aggregation in particular) must
//! tolerate last-write-wins interleavings.

use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Port for the shared cache store
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the value stored under `key`, if present and not expired
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, optionally expiring after `ttl`
    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;
}

/// In-memory cache store for tests and ephemeral runs
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        let Some(entry) = entries.get(key) else {
            return Ok(None);
        };
        if let Some(expires_at) = entry.expires_at {
            if Instant::now() >= expires_at {
                return Ok(None);
            }
        }
        Ok(Some(entry.value.clone()))
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let entry = MemoryEntry {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }
}

/// SQLite-backed cache store, the durable deployment option.
///
/// Expired rows are filtered on read; no background sweeper runs.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the store at the given database path
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value, expires_at FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let expires_at: Option<i64> = row.get("expires_at");
        if let Some(expires_at) = expires_at {
            if Utc::now().timestamp_millis() >= expires_at {
                return Ok(None);
            }
        }
        Ok(Some(row.get("value")))
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl.map(|ttl| Utc::now().timestamp_millis() + ttl.as_millis() as i64);
        sqlx::query("INSERT OR REPLACE INTO kv (key, value, expires_at) VALUES (?, ?, ?)")
            .bind(key)
            .bind(value)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
