// src/store.rs
//
// Key-value persistence. Values are JSON; the service is the only writer of
// derived state (seen ids, status, recent jobs), the HTTP handlers write the
// user-owned keys (deleted ids, query, theme).

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::{Job, PollStatus};

pub mod keys {
    pub const SEEN_JOBS: &str = "seenJobs";
    pub const USER_QUERY: &str = "userQuery";
    pub const RECENT_JOBS: &str = "recentJobs";
    pub const LAST_GOOD_TOKEN: &str = "lastGoodToken";
    pub const MONITOR_STATUS: &str = "monitorStatus";
    pub const LAST_CHECK: &str = "lastCheck";
    pub const DELETED_JOBS: &str = "deletedJobs";
    pub const THEME: &str = "theme";
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// `None` when the key was never written.
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // single connection: an in-memory database is per connection
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key   TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(SqliteStore { pool })
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let raw = sqlx::query_scalar::<_, String>(r#"SELECT value FROM kv_store WHERE key = ? LIMIT 1"#)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let text = serde_json::to_string(&value)?;
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(text)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

pub const MEMORY_URL: &str = "memory";

#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.items.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

/// Typed access to the recognised keys.
#[derive(Clone)]
pub struct Storage {
    inner: Arc<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self { inner }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// `memory` keeps everything in process memory; anything else is a
    /// SQLite URL.
    pub async fn open(database_url: &str) -> Result<Self> {
        if database_url == MEMORY_URL {
            return Ok(Self::in_memory());
        }
        Ok(Self::new(Arc::new(SqliteStore::new(database_url).await?)))
    }

    // a stored JSON null reads back as the default
    async fn get_item<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        match self.inner.get(key).await? {
            Some(Value::Null) | None => Ok(default),
            Some(v) => Ok(serde_json::from_value(v)?),
        }
    }

    async fn set_item<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.inner.set(key, serde_json::to_value(value)?).await
    }

    pub async fn seen_jobs(&self) -> Result<Vec<String>> {
        self.get_item(keys::SEEN_JOBS, Vec::new()).await
    }

    pub async fn set_seen_jobs(&self, ids: &[String]) -> Result<()> {
        self.set_item(keys::SEEN_JOBS, &ids).await
    }

    pub async fn user_query(&self) -> Result<String> {
        self.get_item(keys::USER_QUERY, String::new()).await
    }

    pub async fn set_user_query(&self, query: &str) -> Result<()> {
        self.set_item(keys::USER_QUERY, &query).await
    }

    pub async fn recent_jobs(&self) -> Result<Vec<Job>> {
        self.get_item(keys::RECENT_JOBS, Vec::new()).await
    }

    pub async fn set_recent_jobs(&self, jobs: &[Job]) -> Result<()> {
        self.set_item(keys::RECENT_JOBS, &jobs).await
    }

    pub async fn last_good_token(&self) -> Result<Option<String>> {
        self.get_item(keys::LAST_GOOD_TOKEN, None).await
    }

    /// `None` clears the sticky slot.
    pub async fn set_last_good_token(&self, token: Option<&str>) -> Result<()> {
        self.set_item(keys::LAST_GOOD_TOKEN, &token).await
    }

    pub async fn status(&self) -> Result<String> {
        self.get_item(keys::MONITOR_STATUS, "Initializing...".to_string()).await
    }

    pub async fn set_status(&self, status: &str) -> Result<()> {
        self.set_item(keys::MONITOR_STATUS, &status).await
    }

    pub async fn last_check(&self) -> Result<Option<i64>> {
        self.get_item(keys::LAST_CHECK, None).await
    }

    pub async fn set_last_check(&self, timestamp_ms: i64) -> Result<()> {
        self.set_item(keys::LAST_CHECK, &timestamp_ms).await
    }

    pub async fn poll_status(&self) -> Result<PollStatus> {
        Ok(PollStatus { status: self.status().await?, last_check: self.last_check().await? })
    }

    pub async fn deleted_jobs(&self) -> Result<Vec<String>> {
        self.get_item(keys::DELETED_JOBS, Vec::new()).await
    }

    pub async fn set_deleted_jobs(&self, ids: &[String]) -> Result<()> {
        self.set_item(keys::DELETED_JOBS, &ids).await
    }

    /// Returns false when the id was already dismissed.
    pub async fn add_deleted_job(&self, id: &str) -> Result<bool> {
        let mut deleted = self.deleted_jobs().await?;
        if deleted.iter().any(|d| d == id) {
            return Ok(false);
        }
        deleted.push(id.to_string());
        self.set_deleted_jobs(&deleted).await?;
        Ok(true)
    }

    pub async fn theme(&self) -> Result<Theme> {
        self.get_item(keys::THEME, Theme::Light).await
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        self.set_item(keys::THEME, &theme).await
    }
}
