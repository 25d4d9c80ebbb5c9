pub mod memory;
pub mod operations;

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{ConnectOptions, SqliteConnection, SqlitePool};
use tokio::sync::Mutex as AsyncMutex;

use crate::config::DbConfig;
use crate::error::ReviewResult;
use crate::models::{Item, ProgressRecord, User};

pub use memory::MemoryStore;

/// Durable state the scheduler reads and writes.
///
/// Implementations must enforce `term` uniqueness and at most one progress
/// record per `(external_id, item_id)` atomically; the service relies on the
/// insert-if-absent methods reporting whether a row was created.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Returns `true` when a new item was created, `false` when `term` already existed.
    async fn insert_item_if_absent(&self, term: &str, translation: &str) -> ReviewResult<bool>;

    async fn get_item(&self, item_id: i64) -> ReviewResult<Option<Item>>;

    async fn count_items(&self) -> ReviewResult<i64>;

    async fn ensure_user(&self, external_id: &str, daily_new_item_limit: i64) -> ReviewResult<User>;

    async fn get_user(&self, external_id: &str) -> ReviewResult<Option<User>>;

    /// Returns `false` when no such user is registered.
    async fn set_daily_new_item_limit(&self, external_id: &str, limit: i64) -> ReviewResult<bool>;

    /// Due record with the smallest `next_review_at`, ties by record id.
    async fn earliest_due(
        &self,
        external_id: &str,
        now: DateTime<Utc>,
    ) -> ReviewResult<Option<ProgressRecord>>;

    async fn count_due(&self, external_id: &str, now: DateTime<Utc>) -> ReviewResult<i64>;

    /// Records first introduced (`added_at`) within `[start, end)`.
    async fn count_added_between(
        &self,
        external_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ReviewResult<i64>;

    async fn count_progress(&self, external_id: &str) -> ReviewResult<i64>;

    /// Item ids with no progress record for this user, ascending.
    async fn unseen_item_ids(&self, external_id: &str) -> ReviewResult<Vec<i64>>;

    async fn get_progress(&self, external_id: &str, item_id: i64) -> ReviewResult<Option<ProgressRecord>>;

    /// Creates the initial record; `None` if the pair is already tracked. Fails
    /// when `item_id` is not in the catalog.
    async fn insert_progress_if_absent(
        &self,
        external_id: &str,
        item_id: i64,
        ease_factor: f64,
        now: DateTime<Utc>,
    ) -> ReviewResult<Option<ProgressRecord>>;

    /// Overwrites the scheduling fields of an existing record. Returns `false`
    /// when no row matches the record's `(id, external_id, item_id)`.
    async fn update_progress(&self, record: &ProgressRecord) -> ReviewResult<bool>;
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    // An in-memory database lives only while some connection is open.
    _keepalive: Option<Arc<AsyncMutex<SqliteConnection>>>,
}

impl SqliteStore {
    pub async fn connect(config: &DbConfig) -> ReviewResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Private in-memory database.
    ///
    /// `sqlite::memory:` names a fresh shared-cache database per call, so every
    /// pool connection sees the same schema. A connection held outside the pool
    /// keeps it alive when the pool recycles its own.
    pub async fn in_memory() -> ReviewResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let keepalive = options.connect().await?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let mut store = Self::from_pool(pool).await?;
        store._keepalive = Some(Arc::new(AsyncMutex::new(keepalive)));
        Ok(store)
    }

    pub async fn from_pool(pool: SqlitePool) -> ReviewResult<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!("sqlite schema migrated");
        Ok(Self {
            pool,
            _keepalive: None,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ReviewStore for SqliteStore {
    async fn insert_item_if_absent(&self, term: &str, translation: &str) -> ReviewResult<bool> {
        operations::catalog::insert_item_if_absent(&self.pool, term, translation).await
    }

    async fn get_item(&self, item_id: i64) -> ReviewResult<Option<Item>> {
        operations::catalog::get_item(&self.pool, item_id).await
    }

    async fn count_items(&self) -> ReviewResult<i64> {
        operations::catalog::count_items(&self.pool).await
    }

    async fn ensure_user(&self, external_id: &str, daily_new_item_limit: i64) -> ReviewResult<User> {
        operations::users::ensure_user(&self.pool, external_id, daily_new_item_limit).await
    }

    async fn get_user(&self, external_id: &str) -> ReviewResult<Option<User>> {
        operations::users::get_user(&self.pool, external_id).await
    }

    async fn set_daily_new_item_limit(&self, external_id: &str, limit: i64) -> ReviewResult<bool> {
        operations::users::set_daily_new_item_limit(&self.pool, external_id, limit).await
    }

    async fn earliest_due(
        &self,
        external_id: &str,
        now: DateTime<Utc>,
    ) -> ReviewResult<Option<ProgressRecord>> {
        operations::progress::earliest_due(&self.pool, external_id, now).await
    }

    async fn count_due(&self, external_id: &str, now: DateTime<Utc>) -> ReviewResult<i64> {
        operations::progress::count_due(&self.pool, external_id, now).await
    }

    async fn count_added_between(
        &self,
        external_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ReviewResult<i64> {
        operations::progress::count_added_between(&self.pool, external_id, start, end).await
    }

    async fn count_progress(&self, external_id: &str) -> ReviewResult<i64> {
        operations::progress::count_progress(&self.pool, external_id).await
    }

    async fn unseen_item_ids(&self, external_id: &str) -> ReviewResult<Vec<i64>> {
        operations::progress::unseen_item_ids(&self.pool, external_id).await
    }

    async fn get_progress(&self, external_id: &str, item_id: i64) -> ReviewResult<Option<ProgressRecord>> {
        operations::progress::get_progress(&self.pool, external_id, item_id).await
    }

    async fn insert_progress_if_absent(
        &self,
        external_id: &str,
        item_id: i64,
        ease_factor: f64,
        now: DateTime<Utc>,
    ) -> ReviewResult<Option<ProgressRecord>> {
        operations::progress::insert_progress_if_absent(&self.pool, external_id, item_id, ease_factor, now)
            .await
    }

    async fn update_progress(&self, record: &ProgressRecord) -> ReviewResult<bool> {
        operations::progress::update_progress(&self.pool, record).await
    }
}
