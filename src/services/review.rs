use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::SchedulerConfig;
use crate::db::ReviewStore;
use crate::error::{ReviewError, ReviewResult};
use crate::models::{CatalogRow, IngestReport, ProgressRecord, RejectedRow, ReviewCard, User, UserOverview};
use crate::services::picker::{ItemPicker, UniformPicker};
use crate::services::selector;
use crate::services::sm2::{self, Grade};
use crate::services::user_locks::UserLocks;

/// Entry point for the orchestrator. Holds no per-user state besides the
/// lock registry; everything durable lives in the store.
#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn ReviewStore>,
    picker: Arc<dyn ItemPicker>,
    clock: Arc<dyn Clock>,
    locks: UserLocks,
    config: SchedulerConfig,
}

impl ReviewService {
    pub fn new(store: Arc<dyn ReviewStore>, config: SchedulerConfig) -> Self {
        Self {
            store,
            picker: Arc::new(UniformPicker),
            clock: Arc::new(SystemClock),
            locks: UserLocks::new(),
            config,
        }
    }

    pub fn with_picker(mut self, picker: Arc<dyn ItemPicker>) -> Self {
        self.picker = picker;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn ReviewStore> {
        &self.store
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub async fn register_user(&self, external_id: &str) -> ReviewResult<User> {
        let external_id = validate_external_id(external_id)?;
        let user = self
            .store
            .ensure_user(external_id, self.config.default_daily_new_items)
            .await?;
        tracing::debug!(user_id = %external_id, limit = user.daily_new_item_limit, "user registered");
        Ok(user)
    }

    pub async fn set_daily_new_item_limit(&self, external_id: &str, limit: i64) -> ReviewResult<User> {
        let external_id = validate_external_id(external_id)?;
        if limit < 0 {
            return Err(ReviewError::Validation(format!(
                "daily new item limit must be non-negative, got {limit}"
            )));
        }
        if !self.store.set_daily_new_item_limit(external_id, limit).await? {
            return Err(ReviewError::NotFound(format!("user {external_id}")));
        }
        self.store
            .get_user(external_id)
            .await?
            .ok_or_else(|| ReviewError::NotFound(format!("user {external_id}")))
    }

    /// Inserts each well-formed row unless its term already exists. Malformed
    /// rows and per-row storage failures are reported, never fatal.
    pub async fn ingest_catalog<I>(&self, rows: I) -> ReviewResult<IngestReport>
    where
        I: IntoIterator,
        I::Item: Into<CatalogRow>,
    {
        let mut report = IngestReport::default();

        for (index, row) in rows.into_iter().enumerate() {
            let row_number = index + 1;
            let (term, translation) = match row.into().normalized() {
                Ok(pair) => pair,
                Err(reason) => {
                    tracing::warn!(row = row_number, %reason, "catalog row rejected");
                    report.rejected.push(RejectedRow {
                        row: row_number,
                        reason,
                    });
                    continue;
                }
            };

            match self.store.insert_item_if_absent(&term, &translation).await {
                Ok(true) => report.inserted += 1,
                Ok(false) => report.duplicates += 1,
                Err(err) => {
                    tracing::error!(row = row_number, %term, error = %err, "catalog insert failed");
                    report.rejected.push(RejectedRow {
                        row: row_number,
                        reason: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            inserted = report.inserted,
            duplicates = report.duplicates,
            rejected = report.rejected.len(),
            "catalog ingested"
        );
        Ok(report)
    }

    pub async fn select_next(&self, external_id: &str) -> ReviewResult<Option<ReviewCard>> {
        let external_id = validate_external_id(external_id)?;
        let _guard = self.locks.lock(external_id).await;
        selector::select_next(
            self.store.as_ref(),
            self.picker.as_ref(),
            external_id,
            self.clock.now(),
            self.config.default_daily_new_items,
        )
        .await
    }

    /// Applies `grade` to a persisted record and stores the result in place.
    pub async fn schedule(&self, record: &ProgressRecord, grade: Grade) -> ReviewResult<ProgressRecord> {
        let _guard = self.locks.lock(&record.external_id).await;
        let updated = sm2::apply_grade(record, grade, self.clock.now());

        if !self.store.update_progress(&updated).await? {
            return Err(ReviewError::NotFound(format!(
                "progress {} for user {} item {}",
                record.id, record.external_id, record.item_id
            )));
        }

        tracing::info!(
            user_id = %record.external_id,
            item_id = record.item_id,
            grade = grade.value(),
            repetition_count = updated.repetition_count,
            interval_days = updated.interval_days,
            ease_factor = updated.ease_factor,
            "review scheduled"
        );
        Ok(updated)
    }

    pub async fn overview(&self, external_id: &str) -> ReviewResult<UserOverview> {
        let external_id = validate_external_id(external_id)?;
        let now = self.clock.now();
        let user = self.store.get_user(external_id).await?;
        let daily_new_item_limit = user
            .as_ref()
            .map(|u| u.daily_new_item_limit)
            .unwrap_or(self.config.default_daily_new_items);

        let tracked_items = self.store.count_progress(external_id).await?;
        let due_now = self.store.count_due(external_id, now).await?;
        let new_today = selector::new_items_today(self.store.as_ref(), external_id, now).await?;
        let catalog_size = self.store.count_items().await?;

        Ok(UserOverview {
            external_id: external_id.to_string(),
            registered: user.is_some(),
            daily_new_item_limit,
            tracked_items,
            due_now,
            new_today,
            remaining_new_today: (daily_new_item_limit - new_today).max(0),
            unseen_items: (catalog_size - tracked_items).max(0),
        })
    }
}

fn validate_external_id(external_id: &str) -> ReviewResult<&str> {
    let trimmed = external_id.trim();
    if trimmed.is_empty() {
        return Err(ReviewError::Validation("user id must not be empty".to_string()));
    }
    Ok(trimmed)
}
