use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::db::ReviewStore;
use crate::error::{ReviewError, ReviewResult};
use crate::models::{Item, ProgressRecord, User};

#[derive(Debug, Default)]
struct MemoryState {
    items: BTreeMap<i64, Item>,
    item_ids_by_term: HashMap<String, i64>,
    users: HashMap<String, User>,
    progress: BTreeMap<i64, ProgressRecord>,
    progress_ids: HashMap<(String, i64), i64>,
    next_item_id: i64,
    next_user_id: i64,
    next_progress_id: i64,
}

impl MemoryState {
    fn user_progress<'a>(&'a self, external_id: &'a str) -> impl Iterator<Item = &'a ProgressRecord> + 'a {
        self.progress
            .values()
            .filter(move |record| record.external_id == external_id)
    }
}

/// Process-local store with the same uniqueness rules as the SQLite schema.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn insert_item_if_absent(&self, term: &str, translation: &str) -> ReviewResult<bool> {
        let mut state = self.state.lock();
        if state.item_ids_by_term.contains_key(term) {
            return Ok(false);
        }
        state.next_item_id += 1;
        let id = state.next_item_id;
        state.item_ids_by_term.insert(term.to_string(), id);
        state.items.insert(
            id,
            Item {
                id,
                term: term.to_string(),
                translation: translation.to_string(),
            },
        );
        Ok(true)
    }

    async fn get_item(&self, item_id: i64) -> ReviewResult<Option<Item>> {
        Ok(self.state.lock().items.get(&item_id).cloned())
    }

    async fn count_items(&self) -> ReviewResult<i64> {
        Ok(self.state.lock().items.len() as i64)
    }

    async fn ensure_user(&self, external_id: &str, daily_new_item_limit: i64) -> ReviewResult<User> {
        let mut state = self.state.lock();
        if let Some(user) = state.users.get(external_id) {
            return Ok(user.clone());
        }
        state.next_user_id += 1;
        let user = User {
            id: state.next_user_id,
            external_id: external_id.to_string(),
            daily_new_item_limit,
        };
        state.users.insert(external_id.to_string(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, external_id: &str) -> ReviewResult<Option<User>> {
        Ok(self.state.lock().users.get(external_id).cloned())
    }

    async fn set_daily_new_item_limit(&self, external_id: &str, limit: i64) -> ReviewResult<bool> {
        let mut state = self.state.lock();
        match state.users.get_mut(external_id) {
            Some(user) => {
                user.daily_new_item_limit = limit;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn earliest_due(
        &self,
        external_id: &str,
        now: DateTime<Utc>,
    ) -> ReviewResult<Option<ProgressRecord>> {
        let state = self.state.lock();
        Ok(state
            .user_progress(external_id)
            .filter(|record| record.is_due(now))
            .min_by_key(|record| (record.next_review_at, record.id))
            .cloned())
    }

    async fn count_due(&self, external_id: &str, now: DateTime<Utc>) -> ReviewResult<i64> {
        let state = self.state.lock();
        Ok(state
            .user_progress(external_id)
            .filter(|record| record.is_due(now))
            .count() as i64)
    }

    async fn count_added_between(
        &self,
        external_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ReviewResult<i64> {
        let state = self.state.lock();
        Ok(state
            .user_progress(external_id)
            .filter(|record| record.added_at >= start && record.added_at < end)
            .count() as i64)
    }

    async fn count_progress(&self, external_id: &str) -> ReviewResult<i64> {
        Ok(self.state.lock().user_progress(external_id).count() as i64)
    }

    async fn unseen_item_ids(&self, external_id: &str) -> ReviewResult<Vec<i64>> {
        let state = self.state.lock();
        Ok(state
            .items
            .keys()
            .filter(|id| !state.progress_ids.contains_key(&(external_id.to_string(), **id)))
            .copied()
            .collect())
    }

    async fn get_progress(&self, external_id: &str, item_id: i64) -> ReviewResult<Option<ProgressRecord>> {
        let state = self.state.lock();
        Ok(state
            .progress_ids
            .get(&(external_id.to_string(), item_id))
            .and_then(|id| state.progress.get(id))
            .cloned())
    }

    async fn insert_progress_if_absent(
        &self,
        external_id: &str,
        item_id: i64,
        ease_factor: f64,
        now: DateTime<Utc>,
    ) -> ReviewResult<Option<ProgressRecord>> {
        let mut state = self.state.lock();
        if !state.items.contains_key(&item_id) {
            return Err(ReviewError::NotFound(format!("item {item_id}")));
        }
        let key = (external_id.to_string(), item_id);
        if state.progress_ids.contains_key(&key) {
            return Ok(None);
        }
        state.next_progress_id += 1;
        let record = ProgressRecord {
            id: state.next_progress_id,
            external_id: external_id.to_string(),
            item_id,
            repetition_count: 0,
            interval_days: 0,
            ease_factor,
            next_review_at: now,
            added_at: now,
        };
        state.progress_ids.insert(key, record.id);
        state.progress.insert(record.id, record.clone());
        Ok(Some(record))
    }

    async fn update_progress(&self, record: &ProgressRecord) -> ReviewResult<bool> {
        let mut state = self.state.lock();
        match state.progress.get_mut(&record.id) {
            Some(stored)
                if stored.external_id == record.external_id && stored.item_id == record.item_id =>
            {
                stored.repetition_count = record.repetition_count;
                stored.interval_days = record.interval_days;
                stored.ease_factor = record.ease_factor;
                stored.next_review_at = record.next_review_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
