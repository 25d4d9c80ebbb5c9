use chrono::{DateTime, Utc};

use crate::clock::utc_day_bounds;
use crate::db::ReviewStore;
use crate::error::{ReviewError, ReviewResult};
use crate::models::{ReviewCard, INITIAL_EASE_FACTOR};
use crate::services::picker::ItemPicker;

/// Effective daily cap: the stored per-user limit, else `default_limit`.
pub async fn daily_new_item_limit(
    store: &dyn ReviewStore,
    external_id: &str,
    default_limit: i64,
) -> ReviewResult<i64> {
    Ok(store
        .get_user(external_id)
        .await?
        .map(|user| user.daily_new_item_limit)
        .unwrap_or(default_limit))
}

pub async fn new_items_today(
    store: &dyn ReviewStore,
    external_id: &str,
    now: DateTime<Utc>,
) -> ReviewResult<i64> {
    let (start, end) = utc_day_bounds(now);
    store.count_added_between(external_id, start, end).await
}

/// Most overdue review first; otherwise a fresh item while today's cap allows.
///
/// Introducing a fresh item persists its progress record. `None` means there
/// is nothing to present right now.
pub async fn select_next(
    store: &dyn ReviewStore,
    picker: &dyn ItemPicker,
    external_id: &str,
    now: DateTime<Utc>,
    default_limit: i64,
) -> ReviewResult<Option<ReviewCard>> {
    if let Some(record) = store.earliest_due(external_id, now).await? {
        let item = store.get_item(record.item_id).await?.ok_or_else(|| {
            ReviewError::NotFound(format!("item {} for progress {}", record.item_id, record.id))
        })?;
        tracing::debug!(user_id = %external_id, item_id = item.id, "due review selected");
        return Ok(Some(ReviewCard {
            record,
            item,
            is_new: false,
        }));
    }

    let limit = daily_new_item_limit(store, external_id, default_limit).await?;
    let admitted = new_items_today(store, external_id, now).await?;
    if admitted >= limit {
        tracing::debug!(user_id = %external_id, admitted, limit, "daily new item cap reached");
        return Ok(None);
    }

    let candidates = store.unseen_item_ids(external_id).await?;
    let Some(item_id) = picker.pick(&candidates) else {
        tracing::debug!(user_id = %external_id, "catalog exhausted");
        return Ok(None);
    };

    let item = store
        .get_item(item_id)
        .await?
        .ok_or_else(|| ReviewError::NotFound(format!("item {item_id}")))?;
    let record = store
        .insert_progress_if_absent(external_id, item_id, INITIAL_EASE_FACTOR, now)
        .await?
        .ok_or_else(|| {
            ReviewError::Validation(format!(
                "item {item_id} is already tracked for user {external_id}"
            ))
        })?;

    tracing::info!(
        user_id = %external_id,
        item_id,
        admitted = admitted + 1,
        limit,
        "new item introduced"
    );

    Ok(Some(ReviewCard {
        record,
        item,
        is_new: true,
    }))
}
