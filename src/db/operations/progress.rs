use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::clock::{from_millis, to_millis};
use crate::error::{ReviewError, ReviewResult};
use crate::models::ProgressRecord;

const PROGRESS_COLUMNS: &str = "id, external_id, item_id, repetition_count, interval_days, \
     ease_factor, next_review_at, added_at";

#[derive(Debug, sqlx::FromRow)]
struct ProgressRow {
    id: i64,
    external_id: String,
    item_id: i64,
    repetition_count: i64,
    interval_days: i64,
    ease_factor: f64,
    next_review_at: i64,
    added_at: i64,
}

impl TryFrom<ProgressRow> for ProgressRecord {
    type Error = ReviewError;

    fn try_from(row: ProgressRow) -> Result<Self, Self::Error> {
        let decode = |field: &str, ms: i64| {
            from_millis(ms).ok_or_else(|| {
                ReviewError::Decode(format!("progress {} has invalid {field}: {ms}", row.id))
            })
        };
        let next_review_at = decode("next_review_at", row.next_review_at)?;
        let added_at = decode("added_at", row.added_at)?;

        Ok(ProgressRecord {
            id: row.id,
            external_id: row.external_id,
            item_id: row.item_id,
            repetition_count: row.repetition_count,
            interval_days: row.interval_days,
            ease_factor: row.ease_factor,
            next_review_at,
            added_at,
        })
    }
}

fn decode_optional(row: Option<ProgressRow>) -> ReviewResult<Option<ProgressRecord>> {
    row.map(ProgressRecord::try_from).transpose()
}

pub async fn earliest_due(
    pool: &SqlitePool,
    external_id: &str,
    now: DateTime<Utc>,
) -> ReviewResult<Option<ProgressRecord>> {
    let sql = format!(
        "SELECT {PROGRESS_COLUMNS} FROM progress_records \
         WHERE external_id = ?1 AND next_review_at <= ?2 \
         ORDER BY next_review_at ASC, id ASC \
         LIMIT 1"
    );
    let row = sqlx::query_as::<_, ProgressRow>(&sql)
        .bind(external_id)
        .bind(to_millis(now))
        .fetch_optional(pool)
        .await?;

    decode_optional(row)
}

pub async fn count_due(pool: &SqlitePool, external_id: &str, now: DateTime<Utc>) -> ReviewResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM progress_records WHERE external_id = ?1 AND next_review_at <= ?2",
    )
    .bind(external_id)
    .bind(to_millis(now))
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn count_added_between(
    pool: &SqlitePool,
    external_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> ReviewResult<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM progress_records
        WHERE external_id = ?1
          AND added_at >= ?2
          AND added_at < ?3
        "#,
    )
    .bind(external_id)
    .bind(to_millis(start))
    .bind(to_millis(end))
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn count_progress(pool: &SqlitePool, external_id: &str) -> ReviewResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM progress_records WHERE external_id = ?1")
        .bind(external_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn unseen_item_ids(pool: &SqlitePool, external_id: &str) -> ReviewResult<Vec<i64>> {
    let ids: Vec<i64> = sqlx::query_scalar(
        r#"
        SELECT i.id FROM items i
        WHERE NOT EXISTS (
            SELECT 1 FROM progress_records p
            WHERE p.external_id = ?1 AND p.item_id = i.id
        )
        ORDER BY i.id
        "#,
    )
    .bind(external_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

pub async fn get_progress(
    pool: &SqlitePool,
    external_id: &str,
    item_id: i64,
) -> ReviewResult<Option<ProgressRecord>> {
    let sql = format!(
        "SELECT {PROGRESS_COLUMNS} FROM progress_records WHERE external_id = ?1 AND item_id = ?2"
    );
    let row = sqlx::query_as::<_, ProgressRow>(&sql)
        .bind(external_id)
        .bind(item_id)
        .fetch_optional(pool)
        .await?;

    decode_optional(row)
}

pub async fn insert_progress_if_absent(
    pool: &SqlitePool,
    external_id: &str,
    item_id: i64,
    ease_factor: f64,
    now: DateTime<Utc>,
) -> ReviewResult<Option<ProgressRecord>> {
    let sql = format!(
        "INSERT INTO progress_records \
           (external_id, item_id, repetition_count, interval_days, ease_factor, next_review_at, added_at) \
         VALUES (?1, ?2, 0, 0, ?3, ?4, ?4) \
         ON CONFLICT (external_id, item_id) DO NOTHING \
         RETURNING {PROGRESS_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ProgressRow>(&sql)
        .bind(external_id)
        .bind(item_id)
        .bind(ease_factor)
        .bind(to_millis(now))
        .fetch_optional(pool)
        .await?;

    decode_optional(row)
}

pub async fn update_progress(pool: &SqlitePool, record: &ProgressRecord) -> ReviewResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE progress_records
        SET repetition_count = ?1,
            interval_days = ?2,
            ease_factor = ?3,
            next_review_at = ?4
        WHERE id = ?5 AND external_id = ?6 AND item_id = ?7
        "#,
    )
    .bind(record.repetition_count)
    .bind(record.interval_days)
    .bind(record.ease_factor)
    .bind(to_millis(record.next_review_at))
    .bind(record.id)
    .bind(&record.external_id)
    .bind(record.item_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
