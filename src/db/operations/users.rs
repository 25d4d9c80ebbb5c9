use sqlx::SqlitePool;

use crate::error::{ReviewError, ReviewResult};
use crate::models::User;

pub async fn ensure_user(
    pool: &SqlitePool,
    external_id: &str,
    daily_new_item_limit: i64,
) -> ReviewResult<User> {
    sqlx::query(
        r#"
        INSERT INTO users (external_id, daily_new_item_limit)
        VALUES (?1, ?2)
        ON CONFLICT (external_id) DO NOTHING
        "#,
    )
    .bind(external_id)
    .bind(daily_new_item_limit)
    .execute(pool)
    .await?;

    get_user(pool, external_id)
        .await?
        .ok_or_else(|| ReviewError::NotFound(format!("user {external_id}")))
}

pub async fn get_user(pool: &SqlitePool, external_id: &str) -> ReviewResult<Option<User>> {
    let row = sqlx::query_as::<_, (i64, String, i64)>(
        "SELECT id, external_id, daily_new_item_limit FROM users WHERE external_id = ?1",
    )
    .bind(external_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, external_id, daily_new_item_limit)| User {
        id,
        external_id,
        daily_new_item_limit,
    }))
}

pub async fn set_daily_new_item_limit(
    pool: &SqlitePool,
    external_id: &str,
    limit: i64,
) -> ReviewResult<bool> {
    let result = sqlx::query("UPDATE users SET daily_new_item_limit = ?1 WHERE external_id = ?2")
        .bind(limit)
        .bind(external_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
