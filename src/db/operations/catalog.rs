use sqlx::SqlitePool;

use crate::error::ReviewResult;
use crate::models::Item;

pub async fn insert_item_if_absent(
    pool: &SqlitePool,
    term: &str,
    translation: &str,
) -> ReviewResult<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO items (term, translation)
        VALUES (?1, ?2)
        ON CONFLICT (term) DO NOTHING
        "#,
    )
    .bind(term)
    .bind(translation)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_item(pool: &SqlitePool, item_id: i64) -> ReviewResult<Option<Item>> {
    let row = sqlx::query_as::<_, (i64, String, String)>(
        "SELECT id, term, translation FROM items WHERE id = ?1",
    )
    .bind(item_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, term, translation)| Item {
        id,
        term,
        translation,
    }))
}

pub async fn count_items(pool: &SqlitePool) -> ReviewResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
