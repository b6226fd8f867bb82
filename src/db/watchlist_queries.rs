use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::{Stock, Watchlist};

pub async fn fetch_for_owner(pool: &PgPool, owner_id: Uuid) -> Result<Option<Watchlist>, sqlx::Error> {
    sqlx::query_as::<_, Watchlist>(
        "SELECT id, owner_id, created_at FROM watchlists WHERE owner_id = $1",
    )
    .bind(owner_id)
    .fetch_optional(pool)
    .await
}

/// Returns the owner's watchlist, creating it if absent. Safe under concurrent callers.
pub async fn get_or_create<'e, E: PgExecutor<'e>>(
    executor: E,
    owner_id: Uuid,
) -> Result<Watchlist, sqlx::Error> {
    sqlx::query_as::<_, Watchlist>(
        r#"
        INSERT INTO watchlists (id, owner_id)
        VALUES ($1, $2)
        ON CONFLICT (owner_id) DO UPDATE SET owner_id = EXCLUDED.owner_id
        RETURNING id, owner_id, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(owner_id)
    .fetch_one(executor)
    .await
}

/// Returns true when the stock was not already a member.
pub async fn add_stock<'e, E: PgExecutor<'e>>(
    executor: E,
    watchlist_id: Uuid,
    stock_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO watchlist_stocks (watchlist_id, stock_id)
         VALUES ($1, $2)
         ON CONFLICT DO NOTHING",
    )
    .bind(watchlist_id)
    .bind(stock_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn remove_stock(pool: &PgPool, owner_id: Uuid, stock_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM watchlist_stocks ws
        USING watchlists w
        WHERE ws.watchlist_id = w.id
          AND w.owner_id = $1
          AND ws.stock_id = $2
        "#,
    )
    .bind(owner_id)
    .bind(stock_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn fetch_stocks(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Stock>, sqlx::Error> {
    sqlx::query_as::<_, Stock>(
        r#"
        SELECT s.id, s.ticker, s.company_name, s.series, s.industry
        FROM watchlist_stocks ws
        JOIN watchlists w ON w.id = ws.watchlist_id
        JOIN stocks s ON s.id = ws.stock_id
        WHERE w.owner_id = $1
        ORDER BY s.ticker ASC
        "#,
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await
}
