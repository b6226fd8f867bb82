//! Holdings are only reached through a portfolio id that the caller has already
//! resolved through the owner-scoped portfolio queries.

use std::collections::HashMap;

use bigdecimal::BigDecimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::HoldingView;

const VIEW_SELECT: &str = r#"
    SELECT h.portfolio_id, h.stock_id, s.ticker, h.buy_price, h.shares,
           (SELECT p.close_price
              FROM price_records p
             WHERE p.stock_id = h.stock_id
             ORDER BY p.date DESC
             LIMIT 1) AS current_close
      FROM holdings h
      JOIN stocks s ON s.id = h.stock_id
"#;

/// Atomic create-or-overwrite keyed on (portfolio_id, stock_id). Returns true when the
/// row was inserted, false when an existing one was overwritten (`xmax = 0` holds only
/// for a fresh insert). An overwrite keeps the row's `seq`, so its position is unchanged.
pub async fn upsert<'e, E: PgExecutor<'e>>(
    executor: E,
    portfolio_id: Uuid,
    stock_id: i64,
    buy_price: &BigDecimal,
    shares: &BigDecimal,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"
        INSERT INTO holdings (id, portfolio_id, stock_id, buy_price, shares)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (portfolio_id, stock_id) DO UPDATE
        SET buy_price = EXCLUDED.buy_price,
            shares = EXCLUDED.shares
        RETURNING (xmax = 0) AS inserted
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(portfolio_id)
    .bind(stock_id)
    .bind(buy_price)
    .bind(shares)
    .fetch_one(executor)
    .await
}

pub async fn fetch_views<'e, E: PgExecutor<'e>>(
    executor: E,
    portfolio_id: Uuid,
) -> Result<Vec<HoldingView>, sqlx::Error> {
    sqlx::query_as::<_, HoldingView>(&format!(
        "{} WHERE h.portfolio_id = $1 ORDER BY h.seq ASC",
        VIEW_SELECT
    ))
    .bind(portfolio_id)
    .fetch_all(executor)
    .await
}

pub async fn fetch_views_batch(
    pool: &PgPool,
    portfolio_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<HoldingView>>, sqlx::Error> {
    if portfolio_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let views = sqlx::query_as::<_, HoldingView>(&format!(
        "{} WHERE h.portfolio_id = ANY($1) ORDER BY h.portfolio_id, h.seq ASC",
        VIEW_SELECT
    ))
    .bind(portfolio_ids)
    .fetch_all(pool)
    .await?;

    let mut result: HashMap<Uuid, Vec<HoldingView>> = HashMap::new();
    for view in views {
        result.entry(view.portfolio_id).or_default().push(view);
    }
    Ok(result)
}

pub async fn fetch_view_for_stock<'e, E: PgExecutor<'e>>(
    executor: E,
    portfolio_id: Uuid,
    stock_id: i64,
) -> Result<Option<HoldingView>, sqlx::Error> {
    sqlx::query_as::<_, HoldingView>(&format!(
        "{} WHERE h.portfolio_id = $1 AND h.stock_id = $2",
        VIEW_SELECT
    ))
    .bind(portfolio_id)
    .bind(stock_id)
    .fetch_optional(executor)
    .await
}

/// The holding at a 0-based offset in insertion order.
pub async fn fetch_view_at<'e, E: PgExecutor<'e>>(
    executor: E,
    portfolio_id: Uuid,
    offset: i64,
) -> Result<Option<HoldingView>, sqlx::Error> {
    sqlx::query_as::<_, HoldingView>(&format!(
        "{} WHERE h.portfolio_id = $1 ORDER BY h.seq ASC OFFSET $2 LIMIT 1",
        VIEW_SELECT
    ))
    .bind(portfolio_id)
    .bind(offset)
    .fetch_optional(executor)
    .await
}

pub async fn delete_at<'e, E: PgExecutor<'e>>(
    executor: E,
    portfolio_id: Uuid,
    offset: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM holdings
        WHERE id = (
            SELECT id FROM holdings
            WHERE portfolio_id = $1
            ORDER BY seq ASC
            OFFSET $2
            LIMIT 1
        )
        "#,
    )
    .bind(portfolio_id)
    .bind(offset)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}
