use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::{PgExecutor, PgPool};

use crate::models::{PriceFields, PriceRecord};

const PRICE_COLUMNS: &str = "id, stock_id, date, prev_close_price, open_price, high_price, \
     low_price, last_price, close_price, vwap, volume";

/// Inserts or overwrites the record for (stock_id, date).
pub async fn upsert<'e, E: PgExecutor<'e>>(
    executor: E,
    stock_id: i64,
    date: NaiveDate,
    fields: &PriceFields,
) -> Result<PriceRecord, sqlx::Error> {
    sqlx::query_as::<_, PriceRecord>(&format!(
        r#"
        INSERT INTO price_records
            (stock_id, date, prev_close_price, open_price, high_price,
             low_price, last_price, close_price, vwap, volume)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (stock_id, date) DO UPDATE
        SET prev_close_price = EXCLUDED.prev_close_price,
            open_price = EXCLUDED.open_price,
            high_price = EXCLUDED.high_price,
            low_price = EXCLUDED.low_price,
            last_price = EXCLUDED.last_price,
            close_price = EXCLUDED.close_price,
            vwap = EXCLUDED.vwap,
            volume = EXCLUDED.volume
        RETURNING {}
        "#,
        PRICE_COLUMNS
    ))
    .bind(stock_id)
    .bind(date)
    .bind(&fields.prev_close_price)
    .bind(&fields.open_price)
    .bind(&fields.high_price)
    .bind(&fields.low_price)
    .bind(&fields.last_price)
    .bind(&fields.close_price)
    .bind(&fields.vwap)
    .bind(fields.volume)
    .fetch_one(executor)
    .await
}

pub async fn fetch_latest<'e, E: PgExecutor<'e>>(
    executor: E,
    stock_id: i64,
) -> Result<Option<PriceRecord>, sqlx::Error> {
    sqlx::query_as::<_, PriceRecord>(&format!(
        "SELECT {} FROM price_records WHERE stock_id = $1 ORDER BY date DESC LIMIT 1",
        PRICE_COLUMNS
    ))
    .bind(stock_id)
    .fetch_optional(executor)
    .await
}

/// Most recent record dated on or before `target`.
pub async fn fetch_on_or_before<'e, E: PgExecutor<'e>>(
    executor: E,
    stock_id: i64,
    target: NaiveDate,
) -> Result<Option<PriceRecord>, sqlx::Error> {
    sqlx::query_as::<_, PriceRecord>(&format!(
        "SELECT {} FROM price_records
         WHERE stock_id = $1 AND date <= $2
         ORDER BY date DESC
         LIMIT 1",
        PRICE_COLUMNS
    ))
    .bind(stock_id)
    .bind(target)
    .fetch_optional(executor)
    .await
}

/// Latest record for each of `stock_ids`, keyed by stock id. Stocks without prices are absent.
pub async fn fetch_latest_batch(
    pool: &PgPool,
    stock_ids: &[i64],
) -> Result<HashMap<i64, PriceRecord>, sqlx::Error> {
    if stock_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let records = sqlx::query_as::<_, PriceRecord>(&format!(
        "SELECT DISTINCT ON (stock_id) {} FROM price_records
         WHERE stock_id = ANY($1)
         ORDER BY stock_id, date DESC",
        PRICE_COLUMNS
    ))
    .bind(stock_ids)
    .fetch_all(pool)
    .await?;

    Ok(records.into_iter().map(|r| (r.stock_id, r)).collect())
}

/// Most recent record on or before each stock's own target date, keyed by stock id.
pub async fn fetch_on_or_before_batch(
    pool: &PgPool,
    targets: &[(i64, NaiveDate)],
) -> Result<HashMap<i64, PriceRecord>, sqlx::Error> {
    if targets.is_empty() {
        return Ok(HashMap::new());
    }

    let (stock_ids, dates): (Vec<i64>, Vec<NaiveDate>) = targets.iter().copied().unzip();
    let records = sqlx::query_as::<_, PriceRecord>(
        "SELECT DISTINCT ON (p.stock_id)
                p.id, p.stock_id, p.date, p.prev_close_price, p.open_price, p.high_price,
                p.low_price, p.last_price, p.close_price, p.vwap, p.volume
           FROM UNNEST($1::BIGINT[], $2::DATE[]) AS t(sid, target)
           JOIN price_records p ON p.stock_id = t.sid AND p.date <= t.target
          ORDER BY p.stock_id, p.date DESC",
    )
    .bind(&stock_ids)
    .bind(&dates)
    .fetch_all(pool)
    .await?;

    Ok(records.into_iter().map(|r| (r.stock_id, r)).collect())
}

pub async fn fetch_one(pool: &PgPool, id: i64) -> Result<Option<PriceRecord>, sqlx::Error> {
    sqlx::query_as::<_, PriceRecord>(&format!(
        "SELECT {} FROM price_records WHERE id = $1",
        PRICE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_page(
    pool: &PgPool,
    stock_id: Option<i64>,
    limit: i64,
) -> Result<Vec<PriceRecord>, sqlx::Error> {
    sqlx::query_as::<_, PriceRecord>(&format!(
        "SELECT {} FROM price_records
         WHERE ($1::BIGINT IS NULL OR stock_id = $1)
         ORDER BY date DESC, stock_id ASC
         LIMIT $2",
        PRICE_COLUMNS
    ))
    .bind(stock_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Full history of one stock, most recent first.
pub async fn fetch_history(pool: &PgPool, stock_id: i64) -> Result<Vec<PriceRecord>, sqlx::Error> {
    sqlx::query_as::<_, PriceRecord>(&format!(
        "SELECT {} FROM price_records WHERE stock_id = $1 ORDER BY date DESC",
        PRICE_COLUMNS
    ))
    .bind(stock_id)
    .fetch_all(pool)
    .await
}

/// Histories for several stocks in one round trip, grouped by stock id, most recent first.
pub async fn fetch_history_batch(
    pool: &PgPool,
    stock_ids: &[i64],
) -> Result<HashMap<i64, Vec<PriceRecord>>, sqlx::Error> {
    if stock_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let records = sqlx::query_as::<_, PriceRecord>(&format!(
        "SELECT {} FROM price_records
         WHERE stock_id = ANY($1)
         ORDER BY stock_id, date DESC",
        PRICE_COLUMNS
    ))
    .bind(stock_ids)
    .fetch_all(pool)
    .await?;

    let mut result: HashMap<i64, Vec<PriceRecord>> = HashMap::new();
    for record in records {
        result.entry(record.stock_id).or_default().push(record);
    }

    Ok(result)
}
