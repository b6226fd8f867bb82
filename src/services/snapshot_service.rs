use std::collections::HashMap;

use chrono::{Duration, NaiveDate};

use crate::errors::AppError;
use crate::models::{PriceRecord, PriceSnapshots, Stock, StockSummary};
use crate::services::price_service::PriceStore;

pub const WEEK_LOOKBACK_DAYS: i64 = 7;
pub const MONTH_LOOKBACK_DAYS: i64 = 30;
pub const YEAR_LOOKBACK_DAYS: i64 = 365;

/// Latest record plus the nearest records on or before 7, 30 and 365 days
/// earlier than it. Market data has gaps, so the lookback lands on the
/// closest prior trading day rather than the exact date.
pub async fn derive_snapshots<S>(store: &S, stock_id: i64) -> Result<PriceSnapshots, AppError>
where
    S: PriceStore + ?Sized,
{
    let Some(latest) = store.latest(stock_id).await? else {
        return Ok(PriceSnapshots::default());
    };

    let anchor = latest.date;
    let week_before = store
        .on_or_before(stock_id, anchor - Duration::days(WEEK_LOOKBACK_DAYS))
        .await?;
    let month_before = store
        .on_or_before(stock_id, anchor - Duration::days(MONTH_LOOKBACK_DAYS))
        .await?;
    let year_before = store
        .on_or_before(stock_id, anchor - Duration::days(YEAR_LOOKBACK_DAYS))
        .await?;

    Ok(PriceSnapshots {
        latest: Some(latest),
        week_before,
        month_before,
        year_before,
    })
}

/// Snapshots for many stocks with one latest lookup and one lookup per lookback,
/// regardless of how many stocks are listed. Output keeps the input order.
pub async fn summarize<S>(store: &S, stocks: Vec<Stock>) -> Result<Vec<StockSummary>, AppError>
where
    S: PriceStore + ?Sized,
{
    let ids: Vec<i64> = stocks.iter().map(|s| s.id).collect();
    let mut latest = store.latest_batch(&ids).await?;

    let mut week_before = lookback_batch(store, &latest, WEEK_LOOKBACK_DAYS).await?;
    let mut month_before = lookback_batch(store, &latest, MONTH_LOOKBACK_DAYS).await?;
    let mut year_before = lookback_batch(store, &latest, YEAR_LOOKBACK_DAYS).await?;

    Ok(stocks
        .into_iter()
        .map(|stock| {
            let snapshots = PriceSnapshots {
                latest: latest.remove(&stock.id),
                week_before: week_before.remove(&stock.id),
                month_before: month_before.remove(&stock.id),
                year_before: year_before.remove(&stock.id),
            };
            StockSummary { stock, snapshots }
        })
        .collect())
}

async fn lookback_batch<S>(
    store: &S,
    latest: &HashMap<i64, PriceRecord>,
    days: i64,
) -> Result<HashMap<i64, PriceRecord>, AppError>
where
    S: PriceStore + ?Sized,
{
    let targets: Vec<(i64, NaiveDate)> = latest
        .values()
        .map(|record| (record.stock_id, record.date - Duration::days(days)))
        .collect();
    store.on_or_before_batch(&targets).await
}
