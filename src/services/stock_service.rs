use sqlx::PgPool;

use crate::db;
use crate::errors::AppError;
use crate::models::{Stock, StockListQuery, StockView, StockWithPrices};
use crate::services::snapshot_service;

pub async fn list(pool: &PgPool, query: &StockListQuery) -> Result<Vec<StockView>, AppError> {
    let stocks = db::stock_queries::fetch_all(
        pool,
        query.search.as_deref(),
        query.industry.as_deref(),
    )
    .await?;

    if query.wants_prices() {
        let ids: Vec<i64> = stocks.iter().map(|s| s.id).collect();
        let mut histories = db::price_queries::fetch_history_batch(pool, &ids).await?;
        let views = stocks
            .into_iter()
            .map(|stock| {
                let prices = histories.remove(&stock.id).unwrap_or_default();
                StockView::Full(StockWithPrices { stock, prices })
            })
            .collect();
        return Ok(views);
    }

    let summaries = snapshot_service::summarize(pool, stocks).await?;
    Ok(summaries.into_iter().map(StockView::Basic).collect())
}

pub async fn fetch_one(pool: &PgPool, id: i64, with_prices: bool) -> Result<StockView, AppError> {
    let stock = require(pool, id).await?;

    if with_prices {
        let prices = db::price_queries::fetch_history(pool, id).await?;
        return Ok(StockView::Full(StockWithPrices { stock, prices }));
    }

    let mut summaries = snapshot_service::summarize(pool, vec![stock]).await?;
    summaries
        .pop()
        .map(StockView::Basic)
        .ok_or_else(|| AppError::NotFound(format!("Stock {} not found", id)))
}

/// Resolves a stock by primary id or fails with NotFound.
pub async fn require(pool: &PgPool, id: i64) -> Result<Stock, AppError> {
    db::stock_queries::fetch_one(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Stock {} not found", id)))
}
