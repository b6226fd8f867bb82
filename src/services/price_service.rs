use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::error;

use crate::db;
use crate::errors::AppError;
use crate::models::{PriceListQuery, PriceRecord};

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 1000;

/// Read side of the price store: the lookups the snapshot derivation needs.
/// The batch forms default to one lookup per stock.
#[async_trait]
pub trait PriceStore: Send + Sync {
    async fn latest(&self, stock_id: i64) -> Result<Option<PriceRecord>, AppError>;

    async fn on_or_before(
        &self,
        stock_id: i64,
        target: NaiveDate,
    ) -> Result<Option<PriceRecord>, AppError>;

    async fn latest_batch(&self, stock_ids: &[i64]) -> Result<HashMap<i64, PriceRecord>, AppError> {
        let mut found = HashMap::new();
        for &stock_id in stock_ids {
            if let Some(record) = self.latest(stock_id).await? {
                found.insert(stock_id, record);
            }
        }
        Ok(found)
    }

    async fn on_or_before_batch(
        &self,
        targets: &[(i64, NaiveDate)],
    ) -> Result<HashMap<i64, PriceRecord>, AppError> {
        let mut found = HashMap::new();
        for &(stock_id, target) in targets {
            if let Some(record) = self.on_or_before(stock_id, target).await? {
                found.insert(stock_id, record);
            }
        }
        Ok(found)
    }
}

#[async_trait]
impl PriceStore for PgPool {
    async fn latest(&self, stock_id: i64) -> Result<Option<PriceRecord>, AppError> {
        db::price_queries::fetch_latest(self, stock_id)
            .await
            .map_err(|e| {
                error!("Failed to fetch latest price for stock {}: {}", stock_id, e);
                AppError::Db(e)
            })
    }

    async fn on_or_before(
        &self,
        stock_id: i64,
        target: NaiveDate,
    ) -> Result<Option<PriceRecord>, AppError> {
        db::price_queries::fetch_on_or_before(self, stock_id, target)
            .await
            .map_err(|e| {
                error!("Failed to fetch price on or before {} for stock {}: {}", target, stock_id, e);
                AppError::Db(e)
            })
    }

    async fn latest_batch(&self, stock_ids: &[i64]) -> Result<HashMap<i64, PriceRecord>, AppError> {
        db::price_queries::fetch_latest_batch(self, stock_ids)
            .await
            .map_err(|e| {
                error!("Failed to fetch latest prices for {} stocks: {}", stock_ids.len(), e);
                AppError::Db(e)
            })
    }

    async fn on_or_before_batch(
        &self,
        targets: &[(i64, NaiveDate)],
    ) -> Result<HashMap<i64, PriceRecord>, AppError> {
        db::price_queries::fetch_on_or_before_batch(self, targets)
            .await
            .map_err(|e| {
                error!("Failed to fetch lookback prices for {} stocks: {}", targets.len(), e);
                AppError::Db(e)
            })
    }
}

pub async fn list(pool: &PgPool, query: &PriceListQuery) -> Result<Vec<PriceRecord>, AppError> {
    let limit = clamp_limit(query.limit)?;
    let records = db::price_queries::fetch_page(pool, query.stock_id, limit).await?;
    Ok(records)
}

pub async fn fetch_one(pool: &PgPool, id: i64) -> Result<PriceRecord, AppError> {
    db::price_queries::fetch_one(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Price record {} not found", id)))
}

fn clamp_limit(limit: Option<i64>) -> Result<i64, AppError> {
    match limit {
        None => Ok(DEFAULT_PAGE_SIZE),
        Some(n) if n < 1 => Err(AppError::Validation("limit must be at least 1".into())),
        Some(n) => Ok(n.min(MAX_PAGE_SIZE)),
    }
}
