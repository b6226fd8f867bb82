use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::Stock;
use crate::services::stock_service;

/// Members of the owner's watchlist; empty when no watchlist exists. Never creates one.
pub async fn get_or_empty(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Stock>, AppError> {
    if db::watchlist_queries::fetch_for_owner(pool, owner_id).await?.is_none() {
        return Ok(Vec::new());
    }
    let stocks = db::watchlist_queries::fetch_stocks(pool, owner_id).await?;
    Ok(stocks)
}

/// Adds a stock, creating the watchlist on first use. Adding a member twice is a no-op.
pub async fn add_stock(pool: &PgPool, owner_id: Uuid, stock_id: i64) -> Result<(), AppError> {
    stock_service::require(pool, stock_id).await?;

    let mut tx = pool.begin().await?;
    let watchlist = db::watchlist_queries::get_or_create(&mut *tx, owner_id).await?;
    let added = db::watchlist_queries::add_stock(&mut *tx, watchlist.id, stock_id).await?;
    tx.commit().await?;

    if added {
        info!("Added stock {} to watchlist {}", stock_id, watchlist.id);
    }
    Ok(())
}

/// Removes a stock. Removing a non-member is a no-op; an unknown stock is NotFound.
pub async fn remove_stock(pool: &PgPool, owner_id: Uuid, stock_id: i64) -> Result<(), AppError> {
    stock_service::require(pool, stock_id).await?;

    let removed = db::watchlist_queries::remove_stock(pool, owner_id, stock_id).await?;
    if removed > 0 {
        info!("Removed stock {} from watchlist of {}", stock_id, owner_id);
    }
    Ok(())
}
