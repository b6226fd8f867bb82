use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{fits_numeric_column, HoldingOutcome, HoldingView, UpsertHoldingRequest};
use crate::services::portfolio_service;

/// Adds the stock to the portfolio or overwrites the existing holding's buy price and shares.
/// The existence check and the write happen in one statement, so concurrent identical
/// requests never produce two holdings for the same stock.
pub async fn add_or_update(
    pool: &PgPool,
    owner_id: Uuid,
    portfolio_id: Uuid,
    stock_id: i64,
    input: &UpsertHoldingRequest,
) -> Result<(HoldingOutcome, HoldingView), AppError> {
    let mut tx = pool.begin().await?;

    db::portfolio_queries::fetch_one_for_update(&mut *tx, portfolio_id, owner_id)
        .await?
        .ok_or_else(|| portfolio_service::not_found(portfolio_id))?;

    db::stock_queries::fetch_one(&mut *tx, stock_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock not found".into()))?;

    let buy_price = parse_amount("buy_price", input.buy_price.as_ref())?;
    let shares = parse_amount("shares", input.shares.as_ref())?;

    let inserted = db::holding_queries::upsert(&mut *tx, portfolio_id, stock_id, &buy_price, &shares).await?;
    let view = db::holding_queries::fetch_view_for_stock(&mut *tx, portfolio_id, stock_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock not found in portfolio".into()))?;

    tx.commit().await?;

    let outcome = if inserted { HoldingOutcome::Added } else { HoldingOutcome::Updated };
    info!("Holding {:?} for stock {} in portfolio {}", outcome, stock_id, portfolio_id);
    Ok((outcome, view))
}

pub async fn get_by_position(
    pool: &PgPool,
    owner_id: Uuid,
    portfolio_id: Uuid,
    position: &str,
) -> Result<HoldingView, AppError> {
    let offset = parse_position(position)?;
    let portfolio = portfolio_service::require(pool, owner_id, portfolio_id).await?;

    db::holding_queries::fetch_view_at(pool, portfolio.id, offset)
        .await?
        .ok_or_else(position_not_found)
}

pub async fn remove_by_position(
    pool: &PgPool,
    owner_id: Uuid,
    portfolio_id: Uuid,
    position: &str,
) -> Result<(), AppError> {
    let offset = parse_position(position)?;

    let mut tx = pool.begin().await?;
    db::portfolio_queries::fetch_one_for_update(&mut *tx, portfolio_id, owner_id)
        .await?
        .ok_or_else(|| portfolio_service::not_found(portfolio_id))?;

    let removed = db::holding_queries::delete_at(&mut *tx, portfolio_id, offset).await?;
    if removed == 0 {
        return Err(position_not_found());
    }
    tx.commit().await?;

    info!("Removed holding at position {} from portfolio {}", position, portfolio_id);
    Ok(())
}

/// Converts a 1-indexed position token into a 0-based offset.
/// Anything that is not a positive integer addresses nothing.
pub fn parse_position(token: &str) -> Result<i64, AppError> {
    match token.trim().parse::<i64>() {
        Ok(position) if position >= 1 => Ok(position - 1),
        _ => Err(position_not_found()),
    }
}

/// Parses a buy price or share count supplied as a JSON number or numeric string.
pub fn parse_amount(field: &str, value: Option<&Value>) -> Result<BigDecimal, AppError> {
    let amount = match value {
        None | Some(Value::Null) => {
            return Err(AppError::Validation("buy_price and shares are required.".into()));
        }
        Some(Value::Number(n)) => BigDecimal::from_str(&n.to_string()).ok(),
        Some(Value::String(s)) => BigDecimal::from_str(s.trim()).ok(),
        Some(_) => None,
    }
    .ok_or_else(|| AppError::Validation("Invalid buy_price or shares format.".into()))?;

    if amount < BigDecimal::from(0) {
        return Err(AppError::Validation(format!("{} cannot be negative", field)));
    }
    if !fits_numeric_column(&amount) {
        return Err(AppError::Validation(format!("{} is too large", field)));
    }
    Ok(amount)
}

fn position_not_found() -> AppError {
    AppError::NotFound("Stock not found in portfolio".into())
}
