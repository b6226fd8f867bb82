use std::collections::HashMap;

use bigdecimal::BigDecimal;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db;
use crate::errors::AppError;
use crate::models::{
    normalize_ticker, CreatePortfolio, PatchPortfolio, Portfolio, PortfolioDetail, UpdatePortfolio,
    MAX_PORTFOLIO_NAME_LEN,
};
use crate::services::holding_service::parse_amount;

/// Creates a portfolio and its initial holdings in one transaction.
/// Tickers that do not resolve are skipped; malformed amounts reject the whole request.
pub async fn create(
    pool: &PgPool,
    owner_id: Uuid,
    input: CreatePortfolio,
) -> Result<PortfolioDetail, AppError> {
    let name = validate_name(&input.name)?;

    let mut initial: Vec<(String, BigDecimal, BigDecimal)> = Vec::with_capacity(input.holdings.len());
    for holding in &input.holdings {
        let buy_price = parse_amount("buy_price", holding.buy_price.as_ref())?;
        let shares = parse_amount("shares", holding.shares.as_ref())?;
        initial.push((normalize_ticker(&holding.ticker), buy_price, shares));
    }

    let mut tx = pool.begin().await?;

    let portfolio = db::portfolio_queries::insert(
        &mut *tx,
        &Portfolio::new(owner_id, name, input.description),
    )
    .await?;

    for (ticker, buy_price, shares) in &initial {
        match db::stock_queries::fetch_by_ticker(&mut *tx, ticker).await? {
            Some(stock) => {
                db::holding_queries::upsert(&mut *tx, portfolio.id, stock.id, buy_price, shares).await?;
            }
            None => {
                warn!("Skipping unknown ticker {} while creating portfolio {}", ticker, portfolio.id);
            }
        }
    }

    let holdings = db::holding_queries::fetch_views(&mut *tx, portfolio.id).await?;
    tx.commit().await?;

    info!("Created portfolio {} with {} holdings", portfolio.id, holdings.len());
    Ok(PortfolioDetail { portfolio, holdings })
}

pub async fn fetch_all(pool: &PgPool, owner_id: Uuid) -> Result<Vec<PortfolioDetail>, AppError> {
    let portfolios = db::portfolio_queries::fetch_all(pool, owner_id).await?;
    let ids: Vec<Uuid> = portfolios.iter().map(|p| p.id).collect();
    let mut holdings: HashMap<Uuid, _> = db::holding_queries::fetch_views_batch(pool, &ids).await?;

    Ok(portfolios
        .into_iter()
        .map(|portfolio| {
            let holdings = holdings.remove(&portfolio.id).unwrap_or_default();
            PortfolioDetail { portfolio, holdings }
        })
        .collect())
}

pub async fn fetch_one(pool: &PgPool, owner_id: Uuid, id: Uuid) -> Result<PortfolioDetail, AppError> {
    let portfolio = require(pool, owner_id, id).await?;
    let holdings = db::holding_queries::fetch_views(pool, portfolio.id).await?;
    Ok(PortfolioDetail { portfolio, holdings })
}

/// Full replacement of name and description.
pub async fn replace(
    pool: &PgPool,
    owner_id: Uuid,
    id: Uuid,
    input: UpdatePortfolio,
) -> Result<PortfolioDetail, AppError> {
    let name = validate_name(&input.name)?;
    apply_update(pool, owner_id, id, Some(name), Some(input.description)).await
}

pub async fn patch(
    pool: &PgPool,
    owner_id: Uuid,
    id: Uuid,
    input: PatchPortfolio,
) -> Result<PortfolioDetail, AppError> {
    let name = input.name.as_deref().map(validate_name).transpose()?;
    apply_update(pool, owner_id, id, name, input.description).await
}

pub async fn delete(pool: &PgPool, owner_id: Uuid, id: Uuid) -> Result<(), AppError> {
    match db::portfolio_queries::delete(pool, id, owner_id).await? {
        0 => Err(not_found(id)),
        _ => Ok(()),
    }
}

/// Resolves a portfolio through the owner scope. Someone else's portfolio is NotFound.
pub async fn require(pool: &PgPool, owner_id: Uuid, id: Uuid) -> Result<Portfolio, AppError> {
    db::portfolio_queries::fetch_one(pool, id, owner_id)
        .await?
        .ok_or_else(|| not_found(id))
}

pub(crate) fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Portfolio {} not found", id))
}

async fn apply_update(
    pool: &PgPool,
    owner_id: Uuid,
    id: Uuid,
    name: Option<String>,
    description: Option<String>,
) -> Result<PortfolioDetail, AppError> {
    let portfolio = db::portfolio_queries::update(pool, id, owner_id, name.as_deref(), description.as_deref())
        .await?
        .ok_or_else(|| not_found(id))?;
    let holdings = db::holding_queries::fetch_views(pool, portfolio.id).await?;
    Ok(PortfolioDetail { portfolio, holdings })
}

fn validate_name(raw: &str) -> Result<String, AppError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Portfolio name cannot be empty".into()));
    }
    if name.chars().count() > MAX_PORTFOLIO_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Portfolio name cannot exceed {} characters",
            MAX_PORTFOLIO_NAME_LEN
        )));
    }
    Ok(name.to_string())
}
