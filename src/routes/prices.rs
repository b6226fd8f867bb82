use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, info};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::{PriceListQuery, PriceRecord};
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_prices))
        .route("/:id", get(get_price))
}

pub async fn list_prices(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PriceListQuery>,
) -> Result<Json<Vec<PriceRecord>>, AppError> {
    info!("GET /prices - Listing price records (stock_id={:?})", query.stock_id);
    let prices = services::price_service::list(&state.pool, &query)
        .await
        .map_err(|e| {
            error!("Failed to list price records: {}", e);
            e
        })?;
    Ok(Json(prices))
}

pub async fn get_price(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PriceRecord>, AppError> {
    info!("GET /prices/{} - Fetching price record", id);
    let price = services::price_service::fetch_one(&state.pool, id)
        .await
        .map_err(|e| {
            error!("Failed to fetch price record {}: {}", id, e);
            e
        })?;
    Ok(Json(price))
}
