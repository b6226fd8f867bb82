use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, info};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::{StockDetailQuery, StockListQuery, StockView};
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_stocks))
        .route("/:id", get(get_stock))
}

pub async fn list_stocks(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<StockListQuery>,
) -> Result<Json<Vec<StockView>>, AppError> {
    info!("GET /stocks - Listing stocks (search={:?}, industry={:?})", query.search, query.industry);
    let stocks = services::stock_service::list(&state.pool, &query)
        .await
        .map_err(|e| {
            error!("Failed to list stocks: {}", e);
            e
        })?;
    Ok(Json(stocks))
}

pub async fn get_stock(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<StockDetailQuery>,
) -> Result<Json<StockView>, AppError> {
    info!("GET /stocks/{} - Fetching stock", id);
    let stock = services::stock_service::fetch_one(&state.pool, id, query.wants_prices())
        .await
        .map_err(|e| {
            error!("Failed to fetch stock {}: {}", id, e);
            e
        })?;
    Ok(Json(stock))
}
