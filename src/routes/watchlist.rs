use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{error, info};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::{WatchlistChange, WatchlistView};
use crate::services::{snapshot_service, watchlist_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_watchlist))
        .route("/:stock_id", post(add_to_watchlist).delete(remove_from_watchlist))
}

pub async fn get_watchlist(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<WatchlistView>, AppError> {
    info!("GET /watchlist - Fetching watchlist");
    let stocks = watchlist_service::get_or_empty(&state.pool, user.user_id)
        .await
        .map_err(|e| {
            error!("Failed to fetch watchlist: {}", e);
            e
        })?;
    let stocks = snapshot_service::summarize(&state.pool, stocks).await?;
    Ok(Json(WatchlistView { stocks }))
}

pub async fn add_to_watchlist(
    user: AuthUser,
    State(state): State<AppState>,
    Path(stock_id): Path<i64>,
) -> Result<Json<WatchlistChange>, AppError> {
    info!("POST /watchlist/{} - Adding stock to watchlist", stock_id);
    watchlist_service::add_stock(&state.pool, user.user_id, stock_id)
        .await
        .map_err(|e| {
            error!("Failed to add stock {} to watchlist: {}", stock_id, e);
            e
        })?;
    Ok(Json(WatchlistChange {
        message: "Stock added to watchlist".into(),
    }))
}

pub async fn remove_from_watchlist(
    user: AuthUser,
    State(state): State<AppState>,
    Path(stock_id): Path<i64>,
) -> Result<Json<WatchlistChange>, AppError> {
    info!("DELETE /watchlist/{} - Removing stock from watchlist", stock_id);
    watchlist_service::remove_stock(&state.pool, user.user_id, stock_id)
        .await
        .map_err(|e| {
            error!("Failed to remove stock {} from watchlist: {}", stock_id, e);
            e
        })?;
    Ok(Json(WatchlistChange {
        message: "Stock removed from watchlist".into(),
    }))
}
