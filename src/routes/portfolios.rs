use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::{
    CreatePortfolio, HoldingUpsertResponse, HoldingView, HoldingOutcome, PatchPortfolio,
    PortfolioDetail, UpdatePortfolio, UpsertHoldingRequest,
};
use crate::services;
use crate::services::holding_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(fetch_portfolios).post(create_portfolio))
        .route(
            "/:id",
            get(get_portfolio)
                .put(update_portfolio)
                .patch(patch_portfolio)
                .delete(delete_portfolio),
        )
        .route(
            "/:id/:position",
            get(get_holding).post(upsert_holding).delete(delete_holding),
        )
}

pub async fn create_portfolio(
    user: AuthUser,
    State(state): State<AppState>,
    Json(data): Json<CreatePortfolio>,
) -> Result<(StatusCode, Json<PortfolioDetail>), AppError> {
    info!("POST /portfolios - Creating new portfolio");
    let portfolio = services::portfolio_service::create(&state.pool, user.user_id, data)
        .await
        .map_err(|e| {
            error!("Failed to create portfolio: {}", e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(portfolio)))
}

pub async fn fetch_portfolios(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<PortfolioDetail>>, AppError> {
    info!("GET /portfolios - Fetching portfolios");
    let portfolios = services::portfolio_service::fetch_all(&state.pool, user.user_id)
        .await
        .map_err(|e| {
            error!("Failed to fetch portfolios: {}", e);
            e
        })?;
    Ok(Json(portfolios))
}

pub async fn get_portfolio(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PortfolioDetail>, AppError> {
    info!("GET /portfolios/{} - Fetching portfolio", id);
    let portfolio = services::portfolio_service::fetch_one(&state.pool, user.user_id, id)
        .await
        .map_err(|e| {
            error!("Failed to fetch portfolio {}: {}", id, e);
            e
        })?;
    Ok(Json(portfolio))
}

pub async fn update_portfolio(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdatePortfolio>,
) -> Result<Json<PortfolioDetail>, AppError> {
    info!("PUT /portfolios/{} - Updating portfolio", id);
    let portfolio = services::portfolio_service::replace(&state.pool, user.user_id, id, data)
        .await
        .map_err(|e| {
            error!("Failed to update portfolio {}: {}", id, e);
            e
        })?;
    Ok(Json(portfolio))
}

pub async fn patch_portfolio(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<PatchPortfolio>,
) -> Result<Json<PortfolioDetail>, AppError> {
    info!("PATCH /portfolios/{} - Partially updating portfolio", id);
    let portfolio = services::portfolio_service::patch(&state.pool, user.user_id, id, data)
        .await
        .map_err(|e| {
            error!("Failed to patch portfolio {}: {}", id, e);
            e
        })?;
    Ok(Json(portfolio))
}

pub async fn delete_portfolio(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /portfolios/{} - Deleting portfolio", id);
    services::portfolio_service::delete(&state.pool, user.user_id, id)
        .await
        .map_err(|e| {
            error!("Failed to delete portfolio {}: {}", id, e);
            e
        })?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET addresses the holding by its 1-indexed position in the portfolio.
pub async fn get_holding(
    user: AuthUser,
    State(state): State<AppState>,
    Path((id, position)): Path<(Uuid, String)>,
) -> Result<Json<HoldingView>, AppError> {
    info!("GET /portfolios/{}/{} - Fetching holding by position", id, position);
    let holding = holding_service::get_by_position(&state.pool, user.user_id, id, &position)
        .await
        .map_err(|e| {
            error!("Failed to fetch holding {} of portfolio {}: {}", position, id, e);
            e
        })?;
    Ok(Json(holding))
}

/// POST addresses by stock id: the body's `stock_id` if present, else the path segment.
pub async fn upsert_holding(
    user: AuthUser,
    State(state): State<AppState>,
    Path((id, stock_param)): Path<(Uuid, String)>,
    Json(data): Json<UpsertHoldingRequest>,
) -> Result<(StatusCode, Json<HoldingUpsertResponse>), AppError> {
    info!("POST /portfolios/{}/{} - Adding or updating holding", id, stock_param);

    let stock_id = match data.stock_id {
        Some(stock_id) => stock_id,
        None => stock_param
            .trim()
            .parse::<i64>()
            .map_err(|_| AppError::NotFound("Stock not found".into()))?,
    };

    let (outcome, holding) = holding_service::add_or_update(&state.pool, user.user_id, id, stock_id, &data)
        .await
        .map_err(|e| {
            error!("Failed to upsert stock {} in portfolio {}: {}", stock_id, id, e);
            e
        })?;

    let status = match outcome {
        HoldingOutcome::Added => StatusCode::CREATED,
        HoldingOutcome::Updated => StatusCode::OK,
    };
    Ok((
        status,
        Json(HoldingUpsertResponse {
            status: outcome,
            detail: outcome.detail().to_string(),
            holding,
        }),
    ))
}

/// DELETE addresses the holding by its 1-indexed position in the portfolio.
pub async fn delete_holding(
    user: AuthUser,
    State(state): State<AppState>,
    Path((id, position)): Path<(Uuid, String)>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /portfolios/{}/{} - Removing holding by position", id, position);
    holding_service::remove_by_position(&state.pool, user.user_id, id, &position)
        .await
        .map_err(|e| {
            error!("Failed to remove holding {} of portfolio {}: {}", position, id, e);
            e
        })?;
    Ok(StatusCode::NO_CONTENT)
}
