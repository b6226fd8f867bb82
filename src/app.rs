use axum::Router;
use tower_http::cors::CorsLayer;

use crate::routes::{health, portfolios, prices, stocks, watchlist};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/stocks", stocks::router())
        .nest("/api/prices", prices::router())
        .nest("/api/portfolios", portfolios::router())
        .nest("/api/watchlist", watchlist::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
