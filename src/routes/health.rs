use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Router};
use tracing::{error, info};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(liveness))
        .route("/ready", get(readiness))
}

async fn liveness() -> &'static str {
    info!("GET /health - Health check");
    "OK"
}

/// Ready once the store answers a trivial query.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&state.pool).await {
        Ok(_) => (StatusCode::OK, "READY"),
        Err(e) => {
            error!("Readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE")
        }
    }
}
