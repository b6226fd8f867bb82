use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::StockSummary;

// At most one per owner; created on first add.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Watchlist {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchlistView {
    pub stocks: Vec<StockSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchlistChange {
    pub message: String,
}
