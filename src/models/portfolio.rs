use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::HoldingView;

pub const MAX_PORTFOLIO_NAME_LEN: usize = 100;

// A named collection of holdings belonging to exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Portfolio {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Portfolio {
    pub(crate) fn new(owner_id: Uuid, name: String, description: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            description,
            created_at: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioDetail {
    #[serde(flatten)]
    pub portfolio: Portfolio,
    pub holdings: Vec<HoldingView>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePortfolio {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub holdings: Vec<InitialHolding>,
}

/// A holding supplied at creation time, addressed by ticker.
#[derive(Debug, Deserialize)]
pub struct InitialHolding {
    pub ticker: String,
    pub buy_price: Option<serde_json::Value>,
    pub shares: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePortfolio {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PatchPortfolio {
    pub name: Option<String>,
    pub description: Option<String>,
}
