use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A portfolio's position in one stock as shown to its owner, with the stock's most recent close.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct HoldingView {
    #[serde(skip_serializing)]
    pub portfolio_id: Uuid,
    pub stock_id: i64,
    pub ticker: String,
    pub buy_price: BigDecimal,
    pub shares: BigDecimal,
    pub current_close: Option<BigDecimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpsertHoldingRequest {
    pub stock_id: Option<i64>,
    pub buy_price: Option<serde_json::Value>,
    pub shares: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HoldingOutcome {
    Added,
    Updated,
}

impl HoldingOutcome {
    pub fn detail(&self) -> &'static str {
        match self {
            HoldingOutcome::Added => "Stock added to portfolio.",
            HoldingOutcome::Updated => "Stock updated in portfolio.",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HoldingUpsertResponse {
    pub status: HoldingOutcome,
    pub detail: String,
    pub holding: HoldingView,
}
