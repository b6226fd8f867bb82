use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::{PriceRecord, PriceSnapshots};

pub const DEFAULT_SERIES: &str = "EQ";
pub const MAX_TICKER_LEN: usize = 10;
pub const MAX_COMPANY_NAME_LEN: usize = 100;
pub const MAX_SERIES_LEN: usize = 10;
pub const MAX_INDUSTRY_LEN: usize = 100;

// A listed equity. The ticker is unique across the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Stock {
    pub id: i64,
    pub ticker: String,
    pub company_name: String,
    pub series: String,
    pub industry: Option<String>,
}

/// Catalog entry as produced by ingestion, before it has an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStock {
    pub ticker: String,
    pub company_name: String,
    pub series: String,
    pub industry: Option<String>,
}

impl NewStock {
    /// Normalizes raw metadata: upper-cased ticker, `EQ` when the series is blank,
    /// and no industry when the cell is blank.
    pub fn normalized(ticker: &str, company_name: &str, series: &str, industry: &str) -> Self {
        let series = series.trim();
        let industry = industry.trim();
        Self {
            ticker: normalize_ticker(ticker),
            company_name: company_name.trim().to_string(),
            series: if series.is_empty() { DEFAULT_SERIES.to_string() } else { series.to_string() },
            industry: if industry.is_empty() { None } else { Some(industry.to_string()) },
        }
    }
}

pub fn normalize_ticker(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[derive(Debug, Default, Deserialize)]
pub struct StockListQuery {
    pub search: Option<String>,
    pub industry: Option<String>,
    pub with_prices: Option<String>,
}

impl StockListQuery {
    pub fn wants_prices(&self) -> bool {
        self.with_prices.as_deref() == Some("true")
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StockDetailQuery {
    pub with_prices: Option<String>,
}

impl StockDetailQuery {
    pub fn wants_prices(&self) -> bool {
        self.with_prices.as_deref() == Some("true")
    }
}

/// Full representation: the stock and its complete price history, most recent first.
#[derive(Debug, Clone, Serialize)]
pub struct StockWithPrices {
    #[serde(flatten)]
    pub stock: Stock,
    pub prices: Vec<PriceRecord>,
}

/// Basic representation: the stock plus its derived snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct StockSummary {
    #[serde(flatten)]
    pub stock: Stock,
    #[serde(flatten)]
    pub snapshots: PriceSnapshots,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StockView {
    Full(StockWithPrices),
    Basic(StockSummary),
}
