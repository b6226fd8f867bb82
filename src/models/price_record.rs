use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Upper bound (exclusive) on the magnitude of a NUMERIC(15, 4) value.
pub const MAX_NUMERIC_EXCLUSIVE: i64 = 100_000_000_000;

/// Whether `value` can be stored in a NUMERIC(15, 4) column. Postgres rounds
/// half away from zero to 4 places first, so 99999999999.99995 already overflows.
pub fn fits_numeric_column(value: &BigDecimal) -> bool {
    // |v| < MAX - 0.00005, scaled by 10^5 to stay in integers
    value.abs() * BigDecimal::from(100_000) < BigDecimal::from(MAX_NUMERIC_EXCLUSIVE * 100_000 - 5)
}

// One trading day for one stock. Unique per (stock_id, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PriceRecord {
    pub id: i64,
    pub stock_id: i64,
    pub date: NaiveDate,
    pub prev_close_price: Option<BigDecimal>,
    pub open_price: Option<BigDecimal>,
    pub high_price: Option<BigDecimal>,
    pub low_price: Option<BigDecimal>,
    pub last_price: Option<BigDecimal>,
    pub close_price: Option<BigDecimal>,
    pub vwap: Option<BigDecimal>,
    pub volume: Option<i64>,
}

/// The writable part of a price record. Unknown values stay `None`, never zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceFields {
    pub prev_close_price: Option<BigDecimal>,
    pub open_price: Option<BigDecimal>,
    pub high_price: Option<BigDecimal>,
    pub low_price: Option<BigDecimal>,
    pub last_price: Option<BigDecimal>,
    pub close_price: Option<BigDecimal>,
    pub vwap: Option<BigDecimal>,
    pub volume: Option<i64>,
}

/// Prices of one stock at fixed lookbacks from its latest trading day.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceSnapshots {
    #[serde(rename = "latest_price")]
    pub latest: Option<PriceRecord>,
    #[serde(rename = "week_before_price")]
    pub week_before: Option<PriceRecord>,
    #[serde(rename = "month_before_price")]
    pub month_before: Option<PriceRecord>,
    #[serde(rename = "year_before_price")]
    pub year_before: Option<PriceRecord>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PriceListQuery {
    pub stock_id: Option<i64>,
    pub limit: Option<i64>,
}
