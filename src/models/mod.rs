mod holding;
mod portfolio;
mod price_record;
mod stock;
mod watchlist;

pub use holding::{HoldingOutcome, HoldingUpsertResponse, HoldingView, UpsertHoldingRequest};
pub use portfolio::{
    CreatePortfolio, InitialHolding, PatchPortfolio, Portfolio, PortfolioDetail, UpdatePortfolio,
    MAX_PORTFOLIO_NAME_LEN,
};
pub use price_record::{
    fits_numeric_column, PriceFields, PriceListQuery, PriceRecord, PriceSnapshots,
};
pub use stock::{
    normalize_ticker, NewStock, Stock, StockDetailQuery, StockListQuery, StockSummary, StockView,
    StockWithPrices, DEFAULT_SERIES, MAX_COMPANY_NAME_LEN, MAX_INDUSTRY_LEN, MAX_SERIES_LEN,
    MAX_TICKER_LEN,
};
pub use watchlist::{Watchlist, WatchlistChange, WatchlistView};
