pub mod holding_queries;
pub mod portfolio_queries;
pub mod price_queries;
pub mod stock_queries;
pub mod watchlist_queries;
