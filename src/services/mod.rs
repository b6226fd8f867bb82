pub mod csv_import_service;
pub mod holding_service;
pub mod portfolio_service;
pub mod price_service;
pub mod snapshot_service;
pub mod stock_service;
pub mod watchlist_service;
