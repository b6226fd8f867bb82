pub mod health;
pub mod portfolios;
pub mod prices;
pub mod stocks;
pub mod watchlist;
