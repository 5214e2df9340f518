pub mod api;
pub mod config;
pub mod core;
pub mod market;
pub mod tickers;
