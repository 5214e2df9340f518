use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tracing::{error, info};

use crate::core::DEFAULT_HISTORY_START;
use crate::market::{InMemoryPriceSource, MarketDataError, PriceSource};
use crate::tickers::{TickerMap, TickerMapError};

pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, default_value_t = 8000)]
    pub port: u16,
    #[arg(
        long,
        help = "JSON price history: {\"dates\": [...], \"closes\": {\"TICKER\": [...]}}"
    )]
    pub prices: PathBuf,
    #[arg(
        long,
        default_value = "resources/ticker_mapping.json",
        help = "JSON object mapping ticker aliases to symbols"
    )]
    pub ticker_map: PathBuf,
    #[arg(
        long,
        default_value = DEFAULT_HISTORY_START,
        help = "First date (YYYY-MM-DD) of price history used for fitting"
    )]
    pub history_start: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Prices(#[from] MarketDataError),

    #[error(transparent)]
    Tickers(#[from] TickerMapError),

    #[error("--history-start must be a YYYY-MM-DD date, got {0:?}")]
    HistoryStart(String),
}

/// Immutable service state shared by every request handler.
#[derive(Clone)]
pub struct ServiceConfig {
    pub version: &'static str,
    pub tickers: TickerMap,
    /// False when the alias table could not be found; the service then reports itself
    /// degraded and refuses analyses.
    pub ticker_map_loaded: bool,
    pub prices: Arc<dyn PriceSource>,
    pub history_start: String,
}

impl ServiceConfig {
    pub fn new(
        tickers: Option<TickerMap>,
        prices: Arc<dyn PriceSource>,
        history_start: impl Into<String>,
    ) -> Self {
        Self {
            version: SERVICE_VERSION,
            ticker_map_loaded: tickers.is_some(),
            tickers: tickers.unwrap_or_default(),
            prices,
            history_start: history_start.into(),
        }
    }

    /// Loads the price history and ticker map named by `args`.
    ///
    /// A missing ticker map leaves the service degraded; an unreadable price history
    /// or a malformed ticker map is fatal.
    pub fn from_args(args: &ServeArgs) -> Result<Self, ConfigError> {
        if !is_iso_date(&args.history_start) {
            return Err(ConfigError::HistoryStart(args.history_start.clone()));
        }

        let prices = InMemoryPriceSource::from_json_file(&args.prices)?;
        info!("loaded price history from {}", args.prices.display());

        let tickers = if args.ticker_map.exists() {
            let map = TickerMap::from_json_file(&args.ticker_map)?;
            info!("loaded {} ticker aliases", map.len());
            Some(map)
        } else {
            error!(
                "ticker mapping file not found at {}",
                args.ticker_map.display()
            );
            None
        };

        Ok(Self::new(tickers, Arc::new(prices), args.history_start.clone()))
    }
}

fn is_iso_date(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::PriceHistory;

    fn empty_source() -> Arc<dyn PriceSource> {
        let history =
            PriceHistory::new(Vec::new(), Default::default()).expect("empty history is valid");
        Arc::new(InMemoryPriceSource::new(history))
    }

    #[test]
    fn missing_ticker_map_marks_service_degraded() {
        let config = ServiceConfig::new(None, empty_source(), DEFAULT_HISTORY_START);
        assert!(!config.ticker_map_loaded);
        assert!(config.tickers.is_empty());
    }

    #[test]
    fn loaded_ticker_map_marks_service_ready() {
        let config = ServiceConfig::new(
            Some(TickerMap::default()),
            empty_source(),
            DEFAULT_HISTORY_START,
        );
        assert!(config.ticker_map_loaded);
        assert_eq!(config.history_start, "2010-01-01");
    }

    #[test]
    fn iso_dates_are_validated() {
        assert!(is_iso_date("2010-01-01"));
        assert!(!is_iso_date("2010-1-01"));
        assert!(!is_iso_date("20100101"));
        assert!(!is_iso_date("2010/01/01"));
    }
}
