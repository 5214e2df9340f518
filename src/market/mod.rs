//! Historical closing prices: the aligned table the return builder consumes and the
//! sources that supply it.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::core::{FireError, FireResult};

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("failed to read price history: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid price history JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("column {ticker} has {actual} prices for {expected} dates")]
    MisalignedColumn {
        ticker: String,
        expected: usize,
        actual: usize,
    },

    #[error("column {ticker} has a non-positive or non-finite price on {date}")]
    InvalidPrice { ticker: String, date: String },

    #[error("dates must be strictly increasing, found {previous} then {next}")]
    UnorderedDates { previous: String, next: String },
}

/// Closing prices aligned on a shared, chronologically ordered date index.
/// A `None` cell means the ticker did not trade (or had not listed yet) that day.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawPriceHistory")]
pub struct PriceHistory {
    dates: Vec<String>,
    closes: BTreeMap<String, Vec<Option<f64>>>,
}

#[derive(Deserialize)]
struct RawPriceHistory {
    dates: Vec<String>,
    closes: BTreeMap<String, Vec<Option<f64>>>,
}

impl TryFrom<RawPriceHistory> for PriceHistory {
    type Error = MarketDataError;

    fn try_from(raw: RawPriceHistory) -> Result<Self, Self::Error> {
        PriceHistory::new(raw.dates, raw.closes)
    }
}

impl PriceHistory {
    pub fn new(
        dates: Vec<String>,
        closes: BTreeMap<String, Vec<Option<f64>>>,
    ) -> Result<Self, MarketDataError> {
        for pair in dates.windows(2) {
            if pair[1] <= pair[0] {
                return Err(MarketDataError::UnorderedDates {
                    previous: pair[0].clone(),
                    next: pair[1].clone(),
                });
            }
        }

        for (ticker, column) in &closes {
            if column.len() != dates.len() {
                return Err(MarketDataError::MisalignedColumn {
                    ticker: ticker.clone(),
                    expected: dates.len(),
                    actual: column.len(),
                });
            }
            for (date, price) in dates.iter().zip(column) {
                if let Some(p) = price {
                    if !p.is_finite() || *p <= 0.0 {
                        return Err(MarketDataError::InvalidPrice {
                            ticker: ticker.clone(),
                            date: date.clone(),
                        });
                    }
                }
            }
        }

        Ok(Self { dates, closes })
    }

    pub fn from_json_file(path: &Path) -> Result<Self, MarketDataError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn dates(&self) -> &[String] {
        &self.dates
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.closes.keys().map(String::as_str)
    }

    pub fn column(&self, ticker: &str) -> Option<&[Option<f64>]> {
        self.closes.get(ticker).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty() || self.dates.is_empty()
    }

    /// Restricts the table to `tickers` and to dates on or after `start`
    /// (ISO `YYYY-MM-DD`, compared lexically).
    pub fn select(&self, tickers: &[String], start: &str) -> PriceHistory {
        let first_row = self.dates.partition_point(|d| d.as_str() < start);
        let closes = tickers
            .iter()
            .filter_map(|t| {
                self.closes
                    .get(t)
                    .map(|column| (t.clone(), column[first_row..].to_vec()))
            })
            .collect();

        PriceHistory {
            dates: self.dates[first_row..].to_vec(),
            closes,
        }
    }

    /// Date of the first available close for `ticker`.
    pub fn first_valid_date(&self, ticker: &str) -> Option<&str> {
        let column = self.closes.get(ticker)?;
        column
            .iter()
            .position(Option::is_some)
            .map(|i| self.dates[i].as_str())
    }
}

/// Supplier of historical closing prices.
///
/// Implementations either return a populated table for the requested tickers or fail
/// with [`FireError::EmptyData`]. Callers do not retry.
pub trait PriceSource: Send + Sync {
    fn closes(&self, tickers: &[String], start: &str) -> FireResult<PriceHistory>;
}

/// Price source backed by a table held in memory for the life of the process.
#[derive(Debug, Clone)]
pub struct InMemoryPriceSource {
    history: PriceHistory,
}

impl InMemoryPriceSource {
    pub fn new(history: PriceHistory) -> Self {
        Self { history }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, MarketDataError> {
        Ok(Self::new(PriceHistory::from_json_file(path)?))
    }
}

impl PriceSource for InMemoryPriceSource {
    fn closes(&self, tickers: &[String], start: &str) -> FireResult<PriceHistory> {
        let selected = self.history.select(tickers, start);
        if selected.is_empty() {
            return Err(FireError::EmptyData(format!(
                "no price data returned for {tickers:?}"
            )));
        }

        let start_year = year_of(start);
        for ticker in selected.tickers() {
            if let Some(first_year) = selected.first_valid_date(ticker).map(year_of) {
                if first_year > start_year {
                    warn!("{ticker} history only begins in {first_year}");
                }
            }
        }

        Ok(selected)
    }
}

fn year_of(date: &str) -> &str {
    date.get(..4).unwrap_or(date)
}
