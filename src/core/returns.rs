use std::collections::BTreeMap;

use super::error::{FireError, FireResult};
use crate::market::PriceHistory;

/// Weighted daily portfolio returns from aligned closing prices.
///
/// Rows with no price for any ticker are dropped, remaining gaps are forward-filled,
/// and a return is produced only for days where every ticker has both today's and
/// the previous close. Weights are renormalized over the tickers present in the table.
pub fn portfolio_returns(
    history: &PriceHistory,
    weights: &BTreeMap<String, f64>,
) -> FireResult<Vec<f64>> {
    let tickers: Vec<&str> = history.tickers().collect();
    let columns = forward_filled_columns(history, &tickers);
    let per_ticker = daily_returns(&columns);

    if per_ticker.is_empty() {
        return Err(FireError::EmptyData(
            "no valid returns data, tickers might be invalid".to_string(),
        ));
    }

    let matched: Vec<(usize, f64)> = tickers
        .iter()
        .enumerate()
        .filter_map(|(i, t)| weights.get(*t).map(|&w| (i, w)))
        .collect();
    if matched.is_empty() {
        return Err(FireError::Configuration(
            "none of the allocated tickers were found in the price data".to_string(),
        ));
    }

    let total: f64 = matched.iter().map(|(_, w)| w).sum();
    if total <= 0.0 || !total.is_finite() {
        return Err(FireError::Configuration("weights sum to zero".to_string()));
    }

    Ok(per_ticker
        .iter()
        .map(|row| matched.iter().map(|&(i, w)| row[i] * w / total).sum())
        .collect())
}

/// One column per ticker with all-empty rows removed and gaps carried forward.
fn forward_filled_columns(history: &PriceHistory, tickers: &[&str]) -> Vec<Vec<Option<f64>>> {
    let raw: Vec<&[Option<f64>]> = tickers
        .iter()
        .filter_map(|t| history.column(t))
        .collect();
    let rows = history.dates().len();

    let kept_rows: Vec<usize> = (0..rows)
        .filter(|&r| raw.iter().any(|column| column[r].is_some()))
        .collect();

    raw.iter()
        .map(|column| {
            let mut last = None;
            kept_rows
                .iter()
                .map(|&r| {
                    if column[r].is_some() {
                        last = column[r];
                    }
                    last
                })
                .collect()
        })
        .collect()
}

/// Percent change per ticker, keeping only rows where every ticker has a value.
fn daily_returns(columns: &[Vec<Option<f64>>]) -> Vec<Vec<f64>> {
    let rows = columns.first().map_or(0, Vec::len);
    (1..rows)
        .filter_map(|r| {
            columns
                .iter()
                .map(|column| match (column[r - 1], column[r]) {
                    (Some(prev), Some(curr)) => Some(curr / prev - 1.0),
                    _ => None,
                })
                .collect::<Option<Vec<f64>>>()
        })
        .collect()
}
