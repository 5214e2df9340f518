use tracing::{debug, info};

use super::error::{FireError, FireResult};
use super::regression::{cross_validate, fit_line, fit_score};
use super::types::{ProjectionResult, round_to};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
/// Hard ceiling on the growth rate used for forecasting.
pub const MAX_ANNUAL_RATE: f64 = 0.07;
pub const MIN_CV_OBSERVATIONS: usize = 60;
pub const CV_SPLITS: usize = 3;

const IN_SAMPLE_WEIGHT: f64 = 0.7;
const CV_WEIGHT: f64 = 0.3;
const PRICE_FLOOR: f64 = 1.0;

/// Log-linear growth model fitted to a return series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthModel {
    /// Per-period log growth.
    pub slope: f64,
    pub in_sample_r2: f64,
    /// Mean out-of-sample R², or the in-sample R² when the series is too short to split.
    pub cv_score: f64,
    pub regression_cagr: f64,
    pub historical_cagr: f64,
    /// Rate used for simulation: the smallest of both estimates and the ceiling.
    pub annual_rate: f64,
    /// Unrounded blend of in-sample and cross-validated fit.
    pub confidence: f64,
}

/// Fits the growth model and forecasts `years` yearly balances.
pub fn project(
    returns: &[f64],
    current_value: f64,
    monthly_contribution: f64,
    years: u32,
) -> FireResult<ProjectionResult> {
    let model = fit_growth_model(returns, current_value)?;
    let balances =
        simulate_balances(current_value, model.annual_rate, monthly_contribution, years)?;
    Ok(ProjectionResult {
        balances,
        confidence: round_to(model.confidence, 4),
    })
}

pub fn fit_growth_model(returns: &[f64], current_value: f64) -> FireResult<GrowthModel> {
    if returns.is_empty() {
        return Err(FireError::EmptyData(
            "cannot predict future: no returns data".to_string(),
        ));
    }

    let safe_value = current_value.max(1.0);
    let log_prices = log_price_path(returns, safe_value)?;
    let index: Vec<f64> = (0..log_prices.len()).map(|i| i as f64).collect();

    let fit = fit_line(&index, &log_prices);
    let in_sample_r2 = fit_score(&fit, &index, &log_prices);

    let cv_score = if returns.len() >= MIN_CV_OBSERVATIONS {
        info!(
            "starting time-series cross-validation ({CV_SPLITS} folds) for {} data points",
            returns.len()
        );
        let scores = cross_validate(&index, &log_prices, CV_SPLITS);
        for (i, score) in scores.iter().enumerate() {
            debug!("fold {} score: {score:.4}", i + 1);
        }
        let avg = scores.iter().sum::<f64>() / scores.len() as f64;
        info!("cross-validation complete, avg R2: {avg:.4}");
        avg
    } else {
        info!(
            "insufficient data for cross-validation ({} points), using in-sample fit only",
            returns.len()
        );
        in_sample_r2
    };

    let confidence = in_sample_r2 * IN_SAMPLE_WEIGHT + cv_score.max(0.0) * CV_WEIGHT;

    let regression_cagr = (fit.slope * TRADING_DAYS_PER_YEAR).exp() - 1.0;
    let mean_return = returns.iter().sum::<f64>() / returns.len() as f64;
    let historical_cagr = (1.0 + mean_return).powf(TRADING_DAYS_PER_YEAR) - 1.0;
    let annual_rate = regression_cagr.min(historical_cagr).min(MAX_ANNUAL_RATE);

    if !annual_rate.is_finite() || !confidence.is_finite() {
        return Err(FireError::UnexpectedComputation(format!(
            "growth model is not finite (rate {annual_rate}, confidence {confidence})"
        )));
    }

    info!(
        "regression annual return = {:.4}%, historical annual return = {:.4}%, using = {:.4}%",
        regression_cagr * 100.0,
        historical_cagr * 100.0,
        annual_rate * 100.0
    );

    Ok(GrowthModel {
        slope: fit.slope,
        in_sample_r2,
        cv_score,
        regression_cagr,
        historical_cagr,
        annual_rate,
        confidence,
    })
}

/// Year-end balances under annual compounding, with twelve months of contributions
/// added after each year's growth.
pub fn simulate_balances(
    start: f64,
    annual_rate: f64,
    monthly_contribution: f64,
    years: u32,
) -> FireResult<Vec<f64>> {
    let mut balances = Vec::with_capacity(years as usize);
    let mut balance = start;
    for year in 1..=years {
        balance *= 1.0 + annual_rate;
        balance += monthly_contribution * 12.0;
        if !balance.is_finite() {
            return Err(FireError::UnexpectedComputation(format!(
                "projected balance overflowed in year {year}"
            )));
        }
        balances.push(balance);
    }
    Ok(balances)
}

/// Compounds `returns` from `start`, floors at 1.0 and takes the natural log.
fn log_price_path(returns: &[f64], start: f64) -> FireResult<Vec<f64>> {
    let mut price = start;
    let mut path = Vec::with_capacity(returns.len());
    for (t, r) in returns.iter().enumerate() {
        price *= 1.0 + r;
        let log_price = price.max(PRICE_FLOOR).ln();
        if !log_price.is_finite() {
            return Err(FireError::UnexpectedComputation(format!(
                "cumulative price is not finite at period {t}"
            )));
        }
        path.push(log_price);
    }
    Ok(path)
}
