use tracing::info;

use super::engine::project;
use super::error::{FireError, FireResult};
use super::goal::evaluate_goal;
use super::planner::monthly_needed;
use super::returns::portfolio_returns;
use super::types::{FireReport, PortfolioConfig, round_money};
use crate::market::PriceSource;

pub const DEFAULT_HISTORY_START: &str = "2010-01-01";

/// Runs the full projection for one portfolio.
///
/// Prices are requested for every allocated ticker from `history_start` onwards. When
/// the goal is not reached within the horizon the report also carries the extra
/// monthly saving needed and the gap left by the final projected balance.
pub fn run_analysis(
    config: &PortfolioConfig,
    prices: &dyn PriceSource,
    history_start: &str,
) -> FireResult<FireReport> {
    let fire_target = config.fire_target();

    let tickers: Vec<String> = config.allocations.keys().cloned().collect();
    if tickers.is_empty() {
        return Err(FireError::EmptyData(
            "no tickers provided in allocations".to_string(),
        ));
    }

    let history = prices.closes(&tickers, history_start)?;
    let returns = portfolio_returns(&history, &config.allocations)?;
    let projection = project(
        &returns,
        config.current_value,
        config.monthly_savings,
        config.years_to_retirement,
    )?;

    let outcome = evaluate_goal(&projection.balances, fire_target);
    let final_estimated_value = projection
        .balances
        .last()
        .copied()
        .map_or(0.0, round_money);

    let mut report = FireReport {
        years_to_reach_goal: outcome.years_to_reach_goal,
        shortfall: outcome.shortfall,
        reached: outcome.reached,
        final_value: outcome.final_value,
        confidence_score: projection.confidence,
        current_val: config.current_value,
        fire_target: round_money(fire_target),
        final_estimated_value,
        years_simulated: config.years_to_retirement,
        monthly_savings: config.monthly_savings,
        monthly_needed: None,
    };

    if !outcome.reached {
        report.monthly_needed = Some(monthly_needed(
            fire_target,
            config.years_to_retirement,
            final_estimated_value,
        ));
        report.shortfall = round_money(fire_target - final_estimated_value);
    }

    info!(
        "analysis complete: {} tickers, {} return observations, reached = {}, years = {}",
        tickers.len(),
        returns.len(),
        report.reached,
        report.years_to_reach_goal
    );

    Ok(report)
}
