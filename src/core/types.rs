use std::collections::BTreeMap;

use serde::Serialize;

/// Multiple of annual spending that counts as financially independent.
pub const FIRE_MULTIPLE: f64 = 25.0;

/// Validated portfolio request. Weights are relative and need not sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioConfig {
    pub years_to_retirement: u32,
    pub current_value: f64,
    pub monthly_savings: f64,
    pub monthly_retirement_goal: f64,
    pub allocations: BTreeMap<String, f64>,
}

impl PortfolioConfig {
    /// Capital needed to fund `monthly_retirement_goal` indefinitely.
    pub fn fire_target(&self) -> f64 {
        fire_target(self.monthly_retirement_goal)
    }
}

pub fn fire_target(monthly_retirement_goal: f64) -> f64 {
    FIRE_MULTIPLE * (12.0 * monthly_retirement_goal)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionResult {
    /// Balance at the end of each forecast year.
    pub balances: Vec<f64>,
    /// Blended fit-quality score, rounded to 4 places.
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FireOutcome {
    pub years_to_reach_goal: u32,
    pub shortfall: f64,
    pub reached: bool,
    pub final_value: f64,
}

/// Flat record returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FireReport {
    pub years_to_reach_goal: u32,
    pub shortfall: f64,
    pub reached: bool,
    pub final_value: f64,
    pub confidence_score: f64,
    pub current_val: f64,
    pub fire_target: f64,
    pub final_estimated_value: f64,
    pub years_simulated: u32,
    pub monthly_savings: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_needed: Option<f64>,
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn round_money(value: f64) -> f64 {
    round_to(value, 2)
}
