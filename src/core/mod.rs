mod analysis;
mod engine;
mod error;
mod goal;
mod planner;
mod regression;
mod returns;
mod types;

pub use analysis::{DEFAULT_HISTORY_START, run_analysis};
pub use engine::{GrowthModel, MAX_ANNUAL_RATE, fit_growth_model, project, simulate_balances};
pub use error::{FireError, FireResult};
pub use goal::evaluate_goal;
pub use planner::monthly_needed;
pub use returns::portfolio_returns;
pub use types::{FireOutcome, FireReport, PortfolioConfig, ProjectionResult, fire_target};
