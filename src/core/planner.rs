use super::types::round_money;

/// Extra flat monthly contribution needed to close the gap between `target` and the
/// balance projected under the current plan.
///
/// The gap is spread evenly over the remaining months with no growth credited, which
/// overstates what a compounding plan would need.
pub fn monthly_needed(target: f64, years: u32, projected_final_value: f64) -> f64 {
    let months = years as f64 * 12.0;
    if months <= 0.0 {
        return 0.0;
    }

    let shortfall = target - projected_final_value;
    if shortfall <= 0.0 {
        return 0.0;
    }

    round_money(shortfall / months)
}
