use super::types::{FireOutcome, round_money};

/// Scans yearly balances for the first year at or above `target`.
///
/// A target already covered by the first projected year counts as reached at year 0.
/// When the target is never reached, the shortfall and final value are taken from
/// the best balance seen over the horizon.
pub fn evaluate_goal(balances: &[f64], target: f64) -> FireOutcome {
    let (Some(&first), Some(&last)) = (balances.first(), balances.last()) else {
        return FireOutcome {
            years_to_reach_goal: 0,
            shortfall: round_money(target),
            reached: false,
            final_value: 0.0,
        };
    };

    if target <= first {
        return FireOutcome {
            years_to_reach_goal: 0,
            shortfall: 0.0,
            reached: true,
            final_value: round_money(last),
        };
    }

    if let Some(idx) = balances.iter().position(|&b| b >= target) {
        return FireOutcome {
            years_to_reach_goal: idx as u32 + 1,
            shortfall: 0.0,
            reached: true,
            final_value: round_money(last),
        };
    }

    let best = balances.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    FireOutcome {
        years_to_reach_goal: balances.len() as u32,
        shortfall: round_money((target - best).max(0.0)),
        reached: false,
        final_value: round_money(best),
    }
}
