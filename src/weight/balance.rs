//! Group and gender balance, one implementation for both dimensions.
//!
//! Two regimes:
//! - **Tally**: once more than `diversity_threshold` values of the dimension have been
//!   picked, the pool-wide tally for the candidate's value decides the bonus.
//! - **Hit ratio**: with fewer observed values the tally is too noisy, so the
//!   candidate's own count of picks under an active filter is compared to the busiest
//!   candidate's count.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Distinct positive tallies needed before the tally regime applies.
pub const DIVERSITY_THRESHOLD: usize = 3;
/// Denominator shaping in the tally regime: `1 / (tally * damping + 1)`.
pub const TALLY_DAMPING: f64 = 0.2;
/// Bonus when nobody has been picked under a filter yet.
pub const NO_HISTORY_BONUS: f64 = 0.2;
/// Bonus for a candidate never picked under a filter while others have been.
pub const UNHIT_BONUS: f64 = 0.5;

/// Empirical constants of the balance heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceTunables {
    pub diversity_threshold: usize,
    pub tally_damping: f64,
    pub no_history_bonus: f64,
    pub unhit_bonus: f64,
}

impl Default for BalanceTunables {
    fn default() -> Self {
        Self {
            diversity_threshold: DIVERSITY_THRESHOLD,
            tally_damping: TALLY_DAMPING,
            no_history_bonus: NO_HISTORY_BONUS,
            unhit_bonus: UNHIT_BONUS,
        }
    }
}

/// Data for one candidate along one balancing dimension.
#[derive(Debug, Clone, Copy)]
pub struct BalanceInput<'a> {
    /// The candidate's group (or gender); `None` reads as an empty label
    pub value: Option<&'a str>,
    /// Pool-wide picks per value
    pub tally: &'a BTreeMap<String, i64>,
    /// This candidate's picks under an active filter of this dimension
    pub own_hits: u64,
    /// Largest `own_hits` across the candidates being weighted
    pub max_hits: u64,
}

/// Balance bonus for one candidate, 0 when the dimension is disabled.
pub fn balance_factor(enabled: bool, input: &BalanceInput<'_>, weight: f64, tunables: &BalanceTunables) -> f64 {
    if !enabled {
        return 0.0;
    }

    let observed = input.tally.values().filter(|&&v| v > 0).count();
    if observed > tunables.diversity_threshold {
        let tally = input.tally.get(input.value.unwrap_or("")).copied().unwrap_or(0).max(0) as f64;
        return weight / (tally * tunables.tally_damping + 1.0);
    }

    if input.max_hits == 0 {
        tunables.no_history_bonus * weight
    } else if input.own_hits == 0 {
        tunables.unhit_bonus * weight
    } else {
        weight * (1.0 - input.own_hits as f64 / input.max_hits as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(pairs: &[(&str, i64)]) -> BTreeMap<String, i64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn input<'a>(value: Option<&'a str>, tally: &'a BTreeMap<String, i64>, own: u64, max: u64) -> BalanceInput<'a> {
        BalanceInput {
            value,
            tally,
            own_hits: own,
            max_hits: max,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_disabled_is_zero() {
        let t = tally(&[]);
        assert_eq!(balance_factor(false, &input(Some("1"), &t, 0, 0), 1.0, &BalanceTunables::default()), 0.0);
    }

    #[test]
    fn test_tally_regime_penalizes_busy_groups() {
        let t = tally(&[("1", 5), ("2", 1), ("3", 1), ("4", 1)]);
        let tunables = BalanceTunables::default();
        let busy = balance_factor(true, &input(Some("1"), &t, 0, 0), 1.0, &tunables);
        let quiet = balance_factor(true, &input(Some("2"), &t, 0, 0), 1.0, &tunables);
        assert!(close(busy, 0.5));
        assert!(close(quiet, 1.0 / 1.2));
        assert!(busy < quiet);
    }

    #[test]
    fn test_tally_regime_unknown_value_gets_full_weight() {
        let t = tally(&[("1", 5), ("2", 1), ("3", 1), ("4", 1)]);
        let f = balance_factor(true, &input(None, &t, 0, 0), 2.0, &BalanceTunables::default());
        assert!(close(f, 2.0));
    }

    #[test]
    fn test_negative_tallies_do_not_count_or_boost() {
        let t = tally(&[("1", -4), ("2", 1), ("3", 1), ("4", 1)]);
        // only three positive tallies: hit-ratio regime
        let f = balance_factor(true, &input(Some("1"), &t, 0, 0), 1.0, &BalanceTunables::default());
        assert!(close(f, NO_HISTORY_BONUS));
    }

    #[test]
    fn test_hit_ratio_regime() {
        let t = tally(&[("1", 2)]);
        let tunables = BalanceTunables::default();
        assert!(close(balance_factor(true, &input(Some("1"), &t, 0, 0), 1.0, &tunables), 0.2));
        assert!(close(balance_factor(true, &input(Some("1"), &t, 0, 4), 1.0, &tunables), 0.5));
        assert!(close(balance_factor(true, &input(Some("1"), &t, 1, 4), 1.0, &tunables), 0.75));
        assert!(close(balance_factor(true, &input(Some("1"), &t, 4, 4), 1.0, &tunables), 0.0));
    }
}
