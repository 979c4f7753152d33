//! Repeat modes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::ExclusionCycle;

/// Whether, and how often, a candidate may be picked again before a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "threshold")]
pub enum RepeatMode {
    /// Every draw considers the whole filtered pool.
    Repeat,
    /// A candidate is out once picked, until the scope is reset.
    #[default]
    NoRepeatUntilExhausted,
    /// A candidate stays in until it has been picked `threshold` times since the reset.
    HalfRepeat(u32),
}

impl RepeatMode {
    /// Map the single "half repeat" setting: 0 repeats freely, 1 never repeats, n allows n picks.
    pub fn from_threshold(threshold: u32) -> Self {
        match threshold {
            0 => RepeatMode::Repeat,
            1 => RepeatMode::NoRepeatUntilExhausted,
            n => RepeatMode::HalfRepeat(n),
        }
    }

    pub fn threshold(&self) -> u32 {
        match self {
            RepeatMode::Repeat => 0,
            RepeatMode::NoRepeatUntilExhausted => 1,
            RepeatMode::HalfRepeat(n) => *n,
        }
    }

    /// Picks each candidate gets per exclusion cycle, `None` when picks are not tracked.
    pub fn cycle_limit(&self) -> Option<u32> {
        match self {
            RepeatMode::Repeat => None,
            RepeatMode::NoRepeatUntilExhausted => Some(1),
            RepeatMode::HalfRepeat(threshold) => Some((*threshold).max(1)),
        }
    }

    /// Whether picks are tracked in an exclusion cycle at all.
    pub fn tracks_cycle(&self) -> bool {
        self.cycle_limit().is_some()
    }

    /// Whether a candidate with this key may be drawn given the current cycle.
    pub fn is_eligible(&self, cycle: &ExclusionCycle, key: &str) -> bool {
        self.cycle_limit().is_none_or(|limit| cycle.picks_of(key) < limit)
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepeatMode::Repeat => f.write_str("repeat"),
            RepeatMode::NoRepeatUntilExhausted => f.write_str("no-repeat"),
            RepeatMode::HalfRepeat(n) => write!(f, "half-repeat({})", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_threshold() {
        assert_eq!(RepeatMode::from_threshold(0), RepeatMode::Repeat);
        assert_eq!(RepeatMode::from_threshold(1), RepeatMode::NoRepeatUntilExhausted);
        assert_eq!(RepeatMode::from_threshold(3), RepeatMode::HalfRepeat(3));
        assert_eq!(RepeatMode::from_threshold(3).threshold(), 3);
    }

    #[test]
    fn test_eligibility() {
        let mut cycle = ExclusionCycle::default();
        cycle.record(["Ann"]);
        cycle.record(["Ann"]);

        assert!(RepeatMode::Repeat.is_eligible(&cycle, "Ann"));
        assert!(!RepeatMode::NoRepeatUntilExhausted.is_eligible(&cycle, "Ann"));
        assert!(RepeatMode::NoRepeatUntilExhausted.is_eligible(&cycle, "Bo"));
        assert!(RepeatMode::HalfRepeat(3).is_eligible(&cycle, "Ann"));
        assert!(!RepeatMode::HalfRepeat(2).is_eligible(&cycle, "Ann"));
    }

    #[test]
    fn test_only_repeat_skips_cycle() {
        assert!(!RepeatMode::Repeat.tracks_cycle());
        assert!(RepeatMode::HalfRepeat(2).tracks_cycle());
    }

    #[test]
    fn test_cycle_limit() {
        assert_eq!(RepeatMode::Repeat.cycle_limit(), None);
        assert_eq!(RepeatMode::NoRepeatUntilExhausted.cycle_limit(), Some(1));
        assert_eq!(RepeatMode::HalfRepeat(4).cycle_limit(), Some(4));
        assert_eq!(RepeatMode::HalfRepeat(0).cycle_limit(), Some(1));
    }
}
