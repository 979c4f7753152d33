//! Picks made since the last reset of a no-repeat scope.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-candidate pick counts in the current exclusion cycle of one `DrawScope`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionCycle {
    #[serde(default)]
    pub picks: BTreeMap<String, u32>,
}

impl ExclusionCycle {
    pub fn picks_of(&self, key: &str) -> u32 {
        self.picks.get(key).copied().unwrap_or(0)
    }

    pub fn record<'a>(&mut self, keys: impl IntoIterator<Item = &'a str>) {
        for key in keys {
            *self.picks.entry(key.to_string()).or_insert(0) += 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_each_pick() {
        let mut cycle = ExclusionCycle::default();
        cycle.record(["Ann", "Bo"]);
        cycle.record(["Ann"]);
        assert_eq!(cycle.picks_of("Ann"), 2);
        assert_eq!(cycle.picks_of("Bo"), 1);
        assert_eq!(cycle.picks_of("Cy"), 0);
        assert!(!cycle.is_empty());
    }
}
