//! Pool identity, group/gender filters and the scope of a no-repeat cycle.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::candidate::Candidate;

/// Which kind of pool a history record belongs to.
///
/// A roll-call class and a lottery pool may share a name; the kind keeps them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    RollCall,
    Lottery,
    /// The groups of a class, drawn as a whole when prizes go to groups
    GroupDraw,
}

impl PoolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolKind::RollCall => "roll_call",
            PoolKind::Lottery => "lottery",
            PoolKind::GroupDraw => "group_draw",
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named pool of a given kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolKey {
    pub kind: PoolKind,
    pub name: String,
}

impl PoolKey {
    pub fn new(kind: PoolKind, name: impl Into<String>) -> Self {
        Self { kind, name: name.into() }
    }

    pub fn roll_call(name: impl Into<String>) -> Self {
        Self::new(PoolKind::RollCall, name)
    }

    pub fn lottery(name: impl Into<String>) -> Self {
        Self::new(PoolKind::Lottery, name)
    }

    /// The groups of the class `name`, as a pool of their own.
    pub fn groups_of(name: impl Into<String>) -> Self {
        Self::new(PoolKind::GroupDraw, name)
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// Labels the UI uses for "no filter" in the group and gender pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSentinels {
    pub all_groups: String,
    pub all_genders: String,
}

impl Default for FilterSentinels {
    fn default() -> Self {
        Self {
            all_groups: "all".to_string(),
            all_genders: "all".to_string(),
        }
    }
}

/// A group or gender restriction on a draw.
///
/// `All` never counts as a balancing dimension, so a filter equal to the UI's
/// "no filter" label must be converted with [`DrawFilter::from_selection`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum DrawFilter {
    #[default]
    All,
    Only(String),
}

impl DrawFilter {
    pub fn only(value: impl Into<String>) -> Self {
        DrawFilter::Only(value.into())
    }

    /// Build a filter from a picker value and that picker's "no filter" label.
    pub fn from_selection(value: Option<&str>, all_label: &str) -> Self {
        match value.map(str::trim) {
            None | Some("") => DrawFilter::All,
            Some(v) if v == all_label => DrawFilter::All,
            Some(v) => DrawFilter::Only(v.to_string()),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, DrawFilter::Only(_))
    }

    pub fn as_option(&self) -> Option<&str> {
        match self {
            DrawFilter::All => None,
            DrawFilter::Only(v) => Some(v.as_str()),
        }
    }

    /// Whether a candidate attribute passes this filter.
    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            DrawFilter::All => true,
            DrawFilter::Only(wanted) => value == Some(wanted.as_str()),
        }
    }
}

impl From<Option<String>> for DrawFilter {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(v) if !v.trim().is_empty() => DrawFilter::Only(v),
            _ => DrawFilter::All,
        }
    }
}

impl From<DrawFilter> for Option<String> {
    fn from(filter: DrawFilter) -> Self {
        match filter {
            DrawFilter::All => None,
            DrawFilter::Only(v) => Some(v),
        }
    }
}

impl fmt::Display for DrawFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawFilter::All => f.write_str("all"),
            DrawFilter::Only(v) => f.write_str(v),
        }
    }
}

/// The (pool, group filter, gender filter) combination a no-repeat cycle is tracked for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DrawScope {
    pub pool: PoolKey,
    pub group: DrawFilter,
    pub gender: DrawFilter,
}

impl DrawScope {
    pub fn new(pool: PoolKey, group: DrawFilter, gender: DrawFilter) -> Self {
        Self { pool, group, gender }
    }

    /// Unfiltered scope for a pool.
    pub fn whole_pool(pool: PoolKey) -> Self {
        Self::new(pool, DrawFilter::All, DrawFilter::All)
    }

    /// Stable document name for this scope within its pool kind.
    ///
    /// "No filter" is stored as an empty part, which no real group or gender can be.
    pub fn storage_name(&self) -> String {
        format!(
            "{}{}\u{1f}{}",
            self.storage_prefix(),
            self.group.as_option().unwrap_or(""),
            self.gender.as_option().unwrap_or("")
        )
    }

    /// Prefix shared by the storage names of every scope of this pool.
    pub fn storage_prefix(&self) -> String {
        format!("{}\u{1f}", self.pool.name)
    }

    /// Candidates that exist and pass both filters, in roster order.
    pub fn filter_candidates<'a>(&self, candidates: &'a [Candidate]) -> Vec<&'a Candidate> {
        candidates
            .iter()
            .filter(|c| c.exists)
            .filter(|c| self.group.matches(c.group.as_deref()))
            .filter(|c| self.gender.matches(c.gender.as_deref()))
            .collect()
    }
}

impl fmt::Display for DrawScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (group: {}, gender: {})", self.pool, self.group, self.gender)
    }
}
