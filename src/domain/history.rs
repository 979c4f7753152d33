//! Persisted draw history for a single pool.
//!
//! Every field carries `#[serde(default)]` so records written by older releases (or
//! hand-edited ones) load with empty maps and zero counters instead of failing.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::pool::FilterSentinels;
use crate::clock;

/// Draw method tag written into each event. Only one method exists today.
pub const DRAW_METHOD_WEIGHTED: u32 = 1;

/// Everything remembered about one pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(default, alias = "students")]
    pub entities: BTreeMap<String, EntityHistory>,

    /// Picks per group across all rounds
    #[serde(default)]
    pub group_stats: BTreeMap<String, i64>,

    /// Picks per gender across all rounds
    #[serde(default)]
    pub gender_stats: BTreeMap<String, i64>,

    #[serde(default)]
    pub subject_stats: BTreeMap<String, SubjectAggregate>,

    #[serde(default)]
    pub total_rounds: u64,

    #[serde(default, alias = "total_stats")]
    pub total_selections: u64,
}

/// History of one candidate within a pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityHistory {
    #[serde(default)]
    pub total_count: u64,

    /// Picks made while a group filter was active
    #[serde(default)]
    pub group_hit_count: u64,

    /// Picks made while a gender filter was active
    #[serde(default)]
    pub gender_hit_count: u64,

    #[serde(default, with = "clock::optional_timestamp")]
    pub last_drawn_time: Option<NaiveDateTime>,

    /// Consecutive confirmed rounds since this candidate was last picked
    #[serde(default)]
    pub rounds_missed: u64,

    #[serde(default)]
    pub history: Vec<DrawEvent>,

    #[serde(default)]
    pub subject_stats: BTreeMap<String, SubjectTally>,
}

/// One pick of one candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawEvent {
    #[serde(default = "default_method", alias = "draw_method")]
    pub method: u32,

    #[serde(default, alias = "draw_time", with = "clock::timestamp")]
    pub time: NaiveDateTime,

    /// How many candidates were picked in the same round
    #[serde(default, alias = "draw_people_numbers")]
    pub batch_size: u32,

    #[serde(default, alias = "draw_group")]
    pub group_filter: Option<String>,

    #[serde(default, alias = "draw_gender")]
    pub gender_filter: Option<String>,

    /// Weight the candidate had when the round was drawn, kept for audit
    #[serde(default, alias = "weight")]
    pub weight_at_draw: Option<f64>,

    #[serde(default, alias = "class_name", skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

fn default_method() -> u32 {
    DRAW_METHOD_WEIGHTED
}

/// Pool-level statistics restricted to rounds drawn under one subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectAggregate {
    #[serde(default)]
    pub group_stats: BTreeMap<String, i64>,

    #[serde(default)]
    pub gender_stats: BTreeMap<String, i64>,

    #[serde(default)]
    pub total_rounds: u64,

    #[serde(default, alias = "total_stats")]
    pub total_selections: u64,
}

/// Per-candidate pick counts under one subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectTally {
    #[serde(default)]
    pub total_count: u64,

    /// Picks made while both a group and a gender filter were active
    #[serde(default)]
    pub group_gender_count: u64,
}

impl HistoryRecord {
    pub fn entity(&self, name: &str) -> Option<&EntityHistory> {
        self.entities.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.total_rounds == 0 && self.total_selections == 0
    }

    /// Repair the parts of a legacy record that serde defaults cannot.
    ///
    /// Older files store the UI's "no filter" label (or an empty string) as the event
    /// filter, and never stored hit counts. Filters equal to a sentinel become `None`,
    /// and entities without hit counts get them rebuilt from their events.
    pub fn normalize(&mut self, sentinels: &FilterSentinels) {
        for entity in self.entities.values_mut() {
            for event in entity.history.iter_mut() {
                event.group_filter = clean_filter(event.group_filter.take(), &sentinels.all_groups);
                event.gender_filter = clean_filter(event.gender_filter.take(), &sentinels.all_genders);
            }
            if entity.group_hit_count == 0 && entity.gender_hit_count == 0 {
                entity.group_hit_count = entity.history.iter().filter(|e| e.group_filter.is_some()).count() as u64;
                entity.gender_hit_count = entity.history.iter().filter(|e| e.gender_filter.is_some()).count() as u64;
            }
        }
    }
}

fn clean_filter(value: Option<String>, sentinel: &str) -> Option<String> {
    value.filter(|v| !v.trim().is_empty() && v != sentinel)
}
