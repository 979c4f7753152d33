//! The weight engine: history + settings in, weighted candidates out.
//!
//! Pure and deterministic for a given evaluation instant. The result is a fresh value
//! every call; nothing here is cached or written back into the history record.

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use super::balance::{BalanceInput, balance_factor};
use super::frequency::frequency_factor;
use super::settings::{FrequencyFunction, WeightSettings};
use crate::clock;
use crate::domain::{Candidate, EntityHistory, HistoryRecord};

/// Idle days after which the time factor reaches its full value.
pub const TIME_RAMP_DAYS: f64 = 30.0;

/// How a candidate's weight was put together, for display and diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightBreakdown {
    pub base_weight: f64,
    pub frequency_penalty: f64,
    pub group_balance: f64,
    pub gender_balance: f64,
    pub time_factor: f64,
    pub total_weight: f64,
    pub is_cold_start: bool,
    pub total_count: u64,
    pub max_total_count: u64,
    pub frequency_function: FrequencyFunction,
    pub is_shielded: bool,
    pub shield_remaining_seconds: f64,
    pub shield_enabled: bool,
}

/// A candidate annotated with its weight for one weighting pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedCandidate {
    pub candidate: Candidate,
    pub weight: f64,
    pub breakdown: WeightBreakdown,
}

/// Weights at the current local time.
pub fn compute_weights(
    candidates: &[Candidate],
    history: &HistoryRecord,
    settings: &WeightSettings,
) -> Vec<WeightedCandidate> {
    compute_weights_at(candidates, history, settings, clock::now())
}

/// Weights as of `now`.
pub fn compute_weights_at(
    candidates: &[Candidate],
    history: &HistoryRecord,
    settings: &WeightSettings,
    now: NaiveDateTime,
) -> Vec<WeightedCandidate> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let empty = EntityHistory::default();
    let stats: Vec<&EntityHistory> = candidates
        .iter()
        .map(|c| history.entity(c.history_key()).unwrap_or(&empty))
        .collect();

    let max_total_count = stats.iter().map(|s| s.total_count).max().unwrap_or(0);
    let max_group_hits = stats.iter().map(|s| s.group_hit_count).max().unwrap_or(0);
    let max_gender_hits = stats.iter().map(|s| s.gender_hit_count).max().unwrap_or(0);

    let cold_start = settings.cold_start_enabled && history.total_selections < settings.cold_start_rounds;

    candidates
        .iter()
        .zip(stats)
        .map(|(candidate, entity)| {
            let frequency_penalty = frequency_factor(settings, entity.total_count, max_total_count, cold_start);

            let group_balance = balance_factor(
                settings.fair_draw_group_enabled,
                &BalanceInput {
                    value: candidate.group.as_deref(),
                    tally: &history.group_stats,
                    own_hits: entity.group_hit_count,
                    max_hits: max_group_hits,
                },
                settings.group_weight,
                &settings.balance,
            );

            let gender_balance = balance_factor(
                settings.fair_draw_gender_enabled,
                &BalanceInput {
                    value: candidate.gender.as_deref(),
                    tally: &history.gender_stats,
                    own_hits: entity.gender_hit_count,
                    max_hits: max_gender_hits,
                },
                settings.gender_weight,
                &settings.balance,
            );

            let time_factor = time_factor(settings, entity.last_drawn_time, now);
            let shield_remaining = shield_remaining(settings, entity.last_drawn_time, now);

            let mut total = settings.base_weight + frequency_penalty + group_balance + gender_balance + time_factor;
            if shield_remaining.is_some() {
                total = settings.weight_floor();
            }
            let weight = round2(f64::max(settings.weight_floor(), f64::min(settings.max_weight, total)));

            WeightedCandidate {
                candidate: candidate.clone(),
                weight,
                breakdown: WeightBreakdown {
                    base_weight: settings.base_weight,
                    frequency_penalty,
                    group_balance,
                    gender_balance,
                    time_factor,
                    total_weight: weight,
                    is_cold_start: cold_start,
                    total_count: entity.total_count,
                    max_total_count,
                    frequency_function: settings.frequency_function,
                    is_shielded: shield_remaining.is_some(),
                    shield_remaining_seconds: round2(shield_remaining.unwrap_or(0.0)),
                    shield_enabled: settings.shield_enabled,
                },
            }
        })
        .collect()
}

/// Bonus for candidates left alone a long time, ramping linearly up to `TIME_RAMP_DAYS`.
fn time_factor(settings: &WeightSettings, last_drawn: Option<NaiveDateTime>, now: NaiveDateTime) -> f64 {
    if !settings.fair_draw_time_enabled {
        return 0.0;
    }
    let Some(last) = last_drawn else {
        return 0.0;
    };
    // clock skew can put the last draw in the future; treat that as "just drawn"
    let days = (now - last).num_days().max(0) as f64;
    f64::min(1.0, days / TIME_RAMP_DAYS) * settings.time_weight
}

/// Seconds of shielding left, or `None` when the candidate is not shielded.
fn shield_remaining(settings: &WeightSettings, last_drawn: Option<NaiveDateTime>, now: NaiveDateTime) -> Option<f64> {
    if !settings.shield_enabled {
        return None;
    }
    let last = last_drawn?;
    let window = settings.shield_duration.as_delta();
    // A future timestamp counts as drawn just now.
    let elapsed = (now - last).max(TimeDelta::zero());
    if elapsed < window {
        Some((window - elapsed).num_milliseconds() as f64 / 1000.0)
    } else {
        None
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
