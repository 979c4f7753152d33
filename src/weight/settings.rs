//! Weight settings and their mapping from the settings collaborator's key/value bundles.
//!
//! The settings UI stores two flat groups, `fair_draw_settings` and
//! `advanced_settings`. Missing keys take the defaults below; malformed values are
//! reported as configuration problems and also fall back to the default, so a bad
//! settings file never stops a draw.

use std::collections::BTreeMap;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::balance::BalanceTunables;
use crate::error::FairDrawError;

/// One flat settings group as stored by the settings collaborator.
pub type SettingsBundle = BTreeMap<String, Value>;

pub const DEFAULT_BASE_WEIGHT: f64 = 1.0;
pub const DEFAULT_MIN_WEIGHT: f64 = 0.1;
pub const DEFAULT_MAX_WEIGHT: f64 = 5.0;
pub const DEFAULT_FACTOR_WEIGHT: f64 = 1.0;
pub const DEFAULT_COLD_START_ROUNDS: u64 = 10;

/// Shape of the frequency penalty curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyFunction {
    Linear,
    #[default]
    Sqrt,
    Exponential,
}

impl FrequencyFunction {
    /// Map the stored integer code; unknown codes mean `Sqrt`.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => FrequencyFunction::Linear,
            2 => FrequencyFunction::Exponential,
            _ => FrequencyFunction::Sqrt,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            FrequencyFunction::Linear => 0,
            FrequencyFunction::Sqrt => 1,
            FrequencyFunction::Exponential => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShieldUnit {
    #[default]
    Seconds,
    Minutes,
    Hours,
}

impl ShieldUnit {
    /// 0 seconds, 1 minutes, anything else hours.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => ShieldUnit::Seconds,
            1 => ShieldUnit::Minutes,
            _ => ShieldUnit::Hours,
        }
    }

    fn seconds(&self) -> f64 {
        match self {
            ShieldUnit::Seconds => 1.0,
            ShieldUnit::Minutes => 60.0,
            ShieldUnit::Hours => 3600.0,
        }
    }
}

/// How long a candidate stays shielded after being drawn.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ShieldDuration {
    pub value: f64,
    pub unit: ShieldUnit,
}

impl ShieldDuration {
    pub fn new(value: f64, unit: ShieldUnit) -> Self {
        Self { value, unit }
    }

    pub fn as_delta(&self) -> TimeDelta {
        let millis = (self.value.max(0.0) * self.unit.seconds() * 1000.0).round() as i64;
        TimeDelta::milliseconds(millis)
    }
}

/// Everything the weight engine reads.
///
/// `min_weight <= base_weight <= max_weight` is expected but not enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightSettings {
    pub fair_draw_enabled: bool,
    pub fair_draw_group_enabled: bool,
    pub fair_draw_gender_enabled: bool,
    pub fair_draw_time_enabled: bool,
    pub base_weight: f64,
    pub min_weight: f64,
    pub max_weight: f64,
    pub frequency_function: FrequencyFunction,
    pub frequency_weight: f64,
    pub group_weight: f64,
    pub gender_weight: f64,
    pub time_weight: f64,
    pub cold_start_enabled: bool,
    /// Cold start lasts while the pool's total selections stay below this
    pub cold_start_rounds: u64,
    pub shield_enabled: bool,
    pub shield_duration: ShieldDuration,
    pub balance: BalanceTunables,
}

impl Default for WeightSettings {
    fn default() -> Self {
        Self {
            fair_draw_enabled: false,
            fair_draw_group_enabled: false,
            fair_draw_gender_enabled: false,
            fair_draw_time_enabled: false,
            base_weight: DEFAULT_BASE_WEIGHT,
            min_weight: DEFAULT_MIN_WEIGHT,
            max_weight: DEFAULT_MAX_WEIGHT,
            frequency_function: FrequencyFunction::default(),
            frequency_weight: DEFAULT_FACTOR_WEIGHT,
            group_weight: DEFAULT_FACTOR_WEIGHT,
            gender_weight: DEFAULT_FACTOR_WEIGHT,
            time_weight: DEFAULT_FACTOR_WEIGHT,
            cold_start_enabled: false,
            cold_start_rounds: DEFAULT_COLD_START_ROUNDS,
            shield_enabled: false,
            shield_duration: ShieldDuration::default(),
            balance: BalanceTunables::default(),
        }
    }
}

impl WeightSettings {
    /// Lowest weight the engine will ever hand out.
    pub fn weight_floor(&self) -> f64 {
        self.min_weight / 10.0
    }

    /// Build settings from the two bundles, logging any value that had to be defaulted.
    pub fn from_bundles(fair: &SettingsBundle, advanced: &SettingsBundle) -> Self {
        let (settings, problems) = Self::parse_bundles(fair, advanced);
        for problem in &problems {
            log::warn!("{}; using default", problem);
        }
        settings
    }

    /// Build settings from the two bundles and return the problems found alongside.
    pub fn parse_bundles(fair: &SettingsBundle, advanced: &SettingsBundle) -> (Self, Vec<FairDrawError>) {
        let d = Self::default();
        let mut r = BundleReader::default();

        let settings = Self {
            fair_draw_enabled: r.bool(fair, "fair_draw", d.fair_draw_enabled),
            fair_draw_group_enabled: r.bool(fair, "fair_draw_group", d.fair_draw_group_enabled),
            fair_draw_gender_enabled: r.bool(fair, "fair_draw_gender", d.fair_draw_gender_enabled),
            fair_draw_time_enabled: r.bool(fair, "fair_draw_time", d.fair_draw_time_enabled),
            base_weight: r.float(fair, "base_weight", d.base_weight),
            min_weight: r.float(fair, "min_weight", d.min_weight),
            max_weight: r.float(fair, "max_weight", d.max_weight),
            frequency_function: FrequencyFunction::from_code(r.int(
                fair,
                "frequency_function",
                d.frequency_function.code(),
            )),
            frequency_weight: r.float(fair, "frequency_weight", d.frequency_weight),
            group_weight: r.float(fair, "group_weight", d.group_weight),
            gender_weight: r.float(fair, "gender_weight", d.gender_weight),
            time_weight: r.float(fair, "time_weight", d.time_weight),
            cold_start_enabled: r.bool(fair, "cold_start_enabled", d.cold_start_enabled),
            cold_start_rounds: r.int(fair, "cold_start_rounds", d.cold_start_rounds as i64).max(0) as u64,
            shield_enabled: r.bool(advanced, "shield_enabled", d.shield_enabled),
            shield_duration: ShieldDuration::new(
                r.float(advanced, "shield_time", 0.0),
                ShieldUnit::from_code(r.int(advanced, "shield_time_unit", 0)),
            ),
            balance: d.balance,
        };

        (settings, r.problems)
    }
}

/// Lenient typed access into a bundle that remembers what it had to default.
#[derive(Default)]
struct BundleReader {
    problems: Vec<FairDrawError>,
}

impl BundleReader {
    fn bool(&mut self, bundle: &SettingsBundle, key: &str, default: bool) -> bool {
        match bundle.get(key) {
            None | Some(Value::Null) => default,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) if n.as_i64().is_some() => n.as_i64() != Some(0),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => true,
                "false" | "0" | "no" | "off" => false,
                _ => self.reject(key, "boolean", default),
            },
            Some(_) => self.reject(key, "boolean", default),
        }
    }

    fn float(&mut self, bundle: &SettingsBundle, key: &str, default: f64) -> f64 {
        let parsed = match bundle.get(key) {
            None | Some(Value::Null) => return default,
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(_) => None,
        };
        match parsed {
            Some(v) if v.is_finite() => v,
            _ => self.reject(key, "number", default),
        }
    }

    fn int(&mut self, bundle: &SettingsBundle, key: &str, default: i64) -> i64 {
        let parsed = match bundle.get(key) {
            None | Some(Value::Null) => return default,
            Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            Some(_) => None,
        };
        match parsed {
            Some(v) => v,
            None => self.reject(key, "integer", default),
        }
    }

    fn reject<T>(&mut self, key: &str, expected: &str, default: T) -> T {
        self.problems
            .push(FairDrawError::Configuration(format!("{}: expected {}", key, expected)));
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bundle(value: serde_json::Value) -> SettingsBundle {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_empty_bundles_give_defaults() {
        let (settings, problems) = WeightSettings::parse_bundles(&SettingsBundle::new(), &SettingsBundle::new());
        assert_eq!(settings, WeightSettings::default());
        assert!(problems.is_empty());
    }

    #[test]
    fn test_bundle_values_are_mapped() {
        let fair = bundle(json!({
            "fair_draw": true,
            "fair_draw_group": 1,
            "fair_draw_time": "true",
            "base_weight": 2,
            "max_weight": "8.5",
            "frequency_function": 2,
            "group_weight": 0.5,
            "cold_start_enabled": true,
            "cold_start_rounds": 4
        }));
        let advanced = bundle(json!({"shield_enabled": true, "shield_time": 5, "shield_time_unit": 1}));

        let (s, problems) = WeightSettings::parse_bundles(&fair, &advanced);
        assert!(problems.is_empty());
        assert!(s.fair_draw_enabled);
        assert!(s.fair_draw_group_enabled);
        assert!(!s.fair_draw_gender_enabled);
        assert!(s.fair_draw_time_enabled);
        assert_eq!(s.base_weight, 2.0);
        assert_eq!(s.max_weight, 8.5);
        assert_eq!(s.frequency_function, FrequencyFunction::Exponential);
        assert_eq!(s.group_weight, 0.5);
        assert_eq!(s.cold_start_rounds, 4);
        assert!(s.shield_enabled);
        assert_eq!(s.shield_duration.as_delta(), TimeDelta::minutes(5));
    }

    #[test]
    fn test_malformed_values_default_and_report() {
        let fair = bundle(json!({"base_weight": "heavy", "fair_draw": [1], "cold_start_rounds": "x"}));
        let (s, problems) = WeightSettings::parse_bundles(&fair, &SettingsBundle::new());
        assert_eq!(s.base_weight, DEFAULT_BASE_WEIGHT);
        assert!(!s.fair_draw_enabled);
        assert_eq!(s.cold_start_rounds, DEFAULT_COLD_START_ROUNDS);
        assert_eq!(problems.len(), 3);
        assert!(problems.iter().all(|p| matches!(p, FairDrawError::Configuration(_))));
    }

    #[test]
    fn test_unknown_frequency_code_is_sqrt() {
        assert_eq!(FrequencyFunction::from_code(9), FrequencyFunction::Sqrt);
        assert_eq!(FrequencyFunction::from_code(-1), FrequencyFunction::Sqrt);
        assert_eq!(FrequencyFunction::from_code(0), FrequencyFunction::Linear);
    }

    #[test]
    fn test_shield_units() {
        assert_eq!(ShieldDuration::new(30.0, ShieldUnit::Seconds).as_delta(), TimeDelta::seconds(30));
        assert_eq!(ShieldDuration::new(2.0, ShieldUnit::Hours).as_delta(), TimeDelta::hours(2));
        assert_eq!(ShieldUnit::from_code(7), ShieldUnit::Hours);
        assert_eq!(ShieldDuration::new(-3.0, ShieldUnit::Minutes).as_delta(), TimeDelta::zero());
    }

    #[test]
    fn test_weight_floor() {
        let s = WeightSettings::default();
        assert!((s.weight_floor() - 0.01).abs() < 1e-12);
    }
}
