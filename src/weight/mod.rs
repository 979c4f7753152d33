//! Weight engine for fair drawing.
//!
//! Each candidate's weight is
//! `base + frequency + group balance + gender balance + time`, replaced by
//! `min_weight / 10` while the candidate is shielded, then clamped to
//! `[min_weight / 10, max_weight]` and rounded to two decimals.
//!
//! - **Frequency**: candidates picked more than the busiest peer get less
//!   (linear, square-root or exponential curve), softened during cold start.
//! - **Balance**: group and gender share one implementation, see [`balance`].
//! - **Time**: up to a full `time_weight` bonus after 30 idle days.
//! - **Shield**: a fixed window after each pick with near-zero weight.
//!
//! # Example
//!
//! ```ignore
//! use fairdraw::weight::{WeightSettings, compute_weights};
//!
//! let weights = compute_weights(&roster, &history, &WeightSettings::default());
//! for w in &weights {
//!     println!("{} {:.2}", w.candidate.name, w.weight);
//! }
//! ```

pub mod balance;
mod engine;
mod format;
mod frequency;
mod settings;

pub use balance::{BalanceInput, BalanceTunables, balance_factor};
pub use engine::{TIME_RAMP_DAYS, WeightBreakdown, WeightedCandidate, compute_weights, compute_weights_at};
pub use format::format_weight_column;
pub use frequency::{COLD_START_FLOOR, COLD_START_SLOPE, frequency_curve, frequency_factor};
pub use settings::{
    DEFAULT_BASE_WEIGHT, DEFAULT_COLD_START_ROUNDS, DEFAULT_MAX_WEIGHT, DEFAULT_MIN_WEIGHT, FrequencyFunction,
    SettingsBundle, ShieldDuration, ShieldUnit, WeightSettings,
};
