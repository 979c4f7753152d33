//! Frequency factor: penalizes candidates picked more often than their peers.

use super::settings::{FrequencyFunction, WeightSettings};

/// Floor of the band cold start compresses the factor into.
pub const COLD_START_FLOOR: f64 = 0.8;
/// Share of the raw factor kept during cold start.
pub const COLD_START_SLOPE: f64 = 0.2;

/// Raw curve value before cold start and the frequency multiplier.
///
/// The `+ 1` offsets keep every denominator non-zero when counts are 0.
pub fn frequency_curve(function: FrequencyFunction, total_count: u64, max_total_count: u64) -> f64 {
    let count = total_count as f64;
    let max = max_total_count as f64;
    match function {
        FrequencyFunction::Linear => (max - count + 1.0) / (max + 1.0),
        FrequencyFunction::Sqrt => (max + 1.0).sqrt() / (count + 1.0).sqrt(),
        FrequencyFunction::Exponential => {
            if max_total_count == 0 {
                1.0
            } else {
                ((max - count) / max).exp()
            }
        }
    }
}

/// Frequency factor for one candidate, 0 when fair drawing is off.
pub fn frequency_factor(settings: &WeightSettings, total_count: u64, max_total_count: u64, cold_start: bool) -> f64 {
    if !settings.fair_draw_enabled {
        return 0.0;
    }

    let mut factor = frequency_curve(settings.frequency_function, total_count, max_total_count);
    if cold_start {
        factor = f64::min(COLD_START_FLOOR + factor * COLD_START_SLOPE, factor);
    }

    factor * settings.frequency_weight
}
