//! Index sampling over weight slices.
//!
//! All functions return indices into the slice they were given. Negative and NaN
//! weights count as zero; a set with no positive weight falls back to a uniform pick.

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

fn usable(weights: &[f64]) -> Vec<f64> {
    weights
        .iter()
        .map(|&w| if w.is_finite() && w > 0.0 { w } else { 0.0 })
        .collect()
}

fn pick_one<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> usize {
    match WeightedIndex::new(usable(weights)) {
        Ok(dist) => dist.sample(rng),
        Err(e) => {
            log::debug!("Weighted pick fell back to uniform: {}", e);
            rng.random_range(0..weights.len())
        }
    }
}

/// Pick `count` distinct indices, one at a time proportional to weight, removing each
/// pick and renormalizing before the next. Returns fewer than `count` only when the
/// slice runs out.
pub fn weighted_without_replacement<R: Rng + ?Sized>(weights: &[f64], count: usize, rng: &mut R) -> Vec<usize> {
    let mut available: Vec<(usize, f64)> = weights.iter().copied().enumerate().collect();
    let mut selected = Vec::with_capacity(count.min(weights.len()));

    while selected.len() < count && !available.is_empty() {
        let current: Vec<f64> = available.iter().map(|(_, w)| *w).collect();
        let idx = pick_one(&current, rng);
        let (index, _) = available.remove(idx);
        selected.push(index);
    }

    selected
}

/// Pick `count` indices independently proportional to weight; repeats are possible.
pub fn weighted_with_replacement<R: Rng + ?Sized>(weights: &[f64], count: usize, rng: &mut R) -> Vec<usize> {
    if weights.is_empty() {
        return Vec::new();
    }
    match WeightedIndex::new(usable(weights)) {
        Ok(dist) => (0..count).map(|_| dist.sample(rng)).collect(),
        Err(_) => (0..count).map(|_| rng.random_range(0..weights.len())).collect(),
    }
}

/// Uniform pick of `count` indices out of `len`, for animation frames.
///
/// Distinct while `count <= len`, with replacement beyond that.
pub fn uniform_preview<R: Rng + ?Sized>(len: usize, count: usize, rng: &mut R) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    if count > len {
        return (0..count).map(|_| rng.random_range(0..len)).collect();
    }
    rand::seq::index::sample(rng, len, count).into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn test_without_replacement_is_distinct() {
        let mut rng = StdRng::seed_from_u64(42);
        let picks = weighted_without_replacement(&[1.0, 2.0, 3.0, 4.0], 4, &mut rng);
        assert_eq!(picks.len(), 4);
        assert_eq!(picks.iter().collect::<HashSet<_>>().len(), 4);
    }

    #[test]
    fn test_without_replacement_stops_when_exhausted() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(weighted_without_replacement(&[1.0, 1.0], 5, &mut rng).len(), 2);
    }

    #[test]
    fn test_zero_weight_is_never_picked_while_others_remain() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let picks = weighted_without_replacement(&[0.0, 1.0, 1.0], 2, &mut rng);
            assert!(!picks.contains(&0));
        }
    }

    #[test]
    fn test_heavier_weight_wins_more_often() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut heavy = 0;
        for _ in 0..2000 {
            if weighted_without_replacement(&[0.1, 5.0], 1, &mut rng)[0] == 1 {
                heavy += 1;
            }
        }
        assert!(heavy > 1800, "heavy picked {heavy} times");
    }

    #[test]
    fn test_negative_weight_counts_as_zero() {
        let mut rng = StdRng::seed_from_u64(13);
        for _ in 0..200 {
            assert_eq!(weighted_without_replacement(&[-0.5, 0.0, 2.0], 1, &mut rng), vec![2]);
            assert_eq!(weighted_with_replacement(&[f64::NAN, 3.0, -1.0], 3, &mut rng), vec![1, 1, 1]);
        }
    }

    #[test]
    fn test_all_zero_weights_fall_back_to_uniform() {
        let mut rng = StdRng::seed_from_u64(9);
        let picks = weighted_without_replacement(&[0.0, 0.0, 0.0], 3, &mut rng);
        assert_eq!(picks.iter().collect::<HashSet<_>>().len(), 3);
        assert_eq!(weighted_with_replacement(&[0.0, 0.0], 4, &mut rng).len(), 4);
    }

    #[test]
    fn test_with_replacement_fills_count() {
        let mut rng = StdRng::seed_from_u64(5);
        let picks = weighted_with_replacement(&[1.0, 1.0], 6, &mut rng);
        assert_eq!(picks.len(), 6);
        assert!(picks.iter().all(|&i| i < 2));
        assert!(weighted_with_replacement(&[], 3, &mut rng).is_empty());
    }

    #[test]
    fn test_uniform_preview() {
        let mut rng = StdRng::seed_from_u64(11);
        let distinct = uniform_preview(5, 5, &mut rng);
        assert_eq!(distinct.iter().collect::<HashSet<_>>().len(), 5);

        let repeated = uniform_preview(2, 5, &mut rng);
        assert_eq!(repeated.len(), 5);
        assert!(uniform_preview(0, 3, &mut rng).is_empty());
    }
}
