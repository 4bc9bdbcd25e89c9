//! Weighted random selection
//!
//! Every decision point in the agent draws through here, so "nothing worth
//! choosing" is a normal `None` rather than an error.

use rand::Rng;

use crate::core::error::{Result, TacticsError};

/// Weights below this are treated as zero probability
pub const PICK_EPSILON: f64 = 1e-9;

/// Draw one candidate with probability proportional to its weight.
///
/// Candidates are walked in input order. Returns `None` for an empty or
/// all-negligible distribution.
pub fn weighted_pick<T, R>(weights: impl IntoIterator<Item = (T, f64)>, rng: &mut R) -> Option<T>
where
    R: Rng + ?Sized,
{
    let usable: Vec<(T, f64)> = weights
        .into_iter()
        .filter(|(_, w)| w.is_finite() && *w >= PICK_EPSILON)
        .collect();

    let total: f64 = usable.iter().map(|(_, w)| w).sum();
    if usable.is_empty() || total < PICK_EPSILON {
        return None;
    }

    let mut remaining = rng.gen::<f64>() * total;
    let mut last = None;
    for (candidate, weight) in usable {
        if remaining < weight {
            return Some(candidate);
        }
        remaining -= weight;
        last = Some(candidate);
    }

    // Float rounding can walk past the end; the last usable candidate wins.
    last
}

/// Like [`weighted_pick`], for call sites where "no selection" is a bug.
pub fn weighted_pick_required<T, R>(
    weights: impl IntoIterator<Item = (T, f64)>,
    rng: &mut R,
) -> Result<T>
where
    R: Rng + ?Sized,
{
    weighted_pick(weights, rng).ok_or(TacticsError::EmptyDistribution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_empty_returns_none() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let empty: Vec<(u32, f64)> = Vec::new();
        assert_eq!(weighted_pick(empty, &mut rng), None);
    }

    #[test]
    fn test_all_zero_returns_none() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(weighted_pick(vec![("a", 0.0), ("b", 1e-12)], &mut rng), None);
    }

    #[test]
    fn test_required_variant_errors_on_empty() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = weighted_pick_required(vec![("a", 0.0)], &mut rng);
        assert!(matches!(result, Err(TacticsError::EmptyDistribution)));
    }

    #[test]
    fn test_negligible_weights_never_picked() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..1000 {
            let pick = weighted_pick(vec![("ghost", 1e-12), ("real", 0.5)], &mut rng);
            assert_eq!(pick, Some("real"));
        }
    }

    #[test]
    fn test_proportional_sampling() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut a = 0u32;
        let mut b = 0u32;
        for _ in 0..100_000 {
            match weighted_pick(vec![("A", 1.0), ("B", 3.0)], &mut rng) {
                Some("A") => a += 1,
                Some("B") => b += 1,
                other => panic!("unexpected pick {:?}", other),
            }
        }
        let ratio = b as f64 / a as f64;
        assert!((2.8..3.2).contains(&ratio), "ratio was {}", ratio);
    }

    proptest! {
        #[test]
        fn prop_pick_is_member(weights in proptest::collection::vec(0.0f64..10.0, 1..20), seed in any::<u64>()) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let pairs: Vec<(usize, f64)> = weights.iter().copied().enumerate().collect();
            let total: f64 = weights.iter().filter(|w| **w >= PICK_EPSILON).sum();
            match weighted_pick(pairs, &mut rng) {
                Some(index) => {
                    prop_assert!(index < weights.len());
                    prop_assert!(weights[index] >= PICK_EPSILON);
                }
                None => prop_assert!(total < PICK_EPSILON),
            }
        }
    }
}
