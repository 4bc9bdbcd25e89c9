//! Population sampling in instinct space
//!
//! Each orthonormal basis of the instinct space yields up to n mutually
//! orthogonal directions, so profiles drawn from one basis are decorrelated
//! rather than clustered along any axis.

use rand::Rng;

use crate::battle::ai::instinct::{InstinctKey, Instincts};
use crate::core::error::{Result, TacticsError};
use crate::math::random_orthonormal_basis;

/// Draw `size` instinct vectors over `keys`
///
/// Basis coordinates are multiplied by `spread` (default `sqrt(n)`), clamped
/// to `[-1, 1]` and denormalized into each key's range.
pub fn generate_population<R: Rng + ?Sized>(
    keys: &[InstinctKey],
    size: usize,
    spread: Option<f64>,
    rng: &mut R,
) -> Result<Vec<Instincts>> {
    let dimension = keys.len();
    if dimension == 0 {
        return Err(TacticsError::InvalidDimension(0));
    }
    let spread = spread.unwrap_or((dimension as f64).sqrt());

    let mut population = Vec::with_capacity(size);
    while population.len() < size {
        for direction in random_orthonormal_basis(dimension, rng)? {
            if population.len() == size {
                break;
            }
            population.push(Instincts::from_coordinates(keys, &direction, spread));
        }
    }

    tracing::debug!(size, dimension, spread, "Population generated");
    Ok(population)
}
