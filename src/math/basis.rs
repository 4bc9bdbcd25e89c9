//! Vector routines for sampling decorrelated directions in instinct space

use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::error::{Result, TacticsError};

/// Residual norm below which a Gram-Schmidt sample is treated as co-linear
const COLINEAR_EPSILON: f64 = 1e-9;

/// Approximate standard normal sample (central limit over 12 uniforms)
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    (0..12).map(|_| rng.gen::<f64>()).sum::<f64>() - 6.0
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// Scale to unit length; `None` for a (near) zero vector
pub fn normalize(v: &[f64]) -> Option<Vec<f64>> {
    let len = norm(v);
    if len < COLINEAR_EPSILON {
        return None;
    }
    Some(v.iter().map(|x| x / len).collect())
}

/// Projection of `v` onto the unit vector `onto`
pub fn project(v: &[f64], onto: &[f64]) -> Vec<f64> {
    let scale = dot(v, onto);
    onto.iter().map(|x| x * scale).collect()
}

/// `n` pairwise-orthogonal unit vectors in `n` dimensions, in random order.
pub fn random_orthonormal_basis<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Result<Vec<Vec<f64>>> {
    if n == 0 {
        return Err(TacticsError::InvalidDimension(n));
    }

    if n == 1 {
        let sign = if rng.gen::<bool>() { 1.0 } else { -1.0 };
        return Ok(vec![vec![sign]]);
    }

    let mut basis: Vec<Vec<f64>> = Vec::with_capacity(n);
    while basis.len() < n {
        let mut sample: Vec<f64> = (0..n).map(|_| gaussian(rng)).collect();
        // Second sweep scrubs the rounding left by the first.
        for _ in 0..2 {
            for accepted in &basis {
                let shadow = project(&sample, accepted);
                for (s, p) in sample.iter_mut().zip(shadow) {
                    *s -= p;
                }
            }
        }
        if let Some(unit) = normalize(&sample) {
            basis.push(unit);
        }
    }

    basis.shuffle(rng);
    Ok(basis)
}
