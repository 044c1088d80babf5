//! Squared Euclidean distortion and nearest-codeword search.
//!
//! Only relative comparisons are ever needed, so the square root is
//! never taken.

use crate::{Result, VqError};

/// Squared Euclidean distance between two vectors of equal dimension.
///
/// # Errors
///
/// Returns [`VqError::DimensionMismatch`] if `a` and `b` differ in length.
pub fn distance_sq(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(VqError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    Ok(distance_sq_unchecked(a, b))
}

/// Hot-path variant of [`distance_sq`] for operands whose dimensions
/// were already validated.
///
/// # Panics
///
/// Debug-panics if the lengths differ.
#[inline]
pub(crate) fn distance_sq_unchecked(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "dimension mismatch in distance_sq");
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Index and squared distance of the codeword nearest to `vector`.
///
/// Scans left to right with a strict `<`, so ties go to the lowest index.
/// A NaN distance loses to every comparable one; if all distances are
/// NaN the first codeword is returned. Returns `None` when `codewords`
/// is empty.
pub(crate) fn nearest<'a, I>(vector: &[f64], codewords: I) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut best: Option<(usize, f64)> = None;
    for (k, c) in codewords.into_iter().enumerate() {
        let d = distance_sq_unchecked(vector, c);
        let better = match best {
            None => true,
            Some((_, best_d)) => d < best_d || (best_d.is_nan() && !d.is_nan()),
        };
        if better {
            best = Some((k, d));
        }
    }
    best
}
