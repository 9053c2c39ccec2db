//! Distance functions over descriptor vectors.
//!
//! All functions assume `a.len() == b.len()`; callers validate widths at
//! the `FeatureSet` boundary so the hot loops stay branch-free.

use crate::types::Metric;

/// Dispatch to the distance function for `metric`.
#[inline]
pub fn compute_distance(a: &[f32], b: &[f32], metric: Metric) -> f32 {
    match metric {
        Metric::Euclidean => euclidean_distance(a, b),
        Metric::Hamming => hamming_distance(a, b),
    }
}

/// Euclidean (L2) distance.
#[inline]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    squared_euclidean_distance(a, b).sqrt()
}

/// Squared Euclidean distance. Monotone in the L2 distance, so it is enough
/// for nearest-neighbour lookups.
#[inline]
pub fn squared_euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Hamming distance over bit-expanded vectors: the number of positions
/// whose components differ.
#[inline]
pub fn hamming_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).filter(|(x, y)| x != y).count() as f32
}
