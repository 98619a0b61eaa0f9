//! Top-k selection and ranking.
//!
//! Every ordering here is a stable sort, so equal scores keep the order in
//! which they were enumerated and a top-`k1` result is always a prefix of the
//! top-`k2` result for `k1 < k2`.

use std::cmp::Ordering;

/// Anything carrying a rankable score.
pub trait Scored {
    fn score(&self) -> f64;
}

impl Scored for f64 {
    fn score(&self) -> f64 {
        *self
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Indices of the `min(k, values.len())` largest values, largest first.
pub fn top_k_indices(values: &[f64], k: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|a, b| descending(values[*a], values[*b]));
    indices.truncate(k);
    indices
}

/// Keep everything in enumeration order when `k` is `None`, otherwise the
/// `k` highest-scoring items sorted descending.
pub fn select_top_k<T: Scored>(mut items: Vec<T>, k: Option<usize>) -> Vec<T> {
    let Some(k) = k else {
        return items;
    };
    items.sort_by(|a, b| descending(a.score(), b.score()));
    items.truncate(k);
    items
}
