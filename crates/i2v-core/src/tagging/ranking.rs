//! Deterministic ranking of a probability slice.
//!
//! Order is descending probability with ties broken by ascending column, so
//! equal scores always come out in vocabulary order. NaN scores rank after
//! every number.

use std::cmp::Ordering;

fn by_score_desc(probs: &[f32]) -> impl Fn(&usize, &usize) -> Ordering + '_ {
    move |&a, &b| {
        probs[a]
            .is_nan()
            .cmp(&probs[b].is_nan())
            .then(probs[b].total_cmp(&probs[a]))
            .then(a.cmp(&b))
    }
}

/// Indices of the `k` highest entries of `probs`, best first.
///
/// `k` is clamped to `probs.len()`. When `k` is smaller than the slice only
/// the selected prefix is sorted.
pub fn top_k(probs: &[f32], k: usize) -> Vec<usize> {
    let k = k.min(probs.len());
    if k == 0 {
        return Vec::new();
    }

    let cmp = by_score_desc(probs);
    let mut indices: Vec<usize> = (0..probs.len()).collect();
    if k < indices.len() {
        indices.select_nth_unstable_by(k - 1, &cmp);
        indices.truncate(k);
    }
    indices.sort_unstable_by(&cmp);
    indices
}

/// Indices of every entry of `probs`, best first.
pub fn rank_all(probs: &[f32]) -> Vec<usize> {
    top_k(probs, probs.len())
}
