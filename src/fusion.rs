//! Reciprocal-rank fusion of text and vector result lists.
//!
//! Each chunk's fused score is the weighted sum of `1 / (k + rank)` over
//! its appearances in the two input lists. The constant `k = 60` keeps
//! single-list outliers from dominating chunks that both retrievers
//! agree on.

use std::collections::HashMap;

use crate::models::SearchResult;

/// RRF rank-smoothing constant.
pub const RRF_K: f64 = 60.0;

/// Default weight of the text (BM25) list.
pub const DEFAULT_TEXT_WEIGHT: f64 = 0.4;

/// Default weight of the vector list.
pub const DEFAULT_VECTOR_WEIGHT: f64 = 0.6;

/// Fuse two ranked result lists into one, descending by fused score,
/// truncated to `limit`.
///
/// When a chunk appears in both lists the text-side row payload wins (so
/// the BM25 value stays inspectable on intermediate results), but its
/// `score` is overwritten with the fused score either way.
pub fn reciprocal_rank_fusion(
    text_results: Vec<SearchResult>,
    vector_results: Vec<SearchResult>,
    text_weight: f64,
    vector_weight: f64,
    limit: usize,
) -> Vec<SearchResult> {
    let mut fused: HashMap<String, (SearchResult, f64)> = HashMap::new();

    for (rank, result) in text_results.into_iter().enumerate() {
        let contribution = text_weight / (RRF_K + (rank + 1) as f64);
        fused.insert(result.chunk_key.clone(), (result, contribution));
    }

    for (rank, result) in vector_results.into_iter().enumerate() {
        let contribution = vector_weight / (RRF_K + (rank + 1) as f64);
        fused
            .entry(result.chunk_key.clone())
            .and_modify(|(_, score)| *score += contribution)
            .or_insert((result, contribution));
    }

    let mut results: Vec<SearchResult> = fused
        .into_values()
        .map(|(mut result, score)| {
            result.score = score;
            result
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk_key.cmp(&b.chunk_key))
    });
    results.truncate(limit);
    results
}
