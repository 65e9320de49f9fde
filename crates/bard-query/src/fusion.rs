//! Reciprocal Rank Fusion (RRF) for combining search results.

use std::collections::HashMap;
use std::hash::Hash;

use bard_core::CandidateQuote;

/// Fuse multiple ranked lists using Reciprocal Rank Fusion.
///
/// RRF score = Σ 1 / (k + rank + 1) over every list an id appears in.
/// Returns `(id, fused_score)` sorted by fused score descending; ties keep
/// first-seen order.
pub fn reciprocal_rank_fusion<T>(results: Vec<Vec<T>>, k: f32, limit: usize) -> Vec<(T, f32)>
where
    T: Hash + Eq + Clone,
{
    let mut order: Vec<T> = Vec::new();
    let mut scores: HashMap<T, f32> = HashMap::new();

    for result_list in results {
        for (rank, id) in result_list.into_iter().enumerate() {
            let rrf_score = 1.0 / (k + rank as f32 + 1.0);
            match scores.get_mut(&id) {
                Some(score) => *score += rrf_score,
                None => {
                    scores.insert(id.clone(), rrf_score);
                    order.push(id);
                }
            }
        }
    }

    let mut fused: Vec<(T, f32)> = order
        .into_iter()
        .map(|id| {
            let score = scores.get(&id).copied().unwrap_or_default();
            (id, score)
        })
        .collect();
    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    fused.truncate(limit);

    fused
}

/// Merge candidate lists into one RRF-ordered list without duplicate chunks.
///
/// A chunk found by several searches keeps its smallest distance.
pub fn fuse_candidates(lists: Vec<Vec<CandidateQuote>>, k: f32) -> Vec<CandidateQuote> {
    let mut best: HashMap<String, CandidateQuote> = HashMap::new();
    let mut ranked_ids = Vec::with_capacity(lists.len());

    for list in lists {
        let mut ids = Vec::with_capacity(list.len());
        for candidate in list {
            let id = candidate.chunk.chunk_id.clone();
            if !ids.contains(&id) {
                ids.push(id.clone());
            }
            match best.get(&id) {
                Some(existing) if existing.score <= candidate.score => {}
                _ => {
                    best.insert(id, candidate);
                }
            }
        }
        ranked_ids.push(ids);
    }

    reciprocal_rank_fusion(ranked_ids, k, usize::MAX)
        .into_iter()
        .filter_map(|(id, _)| best.remove(&id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bard_core::QuoteChunk;

    fn candidate(id: &str, score: f32) -> CandidateQuote {
        CandidateQuote::new(QuoteChunk::new(id, "SONNETS", None, None, 1, id), score)
    }

    #[test]
    fn test_rrf_single_list() {
        let fused = reciprocal_rank_fusion(vec![vec!["a", "b", "c"]], 60.0, 10);
        assert_eq!(fused.len(), 3);
        assert_eq!(fused[0].0, "a");
        assert!((fused[0].1 - 1.0 / 61.0).abs() < 1e-6);
    }

    #[test]
    fn test_rrf_multiple_lists() {
        let fused = reciprocal_rank_fusion(vec![vec!["a", "b", "c"], vec!["b", "a", "d"]], 60.0, 10);

        assert_eq!(fused.len(), 4);
        // a and b tie; a was seen first
        assert_eq!(fused[0].0, "a");
        assert_eq!(fused[1].0, "b");
        assert!(fused.iter().position(|(id, _)| *id == "d").unwrap() > 1);
    }

    #[test]
    fn test_rrf_truncation() {
        let fused = reciprocal_rank_fusion(vec![vec![1, 2, 3, 4, 5]], 60.0, 3);
        assert_eq!(fused.len(), 3);
    }

    #[test]
    fn test_fuse_candidates_dedupes() {
        let lists = vec![
            vec![candidate("chunk_1", 0.4), candidate("chunk_2", 0.5)],
            vec![candidate("chunk_2", 0.2), candidate("chunk_3", 0.6)],
        ];
        let fused = fuse_candidates(lists, 60.0);

        assert_eq!(fused.len(), 3);
        // chunk_2 appears in both lists and wins the fusion
        assert_eq!(fused[0].chunk.chunk_id, "chunk_2");
        assert_eq!(fused[0].score, 0.2);
    }
}
