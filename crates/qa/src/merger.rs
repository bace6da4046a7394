//! Rank fusion of dense and sparse retrieval results.
//!
//! Each list contributes a bonus that decays with the document's rank in that
//! list. Dense hits keep their similarity score as a base; sparse hits only
//! add the rank bonus. The sort is stable, so equal scores keep first-seen
//! order (dense results before sparse-only ones).

use crate::config::MergeWeights;
use crate::types::CandidateDocument;
use std::collections::HashMap;

/// Merge `dense` and `sparse` into at most `top_k` unique documents.
pub fn merge(
    dense: Vec<CandidateDocument>,
    sparse: Vec<CandidateDocument>,
    top_k: usize,
    weights: &MergeWeights,
) -> Vec<CandidateDocument> {
    let mut fused: Vec<CandidateDocument> = Vec::with_capacity(dense.len() + sparse.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (rank, mut doc) in dense.into_iter().enumerate() {
        if positions.contains_key(&doc.id) {
            continue;
        }
        doc.score += rank_bonus(rank, weights.dense_rank_window, weights.dense_rank_step);
        positions.insert(doc.id.clone(), fused.len());
        fused.push(doc);
    }

    for (rank, mut doc) in sparse.into_iter().enumerate() {
        let bonus = rank_bonus(rank, weights.sparse_rank_window, weights.sparse_rank_step);
        match positions.get(&doc.id) {
            Some(&index) => fused[index].score += bonus,
            None => {
                doc.score = bonus;
                positions.insert(doc.id.clone(), fused.len());
                fused.push(doc);
            }
        }
    }

    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    fused.truncate(top_k);

    tracing::debug!(
        "Merged {} unique documents (top {})",
        positions.len(),
        fused.len()
    );

    fused
}

/// `(window - rank) * step`; negative past the window.
fn rank_bonus(rank: usize, window: f64, step: f64) -> f64 {
    (window - rank as f64) * step
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, score: f64) -> CandidateDocument {
        CandidateDocument {
            id: id.to_string(),
            filename: format!("{}.txt", id),
            extracted_text: String::new(),
            doc_type: "text/plain".to_string(),
            score,
        }
    }

    fn ids(docs: &[CandidateDocument]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_dense_scores_get_rank_bonus() {
        let merged = merge(
            vec![doc("a", 0.5), doc("b", 0.5)],
            vec![],
            3,
            &MergeWeights::default(),
        );
        assert_eq!(ids(&merged), vec!["a", "b"]);
        assert!((merged[0].score - 1.5).abs() < 1e-9);
        assert!((merged[1].score - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_sparse_bonus_added_to_dense_hit() {
        let merged = merge(
            vec![doc("a", 0.0), doc("b", 0.0)],
            vec![doc("b", 99.0)],
            3,
            &MergeWeights::default(),
        );
        // a: 1.0, b: 0.9 + 0.25
        assert_eq!(ids(&merged), vec!["b", "a"]);
        assert!((merged[0].score - 1.15).abs() < 1e-9);
    }

    #[test]
    fn test_sparse_only_seeded_without_its_own_score() {
        let merged = merge(vec![], vec![doc("s", 42.0)], 3, &MergeWeights::default());
        assert_eq!(merged.len(), 1);
        assert!((merged[0].score - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_ids_are_unique_and_truncated() {
        let merged = merge(
            vec![doc("a", 0.9), doc("a", 0.8), doc("b", 0.7), doc("c", 0.6)],
            vec![doc("c", 0.0), doc("d", 0.0)],
            3,
            &MergeWeights::default(),
        );
        assert_eq!(merged.len(), 3);
        let mut seen = ids(&merged);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let merged = merge(
            vec![],
            vec![doc("x", 0.0), doc("y", 0.0)],
            5,
            &MergeWeights {
                sparse_rank_step: 0.0,
                ..MergeWeights::default()
            },
        );
        assert_eq!(ids(&merged), vec!["x", "y"]);
    }

    #[test]
    fn test_deterministic() {
        let dense = vec![doc("a", 0.31), doc("b", 0.42), doc("c", 0.2)];
        let sparse = vec![doc("c", 0.0), doc("e", 0.0), doc("a", 0.0)];
        let first = merge(dense.clone(), sparse.clone(), 3, &MergeWeights::default());
        for _ in 0..10 {
            assert_eq!(
                merge(dense.clone(), sparse.clone(), 3, &MergeWeights::default()),
                first
            );
        }
    }

    #[test]
    fn test_empty_inputs() {
        assert!(merge(vec![], vec![], 3, &MergeWeights::default()).is_empty());
    }
}
