//! Cosine similarity scoring and top-k selection.

use tracing::debug;

use crate::document::{Chunk, RetrievedChunk};

/// Compute cosine similarity between two vectors.
///
/// Returns `0.0` when either vector has zero magnitude or when the
/// dimensions differ. A dimension mismatch is treated as a non-match
/// rather than an error because embedding dimensionality varies between
/// the remote and local embedding spaces.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Score every candidate chunk against the query vector and select the
/// top `top_k` by descending cosine similarity.
///
/// The sort is stable, so ties keep the candidates' original corpus
/// order. Fewer than `top_k` results are returned when there are fewer
/// candidates. Candidates are always returned even when every score is
/// zero or negative; low scores ride along so callers can judge
/// confidence themselves.
pub fn rank(
    query_vector: &[f32],
    candidates: &[(Chunk, Vec<f32>)],
    top_k: usize,
) -> Vec<RetrievedChunk> {
    let mut scored: Vec<RetrievedChunk> = candidates
        .iter()
        .map(|(chunk, embedding)| RetrievedChunk {
            chunk: chunk.clone(),
            score: cosine_similarity(query_vector, embedding),
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);

    debug!(
        candidates = candidates.len(),
        selected = scored.len(),
        top_score = scored.first().map(|r| r.score),
        "ranked chunks"
    );

    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            document_id: "doc".to_string(),
            text: id.to_string(),
            start_offset: 0,
            end_offset: 1,
        }
    }

    #[test]
    fn identical_vectors_score_one() {
        let v = vec![0.3, -0.5, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn dimension_mismatch_scores_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn returns_at_most_top_k_in_descending_order() {
        let candidates = vec![
            (chunk("a"), vec![1.0, 0.0]),
            (chunk("b"), vec![0.0, 1.0]),
            (chunk("c"), vec![0.7, 0.7]),
        ];
        let results = rank(&[1.0, 0.0], &candidates, 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.id, "a");
        assert_eq!(results[1].chunk.id, "c");
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn top_k_larger_than_candidates_returns_all() {
        let candidates = vec![(chunk("a"), vec![1.0]), (chunk("b"), vec![0.5])];
        assert_eq!(rank(&[1.0], &candidates, 10).len(), 2);
    }

    #[test]
    fn ties_keep_corpus_order() {
        let candidates = vec![
            (chunk("first"), vec![0.0, 1.0]),
            (chunk("second"), vec![0.0, 1.0]),
            (chunk("third"), vec![0.0, 1.0]),
        ];
        let results = rank(&[0.0, 1.0], &candidates, 3);
        let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn all_nonpositive_scores_still_selected() {
        let candidates =
            vec![(chunk("a"), vec![-1.0, 0.0]), (chunk("b"), vec![0.0, 0.0])];
        let results = rank(&[1.0, 0.0], &candidates, 2);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.score <= 0.0));
    }

    #[test]
    fn mismatched_candidate_dimensions_never_panic() {
        let candidates = vec![(chunk("a"), vec![1.0, 0.0, 0.0]), (chunk("b"), vec![1.0])];
        let results = rank(&[1.0, 0.0], &candidates, 2);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.score == 0.0));
    }
}
