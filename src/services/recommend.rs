//! Embedding-based combo matching
//!
//! Ranks style combos against a query embedding by cosine similarity.
//! A brute-force O(n) scan over all combos; no index, no cache.

use serde::Serialize;

use crate::models::StyleComboWithItems;

/// A combo with its similarity score against the query
#[derive(Debug, Clone, Serialize)]
pub struct RankedCombo {
    #[serde(flatten)]
    pub combo: StyleComboWithItems,
    pub score: f32,
}

/// Cosine similarity of two vectors.
///
/// Zero-length or mismatched vectors score 0 rather than erroring; a bad
/// embedding should sink in the ranking, not fail the request.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Rank combos by similarity to the query embedding, best first, and keep
/// the top `limit`.
pub fn rank_by_similarity(
    query: &[f32],
    combos: Vec<(StyleComboWithItems, Vec<f32>)>,
    limit: usize,
) -> Vec<RankedCombo> {
    let mut ranked: Vec<RankedCombo> = combos
        .into_iter()
        .map(|(combo, embedding)| {
            let score = cosine_similarity(query, &embedding);
            RankedCombo { combo, score }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StyleCombo;
    use chrono::Utc;
    use proptest::prelude::*;

    fn combo(id: i64, title: &str) -> StyleComboWithItems {
        let now = Utc::now();
        StyleComboWithItems {
            combo: StyleCombo {
                id,
                user_id: 1,
                title: title.to_string(),
                description: None,
                cover_image_url: "https://cdn.glamscan.app/c.jpg".to_string(),
                shop_url: "https://www.amazon.com/shop".to_string(),
                created_at: now,
                updated_at: now,
            },
            items: vec![],
        }
    }

    #[test]
    fn test_cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let query = vec![1.0, 0.0];
        let ranked = rank_by_similarity(
            &query,
            vec![
                (combo(1, "orthogonal"), vec![0.0, 1.0]),
                (combo(2, "aligned"), vec![2.0, 0.0]),
                (combo(3, "diagonal"), vec![1.0, 1.0]),
            ],
            2,
        );

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].combo.combo.id, 2);
        assert_eq!(ranked[1].combo.combo.id, 3);
    }

    #[test]
    fn test_rank_empty_input() {
        assert!(rank_by_similarity(&[1.0], vec![], 5).is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            max_global_rejects: 65536,
            ..ProptestConfig::default()
        })]

        /// Cosine similarity stays within [-1, 1] (with float slack).
        #[test]
        fn property_similarity_bounded(
            a in prop::collection::vec(-100.0f32..100.0, 1..16),
            b in prop::collection::vec(-100.0f32..100.0, 1..16),
        ) {
            prop_assume!(a.len() == b.len());
            let score = cosine_similarity(&a, &b);
            prop_assert!(score >= -1.0001 && score <= 1.0001);
        }

        /// A nonzero vector is most similar to itself.
        #[test]
        fn property_self_similarity(
            v in prop::collection::vec(0.1f32..100.0, 1..16),
        ) {
            let score = cosine_similarity(&v, &v);
            prop_assert!((score - 1.0).abs() < 1e-3);
        }

        /// Ranking never returns more than the limit and is sorted.
        #[test]
        fn property_rank_sorted_and_limited(
            embeddings in prop::collection::vec(
                prop::collection::vec(-10.0f32..10.0, 4),
                0..12,
            ),
            limit in 0usize..8,
        ) {
            let query = vec![1.0, -1.0, 0.5, 2.0];
            let combos = embeddings
                .into_iter()
                .enumerate()
                .map(|(i, e)| (combo(i as i64, "c"), e))
                .collect();

            let ranked = rank_by_similarity(&query, combos, limit);
            prop_assert!(ranked.len() <= limit);
            for pair in ranked.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
        }
    }
}
