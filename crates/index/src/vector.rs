//! Vector similarity and ranking utilities.
//!
//! Pure-Rust implementations of:
//! - Cosine similarity and cosine distance
//! - Nearest-first ranking with a deterministic tie-break

use jobsuite_core::index::{SearchHit, VectorDocument};
use std::cmp::Ordering;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Cosine distance, `1 - similarity`, in [0, 2].
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    (1.0 - cosine_similarity(a, b)).clamp(0.0, 2.0)
}

/// Order document IDs ascending: integer IDs numerically, ahead of all
/// other IDs, which compare lexically.
///
/// Every ID maps to one `(is_text, number, id)` key, so the order is total
/// even over a mix of numeric and non-numeric IDs.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    id_key(a).cmp(&id_key(b))
}

fn id_key(id: &str) -> (bool, i64, &str) {
    match id.parse::<i64>() {
        Ok(n) => (false, n, id),
        Err(_) => (true, 0, id),
    }
}

/// NaN distances sort after every real one.
fn distance_order(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => a.total_cmp(&b),
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
    }
}

/// Rank documents by cosine distance to `query`, nearest first.
///
/// Equal distances fall back to [`compare_ids`], so the order is total and
/// independent of storage order.
pub fn rank<'a, I>(docs: I, query: &[f32], k: usize) -> Vec<SearchHit>
where
    I: IntoIterator<Item = &'a VectorDocument>,
{
    if k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(f32, &VectorDocument)> = docs
        .into_iter()
        .map(|doc| (cosine_distance(&doc.embedding, query), doc))
        .collect();

    scored.sort_by(|a, b| {
        distance_order(a.0, b.0).then_with(|| compare_ids(&a.1.id, &b.1.id))
    });
    scored.truncate(k);

    scored
        .into_iter()
        .map(|(distance, doc)| SearchHit {
            id: doc.id.clone(),
            text: doc.text.clone(),
            metadata: doc.metadata.clone(),
            distance,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, embedding: Vec<f32>) -> VectorDocument {
        VectorDocument {
            id: id.into(),
            embedding,
            text: format!("doc {id}"),
            metadata: serde_json::Map::new(),
        }
    }

    #[test]
    fn cosine_identical_vectors() {
        let a = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&a, &a);
        assert!((sim - 1.0).abs() < 1e-6);
        assert!(cosine_distance(&a, &a) < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
        assert!((cosine_distance(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_opposite_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_distance(&a, &b) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_mismatched_or_zero_vectors() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn compare_ids_numeric_aware() {
        assert_eq!(compare_ids("2", "10"), Ordering::Less);
        assert_eq!(compare_ids("10", "10"), Ordering::Equal);
        assert_eq!(compare_ids("a", "b"), Ordering::Less);
        assert_eq!(compare_ids("10", "a"), Ordering::Less);
        assert_eq!(compare_ids("1a", "2"), Ordering::Greater);
        assert_eq!(compare_ids("10", "1a"), Ordering::Less);
    }

    #[test]
    fn compare_ids_is_total_over_mixed_ids() {
        let mut ids: Vec<String> = (1..=40)
            .flat_map(|i| [i.to_string(), format!("{i}a")])
            .collect();
        ids.reverse();
        ids.sort_by(|a, b| compare_ids(a, b));

        let numeric: Vec<i64> = ids.iter().filter_map(|id| id.parse().ok()).collect();
        assert_eq!(numeric, (1..=40).collect::<Vec<_>>());
        // Numeric IDs come first, then the rest in lexical order
        assert_eq!(ids[39], "40");
        assert_eq!(ids[40], "10a");
        for a in &ids {
            for b in &ids {
                assert_eq!(compare_ids(a, b), compare_ids(b, a).reverse());
            }
        }
    }

    #[test]
    fn rank_mixed_ids_at_equal_distance() {
        let docs: Vec<VectorDocument> = ["1a", "10", "x", "2", "10a", "1"]
            .iter()
            .map(|id| doc(id, vec![1.0, 0.0]))
            .collect();
        let hits = rank(&docs, &[1.0, 0.0], 6);
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "10", "10a", "1a", "x"]);
    }

    #[test]
    fn rank_puts_nan_distances_last() {
        let docs = vec![
            doc("1", vec![f32::NAN, 0.0]),
            doc("2", vec![0.0, 1.0]),
            doc("3", vec![1.0, 0.0]),
            doc("4", vec![f32::NAN, 1.0]),
        ];
        let hits = rank(&docs, &[1.0, 0.0], 4);
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2", "1", "4"]);

        let reversed: Vec<VectorDocument> = docs.into_iter().rev().collect();
        let again: Vec<String> = rank(&reversed, &[1.0, 0.0], 4).into_iter().map(|h| h.id).collect();
        assert_eq!(again, ids);
    }

    #[test]
    fn rank_nearest_first() {
        let docs = vec![
            doc("1", vec![0.0, 1.0]),
            doc("2", vec![1.0, 0.0]),
            doc("3", vec![0.7, 0.7]),
        ];
        let hits = rank(&docs, &[1.0, 0.0], 3);
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
        for pair in hits.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[test]
    fn rank_ties_break_by_ascending_id() {
        let docs = vec![
            doc("10", vec![1.0, 0.0]),
            doc("9", vec![1.0, 0.0]),
            doc("2", vec![1.0, 0.0]),
        ];
        let hits = rank(&docs, &[1.0, 0.0], 3);
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "9", "10"]);
    }

    #[test]
    fn rank_respects_k() {
        let docs: Vec<VectorDocument> = (0..10)
            .map(|i| doc(&i.to_string(), vec![1.0, i as f32]))
            .collect();
        assert_eq!(rank(&docs, &[1.0, 0.0], 3).len(), 3);
        assert!(rank(&docs, &[1.0, 0.0], 0).is_empty());
        assert_eq!(rank(&docs, &[1.0, 0.0], 50).len(), 10);
    }
}
