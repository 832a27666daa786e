//! Vector index and embedder traits.
//!
//! The index stores one [`VectorDocument`] per job listing and answers
//! nearest-neighbour queries under cosine distance. The [`Embedder`] turns
//! text into vectors; ingestion and search must share the same instance
//! (same `model_id`), otherwise distances are meaningless.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::IndexError;

/// A document stored in the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorDocument {
    /// Stable document ID, `str(job_id)` for job listings
    pub id: String,

    /// The embedding of `text`
    pub embedding: Vec<f32>,

    /// The canonical document text
    pub text: String,

    /// Metadata (`job_id`, `job_title` for job listings)
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// A ranked hit returned by [`VectorIndex::query`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Cosine distance to the query (0 = identical direction, 2 = opposite)
    pub distance: f32,
}

/// The core VectorIndex trait.
///
/// Implementations: in-memory (testing), SQLite (persistent).
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Insert or overwrite the document with `doc.id`.
    async fn upsert(&self, doc: VectorDocument) -> std::result::Result<(), IndexError>;

    /// Return up to `k` documents nearest to `embedding`, nearest first.
    ///
    /// Equal distances are ordered by ascending document ID.
    async fn query(&self, embedding: &[f32], k: usize) -> std::result::Result<Vec<SearchHit>, IndexError>;

    /// Get a document by ID.
    async fn get(&self, id: &str) -> std::result::Result<Option<VectorDocument>, IndexError>;

    /// Delete a document by ID.
    async fn delete(&self, id: &str) -> std::result::Result<bool, IndexError>;

    /// Get total document count.
    async fn count(&self) -> std::result::Result<usize, IndexError>;
}

/// Turns text into fixed-dimension vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identity of the embedding model (e.g. `"text-embedding-3-small"`).
    fn model_id(&self) -> &str;

    /// Vector dimensionality.
    fn dims(&self) -> usize;

    /// Embed a batch of texts, one vector per input, same order.
    async fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, IndexError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_document_serialization() {
        let mut metadata = serde_json::Map::new();
        metadata.insert("job_id".into(), serde_json::json!(7));
        let doc = VectorDocument {
            id: "7".into(),
            embedding: vec![0.1, 0.2],
            text: "Job Title: Data Analyst\nDescription: SQL".into(),
            metadata,
        };
        let json = serde_json::to_string(&doc).unwrap();
        let parsed: VectorDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, doc);
    }
}
