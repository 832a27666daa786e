//! In-memory index: useful for testing and ephemeral runs.

use async_trait::async_trait;
use jobsuite_core::error::IndexError;
use jobsuite_core::index::{SearchHit, VectorDocument, VectorIndex};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::vector;

/// An in-memory index keyed by document ID.
pub struct InMemoryIndex {
    docs: Arc<RwLock<BTreeMap<String, VectorDocument>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            docs: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn name(&self) -> &str { "in_memory" }

    async fn upsert(&self, doc: VectorDocument) -> Result<(), IndexError> {
        let mut docs = self.docs.write().await;
        if let Some(existing) = docs.values().next() {
            if existing.embedding.len() != doc.embedding.len() {
                return Err(IndexError::DimensionMismatch {
                    expected: existing.embedding.len(),
                    actual: doc.embedding.len(),
                });
            }
        }
        docs.insert(doc.id.clone(), doc);
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        let docs = self.docs.read().await;
        Ok(vector::rank(docs.values(), embedding, k))
    }

    async fn get(&self, id: &str) -> Result<Option<VectorDocument>, IndexError> {
        Ok(self.docs.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool, IndexError> {
        Ok(self.docs.write().await.remove(id).is_some())
    }

    async fn count(&self) -> Result<usize, IndexError> {
        Ok(self.docs.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, embedding: Vec<f32>, text: &str) -> VectorDocument {
        VectorDocument {
            id: id.into(),
            embedding,
            text: text.into(),
            metadata: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn upsert_overwrites_by_id() {
        let index = InMemoryIndex::new();
        index.upsert(doc("7", vec![1.0, 0.0], "old")).await.unwrap();
        index.upsert(doc("7", vec![0.0, 1.0], "new")).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);
        assert_eq!(index.get("7").await.unwrap().unwrap().text, "new");
    }

    #[tokio::test]
    async fn query_empty_index() {
        let index = InMemoryIndex::new();
        assert!(index.query(&[1.0, 0.0], 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn query_orders_by_distance() {
        let index = InMemoryIndex::new();
        index.upsert(doc("1", vec![0.0, 1.0], "far")).await.unwrap();
        index.upsert(doc("2", vec![1.0, 0.1], "near")).await.unwrap();
        let hits = index.query(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits[0].id, "2");
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[tokio::test]
    async fn dimension_mismatch_rejected() {
        let index = InMemoryIndex::new();
        index.upsert(doc("1", vec![1.0, 0.0], "a")).await.unwrap();
        let err = index.upsert(doc("2", vec![1.0, 0.0, 0.0], "b")).await.unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[tokio::test]
    async fn delete_entry() {
        let index = InMemoryIndex::new();
        index.upsert(doc("1", vec![1.0], "a")).await.unwrap();
        assert!(index.delete("1").await.unwrap());
        assert!(!index.delete("1").await.unwrap());
        assert_eq!(index.count().await.unwrap(), 0);
    }
}
