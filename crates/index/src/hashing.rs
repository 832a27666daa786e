//! Deterministic feature-hashing embedder for tests.
//!
//! Each lowercase alphanumeric token is hashed with SHA-256 into one of
//! `dims` buckets with a sign bit, and the result is L2-normalised. Only
//! shared tokens bring texts closer, so this is a keyword matcher, not a
//! semantic model. It exists so tests can exercise ingestion and search
//! without downloading model weights. Enabled by the `test-util` feature.

use async_trait::async_trait;
use jobsuite_core::error::IndexError;
use jobsuite_core::index::Embedder;
use sha2::{Digest, Sha256};

pub struct HashingEmbedder {
    model: String,
    dims: usize,
}

impl HashingEmbedder {
    pub fn new(model: impl Into<String>, dims: usize) -> Self {
        Self {
            model: model.into(),
            dims: dims.max(1),
        }
    }

    fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }

    /// Embed a single text.
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];

        for token in Self::tokens(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dims as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new("hashing-v1", 384)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
