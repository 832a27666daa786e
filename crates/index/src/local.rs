//! In-process sentence embedder on `fastembed`.
//!
//! Runs ONNX sentence-transformer models, `all-MiniLM-L6-v2` by default,
//! with no model server. Weights are fetched from Hugging Face on the first
//! embed and cached; after that embedding runs offline. The model is loaded
//! once and shared by every call, so ingestion and search use the same
//! weights.

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use jobsuite_core::error::IndexError;
use jobsuite_core::index::Embedder;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub const DEFAULT_LOCAL_MODEL: &str = "all-MiniLM-L6-v2";

const SUPPORTED_MODELS: &[&str] = &[
    "all-MiniLM-L6-v2",
    "bge-small-en-v1.5",
    "bge-base-en-v1.5",
    "nomic-embed-text-v1.5",
    "multilingual-e5-small",
];

/// Map a configured model name to the fastembed model and its output size.
fn resolve_model(name: &str) -> Option<(EmbeddingModel, usize)> {
    let name = name.to_ascii_lowercase();
    let name = name.strip_prefix("sentence-transformers/").unwrap_or(&name);
    match name {
        "all-minilm-l6-v2" => Some((EmbeddingModel::AllMiniLML6V2, 384)),
        "bge-small-en-v1.5" => Some((EmbeddingModel::BGESmallENV15, 384)),
        "bge-base-en-v1.5" => Some((EmbeddingModel::BGEBaseENV15, 768)),
        "nomic-embed-text-v1.5" => Some((EmbeddingModel::NomicEmbedTextV15, 768)),
        "multilingual-e5-small" => Some((EmbeddingModel::MultilingualE5Small, 384)),
        _ => None,
    }
}

pub struct LocalEmbedder {
    model_id: String,
    dims: usize,
    model: EmbeddingModel,
    cache_dir: Option<PathBuf>,
    batch_size: usize,
    engine: Arc<Mutex<Option<TextEmbedding>>>,
}

impl LocalEmbedder {
    /// Validate the model name and dimensionality. Nothing is downloaded
    /// until the first call to `embed`.
    pub fn new(model_id: &str, dims: usize) -> Result<Self, IndexError> {
        let (model, native_dims) = resolve_model(model_id).ok_or_else(|| {
            IndexError::EmbeddingFailed(format!(
                "Unknown local embedding model '{model_id}'. Supported models: {}",
                SUPPORTED_MODELS.join(", ")
            ))
        })?;
        if dims != native_dims {
            return Err(IndexError::DimensionMismatch {
                expected: native_dims,
                actual: dims,
            });
        }

        Ok(Self {
            model_id: model_id.to_string(),
            dims,
            model,
            cache_dir: None,
            batch_size: 32,
            engine: Arc::new(Mutex::new(None)),
        })
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn load(
        model: EmbeddingModel,
        cache_dir: Option<PathBuf>,
        model_id: &str,
    ) -> Result<TextEmbedding, IndexError> {
        info!(model = %model_id, "Loading local embedding model");
        let mut options = InitOptions::new(model).with_show_download_progress(true);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }
        TextEmbedding::try_new(options).map_err(|e| {
            IndexError::EmbeddingFailed(format!("Failed to initialize local embedding model: {e}"))
        })
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let engine = self.engine.clone();
        let model = self.model.clone();
        let cache_dir = self.cache_dir.clone();
        let model_id = self.model_id.clone();
        let batch_size = self.batch_size;
        let texts = texts.to_vec();

        let vectors = tokio::task::spawn_blocking(move || {
            let mut guard = engine.lock().map_err(|_| {
                IndexError::EmbeddingFailed("Local embedding model lock poisoned".into())
            })?;
            if guard.is_none() {
                *guard = Some(Self::load(model, cache_dir, &model_id)?);
            }
            let engine = guard.as_mut().ok_or_else(|| {
                IndexError::EmbeddingFailed("Local embedding model not loaded".into())
            })?;
            engine
                .embed(texts, Some(batch_size))
                .map_err(|e| IndexError::EmbeddingFailed(format!("Local embedding failed: {e}")))
        })
        .await
        .map_err(|e| IndexError::EmbeddingFailed(format!("Embedding task failed: {e}")))??;

        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dims) {
            return Err(IndexError::DimensionMismatch {
                expected: self.dims,
                actual: bad.len(),
            });
        }
        debug!(model = %self.model_id, count = vectors.len(), "Embedded texts locally");
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::cosine_distance;

    #[test]
    fn resolves_default_model() {
        let embedder = LocalEmbedder::new(DEFAULT_LOCAL_MODEL, 384).unwrap();
        assert_eq!(embedder.model_id(), "all-MiniLM-L6-v2");
        assert_eq!(embedder.dims(), 384);
    }

    #[test]
    fn model_names_are_case_insensitive() {
        assert!(resolve_model("sentence-transformers/all-MiniLM-L6-v2").is_some());
        assert!(resolve_model("BGE-SMALL-EN-V1.5").is_some());
    }

    #[test]
    fn unknown_model_rejected() {
        let err = LocalEmbedder::new("hashing-v1", 384).err().unwrap();
        assert!(matches!(err, IndexError::EmbeddingFailed(msg) if msg.contains("all-MiniLM-L6-v2")));
    }

    #[test]
    fn configured_dims_must_match_model() {
        let err = LocalEmbedder::new(DEFAULT_LOCAL_MODEL, 256).err().unwrap();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch { expected: 384, actual: 256 }
        ));
    }

    #[tokio::test]
    async fn empty_batch_does_not_load_model() {
        let embedder = LocalEmbedder::new(DEFAULT_LOCAL_MODEL, 384).unwrap();
        assert!(embedder.embed(&[]).await.unwrap().is_empty());
        assert!(embedder.engine.lock().unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "downloads all-MiniLM-L6-v2 from Hugging Face"]
    async fn ranks_by_meaning_not_shared_words() {
        let embedder = LocalEmbedder::new(DEFAULT_LOCAL_MODEL, 384).unwrap();
        let texts = vec![
            "find jobs for a medical advisor".to_string(),
            "Job Title: Data Analyst\nDescription: Uses Python and SQL for reporting.".to_string(),
            "Job Title: Nurse\nDescription: Provides patient care on night shifts.".to_string(),
        ];
        let vectors = embedder.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert!(vectors.iter().all(|v| v.len() == 384));

        let analyst = cosine_distance(&vectors[0], &vectors[1]);
        let nurse = cosine_distance(&vectors[0], &vectors[2]);
        assert!(nurse < analyst, "nurse {nurse} should be nearer than analyst {analyst}");
    }
}
