//! Embedder backed by a provider's `/embeddings` endpoint.

use async_trait::async_trait;
use jobsuite_core::error::IndexError;
use jobsuite_core::index::Embedder;
use jobsuite_core::provider::{EmbeddingRequest, Provider};
use std::sync::Arc;
use tracing::debug;

/// Embeds text through a remote provider with a fixed model.
pub struct RemoteEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
    dims: usize,
}

impl RemoteEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, dims: usize) -> Self {
        Self {
            provider,
            model: model.into(),
            dims,
        }
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: texts.to_vec(),
            })
            .await
            .map_err(|e| IndexError::EmbeddingFailed(e.to_string()))?;

        if let Some(bad) = response.embeddings.iter().find(|v| v.len() != self.dims) {
            return Err(IndexError::DimensionMismatch {
                expected: self.dims,
                actual: bad.len(),
            });
        }

        debug!(model = %self.model, count = texts.len(), "Embedded batch");
        Ok(response.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobsuite_core::error::ProviderError;
    use jobsuite_core::provider::{EmbeddingResponse, ProviderRequest, ProviderResponse};

    struct FixedEmbeddings(Vec<f32>);

    #[async_trait]
    impl Provider for FixedEmbeddings {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("embeddings only".into()))
        }

        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            Ok(EmbeddingResponse {
                embeddings: request.inputs.iter().map(|_| self.0.clone()).collect(),
                model: request.model,
            })
        }
    }

    #[tokio::test]
    async fn embeds_one_vector_per_text() {
        let embedder = RemoteEmbedder::new(Arc::new(FixedEmbeddings(vec![0.0, 1.0])), "m", 2);
        let vectors = embedder.embed(&["a".into(), "b".into()]).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(embedder.model_id(), "m");
    }

    #[tokio::test]
    async fn wrong_dimension_rejected() {
        let embedder = RemoteEmbedder::new(Arc::new(FixedEmbeddings(vec![0.0, 1.0, 2.0])), "m", 2);
        let err = embedder.embed(&["a".into()]).await.unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[tokio::test]
    async fn provider_without_embeddings_fails() {
        struct ChatOnly;
        #[async_trait]
        impl Provider for ChatOnly {
            fn name(&self) -> &str {
                "chat"
            }
            async fn complete(&self, _r: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
                Err(ProviderError::NotConfigured("n/a".into()))
            }
        }
        let embedder = RemoteEmbedder::new(Arc::new(ChatOnly), "m", 2);
        let err = embedder.embed(&["a".into()]).await.unwrap_err();
        assert!(matches!(err, IndexError::EmbeddingFailed(_)));
    }
}
