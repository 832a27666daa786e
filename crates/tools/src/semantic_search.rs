//! Semantic search tool: nearest job descriptions for free text.
//!
//! The query is embedded with the same embedder the index was built with.

use async_trait::async_trait;
use jobsuite_core::error::{IndexError, ToolError};
use jobsuite_core::index::{Embedder, SearchHit, VectorIndex};
use jobsuite_core::tool::{Tool, ToolResult};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const NO_MATCHES: &str = "No relevant job descriptions found for your query.";

pub struct SemanticSearchTool {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    default_k: usize,
    max_k: usize,
}

impl SemanticSearchTool {
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            index,
            embedder,
            default_k: 3,
            max_k: 10,
        }
    }

    /// Set the default and maximum result counts.
    pub fn with_limits(mut self, default_k: usize, max_k: usize) -> Self {
        self.max_k = max_k.max(1);
        self.default_k = default_k.clamp(1, self.max_k);
        self
    }

    /// Clamp a requested `k` to `[1, max_k]`, defaulting when absent.
    pub fn effective_k(&self, requested: Option<u64>) -> usize {
        match requested {
            Some(k) => (k.min(self.max_k as u64) as usize).max(1),
            None => self.default_k,
        }
    }

    /// Search and render the outcome as text.
    ///
    /// Returns `(success, text)`; errors never escape as `Err`.
    pub async fn search(&self, query: &str, k: usize) -> (bool, String) {
        info!(tool = "search_semantic", query = %query, k, "Performing semantic search");

        match self.nearest(query, k).await {
            Ok(hits) if hits.is_empty() => (true, NO_MATCHES.to_string()),
            Ok(hits) => {
                debug!(hits = hits.len(), "Semantic search matched");
                (true, render_hits(&hits))
            }
            Err(e) => {
                warn!(error = %e, "Semantic search failed");
                (false, format!("Error during semantic search: {e}"))
            }
        }
    }

    async fn nearest(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, IndexError> {
        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        let embedding = vectors
            .pop()
            .ok_or_else(|| IndexError::EmbeddingFailed("embedder returned no vector".into()))?;
        self.index.query(&embedding, k).await
    }
}

/// Numbered result blocks, nearest first.
pub fn render_hits(hits: &[SearchHit]) -> String {
    let mut out = String::from("Found the following relevant job listings:\n\n");
    for (i, hit) in hits.iter().enumerate() {
        let job_id = match hit.metadata.get("job_id") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(v) => v.to_string(),
            None => hit.id.clone(),
        };
        out.push_str(&format!(
            "Result {}:\njob_id: {}\ndistance: {:.4}\n{}\n\n",
            i + 1,
            job_id,
            hit.distance,
            hit.text
        ));
    }
    out
}

#[async_trait]
impl Tool for SemanticSearchTool {
    fn name(&self) -> &str {
        "search_semantic"
    }

    fn description(&self) -> &str {
        "Performs a semantic search over job descriptions. Use this for open-ended or conceptual \
         questions about job roles, skills or responsibilities, like 'jobs involving python and \
         machine learning'. Do NOT use it for salaries, counts or other specific data points."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Free-text description of the roles or skills to look for"
                },
                "k": {
                    "type": "integer",
                    "description": format!("Number of results (default {}, max {})", self.default_k, self.max_k),
                    "default": self.default_k
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let k = self.effective_k(arguments["k"].as_u64());
        let (success, output) = self.search(query, k).await;
        Ok(if success {
            ToolResult::ok(output)
        } else {
            ToolResult::failed(output)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobsuite_core::index::VectorDocument;
    use jobsuite_index::{HashingEmbedder, InMemoryIndex};

    fn listing_doc(embedder: &HashingEmbedder, id: i64, title: &str, description: &str) -> VectorDocument {
        let listing = jobsuite_core::listing::ListingDocumentSource {
            job_id: id,
            title: title.into(),
            description: description.into(),
        };
        listing.to_document(embedder.embed_one(&listing.document_text()))
    }

    async fn seeded() -> SemanticSearchTool {
        let embedder = Arc::new(HashingEmbedder::new("h", 256));
        let index = Arc::new(InMemoryIndex::new());
        for doc in [
            listing_doc(&embedder, 3, "Backend Engineer", "Builds services in Rust."),
            listing_doc(&embedder, 7, "Data Analyst", "Uses Python and SQL for reporting."),
            listing_doc(&embedder, 9, "Nurse", "Provides patient care."),
        ] {
            index.upsert(doc).await.unwrap();
        }
        SemanticSearchTool::new(index, embedder)
    }

    #[tokio::test]
    async fn finds_analyst_first() {
        let tool = seeded().await;
        let result = tool
            .execute(serde_json::json!({"query": "reporting with SQL"}))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.output.starts_with("Found the following relevant job listings:\n\nResult 1:\njob_id: 7\n"));
        assert!(result.output.contains("Job Title: Data Analyst"));
        assert!(result.output.contains("Result 3:"));
    }

    #[tokio::test]
    async fn distances_non_decreasing() {
        let tool = seeded().await;
        let (_, output) = tool.search("patient care in Rust", 3).await;
        let distances: Vec<f32> = output
            .lines()
            .filter_map(|l| l.strip_prefix("distance: "))
            .map(|d| d.parse().unwrap())
            .collect();
        assert_eq!(distances.len(), 3);
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn empty_index_sentinel() {
        let tool = SemanticSearchTool::new(
            Arc::new(InMemoryIndex::new()),
            Arc::new(HashingEmbedder::new("h", 16)),
        );
        let (success, output) = tool.search("anything", 3).await;
        assert!(success);
        assert_eq!(output, NO_MATCHES);
    }

    #[tokio::test]
    async fn k_is_clamped() {
        let tool = seeded().await.with_limits(3, 2);
        assert_eq!(tool.effective_k(None), 2);
        assert_eq!(tool.effective_k(Some(0)), 1);
        assert_eq!(tool.effective_k(Some(50)), 2);

        let result = tool
            .execute(serde_json::json!({"query": "engineer", "k": 50}))
            .await
            .unwrap();
        assert!(result.output.contains("Result 2:"));
        assert!(!result.output.contains("Result 3:"));
    }

    #[tokio::test]
    async fn embedder_failure_is_data() {
        struct Broken;
        #[async_trait]
        impl Embedder for Broken {
            fn model_id(&self) -> &str {
                "broken"
            }
            fn dims(&self) -> usize {
                4
            }
            async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
                Err(IndexError::EmbeddingFailed("model server down".into()))
            }
        }

        let tool = SemanticSearchTool::new(Arc::new(InMemoryIndex::new()), Arc::new(Broken));
        let result = tool
            .execute(serde_json::json!({"query": "data"}))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.starts_with("Error during semantic search: "));
        assert!(result.output.contains("model server down"));
    }

    #[tokio::test]
    async fn blank_query_rejected() {
        let tool = seeded().await;
        assert!(tool.execute(serde_json::json!({"query": "  "})).await.is_err());
    }
}
