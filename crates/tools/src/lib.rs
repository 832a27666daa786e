//! Retrieval tools for jobsuite.
//!
//! Two tools are exposed to the decision model:
//! - `query_structured`: SQL against the relational store
//! - `search_semantic`: nearest job descriptions in the vector index
//!
//! Both report failures as text so the model can read them and recover.

pub mod guard;
pub mod semantic_search;
pub mod sql_query;

pub use guard::{GuardChain, GuardCheck, QueryGuard, ReadOnlyGuard, SchemaPrefixGuard};
pub use semantic_search::SemanticSearchTool;
pub use sql_query::StructuredQueryTool;

use jobsuite_config::OrchestratorConfig;
use jobsuite_core::index::{Embedder, VectorIndex};
use jobsuite_core::listing::RelationalStore;
use jobsuite_core::tool::ToolRegistry;
use std::sync::Arc;

/// Build the guard chain the configuration asks for, if any.
pub fn build_guard(config: &OrchestratorConfig) -> Option<Arc<dyn QueryGuard>> {
    let mut chain = GuardChain::new();
    if config.read_only {
        chain = chain.with(Box::new(ReadOnlyGuard));
    }
    if let Some(schema) = config.required_schema.as_deref().filter(|s| !s.is_empty()) {
        chain = chain.with(Box::new(SchemaPrefixGuard::new(schema)));
    }
    if chain.is_empty() {
        None
    } else {
        Some(Arc::new(chain))
    }
}

/// Create the registry with both retrieval tools.
///
/// `embedder` must be the one the index was built with.
pub fn build_registry(
    store: Arc<dyn RelationalStore>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    config: &OrchestratorConfig,
) -> ToolRegistry {
    let mut structured = StructuredQueryTool::new(store).with_max_rows(config.max_result_rows);
    if let Some(guard) = build_guard(config) {
        structured = structured.with_guard(guard);
    }

    let semantic = SemanticSearchTool::new(index, embedder)
        .with_limits(config.default_top_k, config.max_top_k);

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(structured));
    registry.register(Box::new(semantic));
    registry
}
