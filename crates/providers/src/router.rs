//! Provider router: builds the decision and embedding providers from config.
//!
//! Handles provider creation, caching, and lookup by name.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use jobsuite_config::{AppConfig, DecisionConfig, EmbeddingConfig};
use jobsuite_core::provider::Provider;
use crate::openai_compat::OpenAiCompatProvider;

/// Holds the providers a process talks to.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build the decision provider from its config section.
pub fn decision_provider(config: &DecisionConfig, api_key: Option<&str>) -> Arc<dyn Provider> {
    let base_url = config
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(&config.provider));
    Arc::new(
        OpenAiCompatProvider::new(&config.provider, base_url, api_key.unwrap_or_default())
            .with_timeout(Duration::from_secs(config.timeout_secs)),
    )
}

/// Build the remote embedding provider, or `None` for the local embedder.
pub fn embedding_provider(
    config: &EmbeddingConfig,
    fallback_key: Option<&str>,
) -> Option<Arc<dyn Provider>> {
    if config.is_local() {
        return None;
    }
    let base_url = config
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(&config.provider));
    let api_key = config.api_key.as_deref().or(fallback_key).unwrap_or_default();
    Some(Arc::new(OpenAiCompatProvider::new(
        &config.provider,
        base_url,
        api_key,
    )))
}

/// Build every provider named in configuration.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.decision.provider);
    let api_key = config.api_key.as_deref();

    router.register(
        config.decision.provider.clone(),
        decision_provider(&config.decision, api_key),
    );

    // Only registered separately when it differs from the decision provider
    if router.get(&config.embedding.provider).is_none() {
        if let Some(provider) = embedding_provider(&config.embedding, api_key) {
            router.register(config.embedding.provider.clone(), provider);
        }
    }

    router
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "gemini" | "google" => "https://generativelanguage.googleapis.com/v1beta/openai".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
