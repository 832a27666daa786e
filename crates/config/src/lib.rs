//! Configuration loading, validation, and management for jobsuite.
//!
//! Loads configuration from `~/.jobsuite/config.toml` with environment
//! variable overrides. Validates all settings at startup.
//!
//! The `[embedding]` section is the single source of the embedder identity:
//! both the ingestion pipeline and the semantic search tool are built from it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.jobsuite/config.toml`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the decision model (and remote embedder, unless overridden)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Decision model settings
    #[serde(default)]
    pub decision: DecisionConfig,

    /// Embedding model settings, shared by ingestion and search
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Relational store settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Vector index settings
    #[serde(default)]
    pub index: IndexConfig,

    /// Orchestrator limits
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("decision", &self.decision)
            .field("embedding", &self.embedding)
            .field("database", &self.database)
            .field("index", &self.index)
            .field("orchestrator", &self.orchestrator)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionConfig {
    /// Provider name ("openai", "openrouter", "gemini", "ollama", ...)
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Override the provider's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Upper bound on one decision-model call
    #[serde(default = "default_decision_timeout")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_decision_timeout() -> u64 {
    60
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_decision_timeout(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "local" runs the model in-process, otherwise an OpenAI-compatible
    /// provider name
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_dims")]
    pub dims: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Overrides the top-level api_key for the embedding endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Documents per embedding request during ingestion
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Where local model weights are cached; defaults to `~/.jobsuite/models`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,
}

fn default_embedding_provider() -> String {
    "local".into()
}
fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".into()
}
fn default_embedding_dims() -> usize {
    384
}
fn default_batch_size() -> usize {
    32
}

impl EmbeddingConfig {
    pub fn is_local(&self) -> bool {
        self.provider == "local"
    }

    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| AppConfig::config_dir().join("models"))
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dims: default_embedding_dims(),
            api_url: None,
            api_key: None,
            batch_size: default_batch_size(),
            cache_dir: None,
        }
    }
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("dims", &self.dims)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("batch_size", &self.batch_size)
            .field("cache_dir", &self.cache_dir)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `sqlite://...` or `postgres://...`; `DATABASE_URL` overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Table ingestion reads listings from
    #[serde(default = "default_listings_table")]
    pub listings_table: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_listings_table() -> String {
    "jobplacement_RAG.job_listings".into()
}
fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            listings_table: default_listings_table(),
            max_connections: default_max_connections(),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Connection strings usually embed credentials
        f.debug_struct("DatabaseConfig")
            .field("url", &redact(&self.url))
            .field("listings_table", &self.listings_table)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// SQLite file for the vector index; defaults to `~/.jobsuite/index.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Collection holding the job description documents
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_collection() -> String {
    "job_descriptions".into()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: None,
            collection: default_collection(),
        }
    }
}

impl IndexConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| AppConfig::config_dir().join("index.db"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum tool-call rounds per query
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,

    /// Search results when the model does not pass `k`
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,

    /// Tool output longer than this is truncated before the model sees it
    #[serde(default = "default_max_result_chars")]
    pub max_result_chars: usize,

    /// Rows rendered by the structured query tool
    #[serde(default = "default_max_result_rows")]
    pub max_result_rows: usize,

    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,

    /// Idle sessions older than this are evicted
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Reject statements that are not SELECT/WITH/EXPLAIN
    #[serde(default)]
    pub read_only: bool,

    /// Schema every table reference must be prefixed with
    #[serde(default = "default_required_schema", skip_serializing_if = "Option::is_none")]
    pub required_schema: Option<String>,
}

fn default_max_tool_rounds() -> u32 {
    6
}
fn default_top_k() -> usize {
    3
}
fn default_max_top_k() -> usize {
    10
}
fn default_max_result_chars() -> usize {
    8000
}
fn default_max_result_rows() -> usize {
    200
}
fn default_tool_timeout() -> u64 {
    30
}
fn default_session_ttl() -> u64 {
    3600
}
fn default_required_schema() -> Option<String> {
    Some("jobplacement_RAG".into())
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            default_top_k: default_top_k(),
            max_top_k: default_max_top_k(),
            max_result_chars: default_max_result_chars(),
            max_result_rows: default_max_result_rows(),
            tool_timeout_secs: default_tool_timeout(),
            session_ttl_secs: default_session_ttl(),
            read_only: false,
            required_schema: default_required_schema(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.jobsuite/config.toml).
    ///
    /// Environment overrides:
    /// - `JOBSUITE_API_KEY`, then `OPENAI_API_KEY`, then `GOOGLE_API_KEY`
    /// - `DATABASE_URL`
    /// - `JOBSUITE_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = var("JOBSUITE_API_KEY")
                .or_else(|| var("OPENAI_API_KEY"))
                .or_else(|| var("GOOGLE_API_KEY"));
        }
        if let Some(url) = var("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(model) = var("JOBSUITE_MODEL") {
            self.decision.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".jobsuite")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.decision.temperature < 0.0 || self.decision.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "decision.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.orchestrator.max_tool_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "orchestrator.max_tool_rounds must be at least 1".into(),
            ));
        }
        if self.orchestrator.default_top_k == 0
            || self.orchestrator.default_top_k > self.orchestrator.max_top_k
        {
            return Err(ConfigError::ValidationError(
                "orchestrator.default_top_k must be between 1 and max_top_k".into(),
            ));
        }
        if self.embedding.dims == 0 || self.embedding.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dims and embedding.batch_size must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.decision.provider, "openai");
        assert_eq!(config.orchestrator.default_top_k, 3);
        assert!(config.embedding.is_local());
        assert_eq!(config.index.collection, "job_descriptions");
    }

    #[test]
    fn default_embedder_is_local_minilm() {
        let embedding = EmbeddingConfig::default();
        assert_eq!(embedding.provider, "local");
        assert_eq!(embedding.model, "all-MiniLM-L6-v2");
        assert_eq!(embedding.dims, 384);
        assert!(embedding.resolved_cache_dir().ends_with(".jobsuite/models"));

        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("all-MiniLM-L6-v2"));
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.decision.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_round_budget_rejected() {
        let mut config = AppConfig::default();
        config.orchestrator.max_tool_rounds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn top_k_above_max_rejected() {
        let mut config = AppConfig::default();
        config.orchestrator.default_top_k = 50;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.decision.model, "gpt-4o");
    }

    #[test]
    fn parses_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[decision]
provider = "gemini"
model = "gemini-2.5-pro"

[embedding]
provider = "openai"
model = "text-embedding-3-small"
dims = 1536

[orchestrator]
max_tool_rounds = 3
read_only = true
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.decision.provider, "gemini");
        assert_eq!(config.embedding.dims, 1536);
        assert!(!config.embedding.is_local());
        assert_eq!(config.orchestrator.max_tool_rounds, 3);
        assert!(config.orchestrator.read_only);
        assert_eq!(config.orchestrator.required_schema.as_deref(), Some("jobplacement_RAG"));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "decision = [").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("DATABASE_URL", "postgres://u:p@localhost/jobs"),
            ("JOBSUITE_MODEL", "gpt-4o-mini"),
        ]);
        let mut config = AppConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.database.url.as_deref(), Some("postgres://u:p@localhost/jobs"));
        assert_eq!(config.decision.model, "gpt-4o-mini");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-secret".into());
        config.database.url = Some("postgres://user:hunter2@db/jobs".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4o"));
        assert!(toml_str.contains("max_tool_rounds"));
    }
}
