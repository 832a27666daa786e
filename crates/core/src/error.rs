//! Error types for the jobsuite domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all jobsuite operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Decision model errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Relational store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Vector index errors ---
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    // --- Ingestion errors ---
    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Session errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures of the relational store behind the structured query tool.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),
}

#[derive(Debug, Clone, Error)]
pub enum IndexError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Embedding model mismatch: index was built with '{indexed}', embedder is '{configured}'")]
    ModelMismatch { indexed: String, configured: String },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum IngestError {
    /// The source fetch failed; the index was not touched.
    #[error("Failed to fetch job listings: {0}")]
    SourceFetch(#[from] StoreError),

    #[error("Index unavailable: {0}")]
    Index(#[from] IndexError),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Query rejected: {0}")]
    Rejected(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

/// Violations of the turn-ordering invariants of a conversation session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("Tool call turn must come from the model")]
    CallTurnNotFromModel,

    #[error("Tool call turn carries no tool calls")]
    EmptyRound,

    #[error("Expected {expected} tool results, got {actual}")]
    ResultCountMismatch { expected: usize, actual: usize },

    #[error("Tool result for '{actual}' does not answer pending call '{expected}'")]
    ResultOutOfOrder { expected: String, actual: String },

    #[error("Turn with role '{0}' cannot be appended directly")]
    UnexpectedRole(String),
}
