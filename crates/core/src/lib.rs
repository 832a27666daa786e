//! # jobsuite core
//!
//! Domain types, traits, and error definitions for the jobsuite hybrid
//! retrieval agent. Every subsystem (decision model, relational store,
//! vector index, embedder, tools) is a trait here; implementations live in
//! their own crates, so the orchestrator can be tested against mocks.

pub mod error;
pub mod message;
pub mod session;
pub mod provider;
pub mod tool;
pub mod index;
pub mod listing;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{Role, Turn, TurnToolCall};
pub use session::{ConversationSession, SessionId, ToolRound};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use tool::{Tool, ToolCall, ToolResult, ToolRegistry};
pub use index::{Embedder, SearchHit, VectorDocument, VectorIndex};
pub use listing::{JobListing, ListingDocumentSource, QueryRows, RelationalStore, SalaryRange};
pub use event::{DomainEvent, EventBus};
