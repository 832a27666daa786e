//! Vector index backends and ingestion for jobsuite.
//!
//! Backends:
//! - **InMemory**: BTreeMap-backed, for tests and ephemeral runs
//! - **SQLite**: persistent, records the embedder identity per collection
//!
//! Embedders:
//! - **Local**: sentence-transformer models run in-process via `fastembed`
//! - **Hashing**: deterministic keyword fixture, `test-util` only
//!
//! Ranking is cosine distance, nearest first, ties by ascending document ID.

#[cfg(any(test, feature = "test-util"))]
pub mod hashing;
pub mod in_memory;
pub mod ingest;
#[cfg(feature = "local-embeddings")]
pub mod local;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod vector;

#[cfg(any(test, feature = "test-util"))]
pub use hashing::HashingEmbedder;
pub use in_memory::InMemoryIndex;
pub use ingest::{IndexSync, SyncReport};
#[cfg(feature = "local-embeddings")]
pub use local::{DEFAULT_LOCAL_MODEL, LocalEmbedder};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteIndex;
