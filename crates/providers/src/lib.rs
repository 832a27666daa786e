//! Provider implementations for jobsuite.
//!
//! All providers implement the `jobsuite_core::Provider` trait.
//! The router builds the decision and embedding providers from configuration.

pub mod embedder;
pub mod openai_compat;
pub mod router;

pub use embedder::RemoteEmbedder;
pub use openai_compat::OpenAiCompatProvider;
pub use router::ProviderRouter;
