//! Job listings and the relational store that owns them.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use crate::error::StoreError;
use crate::index::VectorDocument;

/// Salary bounds of a listing; either end may be unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl std::fmt::Display for SalaryRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.min, self.max) {
            (Some(min), Some(max)) => write!(f, "{min} - {max}"),
            (Some(min), None) => write!(f, "from {min}"),
            (None, Some(max)) => write!(f, "up to {max}"),
            (None, None) => f.write_str("unspecified"),
        }
    }
}

/// A job listing as the relational store holds it.
///
/// The store is the source of truth and the orchestrator only reads it.
/// Ingestion needs just the [`ListingDocumentSource`] part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    pub job_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub salary_range: SalaryRange,
    pub location: Option<String>,
    pub posted_date: Option<NaiveDate>,
    pub active: bool,
}

impl JobListing {
    /// The indexable part of this listing, if it has a description.
    pub fn document_source(&self) -> Option<ListingDocumentSource> {
        self.description.as_ref().map(|description| ListingDocumentSource {
            job_id: self.job_id,
            title: self.title.clone(),
            description: description.clone(),
        })
    }
}

/// The columns of a listing that feed the vector index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDocumentSource {
    pub job_id: i64,
    pub title: String,
    pub description: String,
}

impl ListingDocumentSource {
    /// The vector document ID for this listing.
    pub fn document_id(&self) -> String {
        self.job_id.to_string()
    }

    /// Canonical document text: title and description.
    pub fn document_text(&self) -> String {
        format!("Job Title: {}\nDescription: {}", self.title, self.description)
    }

    /// Metadata stored alongside the document.
    pub fn document_metadata(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut metadata = serde_json::Map::new();
        metadata.insert("job_id".into(), serde_json::json!(self.job_id));
        metadata.insert("job_title".into(), serde_json::json!(self.title));
        metadata
    }

    /// Build the vector document for this listing from its embedding.
    pub fn to_document(&self, embedding: Vec<f32>) -> VectorDocument {
        VectorDocument {
            id: self.document_id(),
            embedding,
            text: self.document_text(),
            metadata: self.document_metadata(),
        }
    }
}

/// Rows returned by a statement, every value already rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryRows {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The relational store behind the structured query tool and ingestion.
///
/// Implementations: SQLite, PostgreSQL.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "postgres").
    fn name(&self) -> &str;

    /// Execute one statement inside a transaction committed on success.
    async fn execute(&self, sql: &str) -> std::result::Result<QueryRows, StoreError>;

    /// The indexable columns of every listing whose description is
    /// non-null, ordered by `job_id`.
    async fn fetch_document_sources(
        &self,
    ) -> std::result::Result<Vec<ListingDocumentSource>, StoreError>;

    /// One full listing, or `None` if no row has this `job_id`.
    async fn fetch_listing(&self, job_id: i64) -> std::result::Result<Option<JobListing>, StoreError>;
}
