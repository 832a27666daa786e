//! Ingestion pipeline: relational listings into the vector index.
//!
//! `sync` fetches every listing with a description, embeds the canonical
//! text in batches, and upserts one document per listing keyed by
//! `str(job_id)`. A failed fetch aborts before the index is touched. A
//! failed batch is retried one document at a time so a single bad listing
//! cannot sink its neighbours.

use chrono::Utc;
use jobsuite_core::error::IngestError;
use jobsuite_core::event::{DomainEvent, EventBus};
use jobsuite_core::index::{Embedder, VectorIndex};
use jobsuite_core::listing::{ListingDocumentSource, RelationalStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Listings returned by the source
    pub fetched: usize,
    /// Documents upserted
    pub written: usize,
    /// Document IDs that could not be embedded or written, with the reason
    pub failed: Vec<(String, String)>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Keeps the vector index in step with the relational store.
pub struct IndexSync {
    store: Arc<dyn RelationalStore>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    events: Option<Arc<EventBus>>,
}

impl IndexSync {
    pub fn new(
        store: Arc<dyn RelationalStore>,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
            batch_size: 32,
            events: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Run one full ingestion pass.
    pub async fn sync(&self) -> Result<SyncReport, IngestError> {
        let listings = self.store.fetch_document_sources().await?;
        info!(
            count = listings.len(),
            model = %self.embedder.model_id(),
            "Fetched job listings for indexing"
        );

        let mut report = SyncReport {
            fetched: listings.len(),
            ..SyncReport::default()
        };

        for batch in listings.chunks(self.batch_size) {
            self.sync_batch(batch, &mut report).await;
        }

        info!(
            fetched = report.fetched,
            written = report.written,
            failed = report.failed.len(),
            "Index sync finished"
        );

        if let Some(events) = &self.events {
            events.publish(DomainEvent::IndexSynced {
                fetched: report.fetched,
                written: report.written,
                failed: report.failed.len(),
                timestamp: Utc::now(),
            });
        }

        Ok(report)
    }

    async fn sync_batch(&self, batch: &[ListingDocumentSource], report: &mut SyncReport) {
        let texts: Vec<String> = batch.iter().map(ListingDocumentSource::document_text).collect();

        match self.embedder.embed(&texts).await {
            Ok(vectors) if vectors.len() == batch.len() => {
                for (listing, embedding) in batch.iter().zip(vectors) {
                    self.write(listing, embedding, report).await;
                }
            }
            Ok(vectors) => {
                warn!(
                    expected = batch.len(),
                    actual = vectors.len(),
                    "Embedder returned wrong batch size, retrying per document"
                );
                self.retry_individually(batch, report).await;
            }
            Err(e) => {
                warn!(error = %e, size = batch.len(), "Batch embedding failed, retrying per document");
                self.retry_individually(batch, report).await;
            }
        }
    }

    async fn retry_individually(&self, batch: &[ListingDocumentSource], report: &mut SyncReport) {
        for listing in batch {
            let text = [listing.document_text()];
            match self.embedder.embed(&text).await {
                Ok(mut vectors) if vectors.len() == 1 => {
                    let embedding = vectors.remove(0);
                    self.write(listing, embedding, report).await;
                }
                Ok(vectors) => {
                    let reason = format!("embedder returned {} vectors for 1 text", vectors.len());
                    warn!(job_id = listing.job_id, %reason, "Skipping listing");
                    report.failed.push((listing.document_id(), reason));
                }
                Err(e) => {
                    warn!(job_id = listing.job_id, error = %e, "Skipping listing");
                    report.failed.push((listing.document_id(), e.to_string()));
                }
            }
        }
    }

    async fn write(&self, listing: &ListingDocumentSource, embedding: Vec<f32>, report: &mut SyncReport) {
        match self.index.upsert(listing.to_document(embedding)).await {
            Ok(()) => {
                debug!(job_id = listing.job_id, "Indexed listing");
                report.written += 1;
            }
            Err(e) => {
                warn!(job_id = listing.job_id, error = %e, "Failed to write document");
                report.failed.push((listing.document_id(), e.to_string()));
            }
        }
    }
}
