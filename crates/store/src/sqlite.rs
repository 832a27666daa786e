//! SQLite relational store.

use crate::{column_error, document_sources_sql, listing_sql, parse_posted_date, render};
use async_trait::async_trait;
use jobsuite_core::error::StoreError;
use jobsuite_core::listing::{
    JobListing, ListingDocumentSource, QueryRows, RelationalStore, SalaryRange,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

pub struct SqliteStore {
    pool: SqlitePool,
    listings_table: String,
}

impl SqliteStore {
    /// Open the database at `url` (`sqlite://path` or `sqlite::memory:`).
    pub async fn connect(
        url: &str,
        listings_table: &str,
        max_connections: u32,
    ) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Connection(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .pragma("foreign_keys", "ON");

        // Each in-memory connection would otherwise see its own database
        let max_connections = if url.contains(":memory:") {
            1
        } else {
            max_connections.max(1)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open SQLite: {e}")))?;

        info!(table = listings_table, "SQLite store connected");
        Self::from_pool(pool, listings_table)
    }

    /// Create from an existing pool (useful for testing).
    pub fn from_pool(pool: SqlitePool, listings_table: &str) -> Result<Self, StoreError> {
        crate::validate_table_name(listings_table)?;
        Ok(Self {
            pool,
            listings_table: listings_table.to_string(),
        })
    }

    fn render_rows(rows: &[SqliteRow]) -> Result<QueryRows, StoreError> {
        let Some(first) = rows.first() else {
            return Ok(QueryRows::default());
        };
        let columns = first.columns().iter().map(|c| c.name().to_string()).collect();
        let rows = rows
            .iter()
            .map(|row| (0..row.len()).map(|i| render::sqlite::value(row, i)).collect())
            .collect::<Result<Vec<Vec<String>>, StoreError>>()?;
        Ok(QueryRows { columns, rows })
    }
}

#[async_trait]
impl RelationalStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn execute(&self, sql: &str) -> Result<QueryRows, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Transaction(e.to_string()))?;

        let rows = sqlx::query(sql)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Transaction(e.to_string()))?;

        debug!(rows = rows.len(), "SQLite statement executed");
        Self::render_rows(&rows)
    }

    async fn fetch_document_sources(&self) -> Result<Vec<ListingDocumentSource>, StoreError> {
        let rows = sqlx::query(&document_sources_sql(&self.listings_table))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Listing fetch: {e}")))?;

        rows.iter()
            .map(|row| {
                Ok(ListingDocumentSource {
                    job_id: row.try_get("job_id").map_err(|e| column_error("job_id", e))?,
                    title: row
                        .try_get::<Option<String>, _>("job_title")
                        .map_err(|e| column_error("job_title", e))?
                        .unwrap_or_default(),
                    description: row
                        .try_get("job_description")
                        .map_err(|e| column_error("job_description", e))?,
                })
            })
            .collect()
    }

    async fn fetch_listing(&self, job_id: i64) -> Result<Option<JobListing>, StoreError> {
        let row = sqlx::query(&listing_sql(&self.listings_table, "?"))
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Listing fetch: {e}")))?;

        row.as_ref().map(listing_from_row).transpose()
    }
}

fn listing_from_row(row: &SqliteRow) -> Result<JobListing, StoreError> {
    Ok(JobListing {
        job_id: row.try_get("job_id").map_err(|e| column_error("job_id", e))?,
        title: row
            .try_get::<Option<String>, _>("job_title")
            .map_err(|e| column_error("job_title", e))?
            .unwrap_or_default(),
        description: row
            .try_get("job_description")
            .map_err(|e| column_error("job_description", e))?,
        salary_range: SalaryRange {
            min: row.try_get("min_salary").map_err(|e| column_error("min_salary", e))?,
            max: row.try_get("max_salary").map_err(|e| column_error("max_salary", e))?,
        },
        location: row.try_get("location").map_err(|e| column_error("location", e))?,
        posted_date: parse_posted_date(
            row.try_get("posted_date").map_err(|e| column_error("posted_date", e))?,
        )?,
        active: row
            .try_get::<Option<bool>, _>("is_active")
            .map_err(|e| column_error("is_active", e))?
            .unwrap_or(true),
    })
}
