//! Relational stores for jobsuite.
//!
//! Backends:
//! - **SQLite**: `sqlite://path` or `sqlite::memory:`
//! - **PostgreSQL**: `postgres://...` (behind the `postgres` feature)
//!
//! Both run each statement in its own transaction and render every value
//! as text (see [`render`]).

pub mod render;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

use chrono::NaiveDate;
use jobsuite_core::error::StoreError;
use jobsuite_core::listing::RelationalStore;
use std::sync::Arc;

/// Connect to the store named by `url`.
pub async fn connect(
    url: &str,
    listings_table: &str,
    max_connections: u32,
) -> Result<Arc<dyn RelationalStore>, StoreError> {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        #[cfg(feature = "postgres")]
        {
            let store = PgStore::connect(url, listings_table, max_connections).await?;
            return Ok(Arc::new(store));
        }
        #[cfg(not(feature = "postgres"))]
        return Err(StoreError::Connection(
            "PostgreSQL support not compiled in (enable the `postgres` feature)".into(),
        ));
    }

    if url.starts_with("sqlite:") {
        #[cfg(feature = "sqlite")]
        {
            let store = SqliteStore::connect(url, listings_table, max_connections).await?;
            return Ok(Arc::new(store));
        }
        #[cfg(not(feature = "sqlite"))]
        return Err(StoreError::Connection(
            "SQLite support not compiled in (enable the `sqlite` feature)".into(),
        ));
    }

    Err(StoreError::Connection(format!(
        "Unsupported database URL scheme: {}",
        url.split(':').next().unwrap_or_default()
    )))
}

/// The statement ingestion reads listings with.
pub(crate) fn document_sources_sql(table: &str) -> String {
    format!(
        "SELECT CAST(job_id AS BIGINT) AS job_id, job_title, job_description \
         FROM {table} WHERE job_description IS NOT NULL ORDER BY job_id"
    )
}

/// The statement one full listing is read with; `param` is the backend's
/// placeholder for the `job_id` bind.
pub(crate) fn listing_sql(table: &str, param: &str) -> String {
    format!(
        "SELECT CAST(job_id AS BIGINT) AS job_id, job_title, job_description, \
         CAST(min_salary AS DOUBLE PRECISION) AS min_salary, \
         CAST(max_salary AS DOUBLE PRECISION) AS max_salary, \
         location, CAST(posted_date AS TEXT) AS posted_date, is_active \
         FROM {table} WHERE job_id = {param}"
    )
}

/// Parse the `YYYY-MM-DD` prefix of a date or timestamp rendered as text.
pub(crate) fn parse_posted_date(text: Option<String>) -> Result<Option<NaiveDate>, StoreError> {
    let Some(text) = text else {
        return Ok(None);
    };
    let day = text.get(..10).unwrap_or(&text);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| StoreError::QueryFailed(format!("posted_date column {text:?}: {e}")))
}

fn column_error(column: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::QueryFailed(format!("{column} column: {e}"))
}

/// Table names are interpolated into SQL, so only `[A-Za-z0-9_]` segments
/// joined by at most one `.` are accepted.
pub(crate) fn validate_table_name(table: &str) -> Result<(), StoreError> {
    let segments: Vec<&str> = table.split('.').collect();
    let valid = segments.len() <= 2
        && segments.iter().all(|s| {
            !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(StoreError::Connection(format!("Invalid listings table name: {table:?}")))
    }
}
