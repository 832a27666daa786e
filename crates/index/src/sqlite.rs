//! SQLite-backed persistent vector index.
//!
//! Uses a single SQLite database file with two tables:
//! - `documents`: one row per (collection, document ID) with text,
//!   metadata JSON and the embedding as little-endian `f32` bytes
//! - `index_meta`: the embedding model and dimensionality each collection
//!   was built with
//!
//! Rows carry no timestamps, so upserting the same documents again leaves
//! the stored state unchanged.

use crate::vector;
use async_trait::async_trait;
use jobsuite_core::error::IndexError;
use jobsuite_core::index::{SearchHit, VectorDocument, VectorIndex};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A persistent vector index scoped to one collection.
pub struct SqliteIndex {
    pool: SqlitePool,
    collection: String,
    dims: usize,
}

impl SqliteIndex {
    /// Open (or create) the index at `path` for `collection`.
    ///
    /// The first open records `model_id` and `dims`; later opens with a
    /// different model fail with [`IndexError::ModelMismatch`].
    /// Pass `"sqlite::memory:"` for an ephemeral index.
    pub async fn new(
        path: &str,
        collection: &str,
        model_id: &str,
        dims: usize,
    ) -> Result<Self, IndexError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| IndexError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // Each in-memory connection would otherwise see its own database
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| IndexError::Storage(format!("Failed to open SQLite: {e}")))?;

        Self::from_pool(pool, collection, model_id, dims).await
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(
        pool: SqlitePool,
        collection: &str,
        model_id: &str,
        dims: usize,
    ) -> Result<Self, IndexError> {
        let index = Self {
            pool,
            collection: collection.to_string(),
            dims,
        };
        index.run_migrations().await?;
        index.check_model(model_id).await?;
        info!(collection, model = model_id, dims, "SQLite vector index ready");
        Ok(index)
    }

    async fn run_migrations(&self) -> Result<(), IndexError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection  TEXT NOT NULL,
                id          TEXT NOT NULL,
                text        TEXT NOT NULL,
                metadata    TEXT NOT NULL DEFAULT '{}',
                embedding   BLOB NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| IndexError::MigrationFailed(format!("documents table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS index_meta (
                collection  TEXT PRIMARY KEY,
                model       TEXT NOT NULL,
                dims        INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| IndexError::MigrationFailed(format!("index_meta table: {e}")))?;

        debug!("SQLite index migrations complete");
        Ok(())
    }

    /// Record the embedder identity, or verify it matches the recorded one.
    async fn check_model(&self, model_id: &str) -> Result<(), IndexError> {
        let row = sqlx::query("SELECT model, dims FROM index_meta WHERE collection = ?1")
            .bind(&self.collection)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IndexError::QueryFailed(format!("index_meta lookup: {e}")))?;

        let Some(row) = row else {
            sqlx::query("INSERT INTO index_meta (collection, model, dims) VALUES (?1, ?2, ?3)")
                .bind(&self.collection)
                .bind(model_id)
                .bind(self.dims as i64)
                .execute(&self.pool)
                .await
                .map_err(|e| IndexError::Storage(format!("index_meta insert: {e}")))?;
            return Ok(());
        };

        let indexed: String = row
            .try_get("model")
            .map_err(|e| IndexError::QueryFailed(format!("model column: {e}")))?;
        let dims: i64 = row
            .try_get("dims")
            .map_err(|e| IndexError::QueryFailed(format!("dims column: {e}")))?;

        if indexed != model_id {
            return Err(IndexError::ModelMismatch {
                indexed,
                configured: model_id.to_string(),
            });
        }
        if dims as usize != self.dims {
            return Err(IndexError::DimensionMismatch {
                expected: dims as usize,
                actual: self.dims,
            });
        }
        Ok(())
    }

    /// The collection this index reads and writes.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<VectorDocument, IndexError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| IndexError::QueryFailed(format!("id column: {e}")))?;
        let text: String = row
            .try_get("text")
            .map_err(|e| IndexError::QueryFailed(format!("text column: {e}")))?;
        let metadata_json: String = row
            .try_get("metadata")
            .map_err(|e| IndexError::QueryFailed(format!("metadata column: {e}")))?;
        let blob: Vec<u8> = row
            .try_get("embedding")
            .map_err(|e| IndexError::QueryFailed(format!("embedding column: {e}")))?;

        let metadata = serde_json::from_str(&metadata_json)
            .map_err(|e| IndexError::QueryFailed(format!("metadata for {id}: {e}")))?;

        Ok(VectorDocument {
            id,
            embedding: Self::blob_to_embedding(&blob),
            text,
            metadata,
        })
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn upsert(&self, doc: VectorDocument) -> Result<(), IndexError> {
        if doc.embedding.len() != self.dims {
            return Err(IndexError::DimensionMismatch {
                expected: self.dims,
                actual: doc.embedding.len(),
            });
        }

        let metadata_json = serde_json::to_string(&doc.metadata)
            .map_err(|e| IndexError::Storage(format!("Metadata serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, text, metadata, embedding)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(collection, id) DO UPDATE SET
                text = excluded.text,
                metadata = excluded.metadata,
                embedding = excluded.embedding
            "#,
        )
        .bind(&self.collection)
        .bind(&doc.id)
        .bind(&doc.text)
        .bind(&metadata_json)
        .bind(Self::embedding_to_blob(&doc.embedding))
        .execute(&self.pool)
        .await
        .map_err(|e| IndexError::Storage(format!("UPSERT failed: {e}")))?;

        debug!(id = %doc.id, collection = %self.collection, "Upserted document");
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if embedding.len() != self.dims {
            return Err(IndexError::DimensionMismatch {
                expected: self.dims,
                actual: embedding.len(),
            });
        }

        let rows = sqlx::query("SELECT * FROM documents WHERE collection = ?1")
            .bind(&self.collection)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| IndexError::QueryFailed(format!("Vector scan: {e}")))?;

        let docs = rows
            .iter()
            .map(Self::row_to_document)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(vector::rank(&docs, embedding, k))
    }

    async fn get(&self, id: &str) -> Result<Option<VectorDocument>, IndexError> {
        let row = sqlx::query("SELECT * FROM documents WHERE collection = ?1 AND id = ?2")
            .bind(&self.collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| IndexError::QueryFailed(format!("GET by ID: {e}")))?;

        match row {
            Some(ref r) => Ok(Some(Self::row_to_document(r)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, IndexError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ?1 AND id = ?2")
            .bind(&self.collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| IndexError::Storage(format!("DELETE failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<usize, IndexError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM documents WHERE collection = ?1")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| IndexError::QueryFailed(format!("COUNT: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| IndexError::QueryFailed(format!("cnt column: {e}")))?;

        Ok(cnt as usize)
    }
}
