//! Structured query tool: runs SQL against the relational store.
//!
//! The statement goes through the configured [`QueryGuard`] first, then runs
//! in its own transaction. Rows come back as a comma-joined header line and
//! one comma-joined line per row. Failures of any kind come back as
//! `Error executing query: ...` text with `success = false`.

use crate::guard::{GuardCheck, QueryGuard};
use async_trait::async_trait;
use jobsuite_core::error::ToolError;
use jobsuite_core::listing::{QueryRows, RelationalStore};
use jobsuite_core::tool::{Tool, ToolResult};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const NO_ROWS: &str = "Query executed successfully, but returned no results.";

pub struct StructuredQueryTool {
    store: Arc<dyn RelationalStore>,
    guard: Option<Arc<dyn QueryGuard>>,
    max_rows: usize,
}

impl StructuredQueryTool {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self {
            store,
            guard: None,
            max_rows: 200,
        }
    }

    pub fn with_guard(mut self, guard: Arc<dyn QueryGuard>) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows.max(1);
        self
    }

    /// Run one statement and render the outcome as text.
    ///
    /// Returns `(success, text)`; errors never escape as `Err`.
    pub async fn run(&self, sql: &str) -> (bool, String) {
        info!(tool = "query_structured", query = %sql, "Executing SQL query");

        if let Some(guard) = &self.guard {
            if let GuardCheck::Denied { guard, reason } = guard.check(sql) {
                warn!(guard = %guard, %reason, "Query rejected");
                return (false, format!("Error executing query: rejected by {guard} guard: {reason}"));
            }
        }

        match self.store.execute(sql).await {
            Ok(rows) if rows.is_empty() => (true, NO_ROWS.to_string()),
            Ok(rows) => {
                debug!(rows = rows.rows.len(), "Query returned rows");
                (true, render_rows(&rows, self.max_rows))
            }
            Err(e) => {
                warn!(error = %e, "Query failed");
                (false, format!("Error executing query: {e}"))
            }
        }
    }
}

/// Header line plus one line per row, capped at `max_rows` rows.
pub fn render_rows(rows: &QueryRows, max_rows: usize) -> String {
    let mut out = rows.columns.join(", ");
    out.push('\n');
    for row in rows.rows.iter().take(max_rows) {
        out.push_str(&row.join(", "));
        out.push('\n');
    }
    if rows.rows.len() > max_rows {
        out.push_str(&format!(
            "... ({} more rows not shown)\n",
            rows.rows.len() - max_rows
        ));
    }
    out
}

#[async_trait]
impl Tool for StructuredQueryTool {
    fn name(&self) -> &str {
        "query_structured"
    }

    fn description(&self) -> &str {
        "Executes a SQL query against the job placement database and returns the rows as text. \
         Use this for specific, factual questions about students, employers, placements, salaries, \
         counts, averages, dates or a listing's status."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "A single SQL statement"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let sql = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let (success, output) = self.run(sql).await;
        Ok(if success {
            ToolResult::ok(output)
        } else {
            ToolResult::failed(output)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::SchemaPrefixGuard;
    use jobsuite_core::error::StoreError;
    use jobsuite_core::listing::{JobListing, ListingDocumentSource};
    use std::sync::Mutex;

    /// Returns canned rows and records every statement it sees.
    struct CannedStore {
        rows: Result<QueryRows, StoreError>,
        seen: Mutex<Vec<String>>,
    }

    impl CannedStore {
        fn new(rows: Result<QueryRows, StoreError>) -> Arc<Self> {
            Arc::new(Self {
                rows,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RelationalStore for CannedStore {
        fn name(&self) -> &str {
            "canned"
        }

        async fn execute(&self, sql: &str) -> Result<QueryRows, StoreError> {
            self.seen.lock().unwrap().push(sql.to_string());
            self.rows.clone()
        }

        async fn fetch_document_sources(&self) -> Result<Vec<ListingDocumentSource>, StoreError> {
            Ok(Vec::new())
        }

        async fn fetch_listing(&self, _job_id: i64) -> Result<Option<JobListing>, StoreError> {
            Ok(None)
        }
    }

    fn students() -> QueryRows {
        QueryRows {
            columns: vec!["first_name".into(), "graduation_year".into()],
            rows: vec![
                vec!["Ada".into(), "2023".into()],
                vec!["Grace".into(), "None".into()],
            ],
        }
    }

    #[tokio::test]
    async fn renders_header_and_rows() {
        let tool = StructuredQueryTool::new(CannedStore::new(Ok(students())));
        let result = tool
            .execute(serde_json::json!({"query": "SELECT first_name, graduation_year FROM students"}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "first_name, graduation_year\nAda, 2023\nGrace, None\n");
    }

    #[tokio::test]
    async fn empty_result_sentinel() {
        let tool = StructuredQueryTool::new(CannedStore::new(Ok(QueryRows::default())));
        let (success, output) = tool.run("SELECT * FROM students WHERE 1 = 0").await;
        assert!(success);
        assert_eq!(output, NO_ROWS);
    }

    #[tokio::test]
    async fn store_error_is_data() {
        let tool = StructuredQueryTool::new(CannedStore::new(Err(StoreError::QueryFailed(
            "near \"SELEKT\": syntax error".into(),
        ))));
        let result = tool
            .execute(serde_json::json!({"query": "SELEKT * FROM x"}))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.starts_with("Error executing query: "));
        assert!(result.output.contains("SELEKT"));
    }

    #[tokio::test]
    async fn guard_rejection_never_reaches_store() {
        let store = CannedStore::new(Ok(students()));
        let tool = StructuredQueryTool::new(store.clone())
            .with_guard(Arc::new(SchemaPrefixGuard::new("jobplacement_RAG")));

        let (success, output) = tool.run("SELECT * FROM students").await;
        assert!(!success);
        assert!(output.starts_with("Error executing query: rejected by schema_prefix guard"));
        assert!(store.seen.lock().unwrap().is_empty());

        let (success, _) = tool.run("SELECT * FROM jobplacement_RAG.students").await;
        assert!(success);
        assert_eq!(store.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_query_argument() {
        let tool = StructuredQueryTool::new(CannedStore::new(Ok(students())));
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn row_cap_adds_marker() {
        let rows = QueryRows {
            columns: vec!["n".into()],
            rows: (0..5).map(|i| vec![i.to_string()]).collect(),
        };
        assert_eq!(render_rows(&rows, 2), "n\n0\n1\n... (3 more rows not shown)\n");
        assert_eq!(render_rows(&rows, 5), "n\n0\n1\n2\n3\n4\n");
    }
}
