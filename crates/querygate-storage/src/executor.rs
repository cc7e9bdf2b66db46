//! Read-only statement execution against SQLite.
//!
//! The executor refuses anything that is not a read statement on its own,
//! independent of the access validator: the text must start with `SELECT`
//! or `WITH` and SQLite must report the prepared statement as read-only.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::Value;
use tracing::{debug, warn};

use querygate_core::{
    CollaboratorError, QuerygateError, ResultExecutor, Role, SchemaContext, TableResult,
};

use crate::db::Database;
use crate::schema;

const NAME: &str = "result executor";

/// Runs approved read statements and reports the schema.
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    db: Arc<Database>,
    max_rows: usize,
}

impl SqliteExecutor {
    pub fn new(db: Arc<Database>, max_rows: usize) -> Self {
        Self {
            db,
            max_rows: max_rows.max(1),
        }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Blocking execution. Errors are storage errors.
    pub fn run(&self, statement: &str) -> Result<TableResult, QuerygateError> {
        let max_rows = self.max_rows;
        self.db.with_conn(|conn| query_read_only(conn, statement, max_rows))
    }
}

fn is_read_prefix(statement: &str) -> bool {
    let head = statement.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
    let word: String = head
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_lowercase();
    word == "select" || word == "with"
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<{} bytes>", bytes.len())),
    }
}

fn query_read_only(
    conn: &Connection,
    statement: &str,
    max_rows: usize,
) -> Result<TableResult, QuerygateError> {
    if !is_read_prefix(statement) {
        return Err(QuerygateError::Storage(
            "Only read statements may be executed".to_string(),
        ));
    }
    let mut stmt = conn
        .prepare(statement)
        .map_err(|e| QuerygateError::Storage(format!("Failed to prepare statement: {}", e)))?;
    if !stmt.readonly() {
        return Err(QuerygateError::Storage(
            "Statement would modify the database".to_string(),
        ));
    }

    let headers: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = headers.len();
    let mut rows_out: Vec<Vec<Value>> = Vec::new();
    let mut rows = stmt
        .query([])
        .map_err(|e| QuerygateError::Storage(format!("Failed to execute statement: {}", e)))?;
    while let Some(row) = rows
        .next()
        .map_err(|e| QuerygateError::Storage(format!("Failed to read row: {}", e)))?
    {
        if rows_out.len() >= max_rows {
            warn!(max_rows, "Result truncated at row limit");
            break;
        }
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            let value = row
                .get_ref(idx)
                .map_err(|e| QuerygateError::Storage(format!("Failed to read column: {}", e)))?;
            values.push(to_json(value));
        }
        rows_out.push(values);
    }
    Ok(TableResult::new(headers, rows_out))
}

#[async_trait]
impl ResultExecutor for SqliteExecutor {
    async fn execute(&self, statement: &str, role: Role) -> Result<TableResult, CollaboratorError> {
        let executor = self.clone();
        let owned = statement.to_string();
        let table = tokio::task::spawn_blocking(move || executor.run(&owned))
            .await
            .map_err(|e| CollaboratorError::failed(NAME, e.to_string()))?
            .map_err(|e| {
                warn!(role = %role, error = %e, "Statement execution failed");
                CollaboratorError::failed(NAME, e.to_string())
            })?;
        debug!(role = %role, rows = table.row_count, "Statement executed");
        Ok(table)
    }

    async fn schema(&self) -> Result<SchemaContext, CollaboratorError> {
        self.db
            .with_conn(schema::describe)
            .map_err(|e| CollaboratorError::failed(NAME, e.to_string()))
    }
}
