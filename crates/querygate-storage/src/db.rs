//! Database connection management.
//!
//! Wraps a single rusqlite Connection in a Mutex for thread-safe access and
//! applies the schema on open.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use querygate_core::QuerygateError;

use crate::migrations;

/// Thread-safe SQLite database wrapper.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self, QuerygateError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| QuerygateError::Storage(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(|e| QuerygateError::Storage(format!("Failed to set pragmas: {}", e)))?;

        info!("Database opened at {}", path.display());
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn in_memory() -> Result<Self, QuerygateError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            QuerygateError::Storage(format!("Failed to open in-memory db: {}", e))
        })?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| QuerygateError::Storage(format!("Failed to set pragmas: {}", e)))?;

        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, QuerygateError> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Execute a closure with a reference to the underlying connection.
    ///
    /// The mutex is held for the duration of the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, QuerygateError>
    where
        F: FnOnce(&Connection) -> Result<T, QuerygateError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| QuerygateError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_users(db: &Database) -> i64 {
        db.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
                .map_err(|e| QuerygateError::Storage(e.to_string()))
        })
        .unwrap()
    }

    #[test]
    fn test_in_memory_database_has_schema() {
        let db = Database::in_memory().unwrap();
        assert_eq!(count_users(&db), 0);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("querygate.db");
        {
            let db = Database::new(&path).unwrap();
            db.with_conn(|conn| {
                conn.execute(
                    "INSERT INTO users (name, email, city) VALUES ('Ada', 'ada@example.com', 'London')",
                    [],
                )
                .map_err(|e| QuerygateError::Storage(e.to_string()))
            })
            .unwrap();
        }
        let reopened = Database::new(&path).unwrap();
        assert_eq!(count_users(&reopened), 1);
    }

    #[test]
    fn test_with_conn_propagates_errors() {
        let db = Database::in_memory().unwrap();
        let result: Result<(), QuerygateError> = db.with_conn(|conn| {
            conn.execute("SELECT * FROM missing_table", [])
                .map(|_| ())
                .map_err(|e| QuerygateError::Storage(e.to_string()))
        });
        assert!(matches!(result, Err(QuerygateError::Storage(_))));
    }
}
