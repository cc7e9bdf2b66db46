//! SQLite data store: connection wrapper, schema, sample data, and the
//! read-only executor used by the workflow.

pub mod db;
pub mod executor;
pub mod migrations;
pub mod schema;
pub mod seed;

pub use db::Database;
pub use executor::SqliteExecutor;
