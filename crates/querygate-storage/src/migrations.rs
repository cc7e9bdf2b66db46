//! Database schema migrations.
//!
//! Applies the business schema queried by the service: users, orders,
//! products, categories, sales, and analytics.

use rusqlite::Connection;
use tracing::info;

use querygate_core::QuerygateError;

/// Bookkeeping table hidden from schema introspection.
pub const MIGRATIONS_TABLE: &str = "schema_migrations";

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), QuerygateError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| QuerygateError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| {
            QuerygateError::Storage(format!("Failed to query migration version: {}", e))
        })?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: business_schema");
    }

    Ok(())
}

/// Version 1: business schema.
fn apply_v1(conn: &Connection) -> Result<(), QuerygateError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            email       TEXT NOT NULL UNIQUE,
            city        TEXT,
            phone       TEXT,
            created_at  TEXT NOT NULL DEFAULT (date('now'))
        );

        CREATE TABLE IF NOT EXISTS categories (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS products (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            category_id INTEGER REFERENCES categories(id),
            price       REAL NOT NULL,
            stock       INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS orders (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL REFERENCES users(id),
            amount      REAL NOT NULL,
            date        TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'completed'
        );

        CREATE TABLE IF NOT EXISTS sales (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            month       TEXT NOT NULL,
            region      TEXT NOT NULL,
            product_id  INTEGER REFERENCES products(id),
            amount      REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS analytics (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            metric      TEXT NOT NULL,
            value       REAL NOT NULL,
            period      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id);
        CREATE INDEX IF NOT EXISTS idx_orders_date ON orders(date);
        CREATE INDEX IF NOT EXISTS idx_sales_month ON sales(month);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'business_schema');
        ",
    )
    .map_err(|e| QuerygateError::Storage(format!("Migration v1 failed: {}", e)))?;

    Ok(())
}
