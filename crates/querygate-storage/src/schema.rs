//! Schema introspection for statement generation.

use rusqlite::Connection;

use querygate_core::{ColumnInfo, QuerygateError, SchemaContext, TableSchema};

use crate::migrations::MIGRATIONS_TABLE;

/// User tables in name order, excluding SQLite internals and bookkeeping.
pub fn list_tables(conn: &Connection) -> Result<Vec<String>, QuerygateError> {
    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != ?1
             ORDER BY name",
        )
        .map_err(|e| QuerygateError::Storage(format!("Failed to list tables: {}", e)))?;
    let names = stmt
        .query_map([MIGRATIONS_TABLE], |row| row.get::<_, String>(0))
        .map_err(|e| QuerygateError::Storage(format!("Failed to list tables: {}", e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| QuerygateError::Storage(format!("Failed to read table name: {}", e)))?;
    Ok(names)
}

/// Columns of one table, in declaration order. `None` if the table is absent.
pub fn table_schema(conn: &Connection, table: &str) -> Result<Option<TableSchema>, QuerygateError> {
    if !list_tables(conn)?.iter().any(|t| t == table) {
        return Ok(None);
    }
    // Name is checked against sqlite_master above, so interpolation is safe.
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info(\"{}\")", table))
        .map_err(|e| QuerygateError::Storage(format!("Failed to describe {}: {}", table, e)))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get(1)?,
                data_type: row.get(2)?,
            })
        })
        .map_err(|e| QuerygateError::Storage(format!("Failed to describe {}: {}", table, e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| QuerygateError::Storage(format!("Failed to read column: {}", e)))?;
    Ok(Some(TableSchema {
        name: table.to_string(),
        columns,
    }))
}

/// Full schema of every user table.
pub fn describe(conn: &Connection) -> Result<SchemaContext, QuerygateError> {
    let mut tables = Vec::new();
    for name in list_tables(conn)? {
        if let Some(schema) = table_schema(conn, &name)? {
            tables.push(schema);
        }
    }
    Ok(SchemaContext { role: None, tables })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_list_tables_hides_internals() {
        let tables = list_tables(&conn()).unwrap();
        assert_eq!(
            tables,
            vec!["analytics", "categories", "orders", "products", "sales", "users"]
        );
    }

    #[test]
    fn test_table_schema_columns() {
        let schema = table_schema(&conn(), "orders").unwrap().unwrap();
        let names: Vec<&str> = schema.column_names().collect();
        assert_eq!(names, vec!["id", "user_id", "amount", "date", "status"]);
        assert_eq!(schema.columns[2].data_type, "REAL");
    }

    #[test]
    fn test_table_schema_unknown_table() {
        assert!(table_schema(&conn(), "nope").unwrap().is_none());
        assert!(table_schema(&conn(), "users\"; DROP TABLE users; --")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_describe_covers_all_tables() {
        let ctx = describe(&conn()).unwrap();
        assert_eq!(ctx.tables.len(), 6);
        assert!(ctx.table("users").unwrap().column_names().any(|c| c == "email"));
    }
}
