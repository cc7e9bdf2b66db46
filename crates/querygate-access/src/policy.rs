//! Static role policy table.
//!
//! Maps each [`Role`] to the operations it may perform, the tables it may
//! read, and per-table column allow-lists. Built once at startup and shared
//! read-only for the life of the process.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use querygate_core::{Permission, Role, SchemaContext, TableSchema};

use crate::error::AccessError;

/// Which tables a role may touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "scope", content = "tables")]
pub enum TableScope {
    All,
    Only(BTreeSet<String>),
}

impl TableScope {
    pub fn only<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TableScope::Only(
            tables
                .into_iter()
                .map(|t| t.into().to_ascii_lowercase())
                .collect(),
        )
    }

    pub fn permits(&self, table: &str) -> bool {
        match self {
            TableScope::All => true,
            TableScope::Only(set) => set.contains(&table.to_ascii_lowercase()),
        }
    }
}

/// Policy for a single role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyEntry {
    pub role: Role,
    pub description: String,
    pub operations: BTreeSet<Permission>,
    pub tables: TableScope,
    /// Table -> permitted columns. Tables without an entry expose every column.
    pub columns: BTreeMap<String, BTreeSet<String>>,
}

impl PolicyEntry {
    pub fn new(role: Role, description: impl Into<String>) -> Self {
        Self {
            role,
            description: description.into(),
            operations: BTreeSet::from([Permission::Read]),
            tables: TableScope::Only(BTreeSet::new()),
            columns: BTreeMap::new(),
        }
    }

    pub fn with_operations(mut self, ops: &[Permission]) -> Self {
        self.operations = ops.iter().copied().collect();
        self
    }

    pub fn with_tables(mut self, tables: TableScope) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_columns(mut self, table: &str, columns: &[&str]) -> Self {
        self.columns.insert(
            table.to_ascii_lowercase(),
            columns.iter().map(|c| c.to_ascii_lowercase()).collect(),
        );
        self
    }

    pub fn allows(&self, op: Permission) -> bool {
        self.operations.contains(&op)
    }

    pub fn permits_table(&self, table: &str) -> bool {
        self.tables.permits(table)
    }

    /// Column allow-list for a table, or `None` when every column is visible.
    pub fn permitted_columns(&self, table: &str) -> Option<&BTreeSet<String>> {
        self.columns.get(&table.to_ascii_lowercase())
    }

    pub fn permits_column(&self, table: &str, column: &str) -> bool {
        match self.permitted_columns(table) {
            None => true,
            Some(cols) => cols.contains(&column.to_ascii_lowercase()),
        }
    }

    /// Narrow a full data-store schema to the tables and columns this role
    /// may read.
    pub fn scoped_schema(&self, full: &SchemaContext) -> SchemaContext {
        let tables = full
            .tables
            .iter()
            .filter(|t| self.permits_table(&t.name))
            .map(|t| TableSchema {
                name: t.name.clone(),
                columns: t
                    .columns
                    .iter()
                    .filter(|c| self.permits_column(&t.name, &c.name))
                    .cloned()
                    .collect(),
            })
            .filter(|t| !t.columns.is_empty())
            .collect();
        SchemaContext {
            role: Some(self.role),
            tables,
        }
    }
}

/// Process-wide, read-only role policy table.
#[derive(Debug, Clone)]
pub struct PolicyStore {
    entries: HashMap<Role, PolicyEntry>,
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PolicyStore {
    /// The fixed policy table shipped with the service.
    pub fn builtin() -> Self {
        let entries = vec![
            PolicyEntry::new(Role::Viewer, "Limited read access to basic user and order data")
                .with_tables(TableScope::only(["users", "orders"]))
                .with_columns("users", &["id", "name", "email"])
                .with_columns("orders", &["id", "amount", "date"]),
            PolicyEntry::new(Role::Readonly, "Read access to core business tables")
                .with_tables(TableScope::only(["users", "orders", "products", "categories"])),
            PolicyEntry::new(Role::Analyst, "Read access including sales and analytics data")
                .with_tables(TableScope::only([
                    "users",
                    "orders",
                    "products",
                    "categories",
                    "sales",
                    "analytics",
                ])),
            PolicyEntry::new(Role::Admin, "Full access to all tables and operations")
                .with_operations(&[
                    Permission::Read,
                    Permission::Write,
                    Permission::Delete,
                    Permission::Admin,
                ])
                .with_tables(TableScope::All),
        ];

        // Every role is covered exactly once above.
        Self {
            entries: entries.into_iter().map(|e| (e.role, e)).collect(),
        }
    }

    /// Build a store from a custom table. Every role must appear exactly once.
    pub fn from_entries(entries: Vec<PolicyEntry>) -> Result<Self, AccessError> {
        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            let role = entry.role;
            if map.insert(role, entry).is_some() {
                return Err(AccessError::DuplicatePolicy(role));
            }
        }
        for role in Role::ALL {
            if !map.contains_key(&role) {
                return Err(AccessError::MissingPolicy(role));
            }
        }
        Ok(Self { entries: map })
    }

    pub fn lookup(&self, role: Role) -> Option<&PolicyEntry> {
        self.entries.get(&role)
    }

    /// Look up a role by name. Names outside the role enum fail closed.
    pub fn lookup_name(&self, role: &str) -> Result<&PolicyEntry, AccessError> {
        let parsed: Role = role
            .parse()
            .map_err(|_| AccessError::UnknownRole(role.to_string()))?;
        self.lookup(parsed)
            .ok_or_else(|| AccessError::UnknownRole(role.to_string()))
    }

    /// All entries in role order.
    pub fn entries(&self) -> Vec<&PolicyEntry> {
        Role::ALL.iter().filter_map(|r| self.entries.get(r)).collect()
    }
}
