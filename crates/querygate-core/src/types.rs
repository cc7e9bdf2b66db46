//! Shared domain types for the Querygate workspace.
//!
//! Roles and permissions, tabular results, chart specifications, and the
//! schema context handed to statement generators.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Roles & Permissions
// =============================================================================

/// Caller role. Closed set; any other name is rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Viewer,
    Readonly,
    Analyst,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Viewer, Role::Readonly, Role::Analyst, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Readonly => "readonly",
            Role::Analyst => "analyst",
            Role::Admin => "admin",
        }
    }

    /// The elevated role bypasses the forbidden-keyword denylist.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "viewer" => Ok(Role::Viewer),
            "readonly" => Ok(Role::Readonly),
            "analyst" => Ok(Role::Analyst),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Operation a role may perform against the data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Read,
    Write,
    Delete,
    Admin,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Read => write!(f, "read"),
            Permission::Write => write!(f, "write"),
            Permission::Delete => write!(f, "delete"),
            Permission::Admin => write!(f, "admin"),
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// Tabular result of an executed read statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableResult {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
}

impl TableResult {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        let row_count = rows.len();
        Self {
            headers,
            rows,
            row_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column with the given header, case-insensitive.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    }

    /// Values of one column, in row order. Short rows yield `Null`.
    pub fn column(&self, index: usize) -> Vec<serde_json::Value> {
        self.rows
            .iter()
            .map(|row| row.get(index).cloned().unwrap_or(serde_json::Value::Null))
            .collect()
    }

    /// True when every non-null value in the column is numeric and at least
    /// one value is present.
    pub fn is_numeric_column(&self, index: usize) -> bool {
        let mut seen = false;
        for row in &self.rows {
            match row.get(index) {
                Some(serde_json::Value::Number(_)) => seen = true,
                Some(serde_json::Value::Null) | None => {}
                Some(_) => return false,
            }
        }
        seen
    }
}

/// Chart flavours the visualizer can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Bar,
    Line,
    Pie,
    Scatter,
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartType::Bar => write!(f, "bar"),
            ChartType::Line => write!(f, "line"),
            ChartType::Pie => write!(f, "pie"),
            ChartType::Scatter => write!(f, "scatter"),
        }
    }
}

/// Chart specification derived from a table result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub x: Vec<serde_json::Value>,
    pub y: Vec<f64>,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_label: Option<String>,
}

/// Data returned to the caller alongside the response text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TableResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSpec>,
}

impl ResultPayload {
    pub fn is_empty(&self) -> bool {
        self.table.is_none() && self.chart.is_none()
    }
}

// =============================================================================
// Schema context
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableSchema {
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// Tables and columns a role is allowed to see, handed to the statement
/// generator so it never proposes anything outside the role's policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaContext {
    pub role: Option<Role>,
    pub tables: Vec<TableSchema>,
}

impl SchemaContext {
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Plain-text rendering used as prompt context.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if let Some(role) = self.role {
            out.push_str(&format!("User role: {}\n", role));
        }
        out.push_str("Available tables:\n");
        for table in &self.tables {
            let cols: Vec<String> = table
                .columns
                .iter()
                .map(|c| format!("{} {}", c.name, c.data_type))
                .collect();
            out.push_str(&format!("- {} ({})\n", table.name, cols.join(", ")));
        }
        out
    }
}

/// How much work the statement generator is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryComplexity {
    Simple,
    Complex,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ---- Role ----

    #[test]
    fn test_role_parse_case_insensitive() {
        assert_eq!("viewer".parse::<Role>().unwrap(), Role::Viewer);
        assert_eq!(" Admin ".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("READONLY".parse::<Role>().unwrap(), Role::Readonly);
        assert!("guest".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_display_roundtrip() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_only_admin_is_elevated() {
        assert!(Role::Admin.is_elevated());
        assert!(!Role::Viewer.is_elevated());
        assert!(!Role::Readonly.is_elevated());
        assert!(!Role::Analyst.is_elevated());
    }

    #[test]
    fn test_role_serde_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Analyst).unwrap(), "\"analyst\"");
        let parsed: Role = serde_json::from_str("\"readonly\"").unwrap();
        assert_eq!(parsed, Role::Readonly);
    }

    // ---- TableResult ----

    #[test]
    fn test_table_result_counts_rows() {
        let table = TableResult::new(
            vec!["id".into(), "name".into()],
            vec![vec![json!(1), json!("Ada")], vec![json!(2), json!("Grace")]],
        );
        assert_eq!(table.row_count, 2);
        assert!(!table.is_empty());
        assert_eq!(table.column_index("NAME"), Some(1));
        assert_eq!(table.column(1), vec![json!("Ada"), json!("Grace")]);
    }

    #[test]
    fn test_numeric_column_detection() {
        let table = TableResult::new(
            vec!["month".into(), "amount".into()],
            vec![
                vec![json!("2024-01"), json!(10.5)],
                vec![json!("2024-02"), serde_json::Value::Null],
                vec![json!("2024-03"), json!(7)],
            ],
        );
        assert!(!table.is_numeric_column(0));
        assert!(table.is_numeric_column(1));
        assert!(!table.is_numeric_column(5));
    }

    // ---- Payload & chart ----

    #[test]
    fn test_payload_serialization_skips_missing_parts() {
        let payload = ResultPayload::default();
        assert!(payload.is_empty());
        assert_eq!(serde_json::to_value(&payload).unwrap(), json!({}));

        let chart = ChartSpec {
            chart_type: ChartType::Bar,
            x: vec![json!("a")],
            y: vec![1.0],
            label: "Sales".into(),
            x_label: None,
            y_label: Some("amount".into()),
        };
        let value = serde_json::to_value(&chart).unwrap();
        assert_eq!(value["type"], "bar");
        assert!(value.get("x_label").is_none());
        assert_eq!(value["y_label"], "amount");
    }

    // ---- Schema context ----

    #[test]
    fn test_schema_context_describe() {
        let ctx = SchemaContext {
            role: Some(Role::Viewer),
            tables: vec![TableSchema {
                name: "users".into(),
                columns: vec![
                    ColumnInfo {
                        name: "id".into(),
                        data_type: "INTEGER".into(),
                    },
                    ColumnInfo {
                        name: "name".into(),
                        data_type: "TEXT".into(),
                    },
                ],
            }],
        };
        let text = ctx.describe();
        assert!(text.contains("User role: viewer"));
        assert!(text.contains("- users (id INTEGER, name TEXT)"));
        assert!(ctx.table("USERS").is_some());
        assert!(ctx.table("orders").is_none());
    }
}
