//! Role-based access validation for generated read statements.
//!
//! [`AccessValidator::validate`] runs a fixed sequence of checks and returns
//! the first failure. Every decision is logged with the role and outcome.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use querygate_core::{Permission, Role};

use crate::lexer::{analyze, StatementShape};
use crate::policy::{PolicyEntry, PolicyStore};

/// Why a statement was refused. Logged, never shown to the caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    EmptyStatement,
    UnknownRole(String),
    MultipleStatements,
    TableNotPermitted { role: Role, table: String },
    NotReadStatement { role: Role },
    ReadNotPermitted { role: Role },
    ForbiddenKeyword(String),
    NoTablesIdentified,
    ColumnNotPermitted { table: String, column: String },
    WildcardNotPermitted { table: String },
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::EmptyStatement => write!(f, "Statement is empty"),
            DenyReason::UnknownRole(role) => write!(f, "Invalid role: {}", role),
            DenyReason::MultipleStatements => {
                write!(f, "Multiple statements are not allowed")
            }
            DenyReason::TableNotPermitted { role, table } => {
                write!(f, "Access denied to table '{}' for role '{}'", table, role)
            }
            DenyReason::NotReadStatement { role } => {
                write!(f, "Only read statements are allowed for role '{}'", role)
            }
            DenyReason::ReadNotPermitted { role } => {
                write!(f, "Role '{}' may not read data", role)
            }
            DenyReason::ForbiddenKeyword(kw) => {
                write!(f, "Forbidden keyword '{}' in statement", kw)
            }
            DenyReason::NoTablesIdentified => {
                write!(f, "No tables could be identified in statement")
            }
            DenyReason::ColumnNotPermitted { table, column } => {
                write!(f, "Access denied to column '{}' of table '{}'", column, table)
            }
            DenyReason::WildcardNotPermitted { table } => write!(
                f,
                "Wildcard selection is not allowed on column-restricted table '{}'",
                table
            ),
        }
    }
}

/// Outcome of validating one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }

    pub fn reason(&self) -> Option<&DenyReason> {
        match self {
            AccessDecision::Allow => None,
            AccessDecision::Deny(reason) => Some(reason),
        }
    }
}

/// Gate between statement generation and execution.
#[derive(Debug, Clone)]
pub struct AccessValidator {
    policies: Arc<PolicyStore>,
}

impl AccessValidator {
    pub fn new(policies: Arc<PolicyStore>) -> Self {
        Self { policies }
    }

    pub fn policies(&self) -> &PolicyStore {
        &self.policies
    }

    /// Validate a statement for a role given by name. Unknown names are denied.
    pub fn validate(&self, role: &str, statement: &str) -> AccessDecision {
        match self.policies.lookup_name(role) {
            Ok(entry) => self.validate_entry(entry, statement),
            Err(_) => {
                let decision = AccessDecision::Deny(DenyReason::UnknownRole(role.to_string()));
                warn!(role = %role, "Access denied: unknown role");
                decision
            }
        }
    }

    /// Validate a statement for a known role.
    pub fn validate_role(&self, role: Role, statement: &str) -> AccessDecision {
        match self.policies.lookup(role) {
            Some(entry) => self.validate_entry(entry, statement),
            None => {
                warn!(role = %role, "Access denied: no policy entry");
                AccessDecision::Deny(DenyReason::UnknownRole(role.to_string()))
            }
        }
    }

    fn validate_entry(&self, entry: &PolicyEntry, statement: &str) -> AccessDecision {
        let decision = match check(entry, statement) {
            Ok(()) => AccessDecision::Allow,
            Err(reason) => AccessDecision::Deny(reason),
        };
        match &decision {
            AccessDecision::Allow => debug!(role = %entry.role, "Access granted"),
            AccessDecision::Deny(reason) => {
                warn!(role = %entry.role, reason = %reason, "Access denied")
            }
        }
        decision
    }
}

fn check(entry: &PolicyEntry, statement: &str) -> Result<(), DenyReason> {
    if statement.trim().is_empty() {
        return Err(DenyReason::EmptyStatement);
    }
    let shape = analyze(statement);
    let role = entry.role;

    if shape.multiple_statements {
        return Err(DenyReason::MultipleStatements);
    }

    for table in &shape.tables {
        if !entry.permits_table(&table.name) {
            return Err(DenyReason::TableNotPermitted {
                role,
                table: table.name.clone(),
            });
        }
    }

    if shape.is_read {
        if !entry.allows(Permission::Read) {
            return Err(DenyReason::ReadNotPermitted { role });
        }
    } else if !entry.allows(Permission::Write) {
        return Err(DenyReason::NotReadStatement { role });
    }

    if !role.is_elevated() {
        if let Some(kw) = shape.denylisted.first() {
            return Err(DenyReason::ForbiddenKeyword(kw.clone()));
        }
    }

    if shape.tables.is_empty() {
        return Err(DenyReason::NoTablesIdentified);
    }

    check_columns(entry, &shape)
}

fn check_columns(entry: &PolicyEntry, shape: &StatementShape) -> Result<(), DenyReason> {
    let restricted: Vec<&str> = shape
        .tables
        .iter()
        .map(|t| t.name.as_str())
        .filter(|t| entry.permitted_columns(t).is_some())
        .collect();
    if restricted.is_empty() {
        return Ok(());
    }

    for wildcard in &shape.wildcards {
        match wildcard {
            None => {
                if let Some(table) = restricted.first() {
                    return Err(DenyReason::WildcardNotPermitted {
                        table: table.to_string(),
                    });
                }
            }
            Some(qualifier) => match shape.resolve(qualifier) {
                Some(table) if entry.permitted_columns(table).is_none() => {}
                resolved => {
                    return Err(DenyReason::WildcardNotPermitted {
                        table: resolved.unwrap_or(qualifier.as_str()).to_string(),
                    });
                }
            },
        }
    }

    for col in &shape.columns {
        let resolved = col.qualifier.as_deref().and_then(|q| shape.resolve(q));
        match resolved {
            Some(table) => {
                if !entry.permits_column(table, &col.column) {
                    return Err(DenyReason::ColumnNotPermitted {
                        table: table.to_string(),
                        column: col.column.clone(),
                    });
                }
            }
            None => {
                // Unqualified or unresolvable references may land on any
                // restricted table in scope, so one of them must expose the
                // column even when an unrestricted table is also present.
                let permitted = restricted
                    .iter()
                    .any(|t| entry.permits_column(t, &col.column));
                if !permitted {
                    return Err(DenyReason::ColumnNotPermitted {
                        table: restricted[0].to_string(),
                        column: col.column.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}
