use querygate_core::{QuerygateError, Role};
use thiserror::Error;

/// Errors raised while building or querying the policy table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Policy table has no entry for role {0}")]
    MissingPolicy(Role),

    #[error("Policy table has more than one entry for role {0}")]
    DuplicatePolicy(Role),
}

impl From<AccessError> for QuerygateError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::UnknownRole(name) => QuerygateError::UnknownRole(name),
            other => QuerygateError::Access(other.to_string()),
        }
    }
}
