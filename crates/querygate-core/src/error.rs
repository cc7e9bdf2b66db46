use thiserror::Error;

/// Top-level error type for the Querygate system.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for QuerygateError` so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuerygateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Access error: {0}")]
    Access(String),

    #[error("Workflow error: {0}")]
    Workflow(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for QuerygateError {
    fn from(err: toml::de::Error) -> Self {
        QuerygateError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for QuerygateError {
    fn from(err: toml::ser::Error) -> Self {
        QuerygateError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for QuerygateError {
    fn from(err: serde_json::Error) -> Self {
        QuerygateError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Querygate operations.
pub type Result<T> = std::result::Result<T, QuerygateError>;

/// Failure reported by an external collaborator (classifier, generator,
/// executor, chart generator, composer).
///
/// The workflow engine absorbs these at the stage boundary; they never reach
/// the caller as-is.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("{collaborator} failed: {message}")]
    Failed {
        collaborator: &'static str,
        message: String,
    },

    #[error("{0} returned an empty result")]
    Empty(&'static str),

    #[error("{0} is unavailable")]
    Unavailable(&'static str),
}

impl CollaboratorError {
    pub fn failed(collaborator: &'static str, message: impl Into<String>) -> Self {
        CollaboratorError::Failed {
            collaborator,
            message: message.into(),
        }
    }
}
