//! Error types for the workflow engine.

use querygate_core::{CollaboratorError, QuerygateError};

use crate::stage::{Signal, Stage};

/// Errors raised by the workflow engine.
///
/// Only `InvalidRequest` and `UnknownRole` ever reach a caller; the rest are
/// absorbed at the stage boundary.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Unknown role: {0}")]
    UnknownRole(String),
    #[error("Invalid stage transition: {0} -> {1}")]
    InvalidTransition(Stage, Stage),
    #[error("Stage {0} cannot handle signal {1:?}")]
    UnexpectedSignal(Stage, Signal),
    #[error("Stage {0} ran with no table to work on")]
    MissingTable(Stage),
    #[error("Turn state field already set: {0}")]
    AlreadySet(&'static str),
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),
}

impl From<WorkflowError> for QuerygateError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::InvalidRequest(msg) => QuerygateError::InvalidRequest(msg),
            WorkflowError::UnknownRole(role) => QuerygateError::UnknownRole(role),
            other => QuerygateError::Workflow(other.to_string()),
        }
    }
}
