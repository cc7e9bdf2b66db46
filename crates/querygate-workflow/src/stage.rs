//! Workflow stages and the transition table.
//!
//! Router -> {SimpleResponder, ComplexResponder, Unauthorized, End}
//! Responders -> {Unauthorized, Visualizer, Summarizer}
//! Visualizer -> Summarizer -> End
//! Unauthorized -> End

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Router,
    SimpleResponder,
    ComplexResponder,
    Visualizer,
    Summarizer,
    Unauthorized,
    End,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::End)
    }

    /// Where a turn goes when this stage fails. `None` means the engine
    /// finishes the turn itself with a generic message.
    pub fn on_failure(&self) -> Option<Stage> {
        match self {
            Stage::SimpleResponder | Stage::ComplexResponder | Stage::Visualizer => {
                Some(Stage::Summarizer)
            }
            Stage::Router | Stage::Summarizer | Stage::Unauthorized | Stage::End => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Router => write!(f, "router"),
            Stage::SimpleResponder => write!(f, "simple_responder"),
            Stage::ComplexResponder => write!(f, "complex_responder"),
            Stage::Visualizer => write!(f, "visualizer"),
            Stage::Summarizer => write!(f, "summarizer"),
            Stage::Unauthorized => write!(f, "unauthorized"),
            Stage::End => write!(f, "end"),
        }
    }
}

/// What a stage reports once it has done its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Casual conversation, answered directly by the router.
    Casual,
    SimpleQuery,
    ComplexQuery,
    Restricted,
    /// The access validator refused the proposed statement.
    Denied,
    /// Results are ready and a chart was requested.
    Visualize,
    Proceed,
}

/// Validate that a stage transition is allowed.
pub fn validate_transition(from: Stage, to: Stage) -> Result<(), WorkflowError> {
    let valid = matches!(
        (from, to),
        (Stage::Router, Stage::End)
            | (Stage::Router, Stage::SimpleResponder)
            | (Stage::Router, Stage::ComplexResponder)
            | (Stage::Router, Stage::Unauthorized)
            | (Stage::SimpleResponder, Stage::Unauthorized)
            | (Stage::SimpleResponder, Stage::Visualizer)
            | (Stage::SimpleResponder, Stage::Summarizer)
            | (Stage::ComplexResponder, Stage::Unauthorized)
            | (Stage::ComplexResponder, Stage::Visualizer)
            | (Stage::ComplexResponder, Stage::Summarizer)
            | (Stage::Visualizer, Stage::Summarizer)
            | (Stage::Summarizer, Stage::End)
            | (Stage::Unauthorized, Stage::End)
    );

    if valid {
        Ok(())
    } else {
        Err(WorkflowError::InvalidTransition(from, to))
    }
}

/// Next stage for a signal raised by `from`. Defined for every pair; pairs
/// outside the table are errors rather than panics.
pub fn next_stage(from: Stage, signal: Signal) -> Result<Stage, WorkflowError> {
    use Signal::*;
    use Stage::*;

    let to = match (from, signal) {
        (Router, Casual) => End,
        (Router, SimpleQuery) => SimpleResponder,
        (Router, ComplexQuery) => ComplexResponder,
        (Router, Restricted) => Unauthorized,
        (SimpleResponder | ComplexResponder, Denied) => Unauthorized,
        (SimpleResponder | ComplexResponder, Visualize) => Visualizer,
        (SimpleResponder | ComplexResponder, Proceed) => Summarizer,
        (Visualizer, Proceed) => Summarizer,
        (Summarizer | Unauthorized, Proceed) => End,
        (stage, signal) => return Err(WorkflowError::UnexpectedSignal(stage, signal)),
    };
    validate_transition(from, to)?;
    Ok(to)
}
