//! Turn workflow: routing, stage graph, and the engine that drives it.
//!
//! A turn starts at [`Stage::Router`], passes through at most one responder,
//! optionally the visualizer, and ends via the summarizer, the unauthorized
//! stage, or the casual path. [`WorkflowEngine`] owns the collaborators and
//! the shared history store.

pub mod engine;
pub mod error;
pub mod heuristics;
pub mod messages;
pub mod router;
pub mod stage;
pub mod state;

pub use engine::{Collaborators, EngineSettings, TurnRequest, TurnResponse, WorkflowEngine};
pub use error::WorkflowError;
pub use router::{IntentLabel, RouteDecision, Router};
pub use stage::{next_stage, validate_transition, Signal, Stage};
pub use state::TurnState;
