//! Per-turn state threaded through every stage.

use serde_json::{Map, Value};
use uuid::Uuid;

use querygate_access::DenyReason;
use querygate_core::{ChartSpec, ResultPayload, Role, TableResult};

use crate::error::WorkflowError;
use crate::stage::Stage;

/// Caller metadata key that requests a chart.
pub const VISUALIZATION_FLAG: &str = "needs_visualization";

/// Mutable state of one request. Owned by the engine for the duration of a
/// turn and never persisted.
#[derive(Debug, Clone)]
pub struct TurnState {
    turn_id: Uuid,
    user_id: String,
    role: Role,
    query: String,
    context: Map<String, Value>,
    response_text: Option<String>,
    payload: ResultPayload,

    /// Set by the router when the classifier asked for a chart.
    pub needs_visualization: bool,
    /// Statement proposed by a responder. Never returned to the caller.
    pub proposed_statement: Option<String>,
    /// Why the validator refused the proposed statement.
    pub deny_reason: Option<DenyReason>,
    /// Set when a stage failed and the summarizer should apologize.
    pub failure: Option<String>,
    pub next_stage: Stage,
    pub complete: bool,
    /// Stages run so far, in order.
    pub visited: Vec<Stage>,
}

impl TurnState {
    pub fn new(
        user_id: impl Into<String>,
        role: Role,
        query: impl Into<String>,
        context: Map<String, Value>,
    ) -> Self {
        Self {
            turn_id: Uuid::new_v4(),
            user_id: user_id.into(),
            role,
            query: query.into(),
            context,
            response_text: None,
            payload: ResultPayload::default(),
            needs_visualization: false,
            proposed_statement: None,
            deny_reason: None,
            failure: None,
            next_stage: Stage::Router,
            complete: false,
            visited: Vec::new(),
        }
    }

    pub fn turn_id(&self) -> Uuid {
        self.turn_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// True when the router or the caller asked for a chart.
    pub fn wants_visualization(&self) -> bool {
        self.needs_visualization
            || self
                .context
                .get(VISUALIZATION_FLAG)
                .and_then(Value::as_bool)
                .unwrap_or(false)
    }

    pub fn response_text(&self) -> Option<&str> {
        self.response_text.as_deref()
    }

    /// Set the final response. Only the first call succeeds.
    pub fn set_response(&mut self, text: impl Into<String>) -> Result<(), WorkflowError> {
        if self.response_text.is_some() {
            return Err(WorkflowError::AlreadySet("response_text"));
        }
        self.response_text = Some(text.into());
        Ok(())
    }

    /// Set the response only if no stage has set one yet.
    pub fn ensure_response(&mut self, fallback: &str) {
        if self.response_text.is_none() {
            self.response_text = Some(fallback.to_string());
        }
    }

    pub fn payload(&self) -> &ResultPayload {
        &self.payload
    }

    pub fn table(&self) -> Option<&TableResult> {
        self.payload.table.as_ref()
    }

    pub fn attach_table(&mut self, table: TableResult) -> Result<(), WorkflowError> {
        if self.payload.table.is_some() {
            return Err(WorkflowError::AlreadySet("table"));
        }
        self.payload.table = Some(table);
        Ok(())
    }

    pub fn attach_chart(&mut self, chart: ChartSpec) -> Result<(), WorkflowError> {
        if self.payload.chart.is_some() {
            return Err(WorkflowError::AlreadySet("chart"));
        }
        self.payload.chart = Some(chart);
        Ok(())
    }
}
