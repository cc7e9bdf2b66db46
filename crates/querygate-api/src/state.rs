//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use querygate_access::PolicyStore;
use querygate_core::{QuerygateConfig, ResultExecutor};
use querygate_history::HistoryStore;
use querygate_workflow::WorkflowEngine;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks. The history
/// store is the one the engine records into.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<QuerygateConfig>,
    pub engine: Arc<WorkflowEngine>,
    /// Data store, used directly for schema listings.
    pub executor: Arc<dyn ResultExecutor>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: QuerygateConfig,
        engine: WorkflowEngine,
        executor: Arc<dyn ResultExecutor>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            executor,
            start_time: Instant::now(),
        }
    }

    pub fn history(&self) -> &HistoryStore {
        self.engine.history()
    }

    pub fn policies(&self) -> &PolicyStore {
        self.engine.validator().policies()
    }
}
