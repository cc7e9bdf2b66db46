//! Workflow engine: drives one turn through the stage graph.
//!
//! A turn is prepared from a caller request, run stage by stage against a
//! single `&mut TurnState`, and recorded in the history store once it
//! reaches `end`. Stage failures never escape [`WorkflowEngine::process`];
//! only request validation errors do.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use querygate_access::{AccessDecision, AccessValidator};
use querygate_core::config::QuerygateConfig;
use querygate_core::{
    ChartSpecGenerator, Classifier, CollaboratorError, Composition, QueryComplexity,
    ResponseComposer, ResultExecutor, ResultPayload, Role, SchemaContext, StatementCorrector,
    StatementGenerator,
};
use querygate_history::{HistoryEntry, HistoryStore};

use crate::error::WorkflowError;
use crate::heuristics::{
    FenceCorrector, HeuristicChartGenerator, KeywordClassifier, SchemaStatementGenerator,
    TemplateComposer,
};
use crate::messages::{denial_message, APOLOGY, CASUAL_FALLBACK, GENERIC_FAILURE};
use crate::router::{mentions_visualization, Router};
use crate::stage::{next_stage, Signal, Stage};
use crate::state::TurnState;

/// The external collaborators a turn delegates to.
#[derive(Clone)]
pub struct Collaborators {
    pub classifier: Arc<dyn Classifier>,
    pub generator: Arc<dyn StatementGenerator>,
    pub corrector: Option<Arc<dyn StatementCorrector>>,
    pub executor: Arc<dyn ResultExecutor>,
    pub charts: Arc<dyn ChartSpecGenerator>,
    pub composer: Arc<dyn ResponseComposer>,
}

impl Collaborators {
    /// Built-in heuristic collaborators around the given executor.
    pub fn heuristic(executor: Arc<dyn ResultExecutor>) -> Self {
        Self {
            classifier: Arc::new(KeywordClassifier::new()),
            generator: Arc::new(SchemaStatementGenerator),
            corrector: Some(Arc::new(FenceCorrector)),
            executor,
            charts: Arc::new(HeuristicChartGenerator),
            composer: Arc::new(TemplateComposer),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub max_query_length: usize,
    /// Prior turns handed to the composer.
    pub composer_context_turns: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&QuerygateConfig::default())
    }
}

impl EngineSettings {
    pub fn from_config(config: &QuerygateConfig) -> Self {
        Self {
            max_query_length: config.workflow.max_query_length,
            composer_context_turns: config.history.composer_context_turns,
        }
    }
}

/// Caller input for one turn.
#[derive(Debug, Clone, Deserialize)]
pub struct TurnRequest {
    pub user_id: String,
    pub role: String,
    pub query: String,
    #[serde(default)]
    pub context: Option<Map<String, Value>>,
}

impl TurnRequest {
    pub fn new(user_id: &str, role: &str, query: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            role: role.to_string(),
            query: query.to_string(),
            context: None,
        }
    }
}

/// Caller output for one turn. Never carries statement text.
#[derive(Debug, Clone, Serialize)]
pub struct TurnResponse {
    pub turn_id: Uuid,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResultPayload>,
    pub history: Vec<HistoryEntry>,
    pub stages: Vec<Stage>,
    pub complete: bool,
}

pub struct WorkflowEngine {
    router: Router,
    validator: Arc<AccessValidator>,
    history: Arc<HistoryStore>,
    collaborators: Collaborators,
    settings: EngineSettings,
}

impl WorkflowEngine {
    pub fn new(
        validator: Arc<AccessValidator>,
        history: Arc<HistoryStore>,
        collaborators: Collaborators,
        settings: EngineSettings,
    ) -> Self {
        Self {
            router: Router::new(collaborators.classifier.clone()),
            validator,
            history,
            collaborators,
            settings,
        }
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    pub fn validator(&self) -> &Arc<AccessValidator> {
        &self.validator
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    /// Run a full turn and record it in history.
    pub async fn process(&self, request: TurnRequest) -> Result<TurnResponse, WorkflowError> {
        let mut state = self.prepare(request)?;
        info!(
            turn_id = %state.turn_id(),
            user_id = %state.user_id(),
            role = %state.role(),
            "Turn started"
        );

        self.run(&mut state).await;

        let message = state.response_text().unwrap_or(GENERIC_FAILURE).to_string();
        let data = Some(state.payload().clone()).filter(|p| !p.is_empty());
        self.history
            .append(state.user_id(), state.query(), &message, data.clone());

        info!(
            turn_id = %state.turn_id(),
            stages = ?state.visited,
            has_data = data.is_some(),
            "Turn complete"
        );
        Ok(TurnResponse {
            turn_id: state.turn_id(),
            message,
            data,
            history: self.history.all(state.user_id()),
            stages: state.visited.clone(),
            complete: state.complete,
        })
    }

    /// Validate caller input and seed the turn state.
    pub fn prepare(&self, request: TurnRequest) -> Result<TurnState, WorkflowError> {
        let user_id = request.user_id.trim();
        if user_id.is_empty() {
            return Err(WorkflowError::InvalidRequest("user_id is required".into()));
        }
        let query = request.query.trim();
        if query.is_empty() {
            return Err(WorkflowError::InvalidRequest("query is required".into()));
        }
        if query.chars().count() > self.settings.max_query_length {
            return Err(WorkflowError::InvalidRequest(format!(
                "query exceeds {} characters",
                self.settings.max_query_length
            )));
        }
        let role = self
            .validator
            .policies()
            .lookup_name(&request.role)
            .map_err(|_| WorkflowError::UnknownRole(request.role.clone()))?
            .role;

        Ok(TurnState::new(
            user_id,
            role,
            query,
            request.context.unwrap_or_default(),
        ))
    }

    /// Drive the state to `end`. Always leaves `complete` set and a response
    /// in place.
    pub async fn run(&self, state: &mut TurnState) {
        while !state.complete {
            let stage = state.next_stage;
            if stage.is_terminal() {
                state.ensure_response(GENERIC_FAILURE);
                state.complete = true;
                break;
            }
            if state.visited.contains(&stage) {
                error!(turn_id = %state.turn_id(), stage = %stage, "Stage revisited, ending turn");
                finish(state, GENERIC_FAILURE);
                break;
            }
            state.visited.push(stage);
            debug!(turn_id = %state.turn_id(), stage = %stage, "Running stage");

            let outcome = match stage {
                Stage::Router => self.route(state).await,
                Stage::SimpleResponder => self.respond(state, QueryComplexity::Simple).await,
                Stage::ComplexResponder => self.respond(state, QueryComplexity::Complex).await,
                Stage::Visualizer => self.visualize(state).await,
                Stage::Summarizer => self.summarize(state).await,
                Stage::Unauthorized => self.unauthorized(state),
                Stage::End => Ok(Signal::Proceed),
            };

            match outcome.and_then(|signal| next_stage(stage, signal)) {
                Ok(next) => {
                    debug!(turn_id = %state.turn_id(), from = %stage, to = %next, "Stage transition");
                    state.next_stage = next;
                    if next.is_terminal() {
                        state.ensure_response(GENERIC_FAILURE);
                        state.complete = true;
                    }
                }
                Err(err) => {
                    error!(
                        turn_id = %state.turn_id(),
                        stage = %stage,
                        error = %err,
                        "Stage failed"
                    );
                    match stage.on_failure() {
                        Some(fallback) if !state.visited.contains(&fallback) => {
                            state.failure = Some(err.to_string());
                            state.next_stage = fallback;
                        }
                        _ => finish(state, GENERIC_FAILURE),
                    }
                }
            }
        }
    }

    // =========================================================================
    // Stages
    // =========================================================================

    async fn route(&self, state: &mut TurnState) -> Result<Signal, WorkflowError> {
        let decision = self.router.classify(state).await?;
        state.needs_visualization = decision.needs_visualization;

        match decision.signal {
            Signal::Casual => {
                let history = self
                    .history
                    .recent_turns(state.user_id(), self.settings.composer_context_turns);
                let reply = match self
                    .collaborators
                    .composer
                    .converse(state.query(), &history)
                    .await
                {
                    Ok(text) if !text.trim().is_empty() => text,
                    Ok(_) => CASUAL_FALLBACK.to_string(),
                    Err(err) => {
                        warn!(turn_id = %state.turn_id(), error = %err, "Conversational reply failed");
                        CASUAL_FALLBACK.to_string()
                    }
                };
                state.set_response(reply)?;
            }
            Signal::Restricted => {
                warn!(
                    turn_id = %state.turn_id(),
                    user_id = %state.user_id(),
                    role = %state.role(),
                    query = %state.query(),
                    "Restricted request refused at routing"
                );
            }
            _ => {}
        }

        info!(
            turn_id = %state.turn_id(),
            label = %decision.label,
            needs_visualization = decision.needs_visualization,
            "Query routed"
        );
        Ok(decision.signal)
    }

    async fn respond(
        &self,
        state: &mut TurnState,
        complexity: QueryComplexity,
    ) -> Result<Signal, WorkflowError> {
        let schema = self.role_schema(state.role()).await?;
        let generated = self
            .collaborators
            .generator
            .generate(state.query(), state.role(), &schema, complexity)
            .await?;
        if generated.trim().is_empty() {
            return Err(CollaboratorError::Empty("statement generator").into());
        }

        let statement = self.correct(state, generated).await;
        state.proposed_statement = Some(statement.clone());

        if let AccessDecision::Deny(reason) = self.validator.validate_role(state.role(), &statement)
        {
            warn!(
                turn_id = %state.turn_id(),
                user_id = %state.user_id(),
                role = %state.role(),
                query = %state.query(),
                reason = %reason,
                "Proposed statement denied"
            );
            state.deny_reason = Some(reason);
            return Ok(Signal::Denied);
        }

        let table = self
            .collaborators
            .executor
            .execute(&statement, state.role())
            .await?;
        debug!(turn_id = %state.turn_id(), rows = table.row_count, "Results retrieved");
        state.attach_table(table)?;

        if state.wants_visualization() || mentions_visualization(state.query()) {
            Ok(Signal::Visualize)
        } else {
            Ok(Signal::Proceed)
        }
    }

    async fn visualize(&self, state: &mut TurnState) -> Result<Signal, WorkflowError> {
        let table = state
            .table()
            .ok_or(WorkflowError::MissingTable(Stage::Visualizer))?;
        let chart = self
            .collaborators
            .charts
            .generate(table, state.query())
            .await?;
        match chart {
            Some(chart) => {
                debug!(turn_id = %state.turn_id(), chart_type = %chart.chart_type, "Chart attached");
                state.attach_chart(chart)?;
            }
            None => debug!(turn_id = %state.turn_id(), "No chart for this result"),
        }
        Ok(Signal::Proceed)
    }

    async fn summarize(&self, state: &mut TurnState) -> Result<Signal, WorkflowError> {
        if state.failure.is_some() {
            state.set_response(APOLOGY)?;
            return Ok(Signal::Proceed);
        }

        let history = self
            .history
            .recent_turns(state.user_id(), self.settings.composer_context_turns);
        let composition = Composition {
            query: state.query(),
            table: state.payload().table.as_ref(),
            chart: state.payload().chart.as_ref(),
            history: &history,
        };
        let text = match self.collaborators.composer.compose(composition).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(turn_id = %state.turn_id(), "Composer returned nothing");
                APOLOGY.to_string()
            }
            Err(err) => {
                error!(turn_id = %state.turn_id(), error = %err, "Composer failed");
                APOLOGY.to_string()
            }
        };
        state.set_response(text)?;
        Ok(Signal::Proceed)
    }

    fn unauthorized(&self, state: &mut TurnState) -> Result<Signal, WorkflowError> {
        state.set_response(denial_message(state.role()))?;
        Ok(Signal::Proceed)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn role_schema(&self, role: Role) -> Result<SchemaContext, WorkflowError> {
        let full = self.collaborators.executor.schema().await?;
        let entry = self
            .validator
            .policies()
            .lookup(role)
            .ok_or_else(|| WorkflowError::UnknownRole(role.to_string()))?;
        Ok(entry.scoped_schema(&full))
    }

    /// Single-shot correction. Any corrector failure keeps the original.
    async fn correct(&self, state: &TurnState, statement: String) -> String {
        let Some(corrector) = &self.collaborators.corrector else {
            return statement;
        };
        match corrector.correct(&statement).await {
            Ok(Some(fixed)) if !fixed.trim().is_empty() => {
                debug!(turn_id = %state.turn_id(), "Statement corrected");
                fixed
            }
            Ok(_) => statement,
            Err(err) => {
                warn!(turn_id = %state.turn_id(), error = %err, "Statement correction failed");
                statement
            }
        }
    }
}

fn finish(state: &mut TurnState, fallback: &str) {
    state.ensure_response(fallback);
    state.next_stage = Stage::End;
    state.complete = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use querygate_access::{DenyReason, PolicyStore};
    use querygate_core::{ChartType, TableResult};
    use querygate_storage::{Database, SqliteExecutor};

    /// Counts every data-store call before delegating.
    struct CountingExecutor {
        inner: SqliteExecutor,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ResultExecutor for CountingExecutor {
        async fn execute(&self, statement: &str, role: Role) -> Result<TableResult, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.execute(statement, role).await
        }

        async fn schema(&self) -> Result<SchemaContext, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.schema().await
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl StatementGenerator for FailingGenerator {
        async fn generate(
            &self,
            _query: &str,
            _role: Role,
            _schema: &SchemaContext,
            _complexity: QueryComplexity,
        ) -> Result<String, CollaboratorError> {
            Err(CollaboratorError::failed("statement generator", "model timed out"))
        }
    }

    struct FixedGenerator(&'static str);

    #[async_trait]
    impl StatementGenerator for FixedGenerator {
        async fn generate(
            &self,
            _query: &str,
            _role: Role,
            _schema: &SchemaContext,
            _complexity: QueryComplexity,
        ) -> Result<String, CollaboratorError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingClassifier;

    #[async_trait]
    impl Classifier for FailingClassifier {
        async fn classify(&self, _query: &str) -> Result<String, CollaboratorError> {
            Err(CollaboratorError::Unavailable("classifier"))
        }
    }

    struct FailingComposer;

    #[async_trait]
    impl ResponseComposer for FailingComposer {
        async fn compose(&self, _c: Composition<'_>) -> Result<String, CollaboratorError> {
            Err(CollaboratorError::Empty("response composer"))
        }

        async fn converse(
            &self,
            _query: &str,
            _history: &[querygate_core::ConversationTurn],
        ) -> Result<String, CollaboratorError> {
            Err(CollaboratorError::Unavailable("response composer"))
        }
    }

    fn counting_executor() -> Arc<CountingExecutor> {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| querygate_storage::seed::seed_sample_data(conn).map(|_| ()))
            .unwrap();
        Arc::new(CountingExecutor {
            inner: SqliteExecutor::new(Arc::new(db), 1000),
            calls: AtomicUsize::new(0),
        })
    }

    fn engine_with(collaborators: Collaborators) -> WorkflowEngine {
        let validator = Arc::new(AccessValidator::new(Arc::new(PolicyStore::builtin())));
        WorkflowEngine::new(
            validator,
            Arc::new(HistoryStore::default()),
            collaborators,
            EngineSettings::default(),
        )
    }

    fn engine() -> (WorkflowEngine, Arc<CountingExecutor>) {
        let executor = counting_executor();
        let engine = engine_with(Collaborators::heuristic(executor.clone()));
        (engine, executor)
    }

    // =========================================================================
    // Request validation
    // =========================================================================

    #[test]
    fn test_prepare_rejects_bad_input() {
        let (engine, _) = engine();
        assert!(matches!(
            engine.prepare(TurnRequest::new("", "viewer", "hi")),
            Err(WorkflowError::InvalidRequest(_))
        ));
        assert!(matches!(
            engine.prepare(TurnRequest::new("u1", "viewer", "   ")),
            Err(WorkflowError::InvalidRequest(_))
        ));
        assert!(matches!(
            engine.prepare(TurnRequest::new("u1", "guest", "hi")),
            Err(WorkflowError::UnknownRole(_))
        ));
        let long = "x".repeat(EngineSettings::default().max_query_length + 1);
        assert!(matches!(
            engine.prepare(TurnRequest::new("u1", "viewer", &long)),
            Err(WorkflowError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_prepare_normalizes_role() {
        let (engine, _) = engine();
        let state = engine
            .prepare(TurnRequest::new(" u1 ", "Analyst", " total sales "))
            .unwrap();
        assert_eq!(state.role(), Role::Analyst);
        assert_eq!(state.user_id(), "u1");
        assert_eq!(state.query(), "total sales");
    }

    // =========================================================================
    // End-to-end scenarios
    // =========================================================================

    #[tokio::test]
    async fn test_viewer_lists_users_with_permitted_columns() {
        let (engine, _) = engine();
        let mut state = engine
            .prepare(TurnRequest::new("u1", "viewer", "show me all users"))
            .unwrap();
        engine.run(&mut state).await;

        assert!(state.complete);
        assert_eq!(
            state.proposed_statement.as_deref(),
            Some("SELECT id, name, email FROM users LIMIT 100")
        );
        assert!(state.deny_reason.is_none());
        assert_eq!(
            state.visited,
            vec![Stage::Router, Stage::SimpleResponder, Stage::Summarizer]
        );
        let table = state.table().unwrap();
        assert_eq!(table.headers, vec!["id", "name", "email"]);
        assert_eq!(table.row_count, 8);
        assert!(state.response_text().unwrap().starts_with("I found 8 records."));
    }

    #[tokio::test]
    async fn test_viewer_denied_table_outside_policy() {
        let (engine, executor) = engine();
        let mut state = engine
            .prepare(TurnRequest::new("u1", "viewer", "show me all products"))
            .unwrap();
        engine.run(&mut state).await;

        assert_eq!(
            state.deny_reason,
            Some(DenyReason::TableNotPermitted {
                role: Role::Viewer,
                table: "products".into()
            })
        );
        assert_eq!(
            state.visited,
            vec![Stage::Router, Stage::SimpleResponder, Stage::Unauthorized]
        );
        assert!(state.complete);
        assert!(state.payload().is_empty());
        let message = state.response_text().unwrap();
        assert_eq!(message, denial_message(Role::Viewer));
        assert!(!message.contains("SELECT"));
        // Only the schema lookup reached the data store.
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_chart_request_runs_visualizer_before_summarizer() {
        let (engine, _) = engine();
        let response = engine
            .process(TurnRequest::new(
                "u1",
                "analyst",
                "show me a bar chart of sales by month",
            ))
            .await
            .unwrap();

        assert!(response.complete);
        assert_eq!(
            response.stages,
            vec![
                Stage::Router,
                Stage::ComplexResponder,
                Stage::Visualizer,
                Stage::Summarizer
            ]
        );
        let data = response.data.unwrap();
        let table = data.table.unwrap();
        assert_eq!(table.headers, vec!["month", "total_amount"]);
        assert_eq!(table.row_count, 6);
        let chart = data.chart.unwrap();
        assert_eq!(chart.chart_type, ChartType::Bar);
        assert_eq!(chart.x.len(), 6);
        assert!(response.message.contains("bar chart"));
    }

    #[tokio::test]
    async fn test_casual_query_never_touches_data_store() {
        let (engine, executor) = engine();
        let response = engine
            .process(TurnRequest::new("u1", "viewer", "hello, how are you"))
            .await
            .unwrap();

        assert!(response.complete);
        assert_eq!(response.stages, vec![Stage::Router]);
        assert!(response.message.starts_with("I'm doing well"));
        assert!(response.data.is_none());
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generator_failure_yields_apology() {
        let executor = counting_executor();
        let mut collaborators = Collaborators::heuristic(executor);
        collaborators.generator = Arc::new(FailingGenerator);
        let engine = engine_with(collaborators);

        let response = engine
            .process(TurnRequest::new("u1", "analyst", "total sales by region"))
            .await
            .unwrap();

        assert!(response.complete);
        assert_eq!(response.message, APOLOGY);
        assert_eq!(
            response.stages,
            vec![Stage::Router, Stage::ComplexResponder, Stage::Summarizer]
        );
        assert!(response.data.is_none());
    }

    // =========================================================================
    // Failure handling
    // =========================================================================

    #[tokio::test]
    async fn test_classifier_failure_gives_generic_message() {
        let mut collaborators = Collaborators::heuristic(counting_executor());
        collaborators.classifier = Arc::new(FailingClassifier);
        let engine = engine_with(collaborators);

        let response = engine
            .process(TurnRequest::new("u1", "viewer", "show me all users"))
            .await
            .unwrap();
        assert!(response.complete);
        assert_eq!(response.message, GENERIC_FAILURE);
        assert_eq!(response.stages, vec![Stage::Router]);
    }

    #[tokio::test]
    async fn test_composer_failure_falls_back() {
        let mut collaborators = Collaborators::heuristic(counting_executor());
        collaborators.composer = Arc::new(FailingComposer);
        let engine = engine_with(collaborators);

        let casual = engine
            .process(TurnRequest::new("u1", "viewer", "hello"))
            .await
            .unwrap();
        assert_eq!(casual.message, CASUAL_FALLBACK);

        let data = engine
            .process(TurnRequest::new("u1", "viewer", "show me all users"))
            .await
            .unwrap();
        assert_eq!(data.message, APOLOGY);
        assert!(data.data.is_some());
    }

    #[tokio::test]
    async fn test_restricted_label_goes_to_unauthorized() {
        let (engine, executor) = engine();
        let response = engine
            .process(TurnRequest::new("u1", "analyst", "show me user passwords"))
            .await
            .unwrap();
        assert_eq!(response.stages, vec![Stage::Router, Stage::Unauthorized]);
        assert_eq!(response.message, denial_message(Role::Analyst));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_hidden_column_is_denied() {
        let mut collaborators = Collaborators::heuristic(counting_executor());
        collaborators.generator = Arc::new(FixedGenerator("SELECT name, city FROM users"));
        let engine = engine_with(collaborators);

        let mut state = engine
            .prepare(TurnRequest::new("u1", "viewer", "where do users live"))
            .unwrap();
        engine.run(&mut state).await;
        assert_eq!(
            state.deny_reason,
            Some(DenyReason::ColumnNotPermitted {
                table: "users".into(),
                column: "city".into()
            })
        );
        assert_eq!(state.next_stage, Stage::End);
    }

    #[tokio::test]
    async fn test_corrector_runs_before_validation() {
        let mut collaborators = Collaborators::heuristic(counting_executor());
        collaborators.generator = Arc::new(FixedGenerator("```sql\nSELECT id, name FROM users;\n```"));
        let engine = engine_with(collaborators);

        let mut state = engine
            .prepare(TurnRequest::new("u1", "viewer", "list users"))
            .unwrap();
        engine.run(&mut state).await;
        assert_eq!(
            state.proposed_statement.as_deref(),
            Some("SELECT id, name FROM users")
        );
        assert!(state.deny_reason.is_none());
        assert_eq!(state.table().unwrap().row_count, 8);
    }

    #[tokio::test]
    async fn test_caller_flag_requests_chart() {
        let (engine, _) = engine();
        let mut request = TurnRequest::new("u1", "analyst", "total sales by region");
        let mut context = Map::new();
        context.insert("needs_visualization".into(), Value::Bool(true));
        request.context = Some(context);

        let response = engine.process(request).await.unwrap();
        assert!(response.stages.contains(&Stage::Visualizer));
        assert!(response.data.unwrap().chart.is_some());
    }

    // =========================================================================
    // History
    // =========================================================================

    #[tokio::test]
    async fn test_every_turn_is_recorded() {
        let (engine, _) = engine();
        engine
            .process(TurnRequest::new("u1", "viewer", "hello"))
            .await
            .unwrap();
        engine
            .process(TurnRequest::new("u1", "viewer", "show me all products"))
            .await
            .unwrap();
        let last = engine
            .process(TurnRequest::new("u1", "viewer", "show me all users"))
            .await
            .unwrap();

        assert_eq!(last.history.len(), 3);
        assert_eq!(last.history[0].user_query, "hello");
        assert_eq!(last.history[2].user_query, "show me all users");
        assert!(last.history[2].data.is_some());
        assert!(engine.history().all("u2").is_empty());
    }

    #[tokio::test]
    async fn test_response_never_leaks_statement() {
        let (engine, _) = engine();
        let response = engine
            .process(TurnRequest::new("u1", "viewer", "show me all products"))
            .await
            .unwrap();
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("SELECT"));
        assert!(!json.contains("Access denied to table"));
    }
}
