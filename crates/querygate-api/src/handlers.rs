//! Route handler functions for all API endpoints.
//!
//! Each handler extracts query/path parameters via axum extractors,
//! interacts with AppState services, and returns JSON responses.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use querygate_access::PolicyEntry;
use querygate_core::SchemaContext;
use querygate_history::{HistoryEntry, UserStats};
use querygate_workflow::{TurnRequest, TurnResponse};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Query parameter types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct TablesParams {
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
    /// Include the plain-text context rendering of the returned turns.
    #[serde(default)]
    pub context: bool,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_users: usize,
    pub history_entries: usize,
}

#[derive(Debug, Serialize)]
pub struct RolesResponse {
    pub roles: Vec<PolicyEntry>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub user_id: String,
    pub entries: Vec<HistoryEntry>,
    /// Buffered entries, before the limit is applied.
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    pub user_id: String,
    pub cleared: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub user_count: usize,
    pub total_entries: usize,
    pub users: Vec<UserStats>,
}

// =============================================================================
// Chat
// =============================================================================

/// POST /chat - run one turn through the workflow.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<TurnRequest>, JsonRejection>,
) -> Result<Json<TurnResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state.engine.process(request).await?;
    Ok(Json(response))
}

// =============================================================================
// Health and policy
// =============================================================================

/// GET /health - liveness and basic counters.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_users: state.history().users().len(),
        history_entries: state.history().total_entries(),
    })
}

/// GET /roles - the policy table.
pub async fn roles(State(state): State<AppState>) -> Json<RolesResponse> {
    Json(RolesResponse {
        roles: state.policies().entries().into_iter().cloned().collect(),
    })
}

/// GET /tables?role= - schema visible to a role.
pub async fn tables(
    State(state): State<AppState>,
    Query(params): Query<TablesParams>,
) -> Result<Json<SchemaContext>, ApiError> {
    let role = params
        .role
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing required parameter: role".into()))?;
    let entry = state
        .policies()
        .lookup_name(&role)
        .map_err(|_| ApiError::UnknownRole(role.clone()))?;
    let full = state
        .executor
        .schema()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(entry.scoped_schema(&full)))
}

// =============================================================================
// History
// =============================================================================

/// GET /history/{user_id}?limit= - most recent entries, oldest first.
pub async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Json<HistoryResponse> {
    let limit = params
        .limit
        .unwrap_or(state.config.history.default_recent_limit);
    let history = state.history();
    let entries = history.recent(&user_id, limit);
    let context = params
        .context
        .then(|| history.context_text(&user_id, limit));
    debug!(user_id = %user_id, limit, returned = entries.len(), "History read");
    Json(HistoryResponse {
        total: history.all(&user_id).len(),
        user_id,
        entries,
        context,
    })
}

/// DELETE /history/{user_id} - idempotent clear.
pub async fn clear_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<ClearResponse> {
    let cleared = state.history().clear(&user_id);
    info!(user_id = %user_id, cleared, "History clear requested");
    Json(ClearResponse { user_id, cleared })
}

/// GET /history/{user_id}/export - full history as a JSON document.
pub async fn export_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.history().stats(&user_id).is_none() {
        return Err(ApiError::NotFound(format!(
            "No history for user: {}",
            user_id
        )));
    }
    let body = state.history().export_json(&user_id)?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}

/// GET /stats - per-user activity summaries.
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let history = state.history();
    let users: Vec<UserStats> = history
        .users()
        .iter()
        .filter_map(|u| history.stats(u))
        .collect();
    Json(StatsResponse {
        user_count: users.len(),
        total_entries: history.total_entries(),
        users,
    })
}
