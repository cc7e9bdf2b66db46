//! Integration tests for the HTTP API.
//!
//! Each test builds its own in-memory database, engine and history store and
//! drives the router with `oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use querygate_access::{AccessValidator, PolicyStore};
use querygate_api::handlers::{ClearResponse, HealthResponse};
use querygate_api::{create_router, AppState};
use querygate_core::QuerygateConfig;
use querygate_history::{HistoryPolicy, HistoryStore};
use querygate_storage::{seed, Database, SqliteExecutor};
use querygate_workflow::{Collaborators, EngineSettings, WorkflowEngine};

// =============================================================================
// Helpers
// =============================================================================

fn make_state() -> AppState {
    let config = QuerygateConfig::default();
    let db = Database::in_memory().unwrap();
    db.with_conn(|conn| seed::seed_sample_data(conn).map(|_| ()))
        .unwrap();
    let executor = Arc::new(SqliteExecutor::new(Arc::new(db), config.database.max_rows));
    let validator = Arc::new(AccessValidator::new(Arc::new(PolicyStore::builtin())));
    let history = Arc::new(HistoryStore::new(HistoryPolicy::from(&config.history)));
    let engine = WorkflowEngine::new(
        validator,
        history,
        Collaborators::heuristic(executor.clone()),
        EngineSettings::from_config(&config),
    );
    AppState::new(config, engine, executor)
}

fn make_app() -> axum::Router {
    create_router(make_state())
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

fn chat(user: &str, role: &str, query: &str) -> Request<Body> {
    let body = serde_json::json!({ "user_id": user, "role": role, "query": query });
    post_json("/chat", &body.to_string())
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Health and policy
// =============================================================================

#[tokio::test]
async fn test_health_happy_path() {
    let resp = make_app().oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let health: HealthResponse = serde_json::from_value(body_json(resp).await).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.active_users, 0);
    assert_eq!(health.history_entries, 0);
}

#[tokio::test]
async fn test_roles_lists_every_role() {
    let resp = make_app().oneshot(get("/roles")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    let roles: Vec<&str> = json["roles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["viewer", "readonly", "analyst", "admin"]);
}

#[tokio::test]
async fn test_tables_scoped_to_role() {
    let resp = make_app().oneshot(get("/tables?role=viewer")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    let mut names: Vec<&str> = json["tables"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["orders", "users"]);

    let users = json["tables"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "users")
        .unwrap();
    let cols: Vec<&str> = users["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(cols, vec!["id", "name", "email"]);
}

#[tokio::test]
async fn test_tables_requires_known_role() {
    let resp = make_app().oneshot(get("/tables")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = make_app().oneshot(get("/tables?role=guest")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["error"], "unknown_role");
}

// =============================================================================
// Chat
// =============================================================================

#[tokio::test]
async fn test_chat_viewer_lists_users() {
    let resp = make_app()
        .oneshot(chat("alice", "viewer", "show me all users"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["complete"], true);
    assert_eq!(json["data"]["table"]["headers"], serde_json::json!(["id", "name", "email"]));
    assert_eq!(json["data"]["table"]["row_count"], 8);
    assert_eq!(json["history"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_chat_denial_is_polite() {
    let resp = make_app()
        .oneshot(chat("alice", "viewer", "show me all products"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    let message = json["message"].as_str().unwrap();
    assert!(message.starts_with("I don't have permission"));
    assert!(!message.contains("SELECT"));
    assert!(json.get("data").is_none());
    assert_eq!(json["stages"], serde_json::json!(["router", "simple_responder", "unauthorized"]));
}

#[tokio::test]
async fn test_chat_chart_payload() {
    let resp = make_app()
        .oneshot(chat("bob", "analyst", "show me a bar chart of sales by month"))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["data"]["chart"]["type"], "bar");
    assert_eq!(json["data"]["table"]["row_count"], 6);
}

#[tokio::test]
async fn test_chat_casual() {
    let resp = make_app()
        .oneshot(chat("carol", "readonly", "hello, how are you"))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["stages"], serde_json::json!(["router"]));
    assert!(json.get("data").is_none());
}

#[tokio::test]
async fn test_chat_unknown_role_rejected() {
    let resp = make_app()
        .oneshot(chat("alice", "superuser", "show me all users"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["error"], "unknown_role");
    assert!(json["message"].as_str().unwrap().contains("superuser"));
}

#[tokio::test]
async fn test_chat_empty_query_rejected() {
    let resp = make_app().oneshot(chat("alice", "viewer", "  ")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "bad_request");
}

#[tokio::test]
async fn test_chat_missing_field_rejected() {
    let resp = make_app()
        .oneshot(post_json("/chat", r#"{"user_id":"alice","query":"hi"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(resp).await["error"], "unprocessable_entity");
}

// =============================================================================
// History
// =============================================================================

#[tokio::test]
async fn test_history_roundtrip_through_chat() {
    let app = make_app();
    for query in ["hello", "show me all users", "thanks"] {
        let resp = app
            .clone()
            .oneshot(chat("dave", "viewer", query))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app
        .clone()
        .oneshot(get("/history/dave?limit=2&context=true"))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["total"], 3);
    let entries = json["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["user_query"], "show me all users");
    assert_eq!(entries[1]["user_query"], "thanks");
    assert!(json["context"]
        .as_str()
        .unwrap()
        .starts_with("Previous conversation context:"));

    let resp = app.clone().oneshot(get("/stats")).await.unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["user_count"], 1);
    assert_eq!(json["users"][0]["total_turns"], 3);

    let resp = app.clone().oneshot(get("/history/dave/export")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let exported = body_json(resp).await;
    assert_eq!(exported.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_clear_is_idempotent() {
    let app = make_app();
    app.clone()
        .oneshot(chat("erin", "viewer", "hello"))
        .await
        .unwrap();

    let delete = || {
        Request::delete("/history/erin")
            .body(Body::empty())
            .unwrap()
    };
    let resp = app.clone().oneshot(delete()).await.unwrap();
    let cleared: ClearResponse = serde_json::from_value(body_json(resp).await).unwrap();
    assert!(cleared.cleared);

    let resp = app.clone().oneshot(delete()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cleared: ClearResponse = serde_json::from_value(body_json(resp).await).unwrap();
    assert!(!cleared.cleared);

    let resp = app.clone().oneshot(get("/history/erin")).await.unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["total"], 0);
}

#[tokio::test]
async fn test_export_unknown_user_not_found() {
    let resp = make_app().oneshot(get("/history/nobody/export")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["error"], "not_found");
}
