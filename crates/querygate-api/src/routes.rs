//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, compression,
//! and all endpoint handlers.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use querygate_core::{QuerygateConfig, QuerygateError};

use crate::handlers;
use crate::state::AppState;

/// Origins allowed by CORS: the configured list, or localhost on the
/// configured port when none is given.
fn allowed_origins(config: &QuerygateConfig) -> Vec<HeaderValue> {
    let origins: Vec<String> = if config.server.allowed_origins.is_empty() {
        let port = config.server.port;
        vec![
            format!("http://127.0.0.1:{}", port),
            format!("http://localhost:{}", port),
        ]
    } else {
        config.server.allowed_origins.clone()
    };
    origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins(&state.config)))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);
    let body_limit = state.config.server.body_limit;

    Router::new()
        .route("/health", get(handlers::health))
        .route("/chat", post(handlers::chat))
        .route("/roles", get(handlers::roles))
        .route("/tables", get(handlers::tables))
        .route(
            "/history/{user_id}",
            get(handlers::get_history).delete(handlers::clear_history),
        )
        .route("/history/{user_id}/export", get(handlers::export_history))
        .route("/stats", get(handlers::stats))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured address.
pub async fn start_server(state: AppState) -> Result<(), QuerygateError> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        QuerygateError::Config(format!("Failed to bind {}: {}", addr, e))
    })?;

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_origins_default_to_localhost_on_port() {
        let mut config = QuerygateConfig::default();
        config.server.port = 9100;
        assert_eq!(
            allowed_origins(&config),
            vec![
                HeaderValue::from_static("http://127.0.0.1:9100"),
                HeaderValue::from_static("http://localhost:9100"),
            ]
        );
    }

    #[test]
    fn test_allowed_origins_skip_invalid_entries() {
        let mut config = QuerygateConfig::default();
        config.server.allowed_origins = vec![
            "http://dashboard.local".to_string(),
            "bad\norigin".to_string(),
        ];
        assert_eq!(
            allowed_origins(&config),
            vec![HeaderValue::from_static("http://dashboard.local")]
        );
    }
}
