//! querygate binary: wires configuration, storage, policies, history, the
//! workflow engine and the HTTP server.

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use querygate_access::{AccessValidator, PolicyStore};
use querygate_api::{start_server, AppState};
use querygate_core::QuerygateConfig;
use querygate_history::{HistoryPolicy, HistoryStore};
use querygate_storage::{seed, Database, SqliteExecutor};
use querygate_workflow::{Collaborators, EngineSettings, WorkflowEngine};

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = QuerygateConfig::load_or_default(&config_file);
    config.server.port = args.resolve_port(config.server.port);
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(level) = &args.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(db) = &args.db {
        config.database.path = Some(db.to_string_lossy().to_string());
    }

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting querygate v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    // Storage.
    let db = match &config.database.path {
        Some(path) => {
            let path = PathBuf::from(path);
            let db = Database::new(&path)?;
            tracing::info!(path = %path.display(), "SQLite database opened");
            db
        }
        None => {
            tracing::info!("Using in-memory SQLite database");
            Database::in_memory()?
        }
    };
    if config.database.seed_sample_data {
        let seeded = db.with_conn(seed::seed_sample_data)?;
        tracing::info!(seeded, "Sample data checked");
    }
    let executor = Arc::new(SqliteExecutor::new(Arc::new(db), config.database.max_rows));

    // Policies, history, engine.
    let validator = Arc::new(AccessValidator::new(Arc::new(PolicyStore::builtin())));
    let history = Arc::new(HistoryStore::new(HistoryPolicy::from(&config.history)));
    let engine = WorkflowEngine::new(
        validator,
        history,
        Collaborators::heuristic(executor.clone()),
        EngineSettings::from_config(&config),
    );
    tracing::info!("Workflow engine ready with built-in collaborators");

    let state = AppState::new(config, engine, executor);
    start_server(state).await?;

    Ok(())
}
