use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{QuerygateError, Result};

/// Top-level configuration for the Querygate service.
///
/// Loaded from `querygate.toml` by default. Every section is optional and
/// falls back to its own defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuerygateConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

impl QuerygateConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: QuerygateConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| QuerygateError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values that would break history consolidation or the server.
    pub fn validate(&self) -> Result<()> {
        if self.history.high_water_mark < 2 {
            return Err(QuerygateError::Config(format!(
                "history.high_water_mark must be at least 2, got {}",
                self.history.high_water_mark
            )));
        }
        if self.history.consolidate_percent == 0 || self.history.consolidate_percent >= 100 {
            return Err(QuerygateError::Config(format!(
                "history.consolidate_percent must be between 1 and 99, got {}",
                self.history.consolidate_percent
            )));
        }
        if self.workflow.max_query_length == 0 {
            return Err(QuerygateError::Config(
                "workflow.max_query_length must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted request body, in bytes.
    pub body_limit: usize,
    /// Allowed CORS origins. Empty means localhost and 127.0.0.1 on `port`.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            body_limit: 64 * 1024,
            allowed_origins: Vec::new(),
        }
    }
}

/// Data store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path. `None` keeps the database in memory.
    pub path: Option<String>,
    /// Create and populate the sample schema when tables are missing.
    pub seed_sample_data: bool,
    /// Upper bound on rows returned from a single statement.
    pub max_rows: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            seed_sample_data: true,
            max_rows: 1000,
        }
    }
}

/// Conversation history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Per-user entry count that triggers consolidation.
    pub high_water_mark: usize,
    /// Share of the oldest entries folded into the summary, in percent.
    pub consolidate_percent: u8,
    /// Maximum number of topics recorded on a summary entry.
    pub max_topics: usize,
    /// Default page size for history reads.
    pub default_recent_limit: usize,
    /// Number of recent turns handed to the response composer.
    pub composer_context_turns: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            high_water_mark: 100,
            consolidate_percent: 80,
            max_topics: 5,
            default_recent_limit: 10,
            composer_context_turns: 3,
        }
    }
}

/// Workflow engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Longest query accepted, in characters.
    pub max_query_length: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_query_length: 2000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = QuerygateConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert!(config.database.path.is_none());
        assert!(config.database.seed_sample_data);
        assert_eq!(config.history.high_water_mark, 100);
        assert_eq!(config.history.consolidate_percent, 80);
        assert_eq!(config.history.max_topics, 5);
        assert_eq!(config.workflow.max_query_length, 2000);
    }

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(
            r#"
[general]
log_level = "debug"

[server]
host = "0.0.0.0"
port = 9100
allowed_origins = ["http://localhost:3000"]

[database]
path = "/tmp/querygate.db"
seed_sample_data = false

[history]
high_water_mark = 20
consolidate_percent = 50
"#,
        );
        let config = QuerygateConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.allowed_origins.len(), 1);
        assert_eq!(config.database.path.as_deref(), Some("/tmp/querygate.db"));
        assert!(!config.database.seed_sample_data);
        assert_eq!(config.history.high_water_mark, 20);
        assert_eq!(config.history.consolidate_percent, 50);
        // Unspecified fields keep their defaults.
        assert_eq!(config.history.max_topics, 5);
        assert_eq!(config.database.max_rows, 1000);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = QuerygateConfig::load(file.path()).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.history.default_recent_limit, 10);
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("server = [[[");
        let err = QuerygateConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, QuerygateError::Config(_)));
    }

    #[test]
    fn test_load_rejects_bad_consolidation_percent() {
        let file = create_temp_config("[history]\nconsolidate_percent = 100\n");
        let err = QuerygateConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("consolidate_percent"));
    }

    #[test]
    fn test_load_rejects_tiny_high_water_mark() {
        let file = create_temp_config("[history]\nhigh_water_mark = 1\n");
        assert!(QuerygateConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = QuerygateConfig::load_or_default(Path::new("/nonexistent/querygate.toml"));
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("querygate.toml");

        let mut config = QuerygateConfig::default();
        config.server.port = 8123;
        config.history.max_topics = 3;
        config.save(&path).unwrap();

        let reloaded = QuerygateConfig::load(&path).unwrap();
        assert_eq!(reloaded.server.port, 8123);
        assert_eq!(reloaded.history.max_topics, 3);
    }
}
