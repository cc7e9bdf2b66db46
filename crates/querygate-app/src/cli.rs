//! CLI argument definitions for the querygate service.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// querygate: answers natural-language data questions under role-based access control.
#[derive(Parser, Debug)]
#[command(name = "querygate", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// API server bind address.
    #[arg(long = "host")]
    pub host: Option<String>,

    /// SQLite database file. Omit for an in-memory store.
    #[arg(short = 'd', long = "db")]
    pub db: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > QUERYGATE_CONFIG env var > ./querygate.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("QUERYGATE_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("querygate.toml")
    }

    /// Resolve the API server port.
    ///
    /// Priority: --port flag > QUERYGATE_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("QUERYGATE_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        config_port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_parse() {
        let args = CliArgs::try_parse_from([
            "querygate",
            "--port",
            "9000",
            "--db",
            "/tmp/q.db",
            "-l",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.port, Some(9000));
        assert_eq!(args.db, Some(PathBuf::from("/tmp/q.db")));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(args.resolve_port(8000), 9000);
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let args = CliArgs::try_parse_from(["querygate", "-c", "custom.toml"]).unwrap();
        assert_eq!(args.resolve_config_path(), PathBuf::from("custom.toml"));
    }
}
