//! Bootstrap configuration for trackgraph-server
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables (handled by clap's `env` attributes)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! The TOML file itself is located by `--config`, then `TRACKGRAPH_CONFIG`,
//! then the platform config directory (`~/.config/trackgraph/config.toml` on
//! Linux). A missing file is not an error unless it was named explicitly:
//! the service logs a warning and starts with defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};
use trackgraph_core::{GraphConfig, Principal, QueryBudget};

use crate::error::{Error, Result};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "TRACKGRAPH_CONFIG";

/// Configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Identity allowed to remove tracks
    #[serde(default)]
    pub owner: Option<String>,

    /// SQLite snapshot file (snapshots disabled when absent)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Seconds between periodic snapshots (0 = only on shutdown)
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval_secs: u64,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub recommendations: RecommendationConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Recommendation query limits
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationConfig {
    /// Maximum edge inspections per query
    #[serde(default)]
    pub max_steps: Option<u64>,

    /// Maximum milliseconds spent discovering candidates per query
    #[serde(default)]
    pub max_millis: Option<u64>,

    /// Events buffered per SSE subscriber
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_port() -> u16 {
    5760
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_snapshot_interval() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_event_capacity() -> usize {
    trackgraph_core::graph::DEFAULT_EVENT_CAPACITY
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            owner: None,
            database_path: None,
            snapshot_interval_secs: default_snapshot_interval(),
            logging: LoggingConfig::default(),
            recommendations: RecommendationConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            max_steps: None,
            max_millis: None,
            event_capacity: default_event_capacity(),
        }
    }
}

impl RecommendationConfig {
    pub fn budget(&self) -> QueryBudget {
        QueryBudget {
            max_steps: self.max_steps,
            max_duration: self.max_millis.map(Duration::from_millis),
        }
    }
}

impl TomlConfig {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        let config = Self::parse(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Locate the config file: CLI argument, then environment, then the
/// platform default (only if it exists)
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|path| path.exists())
}

/// Platform config location, e.g. `~/.config/trackgraph/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("trackgraph").join("config.toml"))
}

/// Load the TOML layer
///
/// An explicitly named file (CLI or environment) must exist; without one the
/// compiled defaults are used.
pub fn load_toml_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) => TomlConfig::load(&path),
        None => {
            warn!("No configuration file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub owner: Option<String>,
    pub database_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub owner: Principal,
    pub database_path: Option<PathBuf>,
    pub snapshot_interval: Option<Duration>,
    pub log_level: String,
    pub budget: QueryBudget,
    pub event_capacity: usize,
}

impl ServerConfig {
    /// Merge overrides over the TOML layer; an owner identity is mandatory
    pub fn resolve(cli: CliOverrides, toml: TomlConfig) -> Result<Self> {
        let owner = cli
            .owner
            .or(toml.owner)
            .filter(|owner| !owner.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "No owner identity configured (set --owner, TRACKGRAPH_OWNER, or `owner` in the config file)"
                        .to_string(),
                )
            })?;

        let snapshot_interval = match toml.snapshot_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            bind_address: cli.bind_address.unwrap_or(toml.bind_address),
            port: cli.port.unwrap_or(toml.port),
            owner: Principal::new(owner),
            database_path: cli.database_path.or(toml.database_path),
            snapshot_interval,
            log_level: cli.log_level.unwrap_or(toml.logging.level),
            budget: toml.recommendations.budget(),
            event_capacity: toml.recommendations.event_capacity,
        })
    }

    pub fn graph_config(&self) -> GraphConfig {
        GraphConfig {
            owner: self.owner.clone(),
            default_budget: self.budget,
            event_capacity: self.event_capacity,
        }
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TomlConfig::parse("").unwrap();
        assert_eq!(config.port, 5760);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.snapshot_interval_secs, 60);
        assert_eq!(config.logging.level, "info");
        assert!(config.owner.is_none());
        assert!(config.database_path.is_none());
        assert_eq!(config.recommendations.budget(), QueryBudget::unbounded());
    }

    #[test]
    fn test_full_toml() {
        let config = TomlConfig::parse(
            r#"
            port = 6000
            bind_address = "0.0.0.0"
            owner = "0xowner"
            database_path = "/var/lib/trackgraph/graph.db"
            snapshot_interval_secs = 0

            [logging]
            level = "debug"

            [recommendations]
            max_steps = 5000
            max_millis = 250
            event_capacity = 64
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 6000);
        assert_eq!(config.owner.as_deref(), Some("0xowner"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.recommendations.budget(),
            QueryBudget::unbounded()
                .with_max_steps(5000)
                .with_max_duration(Duration::from_millis(250))
        );
        assert_eq!(config.recommendations.event_capacity, 64);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = TomlConfig::parse("port = \"not a number\"");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_cli_overrides_toml() {
        let toml = TomlConfig {
            owner: Some("toml-owner".to_string()),
            port: 7000,
            ..TomlConfig::default()
        };
        let cli = CliOverrides {
            owner: Some("cli-owner".to_string()),
            log_level: Some("trace".to_string()),
            ..CliOverrides::default()
        };

        let config = ServerConfig::resolve(cli, toml).unwrap();

        assert_eq!(config.owner.as_str(), "cli-owner");
        assert_eq!(config.port, 7000);
        assert_eq!(config.log_level, "trace");
        assert_eq!(config.listen_address(), "127.0.0.1:7000");
        assert_eq!(config.snapshot_interval, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_missing_owner_rejected() {
        let result = ServerConfig::resolve(CliOverrides::default(), TomlConfig::default());
        assert!(matches!(result, Err(Error::Config(_))));

        let blank = CliOverrides {
            owner: Some("  ".to_string()),
            ..CliOverrides::default()
        };
        assert!(ServerConfig::resolve(blank, TomlConfig::default()).is_err());
    }

    #[test]
    fn test_zero_interval_disables_periodic_snapshots() {
        let toml = TomlConfig {
            owner: Some("o".to_string()),
            snapshot_interval_secs: 0,
            ..TomlConfig::default()
        };
        let config = ServerConfig::resolve(CliOverrides::default(), toml).unwrap();
        assert!(config.snapshot_interval.is_none());
    }
}
