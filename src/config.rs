//! Configuration loader and validator for the lesson scheduling service.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub server: Server,
    pub database: Database,
    #[serde(default)]
    pub limits: Limits,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Server {
    pub bind_addr: String,
}

/// Database settings. `DATABASE_URL` overrides `url` at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Database {
    pub url: String,
}

/// Guard rails for the two request paths: pagination bounds for the query
/// path, implicit caps for unbounded recurrence generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Limits {
    #[serde(default = "default_page_size")]
    pub default_page_size: i64,
    #[serde(default = "max_page_size")]
    pub max_page_size: i64,
    #[serde(default = "max_occurrences")]
    pub max_occurrences: usize,
    #[serde(default = "max_window_days")]
    pub max_window_days: i64,
}

fn default_page_size() -> i64 {
    5
}

fn max_page_size() -> i64 {
    100
}

fn max_occurrences() -> usize {
    300
}

fn max_window_days() -> i64 {
    365
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: max_page_size(),
            max_occurrences: max_occurrences(),
            max_window_days: max_window_days(),
        }
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.server.bind_addr.trim().is_empty() {
        return Err(ConfigError::Invalid("server.bind_addr must be non-empty"));
    }
    if cfg.database.url.trim().is_empty() {
        return Err(ConfigError::Invalid("database.url must be non-empty"));
    }
    if cfg.limits.default_page_size < 1 {
        return Err(ConfigError::Invalid("limits.default_page_size must be >= 1"));
    }
    if cfg.limits.max_page_size < cfg.limits.default_page_size {
        return Err(ConfigError::Invalid(
            "limits.max_page_size must be >= limits.default_page_size",
        ));
    }
    if cfg.limits.max_occurrences == 0 {
        return Err(ConfigError::Invalid("limits.max_occurrences must be >= 1"));
    }
    if cfg.limits.max_window_days < 1 {
        return Err(ConfigError::Invalid("limits.max_window_days must be >= 1"));
    }
    Ok(())
}

/// Returns an example YAML configuration.
pub fn example() -> &'static str {
    r#"server:
  bind_addr: "127.0.0.1:3000"

database:
  url: "sqlite://./data/lessons.db"

limits:
  default_page_size: 5
  max_page_size: 100
  max_occurrences: 300
  max_window_days: 365
"#
}
