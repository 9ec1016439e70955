//! Configuration module for Treeline.
//!
//! Typed configuration structs mapping to the YAML configuration file,
//! with loading, defaults, and a platform-appropriate default path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for the Treeline daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
    pub workflow: WorkflowConfig,
    pub sync: SyncTriggerConfig,
    pub logging: LoggingConfig,
}

/// Webhook HTTP endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the webhook endpoint binds, e.g. "127.0.0.1:8466".
    pub bind_addr: String,
    /// Public base URL the provider delivers notifications to.
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8466".to_string(),
            public_base_url: "http://127.0.0.1:8466".to_string(),
        }
    }
}

/// Local mirror database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: data_dir.join("treeline").join("mirror.db"),
        }
    }
}

/// Remote directory provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the directory API.
    pub base_url: String,
    /// Access token for the provider API. When absent, the daemon reads
    /// the `TREELINE_PROVIDER_TOKEN` environment variable.
    pub access_token: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/drive/v3".to_string(),
            access_token: None,
        }
    }
}

/// External workflow engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Base URL of the engine's launch endpoint.
    pub base_url: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:7233".to_string(),
        }
    }
}

/// Sync trigger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncTriggerConfig {
    /// Capacity of the orchestrator inbox; a full inbox sheds triggers.
    pub inbox_capacity: usize,
}

impl Default for SyncTriggerConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: crate::orchestrator::DEFAULT_INBOX_CAPACITY,
        }
    }
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/treeline/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("treeline")
            .join("config.yaml")
    }
}
