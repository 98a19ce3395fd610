//! Configuration management for the admin core.
//!
//! Loads configuration from a TOML file; every section falls back to
//! sensible defaults so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    /// Workspace names managed by the gateway, in menu order.
    #[serde(default)]
    pub workspaces: Vec<String>,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub light: LightConfig,

    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub management: ManagementConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Gateway home directory (holds `openclaw.json` and the workspaces)
    #[serde(default = "default_gateway_home")]
    pub gateway_home: PathBuf,

    /// Root of the backup catalog
    #[serde(default = "default_backup_root")]
    pub backup_root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Generations retained per category directory
    #[serde(default = "default_retention_keep")]
    pub keep: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightConfig {
    /// File names bundled by a light workspace backup
    #[serde(default = "default_light_files")]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Model catalog JSON (`{ "models": [...] }`)
    #[serde(default = "default_model_catalog")]
    pub catalog_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagementConfig {
    /// Management API base URL
    #[serde(default = "default_management_url")]
    pub url: String,

    /// Bearer token for the management API
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values
fn default_gateway_home() -> PathBuf {
    home_dir().join(".openclaw")
}

fn default_backup_root() -> PathBuf {
    PathBuf::from("backup")
}

fn default_retention_keep() -> usize {
    1
}

fn default_light_files() -> Vec<String> {
    [
        "HEARTBEAT.md",
        "IDENTITY.md",
        "MEMORY.md",
        "USER.md",
        "TOOLS.md",
        "SOUL.md",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_model_catalog() -> PathBuf {
    PathBuf::from("config/models.json")
}

fn default_management_url() -> String {
    "http://127.0.0.1:8317/v0/management".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            gateway_home: default_gateway_home(),
            backup_root: default_backup_root(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        RetentionConfig {
            keep: default_retention_keep(),
        }
    }
}

impl Default for LightConfig {
    fn default() -> Self {
        LightConfig {
            files: default_light_files(),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        ModelsConfig {
            catalog_path: default_model_catalog(),
        }
    }
}

impl Default for ManagementConfig {
    fn default() -> Self {
        ManagementConfig {
            url: default_management_url(),
            key: String::new(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            paths: PathsConfig::default(),
            workspaces: Vec::new(),
            retention: RetentionConfig::default(),
            light: LightConfig::default(),
            models: ModelsConfig::default(),
            management: ManagementConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
