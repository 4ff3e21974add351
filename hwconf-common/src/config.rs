//! Configuration loading
//!
//! Resolution priority for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Highest document feature level this build can import
pub const SUPPORTED_FEATURE_LEVEL: u32 = 104;

/// Default fan-out bound per level of the import write tree
pub const DEFAULT_MAX_CONCURRENT_WRITES: usize = 16;

/// Environment variable overriding the database path
pub const ENV_DATABASE: &str = "HWCONF_DATABASE";

/// Environment variable overriding the log level
pub const ENV_LOG_LEVEL: &str = "HWCONF_LOG_LEVEL";

/// Effective import configuration after all tiers are merged
#[derive(Debug, Clone, PartialEq)]
pub struct ImportConfig {
    pub database_path: PathBuf,
    pub supported_feature_level: u32,
    pub max_concurrent_writes: usize,
    pub cache_enabled: bool,
    pub lock_retry_max_wait_ms: u64,
    pub log_level: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            supported_feature_level: SUPPORTED_FEATURE_LEVEL,
            max_concurrent_writes: DEFAULT_MAX_CONCURRENT_WRITES,
            cache_enabled: true,
            lock_retry_max_wait_ms: 5000,
            log_level: "info".to_string(),
        }
    }
}

/// On-disk TOML shape; every key is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    pub database_path: Option<PathBuf>,
    pub supported_feature_level: Option<u32>,
    pub max_concurrent_writes: Option<usize>,
    pub cache_enabled: Option<bool>,
    pub lock_retry_max_wait_ms: Option<u64>,
    pub log_level: Option<String>,
}

/// Settings supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_file: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl ImportConfig {
    /// Merge CLI, environment, TOML and defaults into one configuration
    pub fn load(cli: &CliOverrides) -> Result<Self> {
        let toml_config = match &cli.config_file {
            // An explicitly named file must exist
            Some(path) => read_toml_config(path)?,
            None => match locate_config_file() {
                Some(path) => read_toml_config(&path)?,
                None => {
                    debug!("No config file found, using defaults");
                    TomlConfig::default()
                }
            },
        };

        let config = Self::merge(cli, &toml_config, |name| std::env::var(name).ok());
        info!(
            database = %config.database_path.display(),
            feature_level = config.supported_feature_level,
            max_concurrent_writes = config.max_concurrent_writes,
            cache_enabled = config.cache_enabled,
            "Configuration resolved"
        );
        Ok(config)
    }

    /// Pure merge step; `env` looks up environment variables
    pub fn merge<F>(cli: &CliOverrides, toml_config: &TomlConfig, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let database_path = cli
            .database_path
            .clone()
            .or_else(|| env(ENV_DATABASE).map(PathBuf::from))
            .or_else(|| toml_config.database_path.clone())
            .unwrap_or(defaults.database_path);

        let log_level = cli
            .log_level
            .clone()
            .or_else(|| env(ENV_LOG_LEVEL))
            .or_else(|| toml_config.log_level.clone())
            .unwrap_or(defaults.log_level);

        let max_concurrent_writes = toml_config
            .max_concurrent_writes
            .unwrap_or(defaults.max_concurrent_writes)
            .clamp(1, 256);

        Self {
            database_path,
            supported_feature_level: toml_config
                .supported_feature_level
                .unwrap_or(defaults.supported_feature_level),
            max_concurrent_writes,
            cache_enabled: toml_config.cache_enabled.unwrap_or(defaults.cache_enabled),
            lock_retry_max_wait_ms: toml_config
                .lock_retry_max_wait_ms
                .unwrap_or(defaults.lock_retry_max_wait_ms),
            log_level,
        }
    }
}

/// Read and parse a TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// User config first, then the system-wide file
fn locate_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("hwconf").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/hwconf/config.toml");
    if cfg!(unix) && system_config.exists() {
        return Some(system_config);
    }
    None
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("hwconf"))
        .unwrap_or_else(|| PathBuf::from("./hwconf_data"))
        .join("hwconf.db")
}
