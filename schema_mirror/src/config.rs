//! Configuration handling for schema_mirror
//!
//! Settings come from an optional TOML file; the command line and the
//! environment override individual values on top of it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::db::connection::{ConnectionParams, SUPPORTED_DRIVERS};
use crate::error::{Error, Result, SchemaSide};

/// Load configuration from a TOML file
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path).map_err(|e| {
        Error::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

    Ok(config)
}

/// Represents the complete schema_mirror configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_driver")]
    pub driver: String,
    #[serde(default)]
    pub source: ConnectionParams,
    #[serde(default)]
    pub target: ConnectionParams,
    #[serde(default)]
    pub replication: ReplicationConfig,
    pub logging: Option<LoggingConfig>,
}

fn default_driver() -> String {
    "postgres".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            source: ConnectionParams::default(),
            target: ConnectionParams::default(),
            replication: ReplicationConfig::default(),
            logging: None,
        }
    }
}

impl Config {
    /// Reject unsupported drivers and incomplete connection settings before
    /// anything tries to connect
    pub fn validate(&self) -> Result<()> {
        let driver = self.driver.trim().to_lowercase();
        if !SUPPORTED_DRIVERS.contains(&driver.as_str()) {
            return Err(Error::ConfigError(format!(
                "'{}' is not a supported database driver (supported: {})",
                self.driver,
                SUPPORTED_DRIVERS.join(", ")
            )));
        }

        self.source.validate(SchemaSide::Source)?;
        self.target.validate(SchemaSide::Target)?;

        if self.replication.connect_timeout_seconds == 0 {
            return Err(Error::ConfigError(
                "connect_timeout_seconds must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Replication behaviour
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReplicationConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl ReplicationConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    pub file: Option<String>,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_stdout")]
    pub stdout: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_stdout() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
            format: default_log_format(),
            stdout: default_stdout(),
        }
    }
}

/// Environment variables understood by the command line, in the order they
/// are written to a fresh `.env` file
pub const ENV_VARS: &[&str] = &[
    "DRIVER",
    "TARGET_HOST",
    "TARGET_PORT",
    "TARGET_DATABASE",
    "TARGET_SCHEMA",
    "TARGET_USER",
    "TARGET_PASSWORD",
    "SOURCE_HOST",
    "SOURCE_PORT",
    "SOURCE_DATABASE",
    "SOURCE_SCHEMA",
    "SOURCE_USER",
    "SOURCE_PASSWORD",
];

/// Contents of the `.env` template: one empty assignment per variable
pub fn env_template() -> String {
    ENV_VARS.iter().map(|name| format!("{}=\n", name)).collect()
}

/// Write the `.env` template, refusing to clobber an existing file unless
/// `force` is set
pub fn write_env_template(path: impl AsRef<Path>, force: bool) -> Result<()> {
    let path = path.as_ref();
    if path.exists() && !force {
        return Err(Error::ConfigError(format!(
            "{} already exists, pass --force to overwrite it",
            path.display()
        )));
    }

    fs::write(path, env_template())?;
    Ok(())
}
