//! Configuration loading and typed config structures for the talk server.
//!
//! The configuration lives in `skillshare-config.yaml` (or the file named
//! by `SKILLSHARE_CONFIG`). Every field has a default, so a missing file
//! or a partial file is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "SKILLSHARE_CONFIG";

/// Config file looked up in the working directory by default.
pub const DEFAULT_CONFIG_PATH: &str = "skillshare-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override held an unusable value.
    #[error("invalid value for {name}: {value}")]
    Env {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SkillShareConfig {
    /// Listener and static-file settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Long-poll limits.
    #[serde(default)]
    pub poll: PollConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SkillShareConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override the file:
    /// - `SKILLSHARE_HOST` overrides `server.host`
    /// - `SKILLSHARE_PORT` overrides `server.port`
    /// - `SKILLSHARE_STATIC_ROOT` overrides `server.static_root`
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.server.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No env overrides applied.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Load from `SKILLSHARE_CONFIG` or the default path.
    pub fn load() -> Result<(Self, ConfigSource), ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
        Self::load_from(&path)
    }

    /// Load from `path`, falling back to defaults (plus env overrides)
    /// when the file does not exist. The returned [`ConfigSource`] says
    /// which happened so the caller can log it once tracing is up.
    pub fn load_from(path: &Path) -> Result<(Self, ConfigSource), ConfigError> {
        if path.exists() {
            let config = Self::from_file(path)?;
            Ok((config, ConfigSource::File(path.to_path_buf())))
        } else {
            let mut config = Self::default();
            config.server.apply_env_overrides()?;
            Ok((config, ConfigSource::Defaults(path.to_path_buf())))
        }
    }
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from this file.
    File(PathBuf),
    /// This file was missing; built-in defaults were used.
    Defaults(PathBuf),
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served for every path outside `/talks`.
    #[serde(default = "default_static_root")]
    pub static_root: PathBuf,
}

impl ServerConfig {
    /// Override listener settings with environment variables when set.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("SKILLSHARE_HOST") {
            self.host = val;
        }
        if let Ok(val) = std::env::var("SKILLSHARE_PORT") {
            self.port = val.parse().map_err(|e| ConfigError::Env {
                name: "SKILLSHARE_PORT",
                value: format!("{val} ({e})"),
            })?;
        }
        if let Ok(val) = std::env::var("SKILLSHARE_STATIC_ROOT") {
            self.static_root = PathBuf::from(val);
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_root: default_static_root(),
        }
    }
}

/// Long-poll configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PollConfig {
    /// Upper bound on `Prefer: wait=N`, in seconds.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

impl PollConfig {
    /// The cap as a [`Duration`].
    pub const fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error).
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8000
}

fn default_static_root() -> PathBuf {
    PathBuf::from("./public")
}

const fn default_max_wait_secs() -> u64 {
    120
}

fn default_log_level() -> String {
    String::from("info")
}
