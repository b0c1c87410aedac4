//! Bootstrap configuration
//!
//! Cueline reads a small TOML file at startup. Everything in it has a compiled
//! default, and a missing file is not an error: the service logs a warning and
//! starts with defaults.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (applied by the binary)
//! 2. Environment variables (applied by the binary through clap)
//! 3. TOML configuration file
//! 4. Compiled defaults

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "CUELINE_CONFIG";

/// Lower bound for the position clock tick
pub const MIN_TICK_MS: u64 = 10;

/// Upper bound for the position clock tick
pub const MAX_TICK_MS: u64 = 5000;

/// What to do with the cache pointer when the durable write of a track change fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DualWritePolicy {
    /// Leave the cache pointing at the new track; the stores disagree until the next change
    #[default]
    Preserve,
    /// Restore the cache pointer to the previous track before reporting the error
    RollbackCache,
}

impl std::str::FromStr for DualWritePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(DualWritePolicy::Preserve),
            "rollback-cache" | "rollback_cache" => Ok(DualWritePolicy::RollbackCache),
            other => Err(Error::InvalidInput(format!(
                "Unknown dual-write policy '{}' (expected 'preserve' or 'rollback-cache')",
                other
            ))),
        }
    }
}

impl std::fmt::Display for DualWritePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DualWritePolicy::Preserve => write!(f, "preserve"),
            DualWritePolicy::RollbackCache => write!(f, "rollback-cache"),
        }
    }
}

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change while the service runs.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Path to SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// HTTP listen address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Name of the playlist served by the player (created if missing)
    #[serde(default = "default_playlist")]
    pub default_playlist: String,

    /// Position clock tick in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default)]
    pub dual_write_policy: DualWritePolicy,

    #[serde(default)]
    pub http: HttpConfig,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout; the event stream is exempt
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            bind_address: default_bind_address(),
            default_playlist: default_playlist(),
            tick_interval_ms: default_tick_interval_ms(),
            dual_write_policy: DualWritePolicy::default(),
            http: HttpConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
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

fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_playlist() -> String {
    "default".to_string()
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_request_timeout_ms() -> u64 {
    4000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// OS-dependent default database location
///
/// `~/.local/share/cueline/cueline.db` on Linux.
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("cueline"))
        .unwrap_or_else(|| PathBuf::from("./cueline_data"))
        .join("cueline.db")
}

/// Locate the configuration file
///
/// An explicit path wins. Otherwise `CUELINE_CONFIG`, then
/// `~/.config/cueline/config.toml`, then `/etc/cueline/config.toml`.
/// Returns `None` if no candidate exists.
pub fn locate_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    let user_config = dirs::config_dir().map(|d| d.join("cueline").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/cueline/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

impl TomlConfig {
    /// Load configuration, falling back to compiled defaults
    ///
    /// A missing file logs a warning and yields defaults. A file that exists
    /// but cannot be parsed is a configuration error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match locate_config_file(explicit) {
            Some(path) => path,
            None => {
                warn!("No configuration file found, using compiled defaults");
                return Ok(Self::default());
            }
        };

        if !path.exists() {
            warn!(
                "Configuration file {} not found, using compiled defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Position clock tick, clamped to a sane range
    pub fn tick_interval(&self) -> Duration {
        let ms = self.tick_interval_ms.clamp(MIN_TICK_MS, MAX_TICK_MS);
        if ms != self.tick_interval_ms {
            warn!(
                "tick_interval_ms {} out of range, clamped to {}",
                self.tick_interval_ms, ms
            );
        }
        Duration::from_millis(ms)
    }
}
