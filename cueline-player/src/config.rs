//! Resolved configuration for cueline-player
//!
//! Combines the TOML bootstrap file from `cueline-common` with command-line
//! and environment overrides. Priority: CLI > environment > TOML > defaults.

use crate::error::{Error, Result};
use crate::playback::ControllerConfig;
use cueline_common::config::{DualWritePolicy, TomlConfig};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub default_playlist: Option<String>,
    pub log_level: Option<String>,
    pub dual_write_policy: Option<DualWritePolicy>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub bind_address: SocketAddr,
    pub default_playlist: String,
    pub tick: Duration,
    pub dual_write_policy: DualWritePolicy,
    pub request_timeout: Duration,
    pub log_level: String,
}

impl Config {
    /// Load the TOML file (if any) and apply overrides
    pub fn load(config_file: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let toml = TomlConfig::load(config_file)?;
        Self::resolve(toml, overrides)
    }

    pub fn resolve(toml: TomlConfig, overrides: ConfigOverrides) -> Result<Self> {
        let bind = overrides.bind_address.unwrap_or(toml.bind_address.clone());
        let bind_address: SocketAddr = bind
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bind address '{}': {}", bind, e)))?;

        let default_playlist = overrides
            .default_playlist
            .unwrap_or(toml.default_playlist.clone());
        if default_playlist.trim().is_empty() {
            return Err(Error::Config("Default playlist name must not be empty".to_string()));
        }

        let config = Config {
            database_path: overrides.database_path.unwrap_or(toml.database_path.clone()),
            bind_address,
            default_playlist,
            tick: toml.tick_interval(),
            dual_write_policy: overrides
                .dual_write_policy
                .unwrap_or(toml.dual_write_policy),
            request_timeout: Duration::from_millis(toml.http.request_timeout_ms.max(1)),
            log_level: overrides.log_level.unwrap_or(toml.logging.level),
        };

        info!(
            "Configuration: database={}, bind={}, playlist='{}', tick={:?}, dual_write={}",
            config.database_path.display(),
            config.bind_address,
            config.default_playlist,
            config.tick,
            config.dual_write_policy
        );
        Ok(config)
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            tick: self.tick,
            dual_write_policy: self.dual_write_policy,
            ..ControllerConfig::default()
        }
    }

    /// Default tracing directive when `RUST_LOG` is unset
    pub fn log_filter(&self) -> String {
        format!(
            "cueline_player={level},cueline_common={level},tower_http={level}",
            level = self.log_level
        )
    }
}
