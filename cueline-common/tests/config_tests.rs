//! Configuration loading and graceful degradation
//!
//! Tests that touch `CUELINE_CONFIG` are marked `#[serial]` so they never race
//! on the process environment.

use cueline_common::config::{locate_config_file, DualWritePolicy, TomlConfig, CONFIG_ENV_VAR};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

#[test]
#[serial]
fn test_missing_explicit_file_falls_back_to_defaults() {
    env::remove_var(CONFIG_ENV_VAR);

    let path = PathBuf::from("/nonexistent/cueline/config.toml");
    let config = TomlConfig::load(Some(&path)).expect("missing config must not be fatal");

    assert_eq!(config.bind_address, "127.0.0.1:8080");
    assert_eq!(config.default_playlist, "default");
}

#[test]
#[serial]
fn test_explicit_file_is_loaded() {
    env::remove_var(CONFIG_ENV_VAR);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
bind_address = "0.0.0.0:9000"
tick_interval_ms = 250

[http]
request_timeout_ms = 1500
"#
    )
    .unwrap();

    let config = TomlConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.bind_address, "0.0.0.0:9000");
    assert_eq!(config.tick_interval_ms, 250);
    assert_eq!(config.http.request_timeout_ms, 1500);
    assert_eq!(config.dual_write_policy, DualWritePolicy::Preserve);
}

#[test]
#[serial]
fn test_env_var_names_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "default_playlist = \"from-env\"").unwrap();

    env::set_var(CONFIG_ENV_VAR, file.path());
    let located = locate_config_file(None);
    let config = TomlConfig::load(None).unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(located.as_deref(), Some(file.path()));
    assert_eq!(config.default_playlist, "from-env");
}

#[test]
#[serial]
fn test_explicit_path_beats_env_var() {
    let explicit = PathBuf::from("/tmp/cueline-explicit.toml");
    env::set_var(CONFIG_ENV_VAR, "/tmp/cueline-env.toml");
    let located = locate_config_file(Some(&explicit));
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(located, Some(explicit));
}

#[test]
#[serial]
fn test_malformed_file_is_an_error() {
    env::remove_var(CONFIG_ENV_VAR);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "dual_write_policy = \"whenever\"").unwrap();

    let result = TomlConfig::load(Some(file.path()));
    assert!(result.is_err());
}
