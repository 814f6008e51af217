//! Unit tests for configuration module
//!
//! Tests configuration parsing, validation, file handling and the
//! environment overrides.

use super::*;
use anyhow::Result;
use serial_test::serial;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_default_configuration_is_valid() {
    let config = ClientConfig::default();

    assert!(config.backend.use_wayland);
    assert!(config.backend.runtime_dir.is_none());
    assert_eq!(config.display.reserved_name, "wayland-0");
    assert!(config.validate().is_ok());
}

#[test]
fn test_configuration_from_file() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("client.toml");

    let test_config = r#"
[backend]
use_wayland = false
runtime_dir = "/run/user/1000"

[display]
reserved_name = "wayland-1"
"#;
    fs::write(&file_path, test_config)?;

    let config = ClientConfig::load(&file_path)?;

    assert!(!config.backend.use_wayland);
    assert_eq!(
        config.backend.runtime_dir,
        Some(PathBuf::from("/run/user/1000"))
    );
    assert_eq!(config.display.reserved_name, "wayland-1");

    Ok(())
}

#[test]
fn test_partial_file_keeps_defaults() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("partial.toml");
    fs::write(&file_path, "[backend]\nuse_wayland = false\n")?;

    let config = ClientConfig::load(&file_path)?;

    assert!(!config.backend.use_wayland);
    assert_eq!(config.display, DisplayConfig::default());

    Ok(())
}

#[test]
fn test_invalid_toml_is_rejected() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("broken.toml");
    fs::write(&file_path, "[backend\nuse_wayland = ")?;

    assert!(ClientConfig::load(&file_path).is_err());

    Ok(())
}

#[test]
fn test_missing_file_is_an_error() {
    let result = ClientConfig::load("/nonexistent/compositor-client.toml");
    assert!(result.is_err());
}

#[test]
fn test_validation_rejects_empty_reserved_name() {
    let mut config = ClientConfig::default();
    config.display.reserved_name.clear();

    assert!(config.validate().is_err());
}

#[test]
fn test_validation_rejects_relative_runtime_dir() {
    let mut config = ClientConfig::default();
    config.backend.runtime_dir = Some(PathBuf::from("run/user"));

    assert!(config.validate().is_err());
}

#[test]
fn test_save_and_load() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("saved.toml");

    let mut original = ClientConfig::default();
    original.backend.use_wayland = false;
    original.save(&file_path)?;

    let loaded = ClientConfig::load(&file_path)?;
    assert_eq!(loaded, original);

    Ok(())
}

#[test]
fn test_env_flag_parsing() {
    assert!(parse_env_flag("1"));
    assert!(parse_env_flag("  42"));
    assert!(parse_env_flag("-1"));
    assert!(parse_env_flag("+7abc"));
    assert!(parse_env_flag("007"));

    assert!(!parse_env_flag("0"));
    assert!(!parse_env_flag(""));
    assert!(!parse_env_flag("true"));
    assert!(!parse_env_flag("yes"));
    assert!(!parse_env_flag("- 1"));
    assert!(!parse_env_flag("000"));
}

#[test]
#[serial]
fn test_use_wayland_environment_override() {
    let config = BackendConfig::default();

    std::env::set_var(USE_WAYLAND_ENV, "0");
    assert!(!config.resolve_use_wayland());

    std::env::set_var(USE_WAYLAND_ENV, "not-a-number");
    assert!(!config.resolve_use_wayland());

    std::env::set_var(USE_WAYLAND_ENV, "1");
    assert!(config.resolve_use_wayland());

    std::env::remove_var(USE_WAYLAND_ENV);
    assert!(config.resolve_use_wayland());
}

#[test]
#[serial]
fn test_runtime_dir_falls_back_to_environment() {
    let config = BackendConfig::default();

    std::env::set_var(RUNTIME_DIR_ENV, "/run/user/4242");
    assert_eq!(
        config.resolve_runtime_dir(),
        Some(PathBuf::from("/run/user/4242"))
    );

    let configured = BackendConfig {
        runtime_dir: Some(PathBuf::from("/tmp/runtime")),
        ..BackendConfig::default()
    };
    assert_eq!(
        configured.resolve_runtime_dir(),
        Some(PathBuf::from("/tmp/runtime"))
    );

    std::env::remove_var(RUNTIME_DIR_ENV);
    assert_eq!(config.resolve_runtime_dir(), None);
}
