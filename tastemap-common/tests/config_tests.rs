//! Configuration loading and graceful degradation
//!
//! Tests that manipulate TASTEMAP_* environment variables are marked with
//! #[serial] so they never run in parallel with each other.

use serial_test::serial;
use std::env;
use std::io::Write;
use tastemap_common::config::{
    load_config, resolve_config_path, TomlConfig, ENV_CONFIG, ENV_COORDINATES, ENV_METADATA, ENV_TOP_K,
};
use tastemap_common::scan::CodeNormalization;
use tastemap_common::Error;
use tempfile::NamedTempFile;

fn clear_env() {
    env::remove_var(ENV_CONFIG);
    env::remove_var(ENV_COORDINATES);
    env::remove_var(ENV_METADATA);
    env::remove_var(ENV_TOP_K);
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let config = load_config(Some(&path)).expect("missing file is not fatal");
    assert_eq!(config, TomlConfig::default());
}

#[test]
#[serial]
fn test_file_values_are_used() {
    clear_env();
    let file = write_config(
        r#"
        top_k = 3
        code_normalization = "trim"

        [catalog]
        coordinates = "/data/pca.csv"
        metadata = "/data/meta.csv"

        [logging]
        level = "debug"
        "#,
    );

    let config = load_config(Some(file.path())).unwrap();
    assert_eq!(config.top_k, 3);
    assert_eq!(config.code_normalization, CodeNormalization::Trim);
    assert_eq!(config.catalog.coordinates, "/data/pca.csv");
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    let file = write_config("top_k = 3\n[catalog]\ncoordinates = \"/data/pca.csv\"\n");
    env::set_var(ENV_COORDINATES, "https://example.org/pca.csv");
    env::set_var(ENV_TOP_K, "7");

    let config = load_config(Some(file.path())).unwrap();
    assert_eq!(config.catalog.coordinates, "https://example.org/pca.csv");
    assert_eq!(config.top_k, 7);

    clear_env();
}

#[test]
#[serial]
fn test_bad_env_top_k_is_config_error() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    env::set_var(ENV_TOP_K, "ten");

    let result = load_config(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(Error::Config(_))));

    env::set_var(ENV_TOP_K, "0");
    let result = load_config(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(Error::Config(_))));

    clear_env();
}

#[test]
#[serial]
fn test_env_config_path_used_without_cli_arg() {
    clear_env();
    env::set_var(ENV_CONFIG, "/tmp/tastemap-env.toml");
    assert_eq!(
        resolve_config_path(None),
        Some(std::path::PathBuf::from("/tmp/tastemap-env.toml"))
    );
    clear_env();
}

#[test]
#[serial]
fn test_malformed_file_is_error() {
    clear_env();
    let file = write_config("top_k = \"many\"");
    assert!(matches!(load_config(Some(file.path())), Err(Error::Config(_))));
}
