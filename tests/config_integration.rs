//! Integration tests for loader configuration.
//!
//! These tests verify that `weft.toml` files are parsed and applied to a
//! load context.

mod common;

use common::blogging_schema;
use weft::engine::ErrorCode;
use weft::prelude::*;

/// Test a full configuration file
#[test]
fn test_config_full() {
    let config = LoaderConfig::from_str(
        r#"
        max_include_depth = 6
        slow_fetch_threshold_ms = 250
        log_identity_conflicts = false

        [environments.test]
        max_include_depth = 2

        [environments.production]
        slow_fetch_threshold_ms = 100
        log_identity_conflicts = true
        "#,
    )
    .expect("Failed to parse config");

    assert_eq!(config.max_include_depth, 6);
    assert_eq!(config.slow_fetch_threshold_ms, 250);
    assert!(!config.log_identity_conflicts);
    assert_eq!(config.environments.len(), 2);

    let production = config.with_environment("production");
    assert_eq!(production.max_include_depth, 6);
    assert_eq!(production.slow_fetch_threshold_ms, 100);
    assert!(production.log_identity_conflicts);
}

/// Test loading the file from disk
#[test]
fn test_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weft.toml");
    std::fs::write(&path, "max_include_depth = 3\n").unwrap();

    let config = LoaderConfig::from_file(&path).unwrap();
    assert_eq!(config.max_include_depth, 3);
}

/// Test that typos are reported instead of ignored
#[test]
fn test_config_rejects_unknown_keys() {
    let err = LoaderConfig::from_str("slow_fetch_ms = 10").unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigParse);

    let err = LoaderConfig::from_str("[environments.test]\nmax_depth = 1").unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigParse);
}

/// Test that an unusable depth is rejected
#[test]
fn test_config_rejects_zero_depth() {
    let err = LoaderConfig::from_str("max_include_depth = 0").unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidConfiguration);
    assert!(LoaderConfig::default().max_include_depth(0).validate().is_err());

    let err = LoaderConfig::from_str("[environments.ci]\nmax_include_depth = 0").unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidConfiguration);
}

/// Test that the context builds trees within the configured depth
#[test]
fn test_config_applies_to_context() {
    let config = LoaderConfig::from_str("[environments.test]\nmax_include_depth = 2")
        .unwrap()
        .with_environment("test");
    let ctx = LoadContext::new(blogging_schema(), InMemoryStore::new()).with_config(config);

    assert!(ctx.include("Blog").include("Posts").then_include("Author").build().is_ok());
    let err = ctx
        .include("Blog")
        .include("Posts")
        .then_include("Author")
        .then_include("Photo")
        .build()
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::IncludeTooDeep);
}
