// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Config Integration Tests
//!
//! - Loading YAML, TOML and JSON files from disk
//! - Placeholders and environment overrides
//! - Configuration driving a real backend and controller

use std::str::FromStr;

use spool_buffer::{
    build_backend, BackendKind, BackendSettings, FlushController, FlushControllerConfig,
    S3Settings,
};
use spool_config::{
    load_config, BackendConfig, ConfigError, ConfigFormat, ConfigLoader, LogFormat, LogLevel,
    SpoolConfig,
};

use spool_tests::prelude::*;

// =============================================================================
// Helper Functions
// =============================================================================

fn settings_from(config: &SpoolConfig) -> BackendSettings {
    match config.backup.backend().expect("valid backend") {
        BackendConfig::Disk { dir } => BackendSettings::disk(dir),
        BackendConfig::S3 {
            bucket,
            region,
            access_key_id,
            secret_access_key,
            endpoint,
            prefix,
        } => {
            let mut s3 = S3Settings::new(bucket, region);
            if let (Some(key), Some(secret)) = (access_key_id, secret_access_key) {
                s3 = s3.with_credentials(key, secret);
            }
            if let Some(endpoint) = endpoint {
                s3 = s3.with_endpoint(endpoint);
            }
            if let Some(prefix) = prefix {
                s3 = s3.with_prefix(prefix);
            }
            BackendSettings::S3(s3)
        }
    }
}

fn controller_config_from(config: &SpoolConfig) -> FlushControllerConfig {
    FlushControllerConfig::builder()
        .max_buffer_size(config.backup.max_buffer_size)
        .flush_interval(config.backup.flush_interval())
        .flush_timeout(config.backup.flush_timeout())
        .enable_metrics(config.backup.enable_metrics)
        .build()
}

// =============================================================================
// File Loading
// =============================================================================

#[tokio::test]
async fn test_yaml_config_drives_disk_backup() {
    init_test_logging();
    let dir = temp_test_dir("spool_cfg_yaml_");
    let backup_dir = dir.path().join("backup");
    let config_path = dir.path().join("spool.yaml");
    std::fs::write(&config_path, ConfigFixtures::disk_yaml(&backup_dir)).unwrap();

    let config = load_config(&config_path).unwrap();
    assert_eq!(config.backup.max_buffer_size, 5);
    assert_eq!(config.ring.capacity, 8);
    assert_eq!(config.logging.level, LogLevel::Debug);
    assert_eq!(config.logging.format, LogFormat::Json);

    let backend = build_backend(&settings_from(&config)).await.unwrap();
    assert_eq!(backend.name(), "disk");
    assert!(backup_dir.is_dir());

    let controller = FlushController::with_shared(backend, controller_config_from(&config)).unwrap();
    for event in EventFixtures::batch(6) {
        controller.save(event).await.unwrap();
    }
    controller.close().await.unwrap();

    let batches = read_disk_batches(&backup_dir);
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].len(), 5);
    assert_eq!(batches[1].len(), 1);
}

#[test]
fn test_toml_relative_dir_resolves_against_config_file() {
    let dir = temp_test_dir("spool_cfg_toml_");
    let config_path = dir.path().join("spool.toml");
    std::fs::write(
        &config_path,
        r#"
[backup]
type = "disk"
dir = "spooled"
max_buffer_size = 25

[ring]
capacity = 250
"#,
    )
    .unwrap();

    let config = load_config(&config_path).unwrap();
    assert_eq!(config.backup.dir, dir.path().join("spooled"));
    assert_eq!(config.backup.max_buffer_size, 25);
    assert_eq!(config.backup.flush_interval_ms, 1000);
    assert_eq!(config.ring.capacity, 250);
}

#[test]
fn test_json_s3_with_placeholder_default() {
    let dir = temp_test_dir("spool_cfg_json_");
    let config_path = dir.path().join("spool.json");
    std::fs::write(
        &config_path,
        r#"{
  "backup": {
    "type": "s3",
    "bucket": "${SPOOL_IT_UNSET_BUCKET_7F3A:fallback-bucket}",
    "region": "eu-central-1",
    "prefix": "events/"
  }
}"#,
    )
    .unwrap();

    let config = load_config(&config_path).unwrap();
    match config.backup.backend().unwrap() {
        BackendConfig::S3 {
            bucket,
            region,
            access_key_id,
            prefix,
            ..
        } => {
            assert_eq!(bucket, "fallback-bucket");
            assert_eq!(region, "eu-central-1");
            assert!(access_key_id.is_none());
            assert_eq!(prefix.as_deref(), Some("events/"));
        }
        other => panic!("expected s3 backend, got {:?}", other),
    }
}

#[test]
fn test_env_overrides_apply_over_file() {
    let prefix = "SPOOL_IT_OVERRIDE";
    std::env::set_var(format!("{}_BACKUP_MAX_BUFFER_SIZE", prefix), "3");
    std::env::set_var(format!("{}_RING_CAPACITY", prefix), "9");

    let config = ConfigLoader::new()
        .with_env_prefix(prefix)
        .load_from_str("backup:\n  max_buffer_size: 50\n", ConfigFormat::Yaml)
        .unwrap();

    std::env::remove_var(format!("{}_BACKUP_MAX_BUFFER_SIZE", prefix));
    std::env::remove_var(format!("{}_RING_CAPACITY", prefix));

    assert_eq!(config.backup.max_buffer_size, 3);
    assert_eq!(config.ring.capacity, 9);
}

// =============================================================================
// Rejections
// =============================================================================

#[test]
fn test_unknown_backend_rejected_everywhere() {
    let err = ConfigLoader::new()
        .with_env_vars(false)
        .load_from_str("backup:\n  type: gcs\n", ConfigFormat::Yaml)
        .unwrap_err();
    assert!(matches!(err, ConfigError::UnknownBackend { .. }));

    assert!(BackendKind::from_str("gcs").is_err());
    assert_eq!(BackendKind::from_str(" S3 ").unwrap(), BackendKind::S3);
}

#[test]
fn test_s3_without_bucket_rejected() {
    let err = ConfigLoader::new()
        .with_env_vars(false)
        .load_from_str("backup:\n  type: s3\n", ConfigFormat::Yaml)
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingField { .. }));
}

#[test]
fn test_unknown_field_rejected() {
    let err = ConfigLoader::new()
        .with_env_vars(false)
        .load_from_str("backup:\n  flush_every: 10\n", ConfigFormat::Yaml)
        .unwrap_err();
    assert!(err.is_content_error());
}

#[test]
fn test_missing_file() {
    let err = load_config("/nonexistent/spool.yaml").unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound { .. }));
}

// =============================================================================
// S3 Wiring
// =============================================================================

#[tokio::test]
async fn test_s3_backend_builds_without_network() {
    let config = ConfigLoader::new()
        .with_env_vars(false)
        .load_from_str(
            r#"
backup:
  type: s3
  bucket: events
  region: us-west-2
  access_key_id: AKIDEXAMPLE
  secret_access_key: wJalrXUtnFEMI
  endpoint: http://localhost:9000
"#,
            ConfigFormat::Yaml,
        )
        .unwrap();

    let settings = settings_from(&config);
    assert_eq!(settings.kind(), BackendKind::S3);
    assert!(!format!("{:?}", settings).contains("wJalrXUtnFEMI"));

    let backend = build_backend(&settings).await.unwrap();
    assert_eq!(backend.name(), "s3");
}
