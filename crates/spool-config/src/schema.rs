// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema for spool.
//!
//! ```yaml
//! backup:
//!   type: disk            # or s3
//!   dir: ./data/backup
//!   flush_interval_ms: 1000
//!   max_buffer_size: 100
//!   flush_timeout_secs: 30
//! ring:
//!   capacity: 1000
//! logging:
//!   level: info
//!   format: text
//! ```
//!
//! The `backup` section is flat: `type` selects the backend and only the
//! fields of that backend are read. [`BackupConfig::backend`] turns it into
//! a typed [`BackendConfig`].

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Constants
// =============================================================================

/// Default backend type.
pub const DEFAULT_BACKEND_TYPE: &str = "disk";

/// Default flush interval in milliseconds.
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 1000;

/// Default size trigger.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 100;

/// Default backend call timeout in seconds.
pub const DEFAULT_FLUSH_TIMEOUT_SECS: u64 = 30;

/// Default ring buffer capacity.
pub const DEFAULT_RING_CAPACITY: usize = 1000;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// The root configuration structure for spool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpoolConfig {
    /// Backup (flush controller + backend) configuration.
    #[serde(default)]
    pub backup: BackupConfig,

    /// Recent-history ring buffer configuration.
    #[serde(default)]
    pub ring: RingConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SpoolConfig {
    /// Validates the entire configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.backup.validate()?;
        self.ring.validate()?;
        Ok(())
    }
}

// =============================================================================
// Backup Configuration
// =============================================================================

/// Flat backup section as written in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackupConfig {
    /// Backend type tag (`disk` or `s3`).
    #[serde(rename = "type", default = "default_backend_type")]
    pub backend_type: String,

    /// Target directory (disk).
    #[serde(default = "default_backup_dir")]
    pub dir: PathBuf,

    /// Bucket name (s3).
    #[serde(default)]
    pub bucket: Option<String>,

    /// AWS region (s3).
    #[serde(default = "default_region")]
    pub region: String,

    /// Static access key (s3).
    #[serde(default)]
    pub access_key_id: Option<SecretValue>,

    /// Static secret key (s3).
    #[serde(default)]
    pub secret_access_key: Option<SecretValue>,

    /// Custom endpoint (s3).
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Key prefix (s3).
    #[serde(default)]
    pub prefix: Option<String>,

    /// Time trigger period in milliseconds.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Size trigger.
    #[serde(default = "default_max_buffer_size")]
    pub max_buffer_size: usize,

    /// Backend call timeout in seconds.
    #[serde(default = "default_flush_timeout_secs")]
    pub flush_timeout_secs: u64,

    /// Export Prometheus metrics.
    #[serde(default = "default_enabled")]
    pub enable_metrics: bool,
}

fn default_backend_type() -> String {
    DEFAULT_BACKEND_TYPE.to_string()
}

/// Default backup directory.
pub fn default_backup_dir() -> PathBuf {
    PathBuf::from("./data/backup")
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_flush_interval_ms() -> u64 {
    DEFAULT_FLUSH_INTERVAL_MS
}

fn default_max_buffer_size() -> usize {
    DEFAULT_MAX_BUFFER_SIZE
}

fn default_flush_timeout_secs() -> u64 {
    DEFAULT_FLUSH_TIMEOUT_SECS
}

fn default_enabled() -> bool {
    true
}

impl BackupConfig {
    /// Validates the backup configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.flush_interval_ms == 0 {
            return Err(ConfigError::validation(
                "backup.flush_interval_ms",
                "cannot be zero",
            ));
        }
        if self.max_buffer_size == 0 {
            return Err(ConfigError::validation(
                "backup.max_buffer_size",
                "cannot be zero",
            ));
        }
        if self.flush_timeout_secs == 0 {
            return Err(ConfigError::validation(
                "backup.flush_timeout_secs",
                "cannot be zero",
            ));
        }
        self.backend().map(|_| ())
    }

    /// Resolves the typed backend selected by `type`.
    pub fn backend(&self) -> ConfigResult<BackendConfig> {
        match self.backend_type.trim().to_ascii_lowercase().as_str() {
            "disk" => {
                if self.dir.as_os_str().is_empty() {
                    return Err(ConfigError::missing_field("backup.dir"));
                }
                Ok(BackendConfig::Disk {
                    dir: self.dir.clone(),
                })
            }
            "s3" => {
                let bucket = self
                    .bucket
                    .as_deref()
                    .map(str::trim)
                    .filter(|b| !b.is_empty())
                    .ok_or_else(|| ConfigError::missing_field("backup.bucket"))?;

                if self.access_key_id.is_some() != self.secret_access_key.is_some() {
                    return Err(ConfigError::validation(
                        "backup.access_key_id",
                        "access_key_id and secret_access_key must be set together",
                    ));
                }

                Ok(BackendConfig::S3 {
                    bucket: bucket.to_string(),
                    region: self.region.clone(),
                    access_key_id: self.access_key_id.as_ref().map(|s| s.expose().to_string()),
                    secret_access_key: self
                        .secret_access_key
                        .as_ref()
                        .map(|s| s.expose().to_string()),
                    endpoint: self.endpoint.clone(),
                    prefix: self.prefix.clone(),
                })
            }
            _ => Err(ConfigError::unknown_backend(&self.backend_type)),
        }
    }

    /// Returns the flush interval.
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Returns the backend call timeout.
    pub fn flush_timeout(&self) -> Duration {
        Duration::from_secs(self.flush_timeout_secs)
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            backend_type: default_backend_type(),
            dir: default_backup_dir(),
            bucket: None,
            region: default_region(),
            access_key_id: None,
            secret_access_key: None,
            endpoint: None,
            prefix: None,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            flush_timeout_secs: DEFAULT_FLUSH_TIMEOUT_SECS,
            enable_metrics: true,
        }
    }
}

/// Typed backend selection derived from [`BackupConfig`].
#[derive(Clone, PartialEq)]
pub enum BackendConfig {
    /// Local directory.
    Disk {
        /// Target directory.
        dir: PathBuf,
    },
    /// S3-compatible bucket.
    S3 {
        /// Bucket name.
        bucket: String,
        /// AWS region.
        region: String,
        /// Static access key.
        access_key_id: Option<String>,
        /// Static secret key.
        secret_access_key: Option<String>,
        /// Custom endpoint.
        endpoint: Option<String>,
        /// Key prefix.
        prefix: Option<String>,
    },
}

impl BackendConfig {
    /// Returns the type tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            BackendConfig::Disk { .. } => "disk",
            BackendConfig::S3 { .. } => "s3",
        }
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendConfig::Disk { dir } => f.debug_struct("Disk").field("dir", dir).finish(),
            BackendConfig::S3 {
                bucket,
                region,
                access_key_id,
                endpoint,
                prefix,
                ..
            } => f
                .debug_struct("S3")
                .field("bucket", bucket)
                .field("region", region)
                .field("static_credentials", &access_key_id.is_some())
                .field("endpoint", endpoint)
                .field("prefix", prefix)
                .finish(),
        }
    }
}

// =============================================================================
// Ring Configuration
// =============================================================================

/// Recent-history ring buffer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RingConfig {
    /// Number of recent events kept in memory.
    #[serde(default = "default_ring_capacity")]
    pub capacity: usize,
}

fn default_ring_capacity() -> usize {
    DEFAULT_RING_CAPACITY
}

impl RingConfig {
    /// Validates the ring configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.capacity == 0 {
            return Err(ConfigError::validation("ring.capacity", "cannot be zero"));
        }
        Ok(())
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_RING_CAPACITY,
        }
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the level as a filter directive.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Single-line compact text.
    Compact,
    /// JSON lines.
    Json,
}

impl LogFormat {
    /// Returns the format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        }
    }
}

// =============================================================================
// Secret Value
// =============================================================================

/// A credential that never shows up in `Debug` or `Display` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretValue(String);

impl SecretValue {
    /// Creates a new secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the plain value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "***")
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretValue(***)")
    }
}
