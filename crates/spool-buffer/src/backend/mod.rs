// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Storage backends for flushed batches.
//!
//! A backend persists one batch per call and reports success or failure; it
//! never retries on its own. Retry is driven by the flush controller, which
//! keeps a failed batch and offers it again on the next trigger.
//!
//! | Backend | Tag | Artifact |
//! |---------|-----|----------|
//! | [`DiskBackend`] | `disk` | one file per batch in a directory |
//! | [`ObjectStoreBackend`] | `s3` | one object per batch in a bucket |
//!
//! Backends are picked at runtime from [`BackendSettings`] through
//! [`build_backend`].

mod disk;
mod mock;
mod object;

pub use disk::DiskBackend;
pub use mock::MockBackend;
pub use object::{ObjectStoreBackend, S3Settings};

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use spool_core::error::{BufferError, BufferResult};
use spool_core::types::SerializableEvent;

// =============================================================================
// StorageBackend Trait
// =============================================================================

/// Durable destination for event batches.
///
/// Implementations must be safe to call from the size trigger and the
/// periodic task; the controller never calls `flush` concurrently on the same
/// instance, but a backend may be shared between controllers.
#[async_trait]
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Persists `batch` as a single artifact.
    ///
    /// Returns `Ok(())` only once the artifact is durably written. An empty
    /// batch is a no-op.
    async fn flush(&self, batch: &[SerializableEvent]) -> BufferResult<()>;

    /// Short name used in logs, metrics and error messages.
    fn name(&self) -> &str;
}

// =============================================================================
// Backend Selection
// =============================================================================

/// Backend type tag as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Local directory.
    Disk,
    /// S3-compatible object store.
    S3,
}

impl BackendKind {
    /// Returns the configuration tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Disk => "disk",
            BackendKind::S3 => "s3",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = BufferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disk" => Ok(BackendKind::Disk),
            "s3" => Ok(BackendKind::S3),
            other => Err(BufferError::invalid_config(format!(
                "unknown backend type '{}' (expected 'disk' or 's3')",
                other
            ))),
        }
    }
}

/// Fully resolved parameters of one backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendSettings {
    /// Write batches into `dir`.
    Disk {
        /// Target directory, created if missing.
        dir: PathBuf,
    },
    /// Upload batches to an S3 bucket.
    S3(S3Settings),
}

impl BackendSettings {
    /// Disk settings for `dir`.
    pub fn disk(dir: impl Into<PathBuf>) -> Self {
        BackendSettings::Disk { dir: dir.into() }
    }

    /// Returns the type tag of these settings.
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendSettings::Disk { .. } => BackendKind::Disk,
            BackendSettings::S3(_) => BackendKind::S3,
        }
    }
}

/// Builds the backend described by `settings`.
pub async fn build_backend(settings: &BackendSettings) -> BufferResult<Arc<dyn StorageBackend>> {
    let backend: Arc<dyn StorageBackend> = match settings {
        BackendSettings::Disk { dir } => Arc::new(DiskBackend::open(dir).await?),
        BackendSettings::S3(s3) => Arc::new(ObjectStoreBackend::s3(s3)?),
    };

    info!(backend = backend.name(), kind = %settings.kind(), "Storage backend ready");
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!("disk".parse::<BackendKind>().unwrap(), BackendKind::Disk);
        assert_eq!("S3".parse::<BackendKind>().unwrap(), BackendKind::S3);
        assert_eq!(" s3 ".parse::<BackendKind>().unwrap(), BackendKind::S3);
    }

    #[test]
    fn test_unknown_backend_kind_rejected() {
        let err = "gcs".parse::<BackendKind>().unwrap_err();
        assert!(matches!(err, BufferError::InvalidConfig { .. }));
        assert!(err.to_string().contains("gcs"));
    }

    #[test]
    fn test_settings_kind() {
        assert_eq!(BackendSettings::disk("/tmp/x").kind(), BackendKind::Disk);
        assert_eq!(
            BackendSettings::S3(S3Settings::new("bucket", "us-east-1")).kind(),
            BackendKind::S3
        );
    }

    #[tokio::test]
    async fn test_build_disk_backend_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("backup");

        let backend = build_backend(&BackendSettings::disk(&dir)).await.unwrap();
        assert_eq!(backend.name(), "disk");
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_build_s3_backend() {
        let settings = S3Settings::new("spool-test", "us-east-1")
            .with_credentials("AKIDEXAMPLE", "secret")
            .with_endpoint("http://localhost:9000");

        let backend = build_backend(&BackendSettings::S3(settings)).await.unwrap();
        assert_eq!(backend.name(), "s3");
    }
}
