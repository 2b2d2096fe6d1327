// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Object store backend.
//!
//! Uploads each batch as one object. Any [`ObjectStore`] works; S3 is wired
//! through [`ObjectStoreBackend::s3`] and tests use the in-memory store.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use tracing::debug;

use spool_core::error::{BufferError, BufferResult};
use spool_core::types::SerializableEvent;

use super::StorageBackend;
use crate::codec::{encode_batch, BATCH_CONTENT_TYPE};
use crate::naming::ArtifactNamer;

// =============================================================================
// S3 Settings
// =============================================================================

/// Connection parameters for an S3-compatible bucket.
#[derive(Clone, PartialEq)]
pub struct S3Settings {
    /// Bucket name.
    pub bucket: String,
    /// AWS region.
    pub region: String,
    /// Static access key. Falls back to the ambient AWS credential chain when unset.
    pub access_key_id: Option<String>,
    /// Static secret key.
    pub secret_access_key: Option<String>,
    /// Custom endpoint (MinIO, LocalStack).
    pub endpoint: Option<String>,
    /// Key prefix prepended to every object.
    pub prefix: Option<String>,
}

impl S3Settings {
    /// Creates settings for `bucket` in `region`.
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            access_key_id: None,
            secret_access_key: None,
            endpoint: None,
            prefix: None,
        }
    }

    /// Sets static credentials.
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Sets a custom endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

impl fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Settings")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id.as_ref().map(|_| "[REDACTED]"))
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("endpoint", &self.endpoint)
            .field("prefix", &self.prefix)
            .finish()
    }
}

// =============================================================================
// ObjectStoreBackend
// =============================================================================

/// Writes batches as objects into an [`ObjectStore`].
#[derive(Debug)]
pub struct ObjectStoreBackend {
    store: Arc<dyn ObjectStore>,
    prefix: Option<ObjectPath>,
    namer: ArtifactNamer,
    name: String,
}

impl ObjectStoreBackend {
    /// Wraps an existing store.
    pub fn new(store: Arc<dyn ObjectStore>, name: impl Into<String>) -> Self {
        Self {
            store,
            prefix: None,
            namer: ArtifactNamer::new(),
            name: name.into(),
        }
    }

    /// Builds an S3 backend from `settings`.
    pub fn s3(settings: &S3Settings) -> BufferResult<Self> {
        if settings.bucket.trim().is_empty() {
            return Err(BufferError::invalid_config("s3 bucket must not be empty"));
        }

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&settings.bucket)
            .with_region(&settings.region);

        match (&settings.access_key_id, &settings.secret_access_key) {
            (Some(key), Some(secret)) => {
                builder = builder
                    .with_access_key_id(key)
                    .with_secret_access_key(secret);
            }
            (None, None) => {}
            _ => {
                return Err(BufferError::invalid_config(
                    "s3 access_key_id and secret_access_key must be set together",
                ));
            }
        }

        if let Some(endpoint) = &settings.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder.build().map_err(|e| {
            BufferError::invalid_config(format!("failed to build s3 client: {}", e))
        })?;

        let backend = Self::new(Arc::new(store), "s3");
        Ok(match &settings.prefix {
            Some(prefix) => backend.with_prefix(prefix),
            None => backend,
        })
    }

    /// Creates a backend over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()), "memory")
    }

    /// Places every object under `prefix`. An empty prefix is ignored.
    pub fn with_prefix(mut self, prefix: impl AsRef<str>) -> Self {
        let prefix = prefix.as_ref().trim_matches('/');
        self.prefix = if prefix.is_empty() {
            None
        } else {
            Some(ObjectPath::from(prefix))
        };
        self
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Returns the key prefix, if any.
    pub fn prefix(&self) -> Option<&ObjectPath> {
        self.prefix.as_ref()
    }

    fn object_path(&self, name: &str) -> ObjectPath {
        match &self.prefix {
            Some(prefix) => prefix.child(name),
            None => ObjectPath::from(name),
        }
    }
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    async fn flush(&self, batch: &[SerializableEvent]) -> BufferResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let data = encode_batch(batch)?;
        let bytes = data.len();
        let location = self.object_path(&self.namer.next_name());

        let opts = PutOptions {
            attributes: Attributes::from_iter([(Attribute::ContentType, BATCH_CONTENT_TYPE)]),
            ..Default::default()
        };

        self.store
            .put_opts(&location, PutPayload::from(data), opts)
            .await
            .map_err(|e| {
                BufferError::backend_write_with_source(
                    self.name.as_str(),
                    format!("failed to put {}", location),
                    e,
                )
            })?;

        debug!(
            backend = %self.name,
            location = %location,
            events = batch.len(),
            bytes,
            "Batch uploaded"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
