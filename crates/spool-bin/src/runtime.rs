// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Event pipeline runtime.
//!
//! Wires the loaded configuration into a storage backend, a
//! [`FlushController`] and a recent-history [`RingBuffer`], then streams
//! newline-delimited JSON events through them until end of input or a
//! shutdown signal.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tracing::{debug, info, info_span, warn};

use spool_buffer::{
    build_backend, BackendSettings, BufferMetricsCollector, FlushController,
    FlushControllerConfig, FlushStats, RingBuffer, S3Settings, StorageBackend,
};
use spool_config::{load_config, BackendConfig, BackupConfig, SpoolConfig};
use spool_core::{BufferError, Event, Payload, SerializableEvent};

use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

// =============================================================================
// Config Mapping
// =============================================================================

/// Resolves the backup section into backend settings.
pub fn backend_settings(backup: &BackupConfig) -> BinResult<BackendSettings> {
    let settings = match backup.backend()? {
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
    };
    Ok(settings)
}

/// Builds the flush controller configuration from the backup section.
pub fn controller_config(backup: &BackupConfig) -> FlushControllerConfig {
    FlushControllerConfig::builder()
        .max_buffer_size(backup.max_buffer_size)
        .flush_interval(backup.flush_interval())
        .flush_timeout(backup.flush_timeout())
        .enable_metrics(backup.enable_metrics)
        .build()
}

// =============================================================================
// Input Events
// =============================================================================

/// One line of `run` input.
///
/// Only the routing fields are required; everything else has the same
/// defaults as [`Event::new`].
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingEvent {
    /// Destination API host.
    pub api_host: String,
    /// API key.
    pub api_key: String,
    /// Dataset.
    pub dataset: String,
    /// Environment name.
    #[serde(default)]
    pub environment: String,
    /// Sample rate.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Timestamp; the time of ingestion when absent.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Payload.
    #[serde(default)]
    pub data: Payload,
}

fn default_sample_rate() -> u32 {
    1
}

impl IncomingEvent {
    /// Parses one input line.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Converts into an [`Event`] carrying `span` as its context.
    pub fn into_event(self, span: tracing::Span) -> Event {
        let event = Event::new(self.api_host, self.api_key, self.dataset)
            .with_environment(self.environment)
            .with_sample_rate(self.sample_rate)
            .with_data(self.data)
            .with_span(span);

        match self.timestamp {
            Some(ts) => event.with_timestamp(ts),
            None => event,
        }
    }
}

// =============================================================================
// Run Summary
// =============================================================================

/// What a `run` did, logged on exit.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Non-empty lines read.
    pub lines_read: u64,
    /// Lines skipped because they were not valid events.
    pub malformed: u64,
    /// Whether input stopped because of a shutdown signal.
    pub interrupted: bool,
    /// Controller statistics after the drain.
    pub stats: FlushStats,
    /// Events still held in the recent-history ring.
    pub recent: usize,
    /// Events overwritten in the recent-history ring.
    pub evicted: u64,
    /// Events that could not be delivered by the final drain.
    pub undelivered: usize,
}

// =============================================================================
// SpoolRuntime
// =============================================================================

/// Runs the event pipeline for one configuration.
pub struct SpoolRuntime {
    config: Arc<SpoolConfig>,
    backend: Option<Arc<dyn StorageBackend>>,
    shutdown: ShutdownCoordinator,
}

impl SpoolRuntime {
    /// Creates a new runtime.
    pub fn new(config: SpoolConfig) -> Self {
        Self {
            config: Arc::new(config),
            backend: None,
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Uses `backend` instead of the one described by the configuration.
    pub fn with_backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Returns the runtime's shutdown coordinator.
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SpoolConfig {
        &self.config
    }

    /// Reads events from `reader` until EOF or shutdown, then drains.
    ///
    /// A failed final drain is logged and reported in the summary, not
    /// returned as an error. Read errors are returned after the drain.
    pub async fn run<R>(self, reader: R) -> BinResult<RunSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        info!("Starting spool v{}", spool_core::VERSION);

        let components = self.initialize_components().await?;
        components.controller.start();

        let signals = tokio::spawn({
            let coordinator = self.shutdown.clone();
            async move { coordinator.wait_for_shutdown().await }
        });

        let mut summary = RunSummary {
            lines_read: 0,
            malformed: 0,
            interrupted: false,
            stats: components.controller.stats(),
            recent: 0,
            evicted: 0,
            undelivered: 0,
        };

        let read_result = self.ingest(reader, &components, &mut summary).await;
        signals.abort();

        if let Err(e) = components.controller.close().await {
            warn!(error = %e, "Final drain failed");
        }

        summary.stats = components.controller.stats();
        summary.recent = components.recent.len();
        summary.evicted = components.recent.evicted();
        summary.undelivered = components.controller.len();

        info!(
            lines = summary.lines_read,
            malformed = summary.malformed,
            saved = summary.stats.events_saved,
            flushed = summary.stats.events_flushed,
            flushes = summary.stats.flush_successes,
            failed_flushes = summary.stats.flush_failures,
            undelivered = summary.undelivered,
            recent = summary.recent,
            evicted = summary.evicted,
            interrupted = summary.interrupted,
            "spool run complete"
        );

        read_result.map(|()| summary)
    }

    async fn initialize_components(&self) -> BinResult<RuntimeComponents> {
        let backup = &self.config.backup;

        let backend = match &self.backend {
            Some(backend) => backend.clone(),
            None => build_backend(&backend_settings(backup)?).await?,
        };

        let controller = FlushController::with_shared(backend, controller_config(backup))?;
        let recent = RingBuffer::new(self.config.ring.capacity)?
            .with_metrics(BufferMetricsCollector::new(backup.enable_metrics));

        info!(
            backend = controller.backend().name(),
            max_buffer_size = backup.max_buffer_size,
            flush_interval_ms = backup.flush_interval_ms,
            ring_capacity = recent.capacity(),
            "Pipeline initialized"
        );

        Ok(RuntimeComponents { controller, recent })
    }

    async fn ingest<R>(
        &self,
        reader: R,
        components: &RuntimeComponents,
        summary: &mut RunSummary,
    ) -> BinResult<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let signal = self.shutdown.shutdown_signal().wait();
        tokio::pin!(signal);

        loop {
            let line = tokio::select! {
                biased;
                _ = &mut signal => {
                    info!("Shutdown requested, stopping input");
                    summary.interrupted = true;
                    return Ok(());
                }
                line = lines.next_line() => line,
            };

            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("End of input");
                    return Ok(());
                }
                Err(e) => return Err(BinError::from(e).with_context("reading events")),
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            summary.lines_read += 1;

            let incoming = match IncomingEvent::parse(line) {
                Ok(incoming) => incoming,
                Err(e) => {
                    summary.malformed += 1;
                    warn!(line = summary.lines_read, error = %e, "Skipping malformed event");
                    continue;
                }
            };

            let span = info_span!("event", line = summary.lines_read, dataset = %incoming.dataset);
            let event = incoming.into_event(span);
            components.recent.push(SerializableEvent::from(event.clone()));

            match components.controller.save(event).await {
                Ok(()) => {}
                Err(BufferError::Closed) => return Ok(()),
                // The event is buffered; the batch is retried on the next trigger.
                Err(e) => warn!(error = %e, "Flush failed, keeping batch"),
            }
        }
    }
}

/// Components built for one run.
struct RuntimeComponents {
    controller: FlushController,
    recent: RingBuffer<SerializableEvent>,
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for constructing the runtime.
#[derive(Default)]
pub struct RuntimeBuilder {
    config_path: Option<PathBuf>,
    config: Option<SpoolConfig>,
    backend: Option<Arc<dyn StorageBackend>>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration file path.
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the configuration directly.
    pub fn config(mut self, config: SpoolConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the configured backend.
    pub fn backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> BinResult<SpoolRuntime> {
        let config = match self.config {
            Some(config) => {
                config.validate()?;
                config
            }
            None => {
                let path = self
                    .config_path
                    .ok_or_else(|| BinError::config("No configuration provided"))?;

                load_config(&path).map_err(|e| {
                    BinError::from(e).with_context(format!("loading {}", path.display()))
                })?
            }
        };

        let runtime = SpoolRuntime::new(config);
        Ok(match self.backend {
            Some(backend) => runtime.with_backend(backend),
            None => runtime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spool_buffer::{decode_batch, MockBackend};
    use spool_config::SecretValue;
    use std::time::Duration;

    const LINES: &str = concat!(
        r#"{"api_host":"https://api.example.com","api_key":"k","dataset":"web","data":{"n":1}}"#,
        "\n",
        "not json\n",
        "\n",
        r#"{"api_host":"https://api.example.com","api_key":"k","dataset":"web","sample_rate":4,"timestamp":"2024-03-01T12:00:00Z","data":{"n":2}}"#,
        "\n",
    );

    fn disk_config(dir: &Path, max_buffer_size: usize) -> SpoolConfig {
        let mut config = SpoolConfig::default();
        config.backup.dir = dir.to_path_buf();
        config.backup.max_buffer_size = max_buffer_size;
        config.backup.enable_metrics = false;
        config.ring.capacity = 1;
        config
    }

    #[test]
    fn test_backend_settings_disk() {
        let backup = BackupConfig {
            dir: PathBuf::from("/var/lib/spool"),
            ..Default::default()
        };
        assert_eq!(
            backend_settings(&backup).unwrap(),
            BackendSettings::disk("/var/lib/spool")
        );
    }

    #[test]
    fn test_backend_settings_s3() {
        let backup = BackupConfig {
            backend_type: "s3".to_string(),
            bucket: Some("events".to_string()),
            region: "eu-west-1".to_string(),
            access_key_id: Some(SecretValue::new("AKID")),
            secret_access_key: Some(SecretValue::new("secret")),
            endpoint: Some("http://localhost:9000".to_string()),
            prefix: Some("backup".to_string()),
            ..Default::default()
        };

        let expected = S3Settings::new("events", "eu-west-1")
            .with_credentials("AKID", "secret")
            .with_endpoint("http://localhost:9000")
            .with_prefix("backup");
        assert_eq!(backend_settings(&backup).unwrap(), BackendSettings::S3(expected));
    }

    #[test]
    fn test_backend_settings_unknown_type() {
        let backup = BackupConfig {
            backend_type: "gcs".to_string(),
            ..Default::default()
        };
        let err = backend_settings(&backup).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_controller_config_mapping() {
        let backup = BackupConfig {
            flush_interval_ms: 250,
            max_buffer_size: 7,
            flush_timeout_secs: 3,
            enable_metrics: false,
            ..Default::default()
        };
        let config = controller_config(&backup);
        assert_eq!(config.max_buffer_size, 7);
        assert_eq!(config.flush_interval, Duration::from_millis(250));
        assert_eq!(config.flush_timeout, Duration::from_secs(3));
        assert!(!config.enable_metrics);
    }

    #[test]
    fn test_incoming_event_defaults() {
        let incoming =
            IncomingEvent::parse(r#"{"api_host":"h","api_key":"k","dataset":"d"}"#).unwrap();
        assert_eq!(incoming.sample_rate, 1);
        assert!(incoming.timestamp.is_none());

        let event = incoming.into_event(tracing::Span::none());
        assert_eq!(event.dataset, "d");
        assert!(event.data.is_empty());
    }

    #[test]
    fn test_incoming_event_requires_routing_fields() {
        assert!(IncomingEvent::parse(r#"{"api_host":"h","api_key":"k"}"#).is_err());
    }

    #[test]
    fn test_builder_requires_config() {
        assert!(RuntimeBuilder::new().build().is_err());
    }

    #[test]
    fn test_builder_validates_direct_config() {
        let mut config = SpoolConfig::default();
        config.ring.capacity = 0;
        assert!(RuntimeBuilder::new().config(config).build().is_err());
    }

    #[tokio::test]
    async fn test_run_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = RuntimeBuilder::new()
            .config(disk_config(dir.path(), 100))
            .build()
            .unwrap();

        let summary = runtime.run(LINES.as_bytes()).await.unwrap();

        assert_eq!(summary.lines_read, 3);
        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.stats.events_saved, 2);
        assert_eq!(summary.stats.events_flushed, 2);
        assert_eq!(summary.undelivered, 0);
        assert_eq!(summary.recent, 1);
        assert_eq!(summary.evicted, 1);
        assert!(!summary.interrupted);

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);

        let events = decode_batch(&std::fs::read(&files[0]).unwrap()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data["n"], 1);
        assert_eq!(events[1].sample_rate, 4);
    }

    #[tokio::test]
    async fn test_run_with_failing_backend_reports_undelivered() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = RuntimeBuilder::new()
            .config(disk_config(dir.path(), 1))
            .backend(Arc::new(MockBackend::failing()))
            .build()
            .unwrap();

        let summary = runtime.run(LINES.as_bytes()).await.unwrap();

        assert_eq!(summary.stats.events_saved, 2);
        assert_eq!(summary.stats.events_flushed, 0);
        assert_eq!(summary.undelivered, 2);
        assert!(summary.stats.flush_failures >= 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let backend = Arc::new(MockBackend::new());
        let dir = tempfile::tempdir().unwrap();
        let runtime = RuntimeBuilder::new()
            .config(disk_config(dir.path(), 100))
            .backend(backend.clone())
            .build()
            .unwrap();

        // A reader that never yields a line.
        let (_writer, reader) = tokio::io::duplex(64);
        let reader = tokio::io::BufReader::new(reader);

        let coordinator = runtime.shutdown().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            coordinator.initiate_shutdown();
        });

        let summary = tokio::time::timeout(Duration::from_secs(2), runtime.run(reader))
            .await
            .expect("run should stop on shutdown")
            .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.lines_read, 0);
        assert_eq!(backend.flush_count(), 0);
    }
}
