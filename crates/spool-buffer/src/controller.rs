// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Batching flush controller.
//!
//! The [`FlushController`] accumulates events in memory and hands them to a
//! [`StorageBackend`] in batches. A batch is flushed when either trigger
//! fires:
//!
//! - **Size**: `save` brings the batch to `max_buffer_size` events
//! - **Time**: the periodic task sees the last flush attempt is at least
//!   `flush_interval` old and the batch is non-empty
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     FlushController                      │
//! │                                                          │
//! │  save() ──▶ ┌─────────────────┐      ┌────────────────┐  │
//! │             │  batch (Mutex)  │─────▶│ StorageBackend │  │
//! │  tick  ───▶ │ events+metadata │      │ (disk / s3)    │  │
//! │             └─────────────────┘      └────────────────┘  │
//! │                       ▲                                  │
//! │  close() ── drain ────┘                                  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The batch lock is held for the whole backend call, so flushes never run
//! concurrently and a `save` arriving mid-flush waits for it. Every backend
//! call is bounded by `flush_timeout`.
//!
//! The batch is cleared only after the backend reports success. On failure
//! the events stay, their retry metadata is bumped, and the next trigger
//! offers the whole batch again.
//!
//! # Example
//!
//! ```rust,ignore
//! use spool_buffer::{DiskBackend, FlushController, FlushControllerConfig};
//!
//! let backend = DiskBackend::open("/var/spool/events").await?;
//! let controller = FlushController::new(backend, FlushControllerConfig::default())?;
//! controller.start();
//!
//! controller.save(event).await?;
//!
//! // Drain on shutdown
//! controller.close().await?;
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex as SyncMutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use spool_core::error::{BufferError, BufferResult};
use spool_core::types::{BufferedEvent, Event, EventMetadata, SerializableEvent};

use crate::backend::StorageBackend;
use crate::metrics::{BufferMetricsCollector, FlushTimer, FlushTrigger};
use crate::stats::{FlushStats, FlushStatsInner};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for a flush controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlushControllerConfig {
    /// Batch size that triggers an immediate flush.
    #[serde(default = "default_max_buffer_size")]
    pub max_buffer_size: usize,

    /// Period of the time trigger, also the retry delay recorded on failure.
    #[serde(default = "default_flush_interval")]
    #[serde(with = "duration_millis")]
    pub flush_interval: Duration,

    /// Upper bound on a single backend call.
    #[serde(default = "default_flush_timeout")]
    #[serde(with = "duration_millis")]
    pub flush_timeout: Duration,

    /// Whether to export Prometheus metrics.
    #[serde(default = "default_enable_metrics")]
    pub enable_metrics: bool,
}

fn default_max_buffer_size() -> usize {
    100
}

fn default_flush_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_flush_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_enable_metrics() -> bool {
    true
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

impl Default for FlushControllerConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: default_max_buffer_size(),
            flush_interval: default_flush_interval(),
            flush_timeout: default_flush_timeout(),
            enable_metrics: default_enable_metrics(),
        }
    }
}

impl FlushControllerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> FlushControllerConfigBuilder {
        FlushControllerConfigBuilder::default()
    }

    /// Creates a configuration for testing.
    pub fn for_testing() -> Self {
        Self {
            max_buffer_size: 10,
            flush_interval: Duration::from_millis(100),
            flush_timeout: Duration::from_secs(2),
            enable_metrics: false,
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> BufferResult<()> {
        if self.max_buffer_size == 0 {
            return Err(BufferError::invalid_config(
                "max_buffer_size must be at least 1",
            ));
        }
        if self.flush_interval.is_zero() {
            return Err(BufferError::invalid_config(
                "flush_interval must be greater than zero",
            ));
        }
        if self.flush_timeout.is_zero() {
            return Err(BufferError::invalid_config(
                "flush_timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Builder for [`FlushControllerConfig`].
#[derive(Debug, Default)]
pub struct FlushControllerConfigBuilder {
    config: FlushControllerConfig,
}

impl FlushControllerConfigBuilder {
    /// Sets the size trigger.
    pub fn max_buffer_size(mut self, size: usize) -> Self {
        self.config.max_buffer_size = size;
        self
    }

    /// Sets the flush interval.
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.flush_interval = interval;
        self
    }

    /// Sets the backend call timeout.
    pub fn flush_timeout(mut self, timeout: Duration) -> Self {
        self.config.flush_timeout = timeout;
        self
    }

    /// Enables or disables metrics.
    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.config.enable_metrics = enable;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> FlushControllerConfig {
        self.config
    }
}

// =============================================================================
// Controller State
// =============================================================================

/// Pending batch, guarded by the controller's async mutex.
#[derive(Debug)]
struct BatchState {
    events: Vec<SerializableEvent>,
    metadata: Vec<EventMetadata>,
    /// Time of the last flush attempt (or construction).
    last_flush: Instant,
}

impl BatchState {
    fn new(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
            metadata: Vec::with_capacity(capacity),
            last_flush: Instant::now(),
        }
    }

    fn push(&mut self, event: SerializableEvent) {
        self.events.push(event);
        self.metadata.push(EventMetadata::default());
    }

    fn clear(&mut self) {
        self.events.clear();
        self.metadata.clear();
    }

    fn len(&self) -> usize {
        self.events.len()
    }

    fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[derive(Debug)]
struct ControllerInner {
    backend: Arc<dyn StorageBackend>,
    config: FlushControllerConfig,
    state: Mutex<BatchState>,
    /// Mirrors `state.len()` for lock-free reads.
    pending: AtomicUsize,
    closed: AtomicBool,
    stats: FlushStatsInner,
    metrics: BufferMetricsCollector,
}

impl ControllerInner {
    /// Flushes the batch. The caller holds the batch lock.
    async fn flush_locked(&self, state: &mut BatchState, trigger: FlushTrigger) -> BufferResult<()> {
        if state.is_empty() {
            return Ok(());
        }

        let count = state.len();
        let backend = self.backend.name();

        self.stats.record_attempt();
        self.metrics.record_flush_attempt(trigger);
        let timer = FlushTimer::start(&self.metrics);

        let result = match tokio::time::timeout(
            self.config.flush_timeout,
            self.backend.flush(&state.events),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(BufferError::timeout(backend, self.config.flush_timeout)),
        };

        state.last_flush = Instant::now();

        match &result {
            Ok(()) => {
                state.clear();
                self.pending.store(0, Ordering::SeqCst);
                self.stats.record_success(count as u64);
                self.metrics.set_pending(0);
                let duration = timer.success(count);

                debug!(
                    backend,
                    trigger = %trigger,
                    events = count,
                    duration_ms = (duration * 1000.0) as u64,
                    "Batch flushed"
                );
            }
            Err(e) => {
                for meta in state.metadata.iter_mut() {
                    meta.record_failure(self.config.flush_interval);
                }
                self.stats.record_failure();
                timer.failure(e.error_type());

                warn!(
                    backend,
                    trigger = %trigger,
                    events = count,
                    retry_count = state.metadata.first().map(|m| m.retry_count).unwrap_or(0),
                    error = %e,
                    "Batch flush failed, events kept for retry"
                );
            }
        }

        result
    }

    /// Time trigger: flushes if the batch is non-empty and stale.
    async fn flush_if_due(&self) {
        let mut state = self.state.lock().await;

        if state.is_empty() || state.last_flush.elapsed() < self.config.flush_interval {
            return;
        }

        // Failure is already logged and the batch kept.
        let _ = self.flush_locked(&mut state, FlushTrigger::Interval).await;
    }
}

// =============================================================================
// FlushController
// =============================================================================

/// Batches events and flushes them to a storage backend.
pub struct FlushController {
    inner: Arc<ControllerInner>,
    shutdown: Arc<Notify>,
    running: Arc<AtomicBool>,
    task: SyncMutex<Option<JoinHandle<()>>>,
}

impl FlushController {
    /// Creates a controller that owns `backend`.
    ///
    /// The periodic task is not started; call [`FlushController::start`].
    pub fn new<B>(backend: B, config: FlushControllerConfig) -> BufferResult<Self>
    where
        B: StorageBackend + 'static,
    {
        Self::with_shared(Arc::new(backend), config)
    }

    /// Creates a controller over a shared backend.
    pub fn with_shared(
        backend: Arc<dyn StorageBackend>,
        config: FlushControllerConfig,
    ) -> BufferResult<Self> {
        config.validate()?;

        let metrics =
            BufferMetricsCollector::new(config.enable_metrics).with_backend(backend.name());
        let state = BatchState::new(config.max_buffer_size);

        Ok(Self {
            inner: Arc::new(ControllerInner {
                backend,
                config,
                state: Mutex::new(state),
                pending: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
                stats: FlushStatsInner::new(),
                metrics,
            }),
            shutdown: Arc::new(Notify::new()),
            running: Arc::new(AtomicBool::new(false)),
            task: SyncMutex::new(None),
        })
    }

    /// Starts the periodic flush task.
    ///
    /// Returns `false` if the task was already started or the controller is
    /// closed. Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        let mut task = self.task.lock();
        if task.is_some() || self.is_closed() {
            return false;
        }

        self.running.store(true, Ordering::SeqCst);

        let inner = self.inner.clone();
        let shutdown = self.shutdown.clone();
        let running = self.running.clone();
        let period = inner.config.flush_interval;

        *task = Some(tokio::spawn(async move {
            info!(
                backend = inner.backend.name(),
                interval_ms = period.as_millis() as u64,
                max_buffer_size = inner.config.max_buffer_size,
                "Flush loop started"
            );

            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if !running.load(Ordering::SeqCst) {
                            break;
                        }
                        inner.flush_if_due().await;
                    }
                    _ = shutdown.notified() => {
                        debug!("Flush loop received shutdown signal");
                        break;
                    }
                }
            }

            running.store(false, Ordering::SeqCst);
            info!(backend = inner.backend.name(), "Flush loop stopped");
        }));

        true
    }

    /// Adds an event to the batch, flushing inline if the size trigger fires.
    ///
    /// A flush failure is returned to the caller, but the event has been
    /// accepted and stays buffered for retry.
    pub async fn save(&self, event: Event) -> BufferResult<()> {
        trace!(parent: &event.span, dataset = %event.dataset, "Buffering event");
        let event = SerializableEvent::from(event);

        let mut state = self.inner.state.lock().await;
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(BufferError::Closed);
        }

        state.push(event);
        let pending = state.len();
        self.inner.pending.store(pending, Ordering::SeqCst);
        self.inner.stats.record_saved();
        self.inner.metrics.record_event_saved();
        self.inner.metrics.set_pending(pending);

        if pending >= self.inner.config.max_buffer_size {
            return self.inner.flush_locked(&mut state, FlushTrigger::Size).await;
        }

        Ok(())
    }

    /// Flushes the current batch regardless of either trigger.
    pub async fn flush_now(&self) -> BufferResult<()> {
        let mut state = self.inner.state.lock().await;
        self.inner.flush_locked(&mut state, FlushTrigger::Manual).await
    }

    /// Stops the periodic task and drains the batch.
    ///
    /// After the first call, `save` returns [`BufferError::Closed`]. Calling
    /// `close` again retries the drain if the previous one failed and is a
    /// no-op otherwise.
    pub async fn close(&self) -> BufferResult<()> {
        let first_close = {
            let _state = self.inner.state.lock().await;
            !self.inner.closed.swap(true, Ordering::SeqCst)
        };

        if first_close {
            self.stop_task().await;
        }

        let mut state = self.inner.state.lock().await;
        let pending = state.len();
        let result = self.inner.flush_locked(&mut state, FlushTrigger::Close).await;

        match &result {
            Ok(()) => info!(
                backend = self.inner.backend.name(),
                drained = pending,
                "Flush controller closed"
            ),
            Err(e) => warn!(
                backend = self.inner.backend.name(),
                pending,
                error = %e,
                "Flush controller closed with undelivered events"
            ),
        }

        result
    }

    async fn stop_task(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();

        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Flush loop terminated abnormally");
            }
        }
    }

    /// Returns the number of events waiting in the batch (O(1)).
    pub fn len(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    /// Returns true if the batch is empty (O(1)).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy of the pending batch with its retry metadata.
    pub async fn snapshot(&self) -> Vec<BufferedEvent> {
        let state = self.inner.state.lock().await;
        state
            .events
            .iter()
            .zip(state.metadata.iter())
            .map(|(event, metadata)| BufferedEvent {
                event: event.clone(),
                metadata: *metadata,
            })
            .collect()
    }

    /// Returns the flush statistics.
    pub fn stats(&self) -> FlushStats {
        self.inner.stats.snapshot()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FlushControllerConfig {
        &self.inner.config
    }

    /// Returns the backend.
    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.inner.backend
    }

    /// Returns true if the periodic task is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns true once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl Drop for FlushController {
    fn drop(&mut self) {
        if self.task.get_mut().is_some() {
            self.running.store(false, Ordering::SeqCst);
            self.shutdown.notify_one();
        }

        let pending = self.len();
        if pending > 0 {
            warn!(
                backend = self.inner.backend.name(),
                pending,
                "Flush controller dropped without close, pending events lost"
            );
        }
    }
}

impl std::fmt::Debug for FlushController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushController")
            .field("backend", &self.inner.backend.name())
            .field("pending", &self.len())
            .field("running", &self.is_running())
            .field("closed", &self.is_closed())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
