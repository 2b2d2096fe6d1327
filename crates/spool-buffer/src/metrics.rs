// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Prometheus metrics for the buffer subsystem.
//!
//! | Metric | Type | Description |
//! |--------|------|-------------|
//! | `spool_events_saved_total` | Counter | Events accepted by a flush controller |
//! | `spool_events_flushed_total` | Counter | Events confirmed written by a backend |
//! | `spool_pending_events` | GaugeVec | Events waiting in the flush batch, by backend |
//! | `spool_flush_total` | CounterVec | Flush attempts by trigger |
//! | `spool_flush_success_total` | Counter | Successful flushes |
//! | `spool_flush_errors_total` | CounterVec | Failed flushes by error type |
//! | `spool_flush_duration_seconds` | Histogram | Backend call duration |
//! | `spool_ring_evictions_total` | Counter | Ring buffer overwrites |

use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge_vec, register_histogram, Counter,
    CounterVec, GaugeVec, Histogram,
};

// =============================================================================
// Metric Definitions
// =============================================================================

static EVENTS_SAVED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "spool_events_saved_total",
        "Total number of events accepted by a flush controller"
    )
    .expect("Failed to register events_saved_total metric")
});

static EVENTS_FLUSHED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "spool_events_flushed_total",
        "Total number of events confirmed written by a backend"
    )
    .expect("Failed to register events_flushed_total metric")
});

static PENDING_EVENTS: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "spool_pending_events",
        "Number of events waiting in the flush batch by backend",
        &["backend"]
    )
    .expect("Failed to register pending_events metric")
});

static FLUSH_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "spool_flush_total",
        "Total number of flush attempts by trigger",
        &["trigger"]
    )
    .expect("Failed to register flush_total metric")
});

static FLUSH_SUCCESS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "spool_flush_success_total",
        "Total number of successful flush operations"
    )
    .expect("Failed to register flush_success_total metric")
});

static FLUSH_ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "spool_flush_errors_total",
        "Total number of flush errors by type",
        &["error_type"]
    )
    .expect("Failed to register flush_errors metric")
});

static FLUSH_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "spool_flush_duration_seconds",
        "Duration of backend flush calls in seconds",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("Failed to register flush_duration metric")
});

static RING_EVICTIONS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "spool_ring_evictions_total",
        "Total number of ring buffer entries overwritten before being read"
    )
    .expect("Failed to register ring_evictions_total metric")
});

// =============================================================================
// Flush Trigger
// =============================================================================

/// What caused a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// The batch reached `max_buffer_size` inside `save`.
    Size,
    /// The periodic task found the batch older than `flush_interval`.
    Interval,
    /// An explicit `flush_now` call.
    Manual,
    /// The drain performed by `close`.
    Close,
}

impl FlushTrigger {
    /// Returns the trigger as a label value.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushTrigger::Size => "size",
            FlushTrigger::Interval => "interval",
            FlushTrigger::Manual => "manual",
            FlushTrigger::Close => "close",
        }
    }
}

impl std::fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Metrics Collector
// =============================================================================

/// Label used for per-backend series when no backend was named.
const UNNAMED_BACKEND: &str = "unnamed";

/// Records buffer metrics, or does nothing when disabled.
#[derive(Debug, Clone, Default)]
pub struct BufferMetricsCollector {
    enabled: bool,
    backend: Option<Arc<str>>,
}

impl BufferMetricsCollector {
    /// Creates a new metrics collector.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            backend: None,
        }
    }

    /// Creates a disabled metrics collector (no-op).
    pub fn disabled() -> Self {
        Self::new(false)
    }

    /// Labels per-backend series (the pending gauge) with `backend`.
    pub fn with_backend(mut self, backend: &str) -> Self {
        self.backend = Some(Arc::from(backend));
        self
    }

    /// Returns the backend label of per-backend series.
    pub fn backend(&self) -> &str {
        self.backend.as_deref().unwrap_or(UNNAMED_BACKEND)
    }

    /// Returns whether metrics collection is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Records an accepted event.
    pub fn record_event_saved(&self) {
        if !self.enabled {
            return;
        }
        EVENTS_SAVED_TOTAL.inc();
    }

    /// Updates this backend's pending events gauge.
    pub fn set_pending(&self, pending: usize) {
        if !self.enabled {
            return;
        }
        PENDING_EVENTS
            .with_label_values(&[self.backend()])
            .set(pending as f64);
    }

    /// Records a flush attempt.
    pub fn record_flush_attempt(&self, trigger: FlushTrigger) {
        if !self.enabled {
            return;
        }
        FLUSH_TOTAL.with_label_values(&[trigger.as_str()]).inc();
    }

    /// Records a successful flush.
    pub fn record_flush_success(&self, events: usize, duration_secs: f64) {
        if !self.enabled {
            return;
        }
        FLUSH_SUCCESS_TOTAL.inc();
        EVENTS_FLUSHED_TOTAL.inc_by(events as f64);
        FLUSH_DURATION.observe(duration_secs);
    }

    /// Records a flush error.
    pub fn record_flush_error(&self, error_type: &str, duration_secs: f64) {
        if !self.enabled {
            return;
        }
        FLUSH_ERRORS.with_label_values(&[error_type]).inc();
        FLUSH_DURATION.observe(duration_secs);
    }

    /// Records a ring buffer eviction.
    pub fn record_ring_eviction(&self) {
        if !self.enabled {
            return;
        }
        RING_EVICTIONS_TOTAL.inc();
    }
}

// =============================================================================
// Flush Timer
// =============================================================================

/// Measures one backend call and records its outcome.
pub struct FlushTimer<'a> {
    collector: &'a BufferMetricsCollector,
    start: Instant,
}

impl<'a> FlushTimer<'a> {
    /// Starts timing a flush.
    pub fn start(collector: &'a BufferMetricsCollector) -> Self {
        Self {
            collector,
            start: Instant::now(),
        }
    }

    /// Elapsed time since the timer started, in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Records a successful flush of `events` events.
    pub fn success(self, events: usize) -> f64 {
        let duration = self.elapsed_secs();
        self.collector.record_flush_success(events, duration);
        duration
    }

    /// Records a failed flush.
    pub fn failure(self, error_type: &str) -> f64 {
        let duration = self.elapsed_secs();
        self.collector.record_flush_error(error_type, duration);
        duration
    }
}

// =============================================================================
// Tests
// =============================================================================
