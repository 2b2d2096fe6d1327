// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Lock-free flush statistics.
//!
//! Counters are updated with relaxed atomics from both trigger paths and read
//! through [`FlushStatsInner::snapshot`] without touching the batch lock.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Atomic flush counters owned by a controller.
#[derive(Debug, Default)]
pub struct FlushStatsInner {
    /// Events accepted by `save`.
    pub events_saved: AtomicU64,
    /// Events confirmed written by the backend.
    pub events_flushed: AtomicU64,
    /// Flush attempts (successful + failed).
    pub flush_attempts: AtomicU64,
    /// Successful flushes.
    pub flush_successes: AtomicU64,
    /// Failed flushes (errors and timeouts).
    pub flush_failures: AtomicU64,
    /// Last flush attempt (unix nanos, 0 = never).
    pub last_flush_timestamp: AtomicI64,
}

impl FlushStatsInner {
    /// Creates new statistics with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an accepted event.
    #[inline]
    pub fn record_saved(&self) {
        self.events_saved.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a flush attempt.
    #[inline]
    pub fn record_attempt(&self) {
        self.flush_attempts.fetch_add(1, Ordering::Relaxed);
        self.last_flush_timestamp
            .store(Utc::now().timestamp_nanos_opt().unwrap_or(0), Ordering::Relaxed);
    }

    /// Records a successful flush of `count` events.
    #[inline]
    pub fn record_success(&self, count: u64) {
        self.flush_successes.fetch_add(1, Ordering::Relaxed);
        self.events_flushed.fetch_add(count, Ordering::Relaxed);
    }

    /// Records a failed flush.
    #[inline]
    pub fn record_failure(&self) {
        self.flush_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Creates a snapshot of the statistics.
    pub fn snapshot(&self) -> FlushStats {
        let last_flush_nanos = self.last_flush_timestamp.load(Ordering::Relaxed);

        FlushStats {
            events_saved: self.events_saved.load(Ordering::Relaxed),
            events_flushed: self.events_flushed.load(Ordering::Relaxed),
            flush_attempts: self.flush_attempts.load(Ordering::Relaxed),
            flush_successes: self.flush_successes.load(Ordering::Relaxed),
            flush_failures: self.flush_failures.load(Ordering::Relaxed),
            last_flush: if last_flush_nanos > 0 {
                Some(DateTime::from_timestamp_nanos(last_flush_nanos))
            } else {
                None
            },
        }
    }
}

/// Immutable snapshot of flush statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlushStats {
    /// Events accepted by `save`.
    pub events_saved: u64,
    /// Events confirmed written by the backend.
    pub events_flushed: u64,
    /// Flush attempts.
    pub flush_attempts: u64,
    /// Successful flushes.
    pub flush_successes: u64,
    /// Failed flushes.
    pub flush_failures: u64,
    /// Time of the last flush attempt.
    pub last_flush: Option<DateTime<Utc>>,
}

impl FlushStats {
    /// Returns the flush success rate (1.0 when nothing was attempted).
    pub fn flush_success_rate(&self) -> f64 {
        let total = self.flush_successes + self.flush_failures;
        if total == 0 {
            return 1.0;
        }
        self.flush_successes as f64 / total as f64
    }

    /// Returns the time since the last flush attempt.
    pub fn time_since_last_flush(&self) -> Option<chrono::Duration> {
        self.last_flush.map(|ts| Utc::now() - ts)
    }
}
