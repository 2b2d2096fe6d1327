// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Recording backend for tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use spool_core::error::{BufferError, BufferResult};
use spool_core::types::SerializableEvent;

use super::StorageBackend;

/// A backend that keeps every accepted batch in memory.
///
/// Failure and latency can be switched at runtime, which makes it useful for
/// exercising the retry and timeout paths of the controller.
#[derive(Debug, Default)]
pub struct MockBackend {
    batches: Mutex<Vec<Vec<SerializableEvent>>>,
    attempts: AtomicU64,
    should_fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl MockBackend {
    /// Creates a backend that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that rejects every flush.
    pub fn failing() -> Self {
        let backend = Self::new();
        backend.set_should_fail(true);
        backend
    }

    /// Creates a backend that sleeps for `delay` before answering.
    pub fn with_delay(delay: Duration) -> Self {
        let backend = Self::new();
        backend.set_delay(Some(delay));
        backend
    }

    /// Sets whether flushes fail.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Sets the artificial latency.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Total number of flush calls, successful or not.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Number of batches accepted.
    pub fn flush_count(&self) -> usize {
        self.batches.lock().len()
    }

    /// Copy of every accepted batch, in order.
    pub fn batches(&self) -> Vec<Vec<SerializableEvent>> {
        self.batches.lock().clone()
    }

    /// Total number of events accepted across all batches.
    pub fn events_flushed(&self) -> usize {
        self.batches.lock().iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    async fn flush(&self, batch: &[SerializableEvent]) -> BufferResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail.load(Ordering::SeqCst) {
            return Err(BufferError::backend_write("mock", "simulated failure"));
        }

        self.batches.lock().push(batch.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
