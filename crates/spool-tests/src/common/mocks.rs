// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! Storage backends with scripted outcomes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use spool_buffer::StorageBackend;
use spool_core::{BufferError, BufferResult, SerializableEvent};

/// Outcome of one scripted flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Accept the batch.
    Accept,
    /// Reject the batch.
    Reject,
}

/// A backend that plays back a script of outcomes, then accepts everything.
///
/// Every attempted batch is recorded, accepted or not.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<FlushOutcome>>,
    attempted: Mutex<Vec<Vec<SerializableEvent>>>,
    accepted: Mutex<Vec<Vec<SerializableEvent>>>,
    attempts: AtomicU64,
}

impl ScriptedBackend {
    /// Creates a backend that accepts every batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that rejects the first `n` batches.
    pub fn failing_first(n: usize) -> Self {
        Self::with_script(std::iter::repeat(FlushOutcome::Reject).take(n))
    }

    /// Creates a backend that follows `script`.
    pub fn with_script(script: impl IntoIterator<Item = FlushOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Number of flush calls.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Every batch handed to the backend.
    pub fn attempted(&self) -> Vec<Vec<SerializableEvent>> {
        self.attempted.lock().clone()
    }

    /// Batches that were accepted.
    pub fn accepted(&self) -> Vec<Vec<SerializableEvent>> {
        self.accepted.lock().clone()
    }

    /// Accepted events, flattened in delivery order.
    pub fn delivered(&self) -> Vec<SerializableEvent> {
        self.accepted.lock().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl StorageBackend for ScriptedBackend {
    async fn flush(&self, events: &[SerializableEvent]) -> BufferResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.attempted.lock().push(events.to_vec());

        let outcome = self
            .script
            .lock()
            .pop_front()
            .unwrap_or(FlushOutcome::Accept);

        match outcome {
            FlushOutcome::Accept => {
                self.accepted.lock().push(events.to_vec());
                Ok(())
            }
            FlushOutcome::Reject => Err(BufferError::backend_write("scripted", "scripted rejection")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
