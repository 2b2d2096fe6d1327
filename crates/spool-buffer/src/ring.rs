// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Fixed-capacity ring buffer of recent events.
//!
//! Keeps the most recent `capacity` items in memory and silently overwrites
//! the oldest one when full. There is no flush and no persistence: the ring
//! only answers "what happened recently".
//!
//! # Layout
//!
//! ```text
//!   slots:  [ e4 | e5 | e2 | e3 ]      capacity = 4, len = 4
//!                     ^
//!                   start = end = 2
//!
//!   get_all() = slots[start..] ++ slots[..end] = [e2, e3, e4, e5]
//! ```
//!
//! # Example
//!
//! ```
//! use spool_buffer::RingBuffer;
//!
//! let ring = RingBuffer::new(3).unwrap();
//! for i in 0..5 {
//!     ring.push(i);
//! }
//! assert_eq!(ring.get_all(), vec![2, 3, 4]);
//! assert_eq!(ring.evicted(), 2);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::trace;

use spool_core::error::{BufferError, BufferResult};

use crate::metrics::BufferMetricsCollector;

/// Slot storage guarded by the ring's lock.
#[derive(Debug)]
struct RingState<T> {
    slots: Vec<Option<T>>,
    /// Index of the oldest live element.
    start: usize,
    /// Index of the next free slot.
    end: usize,
    /// Live element count, `start == end` is ambiguous without it.
    len: usize,
}

/// A thread-safe, overwrite-on-full circular buffer.
///
/// `push` takes the write lock, `get_all` and `len` take the read lock.
#[derive(Debug)]
pub struct RingBuffer<T> {
    state: RwLock<RingState<T>>,
    capacity: usize,
    evicted: AtomicU64,
    metrics: BufferMetricsCollector,
}

impl<T: Clone> RingBuffer<T> {
    /// Creates an empty ring holding at most `capacity` items.
    ///
    /// Returns [`BufferError::InvalidConfig`] if `capacity` is zero.
    pub fn new(capacity: usize) -> BufferResult<Self> {
        if capacity == 0 {
            return Err(BufferError::invalid_config(
                "ring buffer capacity must be at least 1",
            ));
        }

        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);

        Ok(Self {
            state: RwLock::new(RingState {
                slots,
                start: 0,
                end: 0,
                len: 0,
            }),
            capacity,
            evicted: AtomicU64::new(0),
            metrics: BufferMetricsCollector::disabled(),
        })
    }

    /// Sets the metrics collector used to export evictions.
    pub fn with_metrics(mut self, metrics: BufferMetricsCollector) -> Self {
        self.metrics = metrics;
        self
    }

    /// Appends an item, overwriting the oldest one if the ring is full.
    pub fn push(&self, item: T) {
        let mut state = self.state.write();

        let end = state.end;
        state.slots[end] = Some(item);
        state.end = (end + 1) % self.capacity;

        if state.len == self.capacity {
            // The write above replaced the oldest entry.
            state.start = (state.start + 1) % self.capacity;
            drop(state);

            self.evicted.fetch_add(1, Ordering::Relaxed);
            self.metrics.record_ring_eviction();
            trace!(capacity = self.capacity, "Ring buffer full, oldest entry overwritten");
        } else {
            state.len += 1;
        }
    }

    /// Returns a copy of all live items, oldest first.
    pub fn get_all(&self) -> Vec<T> {
        let state = self.state.read();

        if state.len == 0 {
            return Vec::new();
        }

        let (head, tail) = if state.start < state.end {
            (&state.slots[state.start..state.end], &state.slots[..0])
        } else {
            (&state.slots[state.start..], &state.slots[..state.end])
        };

        head.iter()
            .chain(tail.iter())
            .filter_map(|slot| slot.clone())
            .collect()
    }

    /// Returns the number of live items.
    pub fn len(&self) -> usize {
        self.state.read().len
    }

    /// Returns `true` if nothing has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the fixed capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns how many items were overwritten since creation.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}

impl<T: Clone + fmt::Debug> fmt::Display for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items = self.get_all();
        write!(f, "RingBuffer({}/{}) [", items.len(), self.capacity)?;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", item)?;
        }
        write!(f, "]")
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_zero_capacity_rejected() {
        let result = RingBuffer::<u32>::new(0);
        assert!(matches!(result, Err(BufferError::InvalidConfig { .. })));
    }

    #[test]
    fn test_empty_ring() {
        let ring = RingBuffer::<u32>::new(4).unwrap();
        assert!(ring.is_empty());
        assert!(ring.get_all().is_empty());
        assert_eq!(ring.capacity(), 4);
    }

    #[test]
    fn test_push_below_capacity() {
        let ring = RingBuffer::new(4).unwrap();
        ring.push(1);
        ring.push(2);
        ring.push(3);

        assert_eq!(ring.len(), 3);
        assert_eq!(ring.get_all(), vec![1, 2, 3]);
        assert_eq!(ring.evicted(), 0);
    }

    #[test]
    fn test_exactly_full_keeps_every_item() {
        let ring = RingBuffer::new(4).unwrap();
        for i in 0..4 {
            ring.push(i);
        }

        assert_eq!(ring.len(), 4);
        assert_eq!(ring.get_all(), vec![0, 1, 2, 3]);
        assert_eq!(ring.evicted(), 0);
    }

    #[test]
    fn test_wrap_around_returns_last_items_in_order() {
        let ring = RingBuffer::new(4).unwrap();
        for i in 0..6 {
            ring.push(i);
        }

        assert_eq!(ring.get_all(), vec![2, 3, 4, 5]);
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.evicted(), 2);
    }

    #[test]
    fn test_last_min_n_c_for_many_sequences() {
        for capacity in 1..6 {
            for pushes in 0..15usize {
                let ring = RingBuffer::new(capacity).unwrap();
                for i in 0..pushes {
                    ring.push(i);
                }

                let kept = pushes.min(capacity);
                let expected: Vec<usize> = (pushes - kept..pushes).collect();
                assert_eq!(ring.get_all(), expected, "capacity={} pushes={}", capacity, pushes);
                assert!(ring.len() <= capacity);
            }
        }
    }

    #[test]
    fn test_capacity_one() {
        let ring = RingBuffer::new(1).unwrap();
        ring.push("a");
        ring.push("b");
        assert_eq!(ring.get_all(), vec!["b"]);
        assert_eq!(ring.evicted(), 1);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let ring = RingBuffer::new(2).unwrap();
        ring.push(1);
        let snapshot = ring.get_all();
        ring.push(2);
        ring.push(3);

        assert_eq!(snapshot, vec![1]);
        assert_eq!(ring.get_all(), vec![2, 3]);
    }

    #[test]
    fn test_display() {
        let ring = RingBuffer::new(2).unwrap();
        ring.push(7);
        assert_eq!(ring.to_string(), "RingBuffer(1/2) [7]");
    }

    #[test]
    fn test_concurrent_pushers_lose_nothing() {
        let ring = Arc::new(RingBuffer::new(8 * 250).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let ring = ring.clone();
                std::thread::spawn(move || {
                    for i in 0..250 {
                        ring.push(worker * 1000 + i);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let mut all = ring.get_all();
        assert_eq!(all.len(), 2000);
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 2000);
        assert_eq!(ring.evicted(), 0);
    }
}
