// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # spool-buffer
//!
//! In-memory event buffering for spool.
//!
//! - [`RingBuffer`]: keeps the most recent N events, overwriting the oldest
//! - [`FlushController`]: batches events and flushes them to a
//!   [`StorageBackend`] on a size or time trigger
//! - [`DiskBackend`] / [`ObjectStoreBackend`]: one artifact per batch, in a
//!   directory or an S3 bucket

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod backend;
pub mod codec;
pub mod controller;
pub mod metrics;
pub mod naming;
pub mod ring;
pub mod stats;

pub use backend::{
    build_backend, BackendKind, BackendSettings, DiskBackend, MockBackend, ObjectStoreBackend,
    S3Settings, StorageBackend,
};
pub use codec::{decode_batch, encode_batch};
pub use controller::{FlushController, FlushControllerConfig, FlushControllerConfigBuilder};
pub use metrics::{BufferMetricsCollector, FlushTrigger};
pub use naming::ArtifactNamer;
pub use ring::RingBuffer;
pub use stats::FlushStats;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
