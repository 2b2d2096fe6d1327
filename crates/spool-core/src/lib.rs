// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # spool-core
//!
//! Shared event model and error hierarchy for spool.
//!
//! - **Types**: [`Event`], [`SerializableEvent`], [`EventMetadata`], [`BufferedEvent`]
//! - **Error**: [`SpoolError`] and [`BufferError`]

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod types;

pub use error::{BufferError, BufferResult, SpoolError, SpoolResult};
pub use types::{BufferedEvent, Event, EventMetadata, Payload, SerializableEvent};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
