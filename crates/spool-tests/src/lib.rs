// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # spool Integration Tests
//!
//! Shared fixtures and mocks plus end-to-end tests that drive the flush
//! controller against real backends.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p spool-tests
//! cargo test -p spool-tests --test integration_buffer
//! cargo test -p spool-tests --test integration_config
//! ```
//!
//! ## Test Categories
//!
//! ### Buffer Tests (`integration_buffer.rs`)
//! - Disk and in-memory object store backends behind the controller
//! - Failure retention and recovery
//! - Drain on close
//! - Ring buffer alongside the controller
//!
//! ### Config Tests (`integration_config.rs`)
//! - Loading YAML, TOML and JSON files
//! - Environment overrides
//! - Config to backend to controller wiring

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::fixtures::*;
    pub use crate::common::mocks::*;
    pub use crate::common::{init_test_logging, list_batch_files, read_disk_batches, temp_test_dir};
}
