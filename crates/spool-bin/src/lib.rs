// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # spool-bin
//!
//! CLI binary for spool.
//!
//! - CLI argument parsing with clap
//! - Pipeline runtime (backend, flush controller, recent-history ring)
//! - Graceful shutdown handling
//! - Logging initialization
//!
//! ## Usage
//!
//! ```bash
//! # Back up events piped on stdin (default command)
//! producer | spool
//!
//! # Read events from a file with a custom config
//! spool -c /etc/spool/spool.yaml run --input events.ndjson
//!
//! # Validate configuration
//! spool validate --show-config
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use runtime::{RunSummary, RuntimeBuilder, SpoolRuntime};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
