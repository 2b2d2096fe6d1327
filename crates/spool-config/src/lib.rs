// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # spool-config
//!
//! Configuration management for spool.
//!
//! ## Features
//!
//! - **Schema Definition**: backup, ring and logging sections with defaults and validation
//! - **Multi-Format Support**: YAML, TOML, and JSON configuration files
//! - **Environment Overrides**: `${VAR:default}` placeholders and `SPOOL_*` variables
//!
//! ## Quick Start
//!
//! ```no_run
//! use spool_config::loader::load_config;
//!
//! let config = load_config("spool.yaml").unwrap();
//!
//! println!("Backup type: {}", config.backup.backend_type);
//! println!("Ring capacity: {}", config.ring.capacity);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_config_str, ConfigFormat, ConfigLoader, ConfigLoaderBuilder};
pub use schema::{
    BackendConfig, BackupConfig, LogFormat, LogLevel, LoggingConfig, RingConfig, SecretValue,
    SpoolConfig,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
