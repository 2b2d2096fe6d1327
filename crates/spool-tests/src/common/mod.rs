// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Common Test Utilities
//!
//! - `fixtures`: events and configurations
//! - `mocks`: scriptable storage backends

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;

use std::path::{Path, PathBuf};
use std::sync::Once;

use spool_core::SerializableEvent;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initialize test logging. Call this at the start of each test.
pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("warn,spool_buffer=debug")),
            )
            .with_test_writer()
            .init();
    });
}

/// Create a temporary directory for test data.
pub fn temp_test_dir(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temp directory")
}

/// Lists the batch files in `dir`, sorted by name.
pub fn list_batch_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .expect("Failed to read backup directory")
        .map(|entry| entry.expect("Failed to read entry").path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    files.sort();
    files
}

/// Reads every batch file in `dir`, in name order.
pub fn read_disk_batches(dir: &Path) -> Vec<Vec<SerializableEvent>> {
    list_batch_files(dir)
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path).expect("Failed to read batch file");
            spool_buffer::decode_batch(&bytes).expect("Batch file is not a valid batch")
        })
        .collect()
}
