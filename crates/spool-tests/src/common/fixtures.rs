// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Pre-built events and configurations.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use spool_buffer::FlushControllerConfig;
use spool_core::{Event, SerializableEvent};

// =============================================================================
// Event Fixtures
// =============================================================================

/// Fixture providing standard events.
pub struct EventFixtures;

impl EventFixtures {
    /// API host used by every fixture event.
    pub const API_HOST: &'static str = "https://api.example.com";

    /// Fixed timestamp so encoded batches are reproducible.
    pub fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
            .single()
            .expect("valid fixture timestamp")
    }

    /// Event number `seq`, carrying `seq` in its payload.
    pub fn event(seq: usize) -> Event {
        Event::new(Self::API_HOST, "test-key", format!("dataset-{}", seq % 3))
            .with_environment("test")
            .with_timestamp(Self::timestamp() + chrono::Duration::milliseconds(seq as i64))
            .with_field("seq", seq as u64)
            .with_field("message", format!("event {}", seq))
    }

    /// Events `0..count`.
    pub fn batch(count: usize) -> Vec<Event> {
        (0..count).map(Self::event).collect()
    }

    /// Reads back the `seq` payload field.
    pub fn seq_of(event: &SerializableEvent) -> u64 {
        event.data["seq"].as_u64().expect("fixture event carries seq")
    }
}

// =============================================================================
// Config Fixtures
// =============================================================================

/// Fixture providing controller and file configurations.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// A controller that only flushes on size or close within a test's lifetime.
    pub fn size_only(max_buffer_size: usize) -> FlushControllerConfig {
        FlushControllerConfig::builder()
            .max_buffer_size(max_buffer_size)
            .flush_interval(Duration::from_secs(3600))
            .flush_timeout(Duration::from_secs(2))
            .enable_metrics(false)
            .build()
    }

    /// A controller with a short time trigger.
    pub fn fast_interval(interval: Duration) -> FlushControllerConfig {
        FlushControllerConfig::builder()
            .max_buffer_size(1000)
            .flush_interval(interval)
            .flush_timeout(Duration::from_secs(2))
            .enable_metrics(false)
            .build()
    }

    /// YAML for a disk backup into `dir`.
    pub fn disk_yaml(dir: &Path) -> String {
        format!(
            r#"
backup:
  type: disk
  dir: {}
  flush_interval_ms: 50
  max_buffer_size: 5
  flush_timeout_secs: 2
  enable_metrics: false
ring:
  capacity: 8
logging:
  level: debug
  format: json
"#,
            dir.display()
        )
    }
}
