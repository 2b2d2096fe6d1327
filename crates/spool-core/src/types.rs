// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core event types for spool.
//!
//! - [`Event`]: the record handed over by the upstream pipeline
//! - [`SerializableEvent`]: the backend-agnostic projection that gets persisted
//! - [`EventMetadata`]: retry bookkeeping attached to every buffered event
//! - [`BufferedEvent`]: a serializable event plus its metadata
//!
//! # Examples
//!
//! ```
//! use spool_core::types::{Event, SerializableEvent};
//!
//! let event = Event::new("https://api.example.com", "key-1", "requests")
//!     .with_environment("production")
//!     .with_sample_rate(4)
//!     .with_field("status", 200)
//!     .with_field("path", "/health");
//!
//! let stored: SerializableEvent = event.into();
//! assert_eq!(stored.dataset, "requests");
//! assert_eq!(stored.data["status"], 200);
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::Span;

/// Arbitrary key/value payload of an event.
pub type Payload = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// Event
// =============================================================================

/// An event as produced by the upstream pipeline.
///
/// The `span` is the request-scoped tracing context the event was created
/// under. It is meaningful only inside this process and is dropped when the
/// event is converted into a [`SerializableEvent`].
#[derive(Debug, Clone)]
pub struct Event {
    /// Host of the API the event is destined for.
    pub api_host: String,
    /// API key used to send the event.
    pub api_key: String,
    /// Dataset the event belongs to.
    pub dataset: String,
    /// Environment name.
    pub environment: String,
    /// Sample rate the event was kept at.
    pub sample_rate: u32,
    /// Event timestamp.
    pub timestamp: DateTime<Utc>,
    /// Event payload.
    pub data: Payload,
    /// Originating tracing context (not persisted).
    pub span: Span,
}

impl Event {
    /// Creates a new event with the current timestamp, sample rate 1 and an
    /// empty payload.
    pub fn new(
        api_host: impl Into<String>,
        api_key: impl Into<String>,
        dataset: impl Into<String>,
    ) -> Self {
        Self {
            api_host: api_host.into(),
            api_key: api_key.into(),
            dataset: dataset.into(),
            environment: String::new(),
            sample_rate: 1,
            timestamp: Utc::now(),
            data: Payload::new(),
            span: Span::none(),
        }
    }

    /// Sets the environment.
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Sets the sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Sets the timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Adds a payload field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Replaces the whole payload.
    pub fn with_data(mut self, data: Payload) -> Self {
        self.data = data;
        self
    }

    /// Attaches the tracing context the event was produced under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Converts this event into its serializable projection.
    pub fn into_serializable(self) -> SerializableEvent {
        SerializableEvent::from(self)
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new("", "", "")
    }
}

// =============================================================================
// SerializableEvent
// =============================================================================

/// The persisted form of an [`Event`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableEvent {
    /// Host of the API the event is destined for.
    pub api_host: String,
    /// API key used to send the event.
    pub api_key: String,
    /// Dataset the event belongs to.
    pub dataset: String,
    /// Environment name.
    #[serde(default)]
    pub environment: String,
    /// Sample rate the event was kept at.
    pub sample_rate: u32,
    /// Event timestamp (RFC 3339).
    pub timestamp: DateTime<Utc>,
    /// Event payload.
    #[serde(default)]
    pub data: Payload,
}

impl From<Event> for SerializableEvent {
    fn from(event: Event) -> Self {
        Self {
            api_host: event.api_host,
            api_key: event.api_key,
            dataset: event.dataset,
            environment: event.environment,
            sample_rate: event.sample_rate,
            timestamp: event.timestamp,
            data: event.data,
        }
    }
}

// =============================================================================
// Retry Metadata
// =============================================================================

/// Retry bookkeeping for a buffered event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventMetadata {
    /// Number of failed flush attempts that included this event.
    pub retry_count: u32,
    /// Delay until the event is next offered to the backend.
    pub next_retry_delay: Duration,
}

impl EventMetadata {
    /// Records one failed flush attempt.
    pub fn record_failure(&mut self, next_retry_delay: Duration) {
        self.retry_count = self.retry_count.saturating_add(1);
        self.next_retry_delay = next_retry_delay;
    }
}

/// A serializable event waiting in the flush batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedEvent {
    /// The event itself.
    pub event: SerializableEvent,
    /// Retry bookkeeping.
    pub metadata: EventMetadata,
}

impl BufferedEvent {
    /// Wraps an event with fresh metadata.
    pub fn new(event: SerializableEvent) -> Self {
        Self {
            event,
            metadata: EventMetadata::default(),
        }
    }
}

impl From<Event> for BufferedEvent {
    fn from(event: Event) -> Self {
        Self::new(event.into())
    }
}

// =============================================================================
// Tests
// =============================================================================
