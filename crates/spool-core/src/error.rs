// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Unified error hierarchy for spool.
//!
//! # Error Hierarchy
//!
//! ```text
//! SpoolError (root)
//! └── BufferError     - Buffering, flushing and backend writes
//!     ├── Serialization   - batch could not be encoded/decoded
//!     ├── BackendWrite    - I/O, network or auth failure at the backend
//!     ├── Timeout         - backend call exceeded the flush timeout
//!     ├── InvalidConfig   - rejected at construction time
//!     └── Closed          - controller already drained
//! ```
//!
//! A failed flush is never fatal: the batch stays in memory and is retried on
//! the next trigger. [`BufferError::is_retryable`] reports which failures that
//! retry can fix.
//!
//! # Examples
//!
//! ```
//! use spool_core::error::{BufferError, SpoolError};
//!
//! let error = BufferError::backend_write("disk", "permission denied");
//! assert!(error.is_retryable());
//!
//! let root: SpoolError = error.into();
//! assert!(root.is_retryable());
//! ```

use std::time::Duration;

use thiserror::Error;

// =============================================================================
// SpoolError - Root Error Type
// =============================================================================

/// The root error type for spool.
#[derive(Debug, Error)]
pub enum SpoolError {
    /// Buffer or backend error.
    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),
}

impl SpoolError {
    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            SpoolError::Buffer(e) => e.is_retryable(),
        }
    }

    /// Returns the error type for logging/metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            SpoolError::Buffer(e) => e.error_type(),
        }
    }
}

// =============================================================================
// BufferError
// =============================================================================

/// Errors raised while buffering events or flushing them to a backend.
#[derive(Debug, Error)]
pub enum BufferError {
    /// The batch could not be encoded or decoded.
    #[error("Serialization failed: {message}")]
    Serialization {
        /// Error message.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The backend rejected or failed the write.
    #[error("Backend '{backend}' write failed: {message}")]
    BackendWrite {
        /// Backend name.
        backend: String,
        /// Error message.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The backend did not answer within the flush timeout.
    #[error("Backend '{backend}' flush timed out after {timeout:?}")]
    Timeout {
        /// Backend name.
        backend: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// Invalid construction parameters.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },

    /// The controller has been closed and accepts no more events.
    #[error("Flush controller is closed")]
    Closed,
}

impl BufferError {
    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a serialization error with an underlying cause.
    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a backend write error.
    pub fn backend_write(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendWrite {
            backend: backend.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a backend write error with an underlying cause.
    pub fn backend_write_with_source(
        backend: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::BackendWrite {
            backend: backend.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(backend: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            backend: backend.into(),
            timeout,
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns `true` if retrying the same batch later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BufferError::BackendWrite { .. } | BufferError::Timeout { .. }
        )
    }

    /// Returns the error type for logging/metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            BufferError::Serialization { .. } => "serialization",
            BufferError::BackendWrite { .. } => "backend_write",
            BufferError::Timeout { .. } => "timeout",
            BufferError::InvalidConfig { .. } => "invalid_config",
            BufferError::Closed => "closed",
        }
    }
}

impl From<serde_json::Error> for BufferError {
    fn from(err: serde_json::Error) -> Self {
        BufferError::serialization_with_source(err.to_string(), err)
    }
}

/// A Result type with BufferError.
pub type BufferResult<T> = Result<T, BufferError>;

/// A Result type with SpoolError.
pub type SpoolResult<T> = Result<T, SpoolError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_buffer_error_retryable() {
        assert!(BufferError::backend_write("s3", "connection reset").is_retryable());
        assert!(BufferError::timeout("s3", Duration::from_secs(5)).is_retryable());
        assert!(!BufferError::serialization("bad float").is_retryable());
        assert!(!BufferError::invalid_config("capacity is zero").is_retryable());
        assert!(!BufferError::Closed.is_retryable());
    }

    #[test]
    fn test_error_type_labels() {
        assert_eq!(BufferError::serialization("x").error_type(), "serialization");
        assert_eq!(BufferError::backend_write("disk", "x").error_type(), "backend_write");
        assert_eq!(
            BufferError::timeout("disk", Duration::from_millis(1)).error_type(),
            "timeout"
        );
        assert_eq!(BufferError::Closed.error_type(), "closed");
    }

    #[test]
    fn test_error_display() {
        let err = BufferError::backend_write("disk", "permission denied");
        assert_eq!(err.to_string(), "Backend 'disk' write failed: permission denied");

        let root: SpoolError = err.into();
        assert!(root.to_string().starts_with("Buffer error:"));
        assert_eq!(root.error_type(), "backend_write");
    }

    #[test]
    fn test_error_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = BufferError::backend_write_with_source("disk", "write failed", io);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: BufferError = json_err.into();
        assert!(matches!(err, BufferError::Serialization { .. }));
    }
}
