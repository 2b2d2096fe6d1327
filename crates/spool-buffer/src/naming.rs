// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Artifact names for persisted batches.
//!
//! Names look like `2024-03-01T12-00-00.000000Z+00:00-3f2a9c1e-000000.json`:
//! a UTC timestamp with microsecond precision, a random token fixed for the
//! namer's lifetime, then a per-namer sequence number. The sequence keeps one
//! backend's names distinct inside the same microsecond. The token keeps
//! backends in different processes or hosts apart when they share a target.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::codec::BATCH_EXTENSION;

/// `strftime` pattern of the timestamp part.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.6fZ%:z";

/// Hex characters of the per-namer token.
pub const TOKEN_LEN: usize = 8;

/// Generates unique, time-ordered artifact names.
#[derive(Debug)]
pub struct ArtifactNamer {
    token: String,
    sequence: AtomicU64,
}

impl ArtifactNamer {
    /// Creates a namer with a fresh random token and a sequence starting at zero.
    pub fn new() -> Self {
        let mut token = Uuid::new_v4().simple().to_string();
        token.truncate(TOKEN_LEN);
        Self::with_token(token)
    }

    /// Creates a namer with a fixed token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Returns the token embedded in every name.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns a name for a batch flushed now.
    pub fn next_name(&self) -> String {
        self.name_at(Utc::now())
    }

    /// Returns a name for a batch flushed at `now`.
    pub fn name_at(&self, now: DateTime<Utc>) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}-{}-{:06}.{}",
            now.format(TIMESTAMP_FORMAT),
            self.token,
            seq,
            BATCH_EXTENSION
        )
    }

    /// Number of names handed out so far.
    pub fn issued(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

impl Default for ArtifactNamer {
    fn default() -> Self {
        Self::new()
    }
}
