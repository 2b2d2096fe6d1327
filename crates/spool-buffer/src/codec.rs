// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Batch encoding shared by every backend.
//!
//! A batch is stored as one JSON array of [`SerializableEvent`] objects.
//! Numbers inside `data` go through `serde_json`'s number model, so an
//! integer written as `12345` reads back as an integer, while a float keeps
//! its fractional form.

use spool_core::error::{BufferError, BufferResult};
use spool_core::types::SerializableEvent;

/// File extension (and content kind) of every persisted batch.
pub const BATCH_EXTENSION: &str = "json";

/// Content type attached to object store uploads.
pub const BATCH_CONTENT_TYPE: &str = "application/json";

/// Encodes a batch as a JSON array.
pub fn encode_batch(batch: &[SerializableEvent]) -> BufferResult<Vec<u8>> {
    serde_json::to_vec(batch)
        .map_err(|e| BufferError::serialization_with_source("failed to encode batch", e))
}

/// Decodes a batch previously written by [`encode_batch`].
pub fn decode_batch(bytes: &[u8]) -> BufferResult<Vec<SerializableEvent>> {
    serde_json::from_slice(bytes)
        .map_err(|e| BufferError::serialization_with_source("failed to decode batch", e))
}
