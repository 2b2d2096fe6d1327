// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Local directory backend.
//!
//! Each batch becomes one `.json` file. The file is first written under a
//! hidden temporary name and renamed into place once fully synced, so a
//! reader listing the directory never sees a partial batch.
//!
//! The write runs as a single blocking task. When the caller stops waiting
//! (for example on a flush timeout) the task still either renames the file
//! or removes it, so no temporary file outlives the call. Temporary files
//! left by a crashed process are removed by [`DiskBackend::open`].

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use spool_core::error::{BufferError, BufferResult};
use spool_core::types::SerializableEvent;

use super::StorageBackend;
use crate::codec::encode_batch;
use crate::naming::ArtifactNamer;

const BACKEND_NAME: &str = "disk";
const TEMP_SUFFIX: &str = ".tmp";

/// Writes batches as files into a directory.
#[derive(Debug)]
pub struct DiskBackend {
    dir: PathBuf,
    namer: ArtifactNamer,
}

impl DiskBackend {
    /// Creates a backend for an existing directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            namer: ArtifactNamer::new(),
        }
    }

    /// Creates the directory (and parents) if needed and returns a backend for it.
    pub async fn open(dir: impl AsRef<Path>) -> BufferResult<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            BufferError::backend_write_with_source(
                BACKEND_NAME,
                format!("failed to create directory {}", dir.display()),
                e,
            )
        })?;

        let removed = remove_stale_temp_files(dir).await;
        debug!(dir = %dir.display(), stale_removed = removed, "Disk backend opened");
        Ok(Self::new(dir))
    }

    /// Returns the target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write_atomically(&self, name: &str, data: Vec<u8>) -> BufferResult<PathBuf> {
        let final_path = self.dir.join(name);
        let tmp_path = self.dir.join(temp_name(name));

        tokio::task::spawn_blocking(move || -> BufferResult<PathBuf> {
            if let Err(e) = write_synced(&tmp_path, &data) {
                remove_quietly(&tmp_path);
                return Err(BufferError::backend_write_with_source(
                    BACKEND_NAME,
                    format!("failed to write {}", tmp_path.display()),
                    e,
                ));
            }

            if let Err(e) = std::fs::rename(&tmp_path, &final_path) {
                remove_quietly(&tmp_path);
                return Err(BufferError::backend_write_with_source(
                    BACKEND_NAME,
                    format!("failed to rename into {}", final_path.display()),
                    e,
                ));
            }

            Ok(final_path)
        })
        .await
        .map_err(|e| BufferError::backend_write(BACKEND_NAME, format!("write task failed: {}", e)))?
    }
}

#[async_trait]
impl StorageBackend for DiskBackend {
    async fn flush(&self, batch: &[SerializableEvent]) -> BufferResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let data = encode_batch(batch)?;
        let bytes = data.len();
        let name = self.namer.next_name();
        let path = self.write_atomically(&name, data).await?;

        debug!(
            path = %path.display(),
            events = batch.len(),
            bytes,
            "Batch written to disk"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        BACKEND_NAME
    }
}

fn temp_name(name: &str) -> String {
    format!(".{}{}", name, TEMP_SUFFIX)
}

fn is_temp_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(TEMP_SUFFIX)
}

fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(data)?;
    file.sync_all()?;
    Ok(())
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove temporary batch file");
        }
    }
}

/// Removes temporary files a previous process left behind. Returns how many were removed.
async fn remove_stale_temp_files(dir: &Path) -> usize {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to scan for stale temporary files");
            return 0;
        }
    };

    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let is_temp = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(is_temp_name);
        if !is_temp {
            continue;
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                warn!(path = %path.display(), "Removed stale temporary batch file");
                removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove stale temporary batch file");
            }
        }
    }
    removed
}
