//! On-disk artifact storage
//!
//! `ContentStore` owns every file the pipeline writes. Other components only
//! read through it, which keeps the write path (truncate, write, flush) in one
//! place.

use dlp_common::{DlpError, Result};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Filesystem-backed store for downloaded and derived artifacts
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentStore;

impl ContentStore {
    pub fn new() -> Self {
        Self
    }

    /// Create each directory (and its parents) unless it already exists
    pub async fn ensure_directories<P: AsRef<Path>>(&self, paths: &[P]) -> Result<()> {
        for path in paths {
            let path = path.as_ref();
            tokio::fs::create_dir_all(path)
                .await
                .map_err(|e| DlpError::storage(path, e))?;
            debug!(path = %path.display(), "Directory ready");
        }
        Ok(())
    }

    pub async fn exists(&self, path: impl AsRef<Path>) -> bool {
        tokio::fs::try_exists(path.as_ref()).await.unwrap_or(false)
    }

    /// Replace the contents of `path` with `bytes`
    ///
    /// The file is truncated on open, so stale content is never appended to.
    /// The handle is flushed and dropped before returning on every path.
    pub async fn write(&self, path: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
        let path = path.as_ref();
        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| DlpError::storage(path, e))?;

        file.write_all(bytes)
            .await
            .map_err(|e| DlpError::storage(path, e))?;
        file.flush().await.map_err(|e| DlpError::storage(path, e))?;

        debug!(path = %path.display(), bytes = bytes.len(), "Artifact written");
        Ok(())
    }

    /// Read a stored artifact; absent files map to [`DlpError::NotFound`]
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let path = path.as_ref();
        tokio::fs::read(path)
            .await
            .map_err(|e| DlpError::storage(path, e))
    }

    /// Recursively delete `path`. Absent paths are not an error.
    pub async fn remove_tree(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let metadata = match tokio::fs::symlink_metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(DlpError::storage(path, e)),
        };

        let removed = if metadata.is_dir() {
            tokio::fs::remove_dir_all(path).await
        } else {
            tokio::fs::remove_file(path).await
        };

        match removed {
            Ok(()) => {
                debug!(path = %path.display(), "Removed");
                Ok(())
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DlpError::storage(path, e)),
        }
    }
}
