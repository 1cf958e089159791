//! Blob-store collaborator for catalog thumbnails.
//!
//! Catalog deletes are write-through: removing a subject, topic, or chapter
//! must also remove its thumbnail from the blob store. The store itself is
//! external; this module only defines the contract plus the local-disk and
//! test implementations.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ThumbnailStoreError {
    #[error("io error for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Write side of the thumbnail store used by catalog deletes.
pub trait ThumbnailStore: Send + Sync {
    /// Remove a thumbnail by its stored reference. Removing a reference
    /// that is already gone is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ThumbnailStoreError` when the underlying store fails.
    fn remove(&self, path: &str) -> Result<(), ThumbnailStoreError>;
}

/// Thumbnails on local disk under a media root.
pub struct LocalThumbnailStore {
    root: PathBuf,
}

impl LocalThumbnailStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ThumbnailStore for LocalThumbnailStore {
    fn remove(&self, path: &str) -> Result<(), ThumbnailStoreError> {
        let full = self.root.join(path);
        match std::fs::remove_file(&full) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ThumbnailStoreError::Io {
                path: full.display().to_string(),
                source: e,
            }),
        }
    }
}

/// Test double that records which references were removed.
#[derive(Clone, Default)]
pub struct RecordingThumbnailStore {
    removed: Arc<Mutex<Vec<String>>>,
}

impl RecordingThumbnailStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// References removed so far, in call order.
    #[must_use]
    pub fn removed(&self) -> Vec<String> {
        self.removed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl ThumbnailStore for RecordingThumbnailStore {
    fn remove(&self, path: &str) -> Result<(), ThumbnailStoreError> {
        self.removed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(path.to_owned());
        Ok(())
    }
}
