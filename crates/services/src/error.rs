//! Shared error types for the services crate.

use thiserror::Error;

use lms_core::model::{CatalogError, QuizError, QuoteError};
use storage::repository::StorageError;
use storage::thumbnails::ThumbnailStoreError;

/// Errors emitted by `CompletionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompletionError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuizService`.
///
/// A missing quiz, question, or choice surfaces as
/// `StorageError::NotFound`; per-question validation problems are not
/// errors, they leave the question unanswered.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizAttemptError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogServiceError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Thumbnail(#[from] ThumbnailStoreError),
}

impl From<ProgressError> for CatalogServiceError {
    fn from(e: ProgressError) -> Self {
        match e {
            ProgressError::Storage(s) => CatalogServiceError::Storage(s),
        }
    }
}

impl From<CompletionError> for CatalogServiceError {
    fn from(e: CompletionError) -> Self {
        match e {
            CompletionError::Storage(s) => CatalogServiceError::Storage(s),
        }
    }
}

/// Errors emitted by `QuoteService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuoteServiceError {
    #[error(transparent)]
    Quote(#[from] QuoteError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] storage::sqlite::SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
