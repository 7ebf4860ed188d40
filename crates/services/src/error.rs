//! Shared error types for the services crate.

use thiserror::Error;

use storage::StorageError;

/// Errors emitted by the catalog provider and cache.
///
/// Catalog failures are propagated to the caller unchanged — the engine
/// never substitutes stale or placeholder data for a failed load.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("catalog payload malformed: {0}")]
    Format(#[from] serde_json::Error),

    #[error("unknown dataset: {0}")]
    UnknownDataset(String),
}

/// Errors emitted by the quiz session workflow.
///
/// An empty candidate pool is deliberately not represented here: a session
/// over zero questions is a normal outcome the presentation layer renders
/// as "no questions available".
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("question {0} is not part of this session")]
    UnknownQuestion(String),

    #[error("session already completed")]
    Completed,

    #[error(transparent)]
    Storage(#[from] StorageError),
}
