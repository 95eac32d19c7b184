//! Error types for the annotation core.
//!
//! Local mutations never fail; only the backend boundary (fetch, save) does.

use thiserror::Error;

/// Failure reported by an [`AnnotationBackend`](crate::api::AnnotationBackend).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Network(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The backend rejected a save made against a stale revision
    #[error("revision conflict: base revision {base_revision} is stale")]
    Conflict { base_revision: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotatorError {
    /// A page or summary fetch failed. Local state is unchanged.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Save was rejected because `base_revision` is no longer current.
    /// Local edits are preserved for a retry.
    #[error("revision conflict: save based on {base_revision} was rejected")]
    RevisionConflict { base_revision: String },

    #[error("save failed: {0}")]
    Save(String),

    /// Nothing has been fetched yet, so there is no revision to save against.
    #[error("no revision loaded")]
    NoRevision,
}

impl AnnotatorError {
    pub(crate) fn from_fetch(error: BackendError) -> Self {
        AnnotatorError::Fetch(error.to_string())
    }

    pub(crate) fn from_save(error: BackendError) -> Self {
        match error {
            BackendError::Conflict { base_revision } => {
                AnnotatorError::RevisionConflict { base_revision }
            }
            other => AnnotatorError::Save(other.to_string()),
        }
    }
}

pub type AnnotatorResult<T> = std::result::Result<T, AnnotatorError>;
pub type BackendResult<T> = std::result::Result<T, BackendError>;
