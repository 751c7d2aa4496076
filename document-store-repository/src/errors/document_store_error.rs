//! Document store error types.
//!
//! This module defines the errors surfaced to callers of a `DocumentStore`.
//! Nothing is retried inside the store; every error reaches the caller.

use document_store_shared::FilterError;
use thiserror::Error;

use super::BackendError;

/// Errors that can occur during document store operations.
#[derive(Debug, Clone, Error)]
pub enum DocumentStoreError {
    /// A written document's ID already exists and the policy is `Fail`.
    #[error("Duplicate document: {id}")]
    DuplicateDocument { id: String },

    /// Documents requested for deletion do not exist.
    #[error("Missing documents: {}", .ids.join(", "))]
    MissingDocument { ids: Vec<String> },

    /// The backend could not be reached (transport or authentication failure).
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The bulk upsert reported per-item failures.
    #[error("Failed to write documents: {}", .failed_ids.join(", "))]
    WriteError { failed_ids: Vec<String> },

    /// The operation is not supported by the backend.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The filter could not be parsed or translated.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// A stored document could not be converted back into a `Document`.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Any other backend failure.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocumentStoreError {
    /// Create a duplicate document error.
    pub fn duplicate_document(id: impl Into<String>) -> Self {
        Self::DuplicateDocument { id: id.into() }
    }

    /// Create a missing document error.
    pub fn missing_documents(ids: Vec<String>) -> Self {
        Self::MissingDocument { ids }
    }

    /// Create a write error listing the failed IDs.
    pub fn write(failed_ids: Vec<String>) -> Self {
        Self::WriteError { failed_ids }
    }

    /// Create an invalid document error.
    pub fn invalid_document(msg: impl Into<String>) -> Self {
        Self::InvalidDocument(msg.into())
    }
}

impl From<BackendError> for DocumentStoreError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::ConnectionError(msg) => Self::BackendUnavailable(msg),
            BackendError::Unsupported(msg) => Self::UnsupportedOperation(msg),
            BackendError::InvalidQuery(msg) => Self::InvalidFilter(msg),
            other => Self::Backend(other.to_string()),
        }
    }
}

impl From<FilterError> for DocumentStoreError {
    fn from(err: FilterError) -> Self {
        Self::InvalidFilter(err.to_string())
    }
}
