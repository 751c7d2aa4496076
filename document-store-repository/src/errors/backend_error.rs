//! Backend error types.
//!
//! This module defines the errors a `DocumentBackend` implementation reports.
//! The store translates them into `DocumentStoreError` kinds.

use thiserror::Error;

/// Errors that can occur while talking to a document backend.
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    /// The backend could not be reached or refused our credentials.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The backend answered with an error.
    #[error("Request error: {0}")]
    RequestError(String),

    /// Failed to parse a response from the backend.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize data for the backend.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The query could not be expressed for this backend.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The backend does not implement the requested operation.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl BackendError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a request error.
    pub fn request(msg: impl Into<String>) -> Self {
        Self::RequestError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create an invalid query error.
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    /// Create an unsupported operation error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}
