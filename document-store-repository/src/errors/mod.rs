//! Error types for the document store repository.

mod backend_error;
mod document_store_error;

pub use backend_error::BackendError;
pub use document_store_error::DocumentStoreError;
