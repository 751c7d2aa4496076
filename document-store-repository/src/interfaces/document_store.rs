//! Document store trait definition.
//!
//! This module defines the interface a retrieval framework uses to read and
//! write documents, independent of the backend behind it.

use async_trait::async_trait;

use crate::errors::DocumentStoreError;
use document_store_shared::{Document, DuplicatePolicy, Filter};

/// The document store contract exposed to the retrieval framework.
///
/// Implementations translate `Document`s to the backend's flat shape and
/// apply the duplicate policy on writes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return the number of documents in the store.
    ///
    /// # Returns
    ///
    /// * `Ok(count)` - The number of documents
    /// * `Err(DocumentStoreError::BackendUnavailable)` - If the backend cannot be reached
    async fn count_documents(&self) -> Result<u64, DocumentStoreError>;

    /// Return the documents matching `filters`, or every document if `None`.
    ///
    /// Result order is backend-defined.
    ///
    /// # Returns
    ///
    /// * `Ok(documents)` - The matching documents
    /// * `Err(DocumentStoreError::UnsupportedOperation)` - If the backend cannot filter
    async fn filter_documents(
        &self,
        filters: Option<&Filter>,
    ) -> Result<Vec<Document>, DocumentStoreError>;

    /// Write documents, handling existing IDs according to `policy`.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If every staged document was written
    /// * `Err(DocumentStoreError::DuplicateDocument)` - If `policy` is `Fail` and an ID exists
    /// * `Err(DocumentStoreError::WriteError)` - If some documents failed to write
    async fn write_documents(
        &self,
        documents: Vec<Document>,
        policy: DuplicatePolicy,
    ) -> Result<(), DocumentStoreError>;

    /// Delete documents by ID.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If every document was deleted
    /// * `Err(DocumentStoreError::MissingDocument)` - Listing the IDs that did not exist
    async fn delete_documents(&self, document_ids: &[String]) -> Result<(), DocumentStoreError>;
}
