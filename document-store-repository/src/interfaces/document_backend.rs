//! Document backend trait definition.
//!
//! This module defines what the store requires from a storage or search
//! backend, allowing different implementations (OpenSearch, in-memory, etc.).

use async_trait::async_trait;

use crate::errors::BackendError;
use crate::types::{BulkSummary, StoredDocument};
use document_store_shared::{Filter, FlatDocument};

/// Abstract interface for a schemaless document backend.
///
/// Documents live in named indices and are addressed by string IDs. Writes
/// may not be visible to `count` and `query` until `refresh` is called;
/// `get` always sees the latest write.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` so a single handle can be
/// shared between stores.
///
/// # Error Handling
///
/// Transport and authentication failures must be reported as
/// `BackendError::ConnectionError`; the store surfaces them as
/// `DocumentStoreError::BackendUnavailable`.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Fetch a document by ID.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(document))` - The flat document body
    /// * `Ok(None)` - If no document has this ID
    /// * `Err(BackendError)` - If the lookup fails
    async fn get(&self, index: &str, id: &str) -> Result<Option<FlatDocument>, BackendError>;

    /// Insert or replace documents by ID in a single bulk operation.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkSummary)` - Per-item results; individual failures do not fail the call
    /// * `Err(BackendError)` - If the bulk operation fails entirely
    async fn bulk_upsert(
        &self,
        index: &str,
        documents: Vec<StoredDocument>,
    ) -> Result<BulkSummary, BackendError>;

    /// Delete a document by ID.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the document existed and was deleted
    /// * `Ok(false)` - If no document has this ID
    /// * `Err(BackendError)` - If the deletion fails
    async fn delete(&self, index: &str, id: &str) -> Result<bool, BackendError>;

    /// Count the searchable documents in an index.
    async fn count(&self, index: &str) -> Result<u64, BackendError>;

    /// Make every write so far visible to `count` and `query`.
    async fn refresh(&self, index: &str) -> Result<(), BackendError>;

    /// Return the documents matching `filter`, or all documents if `None`.
    ///
    /// Result order is backend-defined. Backends that cannot evaluate filters
    /// keep the default, which reports the operation as unsupported.
    async fn query(
        &self,
        index: &str,
        filter: Option<&Filter>,
    ) -> Result<Vec<StoredDocument>, BackendError> {
        let _ = (index, filter);
        Err(BackendError::unsupported("query is not supported by this backend"))
    }
}
