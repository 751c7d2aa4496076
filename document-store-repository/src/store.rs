//! Document store implementation.
//!
//! This module provides the store the retrieval framework talks to. It binds
//! a shared backend handle to one index and applies the duplicate policy on
//! writes, which search backends do not offer natively.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};

use crate::config::StoreConfig;
use crate::errors::DocumentStoreError;
use crate::interfaces::{DocumentBackend, DocumentStore};
use crate::mapper::{from_backend, to_backend};
use crate::policy::{decide, WriteAction};
use crate::types::StoredDocument;
use document_store_shared::{Document, DuplicatePolicy, Filter};

/// A document store operating on a single index of a shared backend.
///
/// The backend handle is owned by the caller; the store only keeps a
/// reference to it and never closes it.
pub struct IndexDocumentStore {
    backend: Arc<dyn DocumentBackend>,
    index_name: String,
}

impl IndexDocumentStore {
    /// Create a store bound to `index_name` on `backend`.
    ///
    /// The index is expected to exist already.
    pub fn new(backend: Arc<dyn DocumentBackend>, index_name: impl Into<String>) -> Self {
        Self {
            backend,
            index_name: index_name.into(),
        }
    }

    /// Recreate a store from a config produced by [`IndexDocumentStore::to_config`].
    pub fn from_config(config: StoreConfig) -> Self {
        Self::new(config.backend, config.index_name)
    }

    /// The backend handle and index name needed to recreate this store.
    pub fn to_config(&self) -> StoreConfig {
        StoreConfig::new(Arc::clone(&self.backend), self.index_name.clone())
    }

    /// The index this store operates on.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Whether `id` already exists, either in the backend or earlier in the
    /// current write call.
    async fn exists(&self, id: &str, staged: &HashSet<String>) -> Result<bool, DocumentStoreError> {
        if staged.contains(id) {
            return Ok(true);
        }
        Ok(self.backend.get(&self.index_name, id).await?.is_some())
    }

    /// Refresh after a failed write so partially written documents are
    /// visible. The write error takes precedence over a refresh error.
    async fn refresh_after_failure(&self) {
        if let Err(e) = self.backend.refresh(&self.index_name).await {
            warn!(error = %e, "Refresh after failed write also failed");
        }
    }
}

#[async_trait]
impl DocumentStore for IndexDocumentStore {
    #[instrument(skip(self), fields(index = %self.index_name))]
    async fn count_documents(&self) -> Result<u64, DocumentStoreError> {
        Ok(self.backend.count(&self.index_name).await?)
    }

    #[instrument(skip(self, filters), fields(index = %self.index_name))]
    async fn filter_documents(
        &self,
        filters: Option<&Filter>,
    ) -> Result<Vec<Document>, DocumentStoreError> {
        let hits = self.backend.query(&self.index_name, filters).await?;
        debug!(hit_count = hits.len(), "Filter query returned");

        hits.into_iter()
            .map(|hit| from_backend(hit.id, hit.source))
            .collect()
    }

    /// Write documents in input order, applying `policy` to existing IDs.
    ///
    /// With `Fail` or `Skip` every document costs one backend lookup before
    /// the bulk upsert; `Overwrite` performs no lookups. A `Fail` abort
    /// happens before anything is sent, so no document of the call is
    /// written. The bulk upsert itself is not transactional: if it reports
    /// per-item failures, the other documents stay written and the call
    /// returns `WriteError` with the failed IDs. If the bulk upsert fails
    /// outright, documents from chunks sent before the failure stay written
    /// and the backend error is returned.
    ///
    /// The index is refreshed on every path after the bulk upsert, so
    /// whatever was written is visible. On the error paths a failing refresh
    /// is only logged; the write error is what the caller receives.
    #[instrument(
        skip(self, documents),
        fields(index = %self.index_name, document_count = documents.len(), policy = ?policy)
    )]
    async fn write_documents(
        &self,
        documents: Vec<Document>,
        policy: DuplicatePolicy,
    ) -> Result<(), DocumentStoreError> {
        let mut staged = Vec::with_capacity(documents.len());
        let mut staged_ids = HashSet::new();
        let mut skipped = 0usize;

        for document in documents {
            let existing = if policy.requires_lookup() {
                self.exists(&document.id, &staged_ids).await?
            } else {
                false
            };

            match decide(existing, policy) {
                WriteAction::Stage => {
                    staged_ids.insert(document.id.clone());
                    staged.push(StoredDocument::new(document.id.clone(), to_backend(&document)));
                }
                WriteAction::Skip => {
                    debug!(id = %document.id, "Skipping duplicate document");
                    skipped += 1;
                }
                WriteAction::Abort => {
                    warn!(id = %document.id, "Duplicate document, aborting write");
                    return Err(DocumentStoreError::duplicate_document(document.id));
                }
            }
        }

        if staged.is_empty() {
            debug!(skipped, "Nothing to write");
            return Ok(());
        }

        let summary = match self.backend.bulk_upsert(&self.index_name, staged).await {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = %e, "Bulk upsert failed");
                self.refresh_after_failure().await;
                return Err(e.into());
            }
        };

        if summary.failed > 0 {
            warn!(
                failed = summary.failed,
                succeeded = summary.succeeded,
                "Bulk upsert reported failures"
            );
            self.refresh_after_failure().await;
            return Err(DocumentStoreError::write(summary.failed_ids()));
        }

        self.backend.refresh(&self.index_name).await?;

        info!(written = summary.succeeded, skipped, "Documents written");
        Ok(())
    }

    /// Delete every ID, then report all missing IDs together.
    ///
    /// Deletions are not rolled back when some IDs are missing; the existing
    /// ones are deleted and made visible before the error is returned.
    #[instrument(skip(self, document_ids), fields(index = %self.index_name, id_count = document_ids.len()))]
    async fn delete_documents(&self, document_ids: &[String]) -> Result<(), DocumentStoreError> {
        let mut missing = Vec::new();
        let mut deleted = 0usize;

        for id in document_ids {
            if self.backend.delete(&self.index_name, id).await? {
                deleted += 1;
            } else {
                missing.push(id.clone());
            }
        }

        if deleted > 0 {
            self.backend.refresh(&self.index_name).await?;
        }

        if !missing.is_empty() {
            warn!(deleted, missing = missing.len(), "Some documents were not found");
            return Err(DocumentStoreError::missing_documents(missing));
        }

        debug!(deleted, "Documents deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BackendError;
    use crate::memory::InMemoryBackend;
    use crate::types::{BulkItemResult, BulkSummary};
    use document_store_shared::FlatDocument;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const INDEX_NAME: &str = "movies";

    /// Mock backend wrapping the in-memory backend with call counters and
    /// failure switches.
    struct MockBackend {
        inner: InMemoryBackend,
        get_calls: AtomicUsize,
        bulk_calls: AtomicUsize,
        refresh_calls: AtomicUsize,
        unavailable: AtomicBool,
        refresh_unavailable: AtomicBool,
        reject_ids: Vec<String>,
        /// Write this many documents, then fail the rest of the bulk call.
        bulk_fails_after: Option<usize>,
    }

    impl MockBackend {
        fn new() -> Self {
            Self {
                inner: InMemoryBackend::new(),
                get_calls: AtomicUsize::new(0),
                bulk_calls: AtomicUsize::new(0),
                refresh_calls: AtomicUsize::new(0),
                unavailable: AtomicBool::new(false),
                refresh_unavailable: AtomicBool::new(false),
                reject_ids: Vec::new(),
                bulk_fails_after: None,
            }
        }

        fn failing_bulk_after(written: usize) -> Self {
            Self {
                bulk_fails_after: Some(written),
                ..Self::new()
            }
        }

        fn rejecting(ids: &[&str]) -> Self {
            Self {
                reject_ids: ids.iter().map(|id| id.to_string()).collect(),
                ..Self::new()
            }
        }

        fn check_available(&self) -> Result<(), BackendError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(BackendError::connection("connection refused"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl DocumentBackend for MockBackend {
        async fn get(&self, index: &str, id: &str) -> Result<Option<FlatDocument>, BackendError> {
            self.check_available()?;
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get(index, id).await
        }

        async fn bulk_upsert(
            &self,
            index: &str,
            documents: Vec<StoredDocument>,
        ) -> Result<BulkSummary, BackendError> {
            self.check_available()?;
            self.bulk_calls.fetch_add(1, Ordering::SeqCst);

            if let Some(written) = self.bulk_fails_after {
                let earlier_chunk = documents.into_iter().take(written).collect();
                self.inner.bulk_upsert(index, earlier_chunk).await?;
                return Err(BackendError::connection("connection reset"));
            }

            let (rejected, accepted): (Vec<_>, Vec<_>) = documents
                .into_iter()
                .partition(|d| self.reject_ids.contains(&d.id));

            let mut summary = self.inner.bulk_upsert(index, accepted).await?;
            summary.merge(BulkSummary::from_results(
                rejected
                    .into_iter()
                    .map(|d| BulkItemResult::failed(d.id, "mapper_parsing_exception"))
                    .collect(),
            ));
            Ok(summary)
        }

        async fn delete(&self, index: &str, id: &str) -> Result<bool, BackendError> {
            self.check_available()?;
            self.inner.delete(index, id).await
        }

        async fn count(&self, index: &str) -> Result<u64, BackendError> {
            self.check_available()?;
            self.inner.count(index).await
        }

        async fn refresh(&self, index: &str) -> Result<(), BackendError> {
            self.check_available()?;
            if self.refresh_unavailable.load(Ordering::SeqCst) {
                return Err(BackendError::request("refresh rejected"));
            }
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.refresh(index).await
        }
    }

    fn memory_store() -> (InMemoryBackend, IndexDocumentStore) {
        let backend = InMemoryBackend::new();
        let store = IndexDocumentStore::new(Arc::new(backend.clone()), INDEX_NAME);
        (backend, store)
    }

    fn duplicates() -> Vec<Document> {
        vec![
            Document::from_content("A unique document"),
            Document::from_content("A duplicated document"),
            Document::builder()
                .content("A duplicated document")
                .meta("meta_key", "meta_value")
                .build(),
        ]
    }

    fn movies(count: usize) -> Vec<Document> {
        (0..count)
            .map(|i| {
                Document::builder()
                    .id(i.to_string())
                    .content(format!("Plot of movie {}", i))
                    .meta("title", format!("Movie {}", i))
                    .meta("year", 1950 + i as i64)
                    .meta("genre", if i % 2 == 0 { "drama" } else { "comedy" })
                    .build()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_write_and_count() {
        let (_, store) = memory_store();

        store
            .write_documents(movies(300), DuplicatePolicy::default())
            .await
            .unwrap();

        assert_eq!(store.count_documents().await.unwrap(), 300);
    }

    #[tokio::test]
    async fn test_write_empty() {
        let backend = Arc::new(MockBackend::new());
        let store = IndexDocumentStore::new(backend.clone(), INDEX_NAME);

        store.write_documents(vec![], DuplicatePolicy::Fail).await.unwrap();

        assert_eq!(backend.bulk_calls.load(Ordering::SeqCst), 0);
        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_duplicates_fail() {
        let (_, store) = memory_store();
        let documents = duplicates();
        let duplicated_id = documents[1].id.clone();

        let result = store.write_documents(documents, DuplicatePolicy::Fail).await;

        assert!(matches!(
            result,
            Err(DocumentStoreError::DuplicateDocument { ref id }) if *id == duplicated_id
        ));
        assert_eq!(store.count_documents().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicates_fail_against_existing_document() {
        let (_, store) = memory_store();
        let document = Document::from_content("Already stored");

        store
            .write_documents(vec![document.clone()], DuplicatePolicy::Fail)
            .await
            .unwrap();
        let result = store
            .write_documents(
                vec![Document::from_content("New"), document],
                DuplicatePolicy::Fail,
            )
            .await;

        assert!(matches!(result, Err(DocumentStoreError::DuplicateDocument { .. })));
        assert_eq!(store.count_documents().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicates_skip() {
        let (backend, store) = memory_store();
        let documents = duplicates();
        let duplicated_id = documents[2].id.clone();
        let expected = to_backend(&documents[1]);

        store
            .write_documents(documents, DuplicatePolicy::Skip)
            .await
            .unwrap();

        assert_eq!(store.count_documents().await.unwrap(), 2);
        let stored = backend.get(INDEX_NAME, &duplicated_id).await.unwrap().unwrap();
        assert_eq!(stored, expected);
        assert!(stored.get("meta_key").is_none());
    }

    #[tokio::test]
    async fn test_duplicates_overwrite() {
        let (backend, store) = memory_store();
        let documents = duplicates();
        let duplicated_id = documents[2].id.clone();
        let expected = to_backend(&documents[2]);

        store
            .write_documents(documents, DuplicatePolicy::Overwrite)
            .await
            .unwrap();

        assert_eq!(store.count_documents().await.unwrap(), 2);
        let stored = backend.get(INDEX_NAME, &duplicated_id).await.unwrap().unwrap();
        assert_eq!(stored, expected);
        assert_eq!(stored["meta_key"], "meta_value");
    }

    #[tokio::test]
    async fn test_overwrite_skips_lookups() {
        let backend = Arc::new(MockBackend::new());
        let store = IndexDocumentStore::new(backend.clone(), INDEX_NAME);

        store
            .write_documents(movies(10), DuplicatePolicy::Overwrite)
            .await
            .unwrap();

        assert_eq!(backend.get_calls.load(Ordering::SeqCst), 0);
        assert_eq!(backend.bulk_calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fail_and_skip_look_up_every_document() {
        let backend = Arc::new(MockBackend::new());
        let store = IndexDocumentStore::new(backend.clone(), INDEX_NAME);

        store
            .write_documents(movies(10), DuplicatePolicy::Skip)
            .await
            .unwrap();

        assert_eq!(backend.get_calls.load(Ordering::SeqCst), 10);
        assert_eq!(backend.bulk_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_skip_everything_sends_nothing() {
        let backend = Arc::new(MockBackend::new());
        let store = IndexDocumentStore::new(backend.clone(), INDEX_NAME);

        store
            .write_documents(movies(3), DuplicatePolicy::Fail)
            .await
            .unwrap();
        store
            .write_documents(movies(3), DuplicatePolicy::Skip)
            .await
            .unwrap();

        assert_eq!(backend.bulk_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.count_documents().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_partial_bulk_failure() {
        let backend = Arc::new(MockBackend::rejecting(&["1"]));
        let store = IndexDocumentStore::new(backend.clone(), INDEX_NAME);

        let result = store
            .write_documents(movies(3), DuplicatePolicy::Overwrite)
            .await;

        assert!(matches!(
            result,
            Err(DocumentStoreError::WriteError { ref failed_ids }) if failed_ids == &vec!["1".to_string()]
        ));
        // No rollback: the other documents are written and visible
        assert_eq!(store.count_documents().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_bulk_failure_still_refreshes_written_chunks() {
        let backend = Arc::new(MockBackend::failing_bulk_after(2));
        let store = IndexDocumentStore::new(backend.clone(), INDEX_NAME);

        let result = store
            .write_documents(movies(5), DuplicatePolicy::Overwrite)
            .await;

        assert!(matches!(result, Err(DocumentStoreError::BackendUnavailable(_))));
        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
        // Documents from the chunk sent before the failure are visible
        assert_eq!(store.count_documents().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_partial_failure_reported_when_refresh_fails() {
        let backend = Arc::new(MockBackend::rejecting(&["0", "2"]));
        backend.refresh_unavailable.store(true, Ordering::SeqCst);
        let store = IndexDocumentStore::new(backend.clone(), INDEX_NAME);

        let result = store
            .write_documents(movies(3), DuplicatePolicy::Overwrite)
            .await;

        assert!(matches!(
            result,
            Err(DocumentStoreError::WriteError { ref failed_ids })
                if failed_ids == &vec!["0".to_string(), "2".to_string()]
        ));
    }

    #[tokio::test]
    async fn test_refresh_failure_after_clean_write() {
        let backend = Arc::new(MockBackend::new());
        backend.refresh_unavailable.store(true, Ordering::SeqCst);
        let store = IndexDocumentStore::new(backend.clone(), INDEX_NAME);

        let result = store
            .write_documents(movies(2), DuplicatePolicy::Overwrite)
            .await;

        assert!(matches!(result, Err(DocumentStoreError::Backend(_))));
    }

    #[tokio::test]
    async fn test_backend_unavailable() {
        let backend = Arc::new(MockBackend::new());
        backend.unavailable.store(true, Ordering::SeqCst);
        let store = IndexDocumentStore::new(backend.clone(), INDEX_NAME);

        assert!(matches!(
            store.count_documents().await,
            Err(DocumentStoreError::BackendUnavailable(_))
        ));
        assert!(matches!(
            store.write_documents(movies(1), DuplicatePolicy::Fail).await,
            Err(DocumentStoreError::BackendUnavailable(_))
        ));
        assert!(matches!(
            store.delete_documents(&["0".to_string()]).await,
            Err(DocumentStoreError::BackendUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let (_, store) = memory_store();
        store
            .write_documents(movies(3), DuplicatePolicy::Fail)
            .await
            .unwrap();

        store.delete_documents(&["1".to_string()]).await.unwrap();

        assert_eq!(store.count_documents().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let (_, store) = memory_store();

        let result = store.delete_documents(&["nope".to_string()]).await;

        assert!(matches!(
            result,
            Err(DocumentStoreError::MissingDocument { ref ids }) if ids == &vec!["nope".to_string()]
        ));
    }

    #[tokio::test]
    async fn test_delete_reports_every_missing_id() {
        let (_, store) = memory_store();
        store
            .write_documents(movies(3), DuplicatePolicy::Fail)
            .await
            .unwrap();

        let ids: Vec<String> = ["x", "0", "y", "2"].iter().map(|s| s.to_string()).collect();
        let result = store.delete_documents(&ids).await;

        assert!(matches!(
            result,
            Err(DocumentStoreError::MissingDocument { ref ids })
                if ids == &vec!["x".to_string(), "y".to_string()]
        ));
        // Existing documents are still deleted
        assert_eq!(store.count_documents().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_filter_documents() {
        let (_, store) = memory_store();
        store
            .write_documents(movies(10), DuplicatePolicy::Fail)
            .await
            .unwrap();

        let filter = Filter::parse(&json!({
            "genre": "drama",
            "year": {"$gte": 1954}
        }))
        .unwrap();
        let mut documents = store.filter_documents(Some(&filter)).await.unwrap();
        documents.sort_by(|a, b| a.id.cmp(&b.id));

        let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["4", "6", "8"]);
        assert_eq!(documents[0].meta("title"), Some(&json!("Movie 4")));
        assert_eq!(documents[0].content.as_deref(), Some("Plot of movie 4"));
    }

    #[tokio::test]
    async fn test_filter_null_in_list_matches_missing_field() {
        let (_, store) = memory_store();
        let mut documents = movies(3);
        documents[0].metadata.insert("director".to_string(), json!("Lynch"));
        store
            .write_documents(documents, DuplicatePolicy::Fail)
            .await
            .unwrap();

        let ids_for = |filter: serde_json::Value| {
            let store = &store;
            async move {
                let filter = Filter::parse(&filter).unwrap();
                let mut ids: Vec<String> = store
                    .filter_documents(Some(&filter))
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|d| d.id)
                    .collect();
                ids.sort();
                ids
            }
        };

        assert_eq!(ids_for(json!({ "director": { "$in": [null] } })).await, vec!["1", "2"]);
        assert_eq!(ids_for(json!({ "director": null })).await, vec!["1", "2"]);
        assert_eq!(
            ids_for(json!({ "director": { "$in": ["Lynch", null] } })).await,
            vec!["0", "1", "2"]
        );
        assert_eq!(ids_for(json!({ "director": { "$nin": [null] } })).await, vec!["0"]);
    }

    #[tokio::test]
    async fn test_filter_documents_without_filter() {
        let (_, store) = memory_store();
        let written = movies(4);
        store
            .write_documents(written.clone(), DuplicatePolicy::Fail)
            .await
            .unwrap();

        let mut documents = store.filter_documents(None).await.unwrap();
        documents.sort_by(|a, b| a.id.cmp(&b.id));

        assert_eq!(documents, written);
    }

    #[tokio::test]
    async fn test_filter_unsupported_backend() {
        let store = IndexDocumentStore::new(Arc::new(MockBackend::new()), INDEX_NAME);

        let result = store.filter_documents(None).await;

        assert!(matches!(result, Err(DocumentStoreError::UnsupportedOperation(_))));
    }

    #[tokio::test]
    async fn test_config_round_trip() {
        let (_, store) = memory_store();
        let config = store.to_config();
        let restored = IndexDocumentStore::from_config(config.clone());

        assert!(config.same_target(&restored.to_config()));
        assert_eq!(restored.index_name(), store.index_name());
        assert!(!std::ptr::eq(&store, &restored));

        restored
            .write_documents(movies(2), DuplicatePolicy::Fail)
            .await
            .unwrap();
        assert_eq!(store.count_documents().await.unwrap(), 2);
        assert_eq!(restored.count_documents().await.unwrap(), 2);
    }
}
