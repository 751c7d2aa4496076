//! In-memory implementation of the document backend.
//!
//! Mirrors the near real-time behavior of a search engine: `get` sees every
//! write immediately, while `count` and `query` only see documents as of the
//! last `refresh`. Filters are evaluated in-process.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::errors::BackendError;
use crate::interfaces::DocumentBackend;
use crate::types::{BulkItemResult, BulkSummary, StoredDocument};
use document_store_shared::{Filter, FlatDocument};

#[derive(Debug, Default, Clone)]
struct IndexState {
    /// Latest version of every document.
    documents: BTreeMap<String, FlatDocument>,
    /// Snapshot taken at the last refresh.
    searchable: BTreeMap<String, FlatDocument>,
}

/// Document backend keeping every index in process memory.
///
/// Cloning yields another handle to the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    indices: Arc<RwLock<HashMap<String, IndexState>>>,
}

impl InMemoryBackend {
    /// Creates a backend with no indices.
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&HashMap<String, IndexState>) -> T) -> Result<T, BackendError> {
        let indices = self
            .indices
            .read()
            .map_err(|e| BackendError::request(format!("Failed to acquire read lock: {}", e)))?;
        Ok(f(&*indices))
    }

    fn write<T>(&self, f: impl FnOnce(&mut HashMap<String, IndexState>) -> T) -> Result<T, BackendError> {
        let mut indices = self
            .indices
            .write()
            .map_err(|e| BackendError::request(format!("Failed to acquire write lock: {}", e)))?;
        Ok(f(&mut *indices))
    }
}

#[async_trait]
impl DocumentBackend for InMemoryBackend {
    #[instrument(level = "trace", skip(self))]
    async fn get(&self, index: &str, id: &str) -> Result<Option<FlatDocument>, BackendError> {
        self.read(|indices| {
            indices
                .get(index)
                .and_then(|state| state.documents.get(id))
                .cloned()
        })
    }

    #[instrument(level = "trace", skip(self, documents), fields(document_count = documents.len()))]
    async fn bulk_upsert(
        &self,
        index: &str,
        documents: Vec<StoredDocument>,
    ) -> Result<BulkSummary, BackendError> {
        self.write(|indices| {
            let state = indices.entry(index.to_string()).or_default();
            let results = documents
                .into_iter()
                .map(|document| {
                    let result = BulkItemResult::succeeded(document.id.clone());
                    state.documents.insert(document.id, document.source);
                    result
                })
                .collect();
            BulkSummary::from_results(results)
        })
    }

    #[instrument(level = "trace", skip(self))]
    async fn delete(&self, index: &str, id: &str) -> Result<bool, BackendError> {
        self.write(|indices| {
            indices
                .get_mut(index)
                .is_some_and(|state| state.documents.remove(id).is_some())
        })
    }

    #[instrument(level = "trace", skip(self))]
    async fn count(&self, index: &str) -> Result<u64, BackendError> {
        self.read(|indices| {
            indices
                .get(index)
                .map_or(0, |state| state.searchable.len() as u64)
        })
    }

    #[instrument(level = "trace", skip(self))]
    async fn refresh(&self, index: &str) -> Result<(), BackendError> {
        self.write(|indices| {
            let state = indices.entry(index.to_string()).or_default();
            state.searchable = state.documents.clone();
            debug!(index, document_count = state.searchable.len(), "Index refreshed");
        })
    }

    #[instrument(level = "trace", skip(self, filter))]
    async fn query(
        &self,
        index: &str,
        filter: Option<&Filter>,
    ) -> Result<Vec<StoredDocument>, BackendError> {
        self.read(|indices| {
            let Some(state) = indices.get(index) else {
                return Vec::new();
            };
            state
                .searchable
                .iter()
                .filter(|(id, source)| filter.map_or(true, |f| f.matches(id, source)))
                .map(|(id, source)| StoredDocument::new(id.clone(), source.clone()))
                .collect()
        })
    }
}
