//! Configuration types for the IndexDocumentStore.

use std::fmt;
use std::sync::Arc;

use crate::interfaces::DocumentBackend;

/// Everything needed to recreate an `IndexDocumentStore`.
///
/// Holds a reference to the backend handle, not the backend itself: two
/// stores built from the same config share one backend. Document content is
/// never part of the config.
#[derive(Clone)]
pub struct StoreConfig {
    /// Shared backend handle, owned by the caller.
    pub backend: Arc<dyn DocumentBackend>,
    /// Name of the index the store operates on.
    pub index_name: String,
}

impl StoreConfig {
    pub fn new(backend: Arc<dyn DocumentBackend>, index_name: impl Into<String>) -> Self {
        Self {
            backend,
            index_name: index_name.into(),
        }
    }

    /// Whether both configs point at the same backend handle and index.
    pub fn same_target(&self, other: &StoreConfig) -> bool {
        Arc::ptr_eq(&self.backend, &other.backend) && self.index_name == other.index_name
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("index_name", &self.index_name)
            .finish_non_exhaustive()
    }
}
