//! Request and response types shared by the store and its backends.

use document_store_shared::FlatDocument;

/// A flat document together with the ID it is stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// The storage key, equal to the `Document` ID.
    pub id: String,
    /// The flat document body.
    pub source: FlatDocument,
}

impl StoredDocument {
    pub fn new(id: impl Into<String>, source: FlatDocument) -> Self {
        Self {
            id: id.into(),
            source,
        }
    }
}

/// Result of a bulk upsert for a single document.
#[derive(Debug, Clone)]
pub struct BulkItemResult {
    /// The document ID.
    pub id: String,
    /// Whether the upsert succeeded.
    pub success: bool,
    /// Backend error message if the upsert failed.
    pub error: Option<String>,
}

impl BulkItemResult {
    pub fn succeeded(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Summary of a bulk upsert containing aggregate statistics and individual results.
///
/// Backends report per-item failures here instead of failing the whole call,
/// so the store can tell the caller exactly which documents were not written.
#[derive(Debug, Clone, Default)]
pub struct BulkSummary {
    /// Total number of documents in the batch.
    pub total: usize,
    /// Number of successful upserts.
    pub succeeded: usize,
    /// Number of failed upserts.
    pub failed: usize,
    /// Individual results for each document.
    pub results: Vec<BulkItemResult>,
}

impl BulkSummary {
    /// Build a summary from individual results.
    pub fn from_results(results: Vec<BulkItemResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// Append the results of another batch.
    pub fn merge(&mut self, other: BulkSummary) {
        self.total += other.total;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.results.extend(other.results);
    }

    /// IDs of the documents that failed, in batch order.
    pub fn failed_ids(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.id.clone())
            .collect()
    }
}
