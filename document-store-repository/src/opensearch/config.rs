//! Configuration for the OpenSearch backend.

use serde::{Deserialize, Serialize};

/// Default OpenSearch URL.
pub const DEFAULT_URL: &str = "http://localhost:9200";

/// Default number of documents per bulk request.
pub const DEFAULT_BULK_CHUNK_SIZE: usize = 500;

/// Default number of hits per search page. Matches the OpenSearch
/// `index.max_result_window` default, the largest page a search may request.
pub const DEFAULT_MAX_RESULT_WINDOW: usize = 10_000;

/// Connection and request settings for `OpenSearchBackend`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenSearchConfig {
    /// The OpenSearch server URL.
    pub url: String,
    /// Maximum documents sent in one bulk request.
    pub bulk_chunk_size: usize,
    /// Hits requested per page of a filter query. Must not exceed the
    /// index's `max_result_window`; queries scroll until every hit is read.
    pub max_result_window: usize,
}

impl OpenSearchConfig {
    /// Create a config for `url` with default request settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_bulk_chunk_size(mut self, bulk_chunk_size: usize) -> Self {
        self.bulk_chunk_size = bulk_chunk_size.max(1);
        self
    }

    pub fn with_max_result_window(mut self, max_result_window: usize) -> Self {
        self.max_result_window = max_result_window;
        self
    }
}

impl Default for OpenSearchConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            bulk_chunk_size: DEFAULT_BULK_CHUNK_SIZE,
            max_result_window: DEFAULT_MAX_RESULT_WINDOW,
        }
    }
}
