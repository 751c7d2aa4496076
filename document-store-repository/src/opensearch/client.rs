//! OpenSearch backend implementation.
//!
//! This module provides the concrete implementation of `DocumentBackend`
//! using the OpenSearch Rust client.

use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::{
        request::JsonBody,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::{IndicesCreateParts, IndicesExistsParts, IndicesRefreshParts},
    BulkParts, ClearScrollParts, CountParts, DeleteParts, GetParts, OpenSearch, ScrollParts,
    SearchParts,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::errors::BackendError;
use crate::interfaces::DocumentBackend;
use crate::opensearch::config::OpenSearchConfig;
use crate::opensearch::index_config::get_index_settings;
use crate::opensearch::queries::build_filter_query;
use crate::types::{BulkItemResult, BulkSummary, StoredDocument};
use document_store_shared::{Filter, FlatDocument};

/// OpenSearch document backend.
///
/// One backend can serve any number of indices and stores; share it behind
/// an `Arc`.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use document_store_repository::opensearch::{OpenSearchBackend, OpenSearchConfig};
/// use document_store_repository::IndexDocumentStore;
///
/// let backend = OpenSearchBackend::new(OpenSearchConfig::new("http://localhost:9200"))?;
/// backend.ensure_index("documents").await?;
///
/// let store = IndexDocumentStore::new(Arc::new(backend), "documents");
/// ```
pub struct OpenSearchBackend {
    client: OpenSearch,
    config: OpenSearchConfig,
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source")]
    source: Option<FlatDocument>,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<HashMap<String, BulkResponseItem>>,
}

#[derive(Debug, Deserialize)]
struct BulkResponseItem {
    #[serde(rename = "_id")]
    id: Option<String>,
    #[serde(default)]
    status: u16,
    error: Option<Value>,
}

/// How long OpenSearch keeps a scroll context alive between pages.
const SCROLL_KEEP_ALIVE: &str = "1m";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "_scroll_id")]
    scroll_id: Option<String>,
    hits: SearchHits,
}

/// One page of a scrolled search.
#[derive(Debug)]
struct SearchPage {
    scroll_id: Option<String>,
    hits: Vec<StoredDocument>,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source", default)]
    source: FlatDocument,
}

impl OpenSearchBackend {
    /// Create a new OpenSearch backend for the configured URL.
    ///
    /// No request is sent; use [`OpenSearchBackend::health_check`] to verify
    /// the cluster is reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchBackend)` - A new backend instance
    /// * `Err(BackendError::ConnectionError)` - If the URL is invalid or the transport cannot be built
    pub fn new(config: OpenSearchConfig) -> Result<Self, BackendError> {
        let parsed_url =
            Url::parse(&config.url).map_err(|e| BackendError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| BackendError::connection(e.to_string()))?;

        info!(url = %config.url, "Created OpenSearch backend");

        Ok(Self::from_client(OpenSearch::new(transport), config))
    }

    /// Wrap an already configured client, e.g. one with authentication.
    pub fn from_client(client: OpenSearch, config: OpenSearchConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &OpenSearchConfig {
        &self.config
    }

    /// Documents per bulk request. The config field is public and
    /// deserializable, so a zero is possible and treated as one.
    fn chunk_size(&self) -> usize {
        self.config.bulk_chunk_size.max(1)
    }

    /// Check whether the cluster is healthy (green or yellow).
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<bool, BackendError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response, "Health check").await?;

        let health: HealthResponse = response
            .json()
            .await
            .map_err(|e| BackendError::parse(e.to_string()))?;

        debug!(status = %health.status, "Cluster health");
        Ok(health.status == "green" || health.status == "yellow")
    }

    /// Create `index` with the default document mappings if it does not exist.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the index was created
    /// * `Ok(false)` - If the index already existed
    #[instrument(skip(self))]
    pub async fn ensure_index(&self, index: &str) -> Result<bool, BackendError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status_code().is_success() {
            debug!("Index already exists");
            return Ok(false);
        }
        if response.status_code().as_u16() != 404 {
            ensure_success(response, "Index exists check").await?;
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(get_index_settings())
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(response, "Create index").await?;

        info!(index, "Created index");
        Ok(true)
    }

    async fn bulk_chunk(
        &self,
        index: &str,
        documents: Vec<StoredDocument>,
    ) -> Result<BulkSummary, BackendError> {
        let ids: Vec<String> = documents.iter().map(|d| d.id.clone()).collect();
        let body = bulk_body(documents);

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response, "Bulk upsert").await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| BackendError::parse(e.to_string()))?;

        parse_bulk_response(body, &ids)
    }

    async fn next_page(&self, scroll_id: String) -> Result<SearchPage, BackendError> {
        let response = self
            .client
            .scroll(ScrollParts::None)
            .body(json!({
                "scroll": SCROLL_KEEP_ALIVE,
                "scroll_id": scroll_id
            }))
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response, "Scroll").await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| BackendError::parse(e.to_string()))?;

        parse_search_page(body)
    }

    /// Release a scroll context. Failures only cost server memory until the
    /// keep-alive expires, so they are logged and not returned.
    async fn clear_scroll(&self, scroll_id: &str) {
        let result = self
            .client
            .clear_scroll(ClearScrollParts::None)
            .body(json!({ "scroll_id": [scroll_id] }))
            .send()
            .await;

        match result {
            Ok(response) if response.status_code().is_success() => {}
            Ok(response) => warn!(status = %response.status_code(), "Failed to clear scroll"),
            Err(e) => warn!(error = %e, "Failed to clear scroll"),
        }
    }
}

#[async_trait]
impl DocumentBackend for OpenSearchBackend {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, index: &str, id: &str) -> Result<Option<FlatDocument>, BackendError> {
        let response = self
            .client
            .get(GetParts::IndexId(index, id))
            .send()
            .await
            .map_err(transport_error)?;

        // 404 covers both a missing document and a missing index
        if response.status_code().as_u16() == 404 {
            return Ok(None);
        }
        let response = ensure_success(response, "Get").await?;

        let body: GetResponse = response
            .json()
            .await
            .map_err(|e| BackendError::parse(e.to_string()))?;

        Ok(body.found.then(|| body.source.unwrap_or_default()))
    }

    /// Upsert documents with `index` actions, split into chunks of
    /// `bulk_chunk_size`.
    ///
    /// Chunks are sent in order. If a chunk fails as a whole, earlier chunks
    /// stay written.
    #[instrument(skip(self, documents), fields(document_count = documents.len()))]
    async fn bulk_upsert(
        &self,
        index: &str,
        documents: Vec<StoredDocument>,
    ) -> Result<BulkSummary, BackendError> {
        let mut summary = BulkSummary::default();
        let chunk_size = self.chunk_size();
        let mut remaining = documents.into_iter().peekable();

        while remaining.peek().is_some() {
            let chunk: Vec<StoredDocument> = remaining.by_ref().take(chunk_size).collect();
            summary.merge(self.bulk_chunk(index, chunk).await?);
        }

        if summary.failed > 0 {
            warn!(
                total = summary.total,
                failed = summary.failed,
                "Bulk upsert completed with failures"
            );
        } else {
            debug!(total = summary.total, "Bulk upsert completed");
        }

        Ok(summary)
    }

    #[instrument(level = "debug", skip(self))]
    async fn delete(&self, index: &str, id: &str) -> Result<bool, BackendError> {
        let response = self
            .client
            .delete(DeleteParts::IndexId(index, id))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status_code().as_u16() == 404 {
            return Ok(false);
        }
        ensure_success(response, "Delete").await?;

        Ok(true)
    }

    #[instrument(level = "debug", skip(self))]
    async fn count(&self, index: &str) -> Result<u64, BackendError> {
        let response = self
            .client
            .count(CountParts::Index(&[index]))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status_code().as_u16() == 404 {
            return Ok(0);
        }
        let response = ensure_success(response, "Count").await?;

        let body: CountResponse = response
            .json()
            .await
            .map_err(|e| BackendError::parse(e.to_string()))?;

        Ok(body.count)
    }

    #[instrument(level = "debug", skip(self))]
    async fn refresh(&self, index: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[index]))
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(response, "Refresh").await?;

        Ok(())
    }

    /// Return every matching document, scrolling in pages of
    /// `max_result_window` hits until the results run out.
    #[instrument(skip(self, filter))]
    async fn query(
        &self,
        index: &str,
        filter: Option<&Filter>,
    ) -> Result<Vec<StoredDocument>, BackendError> {
        let page_size = self.config.max_result_window.max(1);
        let body = build_filter_query(filter, page_size)?;
        debug!(query = %body, "Executing filter query");

        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .scroll(SCROLL_KEEP_ALIVE)
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status_code().as_u16() == 404 {
            return Ok(Vec::new());
        }
        let response = ensure_success(response, "Search").await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| BackendError::parse(e.to_string()))?;

        let first = parse_search_page(body)?;
        let (hits, scroll_id) = collect_pages(first, page_size, |id| self.next_page(id)).await;

        if let Some(scroll_id) = scroll_id {
            self.clear_scroll(&scroll_id).await;
        }

        let hits = hits?;
        debug!(hit_count = hits.len(), "Filter query completed");
        Ok(hits)
    }
}

/// Errors from sending a request never reached a usable response.
fn transport_error(err: opensearch::Error) -> BackendError {
    BackendError::connection(err.to_string())
}

/// Turn a non-success response into an error.
///
/// Authentication failures are reported as connection errors.
async fn ensure_success(response: Response, operation: &str) -> Result<Response, BackendError> {
    let status = response.status_code();
    if status.is_success() {
        return Ok(response);
    }

    let error_body = response.text().await.unwrap_or_default();
    error!(status = %status, body = %error_body, "{} request failed", operation);

    let message = format!("{} failed with status {}: {}", operation, status, error_body);
    match status.as_u16() {
        401 | 403 => Err(BackendError::connection(message)),
        _ => Err(BackendError::request(message)),
    }
}

/// Build the newline-delimited bulk body: one `index` action per document,
/// followed by its source.
fn bulk_body(documents: Vec<StoredDocument>) -> Vec<JsonBody<Value>> {
    let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(documents.len() * 2);

    for document in documents {
        body.push(json!({ "index": { "_id": document.id } }).into());
        body.push(Value::Object(document.source).into());
    }

    body
}

/// Map a bulk response onto per-document results.
///
/// Items are matched to `ids` by position, which is the order OpenSearch
/// guarantees.
fn parse_bulk_response(body: Value, ids: &[String]) -> Result<BulkSummary, BackendError> {
    let response: BulkResponse = serde_json::from_value(body)
        .map_err(|e| BackendError::parse(format!("Invalid bulk response: {}", e)))?;

    if response.items.len() != ids.len() {
        return Err(BackendError::parse(format!(
            "Bulk response has {} items for {} documents",
            response.items.len(),
            ids.len()
        )));
    }

    let results = response
        .items
        .into_iter()
        .zip(ids)
        .map(|(mut item, id)| {
            let Some(item) = item.remove("index") else {
                return BulkItemResult::failed(id.clone(), "missing index action result");
            };
            let id = item.id.unwrap_or_else(|| id.clone());

            match item.error {
                Some(error) => BulkItemResult::failed(id, describe_error(&error)),
                None if (200..300).contains(&item.status) => BulkItemResult::succeeded(id),
                None => BulkItemResult::failed(id, format!("status {}", item.status)),
            }
        })
        .collect();

    Ok(BulkSummary::from_results(results))
}

fn describe_error(error: &Value) -> String {
    match (
        error.get("type").and_then(Value::as_str),
        error.get("reason").and_then(Value::as_str),
    ) {
        (Some(kind), Some(reason)) => format!("{}: {}", kind, reason),
        _ => error.to_string(),
    }
}

/// Extract the scroll ID and `(id, source)` pairs from a search response.
fn parse_search_page(body: Value) -> Result<SearchPage, BackendError> {
    let response: SearchResponse = serde_json::from_value(body)
        .map_err(|e| BackendError::parse(format!("Invalid search response: {}", e)))?;

    Ok(SearchPage {
        scroll_id: response.scroll_id,
        hits: response
            .hits
            .hits
            .into_iter()
            .map(|hit| StoredDocument::new(hit.id, hit.source))
            .collect(),
    })
}

/// Fetch pages after `first` until one comes back short.
///
/// Returns the last known scroll ID alongside the result so the caller can
/// clear it, also when a page request fails.
async fn collect_pages<F, Fut>(
    first: SearchPage,
    page_size: usize,
    mut next_page: F,
) -> (Result<Vec<StoredDocument>, BackendError>, Option<String>)
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<SearchPage, BackendError>>,
{
    let mut scroll_id = first.scroll_id;
    let mut full_page = first.hits.len() >= page_size;
    let mut documents = first.hits;

    while full_page {
        let Some(id) = scroll_id.clone() else {
            return (
                Err(BackendError::parse("Search response has no scroll ID")),
                None,
            );
        };

        match next_page(id).await {
            Ok(page) => {
                full_page = page.hits.len() >= page_size;
                if page.scroll_id.is_some() {
                    scroll_id = page.scroll_id;
                }
                documents.extend(page.hits);
            }
            Err(e) => return (Err(e), scroll_id),
        }
    }

    (Ok(documents), scroll_id)
}
