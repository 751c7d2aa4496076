//! # Document Store Repository
//!
//! This crate provides a document store over schemaless search backends. It
//! includes definitions for errors, the store and backend interfaces, the
//! mapping between documents and flat backend documents, an in-memory
//! backend and a concrete backend for OpenSearch.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod mapper;
pub mod memory;
pub mod opensearch;
pub mod policy;
pub mod store;
pub mod types;

pub use config::StoreConfig;
pub use errors::{BackendError, DocumentStoreError};
pub use interfaces::{DocumentBackend, DocumentStore};
pub use memory::InMemoryBackend;
pub use opensearch::{OpenSearchBackend, OpenSearchConfig};
pub use policy::{decide, WriteAction};
pub use store::IndexDocumentStore;
pub use types::{BulkItemResult, BulkSummary, StoredDocument};
