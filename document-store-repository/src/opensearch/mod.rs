//! OpenSearch implementation of the document backend.
//!
//! This module provides a concrete implementation of `DocumentBackend`
//! using OpenSearch, along with its configuration, index mappings and the
//! translation of filters into the query DSL.

mod client;
mod config;
mod index_config;
mod queries;

pub use client::OpenSearchBackend;
pub use config::OpenSearchConfig;
pub use index_config::get_index_settings;
pub use queries::build_filter_query;
