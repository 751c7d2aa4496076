//! Interface definitions for the document store.
//!
//! `DocumentBackend` is what the store needs from a storage engine and
//! `DocumentStore` is what the store offers to the retrieval framework.
//! Both are traits so backends and stores can be swapped and mocked.

mod document_backend;
mod document_store;

pub use document_backend::DocumentBackend;
pub use document_store::DocumentStore;
