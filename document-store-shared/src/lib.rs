//! # Document Store Shared
//!
//! Types shared between the document store and its backends: the framework
//! level [`Document`], the [`DuplicatePolicy`] applied on writes, and the
//! [`Filter`] tree used to select documents.

pub mod document;
pub mod filter;
pub mod policy;

pub use document::{ContentType, Document, DocumentBuilder, FlatDocument, RESERVED_FIELDS};
pub use filter::{Comparison, ComparisonOp, Filter, FilterError, LogicalOp};
pub use policy::DuplicatePolicy;
