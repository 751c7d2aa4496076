//! Duplicate policy decisions.

use document_store_shared::DuplicatePolicy;

/// What to do with a document during a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    /// Add the document to the bulk upsert.
    Stage,
    /// Leave the document out and continue.
    Skip,
    /// Fail the whole write call.
    Abort,
}

/// Decide how to handle a document given whether its ID already exists.
///
/// `existing` covers both documents in the backend and documents staged
/// earlier in the same write call.
pub fn decide(existing: bool, policy: DuplicatePolicy) -> WriteAction {
    match (existing, policy) {
        (false, _) | (true, DuplicatePolicy::Overwrite) => WriteAction::Stage,
        (true, DuplicatePolicy::Skip) => WriteAction::Skip,
        (true, DuplicatePolicy::Fail) => WriteAction::Abort,
    }
}
