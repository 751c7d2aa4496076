//! Duplicate handling policy for document writes.

use serde::{Deserialize, Serialize};

/// What to do when a written document's ID already exists in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Reject the whole write call.
    #[default]
    Fail,
    /// Keep the existing document and ignore the new one.
    Skip,
    /// Replace the existing document with the new one.
    Overwrite,
}

impl DuplicatePolicy {
    /// Whether the policy needs to know if an ID already exists.
    ///
    /// `Overwrite` never looks anything up; the backend upsert replaces
    /// existing documents on its own.
    pub fn requires_lookup(self) -> bool {
        matches!(self, Self::Fail | Self::Skip)
    }
}
