//! Conversion between `Document` and the backend's flat document shape.
//!
//! On the way out the fixed fields and every metadata entry are written to
//! the same level. On the way back the fixed fields are taken out and
//! whatever is left becomes metadata.
//!
//! Metadata keys named like a fixed field (`content`, `score`, ...) do not
//! round trip: on write the metadata value replaces the fixed field, and on
//! read it comes back as the fixed field. A metadata key named `source` is
//! written as is but dropped on read, since that name is reserved for a
//! legacy field. This is a known limitation of the flat layout and is not
//! corrected here.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::errors::DocumentStoreError;
use document_store_shared::document::{CONTENT, CONTENT_TYPE, EMBEDDING, ID_HASH_KEYS, SCORE, SOURCE};
use document_store_shared::{ContentType, Document, FlatDocument};

/// Project a document into its flat backend form.
///
/// The ID is not part of the body; it is the storage key.
pub fn to_backend(document: &Document) -> FlatDocument {
    let mut source = FlatDocument::new();

    source.insert(CONTENT.to_string(), json!(document.content));
    source.insert(
        CONTENT_TYPE.to_string(),
        Value::String(document.content_type.as_str().to_string()),
    );
    source.insert(ID_HASH_KEYS.to_string(), json!(document.id_hash_keys));
    source.insert(EMBEDDING.to_string(), json!(document.embedding));
    source.insert(SCORE.to_string(), json!(document.score));

    // Unvalidated merge, later keys win
    for (key, value) in &document.metadata {
        source.insert(key.clone(), value.clone());
    }

    source
}

/// Rebuild a document from the flat body stored under `id`.
pub fn from_backend(id: impl Into<String>, mut source: FlatDocument) -> Result<Document, DocumentStoreError> {
    let id = id.into();

    let content = take_field::<String>(&mut source, CONTENT, &id)?;
    let content_type = take_field::<ContentType>(&mut source, CONTENT_TYPE, &id)?.unwrap_or_default();
    let id_hash_keys = take_field::<Vec<String>>(&mut source, ID_HASH_KEYS, &id)?.unwrap_or_default();
    let score = take_field::<f64>(&mut source, SCORE, &id)?;
    let embedding = take_field::<Vec<f32>>(&mut source, EMBEDDING, &id)?;
    source.remove(SOURCE);

    Ok(Document {
        id,
        content,
        content_type,
        score,
        embedding,
        id_hash_keys,
        metadata: source,
    })
}

/// Remove `field` from `source`, treating JSON `null` as absent.
fn take_field<T: DeserializeOwned>(
    source: &mut FlatDocument,
    field: &str,
    id: &str,
) -> Result<Option<T>, DocumentStoreError> {
    match source.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
            DocumentStoreError::invalid_document(format!(
                "document {} has an invalid `{}` field: {}",
                id, field, e
            ))
        }),
    }
}
