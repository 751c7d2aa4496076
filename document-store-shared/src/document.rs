//! Framework-level document type.
//!
//! A [`Document`] has a handful of fixed fields plus an open metadata bag.
//! Backends never see this type directly; they store a [`FlatDocument`]
//! where the fixed fields and the metadata share one level.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Flat document body as persisted by a backend.
pub type FlatDocument = Map<String, Value>;

/// Field holding the primary payload.
pub const CONTENT: &str = "content";
/// Field holding the payload kind.
pub const CONTENT_TYPE: &str = "content_type";
/// Field holding the optional embedding vector.
pub const EMBEDDING: &str = "embedding";
/// Field holding the names of metadata keys that feed the ID hash.
pub const ID_HASH_KEYS: &str = "id_hash_keys";
/// Field holding the optional relevance score.
pub const SCORE: &str = "score";
/// Legacy field written by earlier store layouts. Never surfaced as metadata.
pub const SOURCE: &str = "source";

/// Field names owned by the document itself. They are never reported as
/// metadata when a document is read back from a backend.
pub const RESERVED_FIELDS: [&str; 6] = [CONTENT, CONTENT_TYPE, EMBEDDING, ID_HASH_KEYS, SCORE, SOURCE];

/// Returns `true` if `key` is one of [`RESERVED_FIELDS`].
pub fn is_reserved(key: &str) -> bool {
    RESERVED_FIELDS.contains(&key)
}

/// Kind of payload carried in [`Document::content`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Table,
    Image,
    Audio,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Table => "table",
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "table" => Ok(Self::Table),
            "image" => Ok(Self::Image),
            "audio" => Ok(Self::Audio),
            other => Err(format!("unknown content type `{}`", other)),
        }
    }
}

/// A document as seen by the retrieval framework.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier, caller-supplied or derived from the content.
    pub id: String,
    /// Primary payload.
    pub content: Option<String>,
    /// Kind of payload.
    #[serde(default)]
    pub content_type: ContentType,
    /// Relevance score, if the document came out of a ranked retrieval.
    pub score: Option<f64>,
    /// Dense embedding of the content.
    pub embedding: Option<Vec<f32>>,
    /// Metadata keys whose values take part in the derived ID.
    #[serde(default)]
    pub id_hash_keys: Vec<String>,
    /// Open metadata bag.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Document {
    /// Start building a document.
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::default()
    }

    /// Create a text document whose ID is derived from its content.
    pub fn from_content(content: impl Into<String>) -> Self {
        Self::builder().content(content).build()
    }

    /// Compute the content-derived ID for the given fields.
    ///
    /// The ID is a UUID v5 over the content, the content type and the
    /// values of every metadata key named in `id_hash_keys`. Metadata that is
    /// not named there does not change the ID.
    pub fn derive_id(
        content: Option<&str>,
        content_type: ContentType,
        id_hash_keys: &[String],
        metadata: &Map<String, Value>,
    ) -> String {
        let mut input = String::new();
        input.push_str(content.unwrap_or_default());
        input.push('\u{1f}');
        input.push_str(content_type.as_str());
        for key in id_hash_keys {
            input.push('\u{1f}');
            input.push_str(key);
            input.push('=');
            if let Some(value) = metadata.get(key) {
                input.push_str(&value.to_string());
            }
        }
        Uuid::new_v5(&Uuid::NAMESPACE_OID, input.as_bytes()).to_string()
    }

    /// Look up a metadata value.
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}

/// Builder for [`Document`].
#[derive(Debug, Clone, Default)]
pub struct DocumentBuilder {
    id: Option<String>,
    content: Option<String>,
    content_type: ContentType,
    score: Option<f64>,
    embedding: Option<Vec<f32>>,
    id_hash_keys: Vec<String>,
    metadata: Map<String, Value>,
}

impl DocumentBuilder {
    /// Use an explicit ID instead of the derived one.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Add a metadata key to the ID hash.
    pub fn id_hash_key(mut self, key: impl Into<String>) -> Self {
        self.id_hash_keys.push(key.into());
        self
    }

    /// Set one metadata entry.
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Replace the whole metadata bag.
    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn build(self) -> Document {
        let id = self.id.unwrap_or_else(|| {
            Document::derive_id(
                self.content.as_deref(),
                self.content_type,
                &self.id_hash_keys,
                &self.metadata,
            )
        });

        Document {
            id,
            content: self.content,
            content_type: self.content_type,
            score: self.score,
            embedding: self.embedding,
            id_hash_keys: self.id_hash_keys,
            metadata: self.metadata,
        }
    }
}
