//! OpenSearch index configuration and mappings.
//!
//! This module defines the settings and mappings used when the backend
//! creates a missing document index.

use serde_json::{json, Value};

/// Get the index settings and mappings for a document index.
///
/// The configuration includes:
/// - **Fixed fields**: `content` as text with a `raw` keyword subfield for
///   exact matches, `content_type` and `id_hash_keys` as keywords
/// - **Embedding**: stored, not indexed
/// - **Metadata**: dynamic; strings are mapped as keywords so filters match
///   exact values, dates and numbers keep their detected types
pub fn get_index_settings() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "mappings": {
            "dynamic_templates": [
                {
                    "strings_as_keywords": {
                        "match_mapping_type": "string",
                        "mapping": {
                            "type": "keyword"
                        }
                    }
                }
            ],
            "properties": {
                "content": {
                    "type": "text",
                    "fields": {
                        "raw": {
                            "type": "keyword",
                            "ignore_above": 8191
                        }
                    }
                },
                "content_type": {
                    "type": "keyword"
                },
                "id_hash_keys": {
                    "type": "keyword"
                },
                "score": {
                    "type": "double"
                },
                "embedding": {
                    "type": "float",
                    "index": false
                }
            }
        }
    })
}
