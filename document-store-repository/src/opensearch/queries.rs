//! OpenSearch query builders.
//!
//! This module translates document filters into the OpenSearch query DSL.
//! Every clause runs in filter context, so no relevance scores are computed.

use serde_json::{json, Value};

use crate::errors::BackendError;
use document_store_shared::document::CONTENT;
use document_store_shared::filter::ID_FIELD;
use document_store_shared::{Comparison, ComparisonOp, Filter};

/// Build a search request body for `filter`, or a `match_all` if `None`.
///
/// # Arguments
///
/// * `filter` - The filter to translate
/// * `size` - Number of hits per page
pub fn build_filter_query(filter: Option<&Filter>, size: usize) -> Result<Value, BackendError> {
    let query = match filter {
        Some(filter) => translate(filter)?,
        None => json!({ "match_all": {} }),
    };

    Ok(json!({
        "query": query,
        "size": size
    }))
}

/// Translate a filter tree into a query clause.
fn translate(filter: &Filter) -> Result<Value, BackendError> {
    match filter {
        Filter::And(clauses) => Ok(json!({
            "bool": { "filter": translate_all(clauses)? }
        })),
        Filter::Or(clauses) => Ok(json!({
            "bool": {
                "should": translate_all(clauses)?,
                "minimum_should_match": 1
            }
        })),
        Filter::Not(clauses) => Ok(must_not(translate_all(clauses)?)),
        Filter::Comparison(comparison) => translate_comparison(comparison),
    }
}

fn translate_all(clauses: &[Filter]) -> Result<Vec<Value>, BackendError> {
    clauses.iter().map(translate).collect()
}

fn must_not(clauses: Vec<Value>) -> Value {
    json!({ "bool": { "must_not": clauses } })
}

fn translate_comparison(comparison: &Comparison) -> Result<Value, BackendError> {
    if comparison.field == ID_FIELD {
        return translate_id_comparison(comparison);
    }

    let field = keyword_field(&comparison.field);
    let value = &comparison.value;

    let clause = match comparison.op {
        // A null value matches documents where the field is absent
        ComparisonOp::Eq if value.is_null() => must_not(vec![exists(&field)]),
        ComparisonOp::Ne if value.is_null() => exists(&field),
        ComparisonOp::Eq => json!({ "term": { field: value } }),
        ComparisonOp::Ne => must_not(vec![json!({ "term": { field: value } })]),
        ComparisonOp::In => one_of(&field, value),
        ComparisonOp::NotIn => must_not(vec![one_of(&field, value)]),
        ComparisonOp::Gt | ComparisonOp::Gte | ComparisonOp::Lt | ComparisonOp::Lte => json!({
            "range": { field: { range_key(comparison.op): value } }
        }),
    };

    Ok(clause)
}

/// Match any of the listed values. A null candidate matches documents where
/// the field is absent, which `terms` cannot express.
fn one_of(field: &str, value: &Value) -> Value {
    let (nulls, values): (Vec<&Value>, Vec<&Value>) = value
        .as_array()
        .into_iter()
        .flatten()
        .partition(|v| v.is_null());

    let terms = json!({ "terms": { field: values } });
    if nulls.is_empty() {
        return terms;
    }

    let missing = must_not(vec![exists(field)]);
    if values.is_empty() {
        return missing;
    }

    json!({
        "bool": {
            "should": [terms, missing],
            "minimum_should_match": 1
        }
    })
}

/// The document ID is not a source field; it is matched with an `ids` query.
fn translate_id_comparison(comparison: &Comparison) -> Result<Value, BackendError> {
    // IDs are never null
    let values: Vec<&Value> = match &comparison.value {
        Value::Array(values) => values.iter().filter(|v| !v.is_null()).collect(),
        Value::Null => Vec::new(),
        value => vec![value],
    };
    let ids = json!({ "ids": { "values": values } });

    match comparison.op {
        ComparisonOp::Eq | ComparisonOp::In => Ok(ids),
        ComparisonOp::Ne | ComparisonOp::NotIn => Ok(must_not(vec![ids])),
        op => Err(BackendError::invalid_query(format!(
            "operator {} is not supported on the `{}` field",
            op.as_key(),
            ID_FIELD
        ))),
    }
}

fn exists(field: &str) -> Value {
    json!({ "exists": { "field": field } })
}

fn range_key(op: ComparisonOp) -> &'static str {
    match op {
        ComparisonOp::Gt => "gt",
        ComparisonOp::Gte => "gte",
        ComparisonOp::Lt => "lt",
        _ => "lte",
    }
}

/// Exact matches on `content` go to its keyword subfield.
fn keyword_field(field: &str) -> String {
    if field == CONTENT {
        format!("{}.raw", CONTENT)
    } else {
        field.to_string()
    }
}
