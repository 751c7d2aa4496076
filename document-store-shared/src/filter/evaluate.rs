//! In-process evaluation of [`Filter`] trees against flat documents.

use std::borrow::Cow;
use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use super::{Comparison, ComparisonOp, Filter, ID_FIELD};
use crate::document::FlatDocument;

impl Filter {
    /// Check whether the document stored under `id` satisfies this filter.
    pub fn matches(&self, id: &str, document: &FlatDocument) -> bool {
        match self {
            Filter::And(clauses) => clauses.iter().all(|c| c.matches(id, document)),
            Filter::Or(clauses) => clauses.iter().any(|c| c.matches(id, document)),
            Filter::Not(clauses) => !clauses.iter().any(|c| c.matches(id, document)),
            Filter::Comparison(comparison) => {
                let actual = if comparison.field == ID_FIELD {
                    Some(Cow::Owned(Value::String(id.to_string())))
                } else {
                    document.get(&comparison.field).map(Cow::Borrowed)
                };
                comparison.matches(actual.as_deref())
            }
        }
    }
}

impl Comparison {
    /// Evaluate against the field's value, `None` if the field is missing.
    pub fn matches(&self, actual: Option<&Value>) -> bool {
        match self.op {
            ComparisonOp::Eq => equal_or_missing(actual, &self.value),
            ComparisonOp::Ne => !equal_or_missing(actual, &self.value),
            ComparisonOp::In => self.candidates().any(|c| equal_or_missing(actual, c)),
            ComparisonOp::NotIn => !self.candidates().any(|c| equal_or_missing(actual, c)),
            ComparisonOp::Gt => self.range_matches(actual, |o| o == Ordering::Greater),
            ComparisonOp::Gte => self.range_matches(actual, |o| o != Ordering::Less),
            ComparisonOp::Lt => self.range_matches(actual, |o| o == Ordering::Less),
            ComparisonOp::Lte => self.range_matches(actual, |o| o != Ordering::Greater),
        }
    }

    fn candidates(&self) -> impl Iterator<Item = &Value> {
        self.value.as_array().into_iter().flatten()
    }

    fn range_matches(&self, actual: Option<&Value>, accept: impl Fn(Ordering) -> bool) -> bool {
        match actual {
            Some(Value::Array(items)) => items
                .iter()
                .any(|item| compare(item, &self.value).is_some_and(&accept)),
            Some(value) => compare(value, &self.value).is_some_and(&accept),
            None => false,
        }
    }
}

/// Equality where a missing field compares equal to null.
fn equal_or_missing(actual: Option<&Value>, expected: &Value) -> bool {
    contains_equal(actual.unwrap_or(&Value::Null), expected)
}

/// Equality where an array-valued field matches if any element is equal.
fn contains_equal(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::Array(items) if !expected.is_array() => {
            items.iter().any(|item| scalar_equal(item, expected))
        }
        _ => scalar_equal(actual, expected),
    }
}

fn scalar_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Order two scalars. Values of different kinds are not comparable.
fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => match (parse_date(a), parse_date(b)) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => Some(a.cmp(b)),
        },
        _ => None,
    }
}

fn parse_date(value: &str) -> Option<NaiveDateTime> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.naive_utc());
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(datetime);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
