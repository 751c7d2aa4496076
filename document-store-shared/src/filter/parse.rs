//! JSON to [`Filter`] parsing.

use serde_json::{Map, Value};

use super::{Comparison, ComparisonOp, Filter, FilterError, LogicalOp};

pub(super) fn parse_filter(value: &Value) -> Result<Filter, FilterError> {
    let object = value
        .as_object()
        .ok_or_else(|| FilterError::invalid("filters must be a JSON object"))?;

    Ok(Filter::all(parse_clauses(object, None)?))
}

/// Parse every entry of `object`. `field` is set when the entries sit under a
/// field name and therefore apply to that field.
fn parse_clauses(object: &Map<String, Value>, field: Option<&str>) -> Result<Vec<Filter>, FilterError> {
    object
        .iter()
        .map(|(key, value)| parse_entry(key, value, field))
        .collect()
}

fn parse_entry(key: &str, value: &Value, field: Option<&str>) -> Result<Filter, FilterError> {
    if let Some(op) = LogicalOp::from_key(key) {
        return parse_logical(op, key, value, field);
    }

    if let Some(op) = ComparisonOp::from_key(key) {
        let field = field.ok_or_else(|| {
            FilterError::invalid(format!("`{}` must be nested under a field name", key))
        })?;
        return Comparison::new(field, op, value.clone()).map(Filter::Comparison);
    }

    if key.starts_with('$') {
        return Err(FilterError::UnknownOperator(key.to_string()));
    }

    if let Some(parent) = field {
        return Err(FilterError::invalid(format!(
            "field `{}` cannot be nested under field `{}`",
            key, parent
        )));
    }

    match value {
        Value::Object(operators) => {
            if operators.is_empty() {
                return Err(FilterError::invalid(format!(
                    "field `{}` has no comparison operators",
                    key
                )));
            }
            Ok(Filter::all(parse_clauses(operators, Some(key))?))
        }
        Value::Array(_) => Comparison::new(key, ComparisonOp::In, value.clone()).map(Filter::Comparison),
        _ => Comparison::new(key, ComparisonOp::Eq, value.clone()).map(Filter::Comparison),
    }
}

fn parse_logical(
    op: LogicalOp,
    key: &str,
    value: &Value,
    field: Option<&str>,
) -> Result<Filter, FilterError> {
    let clauses = match value {
        Value::Object(entries) => parse_clauses(entries, field)?,
        Value::Array(items) => items
            .iter()
            .map(|item| {
                let entries = item.as_object().ok_or_else(|| {
                    FilterError::invalid(format!("`{}` list entries must be objects", key))
                })?;
                Ok(Filter::all(parse_clauses(entries, field)?))
            })
            .collect::<Result<Vec<_>, FilterError>>()?,
        _ => {
            return Err(FilterError::invalid(format!(
                "`{}` expects an object or a list of objects",
                key
            )))
        }
    };

    Ok(op.combine(clauses))
}
