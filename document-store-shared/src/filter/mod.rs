//! Filter trees for selecting documents.
//!
//! Filters are written as nested JSON objects. Keys are logical operators
//! (`$and`, `$or`, `$not`), comparison operators (`$eq`, `$ne`, `$in`,
//! `$nin`, `$gt`, `$gte`, `$lt`, `$lte`) or field names:
//!
//! ```json
//! {
//!     "type": "article",
//!     "date": {"$gte": "2015-01-01", "$lt": "2021-01-01"},
//!     "rating": {"$gte": 3},
//!     "$or": {
//!         "genre": ["economy", "politics"],
//!         "publisher": "nytimes"
//!     }
//! }
//! ```
//!
//! Entries on the same level are combined with `$and`. A bare value under a
//! field means `$eq`, a list means `$in`. A logical operator may also take a
//! list of objects, each object being an implicit `$and` of its entries.

mod evaluate;
mod parse;

use serde_json::Value;
use thiserror::Error;

/// Pseudo-field addressing the document ID rather than a stored field.
pub const ID_FIELD: &str = "id";

/// Errors raised while parsing a filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The filter does not follow the filter grammar.
    #[error("Invalid filter: {0}")]
    Invalid(String),

    /// An operator key is not recognised.
    #[error("Unknown filter operator: {0}")]
    UnknownOperator(String),
}

impl FilterError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Logical operators combining several clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

impl LogicalOp {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "$and" => Some(Self::And),
            "$or" => Some(Self::Or),
            "$not" => Some(Self::Not),
            _ => None,
        }
    }

    /// Build the filter node for this operator over `clauses`.
    pub fn combine(self, clauses: Vec<Filter>) -> Filter {
        match self {
            Self::And => Filter::all(clauses),
            Self::Or => Filter::Or(clauses),
            Self::Not => Filter::Not(clauses),
        }
    }
}

/// Comparison operators applied to a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    In,
    NotIn,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl ComparisonOp {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "$eq" => Some(Self::Eq),
            "$ne" => Some(Self::Ne),
            "$in" => Some(Self::In),
            "$nin" => Some(Self::NotIn),
            "$gt" => Some(Self::Gt),
            "$gte" => Some(Self::Gte),
            "$lt" => Some(Self::Lt),
            "$lte" => Some(Self::Lte),
            _ => None,
        }
    }

    pub fn as_key(&self) -> &'static str {
        match self {
            Self::Eq => "$eq",
            Self::Ne => "$ne",
            Self::In => "$in",
            Self::NotIn => "$nin",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
        }
    }

    /// Whether the operator takes a list of values.
    pub fn takes_list(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    /// Whether the operator is an ordering comparison.
    pub fn is_range(&self) -> bool {
        matches!(self, Self::Gt | Self::Gte | Self::Lt | Self::Lte)
    }
}

/// A single `field <op> value` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub field: String,
    pub op: ComparisonOp,
    pub value: Value,
}

impl Comparison {
    /// Create a comparison, checking that `value` fits the operator.
    pub fn new(field: impl Into<String>, op: ComparisonOp, value: Value) -> Result<Self, FilterError> {
        let field = field.into();

        if op.takes_list() {
            if !value.is_array() {
                return Err(FilterError::invalid(format!(
                    "`{}` on field `{}` expects a list of values",
                    op.as_key(),
                    field
                )));
            }
        } else if value.is_array() || value.is_object() {
            return Err(FilterError::invalid(format!(
                "`{}` on field `{}` expects a single value",
                op.as_key(),
                field
            )));
        }

        if op.is_range() && !(value.is_number() || value.is_string()) {
            return Err(FilterError::invalid(format!(
                "`{}` on field `{}` expects a number or a string",
                op.as_key(),
                field
            )));
        }

        Ok(Self { field, op, value })
    }
}

/// A parsed filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every clause must match.
    And(Vec<Filter>),
    /// At least one clause must match.
    Or(Vec<Filter>),
    /// No clause may match.
    Not(Vec<Filter>),
    /// Leaf predicate.
    Comparison(Comparison),
}

impl Filter {
    /// Parse a filter from its JSON form.
    pub fn parse(value: &Value) -> Result<Self, FilterError> {
        parse::parse_filter(value)
    }

    /// Parse a filter from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, FilterError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| FilterError::invalid(format!("filter is not valid JSON: {}", e)))?;
        Self::parse(&value)
    }

    /// Conjunction of `clauses`, collapsing a single clause to itself.
    pub fn all(mut clauses: Vec<Filter>) -> Self {
        if clauses.len() == 1 {
            clauses.remove(0)
        } else {
            Self::And(clauses)
        }
    }

    /// `field == value`
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Comparison(Comparison {
            field: field.into(),
            op: ComparisonOp::Eq,
            value: value.into(),
        })
    }

    /// `field` is one of `values`.
    pub fn one_of(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::Comparison(Comparison {
            field: field.into(),
            op: ComparisonOp::In,
            value: Value::Array(values),
        })
    }
}

impl TryFrom<Value> for Filter {
    type Error = FilterError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}
