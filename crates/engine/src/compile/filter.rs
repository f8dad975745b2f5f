//! Filter compiler.
//!
//! Turns the raw `filter` mapping into predicate clauses. Top-level keys
//! are either a bare field key (the `eq` operator) or one of the reserved
//! operator names, whose value is itself a mapping of field key to raw
//! value interpreted under that operator.

use crate::error::ParamError;
use crate::params::path::FieldPath;
use crate::params::tokenize::split_values;
use serde_json::{Map, Value as JsonValue};

/// Filter comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equality (bare field keys). Multiple values OR together.
    Eq,
    /// Both-side substring match. Multiple values OR together.
    Like,
    /// Negated equality. Per-value negations AND together, so a row is
    /// excluded only when it matches none of the listed values.
    Not,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl FilterOperator {
    /// Resolve a reserved top-level filter key. `eq` has no reserved
    /// name — it is the interpretation of a bare field key.
    pub fn reserved(key: &str) -> Option<Self> {
        match key {
            "like" => Some(Self::Like),
            "not" => Some(Self::Not),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Like => "like",
            Self::Not => "not",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Gte => "gte",
        }
    }

    /// Ordering comparisons take exactly one non-null value.
    pub fn is_comparison(&self) -> bool {
        matches!(self, Self::Lt | Self::Lte | Self::Gt | Self::Gte)
    }
}

/// One atomic filter value.
///
/// The tokenized literal `"null"` (case-sensitive) and a raw JSON null
/// both become `Null` — requesting an IS NULL / IS NOT NULL predicate.
/// There is deliberately no way to match the literal text `"null"`.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
}

impl ScalarValue {
    fn from_token(token: String) -> Self {
        if token == "null" {
            Self::Null
        } else {
            Self::Text(token)
        }
    }

    /// Text rendering for substring matching.
    pub fn as_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Text(s) => s.clone(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
        }
    }
}

/// One predicate clause: operator, field path, and a non-empty value set.
///
/// Values within a clause OR together (AND of negations for `Not`);
/// clauses across different filter keys AND together.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub operator: FilterOperator,
    pub path: FieldPath,
    pub values: Vec<ScalarValue>,
}

/// Compile the raw filter mapping into predicate clauses.
pub fn compile(filter: &Map<String, JsonValue>) -> Result<Vec<FilterClause>, ParamError> {
    let mut clauses = Vec::new();

    for (key, value) in filter {
        match FilterOperator::reserved(key) {
            Some(operator) => {
                let fields = value.as_object().ok_or_else(|| ParamError::OperatorNotAMap {
                    operator: key.clone(),
                })?;
                for (field, raw) in fields {
                    clauses.push(build_clause(operator, field, raw)?);
                }
            }
            None => clauses.push(build_clause(FilterOperator::Eq, key, value)?),
        }
    }

    Ok(clauses)
}

fn build_clause(
    operator: FilterOperator,
    field: &str,
    raw: &JsonValue,
) -> Result<FilterClause, ParamError> {
    let values = scalar_values(field, raw)?;

    if operator.is_comparison() {
        if values.len() != 1 {
            return Err(ParamError::MultiValueComparison {
                operator: operator.as_str().to_string(),
                field: field.to_string(),
                count: values.len(),
            });
        }
        if values[0] == ScalarValue::Null {
            return Err(ParamError::NullComparison {
                operator: operator.as_str().to_string(),
                field: field.to_string(),
            });
        }
    }

    Ok(FilterClause {
        operator,
        path: FieldPath::parse(field),
        values,
    })
}

fn scalar_values(field: &str, raw: &JsonValue) -> Result<Vec<ScalarValue>, ParamError> {
    match raw {
        JsonValue::String(s) => Ok(split_values(s)
            .into_iter()
            .map(ScalarValue::from_token)
            .collect()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(vec![ScalarValue::Int(i)])
            } else if let Some(f) = n.as_f64() {
                Ok(vec![ScalarValue::Float(f)])
            } else {
                Err(ParamError::InvalidFilterValue {
                    field: field.to_string(),
                })
            }
        }
        JsonValue::Null => Ok(vec![ScalarValue::Null]),
        JsonValue::Bool(b) => Ok(vec![ScalarValue::Text(b.to_string())]),
        _ => Err(ParamError::InvalidFilterValue {
            field: field.to_string(),
        }),
    }
}
