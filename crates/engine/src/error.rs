//! Engine error types.

use thiserror::Error;

/// Malformed-parameter errors.
///
/// Raised synchronously while parsing or compiling request parameters,
/// before any store interaction. Never retried.
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("parameter '{key}' must be {expected}")]
    InvalidShape { key: String, expected: &'static str },

    #[error("filter operator '{operator}' must map field names to values")]
    OperatorNotAMap { operator: String },

    #[error("filter value for '{field}' must be a string, number, boolean, or null")]
    InvalidFilterValue { field: String },

    #[error("filter operator '{operator}' on '{field}' takes a single value, got {count}")]
    MultiValueComparison {
        operator: String,
        field: String,
        count: usize,
    },

    #[error("filter operator '{operator}' on '{field}' cannot compare against null")]
    NullComparison { operator: String, field: String },

    #[error("page limit must be at least 1")]
    InvalidPageLimit,
}

/// Engine errors.
///
/// Store failures are passed through unmodified; unknown columns surface
/// from PostgreSQL at execution time, unknown relations from the schema
/// registry when join resolution is attempted.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Param(#[from] ParamError),

    #[error("invalid engine configuration: {0}")]
    Config(String),

    #[error("unknown resource type '{0}'")]
    UnknownResource(String),

    #[error("unknown relation '{relation}' on '{model}'")]
    UnknownRelation { model: String, relation: String },

    #[error("database error")]
    Store(#[from] sqlx::Error),
}

/// Result type alias using EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
