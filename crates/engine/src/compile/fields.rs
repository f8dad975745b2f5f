//! Field projector.
//!
//! Resolves per-resource-type projection lists and GROUP BY entries.
//! Field names matching the closed aggregate grammar pass through
//! verbatim, exempt from attribute-name transformation.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Pattern for aggregate references: `function(argument)`.
///
/// # Panics
///
/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static AGGREGATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(count|sum|avg|max|min)\((.+)\)$").expect("valid regex literal"));

/// Whitelisted aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

impl AggregateFunction {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "count" => Some(Self::Count),
            "sum" => Some(Self::Sum),
            "avg" => Some(Self::Avg),
            "max" => Some(Self::Max),
            "min" => Some(Self::Min),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Max => "max",
            Self::Min => "min",
        }
    }
}

/// One projection entry: a plain attribute (subject to name
/// transformation) or an aggregate reference (passed through verbatim,
/// aliased by function name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionField {
    Attribute(String),
    Aggregate {
        function: AggregateFunction,
        argument: String,
    },
}

/// Parse one field name.
pub fn parse_field(raw: &str) -> ProjectionField {
    if let Some(caps) = AGGREGATE_RE.captures(raw)
        && let Some(function) = AggregateFunction::from_name(&caps[1])
    {
        return ProjectionField::Aggregate {
            function,
            argument: caps[2].to_string(),
        };
    }
    ProjectionField::Attribute(raw.to_string())
}

/// Compile the fields mapping into per-resource-type projection lists.
pub fn compile(fields: &HashMap<String, Vec<String>>) -> HashMap<String, Vec<ProjectionField>> {
    fields
        .iter()
        .map(|(resource, names)| {
            let list = names.iter().map(|name| parse_field(name)).collect();
            (resource.clone(), list)
        })
        .collect()
}

/// Compile GROUP BY entries under the same resolution rules.
pub fn compile_group(group: &[String]) -> Vec<ProjectionField> {
    group.iter().map(|name| parse_field(name)).collect()
}
