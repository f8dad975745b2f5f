//! Per-call request parameters.
//!
//! `RequestParams` is the parsed parameter set: built fresh per query
//! call from a JSON-shaped value (or programmatically), immutable once
//! built, and discarded after the query executes. Parsing walks the
//! input strictly and reports a descriptive error for every malformed
//! shape before any store interaction.

pub mod path;
pub mod tokenize;

use crate::compile::include::IncludeRefine;
use crate::error::ParamError;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Parsed request parameters.
#[derive(Debug, Default)]
pub struct RequestParams {
    /// Raw filter mapping, compiled strictly by the filter compiler.
    pub filter: Map<String, JsonValue>,

    /// Sort keys in precedence order.
    pub sort: Vec<String>,

    /// Projection lists per resource type.
    pub fields: HashMap<String, Vec<String>>,

    /// Relation includes in declaration order.
    pub include: Vec<IncludeParam>,

    /// GROUP BY field names.
    pub group: Vec<String>,

    /// Explicit pagination, overriding the configured default.
    pub page: Option<PageParams>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON-shaped parameter object.
    ///
    /// Recognized keys are strictly shape-checked; unrecognized keys are
    /// tolerated, matching the source grammar for request objects that
    /// carry extraneous parameters. `null` (and an absent object) parse
    /// as the empty parameter set.
    pub fn from_value(value: JsonValue) -> Result<Self, ParamError> {
        let mut params = Self::default();
        let map = match value {
            JsonValue::Null => return Ok(params),
            JsonValue::Object(map) => map,
            _ => {
                return Err(ParamError::InvalidShape {
                    key: "parameters".to_string(),
                    expected: "an object",
                });
            }
        };

        for (key, value) in map {
            match key.as_str() {
                "filter" => params.filter = expect_object(&key, value)?,
                "sort" => params.sort = expect_string_list(&key, value)?,
                "group" => params.group = expect_string_list(&key, value)?,
                "fields" => {
                    for (resource, list) in expect_object(&key, value)? {
                        let entry = expect_string_list(&format!("fields.{resource}"), list)?;
                        params.fields.insert(resource, entry);
                    }
                }
                "include" => {
                    let JsonValue::Array(entries) = value else {
                        return Err(ParamError::InvalidShape {
                            key: key.clone(),
                            expected: "an array of relation paths",
                        });
                    };
                    for entry in entries {
                        let JsonValue::String(relation_path) = entry else {
                            return Err(ParamError::InvalidShape {
                                key: "include".to_string(),
                                expected:
                                    "relation path strings (attach refinements with with_include_refined)",
                            });
                        };
                        params.include.push(IncludeParam::Path(relation_path));
                    }
                }
                "page" => params.page = Some(PageParams::from_value(value)?),
                _ => {}
            }
        }

        Ok(params)
    }

    /// Add a bare relation include.
    pub fn with_include(mut self, relation_path: &str) -> Self {
        self.include.push(IncludeParam::Path(relation_path.to_string()));
        self
    }

    /// Add a relation include with a per-relation query refinement.
    pub fn with_include_refined<R>(mut self, relation_path: &str, refine: R) -> Self
    where
        R: IncludeRefine + 'static,
    {
        self.include.push(IncludeParam::Refined {
            path: relation_path.to_string(),
            refine: Arc::new(refine),
        });
        self
    }

    /// Set explicit pagination.
    pub fn with_page(mut self, limit: u64, offset: u64) -> Self {
        self.page = Some(PageParams { limit, offset });
        self
    }
}

/// One include entry: a bare relation path, or a path with an opaque
/// refinement capability for the scoped sub-query.
pub enum IncludeParam {
    Path(String),
    Refined {
        path: String,
        refine: Arc<dyn IncludeRefine>,
    },
}

impl IncludeParam {
    /// The relation path, regardless of refinement.
    pub fn path(&self) -> &str {
        match self {
            IncludeParam::Path(path) => path,
            IncludeParam::Refined { path, .. } => path,
        }
    }
}

impl fmt::Debug for IncludeParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncludeParam::Path(path) => f.debug_tuple("Path").field(path).finish(),
            IncludeParam::Refined { path, .. } => {
                f.debug_struct("Refined").field("path", path).finish_non_exhaustive()
            }
        }
    }
}

/// Explicit per-call pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub limit: u64,
    pub offset: u64,
}

impl PageParams {
    fn from_value(value: JsonValue) -> Result<Self, ParamError> {
        let JsonValue::Object(map) = value else {
            return Err(ParamError::InvalidShape {
                key: "page".to_string(),
                expected: "an object with limit and offset",
            });
        };

        let limit = match map.get("limit") {
            Some(value) => expect_u64("page.limit", value)?,
            None => return Err(ParamError::InvalidPageLimit),
        };
        if limit == 0 {
            return Err(ParamError::InvalidPageLimit);
        }
        let offset = match map.get("offset") {
            Some(value) => expect_u64("page.offset", value)?,
            None => 0,
        };

        Ok(Self { limit, offset })
    }
}

fn expect_object(key: &str, value: JsonValue) -> Result<Map<String, JsonValue>, ParamError> {
    match value {
        JsonValue::Object(map) => Ok(map),
        _ => Err(ParamError::InvalidShape {
            key: key.to_string(),
            expected: "an object",
        }),
    }
}

fn expect_string_list(key: &str, value: JsonValue) -> Result<Vec<String>, ParamError> {
    let JsonValue::Array(entries) = value else {
        return Err(ParamError::InvalidShape {
            key: key.to_string(),
            expected: "an array of strings",
        });
    };
    entries
        .into_iter()
        .map(|entry| match entry {
            JsonValue::String(s) => Ok(s),
            _ => Err(ParamError::InvalidShape {
                key: key.to_string(),
                expected: "an array of strings",
            }),
        })
        .collect()
}

fn expect_u64(key: &str, value: &JsonValue) -> Result<u64, ParamError> {
    value.as_u64().ok_or_else(|| ParamError::InvalidShape {
        key: key.to_string(),
        expected: "a non-negative integer",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_input_parses() {
        assert!(RequestParams::from_value(JsonValue::Null).unwrap().filter.is_empty());
        assert!(RequestParams::from_value(json!({})).unwrap().sort.is_empty());
    }

    #[test]
    fn full_shape_parses() {
        let params = RequestParams::from_value(json!({
            "filter": {"name": "Rex"},
            "sort": ["-age", "name"],
            "fields": {"person": ["name", "age"]},
            "include": ["pets", "pets.toy"],
            "group": ["gender"],
            "page": {"limit": 10, "offset": 20},
        }))
        .unwrap();

        assert_eq!(params.sort, vec!["-age", "name"]);
        assert_eq!(params.fields["person"], vec!["name", "age"]);
        assert_eq!(params.include.len(), 2);
        assert_eq!(params.include[1].path(), "pets.toy");
        assert_eq!(
            params.page,
            Some(PageParams {
                limit: 10,
                offset: 20
            })
        );
    }

    #[test]
    fn unknown_keys_tolerated() {
        let params = RequestParams::from_value(json!({"token": "abc", "sort": []})).unwrap();
        assert!(params.sort.is_empty());
    }

    #[test]
    fn wrong_shapes_fail_fast() {
        assert!(RequestParams::from_value(json!([])).is_err());
        assert!(RequestParams::from_value(json!({"filter": []})).is_err());
        assert!(RequestParams::from_value(json!({"sort": "name"})).is_err());
        assert!(RequestParams::from_value(json!({"sort": [1]})).is_err());
        assert!(RequestParams::from_value(json!({"fields": {"person": "name"}})).is_err());
        assert!(RequestParams::from_value(json!({"include": [{"pets": 1}]})).is_err());
    }

    #[test]
    fn page_limit_validated() {
        assert!(matches!(
            RequestParams::from_value(json!({"page": {"limit": 0}})),
            Err(ParamError::InvalidPageLimit)
        ));
        assert!(matches!(
            RequestParams::from_value(json!({"page": {"offset": 5}})),
            Err(ParamError::InvalidPageLimit)
        ));
        assert!(RequestParams::from_value(json!({"page": {"limit": -1}})).is_err());
    }

    #[test]
    fn refined_include_keeps_order() {
        let params = RequestParams::new()
            .with_include("pets")
            .with_include_refined("pets.toy", |_query: &mut sea_query::SelectStatement| {});

        assert_eq!(params.include[0].path(), "pets");
        assert!(matches!(&params.include[1], IncludeParam::Refined { .. }));
    }
}
