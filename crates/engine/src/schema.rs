//! Caller-supplied model metadata.
//!
//! The engine never validates that referenced attributes exist; attribute
//! knowledge stays with the store. Relations are the exception: join
//! construction needs their definitions up front, so the registry reports
//! unknown relation names when a dotted path is resolved.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Registry of model schemas, keyed by resource type name.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    models: HashMap<String, ModelSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model, replacing any existing schema for its resource.
    pub fn register(&mut self, model: ModelSchema) {
        self.models.insert(model.resource.clone(), model);
    }

    /// Chained registration.
    pub fn with(mut self, model: ModelSchema) -> Self {
        self.register(model);
        self
    }

    /// Look up a model by resource type name.
    pub fn get(&self, resource: &str) -> Option<&ModelSchema> {
        self.models.get(resource)
    }
}

/// Schema for one resource type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSchema {
    /// Resource type name (used in `fields` keys and relation targets).
    pub resource: String,

    /// Backing table name.
    pub table: String,

    /// Storage-level column names that identify a single row. An `eq`
    /// filter on one of these switches the default query mode to
    /// single-record.
    #[serde(default)]
    pub unique_fields: Vec<String>,

    /// Named relations reachable from this model.
    #[serde(default)]
    pub relations: HashMap<String, RelationDef>,
}

impl ModelSchema {
    pub fn new(resource: &str, table: &str) -> Self {
        Self {
            resource: resource.to_string(),
            table: table.to_string(),
            unique_fields: Vec::new(),
            relations: HashMap::new(),
        }
    }

    /// Mark a storage column as a unique key.
    pub fn with_unique(mut self, field: &str) -> Self {
        self.unique_fields.push(field.to_string());
        self
    }

    /// Add a named relation.
    pub fn with_relation(mut self, name: &str, relation: RelationDef) -> Self {
        self.relations.insert(name.to_string(), relation);
        self
    }
}

/// Relation/join definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationDef {
    /// Target resource type.
    pub target: String,

    /// Column on the owning model for the join condition.
    pub local_field: String,

    /// Column on the target model for the join condition.
    pub foreign_field: String,

    /// Join type used when a filter or sort traverses this relation.
    #[serde(default)]
    pub join: JoinKind,

    /// Whether the relation resolves to at most one row. Singular
    /// relations embed as an object (or null), plural ones as an array.
    #[serde(default)]
    pub singular: bool,
}

impl RelationDef {
    pub fn new(target: &str, local_field: &str, foreign_field: &str) -> Self {
        Self {
            target: target.to_string(),
            local_field: local_field.to_string(),
            foreign_field: foreign_field.to_string(),
            join: JoinKind::default(),
            singular: false,
        }
    }

    /// Mark as resolving to at most one row.
    pub fn singular(mut self) -> Self {
        self.singular = true;
        self
    }

    /// Use a LEFT join for filter/sort traversal.
    pub fn left(mut self) -> Self {
        self.join = JoinKind::Left;
        self
    }
}

/// SQL join types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
}

/// Attribute-name transformation capability.
///
/// Invoked for plain (non-aggregate) field names only; aggregate
/// references bypass transformation entirely.
pub trait NameMapper: Send + Sync {
    /// Domain name (as it appears in request parameters) to storage name.
    fn to_storage(&self, name: &str) -> String;

    /// Storage name back to domain name.
    fn to_domain(&self, name: &str) -> String;
}

/// Pass-through mapper. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMapper;

impl NameMapper for IdentityMapper {
    fn to_storage(&self, name: &str) -> String {
        name.to_string()
    }

    fn to_domain(&self, name: &str) -> String {
        name.to_string()
    }
}

/// camelCase domain names over snake_case storage columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnakeCaseMapper;

impl NameMapper for SnakeCaseMapper {
    fn to_storage(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len() + 4);
        for c in name.chars() {
            if c.is_ascii_uppercase() {
                out.push('_');
                out.push(c.to_ascii_lowercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    fn to_domain(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        let mut upper_next = false;
        for c in name.chars() {
            if c == '_' {
                upper_next = true;
            } else if upper_next {
                out.push(c.to_ascii_uppercase());
                upper_next = false;
            } else {
                out.push(c);
            }
        }
        out
    }
}
