//! Dotted field-key resolution.

use std::fmt;

/// A field key split into a relation path and a terminal attribute.
///
/// `pets.toy.type` resolves to relations `[pets, toy]` and attribute
/// `type`; a key without dots has an empty relation path. No existence
/// validation is performed — unresolvable attributes are store-level
/// failures at execution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    /// Relation names in traversal order. Empty for a local field.
    pub relations: Vec<String>,

    /// Terminal attribute name.
    pub attribute: String,
}

impl FieldPath {
    /// Split a dotted field key.
    pub fn parse(key: &str) -> Self {
        let mut segments: Vec<String> = key.split('.').map(str::to_string).collect();
        // split always yields at least one segment
        let attribute = segments.pop().unwrap_or_default();
        Self {
            relations: segments,
            attribute,
        }
    }

    /// Whether the field lives on the primary model.
    pub fn is_local(&self) -> bool {
        self.relations.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for relation in &self.relations {
            write!(f, "{relation}.")?;
        }
        write!(f, "{}", self.attribute)
    }
}
