//! Sort compiler.

use crate::params::path::FieldPath;
use serde::{Deserialize, Serialize};

/// Sort direction. A leading `-` on the raw token selects `Desc`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One ORDER BY key. Sequence order is precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub path: FieldPath,
    pub direction: SortDirection,
}

/// Compile sort entries, preserving input order.
pub fn compile(entries: &[String]) -> Vec<SortKey> {
    entries
        .iter()
        .map(|raw| {
            let (direction, key) = match raw.strip_prefix('-') {
                Some(rest) => (SortDirection::Desc, rest),
                None => (SortDirection::Asc, raw.as_str()),
            };
            SortKey {
                path: FieldPath::parse(key),
                direction,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_selects_direction() {
        let keys = compile(&["-age".to_string(), "name".to_string()]);
        assert_eq!(keys[0].direction, SortDirection::Desc);
        assert_eq!(keys[0].path.attribute, "age");
        assert_eq!(keys[1].direction, SortDirection::Asc);
    }

    #[test]
    fn input_order_preserved() {
        let keys = compile(&["b".to_string(), "a".to_string()]);
        assert_eq!(keys[0].path.attribute, "b");
        assert_eq!(keys[1].path.attribute, "a");
    }

    #[test]
    fn relation_qualified_key() {
        let keys = compile(&["-pets.name".to_string()]);
        assert_eq!(keys[0].path.relations, vec!["pets"]);
        assert_eq!(keys[0].direction, SortDirection::Desc);
    }
}
