//! Include resolver.
//!
//! Turns include entries into relation-inclusion specs. Nested paths are
//! preserved verbatim; the execution layer loads intermediate relations
//! along the path. Declaring both `pets` and `pets.toy` is valid — the
//! specs merge into one traversal tree at execution time.

use crate::params::IncludeParam;
use sea_query::SelectStatement;
use std::fmt;
use std::sync::Arc;

/// Per-relation query refinement capability.
///
/// Invoked with the scoped statement for that relation before it runs.
pub trait IncludeRefine: Send + Sync {
    fn refine(&self, query: &mut SelectStatement);
}

impl<F> IncludeRefine for F
where
    F: Fn(&mut SelectStatement) + Send + Sync,
{
    fn refine(&self, query: &mut SelectStatement) {
        self(query);
    }
}

/// One compiled include: a relation path plus an optional refinement.
#[derive(Clone)]
pub struct IncludeSpec {
    /// Relation names in traversal order. Never empty.
    pub path: Vec<String>,
    pub refine: Option<Arc<dyn IncludeRefine>>,
}

impl fmt::Debug for IncludeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncludeSpec")
            .field("path", &self.path)
            .field("refined", &self.refine.is_some())
            .finish()
    }
}

/// Compile include entries in declaration order.
pub fn compile(entries: &[IncludeParam]) -> Vec<IncludeSpec> {
    entries
        .iter()
        .map(|entry| match entry {
            IncludeParam::Path(path) => IncludeSpec {
                path: split_path(path),
                refine: None,
            },
            IncludeParam::Refined { path, refine } => IncludeSpec {
                path: split_path(path),
                refine: Some(refine.clone()),
            },
        })
        .collect()
}

fn split_path(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

/// One node of the merged include traversal tree.
pub struct IncludeNode {
    pub name: String,
    pub refine: Option<Arc<dyn IncludeRefine>>,
    pub children: Vec<IncludeNode>,
}

impl fmt::Debug for IncludeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncludeNode")
            .field("name", &self.name)
            .field("refined", &self.refine.is_some())
            .field("children", &self.children)
            .finish()
    }
}

impl IncludeNode {
    /// Merge compiled specs into a traversal tree. `pets` and `pets.toy`
    /// share the `pets` node; a refinement declared on a path applies to
    /// that path's terminal node.
    pub fn tree(specs: &[IncludeSpec]) -> Vec<IncludeNode> {
        let mut roots = Vec::new();
        for spec in specs {
            insert(&mut roots, &spec.path, &spec.refine);
        }
        roots
    }
}

fn insert(nodes: &mut Vec<IncludeNode>, path: &[String], refine: &Option<Arc<dyn IncludeRefine>>) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };
    let index = match nodes.iter().position(|node| node.name == *head) {
        Some(index) => index,
        None => {
            nodes.push(IncludeNode {
                name: head.clone(),
                refine: None,
                children: Vec::new(),
            });
            nodes.len() - 1
        }
    };
    if rest.is_empty() {
        if refine.is_some() {
            nodes[index].refine = refine.clone();
        }
    } else {
        insert(&mut nodes[index].children, rest, refine);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(path: &str) -> IncludeSpec {
        IncludeSpec {
            path: split_path(path),
            refine: None,
        }
    }

    #[test]
    fn compile_splits_paths() {
        let specs = compile(&[IncludeParam::Path("pets.toy".to_string())]);
        assert_eq!(specs[0].path, vec!["pets", "toy"]);
        assert!(specs[0].refine.is_none());
    }

    #[test]
    fn tree_merges_shared_prefixes() {
        let tree = IncludeNode::tree(&[spec("pets"), spec("pets.toy"), spec("movie")]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].name, "pets");
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].name, "toy");
        assert_eq!(tree[1].name, "movie");
    }

    #[test]
    fn nested_path_creates_intermediate_nodes() {
        let tree = IncludeNode::tree(&[spec("pets.toy.part")]);

        assert_eq!(tree[0].name, "pets");
        assert_eq!(tree[0].children[0].name, "toy");
        assert_eq!(tree[0].children[0].children[0].name, "part");
    }

    #[test]
    fn refinement_lands_on_terminal_node() {
        let refined = IncludeSpec {
            path: split_path("pets.toy"),
            refine: Some(Arc::new(|_query: &mut SelectStatement| {})),
        };
        let tree = IncludeNode::tree(&[spec("pets"), refined]);

        assert!(tree[0].refine.is_none());
        assert!(tree[0].children[0].refine.is_some());
    }
}
