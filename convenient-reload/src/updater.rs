//! Graph updater: replaces the edges of freshly declared modules.

use std::collections::BTreeSet;

use tracing::debug;

use crate::classify::ModuleDeclaration;
use crate::error::Result;
use crate::types::{ModuleGraph, ModuleName, Node};

/// Apply primary declarations to a copy of `graph`.
///
/// Every retired and every declared module loses all of its outgoing edges
/// first, then the new edges of every declaration are inserted, so an edge
/// set is replaced wholesale and never merged with the previous one.
/// Retired modules are those no file declares anymore; edges pointing at
/// them stay as dangling requirements.
///
/// # Errors
///
/// Returns `ReloadError::Cycle` if any new edge would close a require
/// cycle. `graph` itself is never modified, so a failure leaves nothing
/// half-applied.
pub fn apply_declarations(
    graph: &ModuleGraph,
    retired: &BTreeSet<ModuleName>,
    declarations: &[ModuleDeclaration],
) -> Result<ModuleGraph> {
    let mut updated = graph.clone();

    for name in retired {
        debug!("{} is no longer declared by any file", name);
        updated.remove_node(&Node::Module(name.clone()));
    }
    for declaration in declarations {
        updated.remove_node(&Node::Module(declaration.name.clone()));
    }

    for declaration in declarations {
        let node = Node::Module(declaration.name.clone());
        for dep in &declaration.requires {
            updated.depend(node.clone(), dep.clone())?;
        }
        debug!(
            "{} now requires {} nodes",
            declaration.name,
            declaration.requires.len()
        );
    }

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReloadError;

    fn decl(name: &str, requires: &[&str]) -> ModuleDeclaration {
        ModuleDeclaration {
            name: ModuleName::new(name),
            requires: requires
                .iter()
                .map(|r| Node::Module(ModuleName::new(*r)))
                .collect(),
        }
    }

    fn none() -> BTreeSet<ModuleName> {
        BTreeSet::new()
    }

    fn module(name: &str) -> Node {
        Node::Module(ModuleName::new(name))
    }

    #[test]
    fn test_edges_replaced_wholesale() {
        let graph =
            apply_declarations(&ModuleGraph::new(), &none(), &[decl("m", &["n", "o"])]).unwrap();
        let graph = apply_declarations(&graph, &none(), &[decl("m", &["o"])]).unwrap();

        assert_eq!(graph.dependencies(&module("m")), BTreeSet::from([module("o")]));
        assert!(graph.dependents(&module("n")).is_empty());
    }

    #[test]
    fn test_removal_precedes_insertion() {
        // a required b; now b requires a and a no longer requires b.
        // Applying in either order must succeed because every removal
        // happens before any insertion.
        let graph =
            apply_declarations(&ModuleGraph::new(), &none(), &[decl("a", &["b"])]).unwrap();
        let updated =
            apply_declarations(&graph, &none(), &[decl("b", &["a"]), decl("a", &[])]).unwrap();

        assert_eq!(updated.dependencies(&module("b")), BTreeSet::from([module("a")]));
        assert!(updated.dependencies(&module("a")).is_empty());
    }

    #[test]
    fn test_cycle_leaves_input_untouched() {
        let graph = apply_declarations(&ModuleGraph::new(), &none(), &[decl("a", &[])]).unwrap();
        let result =
            apply_declarations(&graph, &none(), &[decl("a", &["b"]), decl("b", &["a"])]);

        match result {
            Err(err @ ReloadError::Cycle(_)) => {
                assert_eq!(
                    err.to_string(),
                    "Circular dependency: b -> a would create a cycle"
                );
            }
            other => panic!("expected cycle, got {other:?}"),
        }
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_retired_module_loses_outgoing_edges() {
        let graph = apply_declarations(
            &ModuleGraph::new(),
            &none(),
            &[decl("a", &["b"]), decl("c", &["a"])],
        )
        .unwrap();
        let retired = BTreeSet::from([ModuleName::new("a")]);
        let updated = apply_declarations(&graph, &retired, &[decl("b", &["a"])]).unwrap();

        assert!(updated.dependencies(&module("a")).is_empty());
        assert_eq!(updated.dependencies(&module("b")), BTreeSet::from([module("a")]));
        // c still waits on a
        assert_eq!(updated.dependencies(&module("c")), BTreeSet::from([module("a")]));
    }

    #[test]
    fn test_dangling_target_allowed() {
        let graph =
            apply_declarations(&ModuleGraph::new(), &none(), &[decl("b", &["c"])]).unwrap();
        assert_eq!(graph.dependents(&module("c")), BTreeSet::from([module("b")]));
    }
}
