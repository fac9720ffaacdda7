//! Name-keyed dependency graph for incremental reload tracking.
//!
//! This crate provides a small directed graph where an edge `a -> b` means
//! "`a` requires `b`". It is used for:
//! - Module require graphs
//! - Module-to-resource-file dependencies
//! - Ordering a changed subset of nodes so requirements come first
//!
//! # Features
//!
//! - Nodes are keyed by value (no opaque ids), so the graph can be cloned,
//!   mutated and swapped in as a whole
//! - Cycle-checked edge insertion
//! - Reverse index for O(1) direct dependent lookup
//! - Transitive dependency and dependent queries
//! - Deterministic topological ordering of any node subset
//!
//! # Example
//!
//! ```
//! use convenient_graph::DependencyGraph;
//!
//! let mut graph = DependencyGraph::<&str>::new();
//!
//! // app requires util, util requires core
//! graph.depend("app", "util").unwrap();
//! graph.depend("util", "core").unwrap();
//!
//! // core's dependents include app, transitively
//! assert!(graph.transitive_dependents(&"core").contains(&"app"));
//!
//! // requirements come first
//! let order = graph.topo_order(["app", "core", "util"]);
//! assert_eq!(order, vec!["core", "util", "app"]);
//!
//! // closing the loop is rejected
//! assert!(graph.depend("core", "app").is_err());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(unused_results)]

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

/// Error types for graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Inserting an edge would close a require cycle
    #[error("Cycle detected in graph: {0}")]
    CycleDetected(String),
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Directed dependency graph keyed by node value.
///
/// `requires[a]` holds the nodes `a` points at, `dependents[b]` holds the
/// nodes pointing at `b`. Both maps are kept in sync by every mutation, and
/// a node with no edges in either direction is not stored at all.
///
/// Ordered collections are used throughout so that every query returns
/// results in a stable order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph<N> {
    requires: BTreeMap<N, BTreeSet<N>>,
    dependents: BTreeMap<N, BTreeSet<N>>,
}

impl<N> Default for DependencyGraph<N> {
    fn default() -> Self {
        Self {
            requires: BTreeMap::new(),
            dependents: BTreeMap::new(),
        }
    }
}

impl<N> DependencyGraph<N>
where
    N: Ord + Clone + fmt::Display,
{
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `node` requires `dep`.
    ///
    /// Inserting an edge that already exists is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::CycleDetected` if `dep` already (transitively)
    /// requires `node`, or if `node == dep`. The graph is left untouched.
    pub fn depend(&mut self, node: N, dep: N) -> GraphResult<()> {
        if self.depends_on(&dep, &node) {
            return Err(GraphError::CycleDetected(format!(
                "{node} -> {dep} would create a cycle"
            )));
        }

        let _ = self
            .requires
            .entry(node.clone())
            .or_default()
            .insert(dep.clone());
        let _ = self.dependents.entry(dep).or_default().insert(node);

        Ok(())
    }

    /// Remove every outgoing edge of `node`.
    ///
    /// Edges pointing *at* `node` are kept: other nodes still require it,
    /// and it becomes a dangling target until something requires it again
    /// with fresh edges.
    pub fn remove_node(&mut self, node: &N) {
        let Some(deps) = self.requires.remove(node) else {
            return;
        };
        for dep in deps {
            if let Some(back) = self.dependents.get_mut(&dep) {
                let _ = back.remove(node);
                if back.is_empty() {
                    let _ = self.dependents.remove(&dep);
                }
            }
        }
    }

    /// Check if `node` (transitively) requires `target`.
    ///
    /// A node is considered to depend on itself, which is what makes
    /// self-edges a cycle.
    #[must_use]
    pub fn depends_on(&self, node: &N, target: &N) -> bool {
        if node == target {
            return true;
        }

        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(node);

        while let Some(current) = queue.pop_front() {
            if current == target {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(deps) = self.requires.get(current) {
                queue.extend(deps.iter().filter(|d| !visited.contains(d)));
            }
        }

        false
    }

    /// Get the direct requirements of a node.
    #[must_use]
    pub fn dependencies(&self, node: &N) -> BTreeSet<N> {
        self.requires.get(node).cloned().unwrap_or_default()
    }

    /// Get the nodes that directly require `node`.
    #[must_use]
    pub fn dependents(&self, node: &N) -> BTreeSet<N> {
        self.dependents.get(node).cloned().unwrap_or_default()
    }

    /// Get every node `node` requires, directly or transitively.
    #[must_use]
    pub fn transitive_dependencies(&self, node: &N) -> BTreeSet<N> {
        Self::closure(&self.requires, node)
    }

    /// Get every node that requires `node`, directly or transitively.
    ///
    /// The node itself is not included.
    #[must_use]
    pub fn transitive_dependents(&self, node: &N) -> BTreeSet<N> {
        Self::closure(&self.dependents, node)
    }

    fn closure(edges: &BTreeMap<N, BTreeSet<N>>, start: &N) -> BTreeSet<N> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<&N> = edges.get(start).into_iter().flatten().collect();

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(next) = edges.get(current) {
                queue.extend(next.iter().filter(|n| !seen.contains(*n)));
            }
        }

        seen
    }

    /// Check whether the node takes part in any edge.
    #[must_use]
    pub fn contains(&self, node: &N) -> bool {
        self.requires.contains_key(node) || self.dependents.contains_key(node)
    }

    /// Get every node that takes part in an edge, in ascending order.
    #[must_use]
    pub fn nodes(&self) -> BTreeSet<N> {
        self.requires
            .keys()
            .chain(self.dependents.keys())
            .cloned()
            .collect()
    }

    /// Get the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.requires.values().map(BTreeSet::len).sum()
    }

    /// Order a subset of nodes so that every node comes after all the
    /// nodes of the subset it (transitively) requires.
    ///
    /// Nodes unknown to the graph are treated as having no requirements.
    /// Among nodes that are ready at the same time, the smallest comes
    /// first, so the result is fully deterministic. Kahn's algorithm over
    /// the reachability relation restricted to the subset.
    #[must_use]
    pub fn topo_order<I>(&self, subset: I) -> Vec<N>
    where
        I: IntoIterator<Item = N>,
    {
        let subset: BTreeSet<N> = subset.into_iter().collect();

        // For each node, the subset members it must wait for
        let mut waiting: BTreeMap<&N, BTreeSet<&N>> = BTreeMap::new();
        let mut unlocks: BTreeMap<&N, Vec<&N>> = BTreeMap::new();
        for node in &subset {
            let before: BTreeSet<&N> = self
                .transitive_dependencies(node)
                .iter()
                .filter_map(|dep| subset.get(dep))
                .filter(|dep| *dep != node)
                .collect();
            for dep in &before {
                unlocks.entry(*dep).or_default().push(node);
            }
            let _ = waiting.insert(node, before);
        }

        let mut ready: BTreeSet<&N> = waiting
            .iter()
            .filter(|(_, before)| before.is_empty())
            .map(|(node, _)| *node)
            .collect();
        let mut result = Vec::with_capacity(subset.len());

        while let Some(node) = ready.pop_first() {
            result.push(node.clone());
            for next in unlocks.get(&node).into_iter().flatten() {
                if let Some(before) = waiting.get_mut(next) {
                    let _ = before.remove(&node);
                    if before.is_empty() {
                        let _ = ready.insert(*next);
                    }
                }
            }
        }

        result
    }

    /// Order every node of the graph, requirements first.
    #[must_use]
    pub fn topo_order_all(&self) -> Vec<N> {
        self.topo_order(self.nodes())
    }
}
