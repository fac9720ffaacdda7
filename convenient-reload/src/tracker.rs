//! The stateful tracker: "what changed, and in what order do I reload it?"

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::{Level, debug, info, span, warn};

use crate::changes::{ChangeSet, DeclarationIndex, resolve_changes};
use crate::classify::{Classifier, ModuleDeclaration};
use crate::config::ReloadConfig;
use crate::error::Result;
use crate::resolver::RefResolver;
use crate::snapshot::Snapshot;
use crate::types::{ModuleGraph, ModuleName, Node};
use crate::updater::apply_declarations;

/// Result of one [`Tracker::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Nothing needs reloading
    Unchanged,
    /// Modules to reload, requirements first
    Reload(Vec<ModuleName>),
}

impl CheckOutcome {
    /// The reload order, empty when unchanged.
    #[must_use]
    pub fn modules(&self) -> &[ModuleName] {
        match self {
            CheckOutcome::Unchanged => &[],
            CheckOutcome::Reload(modules) => modules,
        }
    }

    /// Whether nothing needs reloading.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        matches!(self, CheckOutcome::Unchanged)
    }
}

/// Tracks file modification times and the module dependency graph.
///
/// Calls must be serialized by the caller. Each [`Tracker::check`] either
/// commits a new snapshot, graph and declaration index together, or fails
/// and leaves all of them exactly as they were.
#[derive(Debug, Clone)]
pub struct Tracker {
    roots: Vec<PathBuf>,
    config: ReloadConfig,
    classifier: Classifier,
    snapshot: Snapshot,
    graph: ModuleGraph,
    declared: DeclarationIndex,
}

impl Tracker {
    /// Create a tracker, building the dependency graph from every file.
    ///
    /// The bootstrap pass is not reported as a reload.
    ///
    /// # Errors
    ///
    /// Returns `UnreadableRoot` for a bad root, and `Syntax`, `Io` or
    /// `Cycle` if the initial graph cannot be built.
    pub fn new(config: ReloadConfig) -> Result<Self> {
        Self::bootstrap(config, None)
    }

    /// Create a tracker whose first check compares against `seed` instead
    /// of the current state of the roots.
    ///
    /// Use this with a snapshot saved by a previous run so that files
    /// changed while nothing was tracking are reported on the first check.
    ///
    /// # Errors
    ///
    /// Same as [`Tracker::new`].
    pub fn with_snapshot(config: ReloadConfig, seed: Snapshot) -> Result<Self> {
        Self::bootstrap(config, Some(seed))
    }

    fn bootstrap(config: ReloadConfig, seed: Option<Snapshot>) -> Result<Self> {
        let span = span!(Level::INFO, "bootstrap");
        let _enter = span.enter();

        let roots = config.normalize_roots()?;
        let resolver = RefResolver::new(roots.clone(), &config);
        let classifier = Classifier::new(config.clone(), resolver);

        let current = Snapshot::collect(&roots, &config)?;
        let empty_graph = ModuleGraph::new();
        let changes = resolve_changes(&Snapshot::new(), &current, &empty_graph, &classifier)?;
        let graph = apply_declarations(&empty_graph, &BTreeSet::new(), &changes.declarations)?;
        let (declared, _) = DeclarationIndex::new().update(&current, &changes);

        info!(
            "Tracking {} files, {} modules declared, {} edges",
            current.len(),
            changes.declarations.len(),
            graph.edge_count()
        );

        Ok(Self {
            roots,
            config,
            classifier,
            snapshot: seed.unwrap_or(current),
            graph,
            declared,
        })
    }

    /// Check the roots for changes.
    ///
    /// Returns the modules to reload, every module after all the modules
    /// it requires, or [`CheckOutcome::Unchanged`]. New state is committed
    /// only after the whole computation succeeded.
    ///
    /// # Errors
    ///
    /// - `UnreadableRoot` if a root cannot be walked
    /// - `Syntax` / `Io` if a newer source file cannot be classified
    /// - `Cycle` if the new declarations form a require cycle
    pub fn check(&mut self) -> Result<CheckOutcome> {
        let span = span!(Level::INFO, "check");
        let _enter = span.enter();

        let current = Snapshot::collect(&self.roots, &self.config)?;
        let changes = resolve_changes(&self.snapshot, &current, &self.graph, &self.classifier)?;
        let (declared, retired) = self.declared.update(&current, &changes);
        if changes.is_noop() && retired.is_empty() {
            debug!("No files changed");
            self.snapshot = self.snapshot.advance(&current);
            self.declared = declared;
            return Ok(CheckOutcome::Unchanged);
        }

        let affected = self.affected(&changes, &retired);
        let updated = apply_declarations(&self.graph, &retired, &changes.declarations)?;
        let order = self.reload_order(&affected, &retired, &changes.declarations);

        // Commit everything together
        self.snapshot = self.snapshot.advance(&current);
        self.graph = updated;
        self.declared = declared;

        if !retired.is_empty() {
            info!("{} modules no longer declared by any file", retired.len());
        }

        if order.is_empty() {
            debug!("{} files changed, no module affected", changes.classified.len());
            return Ok(CheckOutcome::Unchanged);
        }
        info!(
            "{} files changed, reloading {} modules",
            changes.classified.len(),
            order.len()
        );
        Ok(CheckOutcome::Reload(order))
    }

    /// Changed modules plus their transitive dependents in the graph as it
    /// was before this check's declarations are applied, minus modules
    /// that no file declares anymore.
    fn affected(
        &self,
        changes: &ChangeSet,
        retired: &BTreeSet<ModuleName>,
    ) -> BTreeSet<ModuleName> {
        let mut affected = changes.changed.clone();
        for name in &changes.changed {
            affected.extend(
                self.graph
                    .transitive_dependents(&Node::Module(name.clone()))
                    .iter()
                    .filter_map(Node::as_module)
                    .cloned(),
            );
        }
        affected.retain(|name| !retired.contains(name));
        affected
    }

    /// Order the affected modules by the pre-update graph, refined by the
    /// new declarations' edges wherever they do not contradict it.
    fn reload_order(
        &self,
        affected: &BTreeSet<ModuleName>,
        retired: &BTreeSet<ModuleName>,
        declarations: &[ModuleDeclaration],
    ) -> Vec<ModuleName> {
        let mut ordering = self.graph.clone();
        for name in retired {
            ordering.remove_node(&Node::Module(name.clone()));
        }
        for declaration in declarations {
            let node = Node::Module(declaration.name.clone());
            for dep in &declaration.requires {
                if let Err(err) = ordering.depend(node.clone(), dep.clone()) {
                    warn!("Ordering ignores new edge {} -> {}: {}", node, dep, err);
                }
            }
        }

        ordering
            .topo_order(affected.iter().cloned().map(Node::Module))
            .into_iter()
            .filter_map(|node| match node {
                Node::Module(name) => Some(name),
                Node::File(_) => None,
            })
            .collect()
    }

    /// The committed snapshot.
    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// The committed dependency graph.
    #[must_use]
    pub fn graph(&self) -> &ModuleGraph {
        &self.graph
    }

    /// The normalized roots being tracked.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Every module in the graph, requirements first.
    #[must_use]
    pub fn modules_in_order(&self) -> Vec<ModuleName> {
        self.graph
            .topo_order_all()
            .into_iter()
            .filter_map(|node| match node {
                Node::Module(name) => Some(name),
                Node::File(_) => None,
            })
            .collect()
    }
}
