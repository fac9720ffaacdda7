//! Change resolver: turns a snapshot diff into changed modules and fresh
//! declarations.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::classify::{Classifier, Declaration, ModuleDeclaration};
use crate::error::Result;
use crate::snapshot::Snapshot;
use crate::types::{ModuleGraph, ModuleName, Node};

/// How one newer file contributed to a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    /// Non-source file; lists the modules that declared it as a resource
    Resource(BTreeSet<ModuleName>),
    /// Source file with a primary declaration for this module
    Primary(ModuleName),
    /// Source file switching into this module
    Secondary(ModuleName),
    /// Source file without a header
    Ignored,
}

/// Result of resolving one snapshot diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Primary declarations read from newer files
    pub declarations: Vec<ModuleDeclaration>,
    /// Modules changed directly (dependents not yet included)
    pub changed: BTreeSet<ModuleName>,
    /// Per-file classification of every newer file, in path order
    pub classified: Vec<(PathBuf, FileChange)>,
}

impl ChangeSet {
    /// True when no file was newer than the previous snapshot.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.classified.is_empty()
    }
}

/// Which module each tracked source file declared last.
///
/// Used to retire a module once no file declares it anymore, either
/// because the file was deleted or because its header now names something
/// else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationIndex {
    modules: BTreeMap<PathBuf, ModuleName>,
}

impl DeclarationIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Module last declared by `path`, if any.
    #[must_use]
    pub fn declared_in(&self, path: &Path) -> Option<&ModuleName> {
        self.modules.get(path)
    }

    /// Number of declaring files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether no file declares a module.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// The index after `changes`, with files missing from `current`
    /// dropped, and the modules no remaining file declares.
    #[must_use]
    pub fn update(&self, current: &Snapshot, changes: &ChangeSet) -> (Self, BTreeSet<ModuleName>) {
        let mut modules: BTreeMap<PathBuf, ModuleName> = self
            .modules
            .iter()
            .filter(|(path, _)| current.get(path).is_some())
            .map(|(path, name)| (path.clone(), name.clone()))
            .collect();

        for (path, change) in &changes.classified {
            match change {
                FileChange::Primary(name) => {
                    let _ = modules.insert(path.clone(), name.clone());
                }
                FileChange::Secondary(_) | FileChange::Ignored => {
                    let _ = modules.remove(path);
                }
                FileChange::Resource(_) => {}
            }
        }

        let declared: BTreeSet<&ModuleName> = modules.values().collect();
        let retired: BTreeSet<ModuleName> = self
            .modules
            .values()
            .filter(|name| !declared.contains(name))
            .cloned()
            .collect();

        (Self { modules }, retired)
    }
}

/// Compare two snapshots and classify every file that got newer.
///
/// `graph` is consulted (never modified) to find modules depending on a
/// changed resource file.
///
/// # Errors
///
/// Propagates `Io` and `Syntax` errors from the classifier; the first
/// failing file aborts the whole resolution.
pub fn resolve_changes(
    old: &Snapshot,
    new: &Snapshot,
    graph: &ModuleGraph,
    classifier: &Classifier,
) -> Result<ChangeSet> {
    let mut changes = ChangeSet::default();

    for path in new.newer_than(old) {
        let change = if classifier.is_tracked_source(&path) {
            match classifier.classify(&path)? {
                Declaration::Primary(declaration) => {
                    let name = declaration.name.clone();
                    changes.declarations.push(declaration);
                    FileChange::Primary(name)
                }
                Declaration::Secondary(name) => FileChange::Secondary(name),
                Declaration::NotADeclaration => FileChange::Ignored,
            }
        } else {
            let dependents = graph
                .dependents(&Node::file(&path))
                .iter()
                .filter_map(Node::as_module)
                .cloned()
                .collect();
            FileChange::Resource(dependents)
        };

        match &change {
            FileChange::Resource(names) => changes.changed.extend(names.iter().cloned()),
            FileChange::Primary(name) | FileChange::Secondary(name) => {
                let _ = changes.changed.insert(name.clone());
            }
            FileChange::Ignored => {}
        }
        debug!("{} -> {:?}", path.display(), change);
        changes.classified.push((path, change));
    }

    Ok(changes)
}
