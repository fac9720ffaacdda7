//! Identifiers shared by every stage of a check.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name of a logical module, independent of the file backing it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleName(String);

impl ModuleName {
    /// Create a module name from its dotted form (e.g. `app.core`).
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The dotted form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Relative source path without extension: `my-app.core` -> `my_app/core`.
    #[must_use]
    pub fn relative_stem(&self) -> PathBuf {
        self.0.split('.').map(|part| part.replace('-', "_")).collect()
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A node of the dependency graph.
///
/// Modules are the usual case. Files appear only as targets of
/// `(:resources ...)` edges so that touching a resource can be traced back
/// to the modules that declared it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Node {
    /// A logical module
    Module(ModuleName),
    /// A non-module resource file
    File(PathBuf),
}

impl Node {
    /// The module name, if this is a module node.
    #[must_use]
    pub fn as_module(&self) -> Option<&ModuleName> {
        match self {
            Node::Module(name) => Some(name),
            Node::File(_) => None,
        }
    }

    /// Node for a resource file.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Node::File(path.as_ref().to_path_buf())
    }
}

impl From<ModuleName> for Node {
    fn from(name: ModuleName) -> Self {
        Node::Module(name)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Module(name) => write!(f, "{name}"),
            Node::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// The graph type maintained by the tracker.
pub type ModuleGraph = convenient_graph::DependencyGraph<Node>;
