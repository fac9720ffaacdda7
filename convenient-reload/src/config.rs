//! Tracker configuration and root normalization.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ReloadError, Result};

/// Configuration for a [`crate::Tracker`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReloadConfig {
    /// Directories scanned recursively for files
    pub roots: Vec<PathBuf>,
    /// File extensions (without dot) of tracked source files
    pub extensions: Vec<String>,
    /// Module references starting with any of these are never tracked
    /// (e.g. `"clojure."`)
    pub external_prefixes: Vec<String>,
    /// Library directories outside the roots; references that resolve
    /// only here are dropped
    pub library_paths: Vec<PathBuf>,
    /// Reader-conditional platform keys, in preference order
    pub features: Vec<String>,
    /// Follow symbolic links while walking roots
    pub follow_links: bool,
    /// Skip files and directories whose name starts with `.`
    pub skip_hidden: bool,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            extensions: vec!["clj".to_string(), "cljc".to_string()],
            external_prefixes: Vec::new(),
            library_paths: Vec::new(),
            features: vec!["clj".to_string()],
            follow_links: false,
            skip_hidden: true,
        }
    }
}

impl ReloadConfig {
    /// Create a configuration tracking the given roots with defaults otherwise.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `ReloadError::Io` if the file cannot be read or is not a
    /// valid configuration (the latter with `InvalidData`).
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ReloadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|e| ReloadError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })
    }

    /// Replace the tracked extensions.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Add a prefix of module references to ignore.
    #[must_use]
    pub fn with_external_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.external_prefixes.push(prefix.into());
        self
    }

    /// Add a library directory outside the tracked roots.
    #[must_use]
    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_paths.push(path.into());
        self
    }

    /// Replace the reader-conditional platform keys.
    #[must_use]
    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }

    /// Whether a path has one of the tracked source extensions.
    #[must_use]
    pub fn is_tracked_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }

    /// Resolve the configured roots into a concrete set of directories.
    ///
    /// Roots are canonicalized, de-duplicated, and roots nested inside
    /// another root are dropped (the outer walk already covers them).
    ///
    /// # Errors
    ///
    /// Returns `ReloadError::UnreadableRoot` if a root does not exist or is
    /// not a directory.
    pub fn normalize_roots(&self) -> Result<Vec<PathBuf>> {
        let mut roots = Vec::with_capacity(self.roots.len());
        for root in &self.roots {
            let canonical = root
                .canonicalize()
                .map_err(|source| ReloadError::UnreadableRoot {
                    path: root.clone(),
                    source,
                })?;
            if !canonical.is_dir() {
                return Err(ReloadError::UnreadableRoot {
                    path: root.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotADirectory,
                        "root is not a directory",
                    ),
                });
            }
            roots.push(canonical);
        }

        roots.sort();
        roots.dedup();
        let mut normalized: Vec<PathBuf> = Vec::with_capacity(roots.len());
        for root in roots {
            // Sorted order puts a parent directly before its children
            if normalized.iter().any(|outer| root.starts_with(outer)) {
                debug!("Dropping nested root {}", root.display());
                continue;
            }
            normalized.push(root);
        }

        Ok(normalized)
    }
}
