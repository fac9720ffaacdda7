//! Declaration classifier: what kind of module header a file carries.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::debug;

use crate::config::ReloadConfig;
use crate::error::{ReloadError, Result};
use crate::header::{Header, parse_header};
use crate::lexer::line_of;
use crate::resolver::RefResolver;
use crate::types::{ModuleName, Node};

/// A module's header at one point in time.
///
/// Declarations are values: a later declaration for the same name fully
/// supersedes an earlier one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDeclaration {
    /// Declared module
    pub name: ModuleName,
    /// Resolved requirements (modules and resource files)
    pub requires: BTreeSet<Node>,
}

/// Outcome of classifying one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// Names a module and its requirements
    Primary(ModuleDeclaration),
    /// Switches into an existing module without declaring requirements
    Secondary(ModuleName),
    /// No recognizable header, or not a tracked source file
    NotADeclaration,
}

/// Classifies files using the configured source family and resolver.
#[derive(Debug, Clone)]
pub struct Classifier {
    config: ReloadConfig,
    resolver: RefResolver,
}

impl Classifier {
    /// Create a classifier.
    #[must_use]
    pub fn new(config: ReloadConfig, resolver: RefResolver) -> Self {
        Self { config, resolver }
    }

    /// Whether the file belongs to the tracked source family.
    #[must_use]
    pub fn is_tracked_source(&self, path: &Path) -> bool {
        self.config.is_tracked_source(path)
    }

    /// Classify one file.
    ///
    /// # Errors
    ///
    /// - `ReloadError::Io` if a tracked source file cannot be read
    /// - `ReloadError::Syntax` if a tracked source file has a malformed
    ///   header (never downgraded to `NotADeclaration`)
    pub fn classify(&self, path: &Path) -> Result<Declaration> {
        if !self.is_tracked_source(path) {
            return Ok(Declaration::NotADeclaration);
        }

        let source = std::fs::read_to_string(path).map_err(|source| ReloadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.classify_source(path, &source)
    }

    /// Classify already-read source text attributed to `path`.
    ///
    /// # Errors
    ///
    /// Returns `ReloadError::Syntax` if the header is malformed.
    pub fn classify_source(&self, path: &Path, source: &str) -> Result<Declaration> {
        let header =
            parse_header(source, &self.config.features).map_err(|e| ReloadError::Syntax {
                path: path.to_path_buf(),
                line: line_of(source, e.offset),
                message: e.message,
            })?;

        let declaration = match header {
            Header::Primary {
                name,
                references,
                resources,
            } => {
                let mut requires: BTreeSet<Node> =
                    self.resolver.resolve_modules(&references).into_iter().collect();
                requires.extend(
                    resources
                        .iter()
                        .filter_map(|res| self.resolver.resolve_resource(res)),
                );
                Declaration::Primary(ModuleDeclaration { name, requires })
            }
            Header::Secondary { name } => Declaration::Secondary(name),
            Header::Absent => Declaration::NotADeclaration,
        };

        debug!("Classified {}: {:?}", path.display(), declaration);
        Ok(declaration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn classifier(root: &Path) -> Classifier {
        let config = ReloadConfig::new([root]).with_external_prefix("clojure.");
        let resolver = RefResolver::new(vec![root.to_path_buf()], &config);
        Classifier::new(config, resolver)
    }

    #[test]
    fn test_primary_resolves_modules_and_resources() {
        let root = PathBuf::from("/nonexistent/src");
        let decl = classifier(&root)
            .classify_source(
                &root.join("app/core.clj"),
                "(ns app.core (:require [clojure.set] app.util) (:resources \"x.edn\"))",
            )
            .unwrap();

        assert_eq!(
            decl,
            Declaration::Primary(ModuleDeclaration {
                name: "app.core".into(),
                requires: BTreeSet::from([
                    Node::Module("app.util".into()),
                    Node::File(root.join("x.edn")),
                ]),
            })
        );
    }

    #[test]
    fn test_secondary_and_absent() {
        let root = PathBuf::from("/nonexistent/src");
        let c = classifier(&root);
        let path = root.join("app/script.clj");

        assert_eq!(
            c.classify_source(&path, "(in-ns 'app.core)").unwrap(),
            Declaration::Secondary("app.core".into())
        );
        assert_eq!(
            c.classify_source(&path, "(println :hi)").unwrap(),
            Declaration::NotADeclaration
        );
    }

    #[test]
    fn test_syntax_error_carries_line() {
        let root = PathBuf::from("/nonexistent/src");
        let path = root.join("app/broken.clj");
        let err = classifier(&root)
            .classify_source(&path, ";; comment\n(ns app.broken\n  (:require [app.a)")
            .unwrap_err();

        match err {
            ReloadError::Syntax { path: p, line, .. } => {
                assert_eq!(p, path);
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_non_source_is_not_read() {
        let root = PathBuf::from("/nonexistent/src");
        // The file does not exist; a read attempt would fail with Io
        assert_eq!(
            classifier(&root).classify(&root.join("page.html")).unwrap(),
            Declaration::NotADeclaration
        );
    }
}
