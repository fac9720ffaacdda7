//! Maps raw header references onto tracked graph nodes.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::ReloadConfig;
use crate::types::{ModuleName, Node};

/// Resolves module references and resource paths against the roots.
#[derive(Debug, Clone)]
pub struct RefResolver {
    roots: Vec<PathBuf>,
    library_paths: Vec<PathBuf>,
    external_prefixes: Vec<String>,
    extensions: Vec<String>,
}

impl RefResolver {
    /// Create a resolver over already-normalized roots.
    #[must_use]
    pub fn new(roots: Vec<PathBuf>, config: &ReloadConfig) -> Self {
        Self {
            roots,
            library_paths: config.library_paths.clone(),
            external_prefixes: config.external_prefixes.clone(),
            extensions: config.extensions.clone(),
        }
    }

    /// The tracked roots.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Source file backing `name` under `base`, if one exists.
    fn find_source(&self, base: &Path, name: &ModuleName) -> Option<PathBuf> {
        let stem = base.join(name.relative_stem());
        self.extensions
            .iter()
            .map(|ext| stem.with_extension(ext))
            .find(|candidate| candidate.is_file())
    }

    /// Source file backing `name` under any tracked root.
    #[must_use]
    pub fn locate(&self, name: &ModuleName) -> Option<PathBuf> {
        self.roots.iter().find_map(|root| self.find_source(root, name))
    }

    /// Whether a reference names a module outside the tracked roots.
    ///
    /// References to modules that do not exist anywhere yet are kept: the
    /// edge waits for the module's own declaration.
    #[must_use]
    pub fn is_external(&self, name: &ModuleName) -> bool {
        if self
            .external_prefixes
            .iter()
            .any(|prefix| name.as_str().starts_with(prefix.as_str()))
        {
            return true;
        }
        if self.locate(name).is_some() {
            return false;
        }
        self.library_paths
            .iter()
            .any(|lib| self.find_source(lib, name).is_some())
    }

    /// Resolve module references to graph nodes, dropping external ones.
    pub fn resolve_modules<'r, I>(&self, references: I) -> Vec<Node>
    where
        I: IntoIterator<Item = &'r ModuleName>,
    {
        references
            .into_iter()
            .filter(|name| {
                let external = self.is_external(name);
                if external {
                    debug!("Ignoring reference to external module {}", name);
                }
                !external
            })
            .map(|name| Node::Module(name.clone()))
            .collect()
    }

    /// Resolve a resource path to the file node it names.
    ///
    /// The first root that holds the file wins; a resource that does not
    /// exist yet is placed under the first root.
    #[must_use]
    pub fn resolve_resource(&self, relative: &str) -> Option<Node> {
        let relative = Path::new(relative);
        if relative.is_absolute() {
            return Some(Node::file(relative));
        }
        self.roots
            .iter()
            .map(|root| root.join(relative))
            .find(|candidate| candidate.is_file())
            .or_else(|| self.roots.first().map(|root| root.join(relative)))
            .map(Node::File)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let lib = temp.path().join("lib");
        std::fs::create_dir_all(src.join("app")).unwrap();
        std::fs::create_dir_all(lib.join("vendor")).unwrap();
        std::fs::write(src.join("app/core.clj"), "(ns app.core)").unwrap();
        std::fs::write(src.join("app/http_util.cljc"), "(ns app.http-util)").unwrap();
        std::fs::write(lib.join("vendor/json.clj"), "(ns vendor.json)").unwrap();
        (temp, src, lib)
    }

    #[test]
    fn test_locate_uses_munged_path() {
        let (_temp, src, _lib) = setup();
        let resolver = RefResolver::new(vec![src.clone()], &ReloadConfig::default());
        assert_eq!(
            resolver.locate(&"app.http-util".into()),
            Some(src.join("app/http_util.cljc"))
        );
        assert_eq!(resolver.locate(&"app.missing".into()), None);
    }

    #[test]
    fn test_resolve_drops_external_references() {
        let (_temp, src, lib) = setup();
        let config = ReloadConfig::default()
            .with_external_prefix("clojure.")
            .with_library_path(lib);
        let resolver = RefResolver::new(vec![src], &config);

        let refs: Vec<ModuleName> = ["app.core", "clojure.string", "vendor.json", "app.later"]
            .into_iter()
            .map(ModuleName::from)
            .collect();
        let nodes = resolver.resolve_modules(&refs);

        assert_eq!(
            nodes,
            vec![
                Node::Module("app.core".into()),
                Node::Module("app.later".into())
            ]
        );
    }

    #[test]
    fn test_resolve_resource() {
        let (_temp, src, _lib) = setup();
        std::fs::write(src.join("page.html"), "<p/>").unwrap();
        let resolver = RefResolver::new(vec![src.clone()], &ReloadConfig::default());

        assert_eq!(
            resolver.resolve_resource("page.html"),
            Some(Node::File(src.join("page.html")))
        );
        assert_eq!(
            resolver.resolve_resource("later.edn"),
            Some(Node::File(src.join("later.edn")))
        );
    }
}
