//! Dependency graph display

use convenient_reload::{Node, ReloadConfig, Tracker};
use serde::Serialize;
use std::collections::BTreeMap;

/// One graph node with its direct requirements.
#[derive(Debug, Serialize)]
struct NodeEntry {
    kind: &'static str,
    requires: Vec<String>,
}

/// Print every module in dependency order, or the edges as JSON.
pub fn graph(
    config: ReloadConfig,
    json: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let tracker = Tracker::new(config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&graph_entries(&tracker))?);
    } else {
        for module in tracker.modules_in_order() {
            println!("{module}");
        }
    }

    Ok(())
}

fn graph_entries(tracker: &Tracker) -> BTreeMap<String, NodeEntry> {
    let graph = tracker.graph();
    graph
        .nodes()
        .into_iter()
        .map(|node| {
            let requires = graph
                .dependencies(&node)
                .iter()
                .map(ToString::to_string)
                .collect();
            let kind = match node {
                Node::Module(_) => "module",
                Node::File(_) => "file",
            };
            (node.to_string(), NodeEntry { kind, requires })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_graph_entries() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("a.clj"), "(ns a)").unwrap();
        std::fs::write(src.join("b.clj"), "(ns b (:require a))").unwrap();

        let tracker = Tracker::new(ReloadConfig::new([&src])).unwrap();
        let entries = graph_entries(&tracker);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries["b"].requires, vec!["a".to_string()]);
        assert_eq!(entries["a"].kind, "module");
        assert_eq!(tracker.modules_in_order(), vec!["a".into(), "b".into()]);
    }
}
