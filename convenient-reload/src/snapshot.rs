//! Modification-time snapshots of the tracked roots.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::config::ReloadConfig;
use crate::error::{ReloadError, Result};

/// Last-modified instant of a file, in nanoseconds since the UNIX epoch.
///
/// Instants before the epoch are negative. Only the ordering matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create a timestamp from raw nanoseconds.
    #[must_use]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Raw nanoseconds since the epoch.
    #[must_use]
    pub const fn as_nanos(self) -> i64 {
        self.0
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(after) => Self(i64::try_from(after.as_nanos()).unwrap_or(i64::MAX)),
            Err(before) => Self(
                i64::try_from(before.duration().as_nanos())
                    .map(|n| -n)
                    .unwrap_or(i64::MIN),
            ),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// Immutable mapping from file path to last-modified time.
///
/// A file missing from the snapshot counts as never seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    files: BTreeMap<PathBuf, Timestamp>,
}

impl Snapshot {
    /// Create an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk every root recursively and record each regular file.
    ///
    /// # Errors
    ///
    /// Returns `ReloadError::UnreadableRoot` if any root, or any directory
    /// beneath it, cannot be read. No partial snapshot is returned.
    pub fn collect(roots: &[PathBuf], config: &ReloadConfig) -> Result<Self> {
        let mut files = BTreeMap::new();

        for root in roots {
            let walker = WalkDir::new(root)
                .follow_links(config.follow_links)
                .into_iter()
                .filter_entry(|e| !(config.skip_hidden && is_hidden(e)));

            for entry in walker {
                let entry = entry.map_err(|err| ReloadError::UnreadableRoot {
                    path: err.path().map_or_else(|| root.clone(), Path::to_path_buf),
                    source: err.into(),
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }

                let modified = match entry.metadata().map(|m| m.modified()) {
                    Ok(Ok(modified)) => modified,
                    Ok(Err(source)) => {
                        return Err(ReloadError::Io {
                            path: entry.path().to_path_buf(),
                            source,
                        });
                    }
                    Err(err) => {
                        // Deleted between listing and stat
                        debug!("Skipping vanished file {}: {}", entry.path().display(), err);
                        continue;
                    }
                };
                let _ = files.insert(entry.into_path(), Timestamp::from(modified));
            }
        }

        debug!("Collected {} files from {} roots", files.len(), roots.len());
        Ok(Self { files })
    }

    /// Timestamp recorded for a file, if it has been seen.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<Timestamp> {
        self.files.get(path).copied()
    }

    /// Number of files in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the snapshot holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate files and timestamps in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, Timestamp)> {
        self.files.iter().map(|(path, time)| (path.as_path(), *time))
    }

    /// Files in `self` strictly newer than in `old` (or absent from `old`).
    ///
    /// Equal timestamps do not count as a change.
    #[must_use]
    pub fn newer_than(&self, old: &Snapshot) -> BTreeSet<PathBuf> {
        self.files
            .iter()
            .filter(|(path, time)| old.get(path).is_none_or(|before| **time > before))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// The snapshot to commit after observing `current`.
    ///
    /// Keeps exactly the files present in `current`, each with the later of
    /// its old and current timestamp, so a committed timestamp never moves
    /// backwards.
    #[must_use]
    pub fn advance(&self, current: &Snapshot) -> Snapshot {
        let files = current
            .files
            .iter()
            .map(|(path, time)| {
                let time = self.get(path).map_or(*time, |before| before.max(*time));
                (path.clone(), time)
            })
            .collect();
        Self { files }
    }

    /// Load a snapshot previously written with [`Snapshot::save`].
    ///
    /// # Errors
    ///
    /// Returns `ReloadError::Snapshot` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ReloadError::Snapshot {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| ReloadError::Snapshot {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Persist the snapshot as JSON, replacing the file atomically.
    ///
    /// # Errors
    ///
    /// Returns `ReloadError::Snapshot` if serialization or any write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let to_error = |message: String| ReloadError::Snapshot {
            path: path.to_path_buf(),
            message,
        };

        let json = serde_json::to_string_pretty(self).map_err(|e| to_error(e.to_string()))?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|e| to_error(e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| to_error(e.to_string()))
    }
}

impl FromIterator<(PathBuf, Timestamp)> for Snapshot {
    fn from_iter<T: IntoIterator<Item = (PathBuf, Timestamp)>>(iter: T) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|s| s.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use tempfile::TempDir;

    fn ts(n: i64) -> Timestamp {
        Timestamp::from_nanos(n)
    }

    #[test]
    fn test_newer_than_is_strict() {
        let old: Snapshot = [
            (PathBuf::from("a"), ts(10)),
            (PathBuf::from("b"), ts(10)),
            (PathBuf::from("c"), ts(10)),
        ]
        .into_iter()
        .collect();
        let new: Snapshot = [
            (PathBuf::from("a"), ts(10)),
            (PathBuf::from("b"), ts(11)),
            (PathBuf::from("c"), ts(9)),
            (PathBuf::from("d"), ts(1)),
        ]
        .into_iter()
        .collect();

        let newer = new.newer_than(&old);
        assert_eq!(
            newer,
            BTreeSet::from([PathBuf::from("b"), PathBuf::from("d")])
        );
    }

    #[test]
    fn test_advance_never_moves_backwards() {
        let old: Snapshot = [(PathBuf::from("a"), ts(20)), (PathBuf::from("gone"), ts(5))]
            .into_iter()
            .collect();
        let new: Snapshot = [(PathBuf::from("a"), ts(15)), (PathBuf::from("b"), ts(3))]
            .into_iter()
            .collect();

        let committed = old.advance(&new);
        assert_eq!(committed.get(Path::new("a")), Some(ts(20)));
        assert_eq!(committed.get(Path::new("b")), Some(ts(3)));
        assert_eq!(committed.get(Path::new("gone")), None);
    }

    #[test]
    fn test_collect_walks_recursively_and_skips_hidden() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        std::fs::create_dir_all(root.join("app/nested")).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::write(root.join("app/core.clj"), "(ns app.core)").unwrap();
        std::fs::write(root.join("app/nested/page.html"), "<p/>").unwrap();
        std::fs::write(root.join(".git/HEAD"), "ref").unwrap();
        std::fs::write(root.join(".hidden.clj"), "(ns hidden)").unwrap();

        let mtime = FileTime::from_unix_time(1_700_000_000, 0);
        filetime::set_file_mtime(root.join("app/core.clj"), mtime).unwrap();

        let snapshot = Snapshot::collect(&[root.clone()], &ReloadConfig::default()).unwrap();
        let paths: Vec<_> = snapshot.iter().map(|(p, _)| p.to_path_buf()).collect();
        assert_eq!(
            paths,
            vec![root.join("app/core.clj"), root.join("app/nested/page.html")]
        );
        assert_eq!(
            snapshot.get(&root.join("app/core.clj")),
            Some(ts(1_700_000_000 * 1_000_000_000))
        );
    }

    #[test]
    fn test_collect_missing_root_fails() {
        let temp = TempDir::new().unwrap();
        let result = Snapshot::collect(&[temp.path().join("nope")], &ReloadConfig::default());
        assert!(matches!(result, Err(ReloadError::UnreadableRoot { .. })));
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("snapshot.json");
        let snapshot: Snapshot = [(PathBuf::from("/src/a.clj"), ts(-42))].into_iter().collect();

        snapshot.save(&file).unwrap();
        assert_eq!(Snapshot::load(&file).unwrap(), snapshot);
    }

    #[test]
    fn test_pre_epoch_timestamp_orders_first() {
        let before = Timestamp::from(UNIX_EPOCH - std::time::Duration::from_secs(1));
        let after = Timestamp::from(UNIX_EPOCH + std::time::Duration::from_secs(1));
        assert!(before < after);
        assert_eq!(before.as_nanos(), -1_000_000_000);
    }
}
