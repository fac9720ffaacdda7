//! One-shot check against a persisted snapshot

use convenient_reload::{ReloadConfig, Snapshot, Tracker};
use std::path::Path;
use tracing::{info, warn};

use super::print_outcome;

/// Check once, comparing against `snapshot_file` if it exists, and save the
/// advanced snapshot back to it.
pub fn check(
    config: ReloadConfig,
    snapshot_file: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut tracker = match snapshot_file {
        Some(path) if path.exists() => {
            info!("Seeding from snapshot {}", path.display());
            Tracker::with_snapshot(config, Snapshot::load(path)?)?
        }
        Some(path) => {
            warn!(
                "Snapshot {} does not exist yet; this run only records state",
                path.display()
            );
            Tracker::new(config)?
        }
        None => {
            warn!("No snapshot file given; a single check can only report unchanged");
            Tracker::new(config)?
        }
    };

    let outcome = tracker.check()?;
    print_outcome(&outcome);

    if let Some(path) = snapshot_file {
        tracker.snapshot().save(path)?;
    }

    Ok(())
}
