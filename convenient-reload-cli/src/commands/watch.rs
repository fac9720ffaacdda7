//! Polling reload loop

use convenient_reload::{ReloadConfig, Tracker};
use std::thread;
use std::time::Duration;
use tracing::{error, info};

use super::print_outcome;

/// Poll the roots forever, printing every non-empty reload order.
///
/// A failed check is logged and retried on the next poll; the tracker keeps
/// its last committed state in between.
pub fn watch(
    config: ReloadConfig,
    interval_ms: u64,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut tracker = Tracker::new(config)?;
    let interval = Duration::from_millis(interval_ms);
    info!(
        "Watching {} roots every {:?}",
        tracker.roots().len(),
        interval
    );

    loop {
        match tracker.check() {
            Ok(outcome) if !outcome.is_unchanged() => print_outcome(&outcome),
            Ok(_) => {}
            Err(e) => error!("Check failed, keeping previous state: {}", e),
        }
        thread::sleep(interval);
    }
}
