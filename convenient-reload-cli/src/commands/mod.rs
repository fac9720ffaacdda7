//! Subcommand implementations

pub mod check;
pub mod graph;
pub mod watch;

use convenient_reload::CheckOutcome;

/// Print a reload order, one module per line.
fn print_outcome(outcome: &CheckOutcome) {
    if outcome.is_unchanged() {
        println!("unchanged");
    }
    for module in outcome.modules() {
        println!("{module}");
    }
}
