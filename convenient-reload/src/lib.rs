//! Change detection and dependency-ordered reload planning.
//!
//! A [`Tracker`] polls a set of source roots and answers one question:
//! which modules changed on disk since the last check, and in what order
//! must they be reloaded so that no module is reloaded before the modules
//! it requires?
//!
//! # Pipeline
//!
//! One [`Tracker::check`] runs, in order:
//! 1. [`Snapshot::collect`] - modification times of every file under the roots
//! 2. [`changes::resolve_changes`] - classify every file newer than the last
//!    snapshot ([`Classifier`]) into declarations and changed module names
//! 3. affected set - changed modules plus their transitive dependents in the
//!    graph *before* this check's edge changes
//! 4. [`DeclarationIndex::update`] - find modules no file declares anymore
//! 5. [`updater::apply_declarations`] - drop the edges of those modules and
//!    replace the edges of redeclared modules in a copy of the graph
//! 6. commit snapshot, graph and index together
//!
//! # Example
//!
//! ```no_run
//! use convenient_reload::{CheckOutcome, ReloadConfig, Tracker};
//!
//! let mut tracker = Tracker::new(ReloadConfig::new(["src"]))?;
//! match tracker.check()? {
//!     CheckOutcome::Unchanged => {}
//!     CheckOutcome::Reload(modules) => {
//!         for module in modules {
//!             println!("reload {module}");
//!         }
//!     }
//! }
//! # Ok::<(), convenient_reload::ReloadError>(())
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(unused_results)]

pub mod changes;
pub mod classify;
pub mod config;
pub mod error;
pub mod header;
pub mod lexer;
pub mod reader;
pub mod resolver;
pub mod snapshot;
pub mod tracker;
pub mod types;
pub mod updater;

pub use changes::{ChangeSet, DeclarationIndex, FileChange};
pub use classify::{Classifier, Declaration, ModuleDeclaration};
pub use config::ReloadConfig;
pub use error::{ReloadError, Result};
pub use resolver::RefResolver;
pub use snapshot::{Snapshot, Timestamp};
pub use tracker::{CheckOutcome, Tracker};
pub use types::{ModuleGraph, ModuleName, Node};
