//! Error types surfaced by the tracker.

use std::path::PathBuf;

use convenient_graph::GraphError;

/// Errors that abort a check (or tracker construction).
///
/// None of these are retried internally. The committed state of the
/// tracker is left exactly as it was before the failing call.
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    /// A configured root could not be read
    #[error("Unreadable root {}: {source}", .path.display())]
    UnreadableRoot {
        /// The root (or the entry beneath it) that failed
        path: PathBuf,
        /// Underlying walk error
        #[source]
        source: std::io::Error,
    },

    /// A tracked source file has a malformed module header
    #[error("Syntax error in {}:{line}: {message}", .path.display())]
    Syntax {
        /// File holding the header
        path: PathBuf,
        /// 1-based line of the offending token
        line: usize,
        /// What the reader expected
        message: String,
    },

    /// Applying the new declarations would create a require cycle
    #[error("Circular dependency: {0}")]
    Cycle(String),

    /// A tracked source file could not be read
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A persisted snapshot could not be loaded or saved
    #[error("Snapshot file {}: {message}", .path.display())]
    Snapshot {
        /// Snapshot file path
        path: PathBuf,
        /// Cause
        message: String,
    },
}

impl From<GraphError> for ReloadError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::CycleDetected(msg) => ReloadError::Cycle(msg),
        }
    }
}

/// Result type for tracker operations.
pub type Result<T> = std::result::Result<T, ReloadError>;
