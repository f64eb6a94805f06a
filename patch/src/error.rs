//! Error types for patching, diffing, backing up and writing files.
//!
//! Structural problems in a source file (`SchemaParse`, `NoMatch`) are
//! preconditions: they are reported before anything is written and are not
//! retryable.

use std::path::PathBuf;

use thiserror::Error;

/// One file that could not be put back during a rollback.
#[derive(Debug)]
pub struct RestoreFailure {
    pub path: PathBuf,
    pub source: std::io::Error,
}

/// Errors that can occur while patching or writing project files.
#[derive(Debug, Error)]
pub enum PatchError {
    /// The env-schema declaration block could not be located.
    #[error("could not parse env schema: {0}")]
    SchemaParse(String),

    /// A patch target (datasource block, adapter line, ...) is missing or
    /// ambiguous.
    #[error("cannot patch {target}: {detail}")]
    NoMatch {
        target: &'static str,
        detail: String,
    },

    /// A file slated for modification could not be snapshotted.
    #[error("cannot back up '{}': {source}", .path.display())]
    Backup {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A candidate file could not be written. `restored` records whether the
    /// rollback that followed put every file back.
    #[error("failed to write '{}': {source}{}", .path.display(), rollback_note(.restored))]
    Write {
        path: PathBuf,
        source: std::io::Error,
        restored: bool,
    },

    /// One or more files could not be restored during a rollback.
    #[error("failed to restore {} file(s): {}", .failures.len(), describe_failures(.failures))]
    Restore { failures: Vec<RestoreFailure> },

    /// JSON manifest parsing or serialisation failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O failure outside the backup/write protocol.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn rollback_note(restored: &bool) -> &'static str {
    if *restored {
        " (all changes rolled back)"
    } else {
        " (rollback incomplete)"
    }
}

fn describe_failures(failures: &[RestoreFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("{} ({})", failure.path.display(), failure.source))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience alias for results with [`PatchError`].
pub type Result<T> = std::result::Result<T, PatchError>;
