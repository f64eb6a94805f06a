//! Error types for the switch orchestration and the interactive sessions.
//!
//! Precondition failures (`DirtyWorkingTree`, `MissingDependencies`,
//! lookups, schema parsing) happen before any write. `Apply` is raised
//! after writes began and records whether the rollback succeeded.

use std::path::PathBuf;

use dbswitch_core::{CoreError, SetupError};
use dbswitch_patch::PatchError;
use thiserror::Error;

/// A required command that is not on `PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDependency {
    pub command: String,
    pub install_hint: String,
}

/// Errors that can occur while switching providers or editing env config.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Uncommitted changes under a protected directory.
    #[error(
        "uncommitted changes in protected directories; commit or stash them first:\n{}",
        bullet_list(.paths)
    )]
    DirtyWorkingTree { paths: Vec<String> },

    /// One or more required commands are missing.
    #[error("missing system dependencies:\n{}", describe_missing(.missing))]
    MissingDependencies { missing: Vec<MissingDependency> },

    /// Provider or local-dev lookup failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Patching, backup, write or restore failure.
    #[error(transparent)]
    Patch(#[from] PatchError),

    /// A step after the writes failed; the write set was rolled back.
    #[error("{source}{}", rollback_note(.restored))]
    Apply {
        source: Box<EngineError>,
        restored: bool,
    },

    /// A subprocess exited unsuccessfully.
    #[error("`{program}` failed: {status}")]
    Command { program: String, status: String },

    /// A subprocess could not be started.
    #[error("could not run `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// A provider setup routine failed.
    #[error("provider setup failed: {0}")]
    Setup(#[from] SetupError),

    /// Interactive input could not be read.
    #[error("prompt failed: {0}")]
    Prompt(String),

    /// An env var name is not upper-snake case.
    #[error("invalid variable name '{0}' (expected UPPER_SNAKE_CASE)")]
    InvalidVarName(String),

    /// An env var is already declared or already pending.
    #[error("variable '{0}' is already declared")]
    DuplicateVar(String),

    /// An env var to remove is not declared.
    #[error("variable '{0}' is not declared")]
    UnknownVar(String),

    /// A project file the switch must patch does not exist.
    #[error("required project file '{}' does not exist", .0.display())]
    MissingProjectFile(PathBuf),

    /// The env file to link does not exist.
    #[error("env source '{}' does not exist", .0.display())]
    MissingEnvSource(PathBuf),

    /// YAML configuration parsing or serialisation failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("  - {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_missing(missing: &[MissingDependency]) -> String {
    missing
        .iter()
        .map(|dep| format!("  - {}: {}", dep.command, dep.install_hint))
        .collect::<Vec<_>>()
        .join("\n")
}

fn rollback_note(restored: &bool) -> &'static str {
    if *restored {
        " (all file changes rolled back)"
    } else {
        " (rollback incomplete; check the files listed above)"
    }
}

/// Convenience alias for results with [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;
