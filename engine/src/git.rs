//! Safety gate: protected directories must be committed before a switch.

use std::path::Path;

use tracing::{debug, warn};

use crate::config::SwitchConfig;
use crate::error::{EngineError, Result};
use crate::runner::{CommandRunner, CommandSpec};

/// What the gate found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeState {
    /// Inside a repository with nothing uncommitted under protected dirs.
    Clean,
    /// Not a repository (or git unavailable); backups are the only net.
    NotARepository,
}

/// Fails when any protected directory has uncommitted changes.
///
/// Modified, staged, deleted and untracked files all count; for renames
/// the new path counts. Every offending path is listed in the error.
///
/// # Errors
///
/// [`EngineError::DirtyWorkingTree`] naming each path.
pub fn ensure_directories_committed(
    runner: &mut dyn CommandRunner,
    root: &Path,
    config: &SwitchConfig,
) -> Result<TreeState> {
    let prefix = match runner.capture(&git(root, &["rev-parse", "--show-prefix"])) {
        Ok(prefix) => prefix.trim().to_string(),
        Err(err) => {
            warn!(error = %err, "not a git repository; proceeding without the safety gate");
            return Ok(TreeState::NotARepository);
        }
    };

    let status = runner.capture(&git(
        root,
        &["status", "--porcelain=v1", "--untracked-files=all"],
    ))?;

    let dirty: Vec<String> = changed_paths(&status)
        .into_iter()
        .filter_map(|path| {
            // Porcelain paths are relative to the repository top level.
            let relative = path.strip_prefix(prefix.as_str())?;
            config.is_protected(relative).then(|| relative.to_string())
        })
        .collect();

    if dirty.is_empty() {
        debug!("protected directories are clean");
        Ok(TreeState::Clean)
    } else {
        Err(EngineError::DirtyWorkingTree { paths: dirty })
    }
}

fn git(root: &Path, args: &[&str]) -> CommandSpec {
    CommandSpec::new("git")
        .args(args.iter().copied())
        .current_dir(root)
}

/// Paths named by `git status --porcelain=v1` output.
pub(crate) fn changed_paths(status: &str) -> Vec<String> {
    status
        .lines()
        .filter(|line| line.len() > 3)
        .map(|line| {
            let path = &line[3..];
            let path = path.split_once(" -> ").map_or(path, |(_, to)| to);
            unquote(path)
        })
        .collect()
}

fn unquote(path: &str) -> String {
    match path.strip_prefix('"').and_then(|p| p.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => path.to_string(),
    }
}
