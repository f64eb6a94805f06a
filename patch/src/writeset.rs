//! All-or-nothing application of a set of file writes.
//!
//! [`apply_writes`] snapshots every existing target (see [`backup`]),
//! then writes each file in order. If any write fails, every file already
//! touched is put back and newly created files are removed before the
//! error is returned. On success the caller gets a [`Rollback`] that can
//! still undo the whole set if a later step (dependency install) fails.
//!
//! # Examples
//!
//! ```
//! use dbswitch_patch::{PendingWrite, apply_writes};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let env = dir.path().join(".env");
//! std::fs::write(&env, "A=1\n").unwrap();
//!
//! let writes = vec![
//!     PendingWrite::new(&env, "A=2\n"),
//!     PendingWrite::new(dir.path().join("docker/compose.yml"), "services: {}\n"),
//! ];
//! let rollback = apply_writes(&writes).unwrap();
//! assert_eq!(std::fs::read_to_string(&env).unwrap(), "A=2\n");
//!
//! rollback.restore().unwrap();
//! assert_eq!(std::fs::read_to_string(&env).unwrap(), "A=1\n");
//! assert!(!dir.path().join("docker").exists());
//! ```
//!
//! [`backup`]: crate::backup()

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::backup::{Backup, backup, restore};
use crate::error::{PatchError, RestoreFailure, Result};

/// A file and the full content it should have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub path: PathBuf,
    pub content: String,
}

impl PendingWrite {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Undo information for an applied write set.
#[derive(Debug, Default)]
pub struct Rollback {
    backups: Vec<Backup>,
    created_files: Vec<PathBuf>,
    created_dirs: Vec<PathBuf>,
}

impl Rollback {
    /// Snapshots taken before the writes.
    pub fn backups(&self) -> &[Backup] {
        &self.backups
    }

    /// Files that did not exist before the writes.
    pub fn created_files(&self) -> &[PathBuf] {
        &self.created_files
    }

    /// Puts every file back as it was.
    ///
    /// Best-effort: all files are attempted and failures are reported
    /// together.
    pub fn restore(self) -> Result<()> {
        let mut failures = match restore(&self.backups) {
            Ok(()) => Vec::new(),
            Err(PatchError::Restore { failures }) => failures,
            Err(other) => return Err(other),
        };

        for path in self.created_files.iter().rev() {
            match fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "removed created file"),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    warn!(path = %path.display(), error = %source, "could not remove created file");
                    failures.push(RestoreFailure {
                        path: path.clone(),
                        source,
                    });
                }
            }
        }
        // Deepest first; a directory that gained other files stays.
        for dir in self.created_dirs.iter().rev() {
            if let Err(err) = fs::remove_dir(dir) {
                debug!(path = %dir.display(), error = %err, "left created directory in place");
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PatchError::Restore { failures })
        }
    }
}

/// Applies `writes` atomically with respect to failures.
pub fn apply_writes(writes: &[PendingWrite]) -> Result<Rollback> {
    apply_writes_with(writes, |path, content| fs::write(path, content))
}

/// [`apply_writes`] with a caller-supplied write primitive.
///
/// # Errors
///
/// [`PatchError::Backup`] if an existing target cannot be snapshotted
/// (nothing has been written yet). [`PatchError::Write`] if a write fails;
/// its `restored` flag tells whether the rollback put everything back.
pub fn apply_writes_with<F>(writes: &[PendingWrite], mut write: F) -> Result<Rollback>
where
    F: FnMut(&Path, &str) -> io::Result<()>,
{
    let existing: Vec<&Path> = writes
        .iter()
        .map(|w| w.path.as_path())
        .filter(|path| path.exists())
        .collect();
    let mut rollback = Rollback {
        backups: backup(&existing)?,
        ..Rollback::default()
    };

    for pending in writes {
        let result = prepare_parent(&pending.path, &mut rollback.created_dirs).and_then(|()| {
            // Recorded before writing: a failed write may still leave the file.
            if !pending.path.exists() {
                rollback.created_files.push(pending.path.clone());
            }
            write(&pending.path, &pending.content)
        });

        if let Err(source) = result {
            warn!(path = %pending.path.display(), error = %source, "write failed; rolling back");
            let restored = match rollback.restore() {
                Ok(()) => true,
                Err(err) => {
                    warn!(error = %err, "rollback incomplete");
                    false
                }
            };
            return Err(PatchError::Write {
                path: pending.path.clone(),
                source,
                restored,
            });
        }
        info!(path = %pending.path.display(), "wrote");
    }

    Ok(rollback)
}

/// Creates missing parent directories, recording each one created.
fn prepare_parent(path: &Path, created: &mut Vec<PathBuf>) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    let mut missing: Vec<&Path> = parent
        .ancestors()
        .take_while(|dir| !dir.as_os_str().is_empty() && !dir.exists())
        .collect();
    missing.reverse();
    for dir in missing {
        fs::create_dir(dir)?;
        created.push(dir.to_path_buf());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_write_removes_created_files() {
        let dir = tempfile::tempdir().unwrap();
        let writes = vec![
            PendingWrite::new(dir.path().join("new/a.txt"), "a"),
            PendingWrite::new(dir.path().join("b.txt"), "b"),
        ];

        let mut calls = 0;
        let err = apply_writes_with(&writes, |path, content| {
            calls += 1;
            if calls == 2 {
                return Err(io::Error::other("disk full"));
            }
            fs::write(path, content)
        })
        .unwrap_err();

        assert!(matches!(err, PatchError::Write { restored: true, .. }));
        assert!(!dir.path().join("new").exists());
        assert!(!dir.path().join("b.txt").exists());
    }

    #[test]
    fn test_backup_precedes_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let writes = vec![PendingWrite::new(dir.path().join("a.txt"), "a")];
        let rollback = apply_writes(&writes).unwrap();
        assert!(rollback.backups().is_empty());
        assert_eq!(rollback.created_files().len(), 1);
    }
}
