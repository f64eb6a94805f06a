//! In-memory snapshots of files about to be rewritten.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{PatchError, RestoreFailure, Result};

/// Full content of one file taken right before it is overwritten.
#[derive(Debug, Clone)]
pub struct Backup {
    pub file_path: PathBuf,
    pub original_content: String,
    pub timestamp: DateTime<Utc>,
}

/// Snapshots every path.
///
/// # Errors
///
/// Fails on the first path that cannot be read, including paths that do
/// not exist. Nothing is written in either case.
pub fn backup<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Backup>> {
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            let original_content =
                fs::read_to_string(path).map_err(|source| PatchError::Backup {
                    path: path.to_path_buf(),
                    source,
                })?;
            debug!(path = %path.display(), bytes = original_content.len(), "backed up");
            Ok(Backup {
                file_path: path.to_path_buf(),
                original_content,
                timestamp: Utc::now(),
            })
        })
        .collect()
}

/// Writes every snapshot back.
///
/// Keeps going after a failed file and reports all failures together.
pub fn restore(backups: &[Backup]) -> Result<()> {
    let failures: Vec<RestoreFailure> = backups
        .iter()
        .filter_map(|backup| {
            match fs::write(&backup.file_path, &backup.original_content) {
                Ok(()) => {
                    debug!(path = %backup.file_path.display(), "restored");
                    None
                }
                Err(source) => {
                    warn!(path = %backup.file_path.display(), error = %source, "restore failed");
                    Some(RestoreFailure {
                        path: backup.file_path.clone(),
                        source,
                    })
                }
            }
        })
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(PatchError::Restore { failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_of_missing_file_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("a.txt");
        fs::write(&present, "a").unwrap();
        let missing = dir.path().join("missing.txt");

        let err = backup(&[&present, &missing]).unwrap_err();
        match err {
            PatchError::Backup { path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_restore_reports_every_failure() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.txt");
        fs::write(&good, "before").unwrap();
        let mut backups = backup(&[&good]).unwrap();
        fs::write(&good, "after").unwrap();

        for name in ["gone/one.txt", "gone/two.txt"] {
            backups.push(Backup {
                file_path: dir.path().join(name),
                original_content: String::new(),
                timestamp: Utc::now(),
            });
        }

        let err = restore(&backups).unwrap_err();
        match err {
            PatchError::Restore { failures } => assert_eq!(failures.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs::read_to_string(&good).unwrap(), "before");
    }
}
