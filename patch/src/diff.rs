//! Unified diffs for previewing pending writes.

use std::fs;
use std::io;
use std::path::Path;

use similar::TextDiff;

use crate::error::Result;

/// Lines of context around each change.
const CONTEXT_LINES: usize = 3;

/// Unified diff between `old` and `new`, labelled `a/<label>` / `b/<label>`.
///
/// Returns an empty string when the contents are identical. Callers treat
/// that as "skip this file".
///
/// # Examples
///
/// ```
/// use dbswitch_patch::unified_diff;
///
/// assert_eq!(unified_diff(".env", "A=1\n", "A=1\n"), "");
///
/// let diff = unified_diff(".env", "A=1\n", "A=2\n");
/// assert!(diff.starts_with("--- a/.env\n+++ b/.env\n"));
/// assert!(diff.contains("-A=1\n+A=2\n"));
/// ```
pub fn unified_diff(label: &str, old: &str, new: &str) -> String {
    if old == new {
        return String::new();
    }
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(&format!("a/{label}"), &format!("b/{label}"))
        .to_string()
}

/// Reads a file for diffing; a missing file reads as empty.
pub fn read_or_empty(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(err.into()),
    }
}

/// Diff between a file's current content and `new_content`.
pub fn diff_file(path: &Path, new_content: &str) -> Result<String> {
    let current = read_or_empty(path)?;
    Ok(unified_diff(
        &path.display().to_string(),
        &current,
        new_content,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_diffs_against_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docker-compose.yml");
        let diff = diff_file(&path, "services: {}\n").unwrap();
        assert!(diff.contains("+services: {}"));
        assert_eq!(diff_file(&path, "").unwrap(), "");
    }

    #[test]
    fn test_identical_file_has_empty_diff() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "A=1\n").unwrap();
        assert_eq!(diff_file(&path, "A=1\n").unwrap(), "");
    }
}
