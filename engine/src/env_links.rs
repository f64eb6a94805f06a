//! Points every app's `.env` at the single consolidated env file.
//!
//! Each target directory gets a relative symlink `<target>/.env` to the
//! source. Links that already point at the source are left alone, links
//! pointing elsewhere are replaced, and regular files are never touched.
//! Hosts without symlinks get a copy instead.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};

/// Name of the link created in each target.
pub const ENV_FILE_NAME: &str = ".env";

/// What happened to one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    Created,
    /// Already linked to the source.
    Unchanged,
    /// A link to somewhere else was replaced.
    Replaced { previous: PathBuf },
    /// A regular file is in the way; left as is.
    SkippedRegularFile,
    /// The target directory does not exist.
    MissingTarget,
    /// Symlinks are unavailable; the file was copied.
    Copied,
}

/// Outcome for one target directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReport {
    /// Root-relative target directory.
    pub target: PathBuf,
    pub status: LinkStatus,
}

/// Links `<root>/<target>/.env` to `<root>/<source>` for every target.
///
/// # Errors
///
/// [`EngineError::MissingEnvSource`] when the source does not exist;
/// [`EngineError::Io`] when a link cannot be created.
pub fn link_env_files(root: &Path, source: &Path, targets: &[PathBuf]) -> Result<Vec<LinkReport>> {
    let source = normalize(source);
    if !root.join(&source).is_file() {
        return Err(EngineError::MissingEnvSource(source));
    }

    targets
        .iter()
        .map(|target| {
            let target = normalize(target);
            let status = link_one(root, &source, &target)?;
            Ok(LinkReport { target, status })
        })
        .collect()
}

fn link_one(root: &Path, source: &Path, target: &Path) -> Result<LinkStatus> {
    let dir = root.join(target);
    if !dir.is_dir() {
        warn!(target = %target.display(), "target directory does not exist");
        return Ok(LinkStatus::MissingTarget);
    }
    let link = dir.join(ENV_FILE_NAME);
    let destination = relative_to(target, source);

    let previous = match fs::symlink_metadata(&link) {
        Ok(meta) if meta.file_type().is_symlink() => {
            let current = fs::read_link(&link)?;
            if current == destination {
                debug!(link = %link.display(), "already linked");
                return Ok(LinkStatus::Unchanged);
            }
            fs::remove_file(&link)?;
            Some(current)
        }
        Ok(_) => {
            warn!(link = %link.display(), "regular file in the way; not overwriting");
            return Ok(LinkStatus::SkippedRegularFile);
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => return Err(err.into()),
    };

    let status = create_link(&destination, &root.join(source), &link)?;
    info!(link = %link.display(), to = %destination.display(), "linked env file");
    Ok(match (status, previous) {
        (LinkStatus::Created, Some(previous)) => LinkStatus::Replaced { previous },
        (status, _) => status,
    })
}

#[cfg(unix)]
fn create_link(destination: &Path, _source: &Path, link: &Path) -> Result<LinkStatus> {
    std::os::unix::fs::symlink(destination, link)?;
    Ok(LinkStatus::Created)
}

#[cfg(not(unix))]
fn create_link(_destination: &Path, source: &Path, link: &Path) -> Result<LinkStatus> {
    fs::copy(source, link)?;
    Ok(LinkStatus::Copied)
}

/// Drops `.` components and trailing separators.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

/// Path to `to` as seen from directory `from`; both root-relative.
///
/// # Examples
///
/// ```text
/// relative_to("apps/web", ".env")           == "../../.env"
/// relative_to("packages/db", "config/.env") == "../../config/.env"
/// ```
fn relative_to(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component<'_>> = from.components().collect();
    let to: Vec<Component<'_>> = to.components().collect();
    let shared = from
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in shared..from.len() {
        out.push("..");
    }
    for component in &to[shared..] {
        out.push(component.as_os_str());
    }
    out
}
