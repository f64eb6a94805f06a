//! System dependency checker.

use dbswitch_core::SystemDependency;
use tracing::debug;

use crate::error::{EngineError, MissingDependency, Result};
use crate::runner::CommandRunner;

/// Probes each dependency on `PATH`; re-checked on every run.
///
/// # Errors
///
/// [`EngineError::MissingDependencies`] listing every missing command
/// with its install hint.
pub fn ensure_system_dependencies(
    runner: &dyn CommandRunner,
    deps: &[SystemDependency],
) -> Result<()> {
    let missing: Vec<MissingDependency> = deps
        .iter()
        .filter(|dep| {
            let found = runner.command_exists(dep.command);
            debug!(command = dep.command, found, "probed system dependency");
            !found
        })
        .map(|dep| MissingDependency {
            command: dep.command.to_string(),
            install_hint: dep.install_hint.to_string(),
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(EngineError::MissingDependencies { missing })
    }
}
