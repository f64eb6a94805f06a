//! [`CommandRunner`] over `std::process`.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use dbswitch_engine::{CommandRunner, CommandSpec, EngineError, Result};
use regex::Regex;
use tracing::{debug, info, warn};

/// Spawns real programs, relative to the project root unless the spec
/// names its own directory.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    root: PathBuf,
}

impl ProcessRunner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn command(&self, spec: &CommandSpec) -> Command {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(spec.cwd.as_deref().unwrap_or(self.root.as_path()));
        command
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&mut self, spec: &CommandSpec) -> Result<()> {
        info!(command = %spec, "running");
        let status = self
            .command(spec)
            .stdin(Stdio::inherit())
            .status()
            .map_err(|source| spawn_error(spec, source))?;
        check_status(spec, status, "")
    }

    fn capture(&mut self, spec: &CommandSpec) -> Result<String> {
        debug!(command = %spec, "capturing output");
        let output = self
            .command(spec)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| spawn_error(spec, source))?;
        check_status(spec, output.status, &String::from_utf8_lossy(&output.stderr))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn capture_until(&mut self, spec: &CommandSpec, patterns: &[&Regex]) -> Result<Option<String>> {
        info!(command = %spec, patterns = patterns.len(), "starting until output matches");
        let mut child = self
            .command(spec)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| spawn_error(spec, source))?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        };

        let mut reader = BufReader::new(stdout);
        let mut collected = String::new();
        let mut line = Vec::new();
        let matched = loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => break false,
                Ok(_) => {
                    collected.push_str(&String::from_utf8_lossy(&line));
                    if patterns.iter().all(|pattern| pattern.is_match(&collected)) {
                        break true;
                    }
                }
                Err(err) => {
                    warn!(command = %spec, error = %err, "failed to read output");
                    break false;
                }
            }
        };

        // Stopped whether or not it matched.
        let _ = child.kill();
        let _ = child.wait();
        debug!(command = %spec, matched, "stopped");

        Ok(matched.then_some(collected))
    }
}

fn check_status(spec: &CommandSpec, status: ExitStatus, stderr: &str) -> Result<()> {
    if status.success() {
        return Ok(());
    }
    let detail = stderr.trim();
    let status = if detail.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {detail}")
    };
    Err(EngineError::Command {
        program: spec.program.clone(),
        status,
    })
}

fn spawn_error(spec: &CommandSpec, source: std::io::Error) -> EngineError {
    EngineError::Spawn {
        program: spec.program.clone(),
        source,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh").args(["-c", script])
    }

    #[test]
    fn test_capture_returns_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = ProcessRunner::new(dir.path());
        let out = runner.capture(&sh("echo ready")).unwrap();
        assert_eq!(out, "ready\n");
    }

    #[test]
    fn test_capture_runs_in_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let mut runner = ProcessRunner::new(dir.path());
        let out = runner.capture(&sh("cat marker.txt")).unwrap();
        assert_eq!(out, "here");
    }

    #[test]
    fn test_failed_command_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = ProcessRunner::new(dir.path());
        let err = runner.capture(&sh("echo broken >&2; exit 3")).unwrap_err();
        match err {
            EngineError::Command { program, status } => {
                assert_eq!(program, "sh");
                assert!(status.contains("broken"), "{status}");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(runner.run(&sh("exit 1")).is_err());
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = ProcessRunner::new(dir.path());
        let err = runner
            .run(&CommandSpec::new("definitely-not-a-real-program-xyz"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }));
    }

    #[test]
    fn test_capture_until_stops_long_running_process() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = ProcessRunner::new(dir.path());
        let pattern = Regex::new(r"postgres://\S+").unwrap();
        let out = runner
            .capture_until(
                &sh("echo booting; echo 'url postgres://localhost:5432/db'; sleep 30"),
                &[&pattern],
            )
            .unwrap()
            .unwrap();
        assert!(out.contains("booting"));
        assert!(out.contains("postgres://localhost:5432/db"));
    }

    #[test]
    fn test_capture_until_waits_for_every_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = ProcessRunner::new(dir.path());
        let proxied = Regex::new(r"prisma\+postgres://").unwrap();
        let direct = Regex::new(r"TCP: postgres://").unwrap();
        let out = runner
            .capture_until(
                &sh("echo 'prisma+postgres://localhost:1'; echo 'TCP: postgres://localhost:2'; echo late; sleep 30"),
                &[&proxied, &direct],
            )
            .unwrap()
            .unwrap();
        assert!(out.contains("TCP: postgres://localhost:2"));
        assert!(!out.contains("late"));
    }

    #[test]
    fn test_capture_until_without_match_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = ProcessRunner::new(dir.path());
        let pattern = Regex::new(r"postgres://").unwrap();
        let out = runner.capture_until(&sh("echo nothing here"), &[&pattern]).unwrap();
        assert_eq!(out, None);
    }
}
