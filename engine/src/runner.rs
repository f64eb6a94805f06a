//! Subprocess seam and the bridge that lets provider setup use it.

use std::fmt;
use std::path::{Path, PathBuf};

use dbswitch_core::SetupError;
use dbswitch_core::setup::SetupContext;
use regex::Regex;

use crate::console::Console;
use crate::error::{EngineError, Result};

/// A program invocation.
///
/// # Examples
///
/// ```
/// use dbswitch_engine::CommandSpec;
///
/// let cmd = CommandSpec::new("pnpm").args(["--filter", "@acme/db", "add", "pg@^8.16.0"]);
/// assert_eq!(cmd.to_string(), "pnpm --filter @acme/db add pg@^8.16.0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; the runner's own when `None`.
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Runs external programs.
pub trait CommandRunner {
    /// Runs to completion with inherited stdio.
    ///
    /// # Errors
    ///
    /// [`EngineError::Command`] on a non-zero exit, [`EngineError::Spawn`]
    /// if the program cannot be started.
    fn run(&mut self, cmd: &CommandSpec) -> Result<()>;

    /// Runs to completion and returns stdout.
    fn capture(&mut self, cmd: &CommandSpec) -> Result<String>;

    /// Starts `cmd`, reads stdout until every pattern has matched the
    /// output read so far, then stops the process. Returns that output, or
    /// `None` if the process exited first.
    fn capture_until(&mut self, cmd: &CommandSpec, patterns: &[&Regex]) -> Result<Option<String>>;

    /// Whether `command` resolves on `PATH`.
    fn command_exists(&self, command: &str) -> bool {
        which::which(command).is_ok()
    }
}

/// [`SetupContext`] over the engine's console and runner.
///
/// Status probes run from the project root; long-running dev servers run
/// from the database package, next to the data model they serve.
pub struct SetupBridge<'a> {
    pub console: &'a mut dyn Console,
    pub runner: &'a mut dyn CommandRunner,
    pub root: &'a Path,
    pub package_dir: PathBuf,
}

fn spec_in(dir: &Path, program: &str, args: &[&str]) -> CommandSpec {
    CommandSpec::new(program)
        .args(args.iter().copied())
        .current_dir(dir)
}

impl SetupContext for SetupBridge<'_> {
    fn input(&mut self, prompt: &str, default: Option<&str>) -> std::result::Result<String, SetupError> {
        self.console
            .input(prompt, default)
            .map_err(|err| SetupError::Prompt(err.to_string()))
    }

    fn capture(&mut self, program: &str, args: &[&str]) -> std::result::Result<String, SetupError> {
        let spec = spec_in(self.root, program, args);
        self.runner
            .capture(&spec)
            .map_err(|err| command_error(program, err))
    }

    fn capture_until(
        &mut self,
        program: &str,
        args: &[&str],
        patterns: &[&Regex],
    ) -> std::result::Result<Option<String>, SetupError> {
        let spec = spec_in(&self.package_dir, program, args);
        self.runner
            .capture_until(&spec, patterns)
            .map_err(|err| command_error(program, err))
    }
}

fn command_error(program: &str, err: EngineError) -> SetupError {
    SetupError::Command {
        program: program.to_string(),
        detail: err.to_string(),
    }
}
