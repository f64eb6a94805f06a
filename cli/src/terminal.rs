//! [`Console`] over a real terminal.

use colored::{ColoredString, Colorize};
use dbswitch_engine::{Console, EngineError, Result};
use dialoguer::{Confirm, Input, Select};

/// Prompts through `dialoguer`, colours output through `colored`.
#[derive(Debug, Default)]
pub struct TerminalConsole;

impl TerminalConsole {
    pub fn new() -> Self {
        Self
    }
}

impl Console for TerminalConsole {
    fn select(&mut self, prompt: &str, items: &[String], default: usize) -> Result<usize> {
        Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(default.min(items.len().saturating_sub(1)))
            .interact()
            .map_err(prompt_error)
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(prompt_error)
    }

    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        input.interact_text().map_err(prompt_error)
    }

    fn info(&mut self, message: &str) {
        println!("{message}");
    }

    fn success(&mut self, message: &str) {
        println!("{} {message}", "✓".green().bold());
    }

    fn warn(&mut self, message: &str) {
        eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
    }

    fn show_diff(&mut self, label: &str, diff: &str) {
        println!("\n{}", label.bold());
        for line in diff.lines() {
            println!("{}", paint(line));
        }
    }
}

/// How a unified diff line is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DiffLine {
    Header,
    Hunk,
    Added,
    Removed,
    Context,
}

fn classify(line: &str) -> DiffLine {
    if line.starts_with("+++") || line.starts_with("---") {
        DiffLine::Header
    } else if line.starts_with("@@") {
        DiffLine::Hunk
    } else if line.starts_with('+') {
        DiffLine::Added
    } else if line.starts_with('-') {
        DiffLine::Removed
    } else {
        DiffLine::Context
    }
}

fn paint(line: &str) -> ColoredString {
    match classify(line) {
        DiffLine::Header => line.bold(),
        DiffLine::Hunk => line.cyan(),
        DiffLine::Added => line.green(),
        DiffLine::Removed => line.red(),
        DiffLine::Context => line.normal(),
    }
}

fn prompt_error(err: dialoguer::Error) -> EngineError {
    EngineError::Prompt(err.to_string())
}
