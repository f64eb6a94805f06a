//! The operator-facing seam.
//!
//! Everything the engine shows to or asks of the human goes through
//! [`Console`]. The binary implements it over a terminal; tests script it.

use crate::error::Result;

/// Interactive prompts and user-facing output.
pub trait Console {
    /// Picks one of `items`; returns its index. `default` is preselected.
    fn select(&mut self, prompt: &str, items: &[String], default: usize) -> Result<usize>;

    /// Yes/no question.
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool>;

    /// Free-text answer. An empty answer falls back to `default` if given.
    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String>;

    /// Plain progress or report line.
    fn info(&mut self, message: &str);

    /// A step finished.
    fn success(&mut self, message: &str);

    /// Something the operator should check by hand.
    fn warn(&mut self, message: &str);

    /// A unified diff for `label`.
    fn show_diff(&mut self, label: &str, diff: &str);
}
