//! Env schema patcher.
//!
//! The env schema source is a TypeScript module declaring validated
//! variables inside an object block, e.g.
//!
//! ```text
//! export const env = createEnv({
//!   server: {
//!     // Primary connection string
//!     DATABASE_URL: z.string().min(1),
//!     AUTH_SECRET: z.string().min(1),
//!   },
//! });
//! ```
//!
//! Locating that block is the single structural assumption of this module:
//! every operation fails with [`PatchError::SchemaParse`] when it cannot be
//! found. Scanning is done over a masked copy of the source in which the
//! contents of comments and string literals are blanked out, so braces or
//! names inside them never count. Declarations are expected on one line.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PatchError, Result};

static DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*([A-Z][A-Z0-9_]*)[ \t]*:").expect("static regex must compile"));
static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").expect("static regex must compile"));

const NESTED_INDENT: &str = "  ";
const OPTIONAL_SUFFIX: &str = ".optional()";

/// A variable declared in the env schema.
///
/// # Examples
///
/// ```
/// use dbswitch_patch::EnvVarDefinition;
///
/// let var = EnvVarDefinition::new("DIRECT_URL", "z.string().url()")
///     .with_comment("Used by migrations")
///     .optional();
/// assert_eq!(var.rendered_validator(), "z.string().url().optional()");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVarDefinition {
    /// Upper-snake variable name.
    pub name: String,
    /// Validator expression, kept opaque.
    pub validator: String,
    pub optional: bool,
    /// Comment written on the line above the declaration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl EnvVarDefinition {
    pub fn new(name: impl Into<String>, validator: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            validator: validator.into(),
            optional: false,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Validator with `.optional()` appended when needed.
    pub fn rendered_validator(&self) -> String {
        let validator = self.validator.trim();
        if self.optional && !validator.ends_with(OPTIONAL_SUFFIX) {
            format!("{validator}{OPTIONAL_SUFFIX}")
        } else {
            validator.to_string()
        }
    }
}

/// Returns `true` when `name` is a valid upper-snake variable name.
///
/// # Examples
///
/// ```
/// use dbswitch_patch::is_valid_var_name;
///
/// assert!(is_valid_var_name("DATABASE_URL"));
/// assert!(!is_valid_var_name("databaseUrl"));
/// assert!(!is_valid_var_name("1_URL"));
/// ```
pub fn is_valid_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Declared variable names, sorted and deduplicated.
///
/// # Errors
///
/// Returns [`PatchError::SchemaParse`] if the `block` object cannot be found.
///
/// # Examples
///
/// ```
/// use dbswitch_patch::extract_var_names;
///
/// let source = "createEnv({\n  server: {\n    ZED: z.string(),\n    // OLD: z.string(),\n    ALPHA: z.string(),\n  },\n});\n";
/// assert_eq!(extract_var_names(source, "server").unwrap(), vec!["ALPHA", "ZED"]);
/// assert!(extract_var_names("export {}", "server").is_err());
/// ```
pub fn extract_var_names(source: &str, block: &str) -> Result<Vec<String>> {
    let scan = Scan::new(source, block)?;
    let names: BTreeSet<String> = scan
        .declarations()
        .into_iter()
        .map(|decl| decl.name)
        .collect();
    Ok(names.into_iter().collect())
}

/// Parses every declaration with its validator and preceding comment, in
/// source order.
pub fn parse_definitions(source: &str, block: &str) -> Result<Vec<EnvVarDefinition>> {
    let scan = Scan::new(source, block)?;
    Ok(scan
        .declarations()
        .into_iter()
        .map(|decl| {
            let line = &source[decl.line_start..decl.line_end];
            let validator = line
                .split_once(':')
                .map(|(_, rest)| rest.trim().trim_end_matches(',').trim())
                .unwrap_or_default()
                .to_string();
            let optional = validator.ends_with(OPTIONAL_SUFFIX);
            let comment = scan
                .previous_line(decl.line_start)
                .and_then(comment_text)
                .map(ToOwned::to_owned);
            EnvVarDefinition {
                name: decl.name,
                validator,
                optional,
                comment,
            }
        })
        .collect())
}

/// Inserts declarations before the closing brace of the block.
///
/// Variables already declared are skipped. The first inserted declaration
/// is separated from existing ones by a blank line, and each variable's
/// comment goes on its own line above it.
///
/// # Examples
///
/// ```
/// use dbswitch_patch::{EnvVarDefinition, add_vars};
///
/// let source = "createEnv({\n  server: {\n    AUTH_SECRET: z.string(),\n  },\n});\n";
/// let vars = [EnvVarDefinition::new("DATABASE_URL", "z.string()").with_comment("Database")];
/// let patched = add_vars(source, "server", &vars).unwrap();
/// assert_eq!(
///     patched,
///     "createEnv({\n  server: {\n    AUTH_SECRET: z.string(),\n\n    // Database\n    DATABASE_URL: z.string(),\n  },\n});\n"
/// );
/// ```
pub fn add_vars(source: &str, block: &str, defs: &[EnvVarDefinition]) -> Result<String> {
    let scan = Scan::new(source, block)?;
    let declarations = scan.declarations();
    let mut seen: BTreeSet<&str> = declarations.iter().map(|d| d.name.as_str()).collect();

    let fresh: Vec<&EnvVarDefinition> = defs
        .iter()
        .filter(|def| seen.insert(def.name.as_str()))
        .collect();
    if fresh.is_empty() {
        return Ok(source.to_string());
    }

    let indent = declarations
        .iter()
        .find(|decl| decl.line_start > scan.open + 1)
        .map(|decl| leading_whitespace(&source[decl.line_start..decl.line_end]).to_string())
        .unwrap_or_else(|| format!("{}{NESTED_INDENT}", scan.block_indent()));

    let mut rendered = String::new();
    for def in &fresh {
        if let Some(comment) = def.comment.as_deref().filter(|c| !c.trim().is_empty()) {
            rendered.push_str(&format!("{indent}// {}\n", comment.trim()));
        }
        rendered.push_str(&format!(
            "{indent}{}: {},\n",
            def.name,
            def.rendered_validator()
        ));
    }

    let close_line_start = line_start_of(source, scan.close);
    let closes_on_own_line = source[close_line_start..scan.close].trim().is_empty()
        && close_line_start > scan.open;

    let mut out = String::with_capacity(source.len() + rendered.len() + 2);
    if closes_on_own_line {
        let (comma_at, needs_comma) = scan.trailing_comma_position(close_line_start);
        let before = &source[..close_line_start];
        if needs_comma {
            out.push_str(&source[..comma_at]);
            out.push(',');
            out.push_str(&source[comma_at..close_line_start]);
        } else {
            out.push_str(before);
        }
        let previous_blank = scan
            .previous_line(close_line_start)
            .is_none_or(|line| line.trim().is_empty());
        if !declarations.is_empty() && !previous_blank {
            out.push('\n');
        }
        out.push_str(&rendered);
        out.push_str(&source[close_line_start..]);
    } else {
        // `server: { A: z.string() }` on one line: break the closing brace out.
        let (comma_at, needs_comma) = scan.trailing_comma_position(scan.close);
        out.push_str(&source[..comma_at]);
        if needs_comma {
            out.push(',');
        }
        out.push('\n');
        out.push_str(&rendered);
        out.push_str(&scan.block_indent());
        out.push_str(source[comma_at..].trim_start_matches([' ', '\t']));
    }

    debug!(added = fresh.len(), block, "inserted env schema declarations");
    Ok(out)
}

/// Removes declarations together with the comment line directly above each.
///
/// Runs of two or more blank lines left behind are collapsed to one.
///
/// # Examples
///
/// ```
/// use dbswitch_patch::remove_vars;
///
/// let source = "env({\n  server: {\n    // Turso token\n    TOKEN: z.string(),\n    KEEP: z.string(),\n  },\n});\n";
/// let patched = remove_vars(source, "server", &["TOKEN"]).unwrap();
/// assert_eq!(patched, "env({\n  server: {\n    KEEP: z.string(),\n  },\n});\n");
/// ```
pub fn remove_vars<S: AsRef<str>>(source: &str, block: &str, names: &[S]) -> Result<String> {
    let scan = Scan::new(source, block)?;
    let targets: BTreeSet<&str> = names.iter().map(AsRef::as_ref).collect();
    let declarations = scan.declarations();
    let declared_lines: BTreeSet<usize> = declarations.iter().map(|d| d.line_start).collect();
    let close_line_start = line_start_of(source, scan.close);

    let mut drop: Vec<(usize, usize)> = Vec::new();
    for decl in declarations.iter().filter(|d| targets.contains(d.name.as_str())) {
        let mut start = decl.line_start;
        if let Some(prev_start) = scan.previous_line_start(decl.line_start) {
            let prev = &source[prev_start..decl.line_start];
            let inside_block = prev_start > scan.open;
            if inside_block && !declared_lines.contains(&prev_start) && comment_text(prev).is_some()
            {
                start = prev_start;
            }
        }
        // A separator left dangling above the closing brace goes too.
        if decl.line_end_inclusive == close_line_start {
            if let Some(prev_start) = scan
                .previous_line_start(start)
                .filter(|&prev_start| prev_start > scan.open)
            {
                if source[prev_start..start].trim().is_empty() {
                    start = prev_start;
                }
            }
        }
        drop.push((start, decl.line_end_inclusive));
    }

    if drop.is_empty() {
        return Ok(source.to_string());
    }

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for (start, end) in &drop {
        out.push_str(&source[cursor..*start]);
        cursor = *end;
    }
    out.push_str(&source[cursor..]);

    debug!(removed = drop.len(), block, "removed env schema declarations");
    Ok(BLANK_RUN.replace_all(&out, "\n\n").into_owned())
}

/// A declaration line inside the block.
#[derive(Debug)]
struct Declaration {
    name: String,
    line_start: usize,
    /// End of the line content, excluding the newline.
    line_end: usize,
    /// End of the line including its newline.
    line_end_inclusive: usize,
}

/// The source with comments/strings masked, plus the located block.
struct Scan<'a> {
    source: &'a str,
    masked: Vec<u8>,
    /// Index of the opening `{`.
    open: usize,
    /// Index of the matching `}`.
    close: usize,
}

impl<'a> Scan<'a> {
    fn new(source: &'a str, block: &str) -> Result<Self> {
        let masked = mask(source);
        let (open, close) = locate_block(&masked, block).ok_or_else(|| {
            PatchError::SchemaParse(format!("no `{block}: {{ ... }}` declaration block found"))
        })?;
        Ok(Self {
            source,
            masked,
            open,
            close,
        })
    }

    /// Depth-0 declaration lines between the braces, in source order.
    fn declarations(&self) -> Vec<Declaration> {
        let mut out = Vec::new();
        let mut depth: i32 = 0;
        let mut pos = self.open + 1;
        // Text right after the brace counts as a line, for `{ A: z.string() }`.
        let mut at_line_start = true;

        while pos < self.close {
            if at_line_start && depth == 0 {
                let line_end = self.masked[pos..self.close]
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(self.close, |offset| pos + offset);
                let masked_line = String::from_utf8_lossy(&self.masked[pos..line_end]);
                if let Some(caps) = DECLARATION.captures(&masked_line) {
                    let line_end_inclusive = if line_end < self.source.len()
                        && self.source.as_bytes()[line_end] == b'\n'
                    {
                        line_end + 1
                    } else {
                        line_end
                    };
                    out.push(Declaration {
                        name: caps[1].to_string(),
                        line_start: pos,
                        line_end,
                        line_end_inclusive,
                    });
                }
            }
            let byte = self.masked[pos];
            match byte {
                b'{' | b'(' | b'[' => depth += 1,
                b'}' | b')' | b']' => depth -= 1,
                _ => {}
            }
            at_line_start = byte == b'\n';
            pos += 1;
        }
        out
    }

    fn previous_line_start(&self, line_start: usize) -> Option<usize> {
        if line_start == 0 {
            return None;
        }
        Some(line_start_of(self.source, line_start - 1))
    }

    fn previous_line(&self, line_start: usize) -> Option<&'a str> {
        self.previous_line_start(line_start)
            .map(|start| self.source[start..line_start].trim_end_matches(['\n', '\r']))
    }

    /// Indentation of the line holding the block's opening brace.
    fn block_indent(&self) -> String {
        let start = line_start_of(self.source, self.open);
        leading_whitespace(&self.source[start..self.open]).to_string()
    }

    /// Finds where a separating comma belongs before `before`: just after
    /// the last significant character of the block. The flag is `false` when
    /// that character already is a comma or the opening brace.
    fn trailing_comma_position(&self, before: usize) -> (usize, bool) {
        let last = self.masked[self.open..before]
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map(|offset| self.open + offset);
        match last {
            Some(idx) if idx > self.open && self.masked[idx] != b',' => (idx + 1, true),
            Some(idx) => (idx + 1, false),
            None => (before, false),
        }
    }
}

/// Blanks the contents of comments and string literals, keeping byte
/// offsets and newlines intact.
fn mask(source: &str) -> Vec<u8> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Code,
        LineComment,
        BlockComment,
        Str(u8),
    }

    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    let mut state = State::Code;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        match state {
            State::Code => match (b, next) {
                (b'/', Some(b'/')) => {
                    state = State::LineComment;
                    out[i] = b' ';
                    out[i + 1] = b' ';
                    i += 1;
                }
                (b'/', Some(b'*')) => {
                    state = State::BlockComment;
                    out[i] = b' ';
                    out[i + 1] = b' ';
                    i += 1;
                }
                (b'"' | b'\'' | b'`', _) => state = State::Str(b),
                _ => {}
            },
            State::LineComment => {
                if b == b'\n' {
                    state = State::Code;
                } else {
                    out[i] = b' ';
                }
            }
            State::BlockComment => {
                if b == b'*' && next == Some(b'/') {
                    out[i] = b' ';
                    out[i + 1] = b' ';
                    i += 1;
                    state = State::Code;
                } else if b != b'\n' {
                    out[i] = b' ';
                }
            }
            State::Str(quote) => {
                if b == b'\\' && next.is_some() {
                    out[i] = b' ';
                    if next != Some(b'\n') {
                        out[i + 1] = b' ';
                    }
                    i += 1;
                } else if b == quote {
                    state = State::Code;
                } else if b != b'\n' {
                    out[i] = b' ';
                }
            }
        }
        i += 1;
    }
    out
}

/// Returns the `{` and matching `}` offsets of `<block>: {`.
fn locate_block(masked: &[u8], block: &str) -> Option<(usize, usize)> {
    let text = String::from_utf8_lossy(masked);
    let pattern = Regex::new(&format!(r"\b{}\s*:\s*\{{", regex::escape(block))).ok()?;
    let found = pattern.find(&text)?;
    let open = found.end() - 1;

    let mut depth = 0usize;
    for (offset, &byte) in masked[open..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((open, open + offset));
                }
            }
            _ => {}
        }
    }
    None
}

fn line_start_of(source: &str, index: usize) -> usize {
    source[..index].rfind('\n').map_or(0, |pos| pos + 1)
}

fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

fn comment_text(line: &str) -> Option<&str> {
    line.trim().strip_prefix("//").map(str::trim)
}
