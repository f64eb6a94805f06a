//! Data-model definition (`schema.prisma`) patchers.
//!
//! Each function is a pure `&str -> String` transform scoped to one block:
//! text outside the targeted `datasource`/`generator` block is returned
//! byte-for-byte, so previews only show the lines that actually change.

use std::ops::Range;
use std::sync::LazyLock;

use dbswitch_core::DataModelProvider;
use regex::Regex;
use tracing::debug;

use crate::error::{PatchError, Result};

/// Generator keyword of the current client generator.
pub const CLIENT_GENERATOR: &str = "prisma-client";
/// Generator keyword the current one replaces.
pub const LEGACY_CLIENT_GENERATOR: &str = "prisma-client-js";
/// Output directory written into generator blocks that lack one.
pub const GENERATOR_OUTPUT: &str = "../generated";

const TARGET: &str = "datasource block";

static BLOCK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(datasource|generator)[ \t]+\w+[ \t]*\{")
        .expect("static regex must compile")
});

static PROVIDER_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^([ \t]*provider[ \t]*=[ \t]*)"([^"]*)""#).expect("static regex must compile")
});

static OUTPUT_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*output[ \t]*=").expect("static regex must compile"));

static URL_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:url|directUrl|shadowDatabaseUrl)[ \t]*=[^\n]*\n?")
        .expect("static regex must compile")
});

/// A top-level block: `body` spans the text between the braces.
struct Block {
    kind: String,
    header: Range<usize>,
    body: Range<usize>,
}

fn blocks(source: &str) -> Vec<Block> {
    BLOCK_HEADER
        .captures_iter(source)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let close = matching_brace(source, whole.end())?;
            Some(Block {
                kind: caps[1].to_string(),
                header: whole.range(),
                body: whole.end()..close,
            })
        })
        .collect()
}

/// Offset of the `}` closing a block whose body starts at `from`.
fn matching_brace(source: &str, from: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut depth = 1usize;
    let mut in_string = false;
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_string => i += 1,
            b'"' => in_string = !in_string,
            b'/' if !in_string && bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn sole_datasource(source: &str) -> Result<Block> {
    let mut found: Vec<Block> = blocks(source)
        .into_iter()
        .filter(|block| block.kind == "datasource")
        .collect();
    match found.len() {
        1 => Ok(found.remove(0)),
        0 => Err(PatchError::NoMatch {
            target: TARGET,
            detail: "no datasource block found".to_string(),
        }),
        n => Err(PatchError::NoMatch {
            target: TARGET,
            detail: format!("expected exactly one datasource block, found {n}"),
        }),
    }
}

fn splice(source: &str, range: Range<usize>, replacement: &str) -> String {
    let mut out = String::with_capacity(source.len() + replacement.len());
    out.push_str(&source[..range.start]);
    out.push_str(replacement);
    out.push_str(&source[range.end..]);
    out
}

/// Provider literal of the datasource block, if there is exactly one.
pub fn datasource_provider(source: &str) -> Option<String> {
    let block = sole_datasource(source).ok()?;
    PROVIDER_FIELD
        .captures(&source[block.body])
        .map(|caps| caps[2].to_string())
}

/// Replaces the provider literal inside the datasource block.
///
/// # Errors
///
/// [`PatchError::NoMatch`] unless the source has exactly one datasource
/// block with a `provider` field.
///
/// # Examples
///
/// ```
/// use dbswitch_core::DataModelProvider;
/// use dbswitch_patch::update_datasource_provider;
///
/// let schema = "datasource db {\n  provider = \"sqlite\"\n}\n";
/// let patched = update_datasource_provider(schema, DataModelProvider::Postgresql).unwrap();
/// assert_eq!(patched, "datasource db {\n  provider = \"postgresql\"\n}\n");
/// ```
pub fn update_datasource_provider(source: &str, provider: DataModelProvider) -> Result<String> {
    let block = sole_datasource(source)?;
    let body = &source[block.body.clone()];
    let caps = PROVIDER_FIELD.captures(body).ok_or(PatchError::NoMatch {
        target: TARGET,
        detail: "datasource block has no provider field".to_string(),
    })?;
    if &caps[2] == provider.as_str() {
        return Ok(source.to_string());
    }
    let whole = caps.get(0).map(|m| m.range()).unwrap_or_default();
    let replacement = format!("{}\"{}\"", &caps[1], provider.as_str());
    debug!(from = &caps[2], to = provider.as_str(), "datasource provider swapped");
    let start = block.body.start;
    Ok(splice(
        source,
        start + whole.start..start + whole.end,
        &replacement,
    ))
}

/// Moves generator blocks onto the current client generator.
///
/// Swaps the legacy keyword for [`CLIENT_GENERATOR`] and adds an `output`
/// field when missing. Applying it twice equals applying it once.
///
/// # Examples
///
/// ```
/// use dbswitch_patch::ensure_generator_compat;
///
/// let schema = "generator client {\n  provider = \"prisma-client-js\"\n}\n";
/// let once = ensure_generator_compat(schema);
/// assert_eq!(
///     once,
///     "generator client {\n  provider = \"prisma-client\"\n  output   = \"../generated\"\n}\n"
/// );
/// assert_eq!(ensure_generator_compat(&once), once);
/// ```
pub fn ensure_generator_compat(source: &str) -> String {
    let mut out = source.to_string();
    // Back to front so earlier offsets stay valid.
    for block in blocks(source)
        .into_iter()
        .filter(|block| block.kind == "generator")
        .rev()
    {
        let body = &source[block.body.clone()];
        let Some(caps) = PROVIDER_FIELD.captures(body) else {
            continue;
        };
        let keyword = &caps[2];
        if keyword != CLIENT_GENERATOR && keyword != LEGACY_CLIENT_GENERATOR {
            continue;
        }

        let mut patched = body.to_string();
        if keyword == LEGACY_CLIENT_GENERATOR {
            patched = PROVIDER_FIELD
                .replace(&patched, format!("${{1}}\"{CLIENT_GENERATOR}\""))
                .into_owned();
        }
        if !OUTPUT_FIELD.is_match(&patched) {
            let indent = caps
                .get(1)
                .map(|m| m.as_str().len() - m.as_str().trim_start().len())
                .unwrap_or(2);
            let line = format!("{}output   = \"{GENERATOR_OUTPUT}\"\n", " ".repeat(indent));
            if !patched.ends_with('\n') {
                patched.push('\n');
            }
            patched.push_str(&line);
        }
        if patched != body {
            debug!(header = &source[block.header.clone()], "generator block normalised");
            out = splice(&out, block.body, &patched);
        }
    }
    out
}

/// Strips connection-string fields from the datasource block.
///
/// Connection settings live in the migration config, so `url`,
/// `directUrl` and `shadowDatabaseUrl` lines are dropped. Sources without
/// a single datasource block are returned unchanged.
///
/// # Examples
///
/// ```
/// use dbswitch_patch::remove_deprecated_url_field;
///
/// let schema = "datasource db {\n  provider = \"postgresql\"\n  url      = env(\"DATABASE_URL\")\n}\n";
/// let patched = remove_deprecated_url_field(schema);
/// assert_eq!(patched, "datasource db {\n  provider = \"postgresql\"\n}\n");
/// assert_eq!(remove_deprecated_url_field(&patched), patched);
/// ```
pub fn remove_deprecated_url_field(source: &str) -> String {
    let Ok(block) = sole_datasource(source) else {
        return source.to_string();
    };
    let body = &source[block.body.clone()];
    let stripped = URL_FIELD.replace_all(body, "");
    if stripped == body {
        return source.to_string();
    }
    debug!("removed inline connection fields from datasource block");
    splice(source, block.body, &stripped)
}
