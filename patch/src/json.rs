//! Shared helpers for JSON manifests edited in place.
//!
//! Objects keep their key order (`serde_json`'s `preserve_order`), output
//! uses two-space indentation, and the trailing newline of the original is
//! kept, so untouched keys produce no diff lines.

use serde_json::{Map, Value};

use crate::error::{PatchError, Result};

pub(crate) fn parse_object(source: &str, target: &'static str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(source)? {
        Value::Object(map) => Ok(map),
        _ => Err(PatchError::NoMatch {
            target,
            detail: "top-level value is not a JSON object".to_string(),
        }),
    }
}

pub(crate) fn render_object(map: Map<String, Value>, like: &str) -> Result<String> {
    let mut out = serde_json::to_string_pretty(&Value::Object(map))?;
    if like.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}
