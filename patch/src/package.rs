//! Package manifest (`package.json`) script merging and dependency queries.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::Result;
use crate::json::{parse_object, render_object};

const TARGET: &str = "package manifest";

/// Sets `scripts` entries and drops stale ones.
///
/// Names in `stale` are removed unless `set` defines them. Existing keys
/// keep their position; new keys are appended. The source is returned
/// unchanged when nothing differs.
///
/// # Examples
///
/// ```
/// use dbswitch_patch::merge_scripts;
///
/// let manifest = "{\n  \"name\": \"@acme/db\",\n  \"scripts\": {\n    \"db:stop\": \"docker compose down\",\n    \"build\": \"tsc\"\n  }\n}\n";
/// let patched = merge_scripts(manifest, &[("db:dev", "prisma dev")], &["db:start", "db:stop", "db:dev"]).unwrap();
/// assert_eq!(
///     patched,
///     "{\n  \"name\": \"@acme/db\",\n  \"scripts\": {\n    \"build\": \"tsc\",\n    \"db:dev\": \"prisma dev\"\n  }\n}\n"
/// );
/// ```
pub fn merge_scripts(source: &str, set: &[(&str, &str)], stale: &[&str]) -> Result<String> {
    let mut root = parse_object(source, TARGET)?;
    let mut scripts = match root.get("scripts") {
        Some(Value::Object(existing)) => existing.clone(),
        _ => Map::new(),
    };

    let mut changed = false;
    for name in stale {
        if set.iter().any(|(key, _)| key == name) {
            continue;
        }
        if scripts.shift_remove(*name).is_some() {
            debug!(script = name, "removed stale script");
            changed = true;
        }
    }
    for (name, command) in set {
        let desired = Value::String((*command).to_string());
        if scripts.get(*name) != Some(&desired) {
            scripts.insert((*name).to_string(), desired);
            changed = true;
        }
    }

    if !changed {
        return Ok(source.to_string());
    }
    root.insert("scripts".to_string(), Value::Object(scripts));
    render_object(root, source)
}

/// Names listed under `dependencies` and `devDependencies`.
pub fn dependency_names(source: &str) -> Result<BTreeSet<String>> {
    let root = parse_object(source, TARGET)?;
    Ok(["dependencies", "devDependencies"]
        .iter()
        .filter_map(|section| root.get(*section).and_then(Value::as_object))
        .flat_map(|deps| deps.keys().cloned())
        .collect())
}

/// The manifest's `name` field.
pub fn package_name(source: &str) -> Result<Option<String>> {
    let root = parse_object(source, TARGET)?;
    Ok(root.get("name").and_then(Value::as_str).map(ToOwned::to_owned))
}
