//! Global-env manifest synchronisation.
//!
//! The build orchestrator's config (`turbo.json`) lists the variables passed
//! through to tasks under `globalEnv`. That list is never patched
//! incrementally: it is regenerated, sorted, from the env schema on every
//! sync, so any drift converges in one run. The added/removed sets exist
//! for reporting only.
//!
//! # Examples
//!
//! ```
//! use dbswitch_patch::sync_global_env;
//!
//! let turbo = "{\n  \"globalEnv\": [\"OLD\", \"AUTH_SECRET\"],\n  \"tasks\": {}\n}\n";
//! let (patched, result) = sync_global_env(turbo, &["DATABASE_URL", "AUTH_SECRET"]).unwrap();
//! assert!(patched.contains("\"AUTH_SECRET\",\n    \"DATABASE_URL\""));
//! assert_eq!(result.added.iter().collect::<Vec<_>>(), vec!["DATABASE_URL"]);
//! assert_eq!(result.removed.iter().collect::<Vec<_>>(), vec!["OLD"]);
//! ```

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::json::{parse_object, render_object};

/// Key holding the pass-through variable list.
pub const GLOBAL_ENV_KEY: &str = "globalEnv";

/// Names that entered or left the manifest during a sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
}

impl SyncResult {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Current `globalEnv` entries, in file order.
pub fn read_global_env(source: &str) -> Result<Vec<String>> {
    let map = parse_object(source, "global env manifest")?;
    Ok(string_list(map.get(GLOBAL_ENV_KEY)))
}

/// Replaces `globalEnv` with `names`, sorted and deduplicated.
///
/// Returns the source unchanged when the list already matches exactly.
///
/// # Errors
///
/// Returns [`PatchError::Json`](crate::PatchError::Json) for invalid JSON
/// and [`PatchError::NoMatch`](crate::PatchError::NoMatch) when the root is
/// not an object.
pub fn sync_global_env<S: AsRef<str>>(source: &str, names: &[S]) -> Result<(String, SyncResult)> {
    let mut map = parse_object(source, "global env manifest")?;
    let current = string_list(map.get(GLOBAL_ENV_KEY));
    let desired: BTreeSet<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
    let existing: BTreeSet<String> = current.iter().cloned().collect();

    let result = SyncResult {
        added: desired.difference(&existing).cloned().collect(),
        removed: existing.difference(&desired).cloned().collect(),
    };

    let sorted: Vec<String> = desired.into_iter().collect();
    if map.contains_key(GLOBAL_ENV_KEY) && current == sorted {
        return Ok((source.to_string(), result));
    }

    debug!(
        added = result.added.len(),
        removed = result.removed.len(),
        "regenerating globalEnv"
    );
    map.insert(
        GLOBAL_ENV_KEY.to_string(),
        Value::Array(sorted.into_iter().map(Value::String).collect()),
    );
    Ok((render_object(map, source)?, result))
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TURBO: &str = r#"{
  "$schema": "https://turbo.build/schema.json",
  "globalEnv": [
    "AUTH_SECRET",
    "DATABASE_URL"
  ],
  "tasks": {
    "build": {
      "dependsOn": [
        "^build"
      ]
    }
  }
}
"#;

    #[test]
    fn test_sync_is_noop_when_already_in_sync() {
        let (patched, result) = sync_global_env(TURBO, &["DATABASE_URL", "AUTH_SECRET"]).unwrap();
        assert_eq!(patched, TURBO);
        assert!(result.is_empty());
    }

    #[test]
    fn test_sync_rewrites_unsorted_list_without_changes_reported() {
        let unsorted = TURBO.replace(
            "\"AUTH_SECRET\",\n    \"DATABASE_URL\"",
            "\"DATABASE_URL\",\n    \"AUTH_SECRET\"",
        );
        let (patched, result) = sync_global_env(&unsorted, &["AUTH_SECRET", "DATABASE_URL"]).unwrap();
        assert_eq!(patched, TURBO);
        assert!(result.is_empty());
    }

    #[test]
    fn test_sync_keeps_key_order_and_other_fields() {
        let (patched, result) =
            sync_global_env(TURBO, &["AUTH_SECRET", "DIRECT_URL", "DATABASE_URL"]).unwrap();
        assert!(result.removed.is_empty());
        assert!(result.added.contains("DIRECT_URL"));
        let schema_at = patched.find("$schema").unwrap();
        let env_at = patched.find("globalEnv").unwrap();
        let tasks_at = patched.find("tasks").unwrap();
        assert!(schema_at < env_at && env_at < tasks_at);
        assert!(patched.contains("\"^build\""));
        assert!(patched.ends_with("}\n"));
    }

    #[test]
    fn test_sync_creates_missing_key() {
        let (patched, result) = sync_global_env("{\"tasks\":{}}", &["B", "A"]).unwrap();
        assert_eq!(read_global_env(&patched).unwrap(), vec!["A", "B"]);
        assert_eq!(result.added.len(), 2);
    }

    #[test]
    fn test_sync_rejects_non_object_root() {
        assert!(sync_global_env("[]", &["A"]).is_err());
        assert!(sync_global_env("{", &["A"]).is_err());
    }
}
