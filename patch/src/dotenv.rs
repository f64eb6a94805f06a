//! Consolidated `.env` file updates.
//!
//! Only `KEY=value` lines for the keys being set or removed are touched;
//! comments, ordering and unrelated keys stay byte-for-byte.

use std::collections::{BTreeMap, BTreeSet};

/// Sets `values` and removes `remove` keys in a dotenv source.
///
/// An empty value never overwrites an existing non-empty one, so a
/// skipped prompt cannot wipe a working connection string. Keys not yet
/// present are appended in name order.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use dbswitch_patch::upsert_env;
///
/// let source = "# app\nAUTH_SECRET=\"s3cret\"\nDATABASE_AUTH_TOKEN=\"tok\"\n";
/// let values = BTreeMap::from([("DATABASE_URL".to_string(), "file:./dev.db".to_string())]);
/// let patched = upsert_env(source, &values, &["DATABASE_AUTH_TOKEN"]);
/// assert_eq!(patched, "# app\nAUTH_SECRET=\"s3cret\"\nDATABASE_URL=\"file:./dev.db\"\n");
/// ```
pub fn upsert_env<S: AsRef<str>>(
    source: &str,
    values: &BTreeMap<String, String>,
    remove: &[S],
) -> String {
    let remove: BTreeSet<&str> = remove
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !values.contains_key(*name))
        .collect();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut out = String::with_capacity(source.len());

    for line in source.split_inclusive('\n') {
        let Some((key, current)) = parse_assignment(line) else {
            out.push_str(line);
            continue;
        };
        if remove.contains(key) {
            continue;
        }
        match values.get_key_value(key) {
            Some((name, desired)) => {
                seen.insert(name.as_str());
                if current == *desired || (desired.is_empty() && !current.is_empty()) {
                    out.push_str(line);
                } else {
                    out.push_str(&render(name, desired));
                    if line.ends_with('\n') {
                        out.push('\n');
                    }
                }
            }
            None => out.push_str(line),
        }
    }

    let missing: Vec<(&String, &String)> = values
        .iter()
        .filter(|(name, _)| !seen.contains(name.as_str()))
        .collect();
    if !missing.is_empty() && !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    for (name, value) in missing {
        out.push_str(&render(name, value));
        out.push('\n');
    }
    out
}

/// Reads a key's value from a dotenv source.
pub fn read_env_value(source: &str, key: &str) -> Option<String> {
    source
        .lines()
        .filter_map(parse_assignment)
        .find(|(name, _)| *name == key)
        .map(|(_, value)| value)
}

fn render(name: &str, value: &str) -> String {
    format!("{name}=\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Splits `KEY=value` (optionally `export KEY=value`), unquoting the value.
fn parse_assignment(line: &str) -> Option<(&str, String)> {
    let trimmed = line.trim();
    if trimmed.starts_with('#') {
        return None;
    }
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let value = value.trim();
    let unquoted = if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        value[1..value.len() - 1]
            .replace("\\\"", "\"")
            .replace("\\\\", "\\")
    } else {
        value.to_string()
    };
    Some((key, unquoted))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let source = "A=1\nDATABASE_URL=file:./dev.db\nB=2\n";
        let patched = upsert_env(
            source,
            &values(&[("DATABASE_URL", "postgresql://localhost:5432/app")]),
            &[] as &[&str],
        );
        assert_eq!(
            patched,
            "A=1\nDATABASE_URL=\"postgresql://localhost:5432/app\"\nB=2\n"
        );
    }

    #[test]
    fn test_upsert_keeps_equal_unquoted_value_verbatim() {
        let source = "DATABASE_URL=file:./dev.db\n";
        let patched = upsert_env(source, &values(&[("DATABASE_URL", "file:./dev.db")]), &[] as &[&str]);
        assert_eq!(patched, source);
    }

    #[test]
    fn test_empty_value_does_not_clobber_existing() {
        let source = "DATABASE_AUTH_TOKEN=\"abc\"\n";
        let patched = upsert_env(source, &values(&[("DATABASE_AUTH_TOKEN", "")]), &[] as &[&str]);
        assert_eq!(patched, source);
    }

    #[test]
    fn test_appends_to_file_without_trailing_newline() {
        let patched = upsert_env("A=1", &values(&[("B", "2")]), &[] as &[&str]);
        assert_eq!(patched, "A=1\nB=\"2\"\n");
    }

    #[test]
    fn test_remove_skips_keys_being_set() {
        let patched = upsert_env("DIRECT_URL=x\n", &values(&[("DIRECT_URL", "x")]), &["DIRECT_URL"]);
        assert_eq!(patched, "DIRECT_URL=x\n");
    }

    #[test]
    fn test_read_env_value_handles_export_and_quotes() {
        let source = "# c\nexport TOKEN='a\"b'\nURL=\"x\\\"y\"\n";
        assert_eq!(read_env_value(source, "TOKEN").as_deref(), Some("a\"b"));
        assert_eq!(read_env_value(source, "URL").as_deref(), Some("x\"y"));
        assert_eq!(read_env_value(source, "NOPE"), None);
    }
}
