//! Auth-adapter bootstrap patcher.

use std::sync::LazyLock;

use dbswitch_core::DataModelProvider;
use regex::Regex;

use crate::error::{PatchError, Result};

static ADAPTER_PROVIDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(prismaAdapter\s*\([^)]*?provider\s*:\s*)(["'])[^"']*(["'])"#)
        .expect("static regex must compile")
});

/// Rewrites the `provider` literal passed to `prismaAdapter(...)`.
///
/// Only the literal changes; its quote style and everything around it is
/// kept.
///
/// # Errors
///
/// [`PatchError::NoMatch`] when no adapter call with a provider literal is
/// found.
///
/// # Examples
///
/// ```
/// use dbswitch_core::DataModelProvider;
/// use dbswitch_patch::update_adapter_provider;
///
/// let auth = "database: prismaAdapter(db, { provider: 'sqlite' }),\n";
/// let patched = update_adapter_provider(auth, DataModelProvider::Postgresql).unwrap();
/// assert_eq!(patched, "database: prismaAdapter(db, { provider: 'postgresql' }),\n");
/// ```
pub fn update_adapter_provider(source: &str, provider: DataModelProvider) -> Result<String> {
    if !ADAPTER_PROVIDER.is_match(source) {
        return Err(PatchError::NoMatch {
            target: "auth adapter",
            detail: "no prismaAdapter(...) call with a provider literal".to_string(),
        });
    }
    let replacement = format!("${{1}}${{2}}{}${{3}}", provider.as_str());
    Ok(ADAPTER_PROVIDER
        .replace(source, replacement.as_str())
        .into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiline_call_is_patched_in_place() {
        let source = "export const auth = betterAuth({\n  database: prismaAdapter(db, {\n    provider: \"postgresql\",\n  }),\n});\n";
        let patched = update_adapter_provider(source, DataModelProvider::Sqlite).unwrap();
        assert_eq!(patched, source.replace("\"postgresql\"", "\"sqlite\""));
    }

    #[test]
    fn test_missing_adapter_is_an_error() {
        let err = update_adapter_provider("export {}\n", DataModelProvider::Sqlite).unwrap_err();
        assert!(err.to_string().contains("auth adapter"));
    }
}
