//! Marker-delimited README section replacement.

/// Opening marker of the generated database section.
pub const README_START: &str = "<!-- db-provider:start -->";
/// Closing marker of the generated database section.
pub const README_END: &str = "<!-- db-provider:end -->";

/// Replaces the text between `start` and `end` with `body`.
///
/// Returns the source unchanged when either marker is missing or they are
/// out of order.
///
/// # Examples
///
/// ```
/// use dbswitch_patch::replace_section;
///
/// let readme = "# App\n<!-- s -->\nold\n<!-- e -->\nfooter\n";
/// let patched = replace_section(readme, "<!-- s -->", "<!-- e -->", "new text");
/// assert_eq!(patched, "# App\n<!-- s -->\nnew text\n<!-- e -->\nfooter\n");
/// assert_eq!(replace_section("no markers", "<!-- s -->", "<!-- e -->", "x"), "no markers");
/// ```
pub fn replace_section(source: &str, start: &str, end: &str, body: &str) -> String {
    let Some(start_at) = source.find(start) else {
        return source.to_string();
    };
    let content_from = start_at + start.len();
    let Some(end_offset) = source[content_from..].find(end) else {
        return source.to_string();
    };
    let content_to = content_from + end_offset;

    let mut out = String::with_capacity(source.len() + body.len());
    out.push_str(&source[..content_from]);
    out.push('\n');
    let body = body.trim_matches('\n');
    if !body.is_empty() {
        out.push_str(body);
        out.push('\n');
    }
    out.push_str(&source[content_to..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_is_stable() {
        let readme = format!("intro\n{README_START}\nbody\n{README_END}\n");
        let once = replace_section(&readme, README_START, README_END, "body");
        assert_eq!(once, readme);
    }

    #[test]
    fn test_reversed_markers_are_ignored() {
        let readme = format!("{README_END}\n{README_START}\n");
        assert_eq!(
            replace_section(&readme, README_START, README_END, "x"),
            readme
        );
    }
}
