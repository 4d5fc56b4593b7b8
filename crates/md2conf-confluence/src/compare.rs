//! Publish decision core.
//!
//! Decides whether freshly rendered content and the live page content
//! are equivalent under Confluence's own canonicalization. Both sides
//! go through the remote storage-format converter, then a line-trim
//! normalization, then macro-ID stripping, and are compared for exact
//! equality. Macro IDs are server-assigned per save and carry no
//! meaning, so they are noise for comparison purposes.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::api::ConfluenceApi;
use crate::error::ConfluenceError;

/// Matches the volatile macro-ID attribute, leading space included.
static MACRO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#" ac:macro-id=".*?""#).expect("invalid macro-id regex"));

/// Debug artifact holding the canonicalized live page content.
const REMOTE_ARTIFACT: &str = "page_confluence.html";

/// Debug artifact holding the canonicalized generated content.
const LOCAL_ARTIFACT: &str = "page_generated.html";

/// Trim leading and trailing whitespace from every line.
///
/// Storage-format XHTML does not treat leading whitespace as
/// significant, so indentation differences between the generation paths
/// are absorbed here. Line order and line content stay significant.
#[must_use]
pub fn strip_leading_whitespace(s: &str) -> String {
    s.lines().map(str::trim).collect::<Vec<_>>().join("\n")
}

/// Remove every `ac:macro-id="..."` attribute.
///
/// Idempotent. A side with no macro IDs is only a diagnostic (a page
/// without macros legitimately has none), so it logs and passes the
/// input through.
#[must_use]
pub fn strip_macro_ids(s: &str) -> String {
    if !MACRO_ID_RE.is_match(s) {
        warn!("No macro IDs found in converted XHTML");
        return s.to_owned();
    }
    MACRO_ID_RE.replace_all(s, "").into_owned()
}

/// Canonicalize one side of the comparison.
fn canonicalize(storage: &str) -> String {
    strip_macro_ids(&strip_leading_whitespace(storage))
}

/// Compare freshly rendered content against a live page.
///
/// Both sides pass through the same remote converter so that any
/// converter-introduced noise (fresh macro IDs, attribute reordering)
/// appears on both sides before stripping. Returns true when the page
/// needs republishing.
///
/// The page must exist; callers check
/// [`exists`](crate::ConfluenceApi::exists) first.
///
/// With `debug_artifacts` both canonicalized sides are written to local
/// files for manual diffing. Those writes are best-effort and never
/// affect the result.
pub fn content_changed(
    api: &dyn ConfluenceApi,
    post_id: &str,
    content: &str,
    debug_artifacts: bool,
) -> Result<bool, ConfluenceError> {
    if post_id.is_empty() {
        return Err(ConfluenceError::MissingArgument("post_id"));
    }
    if content.is_empty() {
        return Err(ConfluenceError::MissingArgument("content"));
    }

    let local = canonicalize(&api.convert_to_storage(content)?);

    let live = api.get_page_contents(post_id)?;
    let remote = if live.is_empty() {
        warn!("Live page {post_id} has no storage body");
        live
    } else {
        canonicalize(&api.convert_to_storage(&live)?)
    };

    if debug_artifacts {
        write_artifact(REMOTE_ARTIFACT, &remote);
        write_artifact(LOCAL_ARTIFACT, &local);
    }

    let changed = local != remote;
    if changed {
        info!("Content differs from live page {post_id}");
    } else {
        debug!("Content matches live page {post_id}");
    }
    Ok(changed)
}

/// Best-effort write of a comparison side for manual diffing.
fn write_artifact(path: &str, contents: &str) {
    debug!("Writing comparison artifact to '{path}'");
    if let Err(err) = std::fs::write(path, contents) {
        warn!("Failed to write comparison artifact '{path}': {err}");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_strip_leading_whitespace_trims_each_line() {
        assert_eq!(
            strip_leading_whitespace("  <p>a</p>  \n\t<p>b</p>"),
            "<p>a</p>\n<p>b</p>"
        );
    }

    #[test]
    fn test_strip_leading_whitespace_keeps_blank_lines() {
        // Blank lines survive as empty lines; only their content is trimmed.
        assert_eq!(strip_leading_whitespace("a\n   \nb"), "a\n\nb");
    }

    #[test]
    fn test_strip_macro_ids() {
        let input = r#"<ac:structured-macro ac:name="code" ac:macro-id="bb96c594-fad4-4efd-86c4-5754db6ff55d">"#;
        assert_eq!(
            strip_macro_ids(input),
            r#"<ac:structured-macro ac:name="code">"#
        );
    }

    #[test]
    fn test_strip_macro_ids_is_idempotent() {
        let input = r#"<ac:structured-macro ac:macro-id="a"><ac:structured-macro ac:macro-id="b">"#;
        let once = strip_macro_ids(input);
        let twice = strip_macro_ids(&once);
        assert_eq!(once, twice);
        assert!(!once.contains("macro-id"));
    }

    #[test]
    fn test_strip_macro_ids_noop_without_macros() {
        assert_eq!(strip_macro_ids("<p>plain</p>"), "<p>plain</p>");
    }

    #[test]
    fn test_differing_macro_ids_are_equivalent() {
        let a = r#"<ac:structured-macro ac:name="toc" ac:macro-id="1111">"#;
        let b = r#"<ac:structured-macro ac:name="toc" ac:macro-id="2222">"#;
        assert_eq!(strip_macro_ids(a), strip_macro_ids(b));
    }

    #[test]
    fn test_blank_line_reorder_is_invisible() {
        let a = strip_leading_whitespace("<p>a</p>\n\n<p>b</p>");
        let b = strip_leading_whitespace("<p>a</p>\n \n<p>b</p>");
        assert_eq!(a, b);
    }

    #[test]
    fn test_non_blank_line_reorder_is_a_change() {
        let a = strip_leading_whitespace("<p>a</p>\n<p>b</p>");
        let b = strip_leading_whitespace("<p>b</p>\n<p>a</p>");
        assert_ne!(a, b);
    }
}
