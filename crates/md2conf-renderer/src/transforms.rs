//! HTML to Confluence storage-format transforms.
//!
//! Each transform takes an HTML string and returns a new one. They are
//! pure, idempotent, and no-op when their pattern is absent, so the
//! orchestrator can chain them unconditionally. Matching is regex-based
//! over the serialized HTML; the shapes matched are exactly what the
//! renderer produces, not arbitrary nested markup.

use std::fmt::Write;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::entities::{escape_entities, unescape_entities};

/// Language label used when a code block carries no `language-*` class.
const DEFAULT_CODE_LANGUAGE: &str = "java";

/// Admonition type used when the div carries an unrecognized or missing type.
const DEFAULT_ADMONITION_TYPE: &str = "note";

/// Matches a rendered fenced code block, non-greedy across lines.
static CODE_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<pre><code(.*?)>(.*?)</code></pre>").expect("invalid code block regex")
});

/// Extracts the language tag from the `<code>` attributes.
static CODE_LANGUAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"class="language-([^"]*)""#).expect("invalid language regex"));

/// Admonition types Confluence renders natively.
const KNOWN_ADMONITION_TYPES: [&str; 4] = ["info", "danger", "important", "note"];

/// Matches a rendered admonition div with optional title paragraph.
static ADMONITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<div class="admonition(?: ([^\s"]+))?"(?:.*?)>\n(?:<p class="admonition-title">(.*?)</p>\n)?<p>(.*?)</p>\n</div>"#,
    )
    .expect("invalid admonition regex")
});

/// Rewrite `<pre><code>` blocks into Confluence code macros.
///
/// The code body is entity-unescaped before embedding because the code
/// macro renders its CDATA body literally. The language comes from a
/// `language-<lang>` class on the `<code>` tag, falling back to
/// [`DEFAULT_CODE_LANGUAGE`].
#[must_use]
pub fn convert_code_blocks(html: &str) -> String {
    if !CODE_BLOCK_RE.is_match(html) {
        debug!("No code blocks found in rendered HTML");
        return html.to_owned();
    }

    CODE_BLOCK_RE
        .replace_all(html, |caps: &Captures| {
            let language = CODE_LANGUAGE_RE
                .captures(&caps[1])
                .map_or(DEFAULT_CODE_LANGUAGE.to_owned(), |lang| lang[1].to_owned());
            let code = unescape_entities(caps[2].trim());

            code_macro(&language, &code)
        })
        .into_owned()
}

/// Build the code structured macro.
fn code_macro(language: &str, code: &str) -> String {
    let mut macro_xml = String::new();
    let _ = writeln!(
        macro_xml,
        r#"<ac:structured-macro ac:name="code" ac:schema-version="1">"#
    );
    let _ = writeln!(
        macro_xml,
        r#"  <ac:parameter ac:name="language">{}</ac:parameter>"#,
        escape_entities(language)
    );
    let _ = writeln!(
        macro_xml,
        r#"  <ac:parameter ac:name="theme">Midnight</ac:parameter>"#
    );
    let _ = writeln!(
        macro_xml,
        r#"  <ac:parameter ac:name="linenumbers">true</ac:parameter>"#
    );
    let _ = writeln!(
        macro_xml,
        "  <ac:plain-text-body><![CDATA[{code}]]></ac:plain-text-body>"
    );
    macro_xml.push_str("</ac:structured-macro>");
    macro_xml
}

/// Rewrite admonition divs into Confluence structured macros.
///
/// Recognized types are info, danger, important and note. Anything else
/// falls back to [`DEFAULT_ADMONITION_TYPE`] so Confluence never sees an
/// empty macro name.
#[must_use]
pub fn convert_admonition_blocks(html: &str) -> String {
    if !ADMONITION_RE.is_match(html) {
        debug!("No admonition blocks found in rendered HTML");
        return html.to_owned();
    }

    ADMONITION_RE
        .replace_all(html, |caps: &Captures| {
            let kind = caps
                .get(1)
                .map(|m| m.as_str())
                .filter(|kind| KNOWN_ADMONITION_TYPES.contains(kind))
                .unwrap_or(DEFAULT_ADMONITION_TYPE);
            let title = caps.get(2).map_or("", |m| m.as_str());
            let body = &caps[3];

            format!(
                "<ac:structured-macro ac:name=\"{kind}\" ac:schema-version=\"1\">\n\
                 <ac:parameter ac:name=\"title\">{title}</ac:parameter>\n\
                 <ac:rich-text-body>\n\
                 <p>{body}</p>\n\
                 </ac:rich-text-body>\n\
                 </ac:structured-macro>"
            )
        })
        .into_owned()
}

/// Wrap the whole page body in a two-column layout with a TOC sidebar.
///
/// Left cell carries the content, right cell a "Table of Contents"
/// heading plus the toc macro. Headings literally named "Authors",
/// "Table of Contents" or "This is Important!" are excluded so the
/// banner and the TOC itself never index themselves.
#[must_use]
pub fn wrap_with_toc(html: &str) -> String {
    let toc_cell = r#"<h1>Table of Contents</h1>
<p>
<ac:structured-macro ac:name="toc">
  <ac:parameter ac:name="printable">true</ac:parameter>
  <ac:parameter ac:name="style">disc</ac:parameter>
  <ac:parameter ac:name="maxLevel">7</ac:parameter>
  <ac:parameter ac:name="minLevel">1</ac:parameter>
  <ac:parameter ac:name="type">list</ac:parameter>
  <ac:parameter ac:name="outline">clear</ac:parameter>
  <ac:parameter ac:name="include">.*</ac:parameter>
  <ac:parameter ac:name="exclude">^(Authors|Table of Contents|This is Important!)$</ac:parameter>
</ac:structured-macro>
</p>"#;

    format!(
        "<ac:layout>\n\
         <ac:layout-section ac:type=\"two_right_sidebar\">\n\
         <ac:layout-cell>\n\
         {html}\n\
         </ac:layout-cell>\n\
         <ac:layout-cell>\n\
         {toc_cell}\n\
         </ac:layout-cell>\n\
         </ac:layout-section>\n\
         </ac:layout>\n"
    )
}

/// Build the auto-update notice banner macro.
///
/// Warns readers that the page is generated and manual edits will be
/// overwritten. Optional job and repository URLs are appended as links
/// inside the rich-text body.
#[must_use]
pub fn notice_banner(job_url: Option<&str>, repo_url: Option<&str>) -> String {
    let mut links = String::new();
    if let Some(url) = job_url {
        let url = escape_entities(url);
        let _ = writeln!(links, "<p><strong>Jenkins job:</strong> <a href='{url}'>{url}</a></p>");
    }
    if let Some(url) = repo_url {
        let url = escape_entities(url);
        let _ = writeln!(links, "<p><strong>Repository:</strong> <a href='{url}'>{url}</a></p>");
    }

    format!(
        "<ac:structured-macro ac:name=\"warning\" ac:schema-version=\"1\">\n\
         <ac:parameter ac:name=\"title\">This is Important!</ac:parameter>\n\
         <ac:rich-text-body>\n\
         <p>This page has been created automatically via Markdown Publisher. \
         If this script is a part of any automation, any manual change will be removed on next run.</p>\n\
         {links}\
         </ac:rich-text-body>\n\
         </ac:structured-macro>\n"
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_code_block_unescapes_and_tags_language() {
        let html = "<pre><code class=\"language-python\">print(&quot;&lt;x&gt;&quot;)\n</code></pre>";
        let converted = convert_code_blocks(html);

        assert!(converted.contains(r#"<ac:parameter ac:name="language">python</ac:parameter>"#));
        assert!(converted.contains(r#"<![CDATA[print("<x>")]]>"#));
        assert!(!converted.contains("<pre>"));
    }

    #[test]
    fn test_code_block_default_language() {
        let html = "<pre><code>plain text\n</code></pre>";
        let converted = convert_code_blocks(html);

        assert!(converted.contains(r#"<ac:parameter ac:name="language">java</ac:parameter>"#));
        assert!(converted.contains(r#"<ac:parameter ac:name="theme">Midnight</ac:parameter>"#));
        assert!(converted.contains(r#"<ac:parameter ac:name="linenumbers">true</ac:parameter>"#));
    }

    #[test]
    fn test_code_block_transform_is_idempotent() {
        let html = "<pre><code class=\"language-rust\">fn main() {}\n</code></pre>";
        let once = convert_code_blocks(html);
        let twice = convert_code_blocks(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_multiple_code_blocks_converted() {
        let html = "<pre><code>a</code></pre>\n<p>between</p>\n<pre><code>b</code></pre>";
        let converted = convert_code_blocks(html);

        assert_eq!(converted.matches("ac:name=\"code\"").count(), 2);
        assert!(converted.contains("<p>between</p>"));
    }

    #[test]
    fn test_admonition_block_converted() {
        let html = "<div class=\"admonition note\">\n<p class=\"admonition-title\">Heads up</p>\n<p>Body text.</p>\n</div>";
        let converted = convert_admonition_blocks(html);

        assert!(converted.contains(r#"<ac:structured-macro ac:name="note" ac:schema-version="1">"#));
        assert!(converted.contains(r#"<ac:parameter ac:name="title">Heads up</ac:parameter>"#));
        assert!(converted.contains("<ac:rich-text-body>\n<p>Body text.</p>\n</ac:rich-text-body>"));
    }

    #[test]
    fn test_admonition_without_title() {
        let html = "<div class=\"admonition danger\">\n<p>Watch out.</p>\n</div>";
        let converted = convert_admonition_blocks(html);

        assert!(converted.contains(r#"ac:name="danger""#));
        assert!(converted.contains(r#"<ac:parameter ac:name="title"></ac:parameter>"#));
    }

    #[test]
    fn test_admonition_missing_type_defaults_to_note() {
        let html = "<div class=\"admonition\">\n<p>Generic body.</p>\n</div>";
        let converted = convert_admonition_blocks(html);

        assert!(converted.contains(r#"ac:name="note""#));
        assert!(converted.contains("<p>Generic body.</p>"));
    }

    #[test]
    fn test_admonition_unrecognized_type_defaults_to_note() {
        let html = "<div class=\"admonition warning\">\n<p class=\"admonition-title\">Careful</p>\n<p>Mind the gap.</p>\n</div>";
        let converted = convert_admonition_blocks(html);

        // An unknown type still becomes a structured macro, not a raw div.
        assert!(!converted.contains("<div class=\"admonition"));
        assert!(converted.contains(r#"<ac:structured-macro ac:name="note" ac:schema-version="1">"#));
        assert!(converted.contains(r#"<ac:parameter ac:name="title">Careful</ac:parameter>"#));
        assert!(converted.contains("<p>Mind the gap.</p>"));
    }

    #[test]
    fn test_transforms_noop_on_plain_html() {
        let html = "<p>nothing to see</p>";
        assert_eq!(convert_code_blocks(html), html);
        assert_eq!(convert_admonition_blocks(html), html);
    }

    #[test]
    fn test_toc_wraps_content_in_layout() {
        let wrapped = wrap_with_toc("<p>content</p>");

        assert!(wrapped.starts_with("<ac:layout>"));
        assert!(wrapped.contains(r#"<ac:layout-section ac:type="two_right_sidebar">"#));
        assert!(wrapped.contains("<p>content</p>"));
        assert!(wrapped.contains("<h1>Table of Contents</h1>"));
        assert!(wrapped.contains(
            "<ac:parameter ac:name=\"exclude\">^(Authors|Table of Contents|This is Important!)$</ac:parameter>"
        ));
    }

    #[test]
    fn test_notice_banner_includes_links() {
        let banner = notice_banner(Some("https://ci.example.com/job/1"), Some("https://git.example.com/repo"));

        assert!(banner.contains(r#"ac:name="warning""#));
        assert!(banner.contains("This is Important!"));
        assert!(banner.contains("<a href='https://ci.example.com/job/1'>"));
        assert!(banner.contains("<a href='https://git.example.com/repo'>"));
    }

    #[test]
    fn test_notice_banner_without_links() {
        let banner = notice_banner(None, None);
        assert!(!banner.contains("<a href"));
        assert!(banner.contains("created automatically"));
    }
}
