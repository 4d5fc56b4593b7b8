//! Markdown to HTML rendering.

use pulldown_cmark::{Options, Parser, html};

use crate::admonition::AdmonitionPreprocessor;

/// Result of rendering a markdown document.
#[derive(Clone, Debug)]
pub struct RenderResult {
    /// Rendered HTML content.
    pub html: String,
    /// Title taken from the first ATX heading of the source, if any.
    pub title: Option<String>,
}

/// Render markdown text to HTML.
///
/// Admonition directives are expanded first, then the text is parsed
/// with tables and fenced code blocks enabled. The first `#` heading is
/// reported as the document title; it stays in the output, callers that
/// consume it as the page title drop it with [`drop_first_line`].
#[must_use]
pub fn render_markdown(text: &str) -> RenderResult {
    let preprocessed = AdmonitionPreprocessor::new().process(text);

    RenderResult {
        html: markdown_to_html(&preprocessed),
        title: extract_title(text),
    }
}

/// Parse markdown and emit HTML with the fixed extension set.
pub(crate) fn markdown_to_html(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    let parser = Parser::new_ext(text, options);

    let mut output = String::with_capacity(text.len() * 2);
    html::push_html(&mut output, parser);
    output
}

/// Extract the title from the first ATX heading (`#`-prefixed line).
#[must_use]
pub fn extract_title(markdown: &str) -> Option<String> {
    markdown
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with('#'))
        .map(|line| line.trim_start_matches('#').trim().to_owned())
}

/// Drop the first line of rendered HTML.
///
/// Used when no explicit title was supplied: the first rendered block is
/// the `<h1>` whose text became the page title, and Confluence already
/// shows the title above the body.
#[must_use]
pub fn drop_first_line(html: &str) -> String {
    match html.split_once('\n') {
        Some((_, rest)) => rest.to_owned(),
        None => String::new(),
    }
}
