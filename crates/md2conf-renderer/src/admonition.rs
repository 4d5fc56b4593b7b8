//! Admonition preprocessor.
//!
//! Converts `!!! type "Title"` blocks with indented bodies into
//! `<div class="admonition ...">` HTML blocks that pass through the
//! markdown parser unchanged. The downstream storage-format transform
//! rewrites those divs into Confluence structured macros.
//!
//! Syntax:
//!
//! ```text
//! !!! note "Heads up"
//!     Body text.
//! ```
//!
//! Without an explicit title the capitalized type is used; an empty
//! title (`!!! note ""`) suppresses the title element.

use std::sync::LazyLock;

use regex::Regex;

use crate::entities::escape_entities;
use crate::renderer::markdown_to_html;

/// Matches an admonition opener: `!!! type` with an optional quoted title.
static ADMONITION_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^!!!\s+([^\s"]+)(?:\s+"(.*)")?\s*$"#).expect("invalid admonition regex")
});

/// Body lines must be indented by four spaces.
const BODY_INDENT: &str = "    ";

/// An admonition block being collected.
struct Block {
    kind: String,
    /// Explicit title from the opener, `None` when omitted.
    title: Option<String>,
    body: Vec<String>,
}

/// Preprocessor that converts admonition directives to HTML divs.
///
/// Works line by line, tracking fenced code blocks so directives inside
/// code samples are left alone.
#[derive(Default)]
pub struct AdmonitionPreprocessor {
    in_fence: bool,
    current: Option<Block>,
}

impl AdmonitionPreprocessor {
    /// Create a new preprocessor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process markdown text and return transformed output.
    #[must_use]
    pub fn process(&mut self, input: &str) -> String {
        let mut output = String::with_capacity(input.len());

        for line in input.lines() {
            self.process_line(line, &mut output);
        }
        if let Some(block) = self.current.take() {
            emit_block(&block, &mut output);
        }

        output
    }

    fn process_line(&mut self, line: &str, output: &mut String) {
        if let Some(block) = &mut self.current {
            if line.trim().is_empty() {
                block.body.push(String::new());
                return;
            }
            if let Some(dedented) = line.strip_prefix(BODY_INDENT) {
                block.body.push(dedented.to_owned());
                return;
            }
        }
        // First unindented non-blank line ends the block.
        if let Some(block) = self.current.take() {
            emit_block(&block, output);
        }

        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            self.in_fence = !self.in_fence;
        }

        if !self.in_fence
            && let Some(caps) = ADMONITION_START_RE.captures(line)
        {
            self.current = Some(Block {
                kind: caps[1].to_owned(),
                title: caps.get(2).map(|m| m.as_str().to_owned()),
                body: Vec::new(),
            });
            return;
        }

        output.push_str(line);
        output.push('\n');
    }
}

/// Render a collected block as an HTML div the storage transform matches.
fn emit_block(block: &Block, output: &mut String) {
    let mut body = block.body.clone();
    while body.last().is_some_and(|line| line.trim().is_empty()) {
        body.pop();
    }
    let body_html = markdown_to_html(&body.join("\n"));

    let title = match &block.title {
        Some(explicit) => explicit.clone(),
        None => capitalize(&block.kind),
    };

    output.push('\n');
    output.push_str(&format!(
        "<div class=\"admonition {}\">\n",
        escape_entities(&block.kind)
    ));
    if !title.is_empty() {
        output.push_str(&format!(
            "<p class=\"admonition-title\">{}</p>\n",
            escape_entities(&title)
        ));
    }
    output.push_str(body_html.trim_end());
    output.push_str("\n</div>\n\n");
}

/// Uppercase the first character, like the default admonition title.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_basic_admonition() {
        let input = "!!! note \"Heads up\"\n    Body text.\n";
        let output = AdmonitionPreprocessor::new().process(input);
        assert_eq!(
            output,
            "\n<div class=\"admonition note\">\n<p class=\"admonition-title\">Heads up</p>\n<p>Body text.</p>\n</div>\n\n"
        );
    }

    #[test]
    fn test_default_title_is_capitalized_type() {
        let output = AdmonitionPreprocessor::new().process("!!! danger\n    Watch out.\n");
        assert!(output.contains("<p class=\"admonition-title\">Danger</p>"));
    }

    #[test]
    fn test_empty_title_suppresses_title_element() {
        let output = AdmonitionPreprocessor::new().process("!!! note \"\"\n    Body.\n");
        assert!(!output.contains("admonition-title"));
        assert!(output.contains("<p>Body.</p>"));
    }

    #[test]
    fn test_unindented_line_ends_block() {
        let output = AdmonitionPreprocessor::new().process(
            "!!! info\n    Inside.\nOutside.\n",
        );
        assert!(output.contains("</div>\n\nOutside.\n"));
    }

    #[test]
    fn test_directive_inside_code_fence_untouched() {
        let input = "```\n!!! note\n```\n";
        let output = AdmonitionPreprocessor::new().process(input);
        assert_eq!(output, input);
    }

    #[test]
    fn test_surrounding_markdown_preserved() {
        let input = "# Title\n\nParagraph.\n";
        let output = AdmonitionPreprocessor::new().process(input);
        assert_eq!(output, input);
    }
}
