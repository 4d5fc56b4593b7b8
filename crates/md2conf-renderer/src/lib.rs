//! Markdown rendering and Confluence storage-format transforms.
//!
//! Converts markdown text to HTML with pulldown-cmark and rewrites the
//! HTML shapes Confluence cannot display natively (fenced code blocks,
//! admonition boxes) into structured macros. All transforms are pure
//! string functions with no I/O.

mod admonition;
mod entities;
mod renderer;
mod transforms;

pub use admonition::AdmonitionPreprocessor;
pub use renderer::{RenderResult, drop_first_line, extract_title, render_markdown};
pub use transforms::{convert_admonition_blocks, convert_code_blocks, notice_banner, wrap_with_toc};
