//! HTML entity unescaping.
//!
//! The markdown renderer escapes code block bodies (`<` becomes `&lt;`
//! and so on). Confluence's code macro renders its CDATA body as-is, so
//! the escaping has to be reversed before the body is embedded.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Matches named (`&lt;`) and numeric (`&#39;`, `&#x27;`) entity references.
static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#x?[0-9a-fA-F]+|[a-zA-Z]+);").expect("invalid entity regex"));

/// Replace HTML entity references with their literal characters.
///
/// Handles the standard XML entities plus decimal and hexadecimal
/// character references. Unknown named entities are left untouched.
/// Runs in a single pass, so double-escaped input is unescaped once.
pub(crate) fn unescape_entities(html: &str) -> String {
    ENTITY_RE
        .replace_all(html, |caps: &Captures| {
            let name = &caps[1];
            match name {
                "amp" => "&".to_owned(),
                "lt" => "<".to_owned(),
                "gt" => ">".to_owned(),
                "quot" => "\"".to_owned(),
                "apos" => "'".to_owned(),
                _ => numeric_reference(name).unwrap_or_else(|| caps[0].to_owned()),
            }
        })
        .into_owned()
}

/// Decode a `#NNN` or `#xHH` character reference, if valid.
fn numeric_reference(name: &str) -> Option<String> {
    let digits = name.strip_prefix('#')?;
    let code = match digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code).map(String::from)
}

/// Escape the characters that are unsafe inside XHTML text and attributes.
pub(crate) fn escape_entities(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
