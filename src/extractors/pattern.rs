//! Regex extraction over the rendered page text

use regex::Regex;

use crate::document::Document;

/// First capture group of `pattern` in the rendered text (or `scope`).
/// An invalid pattern never matches; tables are validated on load.
pub fn match_pattern(document: &Document, pattern: &str, scope: Option<&str>) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    let text = document.rendered_text_within(scope)?;
    let captures = re.captures(&text)?;
    captures.get(1).map(|m| m.as_str().trim().to_string())
}
