//! Phrase presence flags

use crate::document::Document;

/// Whether every `require` phrase and none of the `exclude` phrases occur
/// in the rendered text (or `scope`). `None` when the scope is absent.
pub fn phrase_flag(
    document: &Document,
    require: &[String],
    exclude: &[String],
    scope: Option<&str>,
) -> Option<bool> {
    let text = document.rendered_text_within(scope)?;
    let present = require.iter().all(|p| text.contains(p.as_str()))
        && !exclude.iter().any(|p| text.contains(p.as_str()));
    Some(present)
}
