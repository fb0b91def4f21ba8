//! Locator strategy interpreters
//!
//! Each module evaluates one [`LocatorStrategy`] variant against a document
//! snapshot. Interpreters only read the document.

mod label_scan;
mod pattern;
mod presence;
mod structural;
mod whole_text;

pub use label_scan::*;
pub use pattern::*;
pub use presence::*;
pub use structural::*;
pub use whole_text::*;

use crate::document::Document;
use crate::spec::LocatorStrategy;

/// Evaluate one strategy. Succeeds only with a value that is non-empty
/// after trimming.
pub fn evaluate(document: &Document, strategy: &LocatorStrategy) -> Option<String> {
    let raw = match strategy {
        LocatorStrategy::ByStructuralPath {
            selector,
            contains,
            accessor,
        } => extract_structural(document, selector, contains.as_deref(), accessor),
        LocatorStrategy::ByLabelScan { label } => scan_label(document, label),
        LocatorStrategy::ByWholeTextFallback { labels, scope } => {
            scan_lines(document, labels, scope.as_deref())
        }
        LocatorStrategy::ByPattern { pattern, scope } => {
            match_pattern(document, pattern, scope.as_deref())
        }
        LocatorStrategy::ByPresence {
            require,
            exclude,
            scope,
            yes,
            no,
        } => phrase_flag(document, require, exclude, scope.as_deref())
            .map(|present| if present { yes.clone() } else { no.clone() }),
    };

    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
