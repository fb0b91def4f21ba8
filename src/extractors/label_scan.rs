//! Free-text label scanning over visible text nodes

use scraper::ElementRef;

use crate::document::{collapse_whitespace, render_element, Document, BLOCK_TAGS};
use crate::extractors::structural::{starts_with_label, strip_label};

/// Find the first visible text node containing `label` and return the rest
/// of its line.
///
/// When the label is alone in its node (`<b>NPI:</b> 123`), the line is
/// read from the nearest enclosing block element instead.
pub fn scan_label(document: &Document, label: &str) -> Option<String> {
    for node in document.text_nodes() {
        let Some(pos) = node.text.find(label) else {
            continue;
        };

        let rest = collapse_whitespace(&node.text[pos + label.len()..]);
        if starts_with_label(&rest) {
            continue;
        }
        if !rest.is_empty() {
            return Some(rest);
        }

        let block = enclosing_block(node.parent);
        if let Some(value) = strip_label(&render_element(block), label) {
            return Some(value);
        }
    }
    None
}

fn enclosing_block(element: ElementRef<'_>) -> ElementRef<'_> {
    if BLOCK_TAGS.contains(&element.value().name()) {
        return element;
    }
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| BLOCK_TAGS.contains(&a.value().name()))
        .unwrap_or(element)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_in_same_node() {
        let doc = Document::parse("<p>Medicare Number: 123456789A</p>");
        assert_eq!(
            scan_label(&doc, "Medicare Number:"),
            Some("123456789A".to_string())
        );
    }

    #[test]
    fn test_label_in_own_node() {
        let doc = Document::parse(
            r#"<div class="col-4"><span><strong>PTAN:</strong></span> AB1234<br><strong>NPI:</strong> 1234567893</div>"#,
        );
        assert_eq!(scan_label(&doc, "PTAN:"), Some("AB1234".to_string()));
        assert_eq!(scan_label(&doc, "NPI:"), Some("1234567893".to_string()));
    }

    #[test]
    fn test_first_occurrence_wins() {
        let doc = Document::parse(
            r#"<div id="a"><p>Effective Date: 01/01/2010</p></div><div id="b"><p>Effective Date: 02/02/2020</p></div>"#,
        );
        assert_eq!(
            scan_label(&doc, "Effective Date:"),
            Some("01/01/2010".to_string())
        );
    }

    #[test]
    fn test_empty_value_keeps_scanning() {
        let doc = Document::parse(
            r#"<p><b>Date of Death:</b></p><p>Date of Death: 05/06/2023</p>"#,
        );
        assert_eq!(
            scan_label(&doc, "Date of Death:"),
            Some("05/06/2023".to_string())
        );
    }

    #[test]
    fn test_next_label_is_not_a_value() {
        let doc = Document::parse(
            r#"<div><strong>Date of Death:</strong> <strong>Medicare Number:</strong> 1EG4TE5MK73</div>"#,
        );
        assert_eq!(scan_label(&doc, "Date of Death:"), None);
        assert_eq!(scan_label(&doc, "Medicare Number:"), Some("1EG4TE5MK73".to_string()));

        let doc = Document::parse("<p>Date of Death: Medicare Number: 1EG4TE5MK73</p>");
        assert_eq!(scan_label(&doc, "Date of Death:"), None);
    }

    #[test]
    fn test_missing_label() {
        let doc = Document::parse("<p>Beneficiary: JANE DOE</p>");
        assert_eq!(scan_label(&doc, "NPI:"), None);
    }
}
