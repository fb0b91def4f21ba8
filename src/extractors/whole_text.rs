//! Line-by-line fallback over the rendered page text

use crate::document::Document;
use crate::extractors::structural::strip_label;

/// Scan rendered lines (optionally inside `scope`) for any of `labels`.
/// The first line holding a label with a non-empty remainder wins; labels
/// are tried in order on each line.
pub fn scan_lines(document: &Document, labels: &[String], scope: Option<&str>) -> Option<String> {
    let text = document.rendered_text_within(scope)?;

    text.lines().find_map(|line| {
        labels
            .iter()
            .filter(|l| !l.is_empty())
            .find_map(|label| strip_label(line, label))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_alternate_labels() {
        let doc = Document::parse(
            r#"<table><tr><td>Gender: F</td></tr><tr><td>Date of Birth: 03/04/1941</td></tr></table>"#,
        );
        assert_eq!(
            scan_lines(&doc, &labels(&["Sex:", "Gender:"]), None),
            Some("F".to_string())
        );
        assert_eq!(
            scan_lines(&doc, &labels(&["DOB:", "Date of Birth:"]), None),
            Some("03/04/1941".to_string())
        );
    }

    #[test]
    fn test_scope_limits_search() {
        let doc = Document::parse(
            r#"
            <div id="hmo"><p>Effective Date: 01/01/2019</p></div>
            <div id="msp"><p>MSP Type: Working Aged</p><p>Effective Date: 07/01/2021</p></div>
            "#,
        );
        let effective = labels(&["Effective Date:"]);
        assert_eq!(
            scan_lines(&doc, &effective, Some("#msp")),
            Some("07/01/2021".to_string())
        );
        assert_eq!(
            scan_lines(&doc, &effective, None),
            Some("01/01/2019".to_string())
        );
        assert_eq!(scan_lines(&doc, &effective, Some("#dsmt")), None);
    }

    #[test]
    fn test_label_followed_by_label() {
        let doc = Document::parse("<p>Date of Death: Medicare Number: 1EG4TE5MK73</p><p>Date of Death: 05/06/2023</p>");
        assert_eq!(
            scan_lines(&doc, &labels(&["Date of Death:"]), None),
            Some("05/06/2023".to_string())
        );
    }

    #[test]
    fn test_empty_labels_never_match() {
        let doc = Document::parse("<p>anything</p>");
        assert_eq!(scan_lines(&doc, &labels(&[""]), None), None);
    }
}
