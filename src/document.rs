//! Read-only document snapshots
//!
//! Wraps a parsed [`scraper::Html`] tree and renders its visible text the
//! way a browser's `innerText` would: block elements break lines, scripts and
//! styles are dropped, runs of whitespace collapse to a single space.

use scraper::{ElementRef, Html, Node, Selector};

use crate::error::{ExtractError, Result};

/// Elements whose content is never rendered
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template", "head", "title"];

/// Elements that start and end a rendered line
pub(crate) const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "label", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tbody", "td",
    "tfoot", "th", "thead", "tr", "ul",
];

/// A point-in-time view of a rendered page
#[derive(Debug)]
pub struct Document {
    html: Html,
    blank: bool,
}

/// A visible text node together with the element that contains it
#[derive(Debug, Clone, Copy)]
pub struct TextNode<'a> {
    pub text: &'a str,
    pub parent: ElementRef<'a>,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
            blank: html.trim().is_empty(),
        }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// A blank snapshot stands for a page that was navigated away or never
    /// loaded; nothing can be extracted from it.
    pub fn ensure_valid(&self) -> Result<()> {
        if self.blank {
            return Err(ExtractError::unavailable("document snapshot is empty"));
        }
        Ok(())
    }

    /// First element matching a CSS selector, in document order
    pub fn select_first(&self, selector: &Selector) -> Option<ElementRef<'_>> {
        self.html.select(selector).next()
    }

    /// Whether any element matches the given selector string.
    /// Unparseable selectors never match.
    pub fn contains(&self, selector: &str) -> bool {
        self.count(selector) > 0
    }

    pub fn count(&self, selector: &str) -> usize {
        match Selector::parse(selector) {
            Ok(sel) => self.html.select(&sel).count(),
            Err(_) => 0,
        }
    }

    /// Rendered text of the whole document, one rendered line per line
    pub fn rendered_text(&self) -> String {
        render_element(self.html.root_element())
    }

    /// Rendered text of the first element matching `scope`, or of the whole
    /// document when no scope is given. `None` if the scope is absent.
    pub fn rendered_text_within(&self, scope: Option<&str>) -> Option<String> {
        match scope {
            None => Some(self.rendered_text()),
            Some(scope) => {
                let sel = Selector::parse(scope).ok()?;
                self.select_first(&sel).map(render_element)
            }
        }
    }

    /// Visible, non-blank text nodes in document order
    pub fn text_nodes(&self) -> Vec<TextNode<'_>> {
        self.html
            .root_element()
            .descendants()
            .filter_map(|node| {
                let text = node.value().as_text()?;
                if text.trim().is_empty() {
                    return None;
                }
                let hidden = node.ancestors().any(|a| {
                    a.value()
                        .as_element()
                        .is_some_and(|el| HIDDEN_TAGS.contains(&el.name()))
                });
                if hidden {
                    return None;
                }
                let parent = node.parent().and_then(ElementRef::wrap)?;
                Some(TextNode {
                    text: &**text,
                    parent,
                })
            })
            .collect()
    }
}

/// Render an element's visible text into normalized lines
pub fn render_element(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    walk(element, &mut raw);
    normalize_lines(&raw)
}

fn walk(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if HIDDEN_TAGS.contains(&name) {
        return;
    }
    if name == "br" {
        out.push('\n');
        return;
    }
    let block = BLOCK_TAGS.contains(&name);
    if block {
        out.push('\n');
    }
    for child in element.children() {
        match child.value() {
            // Source newlines inside a text node are not rendered
            Node::Text(text) => {
                out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }))
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    walk(child_el, out);
                }
            }
            _ => {}
        }
    }
    if block {
        out.push('\n');
    }
}

/// Collapse whitespace within lines and drop blank lines
pub(crate) fn normalize_lines(raw: &str) -> String {
    raw.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
    <html>
    <head><title>Eligibility</title><style>.x { color: red }</style></head>
    <body>
        <div class="col-4">
            <strong>Beneficiary:</strong>   JOHN
               Q DOE
            <br>
            <span>Sex:</span> M
        </div>
        <script>var secret = "Beneficiary: hidden";</script>
        <p>Medicare Number: 1EG4TE5MK73</p>
    </body>
    </html>
    "#;

    #[test]
    fn test_rendered_text_lines() {
        let doc = Document::parse(PAGE);
        let text = doc.rendered_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Beneficiary: JOHN Q DOE",
                "Sex: M",
                "Medicare Number: 1EG4TE5MK73"
            ]
        );
    }

    #[test]
    fn test_text_nodes_skip_hidden() {
        let doc = Document::parse(PAGE);
        let nodes = doc.text_nodes();
        assert!(nodes.iter().all(|n| !n.text.contains("hidden")));
        assert!(nodes.iter().all(|n| !n.text.contains("color")));
        assert_eq!(nodes[0].text.trim(), "Beneficiary:");
        assert_eq!(nodes[0].parent.value().name(), "strong");
    }

    #[test]
    fn test_scoped_text() {
        let doc = Document::parse(
            r#"<div id="hmo"><p>Plan Name: Gold</p></div><div id="msp"><p>MSP Type: 12</p></div>"#,
        );
        assert_eq!(
            doc.rendered_text_within(Some("#msp")),
            Some("MSP Type: 12".to_string())
        );
        assert_eq!(doc.rendered_text_within(Some("#missing")), None);
    }

    #[test]
    fn test_blank_document_is_invalid() {
        assert!(Document::parse("   ").ensure_valid().is_err());
        assert!(Document::parse(PAGE).ensure_valid().is_ok());
    }

    #[test]
    fn test_contains_and_count() {
        let doc = Document::parse(r#"<input type="text" id="a"><input type="text" id="b">"#);
        assert_eq!(doc.count("input[type=text]"), 2);
        assert!(doc.contains("#a"));
        assert!(!doc.contains("#c"));
        assert!(!doc.contains("[[bad"));
    }
}
