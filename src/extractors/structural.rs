//! CSS selector-based extraction
//!
//! Uses the scraper crate to select elements by CSS selectors and reads
//! them through an [`Accessor`].

use scraper::{ElementRef, Node, Selector};

use crate::document::{collapse_whitespace, render_element, Document};
use crate::spec::Accessor;

/// Extract a value by structural path.
///
/// With `contains`, only elements whose rendered text contains the needle
/// are considered, and the innermost such elements win: a page wrapping
/// every row in nested `div`s still yields the row, not the whole column.
pub fn extract_structural(
    document: &Document,
    selector_str: &str,
    contains: Option<&str>,
    accessor: &Accessor,
) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    let matches: Vec<ElementRef<'_>> = document
        .html()
        .select(&selector)
        .filter(|el| contains.map_or(true, |needle| render_element(*el).contains(needle)))
        .collect();

    let innermost = matches.iter().filter(|el| {
        contains.is_none()
            || !matches
                .iter()
                .any(|other| other.id() != el.id() && other.ancestors().any(|a| a.id() == el.id()))
    });

    for element in innermost {
        if let Some(value) = read(*element, accessor) {
            if !value.trim().is_empty() {
                return Some(value);
            }
        }
    }
    None
}

/// Read a value from an element through an accessor
pub fn read(element: ElementRef<'_>, accessor: &Accessor) -> Option<String> {
    match accessor {
        Accessor::Text => Some(render_element(element)),
        Accessor::Html => Some(element.html()),
        Accessor::Attr(name) => element.value().attr(name).map(String::from),
        Accessor::FollowingText => following_text(element),
        Accessor::Strip(label) => strip_label(&render_element(element), label),
        Accessor::Parent(inner) => {
            let parent = ElementRef::wrap(element.parent()?)?;
            read(parent, inner)
        }
        Accessor::Child(index, inner) => {
            // Only element nodes count, text nodes are skipped
            let child = element.children().filter_map(ElementRef::wrap).nth(*index)?;
            read(child, inner)
        }
    }
}

/// Text after an element: trailing sibling text nodes up to the next
/// element, or that next sibling element's text when there are none
/// (`<dt>NPI:</dt><dd>123</dd>`). A following label is not a value.
fn following_text(element: ElementRef<'_>) -> Option<String> {
    let mut text = String::new();
    for sibling in element.next_siblings() {
        match sibling.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(_) => {
                if text.trim().is_empty() {
                    let next = render_element(ElementRef::wrap(sibling)?);
                    return (!starts_with_label(&next)).then_some(next);
                }
                break;
            }
            _ => {}
        }
    }
    let text = collapse_whitespace(&text);
    (!starts_with_label(&text)).then_some(text)
}

/// Remainder of the first rendered line containing `label` that holds a
/// value rather than the next label
pub(crate) fn strip_label(rendered: &str, label: &str) -> Option<String> {
    rendered.lines().find_map(|line| {
        let pos = line.find(label)?;
        let rest = line[pos + label.len()..].trim();
        (!rest.is_empty() && !starts_with_label(rest)).then(|| rest.to_string())
    })
}

/// `Medicare Number: ...` or a bare `Medicare Number:`: capitalised words
/// ending in a colon
pub(crate) fn starts_with_label(text: &str) -> bool {
    let Some((head, _)) = text.split_once(':') else {
        return false;
    };
    head.starts_with(|c: char| c.is_uppercase())
        && head.chars().all(|c| c.is_alphabetic() || c == ' ' || c == '/')
}
