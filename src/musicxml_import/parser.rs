//! XML access helpers on top of roxmltree
//!
//! The first pass only needs a small slice of the tree API: child lookup by
//! tag, text content, attributes, and enough position information to point
//! a diagnostic at the offending element.

use crate::diagnostics::SourceLocation;
use crate::musicxml_import::errors::{FirstPassError, Result};
use roxmltree::{Document, Node, ParsingOptions};

/// Parse a MusicXML document
///
/// DOCTYPE declarations are accepted; MusicXML files nearly always carry one.
pub fn parse_document(xml: &str) -> Result<Document<'_>> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(xml, options)
        .map_err(|e| FirstPassError::InvalidXml(format!("XML parse error: {}", e)))
}

/// Get the root score-partwise element
pub fn get_score_partwise<'a, 'input>(doc: &'a Document<'input>) -> Result<Node<'a, 'input>> {
    let root = doc.root_element();

    if root.tag_name().name() != "score-partwise" {
        return Err(FirstPassError::UnsupportedFormat(format!(
            "Expected score-partwise, found {}",
            root.tag_name().name()
        )));
    }

    Ok(root)
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Get first child element with given tag name
pub fn get_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == tag)
}

/// Iterate over the child elements of a node, in document order
pub fn child_elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

/// Text content of a node, empty when absent
pub fn get_text<'a>(node: Node<'a, '_>) -> &'a str {
    node.text().unwrap_or("")
}

/// Text content of first child with given tag
pub fn get_child_text<'a>(node: Node<'a, '_>, tag: &str) -> Option<&'a str> {
    get_child(node, tag).map(get_text)
}

/// Parse an integer the way MusicXML writers emit them
///
/// Some exporters write integral values as "4.0"; the trailing ".0" is
/// accepted, anything else non-integral is rejected.
pub fn parse_int(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    let digits = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    digits.parse().ok()
}

/// Ancestor path of an element, e.g. "score-partwise:part:measure"
pub fn element_path(node: Node) -> String {
    let mut names: Vec<&str> = node
        .ancestors()
        .skip(1)
        .filter(|n| n.is_element())
        .map(|n| n.tag_name().name())
        .collect();
    names.reverse();
    names.join(":")
}

/// Source location of an element for diagnostics
pub fn source_location(node: Node) -> SourceLocation {
    let pos = node.document().text_pos_at(node.range().start);
    SourceLocation {
        path: element_path(node),
        tag: node.tag_name().name().to_string(),
        line: pos.row,
        column: pos.col,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_accepts_trailing_zero_fraction() {
        assert_eq!(parse_int("4"), Some(4));
        assert_eq!(parse_int(" 480 "), Some(480));
        assert_eq!(parse_int("4.0"), Some(4));
        assert_eq!(parse_int("-1"), Some(-1));
        assert_eq!(parse_int("4.5"), None);
        assert_eq!(parse_int("four"), None);
        assert_eq!(parse_int(""), None);
    }

    #[test]
    fn test_parse_document_with_doctype() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 3.1 Partwise//EN"
  "http://www.musicxml.org/dtds/partwise.dtd">
<score-partwise version="3.1"/>"#;

        let doc = parse_document(xml).unwrap();
        assert!(get_score_partwise(&doc).is_ok());
    }

    #[test]
    fn test_timewise_is_unsupported() {
        let doc = parse_document("<score-timewise/>").unwrap();
        let err = get_score_partwise(&doc).unwrap_err();
        assert!(matches!(err, FirstPassError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_malformed_xml_is_fatal() {
        let err = parse_document("<score-partwise><part></score-partwise>").unwrap_err();
        assert!(matches!(err, FirstPassError::InvalidXml(_)));
    }

    #[test]
    fn test_element_path_and_location() {
        let xml = "<score-partwise>\n  <part>\n    <measure><forward><bogus/></forward></measure>\n  </part>\n</score-partwise>";
        let doc = parse_document(xml).unwrap();
        let bogus = doc.descendants().find(|n| n.has_tag_name("bogus")).unwrap();

        assert_eq!(element_path(bogus), "score-partwise:part:measure:forward");

        let loc = source_location(bogus);
        assert_eq!(loc.tag, "bogus");
        assert_eq!(loc.line, 3);
        assert_eq!(loc.column, 23);
    }

    #[test]
    fn test_child_helpers() {
        let doc = parse_document("<note><voice>2</voice><staff>1</staff><rest/></note>").unwrap();
        let note = doc.root_element();

        assert_eq!(get_child_text(note, "voice"), Some("2"));
        assert_eq!(get_child_text(note, "rest"), Some(""));
        assert_eq!(get_child_text(note, "type"), None);
        assert_eq!(child_elements(note).count(), 3);
    }
}
