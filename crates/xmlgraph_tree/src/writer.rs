//! XML text writer.

use crate::element::{Element, Node};
use crate::error::{TreeError, TreeResult};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

/// Write an element subtree as compact XML text.
///
/// The output parses back (with [`crate::parse_str`]) to an equal tree,
/// provided no element mixes text with whitespace-only runs between
/// child elements.
///
/// # Errors
///
/// Returns an error if the writer fails or produces invalid UTF-8.
pub fn to_string(element: &Element) -> TreeResult<String> {
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, element)?;
    into_string(writer)
}

/// Write an element subtree as indented XML text.
///
/// # Errors
///
/// Returns an error if the writer fails or produces invalid UTF-8.
pub fn to_string_pretty(element: &Element) -> TreeResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_element(&mut writer, element)?;
    into_string(writer)
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> TreeResult<()> {
    let mut start = BytesStart::new(element.name());
    for (key, value) in element.attributes() {
        start.push_attribute((key, value));
    }

    if element.children().is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| TreeError::write(e.to_string()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| TreeError::write(e.to_string()))?;
    for child in element.children() {
        match child {
            Node::Element(e) => write_element(writer, e)?,
            Node::Text(t) => writer
                .write_event(Event::Text(BytesText::new(t)))
                .map_err(|e| TreeError::write(e.to_string()))?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name())))
        .map_err(|e| TreeError::write(e.to_string()))
}

fn into_string(writer: Writer<Vec<u8>>) -> TreeResult<String> {
    String::from_utf8(writer.into_inner()).map_err(|e| TreeError::write(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_empty_element() {
        let e = Element::new("a").with_attribute("null", "true");
        assert_eq!(to_string(&e).unwrap(), r#"<a null="true"/>"#);
    }

    #[test]
    fn write_escapes_text_and_attributes() {
        let e = Element::new("a")
            .with_attribute("v", "\"<&>\"")
            .with_text("1 < 2 & 3");
        let xml = to_string(&e).unwrap();
        assert!(xml.contains("&lt;"));
        assert!(xml.contains("&amp;"));
        assert!(!xml.contains("1 < 2"));
    }

    #[test]
    fn write_nested() {
        let e = Element::new("a").with_child(Element::new("b").with_text("x"));
        assert_eq!(to_string(&e).unwrap(), "<a><b>x</b></a>");
    }

    #[test]
    fn pretty_output_has_newlines() {
        let e = Element::new("a")
            .with_child(Element::new("b").with_text("x"))
            .with_child(Element::new("c"));
        let xml = to_string_pretty(&e).unwrap();
        assert!(xml.contains('\n'));
        assert!(xml.contains("<b>x</b>"));
    }
}
