//! XML text reader.

use crate::element::{Element, Node};
use crate::error::{TreeError, TreeResult};
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Parse XML text and return its root element.
///
/// Whitespace-only text between child elements is dropped; text inside
/// leaf elements is kept verbatim. Comments, processing instructions,
/// declarations and doctypes are skipped.
///
/// # Errors
///
/// Returns an error if the text is not well-formed, has no root element,
/// or has element content after the root element.
pub fn parse_str(xml: &str) -> TreeResult<Element> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        #[allow(clippy::unnecessary_cast)]
        let position = reader.buffer_position() as u64;
        let event = reader
            .read_event()
            .map_err(|e| TreeError::parse(position, e.to_string()))?;

        match event {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(TreeError::TrailingContent);
                }
                stack.push(element_from_start(&start, position)?);
            }
            Event::Empty(start) => {
                if root.is_some() {
                    return Err(TreeError::TrailingContent);
                }
                let element = element_from_start(&start, position)?;
                attach(&mut stack, &mut root, element);
            }
            Event::End(end) => {
                let found = utf8(end.name().as_ref(), position)?.to_string();
                let mut element = stack.pop().ok_or_else(|| {
                    TreeError::parse(position, format!("unexpected end tag </{found}>"))
                })?;
                if element.name() != found {
                    return Err(TreeError::UnbalancedElement {
                        expected: element.name().to_string(),
                        found,
                    });
                }
                drop_ignorable_whitespace(&mut element);
                attach(&mut stack, &mut root, element);
            }
            Event::Text(text) => {
                let text = utf8(text.as_ref(), position)?;
                push_text(&mut stack, text, position)?;
            }
            Event::CData(data) => {
                let text = utf8(data.as_ref(), position)?;
                push_text(&mut stack, text, position)?;
            }
            Event::GeneralRef(reference) => {
                let name = utf8(reference.as_ref(), position)?;
                let resolved = resolve_reference(name)
                    .ok_or_else(|| TreeError::parse(position, format!("unknown entity &{name};")))?;
                push_text(&mut stack, &resolved, position)?;
            }
            Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if let Some(open) = stack.last() {
        return Err(TreeError::parse(
            xml.len() as u64,
            format!("unclosed element <{}>", open.name()),
        ));
    }
    root.ok_or(TreeError::NoRootElement)
}

fn element_from_start(start: &BytesStart<'_>, position: u64) -> TreeResult<Element> {
    let qname = start.name();
    let name = utf8(qname.as_ref(), position)?;
    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| TreeError::parse(position, e.to_string()))?;
        let key = utf8(attr.key.as_ref(), position)?;
        let raw = utf8(&attr.value, position)?;
        let value = unescape(raw).map_err(|e| TreeError::parse(position, e.to_string()))?;
        element.set_attribute(key, value.into_owned());
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => {
            parent.append_child(element);
        }
        None => *root = Some(element),
    }
}

fn push_text(stack: &mut [Element], text: &str, position: u64) -> TreeResult<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.append_text(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(TreeError::parse(position, "text outside of root element")),
    }
}

/// Whitespace between child elements is formatting, not content.
fn drop_ignorable_whitespace(element: &mut Element) {
    let has_elements = element.child_elements().next().is_some();
    if has_elements {
        element
            .children_mut()
            .retain(|n| !matches!(n, Node::Text(t) if t.trim().is_empty()));
    }
}

fn resolve_reference(name: &str) -> Option<String> {
    if let Some(code) = name.strip_prefix('#') {
        let value = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => code.parse().ok()?,
        };
        return char::from_u32(value).map(String::from);
    }
    resolve_predefined_entity(name).map(str::to_string)
}

fn utf8(bytes: &[u8], position: u64) -> TreeResult<&str> {
    std::str::from_utf8(bytes).map_err(|e| TreeError::parse(position, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_nested() {
        let root = parse_str(r#"<a x="1"><b>text</b><c/></a>"#).unwrap();
        assert_eq!(root.name(), "a");
        assert_eq!(root.attribute("x"), Some("1"));
        assert_eq!(root.child_elements().count(), 2);
        assert_eq!(
            root.first_child_element().and_then(Element::text).as_deref(),
            Some("text")
        );
    }

    #[test]
    fn parse_keeps_prefixed_names() {
        let root = parse_str(r#"<g:shape g:kind="circle"><g:r>2</g:r></g:shape>"#).unwrap();
        assert_eq!(root.name(), "g:shape");
        assert_eq!(root.attribute("g:kind"), Some("circle"));
        assert_eq!(root.child_element_named(0, "g:r").and_then(Element::text).as_deref(), Some("2"));
    }

    #[test]
    fn parse_drops_formatting_whitespace() {
        let root = parse_str("<a>\n  <b> keep </b>\n</a>").unwrap();
        assert_eq!(root.children().len(), 1);
        assert_eq!(
            root.first_child_element().and_then(Element::text).as_deref(),
            Some(" keep ")
        );
    }

    #[test]
    fn parse_resolves_entities() {
        let root = parse_str(r#"<a v="x &amp; y">1 &lt; 2 &#65;&#x42;</a>"#).unwrap();
        assert_eq!(root.attribute("v"), Some("x & y"));
        assert_eq!(root.text().as_deref(), Some("1 < 2 AB"));
    }

    #[test]
    fn parse_skips_declaration_and_comments() {
        let root = parse_str("<?xml version=\"1.0\"?><!-- c --><a/>").unwrap();
        assert_eq!(root.name(), "a");
        assert!(root.is_empty());
    }

    #[test]
    fn empty_document_has_no_root() {
        assert_eq!(parse_str("  "), Err(TreeError::NoRootElement));
    }

    #[test]
    fn second_root_is_rejected() {
        assert_eq!(parse_str("<a/><b/>"), Err(TreeError::TrailingContent));
    }

    #[test]
    fn mismatched_end_tag_is_an_error() {
        assert!(parse_str("<a><b></a>").is_err());
    }

    #[test]
    fn unclosed_element_is_an_error() {
        assert!(parse_str("<a><b/>").is_err());
    }
}
