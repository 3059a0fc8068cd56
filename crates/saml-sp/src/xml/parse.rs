//! Tree construction from `quick-xml` events.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{Attribute, Element, NamespaceDecl, Node};
use crate::error::{SamlError, SamlResult};

/// Deepest element nesting accepted. Every later pass over the tree
/// recurses, so the bound keeps hostile input from exhausting the stack.
pub const MAX_DEPTH: usize = 256;

pub(super) fn parse_document(xml: &str) -> SamlResult<Element> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                check_depth(stack.len() + 1)?;
                stack.push(element_from_start(&start)?);
            }
            Event::Empty(start) => {
                check_depth(stack.len() + 1)?;
                let el = element_from_start(&start)?;
                attach(&mut stack, &mut root, el)?;
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| SamlError::XmlParse("unexpected closing tag".to_string()))?;
                attach(&mut stack, &mut root, el)?;
            }
            Event::Text(text) => {
                let raw = std::str::from_utf8(&text)?;
                let value = quick_xml::escape::unescape(&normalize_line_endings(raw))?.into_owned();
                push_text(&mut stack, value)?;
            }
            Event::CData(data) => {
                let value = std::str::from_utf8(&data)?;
                push_text(&mut stack, normalize_line_endings(value))?;
            }
            Event::Comment(comment) => {
                if let Some(parent) = stack.last_mut() {
                    let value = std::str::from_utf8(&comment)?;
                    parent.children.push(Node::Comment(value.to_string()));
                }
            }
            Event::DocType(_) => {
                return Err(SamlError::XmlParse("DOCTYPE is not allowed".to_string()));
            }
            Event::Decl(_) | Event::PI(_) => {}
            Event::Eof => break,
        }
    }

    if !stack.is_empty() {
        return Err(SamlError::XmlParse("unclosed element".to_string()));
    }
    root.ok_or_else(|| SamlError::XmlParse("document has no root element".to_string()))
}

fn check_depth(depth: usize) -> SamlResult<()> {
    if depth > MAX_DEPTH {
        return Err(SamlError::XmlParse(format!("elements nested deeper than {MAX_DEPTH}")));
    }
    Ok(())
}

fn element_from_start(start: &BytesStart<'_>) -> SamlResult<Element> {
    let name = std::str::from_utf8(start.name().into_inner())?;
    let (prefix, local) = split_name(name);
    let mut el = Element::new(prefix, local);

    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.into_inner())?;
        let raw = std::str::from_utf8(&attr.value)?;
        let value = quick_xml::escape::unescape(&normalize_attribute(raw))?.into_owned();

        if key == "xmlns" {
            el.namespaces.push(NamespaceDecl { prefix: None, uri: value });
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            el.namespaces.push(NamespaceDecl {
                prefix: Some(prefix.to_string()),
                uri: value,
            });
        } else {
            let (prefix, local) = split_name(key);
            el.attributes.push(Attribute {
                prefix: prefix.map(ToString::to_string),
                local_name: local.to_string(),
                value,
            });
        }
    }

    Ok(el)
}

fn split_name(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) -> SamlResult<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(el));
        Ok(())
    } else if root.is_some() {
        Err(SamlError::XmlParse("multiple root elements".to_string()))
    } else {
        *root = Some(el);
        Ok(())
    }
}

fn push_text(stack: &mut [Element], text: String) -> SamlResult<()> {
    match stack.last_mut() {
        Some(parent) => {
            if let Some(Node::Text(previous)) = parent.children.last_mut() {
                previous.push_str(&text);
            } else {
                parent.children.push(Node::Text(text));
            }
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(SamlError::XmlParse("text outside the root element".to_string())),
    }
}

fn normalize_line_endings(raw: &str) -> String {
    raw.replace("\r\n", "\n").replace('\r', "\n")
}

// Literal whitespace in attribute values collapses to spaces; character
// references survive because normalization runs before unescaping.
fn normalize_attribute(raw: &str) -> String {
    normalize_line_endings(raw).replace(['\n', '\t'], " ")
}
