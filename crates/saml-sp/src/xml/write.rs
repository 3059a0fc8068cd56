//! Serialization back to text, preserving prefixes and declarations.

use super::{escape_attribute, escape_text, Element, Node};

pub(super) fn element_to_string(el: &Element) -> String {
    let mut out = String::new();
    write_element(el, &mut out);
    out
}

fn write_element(el: &Element, out: &mut String) {
    let name = el.qualified_name();
    out.push('<');
    out.push_str(&name);

    for ns in &el.namespaces {
        match &ns.prefix {
            Some(prefix) => {
                out.push_str(" xmlns:");
                out.push_str(prefix);
            }
            None => out.push_str(" xmlns"),
        }
        out.push_str("=\"");
        out.push_str(&escape_attribute(&ns.uri));
        out.push('"');
    }

    for attr in &el.attributes {
        out.push(' ');
        out.push_str(&attr.qualified_name());
        out.push_str("=\"");
        out.push_str(&escape_attribute(&attr.value));
        out.push('"');
    }

    if el.children.is_empty() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in &el.children {
        match child {
            Node::Element(child) => write_element(child, out),
            Node::Text(text) => out.push_str(&escape_text(text)),
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
        }
    }
    out.push_str("</");
    out.push_str(&name);
    out.push('>');
}
