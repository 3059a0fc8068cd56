//! Namespace-aware XML tree.
//!
//! SAML processing needs more than a streaming reader: signatures are
//! verified over canonical forms of subtrees, encrypted assertions are
//! replaced in place, and the same document is queried by several stages.
//! [`Document`] is a small owned tree built on top of `quick-xml` that keeps
//! prefixes, namespace declarations and attribute order so that it can be
//! canonicalized and re-serialized faithfully.
//!
//! Elements are addressed by [`NodePath`]: the sequence of child indices
//! leading from the root to the element. Paths stay valid when an element
//! is replaced by another, which is how decrypted assertions are correlated
//! with the original document.

pub mod c14n;
mod parse;
mod write;

pub use c14n::{canonicalize, C14nMode};
pub use parse::MAX_DEPTH;

use crate::types::constants::XML_NS;

/// Child indices from the root element to a node.
pub type NodePath = Vec<usize>;

/// A node in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// An element.
    Element(Element),
    /// Character data (already unescaped).
    Text(String),
    /// A comment.
    Comment(String),
}

/// A namespace declaration (`xmlns` or `xmlns:prefix`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    /// Declared prefix, `None` for the default namespace.
    pub prefix: Option<String>,
    /// Namespace URI, empty to undeclare the default namespace.
    pub uri: String,
}

/// An attribute that is not a namespace declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Prefix, if any.
    pub prefix: Option<String>,
    /// Local name.
    pub local_name: String,
    /// Unescaped value.
    pub value: String,
}

impl Attribute {
    /// Creates an unprefixed attribute.
    pub fn new(local_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local_name: local_name.into(),
            value: value.into(),
        }
    }

    /// Returns `prefix:local` or `local`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        qualified(self.prefix.as_deref(), &self.local_name)
    }
}

/// An element with its namespace declarations, attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Prefix, if any.
    pub prefix: Option<String>,
    /// Local name.
    pub local_name: String,
    /// Namespace declarations made on this element.
    pub namespaces: Vec<NamespaceDecl>,
    /// Attributes, in document order.
    pub attributes: Vec<Attribute>,
    /// Child nodes.
    pub children: Vec<Node>,
}

impl Element {
    /// Creates an empty element.
    pub fn new(prefix: Option<&str>, local_name: impl Into<String>) -> Self {
        Self {
            prefix: prefix.map(ToString::to_string),
            local_name: local_name.into(),
            namespaces: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Adds a namespace declaration.
    #[must_use]
    pub fn with_namespace(mut self, prefix: Option<&str>, uri: impl Into<String>) -> Self {
        self.namespaces.push(NamespaceDecl {
            prefix: prefix.map(ToString::to_string),
            uri: uri.into(),
        });
        self
    }

    /// Adds an unprefixed attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(name, value));
        self
    }

    /// Appends a child element.
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Appends a text node.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Returns `prefix:local` or `local`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        qualified(self.prefix.as_deref(), &self.local_name)
    }

    /// Returns the value of an unprefixed attribute.
    #[must_use]
    pub fn attribute(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.prefix.is_none() && a.local_name == local_name)
            .map(|a| a.value.as_str())
    }

    /// Sets (or replaces) an unprefixed attribute.
    pub fn set_attribute(&mut self, local_name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|a| a.prefix.is_none() && a.local_name == local_name)
        {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute::new(local_name, value)),
        }
    }

    /// Iterates over child elements.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    /// Iterates over child elements with their indices in `children`.
    pub fn indexed_child_elements(&self) -> impl Iterator<Item = (usize, &Element)> {
        self.children.iter().enumerate().filter_map(|(i, node)| match node {
            Node::Element(el) => Some((i, el)),
            _ => None,
        })
    }

    /// Returns the first child element with the given local name.
    #[must_use]
    pub fn child(&self, local_name: &str) -> Option<&Element> {
        self.child_elements().find(|el| el.local_name == local_name)
    }

    /// Iterates over child elements with the given local name.
    pub fn children_named<'a>(&'a self, local_name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.child_elements().filter(move |el| el.local_name == local_name)
    }

    /// Returns the first descendant (excluding self) with the given local name.
    #[must_use]
    pub fn descendant(&self, local_name: &str) -> Option<&Element> {
        for child in self.child_elements() {
            if child.local_name == local_name {
                return Some(child);
            }
            if let Some(found) = child.descendant(local_name) {
                return Some(found);
            }
        }
        None
    }

    /// Every descendant (excluding self) with the given local name, in
    /// document order.
    #[must_use]
    pub fn descendants_named(&self, local_name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        collect_named(self, local_name, &mut found);
        found
    }

    /// Concatenated text content of this element and its descendants.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Text content with surrounding whitespace removed.
    #[must_use]
    pub fn trimmed_text(&self) -> String {
        self.text().trim().to_string()
    }

    /// Inserts a child element at `index` in `children`.
    pub fn insert_child(&mut self, index: usize, child: Element) {
        let index = index.min(self.children.len());
        self.children.insert(index, Node::Element(child));
    }
}

fn collect_text(el: &Element, out: &mut String) {
    for node in &el.children {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(child) => collect_text(child, out),
            Node::Comment(_) => {}
        }
    }
}

fn collect_named<'a>(el: &'a Element, local_name: &str, found: &mut Vec<&'a Element>) {
    for child in el.child_elements() {
        if child.local_name == local_name {
            found.push(child);
        }
        collect_named(child, local_name, found);
    }
}

fn qualified(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(p) => format!("{p}:{local}"),
        None => local.to_string(),
    }
}

/// In-scope namespace bindings at some element.
#[derive(Debug, Clone, Default)]
pub struct NamespaceScope {
    bindings: Vec<NamespaceDecl>,
}

impl NamespaceScope {
    /// Adds the declarations made on an element.
    pub fn push(&mut self, el: &Element) {
        self.bindings.extend(el.namespaces.iter().cloned());
    }

    /// Resolves a prefix (`None` for the default namespace).
    ///
    /// The default namespace resolves to `None` when undeclared or set to
    /// the empty string.
    #[must_use]
    pub fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NS);
        }
        self.bindings
            .iter()
            .rev()
            .find(|decl| decl.prefix.as_deref() == prefix)
            .map(|decl| decl.uri.as_str())
            .filter(|uri| !uri.is_empty() || prefix.is_some())
    }

    /// All bindings visible at this point, innermost declaration per prefix.
    #[must_use]
    pub fn visible(&self) -> Vec<NamespaceDecl> {
        let mut seen: Vec<NamespaceDecl> = Vec::new();
        for decl in self.bindings.iter().rev() {
            if !seen.iter().any(|s| s.prefix == decl.prefix) {
                seen.push(decl.clone());
            }
        }
        seen
    }

    pub(crate) fn len(&self) -> usize {
        self.bindings.len()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.bindings.truncate(len);
    }
}

/// A parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Parses a document. DTDs are rejected.
    pub fn parse(xml: &str) -> crate::SamlResult<Self> {
        parse::parse_document(xml).map(|root| Self { root })
    }

    /// Wraps an element as a document.
    #[must_use]
    pub fn from_root(root: Element) -> Self {
        Self { root }
    }

    /// Returns the root element.
    #[must_use]
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Serializes the document without an XML declaration.
    #[must_use]
    pub fn to_xml(&self) -> String {
        write::element_to_string(&self.root)
    }

    /// Returns the element at `path`.
    #[must_use]
    pub fn element_at(&self, path: &[usize]) -> Option<&Element> {
        let mut current = &self.root;
        for &index in path {
            match current.children.get(index) {
                Some(Node::Element(el)) => current = el,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Returns the element at `path` mutably.
    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = &mut self.root;
        for &index in path {
            match current.children.get_mut(index) {
                Some(Node::Element(el)) => current = el,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Replaces the element at `path`, returning the previous one.
    pub fn replace_element(&mut self, path: &[usize], element: Element) -> Option<Element> {
        if path.is_empty() {
            return Some(std::mem::replace(&mut self.root, element));
        }
        let (last, parent_path) = path.split_last()?;
        let parent = self.element_at_mut(parent_path)?;
        match parent.children.get_mut(*last) {
            Some(Node::Element(el)) => Some(std::mem::replace(el, element)),
            _ => None,
        }
    }

    /// Paths of every element with the given local name, in document order.
    #[must_use]
    pub fn find_all(&self, local_name: &str) -> Vec<NodePath> {
        let mut found = Vec::new();
        let mut path = Vec::new();
        walk(&self.root, &mut path, &mut |el, p| {
            if el.local_name == local_name {
                found.push(p.to_vec());
            }
        });
        found
    }

    /// Paths of every element carrying `ID`, `Id` or `id` equal to `id`.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Vec<NodePath> {
        let mut found = Vec::new();
        let mut path = Vec::new();
        walk(&self.root, &mut path, &mut |el, p| {
            let matches = ["ID", "Id", "id"]
                .iter()
                .any(|name| el.attribute(name) == Some(id));
            if matches {
                found.push(p.to_vec());
            }
        });
        found
    }

    /// Namespace bindings in scope at `path`, including the element's own.
    #[must_use]
    pub fn scope_at(&self, path: &[usize]) -> NamespaceScope {
        let mut scope = NamespaceScope::default();
        let mut current = &self.root;
        scope.push(current);
        for &index in path {
            match current.children.get(index) {
                Some(Node::Element(el)) => {
                    current = el;
                    scope.push(current);
                }
                _ => break,
            }
        }
        scope
    }

    /// Resolves the namespace URI of the element at `path`.
    #[must_use]
    pub fn namespace_of(&self, path: &[usize]) -> Option<String> {
        let el = self.element_at(path)?;
        self.scope_at(path)
            .resolve(el.prefix.as_deref())
            .map(ToString::to_string)
    }
}

fn walk<F>(el: &Element, path: &mut Vec<usize>, visit: &mut F)
where
    F: FnMut(&Element, &[usize]),
{
    visit(el, path);
    for (i, child) in el.indexed_child_elements() {
        path.push(i);
        walk(child, path, visit);
        path.pop();
    }
}

/// Returns true when `path` lies inside (or at) `ancestor`.
#[must_use]
pub fn path_within(path: &[usize], ancestor: &[usize]) -> bool {
    path.len() >= ancestor.len() && path[..ancestor.len()] == *ancestor
}

/// Escapes character data for element content.
#[must_use]
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes character data for a double-quoted attribute value.
#[must_use]
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="_r1" Version="2.0">
  <saml:Issuer xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion">https://idp.example.com</saml:Issuer>
  <!-- note -->
  <saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_a1">
    <saml:Subject><saml:NameID>a&amp;b@example.com</saml:NameID></saml:Subject>
  </saml:Assertion>
</samlp:Response>"#;

    #[test]
    fn parses_and_queries() {
        let doc = Document::parse(SAMPLE).unwrap();
        assert_eq!(doc.root().local_name, "Response");
        assert_eq!(doc.root().prefix.as_deref(), Some("samlp"));
        assert_eq!(doc.root().attribute("ID"), Some("_r1"));

        let issuer = doc.root().child("Issuer").unwrap();
        assert_eq!(issuer.text(), "https://idp.example.com");

        let name_ids = doc.find_all("NameID");
        assert_eq!(name_ids.len(), 1);
        assert_eq!(doc.element_at(&name_ids[0]).unwrap().text(), "a&b@example.com");
    }

    #[test]
    fn finds_elements_by_id() {
        let doc = Document::parse(SAMPLE).unwrap();
        let paths = doc.find_by_id("_a1");
        assert_eq!(paths.len(), 1);
        assert_eq!(doc.element_at(&paths[0]).unwrap().local_name, "Assertion");
        assert!(doc.find_by_id("_missing").is_empty());
    }

    #[test]
    fn resolves_namespaces() {
        let doc = Document::parse(SAMPLE).unwrap();
        let path = doc.find_all("NameID").remove(0);
        assert_eq!(
            doc.namespace_of(&path).as_deref(),
            Some("urn:oasis:names:tc:SAML:2.0:assertion")
        );
        assert_eq!(
            doc.namespace_of(&[]).as_deref(),
            Some("urn:oasis:names:tc:SAML:2.0:protocol")
        );
    }

    #[test]
    fn serializes_with_prefixes() {
        let doc = Document::parse(r#"<a:x xmlns:a="urn:a" k="1 &lt; 2"><a:y/>t&amp;t</a:x>"#).unwrap();
        assert_eq!(doc.to_xml(), r#"<a:x xmlns:a="urn:a" k="1 &lt; 2"><a:y/>t&amp;t</a:x>"#);

        let reparsed = Document::parse(&doc.to_xml()).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn replaces_elements_in_place() {
        let mut doc = Document::parse(SAMPLE).unwrap();
        let path = doc.find_all("Assertion").remove(0);
        let old = doc
            .replace_element(&path, Element::new(Some("saml"), "Replaced"))
            .unwrap();
        assert_eq!(old.local_name, "Assertion");
        assert_eq!(doc.element_at(&path).unwrap().local_name, "Replaced");
    }

    #[test]
    fn rejects_doctype() {
        let xml = r#"<!DOCTYPE r [<!ENTITY e "x">]><r>&e;</r>"#;
        assert!(matches!(Document::parse(xml), Err(crate::SamlError::XmlParse(_))));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(Document::parse("<a><b></a>").is_err());
        assert!(Document::parse("").is_err());
        assert!(Document::parse("<a/><b/>").is_err());
        assert!(Document::parse("not xml").is_err());
    }

    #[test]
    fn path_containment() {
        assert!(path_within(&[1, 3, 5], &[1, 3]));
        assert!(path_within(&[1, 3], &[1, 3]));
        assert!(path_within(&[2], &[]));
        assert!(!path_within(&[1], &[1, 3]));
        assert!(!path_within(&[2, 3], &[1]));
    }
}
