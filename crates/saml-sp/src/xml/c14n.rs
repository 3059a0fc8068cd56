//! XML canonicalization for signature digests.
//!
//! Exclusive XML Canonicalization 1.0 (without comments) is what SAML
//! signatures use. Canonical XML 1.0 is also accepted since some identity
//! providers omit the exclusive transform and fall back to the default.
//!
//! A subtree is canonicalized in place: namespace bindings inherited from
//! ancestors are taken into account, and one descendant (the enveloped
//! signature) can be left out.

use super::{Document, Element, NamespaceDecl, NamespaceScope, Node};
use crate::error::{SamlError, SamlResult};
use crate::types::constants::{c14n_algorithms, XML_NS};

/// Canonicalization flavour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum C14nMode {
    /// Exclusive canonicalization with an optional inclusive prefix list.
    Exclusive {
        /// Prefixes treated as in inclusive canonicalization (`#default` for
        /// the default namespace).
        inclusive_prefixes: Vec<String>,
    },
    /// Inclusive canonicalization.
    Inclusive,
}

impl Default for C14nMode {
    fn default() -> Self {
        Self::Exclusive {
            inclusive_prefixes: Vec::new(),
        }
    }
}

impl C14nMode {
    /// Resolves a canonicalization algorithm URI. Variants that keep comments
    /// are not supported.
    #[must_use]
    pub fn from_uri(uri: &str, inclusive_prefixes: Vec<String>) -> Option<Self> {
        match uri {
            c14n_algorithms::EXCLUSIVE => Some(Self::Exclusive { inclusive_prefixes }),
            c14n_algorithms::INCLUSIVE => Some(Self::Inclusive),
            _ => None,
        }
    }

    /// Parses an `InclusiveNamespaces/@PrefixList` value.
    #[must_use]
    pub fn exclusive_with_prefix_list(prefix_list: &str) -> Self {
        Self::Exclusive {
            inclusive_prefixes: prefix_list.split_whitespace().map(ToString::to_string).collect(),
        }
    }
}

/// Canonicalizes the element at `path`, omitting the subtree at `exclude`.
pub fn canonicalize(
    doc: &Document,
    path: &[usize],
    mode: &C14nMode,
    exclude: Option<&[usize]>,
) -> SamlResult<String> {
    let el = doc
        .element_at(path)
        .ok_or_else(|| SamlError::MissingElement(format!("no element at {path:?}")))?;

    let mut scope = match path.split_last() {
        Some((_, parent)) => doc.scope_at(parent),
        None => NamespaceScope::default(),
    };

    let mut writer = Canonicalizer {
        mode,
        exclude,
        out: String::new(),
    };
    let mut current = path.to_vec();
    writer.element(el, &mut current, &mut scope, &[])?;
    Ok(writer.out)
}

struct Canonicalizer<'a> {
    mode: &'a C14nMode,
    exclude: Option<&'a [usize]>,
    out: String,
}

impl Canonicalizer<'_> {
    fn element(
        &mut self,
        el: &Element,
        path: &mut Vec<usize>,
        scope: &mut NamespaceScope,
        rendered: &[NamespaceDecl],
    ) -> SamlResult<()> {
        let mark = scope.len();
        scope.push(el);

        let decls = self.namespaces_to_render(el, scope, rendered)?;
        let attributes = sorted_attributes(el, scope)?;

        let name = el.qualified_name();
        self.out.push('<');
        self.out.push_str(&name);
        for decl in &decls {
            match &decl.prefix {
                Some(prefix) => {
                    self.out.push_str(" xmlns:");
                    self.out.push_str(prefix);
                }
                None => self.out.push_str(" xmlns"),
            }
            self.out.push_str("=\"");
            self.out.push_str(&escape_attr(&decl.uri));
            self.out.push('"');
        }
        for (qname, value) in &attributes {
            self.out.push(' ');
            self.out.push_str(qname);
            self.out.push_str("=\"");
            self.out.push_str(&escape_attr(value));
            self.out.push('"');
        }
        self.out.push('>');

        let mut now_rendered = rendered.to_vec();
        now_rendered.extend(decls);

        for (i, child) in el.children.iter().enumerate() {
            match child {
                Node::Element(child_el) => {
                    path.push(i);
                    if self.exclude != Some(path.as_slice()) {
                        self.element(child_el, path, scope, &now_rendered)?;
                    }
                    path.pop();
                }
                Node::Text(text) => self.out.push_str(&escape_text(text)),
                Node::Comment(_) => {}
            }
        }

        self.out.push_str("</");
        self.out.push_str(&name);
        self.out.push('>');

        scope.truncate(mark);
        Ok(())
    }

    fn namespaces_to_render(
        &self,
        el: &Element,
        scope: &NamespaceScope,
        rendered: &[NamespaceDecl],
    ) -> SamlResult<Vec<NamespaceDecl>> {
        // (prefix, required): required prefixes must resolve
        let mut candidates: Vec<(Option<String>, bool)> = Vec::new();
        let mut add = |prefix: Option<String>, required: bool| {
            if !candidates.iter().any(|(p, _)| *p == prefix) {
                candidates.push((prefix, required));
            }
        };

        match self.mode {
            C14nMode::Exclusive { inclusive_prefixes } => {
                add(el.prefix.clone(), true);
                for attr in &el.attributes {
                    if let Some(prefix) = &attr.prefix {
                        if prefix != "xml" {
                            add(Some(prefix.clone()), true);
                        }
                    }
                }
                for prefix in inclusive_prefixes {
                    if prefix == "#default" {
                        add(None, false);
                    } else {
                        add(Some(prefix.clone()), false);
                    }
                }
            }
            C14nMode::Inclusive => {
                for decl in scope.visible() {
                    if decl.prefix.as_deref() != Some("xml") {
                        add(decl.prefix, false);
                    }
                }
            }
        }

        let mut decls = Vec::new();
        for (prefix, required) in candidates {
            let uri = scope.resolve(prefix.as_deref());
            let already = lookup(rendered, prefix.as_deref());

            match prefix {
                None => {
                    let uri = uri.unwrap_or("");
                    if uri != already.unwrap_or("") {
                        decls.push(NamespaceDecl {
                            prefix: None,
                            uri: uri.to_string(),
                        });
                    }
                }
                Some(p) => match uri {
                    Some(uri) => {
                        if already != Some(uri) {
                            decls.push(NamespaceDecl {
                                prefix: Some(p),
                                uri: uri.to_string(),
                            });
                        }
                    }
                    None if required => {
                        return Err(SamlError::XmlParse(format!("unbound namespace prefix {p}")));
                    }
                    None => {}
                },
            }
        }

        decls.sort_by(|a, b| a.prefix.cmp(&b.prefix));
        Ok(decls)
    }
}

fn lookup<'a>(rendered: &'a [NamespaceDecl], prefix: Option<&str>) -> Option<&'a str> {
    rendered
        .iter()
        .rev()
        .find(|decl| decl.prefix.as_deref() == prefix)
        .map(|decl| decl.uri.as_str())
}

fn sorted_attributes(el: &Element, scope: &NamespaceScope) -> SamlResult<Vec<(String, String)>> {
    let mut keyed = Vec::with_capacity(el.attributes.len());
    for attr in &el.attributes {
        let uri = match attr.prefix.as_deref() {
            None => String::new(),
            Some("xml") => XML_NS.to_string(),
            Some(prefix) => scope
                .resolve(Some(prefix))
                .map(ToString::to_string)
                .ok_or_else(|| SamlError::XmlParse(format!("unbound namespace prefix {prefix}")))?,
        };
        keyed.push(((uri, attr.local_name.clone()), (attr.qualified_name(), attr.value.clone())));
    }
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(keyed.into_iter().map(|(_, attr)| attr).collect())
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(c),
        }
    }
    out
}
