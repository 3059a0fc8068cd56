//! SAML schema validation.
//!
//! Documents are checked structurally before any cryptographic work. The
//! [`SchemaValidator`] trait is the seam for a full XSD engine; the built-in
//! validators enforce the subset of `saml-schema-protocol-2.0.xsd` and
//! `saml-schema-metadata-2.0.xsd` that the pipeline relies on: root element
//! and namespace, required attributes and their lexical types, child order
//! and cardinality. Encrypted assertions are accepted as opaque content.

mod metadata;
mod protocol;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{SamlError, SamlResult};
use crate::xml::{Document, Element, NodePath};

pub use metadata::MetadataSchema;
pub use protocol::ProtocolSchema;

/// Validates a raw XML document against a schema.
pub trait SchemaValidator: Send + Sync {
    /// Fails with [`SamlError::SchemaViolation`] when `xml` is not valid.
    fn validate(&self, xml: &str) -> SamlResult<()>;
}

/// The schemas a service provider needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamlSchema {
    /// SAML 2.0 protocol (requests and responses).
    Protocol,
    /// SAML 2.0 metadata.
    Metadata,
}

impl SamlSchema {
    /// The well-known schema file name.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Protocol => "saml-schema-protocol-2.0.xsd",
            Self::Metadata => "saml-schema-metadata-2.0.xsd",
        }
    }
}

impl fmt::Display for SamlSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Protocol and metadata validators, built once per provider.
#[derive(Clone)]
pub struct SchemaSet {
    protocol: Arc<dyn SchemaValidator>,
    metadata: Arc<dyn SchemaValidator>,
}

impl SchemaSet {
    /// Uses the given validators.
    pub fn new(protocol: Arc<dyn SchemaValidator>, metadata: Arc<dyn SchemaValidator>) -> Self {
        Self { protocol, metadata }
    }

    /// The built-in structural validators.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(Arc::new(ProtocolSchema), Arc::new(MetadataSchema))
    }

    /// Replaces one validator.
    #[must_use]
    pub fn with_validator(mut self, schema: SamlSchema, validator: Arc<dyn SchemaValidator>) -> Self {
        match schema {
            SamlSchema::Protocol => self.protocol = validator,
            SamlSchema::Metadata => self.metadata = validator,
        }
        self
    }

    /// Validates `xml` against `schema`.
    pub fn validate(&self, schema: SamlSchema, xml: &str) -> SamlResult<()> {
        match schema {
            SamlSchema::Protocol => self.protocol.validate(xml),
            SamlSchema::Metadata => self.metadata.validate(xml),
        }
    }
}

impl Default for SchemaSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for SchemaSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaSet").finish_non_exhaustive()
    }
}

/// Parses an `xs:dateTime`. Values without a timezone are taken as UTC.
pub(crate) fn parse_date_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Returns true for a valid `xs:NCName` (as used by `xs:ID`).
pub(crate) fn is_ncname(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        }
        _ => false,
    }
}

pub(crate) fn violation(message: impl Into<String>) -> SamlError {
    SamlError::SchemaViolation(message.into())
}

pub(crate) fn parse(xml: &str) -> SamlResult<Document> {
    Document::parse(xml).map_err(|e| violation(e.to_string()))
}

/// One entry of an element-only content model.
#[derive(Clone, Copy)]
pub(crate) struct Particle {
    pub names: &'static [&'static str],
    pub namespace: &'static str,
    pub min: usize,
    pub max: Option<usize>,
}

impl Particle {
    pub const fn optional(name: &'static [&'static str], namespace: &'static str) -> Self {
        Self { names: name, namespace, min: 0, max: Some(1) }
    }

    pub const fn required(name: &'static [&'static str], namespace: &'static str) -> Self {
        Self { names: name, namespace, min: 1, max: Some(1) }
    }

    pub const fn any_number(name: &'static [&'static str], namespace: &'static str) -> Self {
        Self { names: name, namespace, min: 0, max: None }
    }

    pub const fn one_or_more(name: &'static [&'static str], namespace: &'static str) -> Self {
        Self { names: name, namespace, min: 1, max: None }
    }
}

/// Checks the element children at `path` against a sequence of particles.
///
/// Returns each child path with the local name it matched.
pub(crate) fn check_sequence(
    doc: &Document,
    path: &[usize],
    particles: &[Particle],
) -> SamlResult<Vec<(NodePath, String)>> {
    let el = doc
        .element_at(path)
        .ok_or_else(|| violation(format!("no element at {path:?}")))?;

    let mut current = 0;
    let mut count = 0;
    let mut matched = Vec::new();

    for (index, child) in el.indexed_child_elements() {
        loop {
            let Some(particle) = particles.get(current) else {
                return Err(violation(format!(
                    "unexpected element {} in {}",
                    child.local_name, el.local_name
                )));
            };
            if particle.names.contains(&child.local_name.as_str()) {
                break;
            }
            if count < particle.min {
                return Err(violation(format!(
                    "expected {} in {}, found {}",
                    particle.names.join("|"),
                    el.local_name,
                    child.local_name
                )));
            }
            current += 1;
            count = 0;
        }

        let particle = &particles[current];
        count += 1;
        if particle.max.is_some_and(|max| count > max) {
            return Err(violation(format!(
                "too many {} elements in {}",
                child.local_name, el.local_name
            )));
        }

        let mut child_path = path.to_vec();
        child_path.push(index);
        if doc.namespace_of(&child_path).as_deref() != Some(particle.namespace) {
            return Err(violation(format!(
                "{} must be in namespace {}",
                child.local_name, particle.namespace
            )));
        }
        matched.push((child_path, child.local_name.clone()));
    }

    for (i, particle) in particles.iter().enumerate().skip(current) {
        let seen = if i == current { count } else { 0 };
        if seen < particle.min {
            return Err(violation(format!(
                "missing {} in {}",
                particle.names.join("|"),
                el.local_name
            )));
        }
    }

    Ok(matched)
}

/// Checks that the element at `path` has the expected namespace.
pub(crate) fn check_namespace(doc: &Document, path: &[usize], namespace: &str) -> SamlResult<()> {
    let actual = doc.namespace_of(path);
    if actual.as_deref() == Some(namespace) {
        Ok(())
    } else {
        Err(violation(format!(
            "expected namespace {namespace}, found {}",
            actual.unwrap_or_else(|| "none".to_string())
        )))
    }
}

pub(crate) fn required_attribute<'a>(el: &'a Element, name: &str) -> SamlResult<&'a str> {
    el.attribute(name)
        .ok_or_else(|| violation(format!("{} is missing the {name} attribute", el.local_name)))
}

pub(crate) fn check_id(el: &Element, name: &str) -> SamlResult<()> {
    let id = required_attribute(el, name)?;
    if is_ncname(id) {
        Ok(())
    } else {
        Err(violation(format!("{name} '{id}' on {} is not an NCName", el.local_name)))
    }
}

pub(crate) fn check_date_time(el: &Element, name: &str, required: bool) -> SamlResult<()> {
    match el.attribute(name) {
        Some(value) if parse_date_time(value).is_none() => Err(violation(format!(
            "{name} '{value}' on {} is not an xs:dateTime",
            el.local_name
        ))),
        Some(_) => Ok(()),
        None if required => Err(violation(format!(
            "{} is missing the {name} attribute",
            el.local_name
        ))),
        None => Ok(()),
    }
}

pub(crate) fn check_boolean(el: &Element, name: &str) -> SamlResult<()> {
    match el.attribute(name) {
        None | Some("true" | "false" | "1" | "0") => Ok(()),
        Some(value) => Err(violation(format!(
            "{name} '{value}' on {} is not an xs:boolean",
            el.local_name
        ))),
    }
}

pub(crate) fn check_non_empty(el: &Element, name: &str) -> SamlResult<()> {
    if required_attribute(el, name)?.trim().is_empty() {
        Err(violation(format!("{name} on {} is empty", el.local_name)))
    } else {
        Ok(())
    }
}
