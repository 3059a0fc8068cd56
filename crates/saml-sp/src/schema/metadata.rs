//! Built-in checks for `saml-schema-metadata-2.0.xsd`.

use super::{
    check_boolean, check_date_time, check_namespace, check_non_empty, check_sequence, is_ncname,
    parse, violation, Particle, SchemaValidator,
};
use crate::error::SamlResult;
use crate::types::constants::{MD_NS, SAML_NS, XMLDSIG_NS};
use crate::xml::{Document, Element};

/// Structural validator for SAML metadata documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataSchema;

impl SchemaValidator for MetadataSchema {
    fn validate(&self, xml: &str) -> SamlResult<()> {
        let doc = parse(xml)?;
        check_namespace(&doc, &[], MD_NS)?;
        match doc.root().local_name.as_str() {
            "EntityDescriptor" => entity_descriptor(&doc, &[]),
            "EntitiesDescriptor" => entities_descriptor(&doc, &[]),
            other => Err(violation(format!("unexpected metadata root {other}"))),
        }
    }
}

const ROLE_DESCRIPTORS: &[&str] = &[
    "RoleDescriptor",
    "IDPSSODescriptor",
    "SPSSODescriptor",
    "AuthnAuthorityDescriptor",
    "AttributeAuthorityDescriptor",
    "PDPDescriptor",
    "AffiliationDescriptor",
];

fn element<'a>(doc: &'a Document, path: &[usize]) -> SamlResult<&'a Element> {
    doc.element_at(path)
        .ok_or_else(|| violation(format!("no element at {path:?}")))
}

fn common_attributes(el: &Element) -> SamlResult<()> {
    if let Some(id) = el.attribute("ID") {
        if !is_ncname(id) {
            return Err(violation(format!("ID '{id}' on {} is not an NCName", el.local_name)));
        }
    }
    check_date_time(el, "validUntil", false)
}

fn entities_descriptor(doc: &Document, path: &[usize]) -> SamlResult<()> {
    common_attributes(element(doc, path)?)?;
    let children = check_sequence(
        doc,
        path,
        &[
            Particle::optional(&["Signature"], XMLDSIG_NS),
            Particle::optional(&["Extensions"], MD_NS),
            Particle::one_or_more(&["EntityDescriptor", "EntitiesDescriptor"], MD_NS),
        ],
    )?;
    for (child, name) in children {
        match name.as_str() {
            "EntityDescriptor" => entity_descriptor(doc, &child)?,
            "EntitiesDescriptor" => entities_descriptor(doc, &child)?,
            _ => {}
        }
    }
    Ok(())
}

fn entity_descriptor(doc: &Document, path: &[usize]) -> SamlResult<()> {
    let el = element(doc, path)?;
    common_attributes(el)?;
    check_non_empty(el, "entityID")?;

    let children = check_sequence(
        doc,
        path,
        &[
            Particle::optional(&["Signature"], XMLDSIG_NS),
            Particle::optional(&["Extensions"], MD_NS),
            Particle::one_or_more(ROLE_DESCRIPTORS, MD_NS),
            Particle::optional(&["Organization"], MD_NS),
            Particle::any_number(&["ContactPerson"], MD_NS),
            Particle::any_number(&["AdditionalMetadataLocation"], MD_NS),
        ],
    )?;

    let affiliations = children
        .iter()
        .filter(|(_, name)| name == "AffiliationDescriptor")
        .count();
    let roles = children
        .iter()
        .filter(|(_, name)| ROLE_DESCRIPTORS.contains(&name.as_str()))
        .count();
    if affiliations > 0 && roles != 1 {
        return Err(violation("AffiliationDescriptor cannot be combined with role descriptors"));
    }

    for (child, name) in children {
        match name.as_str() {
            "IDPSSODescriptor" => idp_sso_descriptor(doc, &child)?,
            "SPSSODescriptor" => sp_sso_descriptor(doc, &child)?,
            "AffiliationDescriptor" => {}
            other if ROLE_DESCRIPTORS.contains(&other) => lax_role_descriptor(doc, &child)?,
            _ => {}
        }
    }
    Ok(())
}

/// Particles every SSO descriptor starts with.
const SSO_DESCRIPTOR: [Particle; 9] = [
    Particle::optional(&["Signature"], XMLDSIG_NS),
    Particle::optional(&["Extensions"], MD_NS),
    Particle::any_number(&["KeyDescriptor"], MD_NS),
    Particle::optional(&["Organization"], MD_NS),
    Particle::any_number(&["ContactPerson"], MD_NS),
    Particle::any_number(&["ArtifactResolutionService"], MD_NS),
    Particle::any_number(&["SingleLogoutService"], MD_NS),
    Particle::any_number(&["ManageNameIDService"], MD_NS),
    Particle::any_number(&["NameIDFormat"], MD_NS),
];

fn idp_sso_descriptor(doc: &Document, path: &[usize]) -> SamlResult<()> {
    let el = element(doc, path)?;
    role_attributes(el)?;
    check_boolean(el, "WantAuthnRequestsSigned")?;

    let particles: Vec<Particle> = SSO_DESCRIPTOR
        .iter()
        .copied()
        .chain([
            Particle::one_or_more(&["SingleSignOnService"], MD_NS),
            Particle::any_number(&["NameIDMappingService"], MD_NS),
            Particle::any_number(&["AssertionIDRequestService"], MD_NS),
            Particle::any_number(&["AttributeProfile"], MD_NS),
            Particle::any_number(&["Attribute"], SAML_NS),
        ])
        .collect();
    let children = check_sequence(doc, path, &particles)?;
    role_children(doc, children)
}

fn sp_sso_descriptor(doc: &Document, path: &[usize]) -> SamlResult<()> {
    let el = element(doc, path)?;
    role_attributes(el)?;
    check_boolean(el, "AuthnRequestsSigned")?;
    check_boolean(el, "WantAssertionsSigned")?;

    let particles: Vec<Particle> = SSO_DESCRIPTOR
        .iter()
        .copied()
        .chain([
            Particle::one_or_more(&["AssertionConsumerService"], MD_NS),
            Particle::any_number(&["AttributeConsumingService"], MD_NS),
        ])
        .collect();
    let children = check_sequence(doc, path, &particles)?;
    role_children(doc, children)
}

/// `RoleDescriptor` and the remaining descriptor types carry extension
/// content; only their keys and endpoints are checked.
fn lax_role_descriptor(doc: &Document, path: &[usize]) -> SamlResult<()> {
    let el = element(doc, path)?;
    role_attributes(el)?;
    let children = el
        .indexed_child_elements()
        .map(|(index, child)| {
            let mut child_path = path.to_vec();
            child_path.push(index);
            (child_path, child.local_name.clone())
        })
        .filter(|(child_path, _)| doc.namespace_of(child_path).as_deref() == Some(MD_NS))
        .collect();
    role_children(doc, children)
}

fn role_attributes(el: &Element) -> SamlResult<()> {
    common_attributes(el)?;
    check_non_empty(el, "protocolSupportEnumeration")
}

fn role_children(doc: &Document, children: Vec<(Vec<usize>, String)>) -> SamlResult<()> {
    for (child, name) in children {
        let el = element(doc, &child)?;
        match name.as_str() {
            "KeyDescriptor" => key_descriptor(doc, &child, el)?,
            "ArtifactResolutionService" | "AssertionConsumerService" => indexed_endpoint(el)?,
            "SingleLogoutService"
            | "ManageNameIDService"
            | "SingleSignOnService"
            | "NameIDMappingService"
            | "AssertionIDRequestService" => endpoint(el)?,
            _ => {}
        }
    }
    Ok(())
}

fn key_descriptor(doc: &Document, path: &[usize], el: &Element) -> SamlResult<()> {
    match el.attribute("use") {
        None | Some("signing" | "encryption") => {}
        Some(other) => return Err(violation(format!("KeyDescriptor use '{other}' is not a KeyTypes value"))),
    }
    check_sequence(
        doc,
        path,
        &[
            Particle::required(&["KeyInfo"], XMLDSIG_NS),
            Particle::any_number(&["EncryptionMethod"], MD_NS),
        ],
    )?;
    Ok(())
}

fn endpoint(el: &Element) -> SamlResult<()> {
    check_non_empty(el, "Binding")?;
    check_non_empty(el, "Location")
}

fn indexed_endpoint(el: &Element) -> SamlResult<()> {
    endpoint(el)?;
    check_boolean(el, "isDefault")?;
    let index = el
        .attribute("index")
        .ok_or_else(|| violation(format!("{} is missing the index attribute", el.local_name)))?;
    index
        .parse::<u16>()
        .map(|_| ())
        .map_err(|_| violation(format!("index '{index}' is not an unsignedShort")))
}
