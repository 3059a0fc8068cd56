//! Built-in checks for `saml-schema-protocol-2.0.xsd`.

use super::{
    check_boolean, check_date_time, check_id, check_namespace, check_non_empty, check_sequence,
    parse, required_attribute, violation, Particle, SchemaValidator,
};
use crate::error::SamlResult;
use crate::types::constants::{SAMLP_NS, SAML_NS, XMLDSIG_NS, XMLENC_NS};
use crate::xml::{Document, Element};

/// Structural validator for SAML protocol messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtocolSchema;

impl SchemaValidator for ProtocolSchema {
    fn validate(&self, xml: &str) -> SamlResult<()> {
        let doc = parse(xml)?;
        check_namespace(&doc, &[], SAMLP_NS)?;

        match doc.root().local_name.as_str() {
            "AuthnRequest" => authn_request(&doc),
            "Response" => response(&doc),
            "LogoutRequest" => logout_request(&doc),
            "LogoutResponse" => logout_response(&doc),
            other => Err(violation(format!("unsupported protocol message {other}"))),
        }
    }
}

const HEADER: [Particle; 3] = [
    Particle::optional(&["Issuer"], SAML_NS),
    Particle::optional(&["Signature"], XMLDSIG_NS),
    Particle::optional(&["Extensions"], SAMLP_NS),
];

fn with_header(rest: &[Particle]) -> Vec<Particle> {
    HEADER.iter().chain(rest).copied().collect()
}

/// Attributes shared by every request and status response.
fn message_attributes(doc: &Document) -> SamlResult<()> {
    let root = doc.root();
    check_id(root, "ID")?;
    check_version(root)?;
    check_date_time(root, "IssueInstant", true)
}

fn check_version(el: &Element) -> SamlResult<()> {
    match required_attribute(el, "Version")? {
        "2.0" => Ok(()),
        other => Err(violation(format!("unsupported Version {other} on {}", el.local_name))),
    }
}

fn authn_request(doc: &Document) -> SamlResult<()> {
    message_attributes(doc)?;
    let root = doc.root();
    check_boolean(root, "ForceAuthn")?;
    check_boolean(root, "IsPassive")?;
    if let Some(index) = root.attribute("AssertionConsumerServiceIndex") {
        index
            .parse::<u16>()
            .map_err(|_| violation(format!("AssertionConsumerServiceIndex '{index}' is not an unsignedShort")))?;
    }

    let children = check_sequence(
        doc,
        &[],
        &with_header(&[
            Particle::optional(&["Subject"], SAML_NS),
            Particle::optional(&["NameIDPolicy"], SAMLP_NS),
            Particle::optional(&["Conditions"], SAML_NS),
            Particle::optional(&["RequestedAuthnContext"], SAMLP_NS),
            Particle::optional(&["Scoping"], SAMLP_NS),
        ]),
    )?;

    for (path, name) in children {
        match name.as_str() {
            "NameIDPolicy" => {
                if let Some(el) = doc.element_at(&path) {
                    check_boolean(el, "AllowCreate")?;
                }
            }
            "Conditions" => conditions(doc, &path)?,
            "Subject" => subject(doc, &path)?,
            _ => {}
        }
    }
    Ok(())
}

fn response(doc: &Document) -> SamlResult<()> {
    message_attributes(doc)?;
    let children = check_sequence(
        doc,
        &[],
        &with_header(&[
            Particle::required(&["Status"], SAMLP_NS),
            Particle::any_number(&["Assertion", "EncryptedAssertion"], SAML_NS),
        ]),
    )?;

    for (path, name) in children {
        match name.as_str() {
            "Status" => status(doc, &path)?,
            "Assertion" => assertion(doc, &path)?,
            "EncryptedAssertion" => encrypted_element(doc, &path)?,
            _ => {}
        }
    }
    Ok(())
}

fn logout_request(doc: &Document) -> SamlResult<()> {
    message_attributes(doc)?;
    check_date_time(doc.root(), "NotOnOrAfter", false)?;
    check_sequence(
        doc,
        &[],
        &with_header(&[
            Particle::required(&["BaseID", "NameID", "EncryptedID"], SAML_NS),
            Particle::any_number(&["SessionIndex"], SAMLP_NS),
        ]),
    )?;
    Ok(())
}

fn logout_response(doc: &Document) -> SamlResult<()> {
    message_attributes(doc)?;
    let children = check_sequence(
        doc,
        &[],
        &with_header(&[Particle::required(&["Status"], SAMLP_NS)]),
    )?;
    for (path, name) in children {
        if name == "Status" {
            status(doc, &path)?;
        }
    }
    Ok(())
}

fn status(doc: &Document, path: &[usize]) -> SamlResult<()> {
    let children = check_sequence(
        doc,
        path,
        &[
            Particle::required(&["StatusCode"], SAMLP_NS),
            Particle::optional(&["StatusMessage"], SAMLP_NS),
            Particle::optional(&["StatusDetail"], SAMLP_NS),
        ],
    )?;
    for (child, name) in children {
        if name == "StatusCode" {
            status_code(doc, &child)?;
        }
    }
    Ok(())
}

fn status_code(doc: &Document, path: &[usize]) -> SamlResult<()> {
    let el = doc
        .element_at(path)
        .ok_or_else(|| violation("StatusCode vanished"))?;
    check_non_empty(el, "Value")?;
    let nested = check_sequence(doc, path, &[Particle::optional(&["StatusCode"], SAMLP_NS)])?;
    for (child, _) in nested {
        status_code(doc, &child)?;
    }
    Ok(())
}

fn assertion(doc: &Document, path: &[usize]) -> SamlResult<()> {
    let el = doc
        .element_at(path)
        .ok_or_else(|| violation("Assertion vanished"))?;
    check_id(el, "ID")?;
    check_version(el)?;
    check_date_time(el, "IssueInstant", true)?;

    let children = check_sequence(
        doc,
        path,
        &[
            Particle::required(&["Issuer"], SAML_NS),
            Particle::optional(&["Signature"], XMLDSIG_NS),
            Particle::optional(&["Subject"], SAML_NS),
            Particle::optional(&["Conditions"], SAML_NS),
            Particle::optional(&["Advice"], SAML_NS),
            Particle::any_number(
                &["Statement", "AuthnStatement", "AuthzDecisionStatement", "AttributeStatement"],
                SAML_NS,
            ),
        ],
    )?;

    for (child, name) in children {
        match name.as_str() {
            "Subject" => subject(doc, &child)?,
            "Conditions" => conditions(doc, &child)?,
            "AuthnStatement" => authn_statement(doc, &child)?,
            "AttributeStatement" => attribute_statement(doc, &child)?,
            _ => {}
        }
    }
    Ok(())
}

fn subject(doc: &Document, path: &[usize]) -> SamlResult<()> {
    let children = check_sequence(
        doc,
        path,
        &[
            Particle::optional(&["BaseID", "NameID", "EncryptedID"], SAML_NS),
            Particle::any_number(&["SubjectConfirmation"], SAML_NS),
        ],
    )?;
    if children.is_empty() {
        return Err(violation("Subject must contain an identifier or a SubjectConfirmation"));
    }
    for (child, name) in children {
        if name == "SubjectConfirmation" {
            let el = doc
                .element_at(&child)
                .ok_or_else(|| violation("SubjectConfirmation vanished"))?;
            check_non_empty(el, "Method")?;
            if let Some(data) = el.child("SubjectConfirmationData") {
                check_date_time(data, "NotBefore", false)?;
                check_date_time(data, "NotOnOrAfter", false)?;
            }
        }
    }
    Ok(())
}

fn conditions(doc: &Document, path: &[usize]) -> SamlResult<()> {
    let el = doc
        .element_at(path)
        .ok_or_else(|| violation("Conditions vanished"))?;
    check_date_time(el, "NotBefore", false)?;
    check_date_time(el, "NotOnOrAfter", false)?;

    let children = check_sequence(
        doc,
        path,
        &[Particle::any_number(
            &["Condition", "AudienceRestriction", "OneTimeUse", "ProxyRestriction"],
            SAML_NS,
        )],
    )?;
    for (child, name) in children {
        if name == "AudienceRestriction" {
            check_sequence(doc, &child, &[Particle::one_or_more(&["Audience"], SAML_NS)])?;
        }
    }
    Ok(())
}

fn authn_statement(doc: &Document, path: &[usize]) -> SamlResult<()> {
    let el = doc
        .element_at(path)
        .ok_or_else(|| violation("AuthnStatement vanished"))?;
    check_date_time(el, "AuthnInstant", true)?;
    check_date_time(el, "SessionNotOnOrAfter", false)?;
    check_sequence(
        doc,
        path,
        &[
            Particle::optional(&["SubjectLocality"], SAML_NS),
            Particle::required(&["AuthnContext"], SAML_NS),
        ],
    )?;
    Ok(())
}

fn attribute_statement(doc: &Document, path: &[usize]) -> SamlResult<()> {
    let children = check_sequence(
        doc,
        path,
        &[Particle::one_or_more(&["Attribute", "EncryptedAttribute"], SAML_NS)],
    )?;
    for (child, name) in children {
        if name == "Attribute" {
            let el = doc
                .element_at(&child)
                .ok_or_else(|| violation("Attribute vanished"))?;
            required_attribute(el, "Name")?;
            check_sequence(doc, &child, &[Particle::any_number(&["AttributeValue"], SAML_NS)])?;
        } else {
            encrypted_element(doc, &child)?;
        }
    }
    Ok(())
}

/// `saml:EncryptedElementType`: the ciphertext itself is opaque.
fn encrypted_element(doc: &Document, path: &[usize]) -> SamlResult<()> {
    check_sequence(
        doc,
        path,
        &[
            Particle::required(&["EncryptedData"], XMLENC_NS),
            Particle::any_number(&["EncryptedKey"], XMLENC_NS),
        ],
    )?;
    Ok(())
}
