//! Reading a verified `samlp:Response` into typed values.

use chrono::{DateTime, Utc};

use crate::error::{SamlError, SamlResult};
use crate::schema::parse_date_time;
use crate::types::{Assertion, LoginResponse, Preferences};
use crate::xml::{Document, Element, NodePath};

/// A parsed response and the paths of its assertions.
pub(crate) struct ParsedResponse {
    pub response: LoginResponse,
    pub assertion_paths: Vec<NodePath>,
}

pub(crate) fn parse_response(doc: &Document, preferences: &Preferences) -> SamlResult<ParsedResponse> {
    let root = doc.root();
    if root.local_name != "Response" {
        return Err(SamlError::MissingElement("Response".to_string()));
    }

    let id = root
        .attribute("ID")
        .ok_or_else(|| SamlError::MissingElement("Response/@ID".to_string()))?
        .to_string();
    let in_response_to = root.attribute("InResponseTo").map(String::from);
    let issuer = root.child("Issuer").map(Element::trimmed_text).unwrap_or_default();

    let status_codes = root
        .child("Status")
        .map(status_codes)
        .ok_or_else(|| SamlError::MissingElement("Status".to_string()))?;

    let mut assertions = Vec::new();
    let mut assertion_paths = Vec::new();
    for (index, el) in root.indexed_child_elements() {
        if el.local_name == "Assertion" {
            assertions.push(parse_assertion(el, preferences)?);
            assertion_paths.push(vec![index]);
        }
    }

    Ok(ParsedResponse {
        response: LoginResponse::new(id, in_response_to, issuer, status_codes, assertions),
        assertion_paths,
    })
}

/// Every `StatusCode` value, from the top-level code down the nesting.
fn status_codes(status: &Element) -> Vec<String> {
    let mut codes = Vec::new();
    let mut current = status.child("StatusCode");
    while let Some(code) = current {
        if let Some(value) = code.attribute("Value") {
            codes.push(value.to_string());
        }
        current = code.child("StatusCode");
    }
    codes
}

fn parse_assertion(el: &Element, preferences: &Preferences) -> SamlResult<Assertion> {
    let issuer = el
        .child("Issuer")
        .map(Element::trimmed_text)
        .ok_or_else(|| SamlError::MissingElement("Assertion/Issuer".to_string()))?;
    let mut assertion = Assertion::new(issuer);

    assertion.subject = el
        .child("Subject")
        .and_then(|subject| subject.child("NameID"))
        .map(Element::trimmed_text);

    assertion.session_index = el
        .child("AuthnStatement")
        .and_then(|statement| statement.attribute("SessionIndex"))
        .map(String::from);

    if let Some(conditions) = el.child("Conditions") {
        assertion.not_before = time_bound(conditions, "NotBefore")?;
        assertion.not_on_or_after = time_bound(conditions, "NotOnOrAfter")?;
        assertion.audience = conditions
            .child("AudienceRestriction")
            .and_then(|restriction| restriction.child("Audience"))
            .map(Element::trimmed_text);
    }

    for statement in el.children_named("AttributeStatement") {
        for attribute in statement.children_named("Attribute") {
            let Some(name) = attribute.attribute("Name") else {
                continue;
            };
            let value = attribute
                .child("AttributeValue")
                .map(Element::text)
                .unwrap_or_default();
            assertion
                .attributes
                .entry(preferences.map_attribute(name).to_string())
                .or_insert(value);
        }
    }

    Ok(assertion)
}

/// A validity bound. A present but unreadable value is an error rather than
/// an absent (unbounded) one; decrypted assertions never pass the schema.
fn time_bound(conditions: &Element, name: &str) -> SamlResult<Option<DateTime<Utc>>> {
    conditions
        .attribute(name)
        .map(|value| {
            parse_date_time(value).ok_or_else(|| {
                SamlError::SchemaViolation(format!("Conditions/@{name} '{value}' is not an xs:dateTime"))
            })
        })
        .transpose()
}
