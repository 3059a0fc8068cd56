//! Logout requests sent by the identity provider.

use serde::Serialize;
use tracing::{debug, warn};

use crate::bindings::{HttpPostBinding, InboundMessage, RedirectQuery, SamlMessageType};
use crate::error::{SamlError, SamlResult};
use crate::response::checks::check_issuer;
use crate::schema::{SamlSchema, SchemaSet};
use crate::signature::SignatureVerifier;
use crate::types::IdentityProviderTrust;
use crate::xml::{Document, Element};

/// The parts of a `samlp:LogoutRequest` the service provider acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogoutRequest {
    /// Request `ID`.
    pub id: String,
    /// `IssueInstant`, as sent.
    pub issue_instant: String,
    /// `Destination`, when present.
    pub destination: Option<String>,
    /// Issuer entity id.
    pub issuer: String,
    /// Every `NameID` value.
    pub names: Vec<String>,
}

/// Reads a logout request. Signatures are not checked here.
pub fn extract(xml: &str) -> SamlResult<LogoutRequest> {
    let doc = Document::parse(xml)?;
    let root = doc.root();
    if root.local_name != "LogoutRequest" {
        return Err(SamlError::MissingElement("LogoutRequest".to_string()));
    }

    let required = |name: &str| {
        root.attribute(name)
            .map(String::from)
            .ok_or_else(|| SamlError::MissingElement(format!("LogoutRequest/@{name}")))
    };

    Ok(LogoutRequest {
        id: required("ID")?,
        issue_instant: required("IssueInstant")?,
        destination: root.attribute("Destination").map(String::from),
        issuer: root
            .child("Issuer")
            .map(Element::trimmed_text)
            .ok_or_else(|| SamlError::MissingElement("LogoutRequest/Issuer".to_string()))?,
        names: root.children_named("NameID").map(Element::trimmed_text).collect(),
    })
}

/// Decodes, validates and verifies a logout request from the identity
/// provider.
///
/// An embedded signature must cover the whole request. Over HTTP-Redirect a
/// detached `SigAlg`/`Signature` pair is accepted instead.
pub(crate) fn parse_logout_request(
    message: &InboundMessage,
    idp: &IdentityProviderTrust,
    schemas: &SchemaSet,
) -> SamlResult<LogoutRequest> {
    let result = verify_and_extract(message, idp, schemas);
    if let Err(err) = &result {
        warn!(error = %err, category = ?err.category(), "rejected logout request");
    }
    result
}

fn verify_and_extract(
    message: &InboundMessage,
    idp: &IdentityProviderTrust,
    schemas: &SchemaSet,
) -> SamlResult<LogoutRequest> {
    let (decoded, redirect) = match message {
        InboundMessage::Redirect { raw_query } => {
            let query = RedirectQuery::parse(raw_query)?;
            (query.decode()?, Some(query))
        }
        InboundMessage::Post { fields } => (HttpPostBinding::decode_fields(fields)?, None),
    };
    if decoded.message_type != SamlMessageType::Request {
        return Err(SamlError::MissingElement("SAMLRequest".to_string()));
    }

    schemas.validate(SamlSchema::Protocol, &decoded.xml)?;

    let doc = Document::parse(&decoded.xml)?;
    let verifier = SignatureVerifier::new(&idp.signature);
    match &redirect {
        Some(query) if query.signature.is_some() => {
            verifier.verify_redirect_query(query)?;
            debug!("logout request carries a valid detached signature");
        }
        _ => {
            let signed = verifier.verify_document(&doc)?;
            if !signed.iter().any(Vec::is_empty) {
                return Err(SamlError::NoSignature);
            }
        }
    }

    let request = extract(&decoded.xml)?;
    check_issuer(&request.issuer, &idp.id)?;
    debug!(request_id = %request.id, names = request.names.len(), "logout request accepted");
    Ok(request)
}
