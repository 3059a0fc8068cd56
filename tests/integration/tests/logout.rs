//! Single logout tests.

use std::collections::BTreeMap;

use chrono::Utc;
use saml_sp::bindings::{HttpPostBinding, HttpRedirectBinding, SamlMessageType};
use saml_sp::{InboundMessage, Preferences, SamlError};

use crate::common::{provider, TestIdp, IDP_ID, SP_SLO};

/// A logout request with a detached redirect signature is accepted.
#[test]
fn test_redirect_logout_request() -> anyhow::Result<()> {
    let sp = provider(Preferences::default())?;
    let idp = TestIdp::new()?;

    let raw_query = idp.signed_redirect_query(&idp.logout_request(Utc::now()), Some("bye"))?;
    let request = sp.parse_logout_request(&InboundMessage::Redirect { raw_query })?;

    assert_eq!(request.id, "_logout-1");
    assert_eq!(request.issuer, IDP_ID);
    assert_eq!(request.destination.as_deref(), Some(SP_SLO));
    assert_eq!(request.names, vec!["user@example.com"]);
    Ok(())
}

/// Changing any signed query parameter breaks the detached signature.
#[test]
fn test_redirect_logout_request_tampered_relay_state() -> anyhow::Result<()> {
    let sp = provider(Preferences::default())?;
    let idp = TestIdp::new()?;

    let raw_query = idp
        .signed_redirect_query(&idp.logout_request(Utc::now()), Some("bye"))?
        .replace("RelayState=bye", "RelayState=evil");
    let err = sp.parse_logout_request(&InboundMessage::Redirect { raw_query }).unwrap_err();
    assert!(matches!(err, SamlError::InvalidSignature(_)), "got {err:?}");
    Ok(())
}

/// An encoded duplicate of a signed parameter cannot replace the signed
/// message.
#[test]
fn test_redirect_logout_request_smuggled_message() -> anyhow::Result<()> {
    let sp = provider(Preferences::default())?;
    let idp = TestIdp::new()?;

    let signed = idp.signed_redirect_query(&idp.logout_request(Utc::now()), Some("bye"))?;
    let forged = idp
        .logout_request(Utc::now())
        .replace("user@example.com", "victim@example.com");
    let smuggled = HttpRedirectBinding::encode_query(&forged, None, SamlMessageType::Request)?
        .replacen("SAMLRequest=", "SAML%52equest=", 1);

    let raw_query = format!("{signed}&{smuggled}");
    let err = sp.parse_logout_request(&InboundMessage::Redirect { raw_query }).unwrap_err();
    assert!(matches!(err, SamlError::InvalidRequest(_)), "got {err:?}");
    Ok(())
}

/// A POSTed logout request must carry an embedded signature over the root.
#[test]
fn test_post_logout_request() -> anyhow::Result<()> {
    let sp = provider(Preferences::default())?;
    let idp = TestIdp::new()?;
    let xml = idp.logout_request(Utc::now());

    let signed = HttpPostBinding::encode_request_fields(&idp.sign(&xml)?, None);
    let request = sp.parse_logout_request(&InboundMessage::Post { fields: signed })?;
    assert_eq!(request.names, vec!["user@example.com"]);

    let unsigned = HttpPostBinding::encode_request_fields(&xml, None);
    let err = sp.parse_logout_request(&InboundMessage::Post { fields: unsigned }).unwrap_err();
    assert!(matches!(err, SamlError::NoSignature), "got {err:?}");
    Ok(())
}

/// Logout requests are trusted only from the configured identity provider.
#[test]
fn test_logout_request_from_rogue_idp() -> anyhow::Result<()> {
    let sp = provider(Preferences::default())?;

    let rogue = TestIdp::rogue()?;
    let fields = HttpPostBinding::encode_request_fields(&rogue.sign(&rogue.logout_request(Utc::now()))?, None);
    let err = sp.parse_logout_request(&InboundMessage::Post { fields }).unwrap_err();
    assert!(matches!(err, SamlError::UntrustedCertificate), "got {err:?}");

    let mut other = TestIdp::new()?;
    other.issuer = "https://other-idp.example.com".to_string();
    let fields = HttpPostBinding::encode_request_fields(&other.sign(&other.logout_request(Utc::now()))?, None);
    let err = sp.parse_logout_request(&InboundMessage::Post { fields }).unwrap_err();
    assert!(matches!(err, SamlError::UnknownIssuer { .. }), "got {err:?}");
    Ok(())
}

/// Only requests are accepted on the logout endpoint.
#[test]
fn test_logout_endpoint_rejects_responses() -> anyhow::Result<()> {
    let sp = provider(Preferences::default())?;
    let idp = TestIdp::new()?;

    let fields = HttpPostBinding::encode_response_fields(&idp.logout_request(Utc::now()), None);
    assert!(sp.parse_logout_request(&InboundMessage::Post { fields }).is_err());
    assert!(sp
        .parse_logout_request(&InboundMessage::Post { fields: BTreeMap::new() })
        .is_err());
    Ok(())
}
