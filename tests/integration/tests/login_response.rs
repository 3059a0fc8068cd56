//! Login response pipeline tests.

use base64::Engine;
use chrono::{Duration, Utc};
use saml_sp::error::ErrorCategory;
use saml_sp::{Certificate, Preferences, SamlError, ServiceProvider, SignatureAlgorithm};

use crate::common::{
    idp_trust, post_form, provider, sp_config, AssertionSpec, TestIdp, EMAIL_CLAIM, IDP_ID, SP_CERT, SP_KEY,
};

fn mapped_preferences() -> Preferences {
    Preferences::default().with_attribute_mapping(EMAIL_CLAIM, "email")
}

/// A signed response is accepted and attributes are remapped.
#[test]
fn test_signed_response_is_accepted() -> anyhow::Result<()> {
    let now = Utc::now();
    let sp = provider(mapped_preferences())?;
    let idp = TestIdp::new()?;

    let xml = idp.signed_response(&AssertionSpec::new(now), now)?;
    let result = sp.parse_login_response_at(&post_form(&xml, Some("/dashboard")), now)?;

    assert_eq!(result.relay_state.as_deref(), Some("/dashboard"));
    let response = result.response;
    assert_eq!(response.id, "_response-1");
    assert_eq!(response.in_response_to.as_deref(), Some("_req-0"));
    assert_eq!(response.issuer, IDP_ID);
    assert_eq!(response.subject(), Some("user@example.com"));

    let assertion = &response.assertions[0];
    assert_eq!(assertion.session_index.as_deref(), Some("_session-1"));
    assert_eq!(assertion.attributes.get("email").map(String::as_str), Some("user@example.com"));
    assert_eq!(assertion.attributes.get("department").map(String::as_str), Some("Engineering"));
    assert!(!assertion.attributes.contains_key(EMAIL_CLAIM));

    Ok(())
}

/// A whole-response signature covers the assertions inside it.
#[test]
fn test_response_level_signature_is_accepted() -> anyhow::Result<()> {
    let now = Utc::now();
    let sp = provider(Preferences::default())?;
    let idp = TestIdp::new()?;

    let xml = idp.sign(&idp.response(&AssertionSpec::new(now).render(now), now))?;
    let result = sp.parse_login_response_at(&post_form(&xml, None), now)?;

    assert_eq!(result.relay_state, None);
    assert_eq!(result.response.assertions.len(), 1);
    Ok(())
}

/// An encrypted, signed assertion is decrypted with the SP key and verified.
#[test]
fn test_encrypted_assertion_is_accepted() -> anyhow::Result<()> {
    let now = Utc::now();
    let sp = provider(mapped_preferences())?;
    let idp = TestIdp::new()?;

    let xml = idp.encrypted_response(&AssertionSpec::new(now), now)?;
    assert!(xml.contains("EncryptedAssertion"));
    let result = sp.parse_login_response_at(&post_form(&xml, None), now)?;

    assert_eq!(result.response.subject(), Some("user@example.com"));
    assert_eq!(
        result.response.assertions[0].attributes.get("email").map(String::as_str),
        Some("user@example.com")
    );
    Ok(())
}

/// Without a currently valid encryption certificate nothing is decrypted.
#[test]
fn test_encrypted_assertion_needs_valid_encryption_certificate() -> anyhow::Result<()> {
    let now = Utc::now();
    let expired = Certificate::new(SP_CERT, SP_KEY, SignatureAlgorithm::RsaSha256, now - Duration::days(1));
    let sp = ServiceProvider::builder(sp_config().with_encryption(vec![expired]), idp_trust()).build()?;
    let idp = TestIdp::new()?;

    let xml = idp.encrypted_response(&AssertionSpec::new(now), now)?;
    let err = sp.parse_login_response_at(&post_form(&xml, None), now).unwrap_err();
    assert!(matches!(err, SamlError::NoValidCertificate), "got {err:?}");
    Ok(())
}

/// A correctly signed response from the wrong issuer is rejected.
#[test]
fn test_unknown_issuer_is_rejected() -> anyhow::Result<()> {
    let now = Utc::now();
    let sp = provider(Preferences::default())?;
    let mut idp = TestIdp::new()?;
    idp.issuer = "https://other-idp.example.com".to_string();

    let xml = idp.signed_response(&AssertionSpec::new(now), now)?;
    let err = sp.parse_login_response_at(&post_form(&xml, None), now).unwrap_err();

    assert!(
        matches!(&err, SamlError::UnknownIssuer { expected, actual }
            if expected == IDP_ID && actual == "https://other-idp.example.com"),
        "got {err:?}"
    );
    assert_eq!(err.category(), ErrorCategory::Semantic);
    Ok(())
}

/// Each assertion must also name the configured identity provider.
#[test]
fn test_assertion_from_other_issuer_is_rejected() -> anyhow::Result<()> {
    let now = Utc::now();
    let sp = provider(Preferences::default())?;
    let idp = TestIdp::new()?;

    let mut spec = AssertionSpec::new(now);
    spec.issuer = "https://other-idp.example.com".to_string();
    let xml = idp.signed_response(&spec, now)?;
    let err = sp.parse_login_response_at(&post_form(&xml, None), now).unwrap_err();

    assert!(
        matches!(&err, SamlError::UnknownIssuer { actual, .. } if actual == "https://other-idp.example.com"),
        "got {err:?}"
    );
    Ok(())
}

/// Unsigned responses are never trusted.
#[test]
fn test_unsigned_response_is_rejected() -> anyhow::Result<()> {
    let now = Utc::now();
    let sp = provider(Preferences::default())?;
    let idp = TestIdp::new()?;

    let xml = idp.response(&AssertionSpec::new(now).render(now), now);
    let err = sp.parse_login_response_at(&post_form(&xml, None), now).unwrap_err();
    assert!(matches!(err, SamlError::NoSignature), "got {err:?}");
    assert!(err.is_trust_error());
    Ok(())
}

/// A valid signature by a certificate outside the allow-list is rejected.
#[test]
fn test_untrusted_certificate_is_rejected() -> anyhow::Result<()> {
    let now = Utc::now();
    let sp = provider(Preferences::default())?;
    let rogue = TestIdp::rogue()?;

    let xml = rogue.signed_response(&AssertionSpec::new(now), now)?;
    let err = sp.parse_login_response_at(&post_form(&xml, None), now).unwrap_err();
    assert!(matches!(err, SamlError::UntrustedCertificate), "got {err:?}");
    Ok(())
}

/// Any change to signed content breaks the signature.
#[test]
fn test_tampered_assertion_is_rejected() -> anyhow::Result<()> {
    let now = Utc::now();
    let sp = provider(Preferences::default())?;
    let idp = TestIdp::new()?;

    let xml = idp
        .signed_response(&AssertionSpec::new(now), now)?
        .replace("Engineering", "Finance");
    let err = sp.parse_login_response_at(&post_form(&xml, None), now).unwrap_err();
    assert!(matches!(err, SamlError::InvalidSignature(_)), "got {err:?}");
    Ok(())
}

/// An unsigned assertion injected next to a signed one is not trusted.
#[test]
fn test_injected_assertion_is_rejected() -> anyhow::Result<()> {
    let now = Utc::now();
    let sp = provider(Preferences::default())?;
    let idp = TestIdp::new()?;

    let mut evil = AssertionSpec::new(now);
    evil.id = "_assertion-evil".to_string();
    evil.subject = "admin@example.com".to_string();

    let xml = idp.signed_response(&AssertionSpec::new(now), now)?.replacen(
        "</samlp:Status>",
        &format!("</samlp:Status>{}", evil.render(now)),
        1,
    );
    let err = sp.parse_login_response_at(&post_form(&xml, None), now).unwrap_err();
    assert!(matches!(err, SamlError::NoSignature), "got {err:?}");
    Ok(())
}

/// Assertions for another audience are rejected.
#[test]
fn test_wrong_audience_is_rejected() -> anyhow::Result<()> {
    let now = Utc::now();
    let sp = provider(Preferences::default())?;
    let idp = TestIdp::new()?;

    let mut spec = AssertionSpec::new(now);
    spec.audience = "https://other-sp.example.com".to_string();
    let xml = idp.signed_response(&spec, now)?;
    let err = sp.parse_login_response_at(&post_form(&xml, None), now).unwrap_err();
    assert!(matches!(err, SamlError::UnexpectedAudience { .. }), "got {err:?}");
    Ok(())
}

/// Assertions outside their validity window are rejected.
#[test]
fn test_expired_assertion_is_rejected() -> anyhow::Result<()> {
    let now = Utc::now();
    let sp = provider(Preferences::default())?;
    let idp = TestIdp::new()?;

    let mut spec = AssertionSpec::new(now);
    spec.not_before = Some(now - Duration::minutes(10));
    spec.not_on_or_after = Some(now - Duration::seconds(1));
    let xml = idp.signed_response(&spec, now)?;
    let err = sp.parse_login_response_at(&post_form(&xml, None), now).unwrap_err();
    assert!(matches!(err, SamlError::AssertionExpired), "got {err:?}");
    Ok(())
}

/// An unreadable bound inside an encrypted assertion fails instead of
/// leaving the window open.
#[test]
fn test_encrypted_assertion_with_unreadable_bound_is_rejected() -> anyhow::Result<()> {
    let now = Utc::now();
    let sp = provider(Preferences::default())?;
    let idp = TestIdp::new()?;

    let mut spec = AssertionSpec::new(now);
    spec.not_on_or_after = None;
    let assertion = spec.render(now).replacen(
        "<saml:Conditions",
        r#"<saml:Conditions NotOnOrAfter="2016-01-01T00:00:00 UTC""#,
        1,
    );
    let xml = idp.encrypted_markup_response(&assertion, &spec.id, now)?;
    let err = sp.parse_login_response_at(&post_form(&xml, None), now).unwrap_err();
    assert!(matches!(err, SamlError::SchemaViolation(_)), "got {err:?}");
    Ok(())
}

/// Missing bounds pass by default and fail under strict time checks.
#[test]
fn test_strict_time_check() -> anyhow::Result<()> {
    let now = Utc::now();
    let idp = TestIdp::new()?;
    let mut spec = AssertionSpec::new(now);
    spec.not_before = None;
    let form = post_form(&idp.signed_response(&spec, now)?, None);

    assert!(provider(Preferences::default())?.parse_login_response_at(&form, now).is_ok());

    let strict = provider(Preferences::default().with_strict_time_check(true))?;
    let err = strict.parse_login_response_at(&form, now).unwrap_err();
    assert!(matches!(err, SamlError::AssertionExpired), "got {err:?}");
    Ok(())
}

/// Status codes outside the permitted set are rejected.
#[test]
fn test_unknown_status_code_is_rejected() -> anyhow::Result<()> {
    let now = Utc::now();
    let sp = provider(Preferences::default())?;
    let mut idp = TestIdp::new()?;
    idp.status = "urn:oasis:names:tc:SAML:2.0:status:Unknown".to_string();

    let xml = idp.signed_response(&AssertionSpec::new(now), now)?;
    let err = sp.parse_login_response_at(&post_form(&xml, None), now).unwrap_err();
    assert!(matches!(err, SamlError::InvalidStatusCode(code) if code.ends_with(":Unknown")));
    Ok(())
}

/// Deeply nested payloads are refused by the parser instead of exhausting
/// the stack.
#[test]
fn test_deeply_nested_response_is_rejected() -> anyhow::Result<()> {
    let sp = provider(Preferences::default())?;
    let depth = 200_000;
    let xml = format!(
        concat!(
            r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="_r" Version="2.0" IssueInstant="2024-01-01T00:00:00Z">"#,
            "<samlp:Extensions>{open}{close}</samlp:Extensions>",
            "</samlp:Response>"
        ),
        open = "<a>".repeat(depth),
        close = "</a>".repeat(depth),
    );

    let err = sp.parse_login_response(&post_form(&xml, None)).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Input, "got {err:?}");
    Ok(())
}

/// Transport and structural problems are input errors.
#[test]
fn test_malformed_input_is_rejected() -> anyhow::Result<()> {
    let sp = provider(Preferences::default())?;

    let err = sp.parse_login_response(&post_form("", None)).unwrap_err();
    assert!(matches!(err, SamlError::EmptyResponse), "got {err:?}");

    let no_status = r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="_r" Version="2.0" IssueInstant="2024-01-01T00:00:00Z"/>"#;
    let err = sp.parse_login_response(&post_form(no_status, None)).unwrap_err();
    assert!(matches!(err, SamlError::SchemaViolation(_)), "got {err:?}");

    let mut form = post_form(no_status, None);
    form.insert(
        "SAMLResponse".to_string(),
        base64::engine::general_purpose::STANDARD.encode("<unterminated"),
    );
    let err = sp.parse_login_response(&form).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Input, "got {err:?}");
    Ok(())
}
