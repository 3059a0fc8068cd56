//! Login request tests.

use saml_sp::bindings::{HttpPostBinding, HttpRedirectBinding};
use saml_sp::schema::{SamlSchema, SchemaSet};
use saml_sp::signature::SignatureVerifier;
use saml_sp::xml::Document;
use saml_sp::{Preferences, SignatureAlgorithm, SignatureTrust};

use crate::common::{provider, IDP_SSO, SP_ACS, SP_CERT, SP_ID};

fn sp_trust() -> SignatureTrust {
    SignatureTrust::new(SignatureAlgorithm::RsaSha256, [SP_CERT])
}

/// A signed redirect request decodes to a schema-valid document with the
/// signature right after the issuer.
#[tokio::test]
async fn test_signed_redirect_request() -> anyhow::Result<()> {
    let sp = provider(Preferences::default().with_name_id_policy(true))?;

    let url = sp.build_login_request_redirect_url(Some("/after login"), None).await?;
    assert!(url.starts_with(&format!("{IDP_SSO}?SAMLRequest=")));

    let decoded = HttpRedirectBinding::decode_url(&url)?;
    assert_eq!(decoded.relay_state.as_deref(), Some("/after login"));

    SchemaSet::builtin().validate(SamlSchema::Protocol, &decoded.xml)?;

    let doc = Document::parse(&decoded.xml)?;
    let root = doc.root();
    assert_eq!(root.local_name, "AuthnRequest");
    assert_eq!(root.attribute("ID"), Some("_req-0"));
    assert_eq!(root.attribute("AssertionConsumerServiceURL"), Some(SP_ACS));
    assert_eq!(root.attribute("Destination"), Some(IDP_SSO));
    assert_eq!(root.attribute("ForceAuthn"), Some("false"));
    let children: Vec<&str> = root.child_elements().map(|el| el.local_name.as_str()).collect();
    assert_eq!(children, vec!["Issuer", "Signature", "NameIDPolicy"]);
    assert_eq!(root.child("Issuer").map(|el| el.trimmed_text()).as_deref(), Some(SP_ID));

    let signed = SignatureVerifier::new(&sp_trust()).verify(&decoded.xml)?;
    assert_eq!(signed, vec![Vec::<usize>::new()]);
    Ok(())
}

/// Unsigned requests carry no signature and honour the force flag.
#[tokio::test]
async fn test_unsigned_redirect_request() -> anyhow::Result<()> {
    let sp = provider(
        Preferences::default()
            .with_sign_login_requests(false)
            .with_force_authentication_by_default(true),
    )?;

    let decoded = HttpRedirectBinding::decode_url(&sp.build_login_request_redirect_url(None, None).await?)?;
    assert_eq!(decoded.relay_state, None);
    assert!(!decoded.xml.contains("Signature"));
    assert!(decoded.xml.contains(r#"ForceAuthn="true""#));

    let decoded = HttpRedirectBinding::decode_url(&sp.build_login_request_redirect_url(None, Some(false)).await?)?;
    assert!(decoded.xml.contains(r#"ForceAuthn="false""#));
    Ok(())
}

/// Every request gets a fresh identifier from the generator.
#[tokio::test]
async fn test_request_ids_come_from_generator() -> anyhow::Result<()> {
    let sp = provider(Preferences::default().with_sign_login_requests(false))?;

    let first = HttpRedirectBinding::decode_url(&sp.build_login_request_redirect_url(None, None).await?)?;
    let second = HttpRedirectBinding::decode_url(&sp.build_login_request_redirect_url(None, None).await?)?;
    assert!(first.xml.contains(r#"ID="_req-0""#));
    assert!(second.xml.contains(r#"ID="_req-1""#));
    Ok(())
}

/// POST forms target the identity provider's POST endpoint.
#[tokio::test]
async fn test_post_form_request() -> anyhow::Result<()> {
    use saml_sp::ServiceProvider;

    let idp = crate::common::idp_trust().with_post_login_url("https://idp.example.com/sso/post");
    let sp = ServiceProvider::builder(crate::common::sp_config(), idp).build()?;

    let form = sp.build_login_request_post_form(Some("rs-1"), Some(true)).await?;
    assert_eq!(form.action, "https://idp.example.com/sso/post");
    assert_eq!(form.fields.get("RelayState").map(String::as_str), Some("rs-1"));

    let decoded = HttpPostBinding::decode_fields(&form.fields)?;
    SchemaSet::builtin().validate(SamlSchema::Protocol, &decoded.xml)?;
    assert!(decoded.xml.contains(r#"Destination="https://idp.example.com/sso/post""#));
    assert!(decoded.xml.contains(r#"ForceAuthn="true""#));
    SignatureVerifier::new(&sp_trust()).verify(&decoded.xml)?;

    let json = serde_json::to_value(&form)?;
    assert_eq!(json["action"], "https://idp.example.com/sso/post");
    assert!(json["fields"]["SAMLRequest"].is_string());
    Ok(())
}
