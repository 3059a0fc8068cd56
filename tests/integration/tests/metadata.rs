//! Metadata tests.

use saml_sp::metadata;
use saml_sp::schema::{SamlSchema, SchemaSet};
use saml_sp::xml::Document;
use saml_sp::{IdentityProviderSource, Preferences, SamlError, ServiceProvider, SignatureAlgorithm};

use crate::common::{sp_config, AZURE_METADATA, SP_ACS, SP_ID, SP_SLO};

/// Trust comes from the first IDPSSODescriptor only, signing keys only.
#[test]
fn test_azure_metadata_extraction() -> anyhow::Result<()> {
    let trust = metadata::extract(AZURE_METADATA)?;

    assert_eq!(trust.id, "https://sts.windows.net/id/");
    assert_eq!(trust.redirect_login_url, "https://login.microsoftonline.com/id/saml2");
    assert_eq!(
        trust.post_login_url.as_deref(),
        Some("https://login.microsoftonline.com/id/saml2")
    );
    assert_eq!(trust.signature.algorithm, SignatureAlgorithm::RsaSha256);
    assert_eq!(trust.signature.allowed_certificates, vec!["SignCert31", "SignCert32", "SignCert33"]);
    Ok(())
}

/// The provider resolves metadata once at construction.
#[test]
fn test_provider_from_metadata() -> anyhow::Result<()> {
    let sp = ServiceProvider::builder(
        sp_config(),
        IdentityProviderSource::Metadata {
            xml: AZURE_METADATA.to_string(),
            algorithm: SignatureAlgorithm::RsaSha512,
        },
    )
    .build()?;

    assert_eq!(sp.identity_provider().id, "https://sts.windows.net/id/");
    assert_eq!(sp.identity_provider().signature.algorithm, SignatureAlgorithm::RsaSha512);
    Ok(())
}

/// Metadata without an identity provider fails construction.
#[test]
fn test_metadata_errors_surface_at_construction() {
    let sp_only = r#"<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" entityID="https://sp"><md:SPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol"><md:AssertionConsumerService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Location="https://sp/acs" index="1"/></md:SPSSODescriptor></md:EntityDescriptor>"#;
    let result = ServiceProvider::builder(
        sp_config(),
        IdentityProviderSource::Metadata {
            xml: sp_only.to_string(),
            algorithm: SignatureAlgorithm::RsaSha256,
        },
    )
    .build();
    assert!(matches!(result, Err(SamlError::NotAnIdentityProviderDescriptor)));

    let no_redirect = AZURE_METADATA.replace("bindings:HTTP-Redirect", "bindings:HTTP-Artifact");
    assert!(matches!(metadata::extract(&no_redirect), Err(SamlError::NoRedirectBinding)));
}

/// Metadata that breaks the metadata schema fails construction before any
/// trust is extracted from it.
#[test]
fn test_malformed_metadata_fails_construction() -> anyhow::Result<()> {
    SchemaSet::builtin().validate(SamlSchema::Metadata, AZURE_METADATA)?;

    let build = |xml: String| {
        ServiceProvider::builder(
            sp_config(),
            IdentityProviderSource::Metadata {
                xml,
                algorithm: SignatureAlgorithm::RsaSha256,
            },
        )
        .build()
    };

    let no_location = AZURE_METADATA.replacen(r#" Location="https://login.microsoftonline.com/id/saml2""#, "", 1);
    let bad_use = AZURE_METADATA.replacen(r#"use="signing""#, r#"use="everything""#, 1);
    let no_entity_id = AZURE_METADATA.replacen(r#" entityID="https://sts.windows.net/id/""#, "", 1);
    for xml in [no_location, bad_use, no_entity_id] {
        let err = build(xml).unwrap_err();
        assert!(matches!(err, SamlError::SchemaViolation(_)), "got {err:?}");
    }
    Ok(())
}

/// The SP's own metadata is schema valid and advertises its endpoints.
#[test]
fn test_service_provider_metadata() -> anyhow::Result<()> {
    let sp = crate::common::provider(Preferences::default())?;
    let xml = sp.metadata();

    SchemaSet::builtin().validate(SamlSchema::Metadata, &xml)?;

    let doc = Document::parse(&xml)?;
    assert_eq!(doc.root().attribute("entityID"), Some(SP_ID));
    let descriptor = doc
        .root()
        .child("SPSSODescriptor")
        .ok_or_else(|| anyhow::anyhow!("SPSSODescriptor missing"))?;
    assert_eq!(descriptor.attribute("AuthnRequestsSigned"), Some("true"));
    assert_eq!(descriptor.attribute("WantAssertionsSigned"), Some("true"));

    let uses: Vec<&str> = descriptor
        .children_named("KeyDescriptor")
        .filter_map(|kd| kd.attribute("use"))
        .collect();
    assert_eq!(uses, vec!["signing", "encryption"]);

    let slo = descriptor
        .child("SingleLogoutService")
        .and_then(|el| el.attribute("Location"));
    assert_eq!(slo, Some(SP_SLO));
    let acs = descriptor.child("AssertionConsumerService");
    assert_eq!(acs.and_then(|el| el.attribute("Location")), Some(SP_ACS));
    assert_eq!(acs.and_then(|el| el.attribute("index")), Some("1"));
    Ok(())
}
