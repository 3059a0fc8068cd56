//! SAML metadata.
//!
//! [`extract`] derives [`IdentityProviderTrust`] from an identity provider's
//! metadata; [`sp::service_provider_metadata`] renders the service
//! provider's own `EntityDescriptor`.
//!
//! Lookup is by local name. [`ServiceProvider`](crate::ServiceProvider)
//! validates metadata against the metadata schema before extracting from it.
//! Only the first `IDPSSODescriptor` is used.

pub mod sp;

use saml_sp_crypto::{normalize_certificate, SignatureAlgorithm};
use tracing::debug;

use crate::error::{SamlError, SamlResult};
use crate::types::constants::SamlBinding;
use crate::types::{IdentityProviderTrust, SignatureTrust};
use crate::xml::{Document, Element};

pub use sp::service_provider_metadata;

/// Algorithm required from identity providers configured through metadata.
pub const DEFAULT_ALGORITHM: SignatureAlgorithm = SignatureAlgorithm::RsaSha256;

/// Extracts identity provider trust, requiring [`DEFAULT_ALGORITHM`].
pub fn extract(xml: &str) -> SamlResult<IdentityProviderTrust> {
    extract_with_algorithm(xml, DEFAULT_ALGORITHM)
}

/// Extracts identity provider trust, requiring `algorithm` for signatures.
pub fn extract_with_algorithm(xml: &str, algorithm: SignatureAlgorithm) -> SamlResult<IdentityProviderTrust> {
    let doc = Document::parse(xml)?;
    let entity = identity_provider_entity(doc.root()).ok_or(SamlError::NotAnIdentityProviderDescriptor)?;

    let id = entity
        .attribute("entityID")
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| SamlError::MissingElement("EntityDescriptor/@entityID".to_string()))?;

    let mut descriptors = entity.children_named("IDPSSODescriptor");
    let descriptor = descriptors.next().ok_or(SamlError::NotAnIdentityProviderDescriptor)?;
    let ignored = descriptors.count();
    if ignored > 0 {
        debug!(entity_id = id, ignored, "using the first IDPSSODescriptor only");
    }

    if descriptor.child("KeyDescriptor").is_none() {
        return Err(SamlError::NoSigningCertificates);
    }

    let redirect_login_url =
        single_sign_on_location(descriptor, SamlBinding::HttpRedirect).ok_or(SamlError::NoRedirectBinding)?;
    let post_login_url = single_sign_on_location(descriptor, SamlBinding::HttpPost);

    let certificates = signing_certificates(descriptor);
    if certificates.is_empty() {
        return Err(SamlError::NoSigningCertificates);
    }

    debug!(
        entity_id = id,
        certificates = certificates.len(),
        algorithm = %algorithm,
        "extracted identity provider metadata"
    );

    let mut trust = IdentityProviderTrust::new(id, redirect_login_url, SignatureTrust::new(algorithm, certificates));
    if let Some(url) = post_login_url {
        trust = trust.with_post_login_url(url);
    }
    Ok(trust)
}

/// The `EntityDescriptor` carrying an `IDPSSODescriptor`, looking inside
/// `EntitiesDescriptor` groups.
fn identity_provider_entity(root: &Element) -> Option<&Element> {
    match root.local_name.as_str() {
        "EntityDescriptor" => root.child("IDPSSODescriptor").map(|_| root),
        "EntitiesDescriptor" => root.child_elements().find_map(identity_provider_entity),
        _ => None,
    }
}

fn signing_certificates(descriptor: &Element) -> Vec<String> {
    descriptor
        .children_named("KeyDescriptor")
        .filter(|key| key.attribute("use") == Some("signing"))
        .flat_map(|key| key.descendants_named("X509Certificate"))
        .map(|cert| normalize_certificate(&cert.text()))
        .filter(|cert| !cert.is_empty())
        .collect()
}

fn single_sign_on_location(descriptor: &Element, binding: SamlBinding) -> Option<String> {
    descriptor
        .children_named("SingleSignOnService")
        .find(|service| service.attribute("Binding") == Some(binding.uri()))
        .and_then(|service| service.attribute("Location"))
        .filter(|location| !location.is_empty())
        .map(String::from)
}
