//! Service provider metadata.

use crate::types::constants::{SamlBinding, MD_NS, PROTOCOL_SUPPORT, XMLDSIG_NS};
use crate::types::{Certificate, ServiceProviderConfig};
use crate::xml::{escape_attribute, escape_text};

/// Renders the service provider `EntityDescriptor`.
///
/// Every signing certificate gets a `KeyDescriptor use="signing"` and every
/// encryption certificate a `KeyDescriptor use="encryption"`, so identity
/// providers can follow key rotation. The document is a single line.
#[must_use]
pub fn service_provider_metadata(sp: &ServiceProviderConfig, name_id_format: &str) -> String {
    let mut keys = String::new();
    for cert in &sp.signature {
        keys.push_str(&key_descriptor("signing", cert));
    }
    for cert in &sp.encryption {
        keys.push_str(&key_descriptor("encryption", cert));
    }

    format!(
        r#"<EntityDescriptor xmlns="{MD_NS}" entityID="{entity_id}"><SPSSODescriptor AuthnRequestsSigned="true" WantAssertionsSigned="true" protocolSupportEnumeration="{PROTOCOL_SUPPORT}">{keys}<SingleLogoutService Binding="{redirect}" Location="{slo}"/><NameIDFormat>{name_id_format}</NameIDFormat><AssertionConsumerService Binding="{post}" Location="{acs}" index="1"/></SPSSODescriptor></EntityDescriptor>"#,
        entity_id = escape_attribute(&sp.id),
        redirect = SamlBinding::HttpRedirect.uri(),
        slo = escape_attribute(&sp.single_logout_url),
        name_id_format = escape_text(name_id_format),
        post = SamlBinding::HttpPost.uri(),
        acs = escape_attribute(&sp.assertion_url),
    )
}

fn key_descriptor(usage: &str, cert: &Certificate) -> String {
    format!(
        r#"<KeyDescriptor use="{usage}"><KeyInfo xmlns="{XMLDSIG_NS}"><X509Data><X509Certificate>{}</X509Certificate></X509Data></KeyInfo></KeyDescriptor>"#,
        cert.normalized()
    )
}
