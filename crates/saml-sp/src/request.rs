//! `AuthnRequest` construction.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use crate::error::SamlResult;
use crate::id::{message_id, IdGenerator};
use crate::signature::XmlSigner;
use crate::types::constants::{SamlBinding, SAMLP_NS, SAML_NS};
use crate::types::{select_current, Preferences, ServiceProviderConfig};
use crate::xml::{escape_attribute, escape_text};

/// The fields of a login request.
#[derive(Debug, Clone)]
pub struct AuthnRequestTemplate<'a> {
    /// Request `ID`, already prefixed.
    pub id: &'a str,
    /// Service provider entity id.
    pub issuer: &'a str,
    /// Assertion consumer service URL.
    pub assertion_url: &'a str,
    /// Identity provider endpoint the request is sent to.
    pub destination: &'a str,
    /// `IssueInstant`.
    pub issue_instant: DateTime<Utc>,
    /// `ForceAuthn`.
    pub force_authn: bool,
    /// Format for a `NameIDPolicy`, if one is requested.
    pub name_id_format: Option<&'a str>,
}

impl AuthnRequestTemplate<'_> {
    /// Renders the request on a single line.
    #[must_use]
    pub fn render(&self) -> String {
        let name_id_policy = self
            .name_id_format
            .map(|format| format!(r#"<samlp:NameIDPolicy Format="{}"/>"#, escape_attribute(format)))
            .unwrap_or_default();

        format!(
            r#"<samlp:AuthnRequest AssertionConsumerServiceURL="{acs}" Destination="{destination}" ID="{id}" IssueInstant="{instant}" ProtocolBinding="{binding}" Version="2.0" ForceAuthn="{force}" xmlns:saml="{SAML_NS}" xmlns:samlp="{SAMLP_NS}"><saml:Issuer>{issuer}</saml:Issuer>{name_id_policy}</samlp:AuthnRequest>"#,
            acs = escape_attribute(self.assertion_url),
            destination = escape_attribute(self.destination),
            id = escape_attribute(self.id),
            instant = self.issue_instant.to_rfc3339_opts(SecondsFormat::Millis, true),
            binding = SamlBinding::HttpPost.uri(),
            force = self.force_authn,
            issuer = escape_text(self.issuer),
        )
    }
}

/// Builds a login request for `destination`, signed with the current
/// signing certificate when [`Preferences::sign_login_requests`] is set.
pub async fn build_login_request(
    sp: &ServiceProviderConfig,
    preferences: &Preferences,
    ids: &dyn IdGenerator,
    destination: &str,
    force_authn: bool,
    now: DateTime<Utc>,
) -> SamlResult<String> {
    let id = message_id(ids).await?;
    let xml = AuthnRequestTemplate {
        id: &id,
        issuer: &sp.id,
        assertion_url: &sp.assertion_url,
        destination,
        issue_instant: now,
        force_authn,
        name_id_format: preferences
            .add_name_id_policy
            .then_some(preferences.name_id_format.as_str()),
    }
    .render();

    if !preferences.sign_login_requests {
        debug!(request_id = %id, signed = false, "built login request");
        return Ok(xml);
    }

    let certificate = select_current(&sp.signature, now)?;
    let signed = XmlSigner::new(certificate)?.sign(&xml)?;
    debug!(request_id = %id, signed = true, algorithm = %certificate.algorithm(), "built login request");
    Ok(signed)
}
