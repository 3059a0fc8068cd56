//! Identity provider trust parameters.

use saml_sp_crypto::{normalize_certificate, SignatureAlgorithm};
use serde::{Deserialize, Serialize};

use crate::error::{SamlError, SamlResult};

/// Signature trust for an identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureTrust {
    /// The only accepted `SignatureMethod`.
    pub algorithm: SignatureAlgorithm,
    /// Single-line base64 certificates allowed to sign.
    pub allowed_certificates: Vec<String>,
}

impl SignatureTrust {
    /// Creates a trust set, normalizing and de-duplicating certificates.
    pub fn new<I, S>(algorithm: SignatureAlgorithm, certificates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed_certificates: Vec<String> = Vec::new();
        for cert in certificates {
            let normalized = normalize_certificate(cert.as_ref());
            if !normalized.is_empty() && !allowed_certificates.contains(&normalized) {
                allowed_certificates.push(normalized);
            }
        }
        Self {
            algorithm,
            allowed_certificates,
        }
    }

    /// Returns true when `certificate` is in the allow-list.
    #[must_use]
    pub fn allows(&self, certificate: &str) -> bool {
        let normalized = normalize_certificate(certificate);
        self.allowed_certificates.iter().any(|c| *c == normalized)
    }
}

/// Everything the service provider trusts about its identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProviderTrust {
    /// Entity id, compared against response issuers.
    pub id: String,
    /// HTTP-Redirect `SingleSignOnService` location.
    pub redirect_login_url: String,
    /// HTTP-POST `SingleSignOnService` location, if advertised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_login_url: Option<String>,
    /// Signature trust.
    pub signature: SignatureTrust,
}

impl IdentityProviderTrust {
    /// Creates inline trust.
    pub fn new(
        id: impl Into<String>,
        redirect_login_url: impl Into<String>,
        signature: SignatureTrust,
    ) -> Self {
        Self {
            id: id.into(),
            redirect_login_url: redirect_login_url.into(),
            post_login_url: None,
            signature,
        }
    }

    /// Sets the HTTP-POST login location.
    #[must_use]
    pub fn with_post_login_url(mut self, url: impl Into<String>) -> Self {
        self.post_login_url = Some(url.into());
        self
    }

    /// Checks the invariants of inline configuration.
    pub fn validate(&self) -> SamlResult<()> {
        if self.id.is_empty() {
            return Err(SamlError::InvalidConfiguration("identity provider id is empty".to_string()));
        }
        if self.signature.allowed_certificates.is_empty() {
            return Err(SamlError::NoSigningCertificates);
        }
        if self.redirect_login_url.is_empty() {
            return Err(SamlError::NoRedirectBinding);
        }
        Ok(())
    }
}

/// How identity provider trust is supplied to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityProviderSource {
    /// Trust configured directly.
    Inline(IdentityProviderTrust),
    /// An IdP metadata document plus the algorithm to require.
    Metadata {
        /// Metadata XML.
        xml: String,
        /// Required signature algorithm.
        algorithm: SignatureAlgorithm,
    },
}

impl From<IdentityProviderTrust> for IdentityProviderSource {
    fn from(trust: IdentityProviderTrust) -> Self {
        Self::Inline(trust)
    }
}
