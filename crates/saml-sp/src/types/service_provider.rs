//! Service provider identity.

use super::Certificate;

/// The local service provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceProviderConfig {
    /// Entity id (also the expected audience).
    pub id: String,
    /// Assertion consumer service URL (HTTP-POST).
    pub assertion_url: String,
    /// Single logout service URL (HTTP-Redirect).
    pub single_logout_url: String,
    /// Signing certificates, in rotation order.
    pub signature: Vec<Certificate>,
    /// Decryption certificates, in rotation order.
    pub encryption: Vec<Certificate>,
}

impl ServiceProviderConfig {
    /// Creates a configuration. Encryption reuses the signing certificates
    /// unless [`with_encryption`](Self::with_encryption) is called.
    pub fn new(
        id: impl Into<String>,
        assertion_url: impl Into<String>,
        single_logout_url: impl Into<String>,
        signature: Vec<Certificate>,
    ) -> Self {
        Self {
            id: id.into(),
            assertion_url: assertion_url.into(),
            single_logout_url: single_logout_url.into(),
            encryption: signature.clone(),
            signature,
        }
    }

    /// Uses dedicated encryption certificates.
    #[must_use]
    pub fn with_encryption(mut self, encryption: Vec<Certificate>) -> Self {
        self.encryption = encryption;
        self
    }
}
