//! Certificates and the currently-valid selection rule.
//!
//! A trust set is an ordered list of [`Certificate`]s. Key rotation is
//! expressed by listing the next certificate after the current one: the
//! first certificate whose `notAfter` lies in the future wins.

use std::fmt;

use chrono::{DateTime, Utc};
use saml_sp_crypto::{normalize_certificate, CertificateInfo, PrivateKeyDer, SignatureAlgorithm};

use crate::error::{SamlError, SamlResult};

/// A certificate with its private key, signature algorithm and expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    certificate: String,
    private_key: String,
    algorithm: SignatureAlgorithm,
    not_after: DateTime<Utc>,
}

impl Certificate {
    /// Creates a certificate with an explicit expiry.
    pub fn new(
        certificate_pem: impl Into<String>,
        private_key_pem: impl Into<String>,
        algorithm: SignatureAlgorithm,
        not_after: DateTime<Utc>,
    ) -> Self {
        Self {
            certificate: certificate_pem.into(),
            private_key: private_key_pem.into(),
            algorithm,
            not_after,
        }
    }

    /// Creates a certificate whose expiry is read from its X.509 validity.
    pub fn from_pem(
        certificate_pem: impl Into<String>,
        private_key_pem: impl Into<String>,
        algorithm: SignatureAlgorithm,
    ) -> SamlResult<Self> {
        let certificate = certificate_pem.into();
        let info = CertificateInfo::from_pem(&certificate)?;
        Ok(Self::new(certificate, private_key_pem, algorithm, info.not_after()))
    }

    /// The certificate as configured (PEM or single-line base64).
    #[must_use]
    pub fn certificate_pem(&self) -> &str {
        &self.certificate
    }

    /// The certificate as a single line of base64.
    #[must_use]
    pub fn normalized(&self) -> String {
        normalize_certificate(&self.certificate)
    }

    /// The private key PEM.
    #[must_use]
    pub fn private_key_pem(&self) -> &str {
        &self.private_key
    }

    /// Decodes the private key.
    pub fn private_key(&self) -> SamlResult<PrivateKeyDer> {
        Ok(PrivateKeyDer::from_pem(&self.private_key)?)
    }

    /// Signature algorithm bound to this certificate.
    #[must_use]
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// End of validity.
    #[must_use]
    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// Returns true when `not_after` is strictly after `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.not_after > now
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("certificate", &self.normalized())
            .field("private_key", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("not_after", &self.not_after)
            .finish()
    }
}

/// Returns the first certificate valid at `now`, in input order.
pub fn select_current(certificates: &[Certificate], now: DateTime<Utc>) -> SamlResult<&Certificate> {
    certificates
        .iter()
        .find(|cert| cert.is_valid_at(now))
        .ok_or(SamlError::NoValidCertificate)
}
