//! X.509 certificate inspection.

use chrono::{DateTime, Utc};
use x509_parser::oid_registry::OID_PKCS1_RSAENCRYPTION;

use crate::error::{CryptoError, CryptoResult};
use crate::pem::certificate_der;

/// The parts of an X.509 certificate the service provider relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    der: Vec<u8>,
    public_key: Vec<u8>,
    subject: String,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
}

impl CertificateInfo {
    /// Parses a PEM or single-line base64 certificate.
    pub fn from_pem(certificate: &str) -> CryptoResult<Self> {
        Self::from_der(&certificate_der(certificate)?)
    }

    /// Parses a DER certificate. Only RSA subject keys are accepted.
    pub fn from_der(der: &[u8]) -> CryptoResult<Self> {
        let (_, cert) = x509_parser::parse_x509_certificate(der)
            .map_err(|e| CryptoError::InvalidCertificate(e.to_string()))?;

        let spki = cert.public_key();
        if spki.algorithm.algorithm != OID_PKCS1_RSAENCRYPTION {
            return Err(CryptoError::UnsupportedAlgorithm(format!(
                "certificate key algorithm {}",
                spki.algorithm.algorithm
            )));
        }

        let validity = cert.validity();
        let not_before = timestamp(validity.not_before.timestamp())?;
        let not_after = timestamp(validity.not_after.timestamp())?;

        Ok(Self {
            der: der.to_vec(),
            public_key: spki.subject_public_key.data.to_vec(),
            subject: cert.subject().to_string(),
            not_before,
            not_after,
        })
    }

    /// DER encoding of the whole certificate.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// The subject public key as a DER `RSAPublicKey`.
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Subject distinguished name.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Start of the validity period.
    #[must_use]
    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    /// End of the validity period.
    #[must_use]
    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }
}

fn timestamp(secs: i64) -> CryptoResult<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| CryptoError::InvalidCertificate(format!("timestamp out of range: {secs}")))
}
