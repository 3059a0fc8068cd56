//! Cryptographic algorithm definitions.
//!
//! A SAML certificate is configured with a hash name (`sha256` or `sha512`).
//! That single choice binds the XML-DSig signature method and the digest
//! method used for references.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// Hash algorithms usable for XML-DSig reference digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256.
    Sha256,
    /// SHA-512.
    Sha512,
}

impl HashAlgorithm {
    /// Returns the output length in bytes.
    #[must_use]
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }

    /// Returns the algorithm name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Returns the XML digest method URI.
    #[must_use]
    pub const fn xml_digest_uri(self) -> &'static str {
        match self {
            Self::Sha256 => "http://www.w3.org/2001/04/xmlenc#sha256",
            Self::Sha512 => "http://www.w3.org/2001/04/xmlenc#sha512",
        }
    }

    /// Parses a digest method URI.
    #[must_use]
    pub fn from_xml_digest_uri(uri: &str) -> Option<Self> {
        match uri {
            "http://www.w3.org/2001/04/xmlenc#sha256" => Some(Self::Sha256),
            "http://www.w3.org/2001/04/xmlenc#sha512" => Some(Self::Sha512),
            _ => None,
        }
    }
}

/// RSA PKCS#1 v1.5 signature algorithms accepted for SAML messages.
///
/// Serialized as the short hash name used in configuration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// RSA PKCS#1 v1.5 with SHA-256.
    #[default]
    #[serde(rename = "sha256")]
    RsaSha256,
    /// RSA PKCS#1 v1.5 with SHA-512.
    #[serde(rename = "sha512")]
    RsaSha512,
}

impl SignatureAlgorithm {
    /// Returns the short configuration name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RsaSha256 => "sha256",
            Self::RsaSha512 => "sha512",
        }
    }

    /// Returns the XML-DSig signature method URI.
    #[must_use]
    pub const fn xml_dsig_uri(self) -> &'static str {
        match self {
            Self::RsaSha256 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
            Self::RsaSha512 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512",
        }
    }

    /// Parses an XML-DSig signature method URI.
    #[must_use]
    pub fn from_xml_dsig_uri(uri: &str) -> Option<Self> {
        match uri {
            "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256" => Some(Self::RsaSha256),
            "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512" => Some(Self::RsaSha512),
            _ => None,
        }
    }

    /// Returns the hash used by this algorithm and by its reference digests.
    #[must_use]
    pub const fn hash_algorithm(self) -> HashAlgorithm {
        match self {
            Self::RsaSha256 => HashAlgorithm::Sha256,
            Self::RsaSha512 => HashAlgorithm::Sha512,
        }
    }

    /// Returns the XML digest method URI bound to this algorithm.
    #[must_use]
    pub const fn xml_digest_uri(self) -> &'static str {
        self.hash_algorithm().xml_digest_uri()
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "rsa-sha256" => Ok(Self::RsaSha256),
            "sha512" | "rsa-sha512" => Ok(Self::RsaSha512),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}
