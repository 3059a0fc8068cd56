//! File-based provider configuration.
//!
//! ```toml
//! [sp]
//! id = "https://sp.example.com/saml"
//! assertion_url = "https://sp.example.com/saml/acs"
//! single_logout_url = "https://sp.example.com/saml/slo"
//!
//! [[sp.signature]]
//! certificate = "certs/sp.pem"
//! private_key = "certs/sp.key"
//! algorithm = "sha256"
//!
//! [idp]
//! metadata = "idp-metadata.xml"
//!
//! [preferences]
//! sign_login_requests = true
//! ```
//!
//! Relative paths are resolved against the directory of the configuration
//! file, or the base directory given to [`ProviderConfig::from_toml_str`].

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use saml_sp_crypto::SignatureAlgorithm;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SamlError, SamlResult};
use crate::metadata::DEFAULT_ALGORITHM;
use crate::types::{
    Certificate, IdentityProviderSource, IdentityProviderTrust, Preferences, ServiceProviderConfig, SignatureTrust,
};

/// Everything needed to build a [`ServiceProvider`](crate::ServiceProvider).
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// The local service provider.
    pub service_provider: ServiceProviderConfig,
    /// Identity provider trust, inline or from metadata.
    pub identity_provider: IdentityProviderSource,
    /// Behaviour switches.
    pub preferences: Preferences,
}

/// Parsed configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Service provider section.
    pub sp: ServiceProviderSection,
    /// Identity provider section.
    pub idp: IdentityProviderSection,
    /// Preferences section.
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(skip)]
    base_dir: PathBuf,
}

/// `[sp]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceProviderSection {
    /// Entity id.
    pub id: String,
    /// Assertion consumer service URL.
    pub assertion_url: String,
    /// Single logout service URL.
    pub single_logout_url: String,
    /// Signing certificates in rotation order.
    pub signature: Vec<CertificateEntry>,
    /// Decryption certificates. Defaults to the signing certificates.
    #[serde(default)]
    pub encryption: Vec<CertificateEntry>,
}

/// One `[[sp.signature]]` or `[[sp.encryption]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateEntry {
    /// Certificate PEM file.
    pub certificate: PathBuf,
    /// Private key PEM file.
    pub private_key: PathBuf,
    /// Signature algorithm.
    #[serde(default)]
    pub algorithm: SignatureAlgorithm,
    /// Overrides the certificate's own `notAfter`.
    #[serde(default)]
    pub not_after: Option<DateTime<Utc>>,
}

/// `[idp]`: a metadata file or inline trust.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdentityProviderSection {
    /// `metadata = "<path>"`.
    Metadata {
        /// Metadata XML file.
        metadata: PathBuf,
        /// Required signature algorithm.
        #[serde(default = "default_algorithm")]
        algorithm: SignatureAlgorithm,
    },
    /// Inline trust parameters.
    Inline {
        /// Entity id.
        id: String,
        /// HTTP-Redirect login URL.
        redirect_login_url: String,
        /// HTTP-POST login URL.
        #[serde(default)]
        post_login_url: Option<String>,
        /// Required signature algorithm.
        #[serde(default = "default_algorithm")]
        algorithm: SignatureAlgorithm,
        /// Certificate files or single-line base64 values.
        allowed_certificates: Vec<String>,
    },
}

fn default_algorithm() -> SignatureAlgorithm {
    DEFAULT_ALGORITHM
}

impl ProviderConfig {
    /// Loads a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> SamlResult<Self> {
        let path = path.as_ref();
        let content = read(path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        debug!(path = %path.display(), "loading provider configuration");
        Self::from_toml_str(&content, base_dir)
    }

    /// Parses configuration text, resolving relative paths against `base_dir`.
    pub fn from_toml_str(text: &str, base_dir: impl Into<PathBuf>) -> SamlResult<Self> {
        let mut config: Self = toml::from_str(text)
            .map_err(|e| SamlError::InvalidConfiguration(format!("failed to parse config: {e}")))?;
        config.base_dir = base_dir.into();
        Ok(config)
    }

    /// Directory relative paths are resolved against.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Reads every referenced file and produces provider options.
    pub fn into_options(self) -> SamlResult<ProviderOptions> {
        let signature = self.certificates(&self.sp.signature)?;
        if signature.is_empty() {
            return Err(SamlError::InvalidConfiguration("no [[sp.signature]] certificate".to_string()));
        }

        let mut service_provider =
            ServiceProviderConfig::new(&self.sp.id, &self.sp.assertion_url, &self.sp.single_logout_url, signature);
        if !self.sp.encryption.is_empty() {
            service_provider = service_provider.with_encryption(self.certificates(&self.sp.encryption)?);
        }

        let identity_provider = match &self.idp {
            IdentityProviderSection::Metadata { metadata, algorithm } => IdentityProviderSource::Metadata {
                xml: read(&self.resolve(metadata))?,
                algorithm: *algorithm,
            },
            IdentityProviderSection::Inline {
                id,
                redirect_login_url,
                post_login_url,
                algorithm,
                allowed_certificates,
            } => {
                let certificates = allowed_certificates
                    .iter()
                    .map(|value| self.certificate_value(value))
                    .collect::<SamlResult<Vec<_>>>()?;
                let mut trust =
                    IdentityProviderTrust::new(id, redirect_login_url, SignatureTrust::new(*algorithm, certificates));
                if let Some(url) = post_login_url {
                    trust = trust.with_post_login_url(url);
                }
                IdentityProviderSource::Inline(trust)
            }
        };

        Ok(ProviderOptions {
            service_provider,
            identity_provider,
            preferences: self.preferences,
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn certificates(&self, entries: &[CertificateEntry]) -> SamlResult<Vec<Certificate>> {
        entries
            .iter()
            .map(|entry| {
                let certificate = read(&self.resolve(&entry.certificate))?;
                let private_key = read(&self.resolve(&entry.private_key))?;
                match entry.not_after {
                    Some(not_after) => Ok(Certificate::new(certificate, private_key, entry.algorithm, not_after)),
                    None => Certificate::from_pem(certificate, private_key, entry.algorithm),
                }
            })
            .collect()
    }

    // A value naming an existing file is read; anything else is taken as
    // certificate text.
    fn certificate_value(&self, value: &str) -> SamlResult<String> {
        let path = self.resolve(Path::new(value));
        if path.is_file() {
            read(&path)
        } else {
            Ok(value.to_string())
        }
    }
}

fn read(path: &Path) -> SamlResult<String> {
    fs::read_to_string(path)
        .map_err(|e| SamlError::InvalidConfiguration(format!("failed to read {}: {e}", path.display())))
}
