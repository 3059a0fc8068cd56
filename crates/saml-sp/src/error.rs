//! SAML error types.
//!
//! Every failure is fatal for the message being processed. Errors are
//! grouped into categories so callers can pick user-facing behaviour
//! ("please log in again" for semantic rejections, "security error" for
//! trust failures) without matching every variant.

use thiserror::Error;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// Broad classes of [`SamlError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed transport or payload.
    Input,
    /// Cryptographic or identity failure.
    Trust,
    /// Encrypted content could not be recovered.
    Decryption,
    /// Well-formed, authentic message rejected by a business rule.
    Semantic,
    /// Identity provider metadata is unusable.
    Metadata,
    /// Local configuration is unusable.
    Configuration,
}

/// SAML service provider errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// The `SAMLResponse` field is absent or empty.
    #[error("empty SAMLResponse")]
    EmptyResponse,

    /// The document does not satisfy the SAML schema.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64Decode(String),

    /// Deflate compression or decompression error.
    #[error("deflate error: {0}")]
    Deflate(String),

    /// Missing required element or attribute.
    #[error("missing required element: {0}")]
    MissingElement(String),

    /// The document carries no `Signature` element.
    #[error("no signature")]
    NoSignature,

    /// The certificate embedded in a signature is not in the allow-list.
    #[error("certificate is not allowed")]
    UntrustedCertificate,

    /// A signature failed verification.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// No configured certificate is currently valid.
    #[error("no valid certificate")]
    NoValidCertificate,

    /// XML signature creation failed.
    #[error("signature creation failed: {0}")]
    SignatureCreation(String),

    /// An encrypted assertion could not be decrypted.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// A status code outside the permitted set.
    #[error("invalid status code: {0}")]
    InvalidStatusCode(String),

    /// The response was issued by an unexpected entity.
    #[error("unknown issuer: expected {expected}, got {actual}")]
    UnknownIssuer {
        /// The configured identity provider id.
        expected: String,
        /// The issuer found in the response.
        actual: String,
    },

    /// An assertion targets another audience.
    #[error("unexpected audience: expected {expected}, got {actual}")]
    UnexpectedAudience {
        /// The audience derived from the service provider id.
        expected: String,
        /// The audience found in the assertion.
        actual: String,
    },

    /// An assertion is outside its validity window.
    #[error("assertion expired")]
    AssertionExpired,

    /// The metadata has no `IDPSSODescriptor`.
    #[error("the metadata does not describe an identity provider")]
    NotAnIdentityProviderDescriptor,

    /// The metadata has no signing certificate.
    #[error("no signing certificates found")]
    NoSigningCertificates,

    /// The metadata has no HTTP-Redirect `SingleSignOnService`.
    #[error("no login url found for the HTTP-Redirect binding")]
    NoRedirectBinding,

    /// Invalid provider configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A generated identifier cannot be used as an XML `ID`.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// An algorithm URI or name that is not supported.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Unknown or unsupported binding.
    #[error("unsupported binding: {0}")]
    UnsupportedBinding(String),

    /// Malformed binding parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Cryptographic operation error.
    #[error("crypto error: {0}")]
    Crypto(#[from] saml_sp_crypto::CryptoError),
}

impl SamlError {
    /// Returns the category of this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::EmptyResponse
            | Self::SchemaViolation(_)
            | Self::XmlParse(_)
            | Self::Base64Decode(_)
            | Self::Deflate(_)
            | Self::MissingElement(_)
            | Self::UnsupportedBinding(_)
            | Self::InvalidRequest(_) => ErrorCategory::Input,
            Self::NoSignature
            | Self::UntrustedCertificate
            | Self::InvalidSignature(_)
            | Self::NoValidCertificate => ErrorCategory::Trust,
            Self::DecryptionFailed(_) => ErrorCategory::Decryption,
            Self::InvalidStatusCode(_)
            | Self::UnknownIssuer { .. }
            | Self::UnexpectedAudience { .. }
            | Self::AssertionExpired => ErrorCategory::Semantic,
            Self::NotAnIdentityProviderDescriptor
            | Self::NoSigningCertificates
            | Self::NoRedirectBinding => ErrorCategory::Metadata,
            Self::SignatureCreation(_)
            | Self::InvalidConfiguration(_)
            | Self::InvalidIdentifier(_)
            | Self::UnsupportedAlgorithm(_)
            | Self::Crypto(_) => ErrorCategory::Configuration,
        }
    }

    /// Returns true for cryptographic or identity failures.
    #[must_use]
    pub const fn is_trust_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::Trust)
    }

    /// Returns the HTTP status code an assertion consumer endpoint should use.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self.category() {
            ErrorCategory::Input => 400,
            ErrorCategory::Trust | ErrorCategory::Decryption => 401,
            ErrorCategory::Semantic => 403,
            ErrorCategory::Metadata | ErrorCategory::Configuration => 500,
        }
    }
}

impl From<quick_xml::Error> for SamlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for SamlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<quick_xml::escape::EscapeError> for SamlError {
    fn from(err: quick_xml::escape::EscapeError) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<std::str::Utf8Error> for SamlError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64Decode(err.to_string())
    }
}
