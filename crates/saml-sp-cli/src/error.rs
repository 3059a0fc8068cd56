//! CLI error types.

use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// SAML processing error.
    #[error("{0}")]
    Saml(#[from] saml_sp::SamlError),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::InvalidArgument(_) => 2,
            Self::Saml(err) if err.is_trust_error() => 3,
            Self::Saml(_) | Self::Io(_) | Self::Json(_) => 1,
        }
    }
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
