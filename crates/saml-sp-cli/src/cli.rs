//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use saml_sp::SignatureAlgorithm;

/// SAML service provider tools.
#[derive(Debug, Parser)]
#[command(name = "saml-sp")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Provider configuration file.
    #[arg(short, long, env = "SAML_SP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the service provider metadata.
    Metadata {
        /// Check the document against the metadata schema first.
        #[arg(long)]
        validate: bool,
    },

    /// Print a login URL for the HTTP-Redirect binding.
    LoginUrl(LoginArgs),

    /// Print the HTTP-POST login form as JSON.
    LoginForm(LoginArgs),

    /// Validate a base64 `SAMLResponse` and print the result as JSON.
    ParseResponse {
        /// File holding the base64 `SAMLResponse` value.
        #[arg(short, long)]
        file: PathBuf,

        /// `RelayState` received with the response.
        #[arg(long)]
        relay_state: Option<String>,

        /// Validate as of this RFC 3339 instant instead of now.
        #[arg(long)]
        at: Option<String>,
    },

    /// Print the trust derived from identity provider metadata as JSON.
    IdpMetadata {
        /// Metadata XML file.
        path: PathBuf,

        /// Signature algorithm to require.
        #[arg(long, default_value = "sha256")]
        algorithm: SignatureAlgorithm,
    },

    /// Print a certificate as a single line of base64.
    NormalizeCert {
        /// PEM or base64 certificate file.
        path: PathBuf,
    },
}

/// Login request options.
#[derive(Debug, clap::Args)]
pub struct LoginArgs {
    /// Opaque state returned by the identity provider.
    #[arg(long)]
    pub relay_state: Option<String>,

    /// Set `ForceAuthn`; defaults to the configured preference.
    #[arg(long)]
    pub force_authn: Option<bool>,
}
