//! Command implementations.
//!
//! Every command returns its output instead of printing it, so `main` owns
//! stdout.

pub mod certificate;
pub mod login;
pub mod metadata;
pub mod response;

use std::path::Path;

use saml_sp::{ProviderConfig, ServiceProvider};
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::{CliError, CliResult};

/// Runs the parsed command line.
pub async fn run(cli: Cli) -> CliResult<String> {
    match cli.command {
        Command::Metadata { validate } => metadata::service_provider(&load(cli.config.as_deref())?, validate),
        Command::LoginUrl(args) => login::redirect_url(&load(cli.config.as_deref())?, &args).await,
        Command::LoginForm(args) => login::post_form(&load(cli.config.as_deref())?, &args).await,
        Command::ParseResponse { file, relay_state, at } => {
            response::parse(&load(cli.config.as_deref())?, &file, relay_state, at.as_deref())
        }
        Command::IdpMetadata { path, algorithm } => metadata::identity_provider(&path, algorithm),
        Command::NormalizeCert { path } => certificate::normalize(&path),
    }
}

/// Builds the provider described by a configuration file.
pub fn load(config: Option<&Path>) -> CliResult<ServiceProvider> {
    let path = config.ok_or_else(|| {
        CliError::Config("no configuration file; pass --config or set SAML_SP_CONFIG".to_string())
    })?;
    debug!(path = %path.display(), "loading configuration");
    let options = ProviderConfig::from_file(path)?.into_options()?;
    Ok(ServiceProvider::from_options(options)?)
}
