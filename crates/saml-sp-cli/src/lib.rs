//! # saml-sp-cli
//!
//! Command-line tools for the SAML service provider:
//! - Service provider metadata
//! - Login URLs and POST forms
//! - Offline validation of captured login responses
//! - Identity provider metadata inspection
//! - Certificate normalization

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::Cli;
pub use error::{CliError, CliResult};
