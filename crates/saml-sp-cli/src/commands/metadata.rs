//! Metadata commands.

use std::path::Path;

use saml_sp::schema::{SamlSchema, SchemaSet};
use saml_sp::{ServiceProvider, SignatureAlgorithm};

use crate::output::json;

/// Renders the service provider metadata.
pub fn service_provider(provider: &ServiceProvider, validate: bool) -> crate::CliResult<String> {
    let xml = provider.metadata();
    if validate {
        SchemaSet::builtin().validate(SamlSchema::Metadata, &xml)?;
    }
    Ok(xml)
}

/// Extracts identity provider trust from a metadata file.
pub fn identity_provider(path: &Path, algorithm: SignatureAlgorithm) -> crate::CliResult<String> {
    let xml = std::fs::read_to_string(path)?;
    let trust = saml_sp::metadata::extract_with_algorithm(&xml, algorithm)?;
    json(&trust)
}
