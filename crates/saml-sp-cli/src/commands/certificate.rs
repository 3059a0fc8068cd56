//! Certificate utilities.

use std::path::Path;

use saml_sp_crypto::normalize_certificate;

use crate::CliError;

/// Reads a certificate file and returns it as one line of base64.
pub fn normalize(path: &Path) -> crate::CliResult<String> {
    let normalized = normalize_certificate(&std::fs::read_to_string(path)?);
    if normalized.is_empty() {
        return Err(CliError::InvalidArgument(format!("{} holds no certificate", path.display())));
    }
    Ok(normalized)
}
