//! Login response command.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use saml_sp::bindings::{RELAY_STATE, SAML_RESPONSE};
use saml_sp::ServiceProvider;

use crate::output::{json, warning};
use crate::CliError;

/// Runs the full response pipeline on a base64 `SAMLResponse` file.
pub fn parse(
    provider: &ServiceProvider,
    file: &Path,
    relay_state: Option<String>,
    at: Option<&str>,
) -> crate::CliResult<String> {
    let mut form = BTreeMap::new();
    form.insert(SAML_RESPONSE.to_string(), std::fs::read_to_string(file)?);
    if let Some(rs) = relay_state {
        form.insert(RELAY_STATE.to_string(), rs);
    }

    let result = match at {
        Some(at) => {
            let now = DateTime::parse_from_rfc3339(at)
                .map_err(|e| CliError::InvalidArgument(format!("--at: {e}")))?
                .with_timezone(&Utc);
            warning(&format!("validating as of {now}"));
            provider.parse_login_response_at(&form, now)?
        }
        None => provider.parse_login_response(&form)?,
    };
    json(&result)
}
