//! Per-provider behaviour switches.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::constants::name_id_formats;

/// Provider preferences. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Sign `AuthnRequest`s.
    pub sign_login_requests: bool,
    /// Treat missing `NotBefore`/`NotOnOrAfter` as a failure.
    pub strict_time_check: bool,
    /// Attribute name to output key.
    pub attribute_mapping: BTreeMap<String, String>,
    /// Name ID format requested by `NameIDPolicy` and advertised in metadata.
    pub name_id_format: String,
    /// Include a `NameIDPolicy` in login requests.
    pub add_name_id_policy: bool,
    /// Default for `ForceAuthn`.
    pub force_authentication_by_default: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            sign_login_requests: true,
            strict_time_check: false,
            attribute_mapping: BTreeMap::new(),
            name_id_format: name_id_formats::EMAIL_ADDRESS.to_string(),
            add_name_id_policy: false,
            force_authentication_by_default: false,
        }
    }
}

impl Preferences {
    /// Returns the output key for a SAML attribute name.
    #[must_use]
    pub fn map_attribute<'a>(&'a self, name: &'a str) -> &'a str {
        self.attribute_mapping.get(name).map_or(name, String::as_str)
    }

    /// Sets whether login requests are signed.
    #[must_use]
    pub fn with_sign_login_requests(mut self, sign: bool) -> Self {
        self.sign_login_requests = sign;
        self
    }

    /// Sets strict time checking.
    #[must_use]
    pub fn with_strict_time_check(mut self, strict: bool) -> Self {
        self.strict_time_check = strict;
        self
    }

    /// Adds an attribute mapping.
    #[must_use]
    pub fn with_attribute_mapping(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.attribute_mapping.insert(from.into(), to.into());
        self
    }

    /// Sets the name ID format.
    #[must_use]
    pub fn with_name_id_format(mut self, format: impl Into<String>) -> Self {
        self.name_id_format = format.into();
        self
    }

    /// Sets whether a `NameIDPolicy` is added.
    #[must_use]
    pub fn with_name_id_policy(mut self, add: bool) -> Self {
        self.add_name_id_policy = add;
        self
    }

    /// Sets the default for `ForceAuthn`.
    #[must_use]
    pub fn with_force_authentication_by_default(mut self, force: bool) -> Self {
        self.force_authentication_by_default = force;
        self
    }
}
