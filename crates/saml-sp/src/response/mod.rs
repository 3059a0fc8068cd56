//! Login response processing.
//!
//! A response is trusted only after every stage has passed, in this order:
//!
//! 1. decode the HTTP-POST form
//! 2. validate against the protocol schema
//! 3. decrypt encrypted assertions with the current encryption key
//! 4. verify every signature against the identity provider's allow-list
//! 5. read the response, remapping attribute names, and require every
//!    assertion to be covered by a verified signature
//! 6. check status codes
//! 7. check the response issuer
//! 8. check each assertion's issuer and audience
//! 9. check each assertion's validity window
//!
//! The first failure aborts processing and is returned unchanged.

pub mod checks;
mod extract;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::bindings::HttpPostBinding;
use crate::encryption::decrypt_document;
use crate::error::{SamlError, SamlResult};
use crate::schema::{SamlSchema, SchemaSet};
use crate::signature::SignatureVerifier;
use crate::types::{select_current, IdentityProviderTrust, LoginResponse, LoginResult, Preferences, ServiceProviderConfig};
use crate::xml::Document;

/// Runs the login response pipeline for one provider configuration.
pub struct ResponseProcessor<'a> {
    sp: &'a ServiceProviderConfig,
    idp: &'a IdentityProviderTrust,
    preferences: &'a Preferences,
    schemas: &'a SchemaSet,
}

impl<'a> ResponseProcessor<'a> {
    /// Creates a processor over borrowed provider state.
    pub fn new(
        sp: &'a ServiceProviderConfig,
        idp: &'a IdentityProviderTrust,
        preferences: &'a Preferences,
        schemas: &'a SchemaSet,
    ) -> Self {
        Self {
            sp,
            idp,
            preferences,
            schemas,
        }
    }

    /// Processes HTTP-POST form fields (`SAMLResponse`, `RelayState`).
    pub fn process_form(&self, fields: &BTreeMap<String, String>, now: DateTime<Utc>) -> SamlResult<LoginResult> {
        let decoded = HttpPostBinding::decode_fields(fields).map_err(rejected)?;
        let response = self.process(&decoded.xml, now)?;
        Ok(LoginResult {
            response,
            relay_state: decoded.relay_state,
        })
    }

    /// Processes a decoded response document.
    pub fn process(&self, xml: &str, now: DateTime<Utc>) -> SamlResult<LoginResponse> {
        self.run(xml, now).map_err(rejected)
    }

    fn run(&self, xml: &str, now: DateTime<Utc>) -> SamlResult<LoginResponse> {
        self.schemas.validate(SamlSchema::Protocol, xml)?;
        debug!("login response is schema valid");

        let doc = Document::parse(xml)?;
        let verifier = SignatureVerifier::new(&self.idp.signature);

        let (plaintext, signed) = if doc.find_all("EncryptedAssertion").is_empty() {
            let signed = verifier.verify_document(&doc)?;
            (doc, signed)
        } else {
            let key = select_current(&self.sp.encryption, now)?.private_key()?;
            let decrypted = decrypt_document(&doc, &key)?;
            let signed = verifier.verify_decrypted(&decrypted.original, &decrypted.plaintext, &decrypted.decrypted)?;
            (decrypted.plaintext, signed)
        };
        debug!(signatures = signed.len(), "login response signatures verified");

        let parsed = extract::parse_response(&plaintext, self.preferences)?;
        checks::check_coverage(&parsed.assertion_paths, &signed)?;
        let response = parsed.response;

        checks::check_status_codes(&response.status_codes)?;
        checks::check_issuer(&response.issuer, &self.idp.id)?;

        let audience = checks::expected_audience(&self.sp.id);
        for assertion in &response.assertions {
            checks::check_issuer(&assertion.issuer, &self.idp.id)?;
            checks::check_audience(assertion, &audience)?;
            checks::check_validity(assertion, now, self.preferences.strict_time_check)?;
        }

        debug!(
            response_id = %response.id,
            assertions = response.assertions.len(),
            "login response accepted"
        );
        Ok(response)
    }
}

fn rejected(err: SamlError) -> SamlError {
    warn!(error = %err, category = ?err.category(), "rejected login response");
    err
}
