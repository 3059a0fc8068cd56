//! Validated login responses.
//!
//! These types are only produced by the response processor after every
//! check has passed, so they cannot be built outside this crate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A validated `samlp:Response`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct LoginResponse {
    /// Response `ID`.
    pub id: String,
    /// `InResponseTo`, when the login was SP-initiated.
    pub in_response_to: Option<String>,
    /// Response issuer.
    pub issuer: String,
    /// Every `StatusCode` value, outermost first.
    pub status_codes: Vec<String>,
    /// Assertions, in document order.
    pub assertions: Vec<Assertion>,
}

/// A validated assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct Assertion {
    /// `Subject/NameID`.
    pub subject: Option<String>,
    /// Assertion issuer.
    pub issuer: String,
    /// `AuthnStatement/@SessionIndex`.
    pub session_index: Option<String>,
    /// `Conditions/@NotBefore`.
    pub not_before: Option<DateTime<Utc>>,
    /// `Conditions/@NotOnOrAfter`.
    pub not_on_or_after: Option<DateTime<Utc>>,
    /// First `AudienceRestriction/Audience`.
    pub audience: Option<String>,
    /// Attributes keyed by mapped name; first value wins.
    pub attributes: BTreeMap<String, String>,
}

impl LoginResponse {
    pub(crate) fn new(
        id: String,
        in_response_to: Option<String>,
        issuer: String,
        status_codes: Vec<String>,
        assertions: Vec<Assertion>,
    ) -> Self {
        Self {
            id,
            in_response_to,
            issuer,
            status_codes,
            assertions,
        }
    }

    /// The subject of the first assertion.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.assertions.first().and_then(|a| a.subject.as_deref())
    }
}

impl Assertion {
    pub(crate) fn new(issuer: String) -> Self {
        Self {
            subject: None,
            issuer,
            session_index: None,
            not_before: None,
            not_on_or_after: None,
            audience: None,
            attributes: BTreeMap::new(),
        }
    }
}

/// A validated response with the relay state it arrived with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResult {
    /// The validated response.
    pub response: LoginResponse,
    /// `RelayState` from the form, if any.
    pub relay_state: Option<String>,
}
