//! Semantic checks on a verified response.

use chrono::{DateTime, Utc};

use crate::error::{SamlError, SamlResult};
use crate::types::constants::status_codes;
use crate::types::Assertion;
use crate::xml::{path_within, NodePath};

/// Every status code, nested ones included, must be a permitted top-level code.
pub fn check_status_codes(codes: &[String]) -> SamlResult<()> {
    match codes.iter().find(|code| !status_codes::ACCEPTED.contains(&code.as_str())) {
        Some(code) => Err(SamlError::InvalidStatusCode(code.clone())),
        None => Ok(()),
    }
}

/// The response must come from the configured identity provider.
pub fn check_issuer(actual: &str, expected: &str) -> SamlResult<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(SamlError::UnknownIssuer {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// The audience an assertion must name for this service provider.
///
/// A URL-shaped entity id is used as is; anything else gets the `spn:`
/// prefix that Azure AD puts on non-URL application ids.
#[must_use]
pub fn expected_audience(sp_id: &str) -> String {
    let has_host = url::Url::parse(sp_id)
        .ok()
        .and_then(|url| url.host_str().map(|host| !host.is_empty()))
        .unwrap_or(false);
    if has_host {
        sp_id.to_string()
    } else {
        format!("spn:{sp_id}")
    }
}

/// Checks one assertion's audience.
pub fn check_audience(assertion: &Assertion, expected: &str) -> SamlResult<()> {
    match assertion.audience.as_deref() {
        Some(audience) if audience == expected => Ok(()),
        other => Err(SamlError::UnexpectedAudience {
            expected: expected.to_string(),
            actual: other.unwrap_or_default().to_string(),
        }),
    }
}

/// `not_before <= now < not_on_or_after`. Missing bounds are unbounded
/// unless `strict` is set.
#[must_use]
pub fn check_time(
    not_before: Option<DateTime<Utc>>,
    not_on_or_after: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    strict: bool,
) -> bool {
    if strict && (not_before.is_none() || not_on_or_after.is_none()) {
        return false;
    }
    not_before.map_or(true, |nb| nb <= now) && not_on_or_after.map_or(true, |na| na > now)
}

/// Checks one assertion's validity window.
pub fn check_validity(assertion: &Assertion, now: DateTime<Utc>, strict: bool) -> SamlResult<()> {
    if check_time(assertion.not_before, assertion.not_on_or_after, now, strict) {
        Ok(())
    } else {
        Err(SamlError::AssertionExpired)
    }
}

/// Every assertion must lie inside an element covered by a verified
/// signature.
pub(crate) fn check_coverage(assertions: &[NodePath], signed: &[NodePath]) -> SamlResult<()> {
    let uncovered = assertions
        .iter()
        .any(|assertion| !signed.iter().any(|s| path_within(assertion, s)));
    if uncovered {
        Err(SamlError::NoSignature)
    } else {
        Ok(())
    }
}
