//! XML Signature support for SAML.
//!
//! Enveloped XML-DSig signatures over SAML messages and assertions:
//! - RSA-SHA256 and RSA-SHA512 signature methods
//! - SHA-256 and SHA-512 reference digests
//! - exclusive canonicalization (inclusive C14N 1.0 is accepted on input)
//!
//! Verification is fail-closed. Every `Signature` element in the document
//! must be signed by an allow-listed certificate and must verify; a single
//! failure rejects the whole document.

mod signer;
mod verifier;

pub use signer::*;
pub use verifier::*;

use crate::xml::Element;

const DS_PREFIX: &str = "ds";

fn ds(local_name: &str) -> Element {
    Element::new(Some(DS_PREFIX), local_name)
}
