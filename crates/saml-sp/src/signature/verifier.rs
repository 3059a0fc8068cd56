//! XML Signature verification.

use base64::Engine;
use saml_sp_crypto::{digest, digests_match, rsa_verify, CertificateInfo, HashAlgorithm, SignatureAlgorithm};
use tracing::debug;

use crate::bindings::RedirectQuery;
use crate::error::{SamlError, SamlResult};
use crate::types::constants::transforms;
use crate::types::SignatureTrust;
use crate::xml::{canonicalize, path_within, C14nMode, Document, Element, NodePath};

/// Verifies XML and detached redirect signatures against a trust set.
pub struct SignatureVerifier<'a> {
    trust: &'a SignatureTrust,
}

impl<'a> SignatureVerifier<'a> {
    /// Creates a verifier for the given trust set.
    pub fn new(trust: &'a SignatureTrust) -> Self {
        Self { trust }
    }

    /// Parses and verifies every signature in `xml`.
    ///
    /// Returns the paths of the signed elements.
    pub fn verify(&self, xml: &str) -> SamlResult<Vec<NodePath>> {
        self.verify_document(&Document::parse(xml)?)
    }

    /// Verifies every signature in a parsed document.
    pub fn verify_document(&self, doc: &Document) -> SamlResult<Vec<NodePath>> {
        let signatures = doc.find_all("Signature");
        if signatures.is_empty() {
            return Err(SamlError::NoSignature);
        }

        debug!(count = signatures.len(), "verifying signatures");
        signatures
            .iter()
            .map(|path| self.verify_signature(doc, path))
            .collect()
    }

    /// Verifies a document whose encrypted assertions were replaced.
    ///
    /// Signatures inside a decrypted subtree are checked against the
    /// plaintext. All others are checked against the document as received,
    /// where they cover the ciphertext. Replacement keeps element positions,
    /// so a path means the same element in both documents.
    pub fn verify_decrypted(
        &self,
        original: &Document,
        plaintext: &Document,
        decrypted: &[NodePath],
    ) -> SamlResult<Vec<NodePath>> {
        let signatures = plaintext.find_all("Signature");
        if signatures.is_empty() {
            return Err(SamlError::NoSignature);
        }

        debug!(
            count = signatures.len(),
            decrypted = decrypted.len(),
            "verifying signatures on decrypted document"
        );
        signatures
            .iter()
            .map(|path| {
                let inside = decrypted.iter().any(|d| path_within(path, d));
                let doc = if inside { plaintext } else { original };
                self.verify_signature(doc, path)
            })
            .collect()
    }

    /// Verifies a detached HTTP-Redirect signature.
    ///
    /// `raw_query` must be the query string exactly as received: the signed
    /// octets are the original URL-encoded `SAMLRequest`/`SAMLResponse`,
    /// `RelayState` and `SigAlg` parameters.
    pub fn verify_redirect(&self, raw_query: &str) -> SamlResult<()> {
        self.verify_redirect_query(&RedirectQuery::parse(raw_query)?)
    }

    /// Verifies the detached signature of an already split redirect query.
    ///
    /// Callers decode the message from the same [`RedirectQuery`], so the
    /// verified parameters are the ones acted on.
    pub fn verify_redirect_query(&self, query: &RedirectQuery) -> SamlResult<()> {
        let (message, sig_alg, signature) = match (&query.message, &query.sig_alg, &query.signature) {
            (Some((_, m)), Some(a), Some(s)) => (m, a, s),
            (None, _, _) => return Err(SamlError::MissingElement("SAMLRequest".to_string())),
            _ => return Err(SamlError::NoSignature),
        };

        let algorithm = SignatureAlgorithm::from_xml_dsig_uri(&sig_alg.value)
            .ok_or_else(|| SamlError::InvalidSignature(format!("unsupported SigAlg {}", sig_alg.value)))?;
        if algorithm != self.trust.algorithm {
            return Err(SamlError::InvalidSignature(format!(
                "expected {}, got {}",
                self.trust.algorithm, algorithm
            )));
        }

        // an unencoded '+' in the base64 value arrives as a space
        let signature = decode_base64(&signature.value.replace(' ', "+"))?;

        let signed: Vec<&str> = [Some(message), query.relay_state.as_ref(), Some(sig_alg)]
            .into_iter()
            .flatten()
            .map(|parameter| parameter.raw.as_str())
            .collect();
        let signed = signed.join("&");

        for cert in &self.trust.allowed_certificates {
            let Ok(info) = CertificateInfo::from_pem(cert) else {
                continue;
            };
            if rsa_verify(info.public_key(), signed.as_bytes(), &signature, algorithm)? {
                debug!(algorithm = %algorithm, "detached signature verified");
                return Ok(());
            }
        }

        Err(SamlError::InvalidSignature(
            "detached signature does not match any allowed certificate".to_string(),
        ))
    }

    fn verify_signature(&self, doc: &Document, sig_path: &[usize]) -> SamlResult<NodePath> {
        let signature = element(doc, sig_path)?;

        // certificate identity is judged before anything else in the block
        let embedded = signature
            .child("KeyInfo")
            .and_then(|key_info| key_info.descendant("X509Certificate"))
            .map(Element::text)
            .ok_or(SamlError::UntrustedCertificate)?;
        if !self.trust.allows(&embedded) {
            return Err(SamlError::UntrustedCertificate);
        }
        let certificate = CertificateInfo::from_pem(&embedded)
            .map_err(|e| SamlError::InvalidSignature(format!("unreadable certificate: {e}")))?;

        let (signed_info_index, signed_info) = signature
            .indexed_child_elements()
            .find(|(_, el)| el.local_name == "SignedInfo")
            .ok_or_else(|| invalid("SignedInfo missing"))?;

        let c14n_method = algorithm_of(signed_info.child("CanonicalizationMethod"))
            .ok_or_else(|| invalid("CanonicalizationMethod missing"))?;
        let c14n_mode = C14nMode::from_uri(c14n_method, prefix_list(signed_info.child("CanonicalizationMethod")))
            .ok_or_else(|| invalid(&format!("unsupported canonicalization {c14n_method}")))?;

        let method = algorithm_of(signed_info.child("SignatureMethod"))
            .ok_or_else(|| invalid("SignatureMethod missing"))?;
        let algorithm = SignatureAlgorithm::from_xml_dsig_uri(method)
            .ok_or_else(|| invalid(&format!("unsupported signature method {method}")))?;
        if algorithm != self.trust.algorithm {
            return Err(invalid(&format!(
                "expected {}, got {}",
                self.trust.algorithm, algorithm
            )));
        }

        let mut references = signed_info.children_named("Reference");
        let reference = references.next().ok_or_else(|| invalid("Reference missing"))?;
        if references.next().is_some() {
            return Err(invalid("multiple references"));
        }

        let signed_path = resolve_reference(doc, sig_path, reference.attribute("URI").unwrap_or(""))?;
        let reference_mode = reference_transforms(reference)?;

        let digest_method = algorithm_of(reference.child("DigestMethod"))
            .ok_or_else(|| invalid("DigestMethod missing"))?;
        let digest_algorithm = HashAlgorithm::from_xml_digest_uri(digest_method)
            .ok_or_else(|| invalid(&format!("unsupported digest method {digest_method}")))?;
        let expected_digest = reference
            .child("DigestValue")
            .map(Element::text)
            .ok_or_else(|| invalid("DigestValue missing"))?;
        let expected_digest = decode_base64(&expected_digest)?;

        let canonical = canonicalize(doc, &signed_path, &reference_mode, Some(sig_path))
            .map_err(|e| invalid(&e.to_string()))?;
        let actual_digest = digest(digest_algorithm, canonical.as_bytes());
        if !digests_match(&expected_digest, &actual_digest) {
            return Err(invalid("digest mismatch"));
        }

        let signature_value = signature
            .child("SignatureValue")
            .map(Element::text)
            .ok_or_else(|| invalid("SignatureValue missing"))?;
        let signature_value = decode_base64(&signature_value)?;

        let mut signed_info_path = sig_path.to_vec();
        signed_info_path.push(signed_info_index);
        let canonical_signed_info = canonicalize(doc, &signed_info_path, &c14n_mode, None)
            .map_err(|e| invalid(&e.to_string()))?;

        if !rsa_verify(
            certificate.public_key(),
            canonical_signed_info.as_bytes(),
            &signature_value,
            algorithm,
        )? {
            return Err(invalid("signature value mismatch"));
        }

        debug!(algorithm = %algorithm, path = ?signed_path, "signature verified");
        Ok(signed_path)
    }
}

fn element<'d>(doc: &'d Document, path: &[usize]) -> SamlResult<&'d Element> {
    doc.element_at(path)
        .ok_or_else(|| SamlError::MissingElement(format!("no element at {path:?}")))
}

fn invalid(reason: &str) -> SamlError {
    SamlError::InvalidSignature(reason.to_string())
}

fn algorithm_of(el: Option<&Element>) -> Option<&str> {
    el.and_then(|el| el.attribute("Algorithm"))
}

fn prefix_list(el: Option<&Element>) -> Vec<String> {
    el.and_then(|el| el.child("InclusiveNamespaces"))
        .and_then(|ns| ns.attribute("PrefixList"))
        .map(|list| list.split_whitespace().map(ToString::to_string).collect())
        .unwrap_or_default()
}

fn decode_base64(text: &str) -> SamlResult<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| SamlError::InvalidSignature(format!("invalid base64: {e}")))
}

/// Resolves a reference URI and checks that the signature is enveloped by
/// the element it signs.
fn resolve_reference(doc: &Document, sig_path: &[usize], uri: &str) -> SamlResult<NodePath> {
    let target = if uri.is_empty() {
        Vec::new()
    } else {
        let id = uri
            .strip_prefix('#')
            .ok_or_else(|| invalid(&format!("unsupported reference {uri}")))?;
        match doc.find_by_id(id).as_slice() {
            [path] => path.clone(),
            [] => return Err(invalid(&format!("reference {uri} not found"))),
            _ => return Err(invalid(&format!("reference {uri} is ambiguous"))),
        }
    };

    match sig_path.split_last() {
        Some((_, parent)) if parent == target.as_slice() => Ok(target),
        _ => Err(invalid("signature is not enveloped by the referenced element")),
    }
}

fn reference_transforms(reference: &Element) -> SamlResult<C14nMode> {
    let mut enveloped = false;
    let mut mode = None;

    if let Some(transforms_el) = reference.child("Transforms") {
        for transform in transforms_el.children_named("Transform") {
            let uri = transform
                .attribute("Algorithm")
                .ok_or_else(|| invalid("Transform without Algorithm"))?;
            if uri == transforms::ENVELOPED_SIGNATURE {
                enveloped = true;
            } else if let Some(m) = C14nMode::from_uri(uri, prefix_list(Some(transform))) {
                mode = Some(m);
            } else {
                return Err(invalid(&format!("unsupported transform {uri}")));
            }
        }
    }

    if !enveloped {
        return Err(invalid("enveloped-signature transform missing"));
    }
    // without an explicit canonicalization transform the node-set is
    // serialized with inclusive C14N
    Ok(mode.unwrap_or(C14nMode::Inclusive))
}
