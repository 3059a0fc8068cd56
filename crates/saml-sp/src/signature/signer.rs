//! XML Signature creation.

use base64::Engine;
use saml_sp_crypto::{digest, rsa_sign, PrivateKeyDer, SignatureAlgorithm};
use tracing::debug;

use super::ds;
use crate::error::{SamlError, SamlResult};
use crate::types::constants::{c14n_algorithms, transforms, XMLDSIG_NS};
use crate::types::Certificate;
use crate::xml::{canonicalize, C14nMode, Document, Element, Node};

/// XML document signer.
///
/// Produces enveloped signatures with exclusive canonicalization. The
/// signature is inserted right after the signed element's `Issuer` and
/// carries the signing certificate in `KeyInfo`.
pub struct XmlSigner {
    private_key: PrivateKeyDer,
    certificate: String,
    algorithm: SignatureAlgorithm,
}

impl XmlSigner {
    /// Creates a signer for a certificate and its private key.
    pub fn new(certificate: &Certificate) -> SamlResult<Self> {
        Ok(Self {
            private_key: certificate.private_key()?,
            certificate: certificate.normalized(),
            algorithm: certificate.algorithm(),
        })
    }

    /// Signs the document element.
    ///
    /// The reference points at the root `ID`, or at the whole document when
    /// the root has none.
    pub fn sign(&self, xml: &str) -> SamlResult<String> {
        let mut doc = Document::parse(xml)?;
        let uri = doc
            .root()
            .attribute("ID")
            .map_or_else(String::new, |id| format!("#{id}"));
        self.sign_at(&mut doc, &[], &uri)?;
        Ok(doc.to_xml())
    }

    /// Signs the element whose `ID` is `id`.
    pub fn sign_element(&self, xml: &str, id: &str) -> SamlResult<String> {
        let mut doc = Document::parse(xml)?;
        let path = match doc.find_by_id(id).as_slice() {
            [path] => path.clone(),
            [] => {
                return Err(SamlError::SignatureCreation(format!("element with ID '{id}' not found")));
            }
            _ => {
                return Err(SamlError::SignatureCreation(format!("ID '{id}' is not unique")));
            }
        };
        self.sign_at(&mut doc, &path, &format!("#{id}"))?;
        Ok(doc.to_xml())
    }

    /// Creates a detached signature for the HTTP-Redirect binding.
    ///
    /// `encoded_message` is the already deflated and base64 encoded message.
    /// Returns the query string including `SigAlg` and `Signature`.
    pub fn sign_redirect_query(
        &self,
        param_name: &str,
        encoded_message: &str,
        relay_state: Option<&str>,
    ) -> SamlResult<String> {
        let mut query = format!("{param_name}={}", urlencoding::encode(encoded_message));
        if let Some(rs) = relay_state {
            query.push_str(&format!("&RelayState={}", urlencoding::encode(rs)));
        }
        query.push_str(&format!(
            "&SigAlg={}",
            urlencoding::encode(self.algorithm.xml_dsig_uri())
        ));

        let signature = rsa_sign(&self.private_key, query.as_bytes(), self.algorithm)
            .map_err(|e| SamlError::SignatureCreation(e.to_string()))?;
        let signature_b64 = base64::engine::general_purpose::STANDARD.encode(signature);
        query.push_str(&format!("&Signature={}", urlencoding::encode(&signature_b64)));

        Ok(query)
    }

    fn sign_at(&self, doc: &mut Document, path: &[usize], uri: &str) -> SamlResult<()> {
        let mode = C14nMode::default();
        let canonical = canonicalize(doc, path, &mode, None)?;
        let digest_value = digest(self.algorithm.hash_algorithm(), canonical.as_bytes());
        let digest_b64 = base64::engine::general_purpose::STANDARD.encode(digest_value);

        let signature = self.signature_element(uri, &digest_b64);

        let target = doc
            .element_at_mut(path)
            .ok_or_else(|| SamlError::SignatureCreation("signed element vanished".to_string()))?;
        let position = target
            .indexed_child_elements()
            .find(|(_, el)| el.local_name == "Issuer")
            .map_or(0, |(i, _)| i + 1);
        target.insert_child(position, signature);

        let mut signature_path = path.to_vec();
        signature_path.push(position);
        let mut signed_info_path = signature_path.clone();
        signed_info_path.push(0);

        let canonical_signed_info = canonicalize(doc, &signed_info_path, &mode, None)?;
        let value = rsa_sign(&self.private_key, canonical_signed_info.as_bytes(), self.algorithm)
            .map_err(|e| SamlError::SignatureCreation(e.to_string()))?;
        let value_b64 = base64::engine::general_purpose::STANDARD.encode(value);

        let signature_value = doc
            .element_at_mut(&signature_path)
            .and_then(|sig| sig.children.get_mut(1))
            .and_then(|node| match node {
                Node::Element(el) => Some(el),
                _ => None,
            })
            .ok_or_else(|| SamlError::SignatureCreation("SignatureValue missing".to_string()))?;
        signature_value.children.push(Node::Text(value_b64));

        debug!(algorithm = %self.algorithm, reference = uri, "signed document");
        Ok(())
    }

    fn signature_element(&self, uri: &str, digest_b64: &str) -> Element {
        let reference = ds("Reference")
            .with_attribute("URI", uri)
            .with_child(
                ds("Transforms")
                    .with_child(ds("Transform").with_attribute("Algorithm", transforms::ENVELOPED_SIGNATURE))
                    .with_child(ds("Transform").with_attribute("Algorithm", c14n_algorithms::EXCLUSIVE)),
            )
            .with_child(ds("DigestMethod").with_attribute("Algorithm", self.algorithm.xml_digest_uri()))
            .with_child(ds("DigestValue").with_text(digest_b64));

        let signed_info = ds("SignedInfo")
            .with_child(ds("CanonicalizationMethod").with_attribute("Algorithm", c14n_algorithms::EXCLUSIVE))
            .with_child(ds("SignatureMethod").with_attribute("Algorithm", self.algorithm.xml_dsig_uri()))
            .with_child(reference);

        let key_info = ds("KeyInfo").with_child(
            ds("X509Data").with_child(ds("X509Certificate").with_text(self.certificate.as_str())),
        );

        ds("Signature")
            .with_namespace(Some("ds"), XMLDSIG_NS)
            .with_child(signed_info)
            .with_child(ds("SignatureValue"))
            .with_child(key_info)
    }
}
