//! Encrypted assertion decryption.
//!
//! `EncryptedAssertion` elements are replaced in place by the `Assertion`
//! they carry. The content key is transported in an `EncryptedKey`, found
//! either in `EncryptedData/KeyInfo` or next to `EncryptedData`.
//!
//! Documents without encrypted assertions pass through untouched.

use base64::Engine;
use saml_sp_crypto::cipher::BlockCipher;
use saml_sp_crypto::key_transport::{unwrap_key, KeyTransport};
use saml_sp_crypto::PrivateKeyDer;
use tracing::debug;

use crate::error::{SamlError, SamlResult};
use crate::xml::{Document, Element, NodePath};

/// A document before and after decryption.
#[derive(Debug, Clone)]
pub struct DecryptedDocument {
    /// The document as received.
    pub original: Document,
    /// The document with every `EncryptedAssertion` replaced.
    pub plaintext: Document,
    /// Paths of the replaced elements (identical in both documents).
    pub decrypted: Vec<NodePath>,
}

impl DecryptedDocument {
    /// Returns true when at least one assertion was decrypted.
    #[must_use]
    pub fn was_encrypted(&self) -> bool {
        !self.decrypted.is_empty()
    }
}

/// Decrypts every `EncryptedAssertion` in `xml`.
///
/// Returns the input unchanged when nothing is encrypted.
pub fn decrypt(xml: &str, private_key: &PrivateKeyDer) -> SamlResult<String> {
    let doc = Document::parse(xml)?;
    let decrypted = decrypt_document(&doc, private_key)?;
    if decrypted.was_encrypted() {
        Ok(decrypted.plaintext.to_xml())
    } else {
        Ok(xml.to_string())
    }
}

/// Decrypts every `EncryptedAssertion` in a parsed document.
pub fn decrypt_document(doc: &Document, private_key: &PrivateKeyDer) -> SamlResult<DecryptedDocument> {
    let paths = doc.find_all("EncryptedAssertion");
    let mut plaintext = doc.clone();

    for path in &paths {
        let encrypted = doc
            .element_at(path)
            .ok_or_else(|| SamlError::MissingElement("EncryptedAssertion".to_string()))?;
        let assertion = decrypt_assertion(encrypted, private_key)?;
        plaintext.replace_element(path, assertion);
    }

    if !paths.is_empty() {
        debug!(count = paths.len(), "decrypted assertions");
    }

    Ok(DecryptedDocument {
        original: doc.clone(),
        plaintext,
        decrypted: paths,
    })
}

fn decrypt_assertion(encrypted: &Element, private_key: &PrivateKeyDer) -> SamlResult<Element> {
    let data = encrypted
        .child("EncryptedData")
        .ok_or_else(|| failed("EncryptedData missing"))?;

    let method = data
        .child("EncryptionMethod")
        .and_then(|m| m.attribute("Algorithm"))
        .ok_or_else(|| failed("EncryptionMethod missing"))?;
    let cipher = BlockCipher::from_uri(method)
        .ok_or_else(|| failed(&format!("unsupported encryption method {method}")))?;

    let encrypted_key = data
        .child("KeyInfo")
        .and_then(|key_info| key_info.child("EncryptedKey"))
        .or_else(|| encrypted.child("EncryptedKey"))
        .ok_or_else(|| failed("EncryptedKey missing"))?;

    let key_method = encrypted_key
        .child("EncryptionMethod")
        .ok_or_else(|| failed("key EncryptionMethod missing"))?;
    let transport = KeyTransport::from_uris(
        key_method.attribute("Algorithm").unwrap_or_default(),
        key_method.child("DigestMethod").and_then(|d| d.attribute("Algorithm")),
        key_method.child("MGF").and_then(|m| m.attribute("Algorithm")),
    )
    .map_err(|e| failed(&e.to_string()))?;

    let wrapped_key = cipher_value(encrypted_key)?;
    let key = unwrap_key(private_key, transport, &wrapped_key).map_err(|e| failed(&e.to_string()))?;

    let content = cipher
        .decrypt(&key, &cipher_value(data)?)
        .map_err(|e| failed(&e.to_string()))?;
    let content = String::from_utf8(content).map_err(|_| failed("decrypted content is not UTF-8"))?;
    if content.trim().is_empty() {
        return Err(failed("decrypted content is empty"));
    }

    let assertion = Document::parse(content.trim())
        .map_err(|e| failed(&format!("decrypted content is not XML: {e}")))?
        .root()
        .clone();
    if assertion.local_name != "Assertion" {
        return Err(failed("decrypted content is not an Assertion"));
    }

    Ok(assertion)
}

fn cipher_value(el: &Element) -> SamlResult<Vec<u8>> {
    let text = el
        .child("CipherData")
        .and_then(|data| data.child("CipherValue"))
        .map(Element::text)
        .ok_or_else(|| failed("CipherValue missing"))?;
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| failed(&format!("invalid CipherValue: {e}")))
}

fn failed(reason: &str) -> SamlError {
    SamlError::DecryptionFailed(reason.to_string())
}
