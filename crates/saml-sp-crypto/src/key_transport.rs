//! XML Encryption key transport.
//!
//! The symmetric key protecting an encrypted assertion is itself encrypted
//! with the service provider's RSA public key.

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Oaep, Pkcs1v15Encrypt, RsaPrivateKey};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use crate::error::{CryptoError, CryptoResult};
use crate::pem::PrivateKeyDer;

/// `xmlenc#rsa-oaep-mgf1p` key transport URI.
pub const RSA_OAEP_MGF1P: &str = "http://www.w3.org/2001/04/xmlenc#rsa-oaep-mgf1p";
/// `xmlenc11#rsa-oaep` key transport URI.
pub const RSA_OAEP: &str = "http://www.w3.org/2009/xmlenc11#rsa-oaep";
/// `xmlenc#rsa-1_5` key transport URI.
pub const RSA_1_5: &str = "http://www.w3.org/2001/04/xmlenc#rsa-1_5";

/// Digest used inside OAEP padding or its mask generation function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OaepDigest {
    /// SHA-1 (the XML Encryption default).
    #[default]
    Sha1,
    /// SHA-256.
    Sha256,
    /// SHA-512.
    Sha512,
}

impl OaepDigest {
    /// Parses an OAEP `DigestMethod` URI.
    #[must_use]
    pub fn from_digest_uri(uri: &str) -> Option<Self> {
        match uri {
            "http://www.w3.org/2000/09/xmldsig#sha1" => Some(Self::Sha1),
            "http://www.w3.org/2001/04/xmlenc#sha256" => Some(Self::Sha256),
            "http://www.w3.org/2001/04/xmlenc#sha512" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// Parses an `xenc11:MGF` algorithm URI.
    #[must_use]
    pub fn from_mgf_uri(uri: &str) -> Option<Self> {
        match uri {
            "http://www.w3.org/2009/xmlenc11#mgf1sha1" => Some(Self::Sha1),
            "http://www.w3.org/2009/xmlenc11#mgf1sha256" => Some(Self::Sha256),
            "http://www.w3.org/2009/xmlenc11#mgf1sha512" => Some(Self::Sha512),
            _ => None,
        }
    }
}

/// Key transport algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTransport {
    /// RSA-OAEP with the given content digest and MGF1 digest.
    RsaOaep {
        /// OAEP digest.
        digest: OaepDigest,
        /// MGF1 digest.
        mgf: OaepDigest,
    },
    /// RSA PKCS#1 v1.5 (legacy).
    RsaPkcs1v15,
}

impl KeyTransport {
    /// Resolves a key transport algorithm from its URI and optional
    /// `DigestMethod` / `MGF` algorithm URIs.
    pub fn from_uris(
        algorithm: &str,
        digest_uri: Option<&str>,
        mgf_uri: Option<&str>,
    ) -> CryptoResult<Self> {
        let digest = match digest_uri {
            Some(uri) => OaepDigest::from_digest_uri(uri)
                .ok_or_else(|| CryptoError::UnsupportedAlgorithm(uri.to_string()))?,
            None => OaepDigest::Sha1,
        };

        match algorithm {
            RSA_OAEP_MGF1P => Ok(Self::RsaOaep {
                digest,
                mgf: OaepDigest::Sha1,
            }),
            RSA_OAEP => {
                let mgf = match mgf_uri {
                    Some(uri) => OaepDigest::from_mgf_uri(uri)
                        .ok_or_else(|| CryptoError::UnsupportedAlgorithm(uri.to_string()))?,
                    None => OaepDigest::Sha1,
                };
                Ok(Self::RsaOaep { digest, mgf })
            }
            RSA_1_5 => Ok(Self::RsaPkcs1v15),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Decrypts a transported symmetric key with the RSA private key.
pub fn unwrap_key(
    private_key: &PrivateKeyDer,
    transport: KeyTransport,
    encrypted_key: &[u8],
) -> CryptoResult<Vec<u8>> {
    let key = match private_key {
        PrivateKeyDer::Pkcs8(der) => RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?,
        PrivateKeyDer::Pkcs1(der) => RsaPrivateKey::from_pkcs1_der(der)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?,
    };

    let result = match transport {
        KeyTransport::RsaOaep { digest, mgf } => key.decrypt(oaep_padding(digest, mgf), encrypted_key),
        KeyTransport::RsaPkcs1v15 => key.decrypt(Pkcs1v15Encrypt, encrypted_key),
    };

    result.map_err(|e| CryptoError::Decryption(format!("key transport: {e}")))
}

fn oaep_padding(digest: OaepDigest, mgf: OaepDigest) -> Oaep {
    use OaepDigest as D;

    match (digest, mgf) {
        (D::Sha1, D::Sha1) => Oaep::new::<Sha1>(),
        (D::Sha1, D::Sha256) => Oaep::new_with_mgf_hash::<Sha1, Sha256>(),
        (D::Sha1, D::Sha512) => Oaep::new_with_mgf_hash::<Sha1, Sha512>(),
        (D::Sha256, D::Sha1) => Oaep::new_with_mgf_hash::<Sha256, Sha1>(),
        (D::Sha256, D::Sha256) => Oaep::new::<Sha256>(),
        (D::Sha256, D::Sha512) => Oaep::new_with_mgf_hash::<Sha256, Sha512>(),
        (D::Sha512, D::Sha1) => Oaep::new_with_mgf_hash::<Sha512, Sha1>(),
        (D::Sha512, D::Sha256) => Oaep::new_with_mgf_hash::<Sha512, Sha256>(),
        (D::Sha512, D::Sha512) => Oaep::new::<Sha512>(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::RsaPublicKey;

    const KEY_PEM: &str = include_str!("../../saml-sp/tests/fixtures/sp-key.pem");
    const ROGUE_KEY_PEM: &str = include_str!("../../saml-sp/tests/fixtures/rogue-key.pem");

    fn public_key() -> RsaPublicKey {
        let der = PrivateKeyDer::from_pem(KEY_PEM).unwrap();
        RsaPrivateKey::from_pkcs8_der(der.as_bytes()).unwrap().to_public_key()
    }

    #[test]
    fn resolves_transport_uris() {
        assert_eq!(
            KeyTransport::from_uris(RSA_OAEP_MGF1P, None, None).unwrap(),
            KeyTransport::RsaOaep { digest: OaepDigest::Sha1, mgf: OaepDigest::Sha1 }
        );
        assert_eq!(
            KeyTransport::from_uris(
                RSA_OAEP,
                Some("http://www.w3.org/2001/04/xmlenc#sha256"),
                Some("http://www.w3.org/2009/xmlenc11#mgf1sha256"),
            )
            .unwrap(),
            KeyTransport::RsaOaep { digest: OaepDigest::Sha256, mgf: OaepDigest::Sha256 }
        );
        assert_eq!(KeyTransport::from_uris(RSA_1_5, None, None).unwrap(), KeyTransport::RsaPkcs1v15);
        assert!(KeyTransport::from_uris("urn:unknown", None, None).is_err());
    }

    #[test]
    fn unwraps_oaep_key() {
        let mut rng = rand::thread_rng();
        let wrapped = public_key()
            .encrypt(&mut rng, Oaep::new::<Sha1>(), &[7u8; 32])
            .unwrap();

        let key = PrivateKeyDer::from_pem(KEY_PEM).unwrap();
        let transport = KeyTransport::RsaOaep { digest: OaepDigest::Sha1, mgf: OaepDigest::Sha1 };
        assert_eq!(unwrap_key(&key, transport, &wrapped).unwrap(), vec![7u8; 32]);
    }

    #[test]
    fn unwraps_pkcs1v15_key() {
        let mut rng = rand::thread_rng();
        let wrapped = public_key().encrypt(&mut rng, Pkcs1v15Encrypt, &[9u8; 16]).unwrap();

        let key = PrivateKeyDer::from_pem(KEY_PEM).unwrap();
        assert_eq!(unwrap_key(&key, KeyTransport::RsaPkcs1v15, &wrapped).unwrap(), vec![9u8; 16]);
    }

    #[test]
    fn wrong_key_fails() {
        let mut rng = rand::thread_rng();
        let wrapped = public_key()
            .encrypt(&mut rng, Oaep::new::<Sha1>(), &[7u8; 32])
            .unwrap();

        let rogue = PrivateKeyDer::from_pem(ROGUE_KEY_PEM).unwrap();
        let transport = KeyTransport::RsaOaep { digest: OaepDigest::Sha1, mgf: OaepDigest::Sha1 };
        assert!(matches!(
            unwrap_key(&rogue, transport, &wrapped),
            Err(CryptoError::Decryption(_))
        ));
    }
}
