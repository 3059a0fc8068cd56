//! RSA PKCS#1 v1.5 signatures for XML-DSig.
//!
//! SAML 2.0 deployments still sign with RSA-SHA256 almost universally, so
//! both SHA-256 and SHA-512 variants are provided.

use aws_lc_rs::{
    rand::SystemRandom,
    signature::{self, RsaKeyPair, UnparsedPublicKey},
};

use crate::algorithm::SignatureAlgorithm;
use crate::error::{CryptoError, CryptoResult};
use crate::pem::PrivateKeyDer;

/// Signs data using RSA PKCS#1 v1.5.
///
/// # Arguments
///
/// * `private_key` - RSA private key in PKCS#1 or PKCS#8 DER form
/// * `data` - Data to sign
/// * `algorithm` - Signature algorithm
///
/// # Errors
///
/// Returns an error if the key cannot be parsed or signing fails.
pub fn rsa_sign(
    private_key: &PrivateKeyDer,
    data: &[u8],
    algorithm: SignatureAlgorithm,
) -> CryptoResult<Vec<u8>> {
    let key_pair = match private_key {
        PrivateKeyDer::Pkcs1(der) => RsaKeyPair::from_der(der),
        PrivateKeyDer::Pkcs8(der) => RsaKeyPair::from_pkcs8(der),
    }
    .map_err(|e| CryptoError::InvalidKey(format!("invalid RSA key: {e}")))?;

    let rng = SystemRandom::new();
    let mut sig = vec![0u8; key_pair.public_modulus_len()];

    let padding = match algorithm {
        SignatureAlgorithm::RsaSha256 => &signature::RSA_PKCS1_SHA256,
        SignatureAlgorithm::RsaSha512 => &signature::RSA_PKCS1_SHA512,
    };

    key_pair
        .sign(padding, &rng, data, &mut sig)
        .map_err(|e| CryptoError::Signing(format!("RSA signing failed: {e}")))?;

    Ok(sig)
}

/// Verifies an RSA PKCS#1 v1.5 signature.
///
/// # Arguments
///
/// * `public_key` - RSA public key as a DER `RSAPublicKey`
/// * `data` - Original data that was signed
/// * `sig` - Signature to verify
/// * `algorithm` - Signature algorithm
///
/// Returns `Ok(false)` when the signature does not match.
pub fn rsa_verify(
    public_key: &[u8],
    data: &[u8],
    sig: &[u8],
    algorithm: SignatureAlgorithm,
) -> CryptoResult<bool> {
    use aws_lc_rs::signature::{RSA_PKCS1_2048_8192_SHA256, RSA_PKCS1_2048_8192_SHA512};

    let verification_alg: &dyn signature::VerificationAlgorithm = match algorithm {
        SignatureAlgorithm::RsaSha256 => &RSA_PKCS1_2048_8192_SHA256,
        SignatureAlgorithm::RsaSha512 => &RSA_PKCS1_2048_8192_SHA512,
    };

    let public_key = UnparsedPublicKey::new(verification_alg, public_key);

    match public_key.verify(data, sig) {
        Ok(()) => Ok(true),
        Err(_) => Ok(false),
    }
}
