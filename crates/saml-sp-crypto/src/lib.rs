//! # saml-sp-crypto
//!
//! Cryptographic primitives for the SAML service provider.
//!
//! Signing, verification and digests go through aws-lc-rs. XML Encryption
//! key transport (RSA-OAEP, RSA PKCS#1 v1.5) and the AES block modes used
//! by encrypted assertions come from the RustCrypto crates.
//!
//! ## Supported algorithms
//!
//! - Signatures: RSA PKCS#1 v1.5 with SHA-256 or SHA-512
//! - Digests: SHA-256, SHA-512
//! - Key transport: RSA-OAEP (SHA-1/SHA-256/SHA-512 digests, MGF1), RSA PKCS#1 v1.5
//! - Content encryption: AES-CBC and AES-GCM with 128, 192 or 256 bit keys

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod algorithm;
pub mod cipher;
pub mod error;
pub mod hash;
pub mod key_transport;
pub mod pem;
pub mod signing;
pub mod x509;

pub use algorithm::{HashAlgorithm, SignatureAlgorithm};
pub use error::{CryptoError, CryptoResult};
pub use hash::{digest, digests_match, sha256, sha512};
pub use pem::{certificate_der, certificate_to_pem, normalize_certificate, PrivateKeyDer};
pub use signing::{rsa_sign, rsa_verify};
pub use x509::CertificateInfo;
