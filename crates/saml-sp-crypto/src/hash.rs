//! Hash functions.

use crate::algorithm::HashAlgorithm;
use aws_lc_rs::{constant_time, digest};

/// Computes a hash of the input data.
#[must_use]
pub fn digest(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    let alg = match algorithm {
        HashAlgorithm::Sha256 => &digest::SHA256,
        HashAlgorithm::Sha512 => &digest::SHA512,
    };

    digest::digest(alg, data).as_ref().to_vec()
}

/// Computes a SHA-256 hash of the input data.
#[must_use]
pub fn sha256(data: &[u8]) -> Vec<u8> {
    digest(HashAlgorithm::Sha256, data)
}

/// Computes a SHA-512 hash of the input data.
#[must_use]
pub fn sha512(data: &[u8]) -> Vec<u8> {
    digest(HashAlgorithm::Sha512, data)
}

/// Compares two digests in constant time.
#[must_use]
pub fn digests_match(expected: &[u8], actual: &[u8]) -> bool {
    constant_time::verify_slices_are_equal(expected, actual).is_ok()
}
