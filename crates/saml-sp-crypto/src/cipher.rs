//! Content encryption ciphers for XML Encryption.
//!
//! Cipher value layout:
//! CBC modes prefix a 16-byte IV and use ISO 10126 padding, GCM modes prefix
//! a 12-byte IV and append a 16-byte authentication tag.

use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, KeyIvInit};
use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm};

use crate::error::{CryptoError, CryptoResult};

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes192CbcDec = cbc::Decryptor<aes::Aes192>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type Aes192Gcm = AesGcm<aes::Aes192, U12>;

const CBC_IV_LEN: usize = 16;
const GCM_IV_LEN: usize = 12;
const GCM_TAG_LEN: usize = 16;

/// Block encryption algorithms accepted in `EncryptedData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCipher {
    /// AES-128 in CBC mode.
    Aes128Cbc,
    /// AES-192 in CBC mode.
    Aes192Cbc,
    /// AES-256 in CBC mode.
    Aes256Cbc,
    /// AES-128 in GCM mode.
    Aes128Gcm,
    /// AES-192 in GCM mode.
    Aes192Gcm,
    /// AES-256 in GCM mode.
    Aes256Gcm,
}

impl BlockCipher {
    /// Returns the algorithm URI.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::Aes128Cbc => "http://www.w3.org/2001/04/xmlenc#aes128-cbc",
            Self::Aes192Cbc => "http://www.w3.org/2001/04/xmlenc#aes192-cbc",
            Self::Aes256Cbc => "http://www.w3.org/2001/04/xmlenc#aes256-cbc",
            Self::Aes128Gcm => "http://www.w3.org/2009/xmlenc11#aes128-gcm",
            Self::Aes192Gcm => "http://www.w3.org/2009/xmlenc11#aes192-gcm",
            Self::Aes256Gcm => "http://www.w3.org/2009/xmlenc11#aes256-gcm",
        }
    }

    /// Parses an algorithm URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        [
            Self::Aes128Cbc,
            Self::Aes192Cbc,
            Self::Aes256Cbc,
            Self::Aes128Gcm,
            Self::Aes192Gcm,
            Self::Aes256Gcm,
        ]
        .into_iter()
        .find(|cipher| cipher.uri() == uri)
    }

    /// Returns the key length in bytes.
    #[must_use]
    pub const fn key_len(self) -> usize {
        match self {
            Self::Aes128Cbc | Self::Aes128Gcm => 16,
            Self::Aes192Cbc | Self::Aes192Gcm => 24,
            Self::Aes256Cbc | Self::Aes256Gcm => 32,
        }
    }

    /// Decrypts a cipher value with the given symmetric key.
    pub fn decrypt(self, key: &[u8], cipher_value: &[u8]) -> CryptoResult<Vec<u8>> {
        if key.len() != self.key_len() {
            return Err(CryptoError::Decryption(format!(
                "expected a {} byte key, got {}",
                self.key_len(),
                key.len()
            )));
        }

        match self {
            Self::Aes128Cbc => cbc_decrypt::<Aes128CbcDec>(key, cipher_value),
            Self::Aes192Cbc => cbc_decrypt::<Aes192CbcDec>(key, cipher_value),
            Self::Aes256Cbc => cbc_decrypt::<Aes256CbcDec>(key, cipher_value),
            Self::Aes128Gcm => gcm_decrypt::<Aes128Gcm>(key, cipher_value),
            Self::Aes192Gcm => gcm_decrypt::<Aes192Gcm>(key, cipher_value),
            Self::Aes256Gcm => gcm_decrypt::<Aes256Gcm>(key, cipher_value),
        }
    }
}

fn cbc_decrypt<D>(key: &[u8], cipher_value: &[u8]) -> CryptoResult<Vec<u8>>
where
    D: KeyIvInit + BlockDecryptMut,
{
    if cipher_value.len() <= CBC_IV_LEN || (cipher_value.len() - CBC_IV_LEN) % 16 != 0 {
        return Err(CryptoError::Decryption("malformed CBC cipher value".to_string()));
    }

    let (iv, ciphertext) = cipher_value.split_at(CBC_IV_LEN);
    let mut buffer = ciphertext.to_vec();

    let decrypted_len = D::new_from_slices(key, iv)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?
        .decrypt_padded_mut::<NoPadding>(&mut buffer)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?
        .len();
    buffer.truncate(decrypted_len);

    // ISO 10126: the last byte holds the pad length, the rest is random
    let pad = buffer.last().copied().map_or(0, usize::from);
    if pad == 0 || pad > 16 || pad > buffer.len() {
        return Err(CryptoError::Decryption("invalid padding".to_string()));
    }
    buffer.truncate(buffer.len() - pad);

    Ok(buffer)
}

fn gcm_decrypt<C>(key: &[u8], cipher_value: &[u8]) -> CryptoResult<Vec<u8>>
where
    C: KeyInit + Aead,
{
    if cipher_value.len() < GCM_IV_LEN + GCM_TAG_LEN {
        return Err(CryptoError::Decryption("malformed GCM cipher value".to_string()));
    }

    let (iv, ciphertext) = cipher_value.split_at(GCM_IV_LEN);
    let cipher = C::new_from_slice(key).map_err(|e| CryptoError::Decryption(e.to_string()))?;

    cipher
        .decrypt(aes_gcm::aead::Nonce::<C>::from_slice(iv), ciphertext)
        .map_err(|_| CryptoError::Decryption("authentication tag mismatch".to_string()))
}
