//! AES-256-CBC with PKCS#7 padding
//!
//! There is no MAC. Padding validation is the only integrity signal, so a
//! wrong key is usually (not always) detected, and corruption that happens
//! to leave valid padding decrypts to garbage without error.

use crate::error::{DmscryptError, ErrorCategory, ErrorKind, Result};
use crate::kdf::{IV_LEN, KEY_LEN};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

/// AES block size in bytes
pub const BLOCK_LEN: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Encrypt plaintext under `key` and `iv`.
///
/// The output is always a non-empty multiple of [`BLOCK_LEN`]; an empty
/// plaintext produces one full block of padding.
pub fn encrypt(plaintext: &[u8], key: &[u8; KEY_LEN], iv: &[u8; IV_LEN]) -> Vec<u8> {
    Aes256CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypt ciphertext under `key` and `iv`, stripping the padding.
pub fn decrypt(ciphertext: &[u8], key: &[u8; KEY_LEN], iv: &[u8; IV_LEN]) -> Result<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(DmscryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::Decryption,
            format!(
                "ciphertext length {} is not a positive multiple of the block size",
                ciphertext.len()
            ),
        ));
    }

    Aes256CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| {
            DmscryptError::with_kind(
                ErrorCategory::User,
                ErrorKind::Decryption,
                "corrupt input, tampered-with data, or bad passphrase",
            )
        })
}
