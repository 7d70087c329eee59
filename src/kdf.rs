//! Passphrase-based key derivation (PBKDF2-HMAC-SHA256)
//!
//! Every container carries its own random salt, so every encrypt call
//! derives a fresh key. The key lives only for the duration of that call.

use crate::error::{DmscryptError, ErrorCategory, ErrorKind, Result};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Length of salt in bytes
pub const SALT_LEN: usize = 16;

/// Length of the CBC initialization vector in bytes
pub const IV_LEN: usize = 16;

/// Length of derived key in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// PBKDF2 iteration count
pub const PBKDF2_ROUNDS: u32 = 100_000;

/// Derive a 32-byte key from a passphrase and a 16-byte salt.
///
/// Deterministic. An empty passphrase or a salt of the wrong length is a
/// contract violation and fails with [`ErrorKind::InvalidArgument`].
pub fn derive_key(passphrase: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    derive_key_with_rounds(passphrase, salt, PBKDF2_ROUNDS)
}

pub(crate) fn derive_key_with_rounds(
    passphrase: &[u8],
    salt: &[u8],
    rounds: u32,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    if passphrase.is_empty() {
        return Err(DmscryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::InvalidArgument,
            "passphrase must not be empty",
        ));
    }
    if salt.len() != SALT_LEN {
        return Err(DmscryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::InvalidArgument,
            format!("salt must be {} bytes, got {}", SALT_LEN, salt.len()),
        ));
    }
    if rounds == 0 {
        return Err(DmscryptError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InvalidArgument,
            "pbkdf2 round count must be positive",
        ));
    }

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase, salt, rounds, &mut key[..]);
    tracing::trace!(rounds, "derived container key");

    Ok(key)
}

/// Fresh random salt from the operating system CSPRNG.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Fresh random IV from the operating system CSPRNG.
pub fn generate_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    iv
}
