//! dmscrypt - passphrase-based AES-256-CBC containers for text and files
//!
//! A container is `salt || iv || [metadata] || ciphertext`, armored as
//! base64. The key is derived per container with PBKDF2-HMAC-SHA256.
//! See [`codec`] for the entry points.

#![forbid(unsafe_code)]

pub mod cbccrypt;
pub mod codec;
pub mod container;
pub mod error;
pub mod file_ops;
pub mod kdf;
pub mod metadata;
pub mod passphrase;
pub mod stats;
pub mod varmor;

pub use codec::{Decoded, Format, decode, encode_file, encode_text};
pub use error::{DmscryptError, ErrorCategory, ErrorKind, Result};
pub use metadata::FileMetadata;
