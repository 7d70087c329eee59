//! Encoding and decoding of text and file payloads
//!
//! Every encode call draws a fresh salt and IV, derives a key from the
//! passphrase and salt, encrypts, packs the container and armors it.
//! Decoding reverses this. Tagged containers dispatch on their format
//! tag. Legacy containers carry no tag, so the file layout is tried first
//! and the text layout is the fallback.
//!
//! All functions here are stateless. Key derivation dominates their cost
//! (100,000 PBKDF2 rounds); async callers should run them on a blocking
//! pool.

use crate::cbccrypt;
use crate::container::{Container, Header};
use crate::error::{DmscryptError, ErrorCategory, ErrorKind, Result};
use crate::kdf::{self, KEY_LEN};
use crate::metadata::FileMetadata;
use crate::varmor::{self, Armored};

/// Which container form to emit. Decoding accepts both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// `dms1:` armor around a container with an explicit format tag.
    #[default]
    Tagged,
    /// Untagged standard base64, readable by the original browser front end.
    Legacy,
}

/// The result of decoding a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Text(String),
    File {
        data: Vec<u8>,
        metadata: FileMetadata,
    },
}

impl Decoded {
    /// Length of the decrypted payload in bytes.
    pub fn payload_len(&self) -> usize {
        match self {
            Decoded::Text(text) => text.len(),
            Decoded::File { data, .. } => data.len(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Decoded::Text(text) => Some(text),
            Decoded::File { .. } => None,
        }
    }
}

/// Encrypt a text payload.
pub fn encode_text(passphrase: &[u8], plaintext: &str, format: Format) -> Result<String> {
    encode_text_with(passphrase, plaintext, format, &Header::generate())
}

/// Encrypt a file payload together with its metadata.
pub fn encode_file(
    passphrase: &[u8],
    data: &[u8],
    metadata: &FileMetadata,
    format: Format,
) -> Result<String> {
    encode_file_with(passphrase, data, metadata, format, &Header::generate())
}

/// Encrypt a text payload using the provided salt and IV.
///
/// This function is ONLY for testing purposes to generate deterministic output.
/// NEVER use this in production - always use `encode_text()`, which generates
/// a random salt and IV.
pub fn encode_text_with(
    passphrase: &[u8],
    plaintext: &str,
    format: Format,
    header: &Header,
) -> Result<String> {
    seal(passphrase, plaintext.as_bytes(), None, format, header)
}

/// Encrypt a file payload using the provided salt and IV.
///
/// This function is ONLY for testing purposes to generate deterministic output.
/// NEVER use this in production - always use `encode_file()`, which generates
/// a random salt and IV.
pub fn encode_file_with(
    passphrase: &[u8],
    data: &[u8],
    metadata: &FileMetadata,
    format: Format,
    header: &Header,
) -> Result<String> {
    seal(passphrase, data, Some(metadata.clone()), format, header)
}

fn seal(
    passphrase: &[u8],
    payload: &[u8],
    metadata: Option<FileMetadata>,
    format: Format,
    header: &Header,
) -> Result<String> {
    let key = kdf::derive_key(passphrase, &header.salt)?;
    let ciphertext = cbccrypt::encrypt(payload, &key, &header.iv);
    let container = Container {
        header: header.clone(),
        metadata,
        ciphertext,
    };
    tracing::debug!(
        layout = ?container.layout(),
        ?format,
        payload_len = payload.len(),
        ciphertext_len = container.ciphertext.len(),
        "sealed container"
    );

    match format {
        Format::Tagged => Ok(varmor::wrap_tagged(&container.to_tagged_bytes()?)),
        Format::Legacy => Ok(varmor::wrap_legacy(&container.to_legacy_bytes()?)),
    }
}

/// Decrypt an armored container of either format and either layout.
///
/// All or nothing: on failure no part of the payload is returned.
pub fn decode(passphrase: &[u8], armored: &str) -> Result<Decoded> {
    match varmor::unwrap(armored)? {
        Armored::Tagged(bytes) => {
            let container = Container::parse_tagged(&bytes)?;
            tracing::debug!(layout = ?container.layout(), "decoding tagged container");
            let key = kdf::derive_key(passphrase, &container.header.salt)?;
            open(container, &key)
        }
        Armored::Legacy(bytes) => decode_legacy(passphrase, &bytes),
    }
}

fn decode_legacy(passphrase: &[u8], bytes: &[u8]) -> Result<Decoded> {
    let (header, body) = Header::parse_legacy(bytes)?;
    let key = kdf::derive_key(passphrase, &header.salt)?;

    match Container::file(header.clone(), body).and_then(|container| open(container, &key)) {
        Ok(decoded) => {
            tracing::debug!("legacy container decoded with file layout");
            return Ok(decoded);
        }
        Err(e) => {
            tracing::debug!(error = %e, "file layout rejected, falling back to text layout");
        }
    }

    open(Container::text(header, body), &key)
}

fn open(container: Container, key: &[u8; KEY_LEN]) -> Result<Decoded> {
    let plaintext = cbccrypt::decrypt(&container.ciphertext, key, &container.header.iv)?;
    tracing::trace!(plaintext_len = plaintext.len(), "decrypted container");

    match container.metadata {
        Some(metadata) => Ok(Decoded::File {
            data: plaintext,
            metadata,
        }),
        None => String::from_utf8(plaintext).map(Decoded::Text).map_err(|e| {
            DmscryptError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::Decryption,
                "decrypted text is not valid UTF-8; corrupt input or bad passphrase",
                e,
            )
        }),
    }
}
