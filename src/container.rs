//! Binary container layouts
//!
//! Legacy (untagged), as produced by the original browser front end:
//!
//! - salt: 16 bytes
//! - iv: 16 bytes
//! - file mode only: metadata length (4 bytes, big-endian u32) + metadata JSON
//! - ciphertext: remainder (AES-256-CBC, PKCS#7 padded)
//!
//! Tagged: a single format tag byte (`0x00` text, `0x01` file) followed by
//! the legacy layout. The tag makes text and file containers
//! distinguishable without guessing.

use crate::cbccrypt::BLOCK_LEN;
use crate::error::{DmscryptError, ErrorCategory, ErrorKind, Result};
use crate::kdf::{self, IV_LEN, SALT_LEN};
use crate::metadata::{self, FileMetadata};

/// Length of the salt + IV header in bytes
pub const HEADER_LEN: usize = SALT_LEN + IV_LEN;

/// Format tag for text containers
pub const TAG_TEXT: u8 = 0x00;

/// Format tag for file containers
pub const TAG_FILE: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Text,
    File,
}

impl Layout {
    pub fn tag(self) -> u8 {
        match self {
            Layout::Text => TAG_TEXT,
            Layout::File => TAG_FILE,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            TAG_TEXT => Ok(Layout::Text),
            TAG_FILE => Ok(Layout::File),
            other => Err(DmscryptError::with_kind(
                ErrorCategory::User,
                ErrorKind::UnknownFormat,
                format!("unknown container format tag 0x{:02x}", other),
            )),
        }
    }
}

/// Per-container random values. Neither is secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub salt: [u8; SALT_LEN],
    pub iv: [u8; IV_LEN],
}

impl Header {
    /// Fresh salt and IV, drawn independently.
    pub fn generate() -> Self {
        Self {
            salt: kdf::generate_salt(),
            iv: kdf::generate_iv(),
        }
    }

    /// Split the salt + IV header off an untagged container, returning the body.
    pub fn parse_legacy(bytes: &[u8]) -> Result<(Self, &[u8])> {
        let Some((salt, rest)) = bytes.split_first_chunk::<SALT_LEN>() else {
            return Err(truncated(bytes.len(), "salt"));
        };
        let Some((iv, body)) = rest.split_first_chunk::<IV_LEN>() else {
            return Err(truncated(bytes.len(), "iv"));
        };
        Ok((
            Self {
                salt: *salt,
                iv: *iv,
            },
            body,
        ))
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.iv);
    }
}

/// A parsed container: header, optional file metadata and ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub header: Header,
    pub metadata: Option<FileMetadata>,
    pub ciphertext: Vec<u8>,
}

impl Container {
    pub fn layout(&self) -> Layout {
        if self.metadata.is_some() {
            Layout::File
        } else {
            Layout::Text
        }
    }

    /// Untagged bytes: `salt || iv || [len || metadata] || ciphertext`.
    pub fn to_legacy_bytes(&self) -> Result<Vec<u8>> {
        let block = self.metadata.as_ref().map(FileMetadata::to_block).transpose()?;
        let block_len = block.as_ref().map_or(0, Vec::len);

        let mut out = Vec::with_capacity(HEADER_LEN + block_len + self.ciphertext.len());
        self.header.write_to(&mut out);
        if let Some(block) = block {
            out.extend_from_slice(&block);
        }
        out.extend_from_slice(&self.ciphertext);
        Ok(out)
    }

    /// Tagged bytes: `tag || legacy bytes`.
    pub fn to_tagged_bytes(&self) -> Result<Vec<u8>> {
        let legacy = self.to_legacy_bytes()?;
        let mut out = Vec::with_capacity(1 + legacy.len());
        out.push(self.layout().tag());
        out.extend_from_slice(&legacy);
        Ok(out)
    }

    /// Parse a tagged container, dispatching directly on its format tag.
    pub fn parse_tagged(bytes: &[u8]) -> Result<Self> {
        let Some((&tag, rest)) = bytes.split_first() else {
            return Err(truncated(0, "format tag"));
        };
        let layout = Layout::from_tag(tag)?;
        if rest.len() < HEADER_LEN {
            return Err(truncated(bytes.len(), "header"));
        }
        let (header, body) = Header::parse_legacy(rest)?;

        match layout {
            Layout::Text => Ok(Self::text(header, body)),
            Layout::File => Self::file(header, body),
        }
    }

    /// Interpret an untagged body as text layout: everything is ciphertext.
    pub fn text(header: Header, body: &[u8]) -> Self {
        Self {
            header,
            metadata: None,
            ciphertext: body.to_vec(),
        }
    }

    /// Interpret an untagged body as file layout.
    ///
    /// Fails with [`ErrorKind::MetadataParse`] unless the length prefix fits
    /// the buffer, the remaining ciphertext is a non-empty whole number of
    /// blocks, and the metadata parses.
    pub fn file(header: Header, body: &[u8]) -> Result<Self> {
        let json = metadata::split_block(body)?;
        let ciphertext = &body[metadata::LEN_PREFIX_LEN + json.len()..];
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
            return Err(DmscryptError::with_kind(
                ErrorCategory::User,
                ErrorKind::MetadataParse,
                format!(
                    "implausible file layout: {} ciphertext bytes after metadata",
                    ciphertext.len()
                ),
            ));
        }
        let metadata = FileMetadata::from_json(json)?;

        Ok(Self {
            header,
            metadata: Some(metadata),
            ciphertext: ciphertext.to_vec(),
        })
    }
}

fn truncated(len: usize, reading: &str) -> DmscryptError {
    DmscryptError::with_kind(
        ErrorCategory::User,
        ErrorKind::TruncatedContainer,
        format!(
            "container of {} bytes likely truncated while reading {}",
            len, reading
        ),
    )
}
