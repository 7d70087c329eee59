//! File metadata carried by file-mode containers
//!
//! Block layout: a 4-byte big-endian length followed by that many bytes of
//! compact JSON `{"name":…,"type":…,"size":…}`.

use crate::error::{DmscryptError, ErrorCategory, ErrorKind, Result};
use serde::{Deserialize, Serialize};

/// Length of the metadata length prefix in bytes
pub const LEN_PREFIX_LEN: usize = 4;

/// Name, content type and size of an encrypted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    #[serde(rename = "type", alias = "contentType")]
    pub content_type: String,
    pub size: u64,
}

impl FileMetadata {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            size,
        }
    }

    /// Serialize to a length-prefixed block.
    pub fn to_block(&self) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(self).map_err(|e| {
            DmscryptError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::InternalInvariant,
                "failed to serialize file metadata",
                e,
            )
        })?;
        let len = u32::try_from(json.len()).map_err(|e| {
            DmscryptError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::InvalidArgument,
                "file metadata too large for its length prefix",
                e,
            )
        })?;

        let mut block = Vec::with_capacity(LEN_PREFIX_LEN + json.len());
        block.extend_from_slice(&len.to_be_bytes());
        block.extend_from_slice(&json);
        Ok(block)
    }

    /// Parse a length-prefixed block from the start of `buf`.
    ///
    /// Returns the metadata and the number of bytes consumed (prefix included).
    pub fn parse_block(buf: &[u8]) -> Result<(Self, usize)> {
        let json = split_block(buf)?;
        Ok((Self::from_json(json)?, LEN_PREFIX_LEN + json.len()))
    }

    /// Parse the JSON part of a block, without its length prefix.
    pub(crate) fn from_json(json: &[u8]) -> Result<Self> {
        serde_json::from_slice(json).map_err(|e| {
            DmscryptError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::MetadataParse,
                format!("file metadata is not valid JSON: {}", e),
                e,
            )
        })
    }

    /// The final path component of `name`, suitable for creating a file
    /// inside a caller-chosen directory.
    ///
    /// Returns `None` for names with no usable component (`""`, `.`, `..`,
    /// or a trailing separator).
    pub fn safe_file_name(&self) -> Option<&str> {
        let last = self.name.rsplit(['/', '\\']).next()?;
        match last {
            "" | "." | ".." => None,
            name => Some(name),
        }
    }
}

/// Validate the length prefix at the start of `buf` and return the JSON
/// bytes it covers.
pub(crate) fn split_block(buf: &[u8]) -> Result<&[u8]> {
    let Some((prefix, rest)) = buf.split_first_chunk::<LEN_PREFIX_LEN>() else {
        return Err(DmscryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::MetadataParse,
            "input likely truncated while reading metadata length",
        ));
    };
    let len = u32::from_be_bytes(*prefix) as usize;
    if len > rest.len() {
        return Err(DmscryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::MetadataParse,
            format!(
                "metadata length {} exceeds the {} bytes available",
                len,
                rest.len()
            ),
        ));
    }
    Ok(&rest[..len])
}
