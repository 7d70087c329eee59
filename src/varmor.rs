//! Text armoring for containers
//!
//! Two forms are in use:
//!
//! - Legacy: plain standard base64 (with padding) of an untagged container.
//!   This is what the original browser front end emitted. On input, ASCII
//!   whitespace anywhere is skipped and `=` padding is optional, so
//!   containers wrapped by mail clients or pagers still decode.
//! - Tagged: `dms1:` followed by base64url without padding of a tagged
//!   container. Free of whitespace, safe in URLs and unescaped in a POSIX
//!   shell.
//!
//! `:` never occurs in base64, so the prefix check cannot misread a
//! legacy container.

use crate::error::{DmscryptError, ErrorCategory, ErrorKind, Result};
use base64::{
    Engine, alphabet,
    engine::{
        DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig,
        general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    },
};

/// Magic prefix for all tagged versions
const MAGIC_PREFIX: &str = "dms";

/// Version 1 magic marker
const V1_MAGIC: &str = "dms1:";

/// Standard alphabet, padding accepted but not required
const LEGACY_DECODER: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decoded armor, still in binary container form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Armored {
    /// Untagged container bytes.
    Legacy(Vec<u8>),
    /// Tagged container bytes (format tag first).
    Tagged(Vec<u8>),
}

/// Armor untagged container bytes as standard base64.
pub fn wrap_legacy(body: &[u8]) -> String {
    STANDARD.encode(body)
}

/// Armor tagged container bytes.
///
/// Format: dms1:{base64url-no-padding}
pub fn wrap_tagged(body: &[u8]) -> String {
    format!("{}{}", V1_MAGIC, URL_SAFE_NO_PAD.encode(body))
}

/// Unwrap armored text, telling the caller which container form it holds.
///
/// Surrounding whitespace (a trailing newline from a file or a paste) is
/// ignored. Legacy armor may also be line-wrapped.
pub fn unwrap(armored: &str) -> Result<Armored> {
    let armored = armored.trim();

    if let Some(encoded) = armored.strip_prefix(V1_MAGIC) {
        let body = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| decode_error(e, "dms1"))?;
        Ok(Armored::Tagged(body))
    } else if claims_future_version(armored) {
        Err(DmscryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::ArmoringFromFuture,
            "input claims to be dmscrypt, but not a version we support",
        ))
    } else {
        let compact: String = armored
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let body = LEGACY_DECODER
            .decode(compact)
            .map_err(|e| decode_error(e, "legacy"))?;
        Ok(Armored::Legacy(body))
    }
}

/// `dms<digits>:` with a version other than 1.
fn claims_future_version(armored: &str) -> bool {
    let Some(rest) = armored.strip_prefix(MAGIC_PREFIX) else {
        return false;
    };
    match rest.split_once(':') {
        Some((version, _)) => !version.is_empty() && version.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

fn decode_error(e: base64::DecodeError, form: &str) -> DmscryptError {
    DmscryptError::with_kind_and_source(
        ErrorCategory::User,
        ErrorKind::Decode,
        format!("base64 decoding of {} container failed: {}", form, e),
        e,
    )
}
