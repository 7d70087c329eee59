//! File-level encrypt/decrypt operations
//!
//! Thin glue between the filesystem and [`crate::codec`]. Output files are
//! written atomically (tempfile + fsync + rename) with mode 0o600 on Unix.

use crate::codec::{self, Decoded, Format};
use crate::error::{DmscryptError, ErrorCategory, ErrorKind, Result};
use crate::metadata::FileMetadata;
use crate::passphrase::PassphraseReader;
use crate::stats::OperationStats;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Content type recorded when nothing better is known
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// What [`decrypt_file`] wrote and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptOutcome {
    pub written: PathBuf,
    /// Present when the container held a file.
    pub metadata: Option<FileMetadata>,
    pub stats: OperationStats,
}

/// Encrypt the UTF-8 text in `input_path` as a text container.
pub fn encrypt_text_file(
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
    format: Format,
) -> Result<OperationStats> {
    let plaintext = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let text = String::from_utf8(plaintext).map_err(|e| {
        DmscryptError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::InvalidArgument,
            format!(
                "{} is not valid UTF-8; encrypt it as a file instead",
                input_path.display()
            ),
            e,
        )
    })?;
    let passphrase = passphrase_reader.read_passphrase()?;

    let (armored, stats) = OperationStats::measure(text.len(), || {
        let armored = codec::encode_text(&passphrase, &text, format)
            .map_err(|e| e.with_context("encryption failed"))?;
        let len = armored.len();
        Ok::<_, DmscryptError>((armored, len))
    })?;

    write_file_secure(output_path, armored.as_bytes())?;
    tracing::info!(output = %output_path.display(), "wrote text container");
    Ok(stats)
}

/// Encrypt the bytes in `input_path` as a file container.
///
/// The container records the input's file name, its size, and
/// `content_type` (or a guess from the file extension).
pub fn encrypt_file(
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
    format: Format,
    content_type: Option<&str>,
) -> Result<OperationStats> {
    let data = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let name = input_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            DmscryptError::with_kind(
                ErrorCategory::User,
                ErrorKind::InvalidArgument,
                format!("{} has no file name", input_path.display()),
            )
        })?;
    let content_type = content_type.unwrap_or_else(|| guess_content_type(input_path));
    let metadata = FileMetadata::new(name, content_type, data.len() as u64);
    let passphrase = passphrase_reader.read_passphrase()?;

    let (armored, stats) = OperationStats::measure(data.len(), || {
        let armored = codec::encode_file(&passphrase, &data, &metadata, format)
            .map_err(|e| e.with_context("encryption failed"))?;
        let len = armored.len();
        Ok::<_, DmscryptError>((armored, len))
    })?;

    write_file_secure(output_path, armored.as_bytes())?;
    tracing::info!(
        name = %metadata.name,
        content_type = %metadata.content_type,
        output = %output_path.display(),
        "wrote file container"
    );
    Ok(stats)
}

/// Decrypt the armored container in `input_path`.
///
/// Text is written to `target`. A file payload is written to `target`, or,
/// when `target` is an existing directory, to the file name recorded in
/// the container inside that directory.
pub fn decrypt_file(
    input_path: &Path,
    target: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<DecryptOutcome> {
    let armored = read_armored(input_path)?;
    let passphrase = passphrase_reader.read_passphrase()?;

    let (decoded, stats) = OperationStats::measure(armored.len(), || {
        let decoded = codec::decode(&passphrase, &armored)
            .map_err(|e| e.with_context("failed to decrypt"))?;
        let len = decoded.payload_len();
        Ok::<_, DmscryptError>((decoded, len))
    })?;

    match decoded {
        Decoded::Text(text) => {
            if target.is_dir() {
                return Err(DmscryptError::with_kind(
                    ErrorCategory::User,
                    ErrorKind::InvalidArgument,
                    format!(
                        "{} holds text, which has no file name; give an output file instead of a directory",
                        input_path.display()
                    ),
                ));
            }
            write_file_secure(target, text.as_bytes())?;
            Ok(DecryptOutcome {
                written: target.to_path_buf(),
                metadata: None,
                stats,
            })
        }
        Decoded::File { data, metadata } => {
            let written = if target.is_dir() {
                output_path_in(target, &metadata)?
            } else {
                target.to_path_buf()
            };
            write_file_secure(&written, &data)?;
            tracing::info!(name = %metadata.name, output = %written.display(), "restored file");
            Ok(DecryptOutcome {
                written,
                metadata: Some(metadata),
                stats,
            })
        }
    }
}

/// Where a decrypted file lands inside `dir`, using only the final
/// component of its recorded name.
pub fn output_path_in(dir: &Path, metadata: &FileMetadata) -> Result<PathBuf> {
    let name = metadata.safe_file_name().ok_or_else(|| {
        DmscryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::MetadataParse,
            format!("recorded file name {:?} is not usable", metadata.name),
        )
    })?;
    Ok(dir.join(name))
}

/// Read an armored container from disk.
pub fn read_armored(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| read_error(path, e))?;
    String::from_utf8(bytes).map_err(|e| {
        DmscryptError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Decode,
            format!("{} is not valid UTF-8", path.display()),
            e,
        )
    })
}

/// Content type for common extensions, matching what browsers report.
pub fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Write a file atomically with secure permissions (0o600 on Unix).
///
/// Either the old file or the complete new file exists afterwards, never
/// a partial one.
pub fn write_file_secure(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| io_error(format!("failed to create tempfile in {}", dir.display()), e))?;

    temp_file
        .write_all(contents)
        .map_err(|e| io_error("failed to write to tempfile", e))?;
    // Flush and fsync() such that the rename, if it succeeds, always points
    // to a complete file.
    temp_file
        .flush()
        .map_err(|e| io_error("failed to flush tempfile", e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| io_error("failed to sync file prior to rename", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| io_error("failed to set tempfile permissions", e))?;
    }

    temp_file.persist(path).map_err(|e| {
        DmscryptError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", path.display()),
            e,
        )
    })?;
    Ok(())
}

fn io_error(msg: impl Into<String>, err: io::Error) -> DmscryptError {
    DmscryptError::with_kind_and_source(ErrorCategory::Internal, ErrorKind::Io, msg, err)
}

fn read_error(path: &Path, err: io::Error) -> DmscryptError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    DmscryptError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}
