//! Passphrase sources
//!
//! The library never embeds a secret. Every encode/decode call receives its
//! passphrase from one of these readers.

use crate::error::{DmscryptError, ErrorCategory, ErrorKind, Result};
use std::env;
use std::io::{self, IsTerminal, Read, Write};
use zeroize::Zeroizing;

/// Environment variable consulted by [`EnvPassphraseReader::default`]
pub const DEFAULT_PASSPHRASE_ENV: &str = "DMSCRYPT_PASSPHRASE";

/// Trait for reading passphrases from various sources
pub trait PassphraseReader {
    /// Read a passphrase as arbitrary bytes (not necessarily UTF-8)
    ///
    /// Returns the passphrase wrapped in `Zeroizing` so it is wiped from
    /// memory when dropped.
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>>;
}

/// Returns a fixed passphrase (for testing)
pub struct ConstantPassphraseReader {
    passphrase: Zeroizing<Vec<u8>>,
}

impl ConstantPassphraseReader {
    pub fn new(passphrase: Vec<u8>) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase),
        }
    }
}

impl PassphraseReader for ConstantPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new((*self.passphrase).clone()))
    }
}

/// Reads passphrase from any io::Read source
///
/// A single trailing `\n` or `\r\n` is dropped, so `echo secret | dmscrypt
/// --passphrase-stdin ...` uses `secret`.
pub struct ReaderPassphraseReader {
    reader: Box<dyn Read>,
}

impl ReaderPassphraseReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl PassphraseReader for ReaderPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut data = Zeroizing::new(Vec::new());
        self.reader.read_to_end(&mut data).map_err(|e| {
            DmscryptError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("error reading passphrase: {}", e),
                e,
            )
        })?;
        if data.ends_with(b"\n") {
            data.pop();
            if data.ends_with(b"\r") {
                data.pop();
            }
        }
        Ok(data)
    }
}

/// Reads passphrase from an environment variable
pub struct EnvPassphraseReader {
    var: String,
}

impl EnvPassphraseReader {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvPassphraseReader {
    fn default() -> Self {
        Self::new(DEFAULT_PASSPHRASE_ENV)
    }
}

impl PassphraseReader for EnvPassphraseReader {
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        match env::var_os(&self.var) {
            Some(value) if !value.is_empty() => {
                Ok(Zeroizing::new(value.into_encoded_bytes()))
            }
            _ => Err(DmscryptError::with_kind(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                format!("environment variable {} is unset or empty", self.var),
            )),
        }
    }
}

/// Reads passphrase from terminal with no echo
pub struct TerminalPassphraseReader;

impl TerminalPassphraseReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalPassphraseReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PassphraseReader for TerminalPassphraseReader {
    /// Read passphrase from terminal.
    ///
    /// Note: Terminal input is limited to UTF-8 due to rpassword library constraints.
    /// For non-UTF-8 passphrases, use --passphrase-stdin instead.
    fn read_passphrase(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if !io::stdin().is_terminal() {
            return Err(DmscryptError::with_kind(
                ErrorCategory::User,
                ErrorKind::PassphraseUnavailable,
                "cannot read passphrase from terminal - stdin is not a terminal",
            ));
        }

        let prompt_error = |e: io::Error| {
            DmscryptError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to write prompt: {}", e),
                e,
            )
        };
        let mut stderr = io::stderr();
        stderr
            .write_all(b"Passphrase (dmscrypt): ")
            .map_err(prompt_error)?;
        stderr.flush().map_err(prompt_error)?;

        // rpassword returns a plain String; move it into a Zeroizing buffer.
        let passphrase = rpassword::read_password().map_err(|e| {
            DmscryptError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::PassphraseUnavailable,
                format!("failure reading passphrase: {}", e),
                e,
            )
        })?;

        Ok(Zeroizing::new(passphrase.into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_reader() {
        let mut reader = ConstantPassphraseReader::new(b"test123".to_vec());
        assert_eq!(&*reader.read_passphrase().unwrap(), b"test123");
        assert_eq!(&*reader.read_passphrase().unwrap(), b"test123");
    }

    /// Tests the terminal reader. This is ignored by default and must be run
    /// explicitly and with human input:
    ///
    /// cargo test test_terminal_reader_interactive -- --ignored --nocapture
    #[test]
    #[ignore]
    fn test_terminal_reader_interactive() {
        let mut reader = TerminalPassphraseReader::new();
        println!("\nPlease enter a test passphrase:");
        let passphrase = reader.read_passphrase().unwrap();
        println!("You entered: {}", String::from_utf8_lossy(&passphrase));
        assert!(!passphrase.is_empty(), "Expected non-empty passphrase");
    }

    #[test]
    fn test_reader_passphrase_reader() {
        let data = b"mypassword";
        let mut reader = ReaderPassphraseReader::new(Box::new(&data[..]));
        assert_eq!(&*reader.read_passphrase().unwrap(), b"mypassword");
    }

    #[test]
    fn test_reader_strips_one_trailing_newline() {
        let mut reader = ReaderPassphraseReader::new(Box::new(&b"secret\n"[..]));
        assert_eq!(&*reader.read_passphrase().unwrap(), b"secret");

        let mut reader = ReaderPassphraseReader::new(Box::new(&b"secret\r\n"[..]));
        assert_eq!(&*reader.read_passphrase().unwrap(), b"secret");

        let mut reader = ReaderPassphraseReader::new(Box::new(&b"secret\n\n"[..]));
        assert_eq!(&*reader.read_passphrase().unwrap(), b"secret\n");
    }

    #[test]
    fn test_reader_passphrase_reader_empty() {
        let data = b"";
        let mut reader = ReaderPassphraseReader::new(Box::new(&data[..]));
        assert_eq!(&*reader.read_passphrase().unwrap(), b"");
    }

    /// ReaderPassphraseReader accepts arbitrary byte sequences, not just
    /// valid UTF-8.
    #[test]
    fn test_reader_passphrase_reader_non_utf8() {
        let data: &[u8] = &[0xff, 0xfe, 0x00, 0x01];
        let mut reader = ReaderPassphraseReader::new(Box::new(data));
        assert_eq!(&*reader.read_passphrase().unwrap(), data);
    }

    #[test]
    fn test_env_reader_missing_variable() {
        let mut reader = EnvPassphraseReader::new("DMSCRYPT_TEST_SURELY_UNSET_VARIABLE");
        let err = reader.read_passphrase().expect_err("expected unavailable passphrase");
        assert_eq!(err.kind, Some(ErrorKind::PassphraseUnavailable));
    }
}
