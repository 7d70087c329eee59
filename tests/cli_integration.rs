//! CLI integration tests
//!
//! Tests the command-line interface end-to-end.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Get path to the dmscrypt binary
fn dmscrypt_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dmscrypt"))
}

/// Run dmscrypt with passphrase from stdin
fn run_with_passphrase(args: &[&str], passphrase: &str) -> Output {
    let mut child = Command::new(dmscrypt_bin())
        .arg("--passphrase-stdin")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn dmscrypt");

    {
        let stdin = child.stdin.as_mut().expect("failed to open stdin");
        // Ignore BrokenPipe errors - the command may exit before reading stdin
        // if it encounters an error (e.g., file not found)
        let _ = stdin.write_all(passphrase.as_bytes());
    }

    child.wait_with_output().expect("failed to wait for dmscrypt")
}

fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "{} failed: {}",
        what,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Get path to testdata directory
fn testdata_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("testdata");
    path.push(filename);
    path
}

/// Decrypt a legacy file container produced by the browser front end.
#[test]
fn test_decrypt_known_legacy_file_container() {
    let temp_dir = TempDir::new().unwrap();

    let result = run_with_passphrase(
        &[
            "decrypt",
            "-i",
            testdata_path("hello.txt.dms").to_str().unwrap(),
            "-o",
            temp_dir.path().to_str().unwrap(),
        ],
        "test",
    );
    assert_success(&result, "decrypt");

    let decrypted = fs::read_to_string(temp_dir.path().join("hello.txt")).unwrap();
    let expected = fs::read_to_string(testdata_path("hello.txt")).unwrap();
    assert_eq!(decrypted, expected);

    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("text/plain"), "unexpected stderr: {}", stderr);
}

/// Decrypt a legacy text container produced by the browser front end.
#[test]
fn test_decrypt_known_legacy_text_container() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("hello-decrypted.txt");

    let result = run_with_passphrase(
        &[
            "decrypt",
            "-i",
            testdata_path("hello-text.dms").to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ],
        "test\n",
    );
    assert_success(&result, "decrypt");

    let decrypted = fs::read_to_string(&output).unwrap();
    let expected = fs::read_to_string(testdata_path("hello.txt")).unwrap();
    assert_eq!(decrypted, expected);
}

#[test]
fn test_text_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext_path = testdata_path("hello.txt");
    let encrypted_path = temp_dir.path().join("hello.dms");
    let decrypted_path = temp_dir.path().join("hello-decrypted.txt");

    let result = run_with_passphrase(
        &[
            "encrypt",
            "-i",
            plaintext_path.to_str().unwrap(),
            "-o",
            encrypted_path.to_str().unwrap(),
        ],
        "test",
    );
    assert_success(&result, "encrypt");
    assert!(fs::read_to_string(&encrypted_path).unwrap().starts_with("dms1:"));

    let result = run_with_passphrase(
        &[
            "decrypt",
            "-i",
            encrypted_path.to_str().unwrap(),
            "-o",
            decrypted_path.to_str().unwrap(),
        ],
        "test",
    );
    assert_success(&result, "decrypt");

    let original = fs::read_to_string(&plaintext_path).unwrap();
    let decrypted = fs::read_to_string(&decrypted_path).unwrap();
    assert_eq!(original, decrypted);
}

#[test]
fn test_legacy_flag_emits_plain_base64() {
    let temp_dir = TempDir::new().unwrap();
    let encrypted_path = temp_dir.path().join("hello.dms");

    let result = run_with_passphrase(
        &[
            "encrypt",
            "--legacy",
            "-i",
            testdata_path("hello.txt").to_str().unwrap(),
            "-o",
            encrypted_path.to_str().unwrap(),
        ],
        "test",
    );
    assert_success(&result, "encrypt");

    let armored = fs::read_to_string(&encrypted_path).unwrap();
    assert!(!armored.contains(':'));
    assert!(
        armored
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
    );
}

#[test]
fn test_file_roundtrip_restores_name() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext = temp_dir.path().join("report.pdf");
    let encrypted = temp_dir.path().join("report.dms");
    let out_dir = temp_dir.path().join("restored");
    fs::create_dir(&out_dir).unwrap();

    let content: Vec<u8> = (0..=255).cycle().take(5000).collect();
    fs::write(&plaintext, &content).unwrap();

    let result = run_with_passphrase(
        &[
            "encrypt-file",
            "-i",
            plaintext.to_str().unwrap(),
            "-o",
            encrypted.to_str().unwrap(),
        ],
        "test",
    );
    assert_success(&result, "encrypt-file");

    let result = run_with_passphrase(
        &[
            "--stats",
            "decrypt",
            "-i",
            encrypted.to_str().unwrap(),
            "-o",
            out_dir.to_str().unwrap(),
        ],
        "test",
    );
    assert_success(&result, "decrypt");

    assert_eq!(fs::read(out_dir.join("report.pdf")).unwrap(), content);
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("application/pdf"), "unexpected stderr: {}", stderr);
    assert!(stderr.contains("4.88 KB out"), "unexpected stderr: {}", stderr);
}

#[test]
fn test_passphrase_from_environment() {
    let temp_dir = TempDir::new().unwrap();
    let encrypted = temp_dir.path().join("hello.dms");
    let decrypted = temp_dir.path().join("hello.txt");

    let status = Command::new(dmscrypt_bin())
        .args(["--passphrase-env", "encrypt", "-i"])
        .arg(testdata_path("hello.txt"))
        .arg("-o")
        .arg(&encrypted)
        .env("DMSCRYPT_PASSPHRASE", "from-env")
        .stdin(Stdio::null())
        .status()
        .unwrap();
    assert!(status.success());

    let result = run_with_passphrase(
        &[
            "decrypt",
            "-i",
            encrypted.to_str().unwrap(),
            "-o",
            decrypted.to_str().unwrap(),
        ],
        "from-env",
    );
    assert_success(&result, "decrypt");
    assert_eq!(
        fs::read_to_string(&decrypted).unwrap(),
        fs::read_to_string(testdata_path("hello.txt")).unwrap()
    );
}

#[test]
fn test_decrypt_with_wrong_passphrase_fails() {
    let temp_dir = TempDir::new().unwrap();
    let decrypted = temp_dir.path().join("decrypted");

    let result = run_with_passphrase(
        &[
            "decrypt",
            "-i",
            testdata_path("hello.txt.dms").to_str().unwrap(),
            "-o",
            decrypted.to_str().unwrap(),
        ],
        "wrong_password",
    );

    assert!(!result.status.success());
    assert!(!decrypted.exists());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(
        stderr.contains("decrypt") || stderr.contains("passphrase"),
        "Expected error message about decryption/passphrase, got: {}",
        stderr
    );
}

#[test]
fn test_decrypt_garbage_fails() {
    let temp_dir = TempDir::new().unwrap();
    let garbage = temp_dir.path().join("garbage.dms");
    let output = temp_dir.path().join("output.txt");
    fs::write(&garbage, "definitely *not* a container").unwrap();

    let result = run_with_passphrase(
        &[
            "decrypt",
            "-i",
            garbage.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ],
        "test",
    );

    assert!(!result.status.success());
    assert!(!output.exists());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("base64"), "unexpected stderr: {}", stderr);
}

#[test]
fn test_decrypt_nonexistent_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let nonexistent = temp_dir.path().join("nonexistent.dms");
    let output = temp_dir.path().join("output.txt");

    let result = run_with_passphrase(
        &[
            "decrypt",
            "-i",
            nonexistent.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ],
        "test",
    );

    assert!(!result.status.success());
    assert!(!output.exists());
}

#[test]
fn test_empty_text_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext = temp_dir.path().join("empty.txt");
    let encrypted = temp_dir.path().join("empty.dms");
    let decrypted = temp_dir.path().join("empty-decrypted.txt");

    fs::write(&plaintext, b"").unwrap();

    let result = run_with_passphrase(
        &[
            "encrypt",
            "-i",
            plaintext.to_str().unwrap(),
            "-o",
            encrypted.to_str().unwrap(),
        ],
        "test",
    );
    assert_success(&result, "encrypt");

    let result = run_with_passphrase(
        &[
            "decrypt",
            "-i",
            encrypted.to_str().unwrap(),
            "-o",
            decrypted.to_str().unwrap(),
        ],
        "test",
    );
    assert_success(&result, "decrypt");
    assert_eq!(fs::read(&decrypted).unwrap(), b"");
}

#[test]
fn test_large_file_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext = temp_dir.path().join("large.bin");
    let encrypted = temp_dir.path().join("large.dms");
    let decrypted = temp_dir.path().join("large-decrypted.bin");

    let large_content = vec![0x42u8; 1024 * 1024];
    fs::write(&plaintext, &large_content).unwrap();

    let result = run_with_passphrase(
        &[
            "encrypt-file",
            "--legacy",
            "-i",
            plaintext.to_str().unwrap(),
            "-o",
            encrypted.to_str().unwrap(),
        ],
        "test",
    );
    assert_success(&result, "encrypt-file");

    let result = run_with_passphrase(
        &[
            "decrypt",
            "-i",
            encrypted.to_str().unwrap(),
            "-o",
            decrypted.to_str().unwrap(),
        ],
        "test",
    );
    assert_success(&result, "decrypt");
    assert_eq!(fs::read(&decrypted).unwrap(), large_content);
}
