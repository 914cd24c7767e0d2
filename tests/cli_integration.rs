//! CLI integration tests
//!
//! Tests the command-line interface end-to-end.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

const PASSWORD: &str = "correct horse battery";

/// Get path to the sfl binary
fn sfl_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_sfl"))
}

/// Run sfl with the password on stdin and a cheap iteration count
fn run_sfl_with_passphrase(
    args: &[&str],
    passphrase: &str,
) -> Result<std::process::Output, std::io::Error> {
    let mut child = Command::new(sfl_bin())
        .args(["--passphrase-stdin", "--iterations", "1000"])
        .args(args)
        .env_remove("SFL_ITERATIONS")
        .env_remove("SFL_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    {
        let stdin = child.stdin.as_mut().expect("failed to open stdin");
        // The command may exit before reading stdin (e.g. file not found)
        let _ = stdin.write_all(passphrase.as_bytes());
    }

    child.wait_with_output()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn encrypt(input: &Path, output: &Path, passphrase: &str) -> std::process::Output {
    run_sfl_with_passphrase(
        &["encrypt", "-i", path_str(input), "-o", path_str(output)],
        passphrase,
    )
    .unwrap()
}

fn decrypt(input: &Path, output: &Path, passphrase: &str) -> std::process::Output {
    run_sfl_with_passphrase(
        &["decrypt", "-i", path_str(input), "-o", path_str(output)],
        passphrase,
    )
    .unwrap()
}

#[test]
fn test_encrypt_decrypt_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext_path = temp_dir.path().join("hello.txt");
    let encrypted_path = temp_dir.path().join("hello-encrypted.txt.sfl");
    let decrypted_path = temp_dir.path().join("hello-decrypted.txt");
    fs::write(&plaintext_path, "hello world\n").unwrap();

    let result = encrypt(&plaintext_path, &encrypted_path, PASSWORD);
    assert!(
        result.status.success(),
        "encrypt failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    let result = decrypt(&encrypted_path, &decrypted_path, PASSWORD);
    assert!(
        result.status.success(),
        "decrypt failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    let decrypted = fs::read_to_string(&decrypted_path).unwrap();
    assert_eq!(decrypted, "hello world\n");
}

#[test]
fn test_default_output_paths() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext_path = temp_dir.path().join("notes.md");
    fs::write(&plaintext_path, "# notes").unwrap();

    let result =
        run_sfl_with_passphrase(&["encrypt", "-i", path_str(&plaintext_path)], PASSWORD).unwrap();
    assert!(
        result.status.success(),
        "encrypt failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    let encrypted_path = temp_dir.path().join("notes.md.sfl");
    assert!(encrypted_path.exists());
    assert_eq!(
        String::from_utf8_lossy(&result.stdout).trim(),
        encrypted_path.display().to_string()
    );

    // Decrypting writes the original name next to the package.
    let subdir = temp_dir.path().join("restore");
    fs::create_dir(&subdir).unwrap();
    let moved = subdir.join("moved.sfl");
    fs::rename(&encrypted_path, &moved).unwrap();

    let result = run_sfl_with_passphrase(&["decrypt", "-i", path_str(&moved)], PASSWORD).unwrap();
    assert!(
        result.status.success(),
        "decrypt failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    assert_eq!(fs::read_to_string(subdir.join("notes.md")).unwrap(), "# notes");
}

#[test]
fn test_default_decrypt_does_not_clobber() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext_path = temp_dir.path().join("report.txt");
    fs::write(&plaintext_path, "version one").unwrap();

    let result =
        run_sfl_with_passphrase(&["encrypt", "-i", path_str(&plaintext_path)], PASSWORD).unwrap();
    assert!(result.status.success());
    fs::write(&plaintext_path, "version two, unsaved elsewhere").unwrap();

    let encrypted_path = temp_dir.path().join("report.txt.sfl");
    let result =
        run_sfl_with_passphrase(&["decrypt", "-i", path_str(&encrypted_path)], PASSWORD).unwrap();

    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("refusing to overwrite"));
    assert_eq!(
        fs::read_to_string(&plaintext_path).unwrap(),
        "version two, unsaved elsewhere"
    );
}

#[test]
fn test_update_operation() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext1 = temp_dir.path().join("plaintext1.txt");
    let plaintext2 = temp_dir.path().join("plaintext2.txt");
    let encrypted = temp_dir.path().join("encrypted.txt.sfl");
    let decrypted = temp_dir.path().join("decrypted.txt");

    fs::write(&plaintext1, "Original content").unwrap();
    let result = encrypt(&plaintext1, &encrypted, PASSWORD);
    assert!(result.status.success());

    fs::write(&plaintext2, "Updated content").unwrap();
    let result = run_sfl_with_passphrase(
        &["update", "-i", path_str(&plaintext2), "-o", path_str(&encrypted)],
        PASSWORD,
    )
    .unwrap();
    assert!(
        result.status.success(),
        "update failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    let result = decrypt(&encrypted, &decrypted, PASSWORD);
    assert!(result.status.success());
    assert_eq!(fs::read_to_string(&decrypted).unwrap(), "Updated content");

    // The header still names the file that was first encrypted.
    let result = run_sfl_with_passphrase(&["inspect", "-i", path_str(&encrypted)], "").unwrap();
    assert!(String::from_utf8_lossy(&result.stdout).contains("plaintext1.txt"));
}

#[test]
fn test_update_with_wrong_passphrase_fails() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext1 = temp_dir.path().join("plaintext1.txt");
    let plaintext2 = temp_dir.path().join("plaintext2.txt");
    let encrypted = temp_dir.path().join("encrypted.txt.sfl");

    fs::write(&plaintext1, "Original").unwrap();
    let result = encrypt(&plaintext1, &encrypted, PASSWORD);
    assert!(result.status.success());
    let before = fs::read(&encrypted).unwrap();

    fs::write(&plaintext2, "Updated").unwrap();
    let result = run_sfl_with_passphrase(
        &["update", "-i", path_str(&plaintext2), "-o", path_str(&encrypted)],
        "a different password",
    )
    .unwrap();

    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("Error:"));
    assert_eq!(fs::read(&encrypted).unwrap(), before);
}

#[test]
fn test_decrypt_with_wrong_passphrase_fails() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext = temp_dir.path().join("secret.txt");
    let encrypted = temp_dir.path().join("secret.txt.sfl");
    let decrypted = temp_dir.path().join("out.txt");

    fs::write(&plaintext, "top secret").unwrap();
    assert!(encrypt(&plaintext, &encrypted, PASSWORD).status.success());

    let result = decrypt(&encrypted, &decrypted, "not the right password");
    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("wrong password"), "unexpected stderr: {}", stderr);
    assert!(!decrypted.exists());
}

#[test]
fn test_decrypt_nonexistent_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.sfl");
    let output = temp_dir.path().join("output.txt");

    let result = decrypt(&missing, &output, PASSWORD);

    assert!(!result.status.success());
    assert!(!output.exists());
}

#[test]
fn test_decrypt_requires_sfl_extension() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext = temp_dir.path().join("data.txt");
    let encrypted = temp_dir.path().join("data.bin");
    let output = temp_dir.path().join("out.txt");

    fs::write(&plaintext, "data").unwrap();
    assert!(encrypt(&plaintext, &encrypted, PASSWORD).status.success());

    let result = decrypt(&encrypted, &output, PASSWORD);
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains(".sfl"));
    assert!(!output.exists());
}

#[test]
fn test_short_password_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext = temp_dir.path().join("data.txt");
    let encrypted = temp_dir.path().join("data.txt.sfl");
    fs::write(&plaintext, "data").unwrap();

    let result = encrypt(&plaintext, &encrypted, "short");

    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("at least 12 characters"));
    assert!(!encrypted.exists());
}

#[test]
fn test_empty_file() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext = temp_dir.path().join("empty.txt");
    let encrypted = temp_dir.path().join("empty.txt.sfl");
    let decrypted = temp_dir.path().join("empty-decrypted.txt");
    fs::write(&plaintext, "").unwrap();

    assert!(encrypt(&plaintext, &encrypted, PASSWORD).status.success());
    assert!(decrypt(&encrypted, &decrypted, PASSWORD).status.success());

    assert_eq!(fs::read(&decrypted).unwrap(), b"");
}

#[test]
fn test_large_file() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext = temp_dir.path().join("large.bin");
    let encrypted = temp_dir.path().join("large.bin.sfl");
    let decrypted = temp_dir.path().join("large-decrypted.bin");

    let data: Vec<u8> = (0..4 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
    fs::write(&plaintext, &data).unwrap();

    let result = encrypt(&plaintext, &encrypted, PASSWORD);
    assert!(
        result.status.success(),
        "encrypt failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    let result = decrypt(&encrypted, &decrypted, PASSWORD);
    assert!(
        result.status.success(),
        "decrypt failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    assert_eq!(fs::read(&decrypted).unwrap(), data);
}

#[test]
fn test_inspect_shows_header() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext = temp_dir.path().join("report.csv");
    let encrypted = temp_dir.path().join("report.csv.sfl");
    fs::write(&plaintext, "a,b,c\n").unwrap();
    assert!(encrypt(&plaintext, &encrypted, PASSWORD).status.success());

    let result = run_sfl_with_passphrase(&["inspect", "-i", path_str(&encrypted)], "").unwrap();
    assert!(
        result.status.success(),
        "inspect failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("report.csv"));
    assert!(stdout.contains("6 bytes"));
    assert!(stdout.contains("AES-256-GCM"));
    assert!(stdout.contains("1000 iterations"));
}

#[test]
fn test_strength_command() {
    let result = run_sfl_with_passphrase(&["strength"], "abc\n").unwrap();
    assert!(result.status.success());

    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("score: 1/5 (Very Weak)"), "unexpected: {}", stdout);
    assert!(stdout.contains("- Use at least 12 characters"));
    assert!(stdout.contains("- Add uppercase letters"));
    assert!(!stdout.contains("- Add lowercase letters"));

    let result = run_sfl_with_passphrase(&["strength"], "Tr0ub4dor&3-horse-battery").unwrap();
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("score: 5/5 (Strong)"), "unexpected: {}", stdout);
    assert!(!stdout.contains("- "));
}

#[test]
fn test_generate_command() {
    let result = run_sfl_with_passphrase(&["generate", "--length", "32"], "").unwrap();
    assert!(result.status.success());

    let stdout = String::from_utf8_lossy(&result.stdout);
    let password = stdout.trim_end_matches('\n');
    assert_eq!(password.chars().count(), 32);
    assert!(password.is_ascii());

    let result = run_sfl_with_passphrase(&["generate", "--length", "0"], "").unwrap();
    assert!(!result.status.success());
}
