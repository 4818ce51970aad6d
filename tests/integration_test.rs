mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use common::*;
use lopdf::Document;

fn cargo_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_quickink-pdf"))
}

fn output_dir() -> &'static Path {
    Path::new("tests/output")
}

fn setup() {
    fs::create_dir_all(output_dir()).expect("Failed to create output directory");
}

fn cleanup_file(name: &str) {
    let path = output_dir().join(name);
    if path.exists() {
        fs::remove_file(&path).ok();
    }
}

/// Writes a fixture into the output directory and returns its path.
fn write_fixture(name: &str, bytes: &[u8]) -> PathBuf {
    let path = output_dir().join(name);
    fs::write(&path, bytes).expect("Failed to write fixture");
    path
}

fn signature_fixture(name: &str) -> String {
    write_fixture(name, &signature_png(240, 80))
        .to_string_lossy()
        .into_owned()
}

#[test]
fn test_certificate_without_source() {
    setup();
    let output_file = "test-certificate.pdf";
    cleanup_file(output_file);
    let signature = signature_fixture("sig-certificate.png");

    let output = cargo_bin()
        .args([
            "-n", "Jane Doe",
            "-e", "jane@x.com",
            "-s", &signature,
            "-t", "Consulting Agreement",
            "--signed-at", "2024-01-01T12:00:00Z",
            "-o", &format!("tests/output/{}", output_file),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("✓ Generated"), "stdout: {}", stdout);
    assert!(stdout.contains("signing certificate"), "stdout: {}", stdout);

    let path = output_dir().join(output_file);
    let doc = Document::load(&path).expect("Output is not a PDF");
    assert_eq!(doc.get_pages().len(), 1);
    assert!(all_texts(&doc).iter().any(|t| t == "SIGNING CERTIFICATE"));
}

#[test]
fn test_sign_local_source_document() {
    setup();
    let output_file = "test-signed-source.pdf";
    cleanup_file(output_file);
    let signature = signature_fixture("sig-source.png");
    let source = write_fixture("source-letter.pdf", &source_pdf(612, 792));

    let output = cargo_bin()
        .args([
            "-n", "Jane Doe",
            "-e", "jane@x.com",
            "-s", &signature,
            "-t", "Lease",
            "--ip", "198.51.100.4",
            "--source", source.to_str().unwrap(),
            "--product", "Acme Sign",
            "-o", &format!("tests/output/{}", output_file),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);

    let doc = Document::load(output_dir().join(output_file)).expect("Output is not a PDF");
    assert_eq!(doc.get_pages().len(), 1);
    let texts = all_texts(&doc);
    assert!(texts.iter().any(|t| t == ORIGINAL_TEXT));
    assert!(texts.iter().any(|t| t == "IP: 198.51.100.4"));
    assert!(texts.iter().any(|t| t == "Electronically signed via Acme Sign"));
}

#[test]
fn test_info_file_and_data_uri() {
    setup();
    let output_file = "test-info-file.pdf";
    cleanup_file(output_file);

    let info = jane_doe();
    let info_path = write_fixture(
        "info.json",
        serde_json::to_string(&info).unwrap().as_bytes(),
    );

    let output = cargo_bin()
        .args([
            "--info", info_path.to_str().unwrap(),
            "-s", &data_uri(&signature_png(120, 40)),
            "-o", &format!("tests/output/{}", output_file),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    let doc = Document::load(output_dir().join(output_file)).expect("Output is not a PDF");
    assert!(all_texts(&doc).iter().any(|t| t == "Lease Agreement"));
}

#[test]
fn test_missing_source_file_fails() {
    setup();
    let signature = signature_fixture("sig-missing.png");

    let output = cargo_bin()
        .args([
            "-n", "Jane Doe",
            "-e", "jane@x.com",
            "-s", &signature,
            "--source", "tests/output/does-not-exist.pdf",
            "-o", "tests/output/never-written.pdf",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Should fail when the source is missing");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unreachable"), "stderr: {}", stderr);
}

#[test]
fn test_missing_source_falls_back_when_asked() {
    setup();
    let output_file = "test-fallback.pdf";
    cleanup_file(output_file);
    let signature = signature_fixture("sig-fallback.png");

    let output = cargo_bin()
        .args([
            "-n", "Jane Doe",
            "-e", "jane@x.com",
            "-s", &signature,
            "--source", "tests/output/does-not-exist.pdf",
            "--fallback-certificate",
            "-o", &format!("tests/output/{}", output_file),
        ])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    let doc = Document::load(output_dir().join(output_file)).expect("Output is not a PDF");
    assert!(all_texts(&doc).iter().any(|t| t == "SIGNING CERTIFICATE"));
}

#[test]
fn test_missing_signer_email() {
    setup();
    let signature = signature_fixture("sig-no-email.png");

    let output = cargo_bin()
        .args(["-n", "Jane Doe", "-s", &signature])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Should fail without an email");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("email"), "stderr: {}", stderr);
}

#[test]
fn test_invalid_signed_at() {
    setup();
    let signature = signature_fixture("sig-bad-date.png");

    let output = cargo_bin()
        .args([
            "-n", "Jane Doe",
            "-e", "jane@x.com",
            "-s", &signature,
            "--signed-at", "not-a-date",
        ])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Should fail with invalid timestamp");
}
