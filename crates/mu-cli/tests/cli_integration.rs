//! CLI integration tests
//!
//! Tests the mu CLI using assert_cmd. None of these reach a device: every
//! case fails or exits before a connection would be opened.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn mu() -> Command {
    Command::cargo_bin("mu")
        .expect("Failed to locate mu binary - ensure it's built before running tests")
}

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, body).unwrap();
    path
}

const VALID: &str = r#"
[global]
backup_dir = "backups"
private_key_file = "does-not-exist/id_ed25519"
username = "mu"

[[devices]]
name = "gw1"
address = "192.0.2.1"
"#;

#[test]
fn test_cli_help() {
    mu()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup and firmware upgrade"))
        .stdout(predicate::str::contains("--check-only"))
        .stdout(predicate::str::contains("--backup-only"))
        .stdout(predicate::str::contains("--update-only"));
}

#[test]
fn test_cli_version() {
    mu()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mu"));
}

#[test]
fn test_missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    mu()
        .arg(dir.path().join("missing.toml"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "[global]\nbackup_dir = \"b\"\nprivate_key_file = \"k\"\n",
    );
    mu()
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no devices specified"));
}

#[test]
fn test_unparseable_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "[global\nbackup_dir = ");
    mu()
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("TOML parse error"));
}

#[test]
fn test_unknown_device_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), VALID);
    mu()
        .arg(&path)
        .args(["-d", "nope"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Device nope not found"));
}

#[test]
fn test_missing_private_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), VALID);
    mu()
        .arg(&path)
        .arg("--check-only")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Private key not usable"));
}

#[test]
fn test_conflicting_modes_rejected() {
    mu()
        .args(["config.toml", "--update-only", "--backup-only"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_dry_run_alias() {
    mu()
        .args(["--dry-run", "--help"])
        .assert()
        .success();
}
