//! Integration tests for the `vrc9xx` CLI binary.
//!
//! These tests validate argument parsing, help output, configuration
//! handling and error exit codes, all without a reachable API.
#![allow(clippy::unwrap_used)]

use std::io::Write;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `vrc9xx` binary with env isolation.
///
/// Clears all `VRC9XX_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn vrc9xx_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("vrc9xx");
    cmd.env("HOME", "/tmp/vrc9xx-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/vrc9xx-cli-test-nonexistent")
        .env_remove("VRC9XX_CONFIG")
        .env_remove("VRC9XX_SERIAL")
        .env_remove("VRC9XX_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = vrc9xx_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    vrc9xx_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("multiMATIC")
            .and(predicate::str::contains("facilities"))
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("set")),
    );
}

#[test]
fn test_version_flag() {
    vrc9xx_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vrc9xx"));
}

#[test]
fn test_set_help_lists_writes() {
    vrc9xx_cmd().args(["set", "--help"]).assert().success().stdout(
        predicate::str::contains("zone-setpoint")
            .and(predicate::str::contains("dhw-mode"))
            .and(predicate::str::contains("room-quick-veto")),
    );
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn test_invalid_mode_is_rejected() {
    let output = vrc9xx_cmd()
        .args(["set", "zone-mode", "--zone", "Control_ZO1", "sideways"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_missing_temperature_is_rejected() {
    let output = vrc9xx_cmd()
        .args(["set", "zone-setpoint", "--zone", "Control_ZO1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honours_flag() {
    vrc9xx_cmd()
        .args(["--config", "/tmp/elsewhere/config.toml", "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/tmp/elsewhere/config.toml"));
}

#[test]
fn test_config_show_masks_password() {
    let file = write_config(
        "[api]\npolling = 120\n\n[api.user]\ndevice = \"phone-1\"\nname = \"alice\"\npassword = \"hunter2\"\n",
    );
    vrc9xx_cmd()
        .arg("--config")
        .arg(file.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("polling = 120")
                .and(predicate::str::contains("***"))
                .and(predicate::str::contains("hunter2").not()),
        );
}

#[test]
fn test_missing_user_fails_with_usage_code() {
    let output = vrc9xx_cmd().arg("facilities").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("device"), "Expected missing field in output:\n{text}");
}

#[test]
fn test_unreachable_api_fails_with_connection_code() {
    let file = write_config(
        "[api]\nbase_url = \"http://127.0.0.1:9/mobile/api/v4\"\ntimeout = 2\n\n\
         [api.user]\ndevice = \"phone-1\"\nname = \"alice\"\npassword = \"hunter2\"\n",
    );
    let output = vrc9xx_cmd()
        .arg("--config")
        .arg(file.path())
        .arg("facilities")
        .output()
        .unwrap();
    assert_ne!(output.status.code(), Some(0));
    assert!(!combined_output(&output).contains("hunter2"));
}
