//! Integration tests for the `swyd` CLI binary.
//!
//! These tests validate argument parsing, help output, shell completions,
//! and error handling without touching a live switch.
#![allow(clippy::unwrap_used)]

use std::io::Write;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `swyd` binary with env isolation.
///
/// Clears the `SWYD_*` and `SWITCHYARD_*` env vars and points config
/// directories at a nonexistent path so tests never read a real config.
fn swyd_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("swyd");
    cmd.env("HOME", "/tmp/swyd-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/swyd-cli-test-nonexistent")
        .env("XDG_DATA_HOME", "/tmp/swyd-cli-test-nonexistent")
        .env_remove("SWYD_CONFIG")
        .env_remove("SWYD_PROFILES")
        .env_remove("SWYD_ACCOUNT")
        .env_remove("SWYD_OUTPUT")
        .env_remove("SWITCHYARD_DEFAULT_ACCOUNT")
        .env_remove("SWITCHYARD_PROFILES_PATH");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn profiles_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"{{
            "device_profiles": [
                {{"id": 1, "model_name": "TSN-G5008", "vendor": "Moxa", "firmware_version": "v2.1", "built_in": true}}
            ],
            "default_device_profiles": [
                {{"id": 9000, "model_name": "generic", "built_in": true}}
            ]
        }}"#
    )
    .unwrap();
    file
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = swyd_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    swyd_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("switch fleets")
            .and(predicate::str::contains("probe"))
            .and(predicate::str::contains("scan"))
            .and(predicate::str::contains("vlan")),
    );
}

#[test]
fn test_version_flag() {
    swyd_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("swyd"));
}

#[test]
fn test_invalid_address_is_usage_error() {
    swyd_cmd()
        .args(["probe", "not-an-address"])
        .assert()
        .code(2);
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    swyd_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_flag() {
    swyd_cmd()
        .args(["config", "path", "--config", "/tmp/swyd-elsewhere.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/tmp/swyd-elsewhere.toml"));
}

#[test]
fn test_config_show_masks_passwords() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write!(
        file,
        "[accounts.lab]\nusername = \"admin\"\npassword = \"hunter2\"\n"
    )
    .unwrap();

    swyd_cmd()
        .args(["config", "show", "-o", "json", "--config"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("admin").and(predicate::str::contains("hunter2").not()));
}

// ── Profiles ────────────────────────────────────────────────────────

#[test]
fn test_profiles_list_json() {
    let file = profiles_file();
    swyd_cmd()
        .args(["profiles", "list", "-o", "json", "--profiles"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("TSN-G5008")
                .and(predicate::str::contains("generic"))
                .and(predicate::str::contains("\"default\": true")),
        );
}

#[test]
fn test_profiles_list_plain_prints_ids() {
    let file = profiles_file();
    swyd_cmd()
        .args(["profiles", "list", "-o", "plain", "--profiles"])
        .arg(file.path())
        .assert()
        .success()
        .stdout("1\n9000\n");
}

#[test]
fn test_missing_profile_store_is_not_found() {
    let output = swyd_cmd()
        .args(["profiles", "list", "--profiles", "/tmp/swyd-no-such-profiles.json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    let text = combined_output(&output);
    assert!(text.contains("Profile store not found"), "{text}");
}

// ── VLAN ────────────────────────────────────────────────────────────

#[test]
fn test_vlan_diff_requires_desired_file() {
    swyd_cmd()
        .args(["vlan", "diff", "--device", "192.168.127.254"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--desired"));
}

#[test]
fn test_vlan_diff_with_missing_desired_file_fails() {
    swyd_cmd()
        .args([
            "vlan",
            "diff",
            "--device",
            "192.168.127.254",
            "--desired",
            "/tmp/swyd-no-such-vlans.json",
        ])
        .assert()
        .code(1);
}
