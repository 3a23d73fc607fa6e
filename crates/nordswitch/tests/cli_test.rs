//! Integration tests for the `nordswitch` CLI binary.
//!
//! These cover argument parsing, catalog browsing, config display, a
//! single IP lookup against a mock service and a disconnect against a stub
//! client script. None of them needs the real NordVPN client.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `nordswitch` binary with env isolation.
///
/// Clears the `NORDSWITCH_*` variables the CLI reads and points config
/// directories at a nonexistent path so tests never touch the user's
/// real configuration.
fn nordswitch_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("nordswitch");
    cmd.env("HOME", "/tmp/nordswitch-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/nordswitch-cli-test-nonexistent")
        .env_remove("NORDSWITCH_PROFILE")
        .env_remove("NORDSWITCH_TARGET")
        .env_remove("NORDSWITCH_ORACLE_URL")
        .env_remove("NORDSWITCH_INSTALL_DIR")
        .env_remove("NORDSWITCH_OUTPUT")
        .env_remove("NORDSWITCH_TIMEOUT")
        .env_remove("NORDSWITCH_TOKEN")
        .env_remove("NORDSWITCH_USERNAME")
        .env_remove("NORDSWITCH_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
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
    let output = nordswitch_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    nordswitch_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("NordVPN")
            .and(predicate::str::contains("rotate"))
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("disconnect")),
    );
}

#[test]
fn test_version_flag() {
    nordswitch_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nordswitch"));
}

#[test]
fn test_invalid_subcommand() {
    let output = nordswitch_cmd().arg("teleport").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_watch_rejects_zero_interval() {
    let output = nordswitch_cmd()
        .args(["watch", "--interval", "0s"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("greater than zero"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    nordswitch_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nordswitch"));
}

#[test]
fn test_completions_zsh() {
    nordswitch_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Catalog ─────────────────────────────────────────────────────────

#[test]
fn test_regions_lists_groups() {
    nordswitch_cmd()
        .args(["regions", "-o", "plain"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("europe")
                .and(predicate::str::contains("asia pacific"))
                .and(predicate::str::contains("countries")),
        );
}

#[test]
fn test_regions_group_members() {
    nordswitch_cmd()
        .args(["regions", "Europe", "-o", "plain"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("france")
                .and(predicate::str::contains("united kingdom"))
                .and(predicate::str::contains("japan").not()),
        );
}

#[test]
fn test_regions_unknown_group_is_not_found() {
    let output = nordswitch_cmd().args(["regions", "atlantis"]).output().unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("atlantis"));
}

#[test]
fn test_resolve_linux_spelling() {
    nordswitch_cmd()
        .args(["resolve", "United Kingdom", "--platform", "linux", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::diff("united_kingdom\n"));
}

#[test]
fn test_resolve_group_reports_group() {
    let output = nordswitch_cmd()
        .args(["resolve", "europe", "--platform", "linux", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let view: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(view["group"], "europe");
    assert_eq!(view["platform"], "linux");
    assert!(view["command"].as_str().unwrap().starts_with("nordvpn c "));
}

#[test]
fn test_resolve_empty_label_is_usage_error() {
    let output = nordswitch_cmd()
        .args(["resolve", "  ", "--platform", "linux"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_defaults() {
    nordswitch_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[defaults]").and(predicate::str::contains("oracle_url")),
        );
}

#[test]
fn test_config_path_points_at_toml() {
    nordswitch_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_unknown_profile_is_not_found() {
    let output = nordswitch_cmd()
        .args(["--profile", "office", "regions"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("office"));
}

// ── Disconnect ──────────────────────────────────────────────────────

/// A `nordvpn` shell stub that appends its arguments to `calls.log`.
#[cfg(target_os = "linux")]
fn stub_client() -> tempfile::TempDir {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("calls.log");
    let bin = dir.path().join("nordvpn");
    std::fs::write(&bin, format!("#!/bin/sh\necho \"$@\" >> '{}'\n", log.display())).unwrap();
    std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
    dir
}

#[cfg(target_os = "linux")]
#[test]
fn test_disconnect_runs_only_the_disconnect_command() {
    let client = stub_client();

    let output = nordswitch_cmd()
        .env("PATH", client.path())
        .arg("disconnect")
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let calls = std::fs::read_to_string(client.path().join("calls.log")).unwrap();
    // no `account` check and no login before it
    assert_eq!(calls, "d\n");
}

#[cfg(target_os = "linux")]
#[test]
fn test_disconnect_needs_no_credentials() {
    let client = stub_client();

    nordswitch_cmd()
        .env("PATH", client.path())
        .args(["disconnect", "--target", "japan", "--quiet"])
        .assert()
        .success()
        .stderr(predicate::str::contains("credentials").not());
}

// ── IP lookup ───────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_ip_against_mock_service() {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"ip":"198.51.100.4","country":"France","cc":"FR"}"#,
        ))
        .mount(&server)
        .await;

    let url = server.uri();
    let output = tokio::task::spawn_blocking(move || {
        nordswitch_cmd()
            .args(["ip", "--oracle-url", &url, "-o", "plain"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "198.51.100.4");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ip_server_error_is_connection_failure() {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let url = server.uri();
    let output = tokio::task::spawn_blocking(move || {
        nordswitch_cmd()
            .args(["ip", "--oracle-url", &url])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert_eq!(output.status.code(), Some(7), "{}", combined_output(&output));
}
