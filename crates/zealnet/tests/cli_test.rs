//! Integration tests for the `zealnet` CLI binary.
//!
//! Everything runs against temp data directories and, where delivery is
//! involved, a wiremock portal.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `zealnet` binary with env isolation.
///
/// Clears all `ZEALNET_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn zealnet_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("zealnet");
    cmd.env("HOME", "/tmp/zealnet-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/zealnet-cli-test-nonexistent")
        .env("XDG_DATA_HOME", "/tmp/zealnet-cli-test-nonexistent")
        .env_remove("ZEALNET_PROFILE")
        .env_remove("ZEALNET_API_URL")
        .env_remove("ZEALNET_DATA_DIR")
        .env_remove("ZEALNET_OUTPUT")
        .env_remove("ZEALNET_INSECURE")
        .env_remove("ZEALNET_TIMEOUT")
        .env_remove("ZEALNET_DEFAULT_PROFILE")
        .env_remove("RUST_LOG");
    cmd
}

/// A command bound to a portal URL and a data directory.
fn portal_cmd(api_url: &str, data_dir: &Path) -> assert_cmd::Command {
    let mut cmd = zealnet_cmd();
    cmd.arg("--api-url").arg(api_url).arg("--data-dir").arg(data_dir);
    cmd
}

/// A command reading `config_toml` as its config file.
///
/// The returned directory must outlive the command.
fn configured_cmd(config_toml: &str) -> (tempfile::TempDir, assert_cmd::Command) {
    let config_home = tempfile::tempdir().unwrap();
    let config_dir = config_home.path().join("zealnet");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), config_toml).unwrap();

    let mut cmd = zealnet_cmd();
    cmd.env("XDG_CONFIG_HOME", config_home.path());
    (config_home, cmd)
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

const UNREACHABLE: &str = "http://127.0.0.1:9";

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = zealnet_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    zealnet_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("hotspot")
            .and(predicate::str::contains("queue"))
            .and(predicate::str::contains("socket")),
    );
}

#[test]
fn test_version_flag() {
    zealnet_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("zealnet"));
}

#[test]
fn test_completions_zsh() {
    zealnet_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_invalid_subcommand() {
    let output = zealnet_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("foobar"), "Expected error mentioning foobar:\n{text}");
}

// ── Hotspot ─────────────────────────────────────────────────────────

#[test]
fn test_hotspot_parse_json() {
    let output = zealnet_cmd()
        .args([
            "hotspot",
            "parse",
            "https://portal.example.net/?mac=AA:BB:CC:DD:EE:FF&ip=10.5.50.2&link-login=http%3A%2F%2F10.5.50.1%2Flogin",
            "-o",
            "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["mac"], "AA:BB:CC:DD:EE:FF");
    assert_eq!(parsed["link_login"], "http://10.5.50.1/login");
    assert_eq!(parsed["is_hotspot"], true);
    assert_eq!(parsed["user"], "AA:BB:CC:DD:EE:FF");
    assert_eq!(parsed["session_password"], "aabbccddeeff");
}

#[test]
fn test_hotspot_login_prints_url() {
    zealnet_cmd()
        .args([
            "hotspot",
            "login",
            "mac=AA:BB:CC:DD:EE:FF&link-login=http%3A%2F%2F10.5.50.1%2Flogin&link-orig=http%3A%2F%2Fexample.com%2F",
            "-o",
            "plain",
        ])
        .assert()
        .success()
        .stdout(
            predicate::str::starts_with("http://10.5.50.1/login?")
                .and(predicate::str::contains("username=AA%3ABB%3ACC%3ADD%3AEE%3AFF"))
                .and(predicate::str::contains("password=aabbccddeeff"))
                .and(predicate::str::contains("dst=http%3A%2F%2Fexample.com%2F")),
        );
}

#[test]
fn test_hotspot_login_without_login_url_is_usage_error() {
    let output = zealnet_cmd()
        .args(["hotspot", "login", "mac=AA:BB:CC:DD:EE:FF"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("link-login"));
}

#[test]
fn test_hotspot_login_follow_submits_request() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let server = runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        server
    });

    let link_login = format!("{}/login", server.uri());
    let query = format!("mac=AA:BB:CC:DD:EE:FF&link-login={link_login}");
    zealnet_cmd()
        .args(["hotspot", "login", &query, "--follow", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": 200"));

    runtime.block_on(server.verify());
}

#[test]
fn test_hotspot_login_follow_uses_profile_tls_settings() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let server = runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        server
    });

    let (_config_home, mut cmd) = configured_cmd(
        r#"
[profiles.default]
api_url = "https://portal.example.net"
ca_cert = "/nonexistent/zealnet-ca.pem"
"#,
    );
    let query = format!("mac=AA:BB:CC:DD:EE:FF&link-login={}/login", server.uri());
    let output = cmd
        .args(["hotspot", "login", &query, "--follow"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(7), "{}", combined_output(&output));
    runtime.block_on(server.verify());
}

// ── Queue ───────────────────────────────────────────────────────────

#[test]
fn test_queue_add_persists_across_runs() {
    let dir = tempfile::tempdir().unwrap();

    portal_cmd(UNREACHABLE, dir.path())
        .args(["queue", "add", "payment", "--data", r#"{"amount": 500}"#])
        .assert()
        .success();
    portal_cmd(UNREACHABLE, dir.path())
        .args(["queue", "add", "profile-update", "--data", r#"{"name": "Ama"}"#])
        .assert()
        .success();

    portal_cmd(UNREACHABLE, dir.path())
        .args(["queue", "len"])
        .assert()
        .success()
        .stdout("2\n");

    let output = portal_cmd(UNREACHABLE, dir.path())
        .args(["queue", "list", "-o", "json"])
        .output()
        .unwrap();
    let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listed[0]["type"], "payment");
    assert_eq!(listed[0]["payload"]["amount"], 500);
    assert_eq!(listed[1]["type"], "profile_update");
    assert_eq!(listed[1]["retryCount"], 0);
}

#[test]
fn test_queue_add_requires_payload() {
    let dir = tempfile::tempdir().unwrap();
    portal_cmd(UNREACHABLE, dir.path())
        .args(["queue", "add", "payment"])
        .assert()
        .code(2);
}

#[test]
fn test_queue_add_rejects_bad_json() {
    let dir = tempfile::tempdir().unwrap();
    portal_cmd(UNREACHABLE, dir.path())
        .args(["queue", "add", "payment", "--data", "{not json"])
        .assert()
        .code(2);
}

#[test]
fn test_queue_without_portal_url_points_at_config() {
    let dir = tempfile::tempdir().unwrap();
    zealnet_cmd()
        .arg("--data-dir")
        .arg(dir.path())
        .args(["queue", "len"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config init"));
}

#[test]
fn test_queue_process_delivers_with_stored_token() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let server = runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/payments"))
            .and(header("authorization", "Bearer tok-123"))
            .and(body_json(serde_json::json!({"amount": 500})))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        server
    });

    portal_cmd(&server.uri(), dir.path())
        .args(["auth", "set-token", "tok-123"])
        .assert()
        .success();
    portal_cmd(&server.uri(), dir.path())
        .args(["queue", "add", "payment", "--data", r#"{"amount": 500}"#])
        .assert()
        .success();

    let output = portal_cmd(&server.uri(), dir.path())
        .args(["queue", "process", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["delivered"], 1);
    assert_eq!(report["halted"], false);

    portal_cmd(&server.uri(), dir.path())
        .args(["queue", "len"])
        .assert()
        .stdout("0\n");

    runtime.block_on(server.verify());
}

#[test]
fn test_queue_clear_requires_confirmation_when_piped() {
    let dir = tempfile::tempdir().unwrap();
    portal_cmd(UNREACHABLE, dir.path())
        .args(["queue", "add", "plan-purchase", "--data", r#"{"planId": "day"}"#])
        .assert()
        .success();

    portal_cmd(UNREACHABLE, dir.path())
        .args(["queue", "clear"])
        .write_stdin("")
        .assert()
        .code(2);

    portal_cmd(UNREACHABLE, dir.path())
        .args(["queue", "clear", "--yes"])
        .assert()
        .success();
    portal_cmd(UNREACHABLE, dir.path())
        .args(["queue", "len"])
        .assert()
        .stdout("0\n");
}

// ── Auth ────────────────────────────────────────────────────────────

#[test]
fn test_auth_token_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().to_str().unwrap();

    zealnet_cmd()
        .args(["--data-dir", data_dir, "auth", "status", "-o", "plain"])
        .assert()
        .success()
        .stdout("false\n");

    zealnet_cmd()
        .args(["--data-dir", data_dir, "auth", "set-token", "abcd-secret-wxyz"])
        .assert()
        .success();

    let output = zealnet_cmd()
        .args(["--data-dir", data_dir, "auth", "status", "-o", "json"])
        .output()
        .unwrap();
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["stored"], true);
    assert_eq!(status["token"], "abcd…wxyz");

    zealnet_cmd()
        .args(["--data-dir", data_dir, "auth", "clear-token"])
        .assert()
        .success();
    zealnet_cmd()
        .args(["--data-dir", data_dir, "auth", "status", "-o", "plain"])
        .assert()
        .stdout("false\n");
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_default_output_applies_without_flag() {
    let data = tempfile::tempdir().unwrap();
    let data_dir = data.path().to_str().unwrap();
    let (_config_home, mut cmd) = configured_cmd("[defaults]\noutput = \"json\"\n");

    let output = cmd
        .args(["--data-dir", data_dir, "auth", "status"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["stored"], false);

    let (_config_home, mut cmd) = configured_cmd("[defaults]\noutput = \"json\"\n");
    cmd.args(["--data-dir", data_dir, "auth", "status", "-o", "plain"])
        .assert()
        .success()
        .stdout("false\n");
}

#[test]
fn test_config_path_prints_toml_location() {
    zealnet_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}
