//! Integration tests for the `octodeploy` CLI binary.
//!
//! Offline commands run against nothing; the CRUD round trips point the
//! binary at a wiremock server.
#![allow(clippy::unwrap_used)]

use std::io::Write;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `octodeploy` binary with env isolation.
///
/// Clears every variable the CLI reads and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn octodeploy_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("octodeploy");
    cmd.env("HOME", "/tmp/octodeploy-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/octodeploy-cli-test-nonexistent")
        .env_remove("OCTODEPLOY_PROFILE")
        .env_remove("OCTODEPLOY_OUTPUT")
        .env_remove("OCTODEPLOY_INSECURE")
        .env_remove("OCTODEPLOY_TIMEOUT")
        .env_remove("OCTOPUS_URL")
        .env_remove("OCTOPUS_APIKEY")
        .env_remove("OCTOPUS_SPACE")
        .env_remove("RUST_LOG");
    cmd
}

fn json_file(value: &serde_json::Value) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{value}").unwrap();
    file
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = octodeploy_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    octodeploy_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Octopus Deploy")
            .and(predicate::str::contains("validate"))
            .and(predicate::str::contains("schema"))
            .and(predicate::str::contains("import"))
            .and(predicate::str::contains("data")),
    );
}

#[test]
fn test_version_flag() {
    octodeploy_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("octodeploy"));
}

#[test]
fn test_completions_bash() {
    octodeploy_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Offline commands ────────────────────────────────────────────────

#[test]
fn test_resources_lists_every_type() {
    let output = octodeploy_cmd().arg("resources").output().unwrap();
    assert!(output.status.success());
    let rows: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows.len(), 16);
    assert!(rows.contains(&json!({"kind": "data", "name": "octopusdeploy_environments"})));
    assert!(rows.contains(&json!({"kind": "resource", "name": "octopusdeploy_variable"})));
}

#[test]
fn test_schema_for_single_type() {
    octodeploy_cmd()
        .args(["schema", "octopusdeploy_environment"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("use_guided_failure")
                .and(predicate::str::contains("jira_extension_settings")),
        );
}

#[test]
fn test_validate_accepts_good_config() {
    let file = json_file(&json!({"name": "Staging", "sort_order": 2}));
    octodeploy_cmd()
        .args(["validate", "octopusdeploy_environment", "-f"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"valid\": true"));
}

#[test]
fn test_validate_reads_stdin() {
    octodeploy_cmd()
        .args(["validate", "octopusdeploy_environments", "-f", "-"])
        .write_stdin(r#"{"partial_name": "Prod", "take": 5}"#)
        .assert()
        .success();
}

#[test]
fn test_validate_reports_attribute_errors() {
    let file = json_file(&json!({
        "name": "Staging",
        "jira_extension_settings": {"environment_type": "qa"}
    }));
    let output = octodeploy_cmd()
        .args(["validate", "octopusdeploy_environment", "-f"])
        .arg(file.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("jira_extension_settings.environment_type"),
        "missing attribute path:\n{stderr}"
    );
}

#[test]
fn test_unknown_type_is_usage_error() {
    let file = json_file(&json!({}));
    octodeploy_cmd()
        .args(["validate", "octopusdeploy_feed", "-f"])
        .arg(file.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown resource type"));
}

#[test]
fn test_create_without_server_config() {
    let file = json_file(&json!({"name": "Staging"}));
    octodeploy_cmd()
        .args(["create", "octopusdeploy_environment", "-f"])
        .arg(file.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No Octopus server configured"));
}

#[test]
fn test_missing_profile_is_reported() {
    let file = json_file(&json!({"name": "Staging"}));
    octodeploy_cmd()
        .args(["--profile", "prod", "create", "octopusdeploy_environment", "-f"])
        .arg(file.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Profile 'prod' not found"));
}

// ── Against a server ────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_read_refreshes_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/Spaces-1/environments/Environments-1"))
        .and(header("X-Octopus-ApiKey", "API-TESTKEY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": "Environments-1",
            "Name": "Production",
            "Slug": "production",
            "SortOrder": 4,
            "SpaceId": "Spaces-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let state = json_file(&json!({"id": "Environments-1", "name": "Production"}));
    let output = octodeploy_cmd()
        .args(["--address", &server.uri(), "--api-key", "API-TESTKEY", "--space", "Spaces-1"])
        .args(["read", "octopusdeploy_environment", "-s"])
        .arg(state.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let refreshed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(refreshed["name"], "Production");
    assert_eq!(refreshed["sort_order"], 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_read_of_deleted_resource_exits_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/Spaces-1/environments/Environments-9"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "ErrorMessage": "The resource you requested was not found."
        })))
        .mount(&server)
        .await;

    let state = json_file(&json!({"id": "Environments-9", "name": "Gone"}));
    octodeploy_cmd()
        .args(["--address", &server.uri(), "--api-key", "API-TESTKEY", "--space", "Spaces-1"])
        .args(["read", "octopusdeploy_environment", "-s"])
        .arg(state.path())
        .assert()
        .code(4);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_import_variable_by_owner_and_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/Spaces-1/variables/variableset-Projects-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Id": "variableset-Projects-1",
            "OwnerId": "Projects-1",
            "Version": 4,
            "Variables": [{
                "Id": "0906031f-68ba",
                "Name": "Shop.Url",
                "Value": "https://shop.example.com",
                "Type": "String",
                "IsSensitive": false
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = octodeploy_cmd()
        .args(["--address", &server.uri(), "--api-key", "API-TESTKEY", "--space", "Spaces-1"])
        .args(["import", "octopusdeploy_variable", "Projects-1:0906031f-68ba"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let state: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(state["id"], "0906031f-68ba");
    assert_eq!(state["owner_id"], "Projects-1");
    assert_eq!(state["name"], "Shop.Url");
    assert_eq!(state["value"], "https://shop.example.com");
}

#[test]
fn test_import_rejects_malformed_variable_id() {
    octodeploy_cmd()
        .args(["--address", "http://127.0.0.1:9", "--api-key", "API-TESTKEY"])
        .args(["import", "octopusdeploy_variable", "0906031f-68ba"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("OwnerID:VariableID"));
}
