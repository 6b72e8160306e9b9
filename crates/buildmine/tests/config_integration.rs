//! Configuration integration tests.
//!
//! These tests verify config discovery, format parsing, and precedence
//! from an end-to-end perspective using the compiled binary. Effective
//! values are read back through `info --json`.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Returns a Command configured to run our binary.
#[allow(deprecated)]
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
    cmd.env_remove("GITHUB_TOKEN");
    cmd
}

/// Run `info --json` from `dir` and return the `config` object.
fn effective_config(dir: &Path) -> serde_json::Value {
    let output = cmd()
        .args(["-C", dir.to_str().unwrap(), "info", "--json"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "info failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    json["config"].clone()
}

// =============================================================================
// Config File Discovery
// =============================================================================

#[test]
fn runs_without_config_file() {
    let tmp = TempDir::new().unwrap();
    let config = effective_config(tmp.path());
    assert_eq!(config["log_level"], "info");
    assert!(config.get("config_file").is_none());
}

#[test]
fn discovers_dotfile_config_in_current_dir() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".buildmine.toml"), r#"log_level = "debug""#).unwrap();

    let config = effective_config(tmp.path());
    assert_eq!(config["log_level"], "debug");
    assert!(
        config["config_file"]
            .as_str()
            .unwrap()
            .ends_with(".buildmine.toml")
    );
}

#[test]
fn discovers_regular_config_in_current_dir() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("buildmine.toml"), r#"log_level = "warn""#).unwrap();

    assert_eq!(effective_config(tmp.path())["log_level"], "warn");
}

#[test]
fn discovers_config_in_parent_directory() {
    let tmp = TempDir::new().unwrap();
    let sub_dir = tmp.path().join("nested").join("deep");
    fs::create_dir_all(&sub_dir).unwrap();
    fs::write(tmp.path().join(".buildmine.toml"), r#"log_level = "debug""#).unwrap();

    assert_eq!(effective_config(&sub_dir)["log_level"], "debug");
}

#[test]
fn dotfile_takes_precedence_over_regular_name() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".buildmine.toml"), r#"log_level = "debug""#).unwrap();
    fs::write(tmp.path().join("buildmine.toml"), r#"log_level = "error""#).unwrap();

    assert_eq!(effective_config(tmp.path())["log_level"], "debug");
}

// =============================================================================
// Config Format Parsing
// =============================================================================

#[test]
fn parses_toml_sections() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".buildmine.toml"),
        r#"
log_level = "warn"

[github]
api_url = "https://ghe.example.com/api/v3"

[mining]
cold_start_commit_limit = 25
workflow_files = ["ci.yml", "test.yml"]
team_window_days = 30

[output]
path = "out/builds.csv"
"#,
    )
    .unwrap();

    let config = effective_config(tmp.path());
    assert_eq!(config["api_url"], "https://ghe.example.com/api/v3");
    assert_eq!(config["cold_start_commit_limit"], 25);
    assert_eq!(config["team_window_days"], 30);
    assert_eq!(config["workflow_files"][1], "test.yml");
    assert_eq!(config["output"], "out/builds.csv");
}

#[test]
fn parses_yaml_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".buildmine.yaml"),
        "mining:\n  workflow_files:\n    - ci.yaml\n",
    )
    .unwrap();

    assert_eq!(
        effective_config(tmp.path())["workflow_files"][0],
        "ci.yaml"
    );
}

#[test]
fn parses_yml_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".buildmine.yml"), "log_level: debug\n").unwrap();

    assert_eq!(effective_config(tmp.path())["log_level"], "debug");
}

#[test]
fn parses_json_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".buildmine.json"),
        r#"{"output": {"path": "mined.csv"}}"#,
    )
    .unwrap();

    assert_eq!(effective_config(tmp.path())["output"], "mined.csv");
}

#[test]
fn token_in_config_is_reported_but_not_printed() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".buildmine.toml"),
        "[github]\ntoken = \"ghp_secret\"\n",
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "info", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"token_set\": true"))
        .stdout(predicate::str::contains("ghp_secret").not());
}

// =============================================================================
// Config Precedence
// =============================================================================

#[test]
fn closer_config_takes_precedence() {
    let tmp = TempDir::new().unwrap();
    let sub_dir = tmp.path().join("project");
    fs::create_dir_all(&sub_dir).unwrap();
    fs::write(tmp.path().join(".buildmine.toml"), r#"log_level = "error""#).unwrap();
    fs::write(sub_dir.join(".buildmine.toml"), r#"log_level = "debug""#).unwrap();

    assert_eq!(effective_config(&sub_dir)["log_level"], "debug");
}

#[test]
fn toml_preferred_over_yaml_in_same_directory() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".buildmine.toml"), r#"log_level = "debug""#).unwrap();
    fs::write(tmp.path().join(".buildmine.yaml"), "log_level: error").unwrap();

    assert_eq!(effective_config(tmp.path())["log_level"], "debug");
}

#[test]
fn explicit_config_flag_overrides_discovery() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".buildmine.toml"), r#"log_level = "debug""#).unwrap();
    let explicit = tmp.path().join("other.toml");
    fs::write(&explicit, "[output]\npath = \"explicit.csv\"\n").unwrap();

    let output = cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "--config"])
        .arg(&explicit)
        .args(["info", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["config"]["output"], "explicit.csv");
}

// =============================================================================
// Error Cases
// =============================================================================

#[test]
fn invalid_toml_config_shows_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".buildmine.toml"), "this is not valid toml [[[").unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "info"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration").or(predicate::str::contains("config")));
}

#[test]
fn invalid_json_config_shows_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".buildmine.json"), "{not valid json}").unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "info"])
        .assert()
        .failure();
}

#[test]
fn wrongly_typed_field_shows_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".buildmine.toml"),
        "[mining]\nteam_window_days = \"ninety\"\n",
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "info"])
        .assert()
        .failure();
}

#[test]
fn unknown_config_field_is_ignored() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".buildmine.toml"),
        r#"
log_level = "info"
unknown_field = "should be ignored"
another_unknown = 42
"#,
    )
    .unwrap();

    assert_eq!(effective_config(tmp.path())["log_level"], "info");
}

// =============================================================================
// Boundary Marker Tests
// =============================================================================

#[test]
fn git_boundary_stops_config_search() {
    let tmp = TempDir::new().unwrap();
    let parent = tmp.path().join("parent");
    let repo = parent.join("repo");
    let src = repo.join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(parent.join(".buildmine.toml"), r#"log_level = "error""#).unwrap();
    fs::create_dir(repo.join(".git")).unwrap();

    // Search stops at the repo root, so defaults apply
    assert_eq!(effective_config(&src)["log_level"], "info");
}

#[test]
fn config_in_same_dir_as_git_is_found() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    let src = repo.join("src");
    fs::create_dir_all(&src).unwrap();
    fs::create_dir(repo.join(".git")).unwrap();
    fs::write(repo.join(".buildmine.toml"), r#"log_level = "debug""#).unwrap();

    assert_eq!(effective_config(&src)["log_level"], "debug");
}
