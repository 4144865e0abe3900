//! Integration tests for `prodtree config`.
//!
//! Checks the loading order defaults < file < environment < flags through the binary.

use std::fs;
use std::process::{Command, Output};

use tempfile::TempDir;

const CONFIG: &str = r#"
[general]
log_level = "warn"

[project]
tracked_group = "org.acme"
community_version = "3.2.0"

[closure]
roots = ["org.acme:product"]

[flatten]
enabled = false

[checks]
failure_policy = "fail"
"#;

fn config_dir() -> TempDir {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(temp_dir.path().join("prodtree.toml"), CONFIG).expect("should write config");
    temp_dir
}

fn show_checks(dir: &TempDir, env: &[(&str, &str)], extra: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_prodtree"));
    cmd.current_dir(dir.path())
        .env_remove("PRODTREE_CHECKS_FAILURE_POLICY")
        .args(["config", "show", "--section", "checks"])
        .args(extra);
    for (key, value) in env {
        cmd.env(key, value);
    }
    cmd.output().expect("binary should start")
}

fn text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_config_show_uses_file_value() {
    // Given: A config file with failure_policy = fail
    let dir = config_dir();

    // When: Showing the checks section without overrides
    let output = show_checks(&dir, &[], &[]);

    // Then: The file value is effective
    assert!(output.status.success());
    assert!(text(&output).contains("failure_policy = \"fail\""));
}

#[test]
fn test_env_override_wins_over_file() {
    let dir = config_dir();
    let output = show_checks(&dir, &[("PRODTREE_CHECKS_FAILURE_POLICY", "warn")], &[]);

    assert!(output.status.success());
    assert!(text(&output).contains("failure_policy = \"warn\""));
}

#[test]
fn test_flag_wins_over_env() {
    let dir = config_dir();
    let output = show_checks(
        &dir,
        &[("PRODTREE_CHECKS_FAILURE_POLICY", "warn")],
        &["--on-failure", "ignore"],
    );

    assert!(output.status.success());
    assert!(text(&output).contains("failure_policy = \"ignore\""));
}

#[test]
fn test_invalid_env_value_fails_validation() {
    // Given: An environment override outside the allowed values
    let dir = config_dir();

    // When: Validating
    let output = Command::new(env!("CARGO_BIN_EXE_prodtree"))
        .current_dir(dir.path())
        .env("PRODTREE_CHECKS_FAILURE_POLICY", "explode")
        .args(["config", "validate"])
        .output()
        .expect("binary should start");

    // Then: Exit code 2 and the offending field is named
    assert_eq!(output.status.code(), Some(2));
    assert!(text(&output).contains("checks.failure_policy"));
}

#[test]
fn test_config_validate_valid_file() {
    let dir = config_dir();
    let output = Command::new(env!("CARGO_BIN_EXE_prodtree"))
        .current_dir(dir.path())
        .env_remove("PRODTREE_CHECKS_FAILURE_POLICY")
        .args(["config", "validate", "--output", "json"])
        .output()
        .expect("binary should start");

    assert_eq!(output.status.code(), Some(0));
    let report: serde_json::Value =
        serde_json::from_str(&text(&output)).expect("stdout should be JSON");
    assert_eq!(report["valid"], serde_json::json!(true));
    assert_eq!(report["errors"], serde_json::json!([]));
}
