//! End-to-end tests for the `prodtree` binary.
//!
//! Each test builds a small source tree in a temp dir, writes a prodtree.toml
//! next to it and checks the exit code and output of one invocation.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("has parent")).expect("should create dirs");
    fs::write(path, text).expect("should write file");
}

fn prodtree(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_prodtree"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("binary should start")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn child(name: &str, body: &str) -> String {
    format!(
        r#"<project>
    <parent>
        <groupId>org.acme</groupId>
        <artifactId>acme-parent</artifactId>
        <version>3.2.0.prod</version>
    </parent>
    <artifactId>{name}</artifactId>
{body}
</project>
"#
    )
}

fn root_pom(modules: &[&str]) -> String {
    let links: String = modules
        .iter()
        .map(|m| format!("        <module>{m}</module>\n"))
        .collect();
    format!(
        r#"<project>
    <groupId>org.acme</groupId>
    <artifactId>acme-parent</artifactId>
    <version>3.2.0.prod</version>
    <packaging>pom</packaging>
    <modules>
{links}    </modules>
</project>
"#
    )
}

fn dependency(g: &str, a: &str, v: Option<&str>) -> String {
    let version = v
        .map(|v| format!("\n            <version>{v}</version>"))
        .unwrap_or_default();
    format!(
        "    <dependencies>\n        <dependency>\n            <groupId>{g}</groupId>\n            \
         <artifactId>{a}</artifactId>{version}\n        </dependency>\n    </dependencies>"
    )
}

/// a -> b, d는 고립
fn tree_fixture(roots: &str) -> TempDir {
    let dir = TempDir::new().expect("should create temp dir");
    let root = dir.path();
    write(root, "pom.xml", &root_pom(&["a", "b", "d"]));
    write(root, "a/pom.xml", &child("a", &dependency("org.acme", "b", None)));
    write(root, "b/pom.xml", &child("b", ""));
    write(root, "d/pom.xml", &child("d", ""));
    write(
        root,
        "prodtree.toml",
        &format!(
            r#"
[general]
log_level = "warn"

[project]
tracked_group = "org.acme"
community_version = "3.2.0"

[closure]
roots = [{roots}]

[flatten]
enabled = false

[resolver]
local_repository = "{}"
"#,
            root.join("repo").display()
        ),
    );
    dir
}

/// BOM이 트리에 없는 `org.acme:gone`을 관리함
fn bom_fixture(x_body: &str) -> TempDir {
    let dir = TempDir::new().expect("should create temp dir");
    let root = dir.path();
    write(root, "pom.xml", &root_pom(&["bom", "x"]));
    let managed: String = ["x", "gone"]
        .iter()
        .map(|a| {
            format!(
                "\n            <dependency>\n                <groupId>org.acme</groupId>\n                \
                 <artifactId>{a}</artifactId>\n                <version>${{project.version}}</version>\n            \
                 </dependency>"
            )
        })
        .collect();
    write(
        root,
        "bom/pom.xml",
        &child(
            "acme-bom",
            &format!(
                "    <packaging>pom</packaging>\n    <dependencyManagement>\n        <dependencies>{managed}\n        \
                 </dependencies>\n    </dependencyManagement>"
            ),
        ),
    );
    write(root, "x/pom.xml", &child("x", x_body));
    write(
        root,
        "prodtree.toml",
        &format!(
            r#"
[general]
log_level = "warn"

[project]
tracked_group = "org.acme"
community_version = "3.2.0"
bom_module = "org.acme:acme-bom"

[closure]
roots = ["org.acme:*"]

[flatten]
entry_points = ["org.acme:x"]

[resolver]
local_repository = "{}"
"#,
            root.join("repo").display()
        ),
    );
    dir
}

#[test]
fn test_excludes_succeeds_and_reports_json() {
    let dir = tree_fixture(r#""org.acme:a""#);
    let output = prodtree(dir.path(), &["excludes", "--output", "json"]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let report: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("stdout should be JSON");
    assert_eq!(report["tree"]["excluded"], serde_json::json!(["org.acme:d"]));
    assert!(report.get("bom").is_none());
    assert_eq!(
        fs::read_to_string(dir.path().join("product/src/main/generated/excludes.txt"))
            .expect("manifest should exist"),
        ":d\n"
    );
}

#[test]
fn test_run_with_flatten_disabled_runs_tree_phase_only() {
    let dir = tree_fixture(r#""org.acme:a""#);
    let output = prodtree(dir.path(), &["run"]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("Tree phase"));
    assert!(!text.contains("BOM phase"));
}

#[test]
fn test_flatten_with_flatten_disabled_is_config_error() {
    let dir = tree_fixture(r#""org.acme:a""#);
    let output = prodtree(dir.path(), &["flatten"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("flatten.enabled"));
}

#[test]
fn test_unknown_root_is_config_error() {
    let dir = tree_fixture(r#""org.acme:missing""#);
    let output = prodtree(dir.path(), &["excludes"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("org.acme:missing"));
    assert!(!dir.path().join("product/src/main/generated/excludes.txt").exists());
}

#[test]
fn test_missing_config_file_is_config_error() {
    let dir = TempDir::new().expect("should create temp dir");
    let output = prodtree(dir.path(), &["run", "-c", "nope.toml"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("error: "));
    assert!(stderr(&output).contains("nope.toml"));
}

#[test]
fn test_stale_constraint_fails_with_policy_exit_code() {
    let dir = bom_fixture("");
    let output = prodtree(dir.path(), &["flatten"]);

    assert_eq!(output.status.code(), Some(4), "stderr: {}", stderr(&output));
    let err = stderr(&output);
    assert!(err.contains("staleness failed"));
    assert!(err.contains("org.acme:gone"));
}

#[test]
fn test_on_failure_warn_downgrades_violations() {
    let dir = bom_fixture("");
    let output = prodtree(
        dir.path(),
        &["flatten", "--on-failure", "warn", "--output", "json"],
    );

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let report: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("stdout should be JSON");
    let checks: Vec<&str> = report["bom"]["violations"]
        .as_array()
        .expect("violations should be an array")
        .iter()
        .filter_map(|v| v["check"].as_str())
        .collect();
    assert!(checks.contains(&"staleness"));
    assert!(
        dir.path()
            .join("poms/bom/src/main/generated/flattened-reduced-pom.xml")
            .exists()
    );
}

#[test]
fn test_missing_artifact_is_resolution_error() {
    let dir = bom_fixture(&dependency("org.lib", "missing", Some("1")));
    let output = prodtree(dir.path(), &["flatten", "--on-failure", "ignore"]);

    assert_eq!(output.status.code(), Some(5), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("org.lib:missing:1"));
}

#[test]
fn test_config_validate_reports_invalid_file() {
    let dir = TempDir::new().expect("should create temp dir");
    write(dir.path(), "prodtree.toml", "[general\nlog_level = \"info\"\n");
    let output = prodtree(dir.path(), &["config", "validate"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(stdout(&output).contains("INVALID"));
}

#[test]
fn test_config_validate_rejects_bad_root_pattern() {
    let dir = tree_fixture(r#""org.acme:a:1:jar:x:y""#);
    let output = prodtree(dir.path(), &["config", "validate", "--output", "json"]);

    assert_eq!(output.status.code(), Some(2));
    let report: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("stdout should be JSON");
    assert_eq!(report["valid"], serde_json::json!(false));
}

#[test]
fn test_config_show_section_applies_flags() {
    let dir = tree_fixture(r#""org.acme:a""#);
    let output = prodtree(
        dir.path(),
        &["config", "show", "--section", "checks", "--on-failure", "ignore"],
    );

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("[checks]"));
    assert!(text.contains("failure_policy = \"ignore\""));
}

#[test]
fn test_config_show_unknown_section_is_command_error() {
    let dir = tree_fixture(r#""org.acme:a""#);
    let output = prodtree(dir.path(), &["config", "show", "--section", "ebpf"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("unknown section"));
}
