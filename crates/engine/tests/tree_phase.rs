//! 디스크 상의 트리에서 트리 단계 전체를 실행합니다.

use std::fs;
use std::io::Write;
use std::path::Path;

use prodtree_core::FailurePolicy;
use prodtree_engine::{EngineConfig, EngineConfigBuilder, EngineError, ProdEngine};

const MANIFEST: &str = "product/src/main/generated/excludes.txt";

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn child(name: &str, deps: &[&str]) -> String {
    let deps: String = deps
        .iter()
        .map(|d| {
            format!(
                "\n        <dependency>\n            <groupId>org.acme</groupId>\n            \
                 <artifactId>{d}</artifactId>\n        </dependency>"
            )
        })
        .collect();
    format!(
        r#"<project>
    <parent>
        <groupId>org.acme</groupId>
        <artifactId>acme-parent</artifactId>
        <version>3.2.0.prod</version>
    </parent>
    <artifactId>{name}</artifactId>
    <dependencies>{deps}
    </dependencies>
</project>
"#
    )
}

fn root_pom(links: &str) -> String {
    format!(
        r#"<project>
    <groupId>org.acme</groupId>
    <artifactId>acme-parent</artifactId>
    <version>3.2.0.prod</version>
    <packaging>pom</packaging>
    <properties>
        <community.version>3.2.0</community.version>
    </properties>
    <modules>
{links}
    </modules>
</project>
"#
    )
}

/// A -> B -> C, D는 고립
fn tree(links: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "pom.xml", &root_pom(links));
    write(root, "a/pom.xml", &child("a", &["b"]));
    write(root, "b/pom.xml", &child("b", &["c"]));
    write(root, "c/pom.xml", &child("c", &[]));
    write(root, "d/pom.xml", &child("d", &[]));
    dir
}

const ALL_ACTIVE: &str = "        <module>a</module>\n        <module>b</module>\n        \
                          <module>c</module>\n        <module>d</module>";

fn config(root: &Path) -> EngineConfig {
    EngineConfigBuilder::new()
        .root_dir(root)
        .tracked_group("org.acme")
        .community_version("3.2.0")
        .roots(&["org.acme:a"])
        .failure_policy(FailurePolicy::Fail)
        .local_repository(root.join("repo"))
        .build()
        .unwrap()
}

#[test]
fn isolated_module_is_excluded_and_listed() {
    let dir = tree(ALL_ACTIVE);
    let root = dir.path();
    write(root, "d/target/stale.class", "x");

    let report = ProdEngine::new(config(root)).run_excludes().unwrap();
    let tree = report.tree.unwrap();

    assert_eq!(tree.excluded, vec!["org.acme:d".to_owned()]);
    assert_eq!(tree.required, 4);
    assert_eq!(fs::read_to_string(root.join(MANIFEST)).unwrap(), ":d\n");
    let pom = fs::read_to_string(root.join("pom.xml")).unwrap();
    assert!(pom.contains("<!-- <module>d</module> prodtree:excluded -->"));
    assert!(pom.contains("<module>a</module>"));
    assert!(!root.join("d/target").exists());
    assert_eq!(tree.cleanup.removed.len(), 1);
}

#[test]
fn second_run_changes_nothing() {
    let dir = tree(ALL_ACTIVE);
    let root = dir.path();
    let engine = ProdEngine::new(config(root));

    let first = engine.run_excludes().unwrap().tree.unwrap();
    assert_eq!(first.descriptors_written.len(), 1);
    assert!(first.manifest_written);
    let before = fs::read_to_string(root.join("pom.xml")).unwrap();

    let second = engine.run_excludes().unwrap().tree.unwrap();
    assert!(second.descriptors_written.is_empty());
    assert!(!second.manifest_written);
    assert_eq!(second.edits, 0);
    assert_eq!(fs::read_to_string(root.join("pom.xml")).unwrap(), before);
}

#[test]
fn relink_happens_before_new_exclusions() {
    let links = "        <module>a</module>\n        <!-- <module>b</module> prodtree:excluded -->\n        \
                 <module>c</module>\n        <module>d</module>";
    let dir = tree(links);
    let root = dir.path();

    let tree = ProdEngine::new(config(root)).run_excludes().unwrap().tree.unwrap();
    assert_eq!(tree.relinked, vec!["org.acme:b".to_owned()]);
    assert_eq!(tree.unlinked, vec!["org.acme:d".to_owned()]);

    let pom = fs::read_to_string(root.join("pom.xml")).unwrap();
    assert!(pom.contains("<module>b</module>"));
    assert!(!pom.contains("<!-- <module>b</module>"));
    assert!(pom.contains("<!-- <module>d</module> prodtree:excluded -->"));
}

#[test]
fn foreign_comment_is_kept() {
    let links = "        <module>a</module>\n        <module>b</module>\n        <module>c</module>\n        \
                 <!-- <module>d</module> disabled by hand -->";
    let dir = tree(links);
    let root = dir.path();

    let tree = ProdEngine::new(config(root)).run_excludes().unwrap().tree.unwrap();
    assert!(tree.descriptors_written.is_empty());
    assert!(
        fs::read_to_string(root.join("pom.xml"))
            .unwrap()
            .contains("<!-- <module>d</module> disabled by hand -->")
    );
}

#[test]
fn unknown_root_pattern_fails_without_writing() {
    let dir = tree(ALL_ACTIVE);
    let root = dir.path();
    let mut config = config(root);
    config.roots = prodtree_core::GavSet::parse(&["org.acme:missing"], &[] as &[&str]).unwrap();

    let err = ProdEngine::new(config).run_excludes().unwrap_err();
    assert!(matches!(err, EngineError::NoMatchingRoot { .. }));
    assert!(!root.join(MANIFEST).exists());
}

#[test]
fn excluded_component_gets_community_classes() {
    let links = "        <module>a</module>\n        <module>b</module>\n        <module>c</module>\n        \
                 <module>d</module>\n        <module>extensions/e</module>";
    let dir = tree(links);
    let root = dir.path();
    write(root, "extensions/e/pom.xml", &child("e", &[]));

    let jar = root.join("repo/org/acme/e/3.2.0/e-3.2.0.jar");
    fs::create_dir_all(jar.parent().unwrap()).unwrap();
    let mut zip = zip::ZipWriter::new(fs::File::create(&jar).unwrap());
    zip.start_file("org/acme/E.class", zip::write::SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"cafebabe").unwrap();
    zip.finish().unwrap();

    let tree = ProdEngine::new(config(root)).run_excludes().unwrap().tree.unwrap();
    assert_eq!(fs::read_to_string(root.join(MANIFEST)).unwrap(), ":d\n:e\n");
    assert_eq!(tree.cleanup.unpacked.len(), 1);
    assert_eq!(
        fs::read_to_string(root.join("extensions/e/target/classes/org/acme/E.class")).unwrap(),
        "cafebabe"
    );
}

#[test]
fn missing_community_artifact_aborts_before_writes() {
    let links = "        <module>a</module>\n        <module>b</module>\n        <module>c</module>\n        \
                 <module>extensions/e</module>";
    let dir = tree(links);
    let root = dir.path();
    write(root, "extensions/e/pom.xml", &child("e", &[]));
    let before = fs::read_to_string(root.join("pom.xml")).unwrap();

    let err = ProdEngine::new(config(root)).run_excludes().unwrap_err();
    assert!(matches!(err, EngineError::Io { .. }));
    assert_eq!(fs::read_to_string(root.join("pom.xml")).unwrap(), before);
    assert!(!root.join(MANIFEST).exists());
}
