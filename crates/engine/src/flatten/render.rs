//! 평탄화 BOM 직렬화
//!
//! 같은 입력은 항상 같은 바이트를 만듭니다. 들여쓰기는 공백 두 칸, 줄 끝은 `\n`입니다.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use prodtree_core::{Ga, Gav};

use crate::resolver::ManagedConstraint;

const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://maven.apache.org/POM/4.0.0 http://maven.apache.org/xsd/maven-4.0.0.xsd">
  <modelVersion>4.0.0</modelVersion>
"#;

/// 관리 항목 정렬 키 `(groupId, artifactId, type, classifier)`
pub fn sort_key(c: &ManagedConstraint) -> (&str, &str, &str, &str) {
    (
        &c.gavtcs.gav.ga.group_id,
        &c.gavtcs.gav.ga.artifact_id,
        &c.gavtcs.artifact_type,
        &c.gavtcs.classifier,
    )
}

/// XML 텍스트 이스케이프
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

fn element(out: &mut String, indent: usize, tag: &str, text: &str) {
    let _ = writeln!(out, "{:indent$}<{tag}>{}</{tag}>", "", escape(text), indent = indent);
}

/// BOM 문서를 만듭니다.
///
/// `required_by`가 주어지면 각 항목 앞에 그 항목을 요구하는 진입점 주석을 붙입니다.
pub fn render_bom(
    project: &Gav,
    constraints: &[ManagedConstraint],
    required_by: Option<&BTreeMap<Ga, BTreeSet<Ga>>>,
) -> String {
    let mut sorted: Vec<&ManagedConstraint> = constraints.iter().collect();
    sorted.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

    let mut out = String::from(HEADER);
    element(&mut out, 2, "groupId", &project.ga.group_id);
    element(&mut out, 2, "artifactId", &project.ga.artifact_id);
    element(&mut out, 2, "version", project.version_or_empty());
    element(&mut out, 2, "packaging", "pom");
    out.push_str("  <dependencyManagement>\n    <dependencies>\n");

    for constraint in sorted {
        if let Some(required_by) = required_by {
            let names: Vec<String> = required_by
                .get(constraint.ga())
                .map(|set| set.iter().map(Ga::to_string).collect())
                .unwrap_or_default();
            // `--`는 주석 안에 올 수 없다
            let _ = writeln!(
                out,
                "      <!-- required by: {} -->",
                names.join(", ").replace("--", "-")
            );
        }
        let gavtcs = &constraint.gavtcs;
        out.push_str("      <dependency>\n");
        element(&mut out, 8, "groupId", &gavtcs.gav.ga.group_id);
        element(&mut out, 8, "artifactId", &gavtcs.gav.ga.artifact_id);
        element(&mut out, 8, "version", gavtcs.gav.version_or_empty());
        if gavtcs.artifact_type != "jar" {
            element(&mut out, 8, "type", &gavtcs.artifact_type);
        }
        if !gavtcs.classifier.is_empty() {
            element(&mut out, 8, "classifier", &gavtcs.classifier);
        }
        if !gavtcs.scope.is_empty() {
            element(&mut out, 8, "scope", &gavtcs.scope);
        }
        if !constraint.exclusions.is_empty() {
            let mut exclusions = constraint.exclusions.clone();
            exclusions.sort();
            exclusions.dedup();
            out.push_str("        <exclusions>\n");
            for ex in &exclusions {
                out.push_str("          <exclusion>\n");
                element(&mut out, 12, "groupId", &ex.group_id);
                element(&mut out, 12, "artifactId", &ex.artifact_id);
                out.push_str("          </exclusion>\n");
            }
            out.push_str("        </exclusions>\n");
        }
        out.push_str("      </dependency>\n");
    }

    out.push_str("    </dependencies>\n  </dependencyManagement>\n</project>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodtree_core::Gavtcs;

    fn constraint(g: &str, a: &str, v: &str) -> ManagedConstraint {
        ManagedConstraint::new(
            Gavtcs::new(Gav::new(g, a, Some(v.to_owned()))),
            Gav::new("org.acme", "acme-bom", Some("1".to_owned())),
        )
    }

    #[test]
    fn output_is_sorted_and_stable() {
        let project = Gav::new("org.acme", "acme-bom", Some("1.0".to_owned()));
        let mut b = constraint("org.b", "b", "2");
        b.exclusions = vec![Ga::new("z", "z"), Ga::new("a", "a")];
        let items = vec![b, constraint("org.a", "a", "1 & 2")];

        let first = render_bom(&project, &items, None);
        let reversed: Vec<_> = items.iter().rev().cloned().collect();
        assert_eq!(first, render_bom(&project, &reversed, None));

        let a_pos = first.find("<groupId>org.a</groupId>").unwrap();
        let b_pos = first.find("<groupId>org.b</groupId>").unwrap();
        assert!(a_pos < b_pos);
        assert!(first.contains("<version>1 &amp; 2</version>"));
        assert!(first.find("<groupId>a</groupId>").unwrap() < first.find("<groupId>z</groupId>").unwrap());
        assert!(first.ends_with("</project>\n"));
        assert!(!first.contains('\r'));
        roxmltree::Document::parse(&first).unwrap();
    }

    #[test]
    fn verbose_variant_names_entry_points() {
        let project = Gav::new("org.acme", "acme-bom", Some("1.0".to_owned()));
        let items = vec![constraint("org.a", "a", "1")];
        let required_by = BTreeMap::from([(
            Ga::new("org.a", "a"),
            BTreeSet::from([Ga::new("org.acme", "x"), Ga::new("org.acme", "y")]),
        )]);
        let out = render_bom(&project, &items, Some(&required_by));
        assert!(out.contains("      <!-- required by: org.acme:x, org.acme:y -->\n      <dependency>"));
    }
}
