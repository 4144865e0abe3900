//! 축소 BOM 변화 감지
//!
//! 디스크에 있던 이전 축소 BOM과 새 항목 목록을 `(Ga, type, classifier)` 기준으로
//! 비교합니다. 보고만 하고 실패 정책에는 넘기지 않습니다.

use std::collections::BTreeMap;

use roxmltree::Document;
use serde::Serialize;

use prodtree_pom::parse::{child, child_text, children};

use crate::error::EngineError;
use crate::resolver::ManagedConstraint;

/// 항목 하나의 변화
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftEntry {
    /// `groupId:artifactId[:type[:classifier]]`
    pub artifact: String,
    /// 이전 버전 (새로 추가되면 `None`)
    pub before: Option<String>,
    /// 새 버전 (제거되면 `None`)
    pub after: Option<String>,
}

/// 축소 BOM 변화 보고
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Drift {
    /// 비교할 이전 파일이 있었는지 여부
    pub baseline: bool,
    /// 추가된 항목
    pub added: Vec<DriftEntry>,
    /// 제거된 항목
    pub removed: Vec<DriftEntry>,
    /// 버전이 바뀐 항목
    pub changed: Vec<DriftEntry>,
}

impl Drift {
    /// 변화가 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

fn label(group: &str, artifact: &str, artifact_type: &str, classifier: &str) -> String {
    let mut out = format!("{group}:{artifact}");
    if artifact_type != "jar" || !classifier.is_empty() {
        out.push(':');
        out.push_str(artifact_type);
    }
    if !classifier.is_empty() {
        out.push(':');
        out.push_str(classifier);
    }
    out
}

/// 직렬화된 BOM에서 `항목 -> 버전` 표를 읽습니다.
pub fn read_versions(location: &str, text: &str) -> Result<BTreeMap<String, String>, EngineError> {
    let doc = Document::parse(text).map_err(|e| EngineError::Pom(prodtree_pom::PomError::Parse {
        path: location.to_owned(),
        reason: e.to_string(),
    }))?;
    let mut versions = BTreeMap::new();
    let Some(list) = child(doc.root_element(), "dependencyManagement").and_then(|dm| child(dm, "dependencies"))
    else {
        return Ok(versions);
    };
    for dep in children(list, "dependency") {
        let group = child_text(dep, "groupId").unwrap_or_default();
        let artifact = child_text(dep, "artifactId").unwrap_or_default();
        let artifact_type = child_text(dep, "type").unwrap_or_else(|| "jar".to_owned());
        let classifier = child_text(dep, "classifier").unwrap_or_default();
        versions.insert(
            label(&group, &artifact, &artifact_type, &classifier),
            child_text(dep, "version").unwrap_or_default(),
        );
    }
    Ok(versions)
}

/// 이전 문서와 새 항목을 비교합니다. 이전 문서가 없으면 빈 보고입니다.
pub fn detect(
    location: &str,
    previous: Option<&str>,
    current: &[ManagedConstraint],
) -> Result<Drift, EngineError> {
    let Some(previous) = previous else {
        return Ok(Drift::default());
    };
    let before = read_versions(location, previous)?;
    let after: BTreeMap<String, String> = current
        .iter()
        .map(|c| {
            let g = &c.gavtcs;
            (
                label(&g.gav.ga.group_id, &g.gav.ga.artifact_id, &g.artifact_type, &g.classifier),
                g.gav.version_or_empty().to_owned(),
            )
        })
        .collect();

    let mut drift = Drift {
        baseline: true,
        ..Drift::default()
    };
    for (artifact, version) in &after {
        match before.get(artifact) {
            None => drift.added.push(DriftEntry {
                artifact: artifact.clone(),
                before: None,
                after: Some(version.clone()),
            }),
            Some(old) if old != version => drift.changed.push(DriftEntry {
                artifact: artifact.clone(),
                before: Some(old.clone()),
                after: Some(version.clone()),
            }),
            Some(_) => {}
        }
    }
    for (artifact, version) in &before {
        if !after.contains_key(artifact) {
            drift.removed.push(DriftEntry {
                artifact: artifact.clone(),
                before: Some(version.clone()),
                after: None,
            });
        }
    }
    Ok(drift)
}
