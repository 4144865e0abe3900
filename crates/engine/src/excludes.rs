//! 모듈 링크/언링크 -- 필수 집합에 맞춘 `<module>` 링크 상태와 부수 효과
//!
//! 두 단계 모두 같은 필수 집합에서 원하는 링크 상태를 계산합니다.
//!
//! 1. 재링크: 설정된 마커로 억제된 링크 중 대상이 필수인 링크를 활성화합니다.
//! 2. 배제: 대상이 필수가 아닌 활성 링크를 마커 주석으로 억제합니다.
//!
//! 다른 마커를 가진 주석은 건드리지 않습니다.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use prodtree_core::Ga;
use prodtree_pom::{ModuleGraph, ModuleLink, Transformation};

use crate::config::EngineConfig;
use crate::error::EngineError;

/// 링크 변경 계획
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkPlan {
    /// 집계 디스크립터별 편집
    pub edits: BTreeMap<PathBuf, Vec<Transformation>>,
    /// 다시 활성화되는 모듈
    pub relinked: BTreeSet<Ga>,
    /// 새로 억제되는 모듈
    pub unlinked: BTreeSet<Ga>,
}

impl LinkPlan {
    /// 편집 수
    pub fn len(&self) -> usize {
        self.edits.values().map(Vec::len).sum()
    }

    /// 변경이 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 필수 집합에 맞게 링크 편집을 계산합니다.
///
/// 재링크 편집이 항상 같은 디스크립터의 배제 편집보다 먼저 큐에 들어갑니다.
pub fn plan_links(graph: &ModuleGraph, required: &BTreeSet<Ga>, marker: &str) -> LinkPlan {
    let mut plan = LinkPlan::default();
    let mut exclusions: Vec<(PathBuf, Transformation)> = Vec::new();

    for edge in graph.links() {
        let Some(child) = edge.child.as_ref() else {
            continue;
        };
        let Some(aggregator) = graph.module(&edge.aggregator) else {
            continue;
        };
        let descriptor = aggregator.descriptor.clone();
        match &edge.link {
            ModuleLink::Suppressed { path, reason } if reason == marker && required.contains(child) => {
                debug!(module = %child, aggregator = %edge.aggregator, "relinking");
                plan.edits.entry(descriptor).or_default().push(Transformation::ActivateModule {
                    path: path.clone(),
                    marker: marker.to_owned(),
                });
                plan.relinked.insert(child.clone());
            }
            ModuleLink::Active { path } if !required.contains(child) => {
                exclusions.push((
                    descriptor,
                    Transformation::SuppressModule {
                        path: path.clone(),
                        marker: marker.to_owned(),
                    },
                ));
                plan.unlinked.insert(child.clone());
            }
            _ => {}
        }
    }

    for (descriptor, edit) in exclusions {
        plan.edits.entry(descriptor).or_default().push(edit);
    }
    info!(
        relinked = plan.relinked.len(),
        unlinked = plan.unlinked.len(),
        "module link plan computed"
    );
    plan
}

/// 배제 매니페스트 내용 (`:artifactId` 한 줄씩, artifactId 오름차순)
pub fn manifest_text(excluded: &BTreeSet<Ga>) -> String {
    let mut artifacts: Vec<&str> = excluded.iter().map(|ga| ga.artifact_id.as_str()).collect();
    artifacts.sort_unstable();
    artifacts.dedup();
    artifacts.iter().map(|a| format!(":{a}\n")).collect()
}

/// 배제 모듈의 빌드 출력 정리 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// 삭제한 빌드 출력 디렉토리
    pub removed: Vec<PathBuf>,
    /// 커뮤니티 아티팩트를 풀어 넣은 모듈
    pub unpacked: Vec<Ga>,
}

/// 컴포넌트 모듈 여부 (jar 패키징이고 경로가 설정된 접두사로 시작)
pub fn is_component(rel_dir: &str, packaging: &str, prefixes: &[String]) -> bool {
    let rel = format!("{}/", rel_dir.trim_end_matches('/'));
    packaging == "jar" && prefixes.iter().any(|p| rel.starts_with(p.as_str()))
}

/// 커뮤니티 아티팩트 경로
pub fn community_artifact(config: &EngineConfig, ga: &Ga) -> PathBuf {
    let group = config.community_group.as_deref().unwrap_or(&ga.group_id);
    let version = &config.community_version;
    let mut path = config.local_repository.clone();
    for segment in group.split('.') {
        path.push(segment);
    }
    path.join(&ga.artifact_id)
        .join(version)
        .join(format!("{}-{version}.jar", ga.artifact_id))
}

/// 배제된 컴포넌트 모듈의 커뮤니티 아티팩트가 모두 있는지 확인합니다.
///
/// 트리 단계는 디스크립터를 쓰기 전에 이 검사를 통과해야 합니다.
pub fn check_community_artifacts(
    graph: &ModuleGraph,
    excluded: &BTreeSet<Ga>,
    config: &EngineConfig,
) -> Result<(), EngineError> {
    for ga in excluded {
        let Some(module) = graph.module(ga) else {
            continue;
        };
        if !is_component(&module.rel_dir, &module.packaging, &config.component_path_prefixes) {
            continue;
        }
        let jar = community_artifact(config, ga);
        if !jar.is_file() {
            return Err(EngineError::io(
                &jar,
                std::io::Error::new(std::io::ErrorKind::NotFound, format!("community artifact of {ga} not found")),
            ));
        }
    }
    Ok(())
}

/// 배제 모듈의 빌드 출력을 지우고 컴포넌트 모듈에는 커뮤니티 클래스를 풀어 넣습니다.
///
/// # Errors
///
/// 커뮤니티 아티팩트가 없거나 압축 항목이 대상 디렉토리를 벗어나면 에러입니다.
pub fn clean_excluded(
    graph: &ModuleGraph,
    excluded: &BTreeSet<Ga>,
    config: &EngineConfig,
) -> Result<CleanupReport, EngineError> {
    let mut report = CleanupReport::default();
    for ga in excluded {
        let Some(module) = graph.module(ga) else {
            continue;
        };
        let target = module.build_output_dir();
        if target.is_dir() {
            std::fs::remove_dir_all(&target).map_err(|e| EngineError::io(&target, e))?;
            debug!(path = %target.display(), "build output removed");
            report.removed.push(target.clone());
        }

        if is_component(&module.rel_dir, &module.packaging, &config.component_path_prefixes) {
            let jar = community_artifact(config, ga);
            let classes = target.join("classes");
            let entries = unpack(&jar, &classes)?;
            info!(module = %ga, jar = %jar.display(), entries, "community classes unpacked");
            report.unpacked.push(ga.clone());
        }
    }
    Ok(report)
}

/// zip 아카이브를 `dest`에 풉니다. 푼 파일 수를 반환합니다.
pub fn unpack(archive: &Path, dest: &Path) -> Result<usize, EngineError> {
    let file = File::open(archive).map_err(|e| EngineError::io(archive, e))?;
    let mut zip = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| EngineError::Archive {
        path: archive.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut written = 0;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| EngineError::Archive {
            path: archive.display().to_string(),
            reason: e.to_string(),
        })?;
        let rel = entry_path(entry.name()).ok_or_else(|| EngineError::Archive {
            path: archive.display().to_string(),
            reason: format!("entry '{}' escapes the destination", entry.name()),
        })?;
        let out = dest.join(rel);
        if entry.is_dir() {
            std::fs::create_dir_all(&out).map_err(|e| EngineError::io(&out, e))?;
            continue;
        }
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
        }
        let mut sink = File::create(&out).map_err(|e| EngineError::io(&out, e))?;
        std::io::copy(&mut entry, &mut sink).map_err(|e| EngineError::io(&out, e))?;
        written += 1;
    }
    if written == 0 {
        warn!(jar = %archive.display(), "community artifact has no entries");
    }
    Ok(written)
}

fn entry_path(name: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use prodtree_pom::model::{Activation, Module, Profile};

    fn module(artifact: &str, links: Vec<ModuleLink>) -> Module {
        let dir = if artifact == "root" {
            String::new()
        } else {
            format!("{artifact}/")
        };
        Module {
            ga: Ga::new("g", artifact),
            version: "1".to_owned(),
            declares_version: true,
            descriptor: PathBuf::from(format!("/t/{dir}pom.xml")),
            rel_dir: dir.trim_end_matches('/').to_owned(),
            packaging: if links.is_empty() { "jar" } else { "pom" }.to_owned(),
            parent: None,
            profiles: vec![Profile {
                id: String::new(),
                activation: Activation::default(),
                properties: BTreeMap::new(),
                dependencies: Vec::new(),
                managed_dependencies: Vec::new(),
                module_links: links,
            }],
        }
    }

    fn suppressed(path: &str, reason: &str) -> ModuleLink {
        ModuleLink::Suppressed {
            path: path.to_owned(),
            reason: reason.to_owned(),
        }
    }

    fn graph() -> ModuleGraph {
        ModuleGraph::from_modules(
            "/t",
            vec![
                module(
                    "root",
                    vec![
                        ModuleLink::Active { path: "a".to_owned() },
                        ModuleLink::Active { path: "d".to_owned() },
                        suppressed("b", "prodtree:excluded"),
                        suppressed("c", "hand-disabled"),
                    ],
                ),
                module("a", Vec::new()),
                module("b", Vec::new()),
                module("c", Vec::new()),
                module("d", Vec::new()),
            ],
        )
        .unwrap()
    }

    fn set(names: &[&str]) -> BTreeSet<Ga> {
        names.iter().map(|n| Ga::new("g", *n)).collect()
    }

    #[test]
    fn relinks_before_unlinking() {
        let plan = plan_links(&graph(), &set(&["root", "a", "b", "c"]), "prodtree:excluded");
        let edits = &plan.edits[&PathBuf::from("/t/pom.xml")];
        assert_eq!(
            edits,
            &vec![
                Transformation::ActivateModule {
                    path: "b".to_owned(),
                    marker: "prodtree:excluded".to_owned(),
                },
                Transformation::SuppressModule {
                    path: "d".to_owned(),
                    marker: "prodtree:excluded".to_owned(),
                },
            ]
        );
        assert_eq!(plan.relinked, set(&["b"]));
        assert_eq!(plan.unlinked, set(&["d"]));
    }

    #[test]
    fn foreign_marker_is_left_alone() {
        let plan = plan_links(&graph(), &set(&["root", "a", "c", "d"]), "prodtree:excluded");
        assert!(plan.is_empty());
    }

    #[test]
    fn still_excluded_module_yields_no_edit() {
        let plan = plan_links(&graph(), &set(&["root", "a", "d"]), "prodtree:excluded");
        assert!(plan.is_empty());
    }

    #[test]
    fn manifest_sorted_by_artifact() {
        let excluded = BTreeSet::from([Ga::new("z", "beta"), Ga::new("a", "alpha"), Ga::new("g", "D")]);
        assert_eq!(manifest_text(&excluded), ":D\n:alpha\n:beta\n");
        assert_eq!(manifest_text(&BTreeSet::new()), "");
    }

    #[test]
    fn component_detection() {
        let prefixes = vec!["extensions/".to_owned()];
        assert!(is_component("extensions/foo/runtime", "jar", &prefixes));
        assert!(!is_component("extensions/foo", "pom", &prefixes));
        assert!(!is_component("integration-tests/foo", "jar", &prefixes));
    }

    #[test]
    fn community_artifact_layout() {
        let config = EngineConfig {
            local_repository: PathBuf::from("/repo"),
            community_group: Some("io.upstream".to_owned()),
            community_version: "3.2.0".to_owned(),
            ..EngineConfig::default()
        };
        assert_eq!(
            community_artifact(&config, &Ga::new("org.acme", "foo")),
            PathBuf::from("/repo/io/upstream/foo/3.2.0/foo-3.2.0.jar")
        );
    }

    fn write_jar(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, body) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn unpack_writes_entries() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("foo.jar");
        write_jar(&jar, &[("a/B.class", "cafe"), ("META-INF/MANIFEST.MF", "m")]);
        let dest = dir.path().join("out");
        assert_eq!(unpack(&jar, &dest).unwrap(), 2);
        assert_eq!(std::fs::read_to_string(dest.join("a/B.class")).unwrap(), "cafe");
    }

    #[test]
    fn unpack_rejects_escaping_entry() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("evil.jar");
        write_jar(&jar, &[("../evil.class", "x")]);
        let err = unpack(&jar, &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, EngineError::Archive { .. }));
        assert!(!dir.path().join("evil.class").exists());
    }

    #[test]
    fn preflight_reports_missing_component_artifact() {
        let mut component = module("foo", Vec::new());
        component.rel_dir = "extensions/foo".to_owned();
        component.descriptor = PathBuf::from("/t/extensions/foo/pom.xml");
        let g = ModuleGraph::from_modules("/t", vec![module("root", Vec::new()), component]).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            local_repository: dir.path().to_path_buf(),
            community_version: "3.2.0".to_owned(),
            ..EngineConfig::default()
        };
        let excluded = set(&["foo"]);
        assert!(matches!(
            check_community_artifacts(&g, &excluded, &config),
            Err(EngineError::Io { .. })
        ));

        let jar = community_artifact(&config, &Ga::new("g", "foo"));
        std::fs::create_dir_all(jar.parent().unwrap()).unwrap();
        write_jar(&jar, &[("X.class", "x")]);
        check_community_artifacts(&g, &excluded, &config).unwrap();
    }

    #[test]
    fn missing_community_artifact_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = unpack(&dir.path().join("absent.jar"), dir.path()).unwrap_err();
        assert!(matches!(err, EngineError::Io { .. }));
    }
}
