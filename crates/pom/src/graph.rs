//! 모듈 그래프 -- 루트 디스크립터에서 시작한 전체 트리
//!
//! [`ModuleGraph::parse`]는 활성 링크와 억제된 링크를 모두 따라가며 트리의 모든
//! 디스크립터를 한 번씩 읽습니다. 억제된 링크가 가리키는 디스크립터가 없으면
//! 해당 링크는 자식 없이 기록됩니다.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use prodtree_core::Ga;

use crate::error::PomError;
use crate::expr::ExpressionEvaluator;
use crate::model::{Module, ModuleLink};
use crate::parse::parse_module;
use crate::profile::ProfileFilter;

/// 집계 모듈에서 자식 모듈로의 링크
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkEdge {
    /// 링크를 선언한 집계 모듈
    pub aggregator: Ga,
    /// 링크가 선언된 프로파일 id
    pub profile: String,
    /// 링크 상태
    pub link: ModuleLink,
    /// 링크 대상 모듈 (디스크립터가 없으면 `None`)
    pub child: Option<Ga>,
}

/// 전체 디스크립터 트리
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    root_dir: PathBuf,
    root: Ga,
    modules: BTreeMap<Ga, Module>,
    by_descriptor: IndexMap<PathBuf, Ga>,
    links: Vec<LinkEdge>,
}

impl ModuleGraph {
    /// 루트 디스크립터에서 트리 전체를 파싱합니다.
    pub fn parse(root_descriptor: impl AsRef<Path>) -> Result<Self, PomError> {
        let root_descriptor = normalize(root_descriptor.as_ref());
        let root_dir = root_descriptor
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut modules = Vec::new();
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([root_descriptor]);

        while let Some(descriptor) = queue.pop_front() {
            if !seen.insert(descriptor.clone()) {
                continue;
            }
            let text = read_descriptor(&descriptor)?;
            let module = parse_module(&descriptor, &text, &root_dir)?;

            for (_, link) in module.module_links() {
                let child = normalize(&link.descriptor_in(module.dir()));
                if child.is_file() {
                    queue.push_back(child);
                } else if link.is_active() {
                    return Err(PomError::MissingModule {
                        aggregator: descriptor.display().to_string(),
                        link: link.path().to_owned(),
                        path: child.display().to_string(),
                    });
                } else {
                    debug!(
                        aggregator = %descriptor.display(),
                        link = link.path(),
                        "suppressed link without descriptor"
                    );
                }
            }
            modules.push(module);
        }

        let graph = Self::from_modules(root_dir, modules)?;
        info!(
            root = %graph.root,
            modules = graph.modules.len(),
            "module graph parsed"
        );
        Ok(graph)
    }

    /// 이미 파싱된 모듈 목록으로 그래프를 조립합니다. 첫 모듈이 루트입니다.
    pub fn from_modules(root_dir: impl Into<PathBuf>, modules: Vec<Module>) -> Result<Self, PomError> {
        let root_dir = root_dir.into();
        let root = modules
            .first()
            .map(|m| m.ga.clone())
            .ok_or_else(|| PomError::MissingElement {
                path: root_dir.display().to_string(),
                element: "project".to_owned(),
            })?;

        let mut by_descriptor = IndexMap::new();
        let mut map: BTreeMap<Ga, Module> = BTreeMap::new();
        for module in modules {
            if let Some(existing) = map.get(&module.ga) {
                return Err(PomError::DuplicateModule {
                    ga: module.ga.to_string(),
                    first: existing.descriptor.display().to_string(),
                    second: module.descriptor.display().to_string(),
                });
            }
            by_descriptor.insert(normalize(&module.descriptor), module.ga.clone());
            map.insert(module.ga.clone(), module);
        }

        let mut links = Vec::new();
        for module in map.values() {
            for (profile, link) in module.module_links() {
                let target = normalize(&link.descriptor_in(module.dir()));
                let child = by_descriptor.get(&target).cloned();
                if child.is_none() && link.is_active() {
                    return Err(PomError::MissingModule {
                        aggregator: module.descriptor.display().to_string(),
                        link: link.path().to_owned(),
                        path: target.display().to_string(),
                    });
                }
                links.push(LinkEdge {
                    aggregator: module.ga.clone(),
                    profile: profile.id.clone(),
                    link: link.clone(),
                    child,
                });
            }
        }

        Ok(Self {
            root_dir,
            root,
            modules: map,
            by_descriptor,
            links,
        })
    }

    /// 트리 루트 디렉토리
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// 루트 모듈
    pub fn root(&self) -> Option<&Module> {
        self.modules.get(&self.root)
    }

    /// 식별자별 모듈
    pub fn modules_by_identity(&self) -> &BTreeMap<Ga, Module> {
        &self.modules
    }

    /// 모든 모듈 식별자
    pub fn module_identities(&self) -> BTreeSet<Ga> {
        self.modules.keys().cloned().collect()
    }

    /// 모듈 수
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// 식별자로 모듈을 찾습니다.
    pub fn module(&self, ga: &Ga) -> Option<&Module> {
        self.modules.get(ga)
    }

    /// 디스크립터 경로로 모듈을 찾습니다.
    pub fn module_at(&self, descriptor: &Path) -> Option<&Module> {
        self.by_descriptor
            .get(&normalize(descriptor))
            .and_then(|ga| self.modules.get(ga))
    }

    /// 발견 순서대로 정렬된 디스크립터 경로
    pub fn descriptors(&self) -> impl Iterator<Item = &Path> {
        self.by_descriptor.keys().map(PathBuf::as_path)
    }

    /// 모든 모듈 링크
    pub fn links(&self) -> &[LinkEdge] {
        &self.links
    }

    /// 모듈을 링크하는 집계 모듈들
    pub fn aggregators_of<'a>(&'a self, ga: &'a Ga) -> impl Iterator<Item = &'a Ga> + 'a {
        self.links
            .iter()
            .filter(move |edge| edge.child.as_ref() == Some(ga))
            .map(|edge| &edge.aggregator)
    }

    /// 트리 안에 있는 `<parent>` 모듈
    pub fn parent_of(&self, ga: &Ga) -> Option<&Module> {
        let parent = self.modules.get(ga)?.parent.as_ref()?;
        self.modules.get(&parent.gav.ga)
    }

    /// 주어진 마커로 억제된 링크를 모두 활성화한 그래프를 반환합니다.
    pub fn relinked(&self, marker: &str) -> Self {
        let mut graph = self.clone();
        for module in graph.modules.values_mut() {
            for profile in &mut module.profiles {
                for link in &mut profile.module_links {
                    activate(link, marker);
                }
            }
        }
        for edge in &mut graph.links {
            activate(&mut edge.link, marker);
        }
        graph
    }

    /// 프로파일 필터 기준으로 모듈별 표현식 평가기를 만듭니다.
    pub fn expression_evaluator(&self, filter: &ProfileFilter) -> Result<ExpressionEvaluator, PomError> {
        ExpressionEvaluator::build(self, filter)
    }
}

fn activate(link: &mut ModuleLink, marker: &str) {
    if link.is_suppressed_with(marker) {
        *link = ModuleLink::Active {
            path: link.path().to_owned(),
        };
    }
}

fn read_descriptor(path: &Path) -> Result<String, PomError> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::InvalidData {
            PomError::Encoding {
                path: path.display().to_string(),
                encoding: "non UTF-8".to_owned(),
            }
        } else {
            PomError::io(path, e)
        }
    })
}

/// `.`과 `..`를 어휘적으로 정리합니다.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Activation, Profile};
    use prodtree_core::Gav;

    fn module(dir: &str, artifact: &str, links: Vec<ModuleLink>, parent: Option<&str>) -> Module {
        Module {
            ga: Ga::new("org.acme", artifact),
            version: "1.0".to_owned(),
            declares_version: parent.is_none(),
            descriptor: PathBuf::from(format!("/t/{dir}pom.xml")),
            rel_dir: dir.trim_end_matches('/').to_owned(),
            packaging: if links.is_empty() { "jar" } else { "pom" }.to_owned(),
            parent: parent.map(|p| crate::model::ParentRef {
                gav: Gav::new("org.acme", p, Some("1.0".to_owned())),
                relative_path: None,
            }),
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

    fn sample() -> ModuleGraph {
        ModuleGraph::from_modules(
            "/t",
            vec![
                module(
                    "",
                    "root",
                    vec![
                        ModuleLink::Active { path: "a".to_owned() },
                        ModuleLink::Suppressed {
                            path: "b".to_owned(),
                            reason: "prodtree:excluded".to_owned(),
                        },
                        ModuleLink::Suppressed {
                            path: "gone".to_owned(),
                            reason: "prodtree:excluded".to_owned(),
                        },
                    ],
                    None,
                ),
                module("a/", "a", Vec::new(), Some("root")),
                module("b/", "b", Vec::new(), Some("root")),
            ],
        )
        .unwrap()
    }

    #[test]
    fn identities_and_lookup() {
        let g = sample();
        assert_eq!(g.len(), 3);
        assert_eq!(g.root().unwrap().ga.artifact_id, "root");
        assert!(g.module_at(Path::new("/t/a/./pom.xml")).is_some());
        assert_eq!(g.parent_of(&Ga::new("org.acme", "a")).unwrap().ga.artifact_id, "root");
    }

    #[test]
    fn links_record_children() {
        let g = sample();
        assert_eq!(g.links().len(), 3);
        let b = Ga::new("org.acme", "b");
        let aggs: Vec<_> = g.aggregators_of(&b).collect();
        assert_eq!(aggs, vec![&Ga::new("org.acme", "root")]);
        assert!(g.links()[2].child.is_none());
    }

    #[test]
    fn relinked_activates_marked_links_only() {
        let g = sample().relinked("prodtree:excluded");
        assert!(g.links().iter().all(|e| e.link.is_active()));

        let g = sample().relinked("other-marker");
        assert!(!g.links()[1].link.is_active());
    }

    #[test]
    fn duplicate_identity_is_rejected() {
        let err = ModuleGraph::from_modules(
            "/t",
            vec![
                module("", "root", Vec::new(), None),
                module("x/", "root", Vec::new(), None),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, PomError::DuplicateModule { .. }));
    }

    #[test]
    fn active_link_without_module_is_rejected() {
        let err = ModuleGraph::from_modules(
            "/t",
            vec![module(
                "",
                "root",
                vec![ModuleLink::Active { path: "nope".to_owned() }],
                None,
            )],
        )
        .unwrap_err();
        assert!(matches!(err, PomError::MissingModule { .. }));
    }

    #[test]
    fn normalize_resolves_dots() {
        assert_eq!(normalize(Path::new("/a/b/../c/./pom.xml")), PathBuf::from("/a/c/pom.xml"));
    }
}
