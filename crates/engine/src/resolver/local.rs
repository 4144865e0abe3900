//! 로컬 저장소 해석기 -- 작업 트리 모듈과 `~/.m2/repository` 레이아웃
//!
//! 유효 POM은 부모 체인을 따라 만들어지고 좌표별로 한 번만 계산됩니다.
//!
//! - 프로퍼티: 부모 프로퍼티, 자체 프로퍼티, `project.*` 순으로 덮어씁니다.
//! - 관리 항목: 자체 선언, import BOM, 부모 순으로 처음 선언이 이깁니다.
//! - 의존성: 버전이 없으면 관리 항목에서 채우고 부모 의존성을 상속합니다.
//!
//! 부모 또는 import 체인의 순환은 [`EngineError::Cycle`]입니다.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use prodtree_core::{Ga, Gav, Gavtcs};
use prodtree_pom::expr::interpolate;
use prodtree_pom::parse::parse_module;
use prodtree_pom::{Dependency, ModuleGraph};

use super::collect::{DescriptorSource, collect_with};
use super::{ArtifactResolver, CollectRequest, DependencyNode, DependencySpec, ManagedConstraint};
use crate::error::EngineError;

/// 유효 POM
#[derive(Debug, Clone)]
struct EffectivePom {
    properties: HashMap<String, String>,
    managed: Vec<ManagedConstraint>,
    dependencies: Vec<DependencySpec>,
}

/// 로컬 Maven 저장소 해석기
pub struct LocalRepositoryResolver {
    repository: PathBuf,
    workspace: HashMap<Ga, PathBuf>,
    memo: RefCell<HashMap<Gav, Arc<EffectivePom>>>,
}

impl LocalRepositoryResolver {
    /// 저장소 루트로 해석기를 만듭니다.
    pub fn new(repository: impl Into<PathBuf>) -> Self {
        Self {
            repository: repository.into(),
            workspace: HashMap::new(),
            memo: RefCell::new(HashMap::new()),
        }
    }

    /// 작업 트리 모듈을 저장소보다 먼저 찾도록 등록합니다.
    pub fn with_workspace(mut self, graph: &ModuleGraph) -> Self {
        for (ga, module) in graph.modules_by_identity() {
            self.workspace.insert(ga.clone(), module.descriptor.clone());
        }
        self
    }

    /// 저장소 레이아웃 상의 POM 경로
    pub fn pom_path(&self, gav: &Gav) -> PathBuf {
        let version = gav.version_or_empty();
        let mut path = self.repository.clone();
        for segment in gav.ga.group_id.split('.') {
            path.push(segment);
        }
        path.join(&gav.ga.artifact_id)
            .join(version)
            .join(format!("{}-{version}.pom", gav.ga.artifact_id))
    }

    fn locate(&self, gav: &Gav) -> Result<PathBuf, EngineError> {
        if let Some(descriptor) = self.workspace.get(&gav.ga) {
            return Ok(descriptor.clone());
        }
        let path = self.pom_path(gav);
        if path.is_file() {
            Ok(path)
        } else {
            Err(EngineError::ArtifactNotFound {
                artifact: gav.to_string(),
                reason: format!("no descriptor at {}", path.display()),
            })
        }
    }

    fn effective(&self, gav: &Gav) -> Result<Arc<EffectivePom>, EngineError> {
        self.effective_in(gav, &mut Vec::new())
    }

    fn effective_in(&self, gav: &Gav, stack: &mut Vec<Gav>) -> Result<Arc<EffectivePom>, EngineError> {
        if let Some(existing) = self.memo.borrow().get(gav) {
            return Ok(existing.clone());
        }
        if stack.contains(gav) {
            let mut path: Vec<String> = stack.iter().map(Gav::to_string).collect();
            path.push(gav.to_string());
            return Err(EngineError::Cycle {
                path: path.join(" -> "),
            });
        }

        let descriptor = self.locate(gav)?;
        let text = std::fs::read_to_string(&descriptor).map_err(|e| EngineError::io(&descriptor, e))?;
        let module = parse_module(&descriptor, &text, descriptor.parent().unwrap_or(Path::new(".")))?;
        trace!(artifact = %gav, path = %descriptor.display(), "building effective descriptor");

        stack.push(gav.clone());
        let parent = match &module.parent {
            Some(parent) => Some(self.effective_in(&parent.gav, stack)?),
            None => None,
        };

        let mut properties = parent
            .as_ref()
            .map(|p| p.properties.clone())
            .unwrap_or_default();
        let own_profiles: Vec<_> = module
            .profiles
            .iter()
            .filter(|p| p.is_default() || p.activation.active_by_default)
            .collect();
        for profile in &own_profiles {
            properties.extend(profile.properties.clone());
        }
        properties.insert("project.groupId".to_owned(), gav.ga.group_id.clone());
        properties.insert("project.artifactId".to_owned(), gav.ga.artifact_id.clone());
        properties.insert("project.version".to_owned(), gav.version_or_empty().to_owned());
        if let Some(p) = &module.parent {
            properties.insert("project.parent.groupId".to_owned(), p.gav.ga.group_id.clone());
            properties.insert("project.parent.artifactId".to_owned(), p.gav.ga.artifact_id.clone());
            properties.insert("project.parent.version".to_owned(), p.gav.version_or_empty().to_owned());
        }
        let scope = Scope {
            owner: gav,
            properties: &properties,
        };

        let mut managed: IndexMap<(Ga, String, String), ManagedConstraint> = IndexMap::new();
        let mut imports = Vec::new();
        for dep in own_profiles.iter().flat_map(|p| p.managed_dependencies.iter()) {
            let artifact = scope.artifact(dep)?;
            if artifact.is_bom_import() {
                imports.push(artifact.gav);
                continue;
            }
            managed
                .entry(artifact.management_key())
                .or_insert_with(|| ManagedConstraint {
                    gavtcs: artifact,
                    exclusions: dep.exclusions.clone(),
                    origin: gav.clone(),
                });
        }
        for import in imports {
            let imported = self.effective_in(&import, stack)?;
            for constraint in &imported.managed {
                managed
                    .entry(constraint.gavtcs.management_key())
                    .or_insert_with(|| constraint.clone());
            }
        }
        if let Some(parent) = &parent {
            for constraint in &parent.managed {
                managed
                    .entry(constraint.gavtcs.management_key())
                    .or_insert_with(|| constraint.clone());
            }
        }
        stack.pop();

        let mut dependencies: IndexMap<(Ga, String, String), DependencySpec> = IndexMap::new();
        for dep in own_profiles.iter().flat_map(|p| p.dependencies.iter()) {
            let mut artifact = scope.artifact(dep)?;
            let key = artifact.management_key();
            if artifact.gav.version.is_none() {
                artifact.gav.version = managed
                    .get(&key)
                    .and_then(|m| m.gavtcs.gav.version.clone());
            }
            if artifact.scope.is_empty() {
                if let Some(m) = managed.get(&key) {
                    artifact.scope = m.gavtcs.scope.clone();
                }
            }
            dependencies.entry(key).or_insert(DependencySpec {
                artifact,
                exclusions: dep.exclusions.clone(),
                optional: dep.optional,
            });
        }
        if let Some(parent) = &parent {
            for dep in &parent.dependencies {
                dependencies
                    .entry(dep.artifact.management_key())
                    .or_insert_with(|| dep.clone());
            }
        }

        let effective = Arc::new(EffectivePom {
            properties,
            managed: managed.into_values().collect(),
            dependencies: dependencies.into_values().collect(),
        });
        debug!(
            artifact = %gav,
            managed = effective.managed.len(),
            dependencies = effective.dependencies.len(),
            "effective descriptor built"
        );
        self.memo.borrow_mut().insert(gav.clone(), effective.clone());
        Ok(effective)
    }
}

/// 한 POM의 프로퍼티 범위에서 의존성 좌표를 펼칩니다.
struct Scope<'a> {
    owner: &'a Gav,
    properties: &'a HashMap<String, String>,
}

impl Scope<'_> {
    fn value(&self, raw: &str) -> Result<String, EngineError> {
        interpolate(raw, |k| self.properties.get(k).map(String::as_str)).map_err(|reason| {
            EngineError::ArtifactNotFound {
                artifact: self.owner.to_string(),
                reason: format!("cannot evaluate '{raw}': {reason}"),
            }
        })
    }

    fn artifact(&self, dep: &Dependency) -> Result<Gavtcs, EngineError> {
        let group = self.value(&dep.group_id)?;
        let artifact = self.value(&dep.artifact_id)?;
        let version = match dep.raw_version() {
            Some(raw) => Some(
                interpolate(raw, |k| self.properties.get(k).map(String::as_str)).map_err(|_| {
                    EngineError::IllegalVersion {
                        artifact: format!("{group}:{artifact}"),
                        version: raw.to_owned(),
                    }
                })?,
            ),
            None => None,
        };
        let mut gavtcs = Gavtcs::new(Gav::new(group, artifact, version));
        if let Some(t) = &dep.artifact_type {
            gavtcs = gavtcs.with_type(self.value(t)?);
        }
        if let Some(c) = &dep.classifier {
            gavtcs = gavtcs.with_classifier(self.value(c)?);
        }
        if let Some(s) = &dep.scope {
            gavtcs = gavtcs.with_scope(self.value(s)?);
        }
        Ok(gavtcs)
    }
}

impl DescriptorSource for LocalRepositoryResolver {
    fn dependencies_of(&self, artifact: &Gav) -> Result<Vec<DependencySpec>, EngineError> {
        Ok(self.effective(artifact)?.dependencies.clone())
    }
}

impl ArtifactResolver for LocalRepositoryResolver {
    fn managed_dependencies(&self, bom: &Gav) -> Result<Vec<ManagedConstraint>, EngineError> {
        Ok(self.effective(bom)?.managed.clone())
    }

    fn collect(&self, request: &CollectRequest) -> Result<DependencyNode, EngineError> {
        collect_with(self, request)
    }
}
