//! 전이 의존성 수집 -- 너비 우선, 가까운 선언 우선
//!
//! 같은 `(Ga, type, classifier)`가 여러 경로에서 나타나면 루트에 가장 가까운
//! 첫 선언만 트리에 남습니다. 관리 항목은 전이 의존성의 버전을 덮어쓰고
//! 자기 exclusion을 하위 경로에 더합니다.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::trace;

use prodtree_core::{Ga, Gav, Gavtcs};

use super::{CollectRequest, DependencyNode, DependencySpec, ManagedConstraint};
use crate::error::EngineError;

/// 아티팩트의 직접 의존성을 알려주는 원천
pub(crate) trait DescriptorSource {
    /// 해석된 버전을 가진 아티팩트의 직접 의존성
    fn dependencies_of(&self, artifact: &Gav) -> Result<Vec<DependencySpec>, EngineError>;
}

type Key = (Ga, String, String);

struct Managed<'a> {
    version: Option<&'a str>,
    exclusions: &'a [Ga],
}

struct Pending {
    parent: usize,
    spec: DependencySpec,
    depth: usize,
    exclusions: Vec<Ga>,
}

/// 요청을 원천에 대해 수집합니다.
pub(crate) fn collect_with<S: DescriptorSource + ?Sized>(
    source: &S,
    request: &CollectRequest,
) -> Result<DependencyNode, EngineError> {
    let managed: HashMap<Key, Managed<'_>> = request
        .managed
        .iter()
        .rev()
        .map(|m: &ManagedConstraint| {
            (
                m.gavtcs.management_key(),
                Managed {
                    version: m.gavtcs.gav.version.as_deref(),
                    exclusions: &m.exclusions,
                },
            )
        })
        .collect();

    let mut arena: Vec<(Gavtcs, Vec<usize>)> = vec![(Gavtcs::new(request.root.clone()), Vec::new())];
    let mut seen: HashSet<Key> = HashSet::new();
    let mut queue: VecDeque<Pending> = request
        .dependencies
        .iter()
        .map(|spec| Pending {
            parent: 0,
            spec: spec.clone(),
            depth: 1,
            exclusions: Vec::new(),
        })
        .collect();

    while let Some(Pending {
        parent,
        spec,
        depth,
        exclusions,
    }) = queue.pop_front()
    {
        let mut artifact = spec.artifact;
        if depth > 1 {
            if spec.optional || matches!(artifact.scope.as_str(), "test" | "provided" | "system") {
                continue;
            }
            if exclusions.iter().any(|ex| excludes(ex, artifact.ga())) {
                trace!(artifact = %artifact, "excluded");
                continue;
            }
        }

        let key = artifact.management_key();
        if !seen.insert(key.clone()) {
            continue;
        }

        let mut child_exclusions = exclusions;
        child_exclusions.extend(spec.exclusions);
        if let Some(m) = managed.get(&key) {
            if depth > 1 || artifact.gav.version.is_none() {
                if let Some(v) = m.version {
                    artifact.gav.version = Some(v.to_owned());
                }
            }
            child_exclusions.extend(m.exclusions.iter().cloned());
        }
        check_version(&artifact)?;

        let dependencies = if artifact.is_bom_import() {
            Vec::new()
        } else {
            source.dependencies_of(&artifact.gav)?
        };

        let index = arena.len();
        arena.push((artifact, Vec::new()));
        arena[parent].1.push(index);
        for dep in dependencies {
            queue.push_back(Pending {
                parent: index,
                spec: dep,
                depth: depth + 1,
                exclusions: child_exclusions.clone(),
            });
        }
    }

    Ok(build(&arena, 0))
}

fn build(arena: &[(Gavtcs, Vec<usize>)], index: usize) -> DependencyNode {
    let (artifact, children) = &arena[index];
    DependencyNode {
        artifact: artifact.clone(),
        children: children.iter().map(|&c| build(arena, c)).collect(),
    }
}

/// exclusion이 아티팩트를 가리는지 여부 (`*` 세그먼트는 모두 매칭)
pub(crate) fn excludes(exclusion: &Ga, ga: &Ga) -> bool {
    let seg = |pattern: &str, value: &str| pattern == "*" || pattern == value;
    seg(&exclusion.group_id, &ga.group_id) && seg(&exclusion.artifact_id, &ga.artifact_id)
}

fn check_version(artifact: &Gavtcs) -> Result<(), EngineError> {
    match artifact.gav.version.as_deref() {
        None => Err(EngineError::IllegalVersion {
            artifact: artifact.to_string(),
            version: String::new(),
        }),
        Some(v) if v.trim().is_empty() || v.contains("${") || v.starts_with(['[', '(']) => {
            Err(EngineError::IllegalVersion {
                artifact: artifact.ga().to_string(),
                version: v.to_owned(),
            })
        }
        Some(_) => Ok(()),
    }
}
