//! BOM 평탄화 -- 원시 관리 항목에서 전체/축소 BOM 생성
//!
//! 1. BOM 모듈의 유효 관리 항목을 모으고 제외된 출처의 항목을 버립니다.
//! 2. 진입점 항목마다 의존성 없는 인공 루트 아래에서 전이 의존성을 해석합니다.
//! 3. 어느 진입점이든 요구하는 항목만 축소 BOM에 남깁니다.
//!
//! 해석 실패는 치명적이며, 호출자는 결과 전체를 렌더링한 뒤에만 파일을 씁니다.

pub mod drift;
pub mod render;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info};

use prodtree_core::{Ga, Gav, GavSet};

use crate::error::EngineError;
use crate::resolver::{ArtifactResolver, CollectRequest, DependencySpec, ManagedConstraint};

pub use drift::{Drift, DriftEntry};
pub use render::render_bom;

/// 평탄화 해석에 쓰는 인공 루트
pub const FLATTEN_ROOT: (&str, &str, &str) = ("prodtree.internal", "flatten-root", "0");

/// 평탄화 결과
#[derive(Debug, Clone, Serialize)]
pub struct FlattenResult {
    /// 전체 BOM 문서
    #[serde(skip)]
    pub full: String,
    /// 진입점 주석이 붙은 축소 BOM 문서
    #[serde(skip)]
    pub reduced_verbose: String,
    /// 축소 BOM 문서
    #[serde(skip)]
    pub reduced: String,
    /// 전체 항목 (정렬됨)
    pub constraints: Vec<ManagedConstraint>,
    /// 축소 항목 (정렬됨)
    pub reduced_constraints: Vec<ManagedConstraint>,
    /// 진입점별 전이 의존성 (진입점 자신 포함)
    pub transitives_by_entry_point: BTreeMap<Ga, BTreeSet<Ga>>,
    /// 진입점별 전이 의존성의 해석 버전
    #[serde(skip)]
    pub resolved_by_entry_point: BTreeMap<Ga, BTreeSet<Gav>>,
    /// 항목별 그 항목을 요구하는 진입점
    pub required_by: BTreeMap<Ga, BTreeSet<Ga>>,
}

impl FlattenResult {
    /// 모든 진입점이 요구하는 아티팩트의 합집합
    pub fn all_required(&self) -> BTreeSet<Ga> {
        self.transitives_by_entry_point
            .values()
            .flat_map(|s| s.iter().cloned())
            .collect()
    }
}

/// BOM의 원시 관리 항목을 모읍니다. 제외된 출처의 항목은 버립니다.
pub fn raw_constraints(
    resolver: &dyn ArtifactResolver,
    bom: &Gav,
    origin_excludes: &GavSet,
) -> Result<Vec<ManagedConstraint>, EngineError> {
    let all = resolver.managed_dependencies(bom)?;
    let total = all.len();
    let kept: Vec<ManagedConstraint> = all
        .into_iter()
        .filter(|c| {
            !origin_excludes.contains(
                &c.origin.ga.group_id,
                &c.origin.ga.artifact_id,
                c.origin.version.as_deref(),
            )
        })
        .collect();
    debug!(bom = %bom, total, kept = kept.len(), "raw constraints collected");
    Ok(kept)
}

/// 원시 관리 항목을 평탄화합니다.
///
/// # Errors
///
/// 진입점 하나라도 해석에 실패하면 에러입니다.
pub fn flatten(
    resolver: &dyn ArtifactResolver,
    bom: &Gav,
    raw: Vec<ManagedConstraint>,
    entry_points: &GavSet,
) -> Result<FlattenResult, EngineError> {
    let mut constraints = raw;
    constraints.sort_by(|a, b| render::sort_key(a).cmp(&render::sort_key(b)));

    let root = Gav::new(FLATTEN_ROOT.0, FLATTEN_ROOT.1, Some(FLATTEN_ROOT.2.to_owned()));
    let mut transitives_by_entry_point: BTreeMap<Ga, BTreeSet<Ga>> = BTreeMap::new();
    let mut resolved_by_entry_point: BTreeMap<Ga, BTreeSet<Gav>> = BTreeMap::new();
    for constraint in constraints
        .iter()
        .filter(|c| !c.gavtcs.is_bom_import() && entry_points.contains_ga(c.ga()))
    {
        let mut artifact = constraint.gavtcs.clone();
        artifact.scope = String::new();
        let request = CollectRequest {
            root: root.clone(),
            dependencies: vec![DependencySpec {
                artifact,
                exclusions: constraint.exclusions.clone(),
                optional: false,
            }],
            managed: constraints.clone(),
        };
        let tree = resolver.collect(&request)?;
        let resolved = tree.transitive_artifacts();
        debug!(entry_point = %constraint.ga(), transitives = resolved.len(), "entry point resolved");
        transitives_by_entry_point
            .entry(constraint.ga().clone())
            .or_default()
            .extend(resolved.keys().cloned());
        resolved_by_entry_point
            .entry(constraint.ga().clone())
            .or_default()
            .extend(resolved.into_values());
    }

    let mut required_by: BTreeMap<Ga, BTreeSet<Ga>> = BTreeMap::new();
    for (entry_point, transitives) in &transitives_by_entry_point {
        for ga in transitives {
            required_by
                .entry(ga.clone())
                .or_default()
                .insert(entry_point.clone());
        }
    }
    let reduced_constraints: Vec<ManagedConstraint> = constraints
        .iter()
        .filter(|c| required_by.contains_key(c.ga()))
        .cloned()
        .collect();

    info!(
        bom = %bom,
        constraints = constraints.len(),
        entry_points = transitives_by_entry_point.len(),
        reduced = reduced_constraints.len(),
        "BOM flattened"
    );

    Ok(FlattenResult {
        full: render_bom(bom, &constraints, None),
        reduced_verbose: render_bom(bom, &reduced_constraints, Some(&required_by)),
        reduced: render_bom(bom, &reduced_constraints, None),
        constraints,
        reduced_constraints,
        transitives_by_entry_point,
        resolved_by_entry_point,
        required_by,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::StaticResolver;
    use prodtree_core::Gavtcs;

    fn gav(s: &str) -> Gav {
        Gav::parse(s).unwrap()
    }

    fn constraint(s: &str, origin: &str) -> ManagedConstraint {
        ManagedConstraint::new(Gavtcs::new(gav(s)), gav(origin))
    }

    fn resolver() -> StaticResolver {
        let dep = |s: &str| DependencySpec::new(Gavtcs::new(gav(s)));
        StaticResolver::new()
            .with_artifact(gav("org.acme:x:1"), vec![dep("org.lib:l:1")])
            .with_artifact(gav("org.acme:y:1"), Vec::new())
            .with_artifact(gav("org.lib:l:2"), Vec::new())
            .with_bom(
                gav("org.acme:acme-bom:1"),
                vec![
                    constraint("org.acme:x:1", "org.acme:acme-bom:1"),
                    constraint("org.acme:y:1", "org.acme:acme-bom:1"),
                    constraint("org.lib:l:2", "org.lib:lib-bom:2"),
                    constraint("org.lib:unused:2", "org.lib:lib-bom:2"),
                    constraint("org.noise:n:1", "org.noise:noise-bom:1"),
                ],
            )
    }

    #[test]
    fn reduced_bom_keeps_required_constraints() {
        let r = resolver();
        let bom = gav("org.acme:acme-bom:1");
        let raw = raw_constraints(&r, &bom, &GavSet::parse(&["org.noise:*"], &[]).unwrap()).unwrap();
        assert_eq!(raw.len(), 4);

        let entry_points = GavSet::parse(&["org.acme:x"], &[]).unwrap();
        let result = flatten(&r, &bom, raw, &entry_points).unwrap();

        let reduced: Vec<_> = result
            .reduced_constraints
            .iter()
            .map(|c| c.ga().artifact_id.as_str())
            .collect();
        assert_eq!(reduced, vec!["x", "l"]);
        assert_eq!(result.constraints.len(), 4);
        assert!(result.reduced.contains("<artifactId>l</artifactId>\n        <version>2</version>"));
        assert!(!result.reduced.contains("unused"));
        assert!(result.full.contains("unused"));
        assert!(result.reduced_verbose.contains("<!-- required by: org.acme:x -->"));
        assert_eq!(
            result.all_required(),
            BTreeSet::from([Ga::new("org.acme", "x"), Ga::new("org.lib", "l")])
        );
        // 관리 버전이 적용된 해석 결과
        assert!(result.resolved_by_entry_point[&Ga::new("org.acme", "x")].contains(&gav("org.lib:l:2")));
    }

    #[test]
    fn failing_entry_point_aborts() {
        let r = resolver();
        let bom = gav("org.acme:acme-bom:1");
        let raw = vec![constraint("org.acme:broken:1", "org.acme:acme-bom:1")];
        let entry_points = GavSet::parse(&["org.acme:*"], &[]).unwrap();
        assert!(flatten(&r, &bom, raw, &entry_points).is_err());
    }
}
