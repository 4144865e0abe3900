//! 클로저 엔진 -- 필수 모듈 집합과 그 여집합
//!
//! [`required_closure`]는 루트에서 출발해 수락된 프로파일의 compile/provided
//! 의존성 간선을 따라가고, 필수 모듈의 `<parent>`와 링크한 집계 모듈도 함께
//! 필수로 유지합니다. 결과는 모듈 식별자 전체의 분할입니다.

use std::collections::BTreeSet;

use tracing::{debug, info};

use prodtree_core::{Ga, GavSet};
use prodtree_pom::{ExpressionEvaluator, ModuleGraph, ProfileFilter};

use crate::error::EngineError;

/// 루트 패턴이 선택한 모듈 식별자를 반환합니다.
///
/// 각 include 패턴은 적어도 하나의 모듈에 매칭되어야 합니다.
pub fn select_roots(graph: &ModuleGraph, roots: &GavSet) -> Result<BTreeSet<Ga>, EngineError> {
    for pattern in &roots.includes {
        if !graph
            .modules_by_identity()
            .keys()
            .any(|ga| pattern.matches_ga(ga))
        {
            return Err(EngineError::NoMatchingRoot {
                pattern: pattern.to_string(),
            });
        }
    }
    Ok(graph
        .modules_by_identity()
        .keys()
        .filter(|ga| roots.contains_ga(ga))
        .cloned()
        .collect())
}

/// 루트를 포함하는 최소 필수 모듈 집합을 계산합니다.
///
/// # Errors
///
/// 따라가는 간선의 표현식이나 프로파일 활성화 조건을 평가할 수 없으면 에러입니다.
pub fn required_closure(
    graph: &ModuleGraph,
    roots: &BTreeSet<Ga>,
    filter: &ProfileFilter,
    evaluator: &ExpressionEvaluator,
) -> Result<BTreeSet<Ga>, EngineError> {
    let mut required: BTreeSet<Ga> = BTreeSet::new();
    let mut stack: Vec<Ga> = roots
        .iter()
        .filter(|ga| graph.module(ga).is_some())
        .cloned()
        .collect();

    while let Some(ga) = stack.pop() {
        if !required.insert(ga.clone()) {
            continue;
        }
        let Some(module) = graph.module(&ga) else {
            continue;
        };

        for profile in &module.profiles {
            if !filter.accepts(profile, &module.descriptor)? {
                continue;
            }
            for dep in profile.dependencies.iter().filter(|d| d.is_build_scope()) {
                let target = Ga::new(
                    evaluator.evaluate(&ga, &dep.group_id)?,
                    evaluator.evaluate(&ga, &dep.artifact_id)?,
                );
                if graph.module(&target).is_some() && !required.contains(&target) {
                    debug!(from = %ga, to = %target, "dependency edge");
                    stack.push(target);
                }
            }
        }

        if let Some(parent) = graph.parent_of(&ga) {
            if !required.contains(&parent.ga) {
                stack.push(parent.ga.clone());
            }
        }
        for aggregator in graph.aggregators_of(&ga) {
            if !required.contains(aggregator) {
                stack.push(aggregator.clone());
            }
        }
    }

    info!(
        roots = roots.len(),
        required = required.len(),
        modules = graph.len(),
        "required closure computed"
    );
    Ok(required)
}

/// 그래프의 모듈 중 필수가 아닌 모듈
pub fn complement(graph: &ModuleGraph, required: &BTreeSet<Ga>) -> BTreeSet<Ga> {
    graph
        .modules_by_identity()
        .keys()
        .filter(|ga| !required.contains(*ga))
        .cloned()
        .collect()
}
