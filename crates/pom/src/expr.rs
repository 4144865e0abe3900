//! 프로퍼티 표현식 평가 -- 모듈별로 미리 계산된 `이름 -> 리터럴` 조회표
//!
//! [`ExpressionEvaluator`]는 호출마다 한 번 만들어지며, 각 모듈의 유효 프로퍼티
//! 범위(조상 프로퍼티, 자체 프로퍼티, 수락된 프로파일 프로퍼티, `project.*`,
//! 활성화 프로퍼티)를 미리 펼쳐 둡니다. 평가 중에는 모듈 그래프를 다시 걷지 않습니다.

use std::collections::{BTreeMap, HashMap, HashSet};

use prodtree_core::Ga;

use crate::error::PomError;
use crate::graph::ModuleGraph;
use crate::model::Module;
use crate::profile::ProfileFilter;

/// 중첩 치환 최대 깊이
const MAX_DEPTH: usize = 8;

/// `${name}` 치환을 반복 적용합니다.
///
/// 정의되지 않은 프로퍼티, 닫히지 않은 참조, 깊이 초과는 사유 문자열로 돌려줍니다.
pub fn interpolate<'a, F>(raw: &str, lookup: F) -> Result<String, String>
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut current = raw.trim().to_owned();
    let mut depth = 0;
    while current.contains("${") {
        depth += 1;
        if depth > MAX_DEPTH {
            return Err(format!("nesting deeper than {MAX_DEPTH} levels"));
        }

        let mut result = String::with_capacity(current.len());
        let mut rest = current.as_str();
        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let suffix = &rest[start + 2..];
            let end = suffix
                .find('}')
                .ok_or_else(|| "unterminated property reference".to_owned())?;
            let key = &suffix[..end];
            let value = lookup(key).ok_or_else(|| format!("property '{key}' is not defined"))?;
            result.push_str(value);
            rest = &suffix[end + 1..];
        }
        result.push_str(rest);
        current = result;
    }
    Ok(current)
}

/// 모듈 하나의 유효 프로퍼티 범위
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyScope {
    values: BTreeMap<String, String>,
}

impl PropertyScope {
    /// 프로퍼티 값 (미해석 원문)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// 정의된 프로퍼티 수
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }
}

/// 모듈별 표현식 평가기
#[derive(Debug, Clone, Default)]
pub struct ExpressionEvaluator {
    scopes: HashMap<Ga, PropertyScope>,
    descriptors: HashMap<Ga, String>,
}

impl ExpressionEvaluator {
    /// 그래프의 모든 모듈에 대해 프로퍼티 범위를 계산합니다.
    pub fn build(graph: &ModuleGraph, filter: &ProfileFilter) -> Result<Self, PomError> {
        let mut evaluator = Self::default();
        for ga in graph.modules_by_identity().keys() {
            evaluator.scope_for(graph, filter, ga, &mut HashSet::new())?;
        }
        Ok(evaluator)
    }

    fn scope_for(
        &mut self,
        graph: &ModuleGraph,
        filter: &ProfileFilter,
        ga: &Ga,
        stack: &mut HashSet<Ga>,
    ) -> Result<PropertyScope, PomError> {
        if let Some(scope) = self.scopes.get(ga) {
            return Ok(scope.clone());
        }
        let Some(module) = graph.module(ga) else {
            return Ok(PropertyScope::default());
        };
        if !stack.insert(ga.clone()) {
            return Err(PomError::Parse {
                path: module.descriptor.display().to_string(),
                reason: format!("parent cycle through {ga}"),
            });
        }

        let mut scope = match graph.parent_of(ga) {
            Some(parent) => {
                let parent_ga = parent.ga.clone();
                self.scope_for(graph, filter, &parent_ga, stack)?
            }
            None => PropertyScope::default(),
        };
        stack.remove(ga);

        for profile in &module.profiles {
            if filter.accepts(profile, &module.descriptor)? {
                for (k, v) in &profile.properties {
                    scope.insert(k, v);
                }
            }
        }
        insert_project_properties(&mut scope, module);
        for (k, v) in filter.properties() {
            scope.insert(k, v);
        }

        self.descriptors
            .insert(ga.clone(), module.descriptor.display().to_string());
        self.scopes.insert(ga.clone(), scope.clone());
        Ok(scope)
    }

    /// 모듈 범위에서 표현식을 평가합니다.
    ///
    /// # Errors
    ///
    /// 정의되지 않은 프로퍼티나 닫히지 않은 참조는 모듈 디스크립터와 표현식을
    /// 담은 [`PomError::Expression`]입니다.
    pub fn evaluate(&self, module: &Ga, expression: &str) -> Result<String, PomError> {
        let scope = self.scopes.get(module);
        interpolate(expression, |key| scope.and_then(|s| s.get(key))).map_err(|reason| {
            PomError::Expression {
                expression: expression.to_owned(),
                descriptor: self
                    .descriptors
                    .get(module)
                    .cloned()
                    .unwrap_or_else(|| module.to_string()),
                reason,
            }
        })
    }

    /// 선택적 표현식을 평가합니다.
    pub fn evaluate_opt(
        &self,
        module: &Ga,
        expression: Option<&str>,
    ) -> Result<Option<String>, PomError> {
        expression.map(|e| self.evaluate(module, e)).transpose()
    }

    /// 모듈의 프로퍼티 범위
    pub fn scope(&self, module: &Ga) -> Option<&PropertyScope> {
        self.scopes.get(module)
    }
}

fn insert_project_properties(scope: &mut PropertyScope, module: &Module) {
    scope.insert("project.groupId", module.ga.group_id.clone());
    scope.insert("project.artifactId", module.ga.artifact_id.clone());
    scope.insert("project.packaging", module.packaging.clone());
    scope.insert("project.basedir", module.dir().display().to_string());
    if let Some(parent) = &module.parent {
        scope.insert("project.parent.groupId", parent.gav.ga.group_id.clone());
        scope.insert("project.parent.artifactId", parent.gav.ga.artifact_id.clone());
        scope.insert(
            "project.parent.version",
            parent.gav.version.clone().unwrap_or_default(),
        );
    }
    // `${revision}` 같은 버전 표현식은 지금까지 쌓인 범위로 펼친다
    let version = interpolate(&module.version, |k| scope.get(k))
        .unwrap_or_else(|_| module.version.clone());
    scope.insert("project.version", version);
}
