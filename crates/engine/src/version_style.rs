//! 버전 스타일 판정 -- 모듈이 자체/커뮤니티 의존성 버전을 적는 방식
//!
//! 판정 규칙 (처음 맞는 규칙이 이김):
//!
//! 1. 정식 BOM 모듈 → `{ProjectVersion, CommunityVersion}`
//! 2. BOM 모듈을 import하는 모듈 → `{None, None}`
//! 3. 대상 group의 관리 항목: 플레이스홀더면 `{ProjectVersion, CommunityVersion}`,
//!    리터럴이면 `{Literal(자체 버전), Literal(커뮤니티 버전)}`
//! 4. 그렇지 않으면 버전이 명시된 대상 group 의존성으로 같은 판정
//! 5. 그 외 → 판정 없음 (모듈을 건드리지 않음)
//!
//! 판정 섹션 안에서 플레이스홀더와 리터럴이 섞이면 설정 에러입니다.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use prodtree_core::Ga;
use prodtree_pom::{Dependency, ExpressionEvaluator, Module, ModuleGraph, Transformation};

use crate::error::EngineError;

/// 의존성 버전을 적는 방식
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum VersionSpec {
    /// `<version>` 없음
    None,
    /// `${project.version}`
    ProjectVersion,
    /// `${<커뮤니티 버전 프로퍼티>}`
    CommunityVersion,
    /// 리터럴 버전
    Literal(String),
}

impl VersionSpec {
    /// 디스크에 적힐 원문 (`None`이면 요소 없음)
    pub fn render(&self, community_property: &str) -> Option<String> {
        match self {
            Self::None => None,
            Self::ProjectVersion => Some("${project.version}".to_owned()),
            Self::CommunityVersion => Some(format!("${{{community_property}}}")),
            Self::Literal(v) => Some(v.clone()),
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::ProjectVersion => write!(f, "project-version"),
            Self::CommunityVersion => write!(f, "community-version"),
            Self::Literal(v) => write!(f, "literal({v})"),
        }
    }
}

/// 모듈의 버전 스타일
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VersionStyle {
    /// 필수 아티팩트에 쓰는 방식
    pub tracked: VersionSpec,
    /// 배제/커뮤니티 아티팩트에 쓰는 방식
    pub community: VersionSpec,
}

impl VersionStyle {
    fn placeholders() -> Self {
        Self {
            tracked: VersionSpec::ProjectVersion,
            community: VersionSpec::CommunityVersion,
        }
    }

    fn uses_community_property(&self) -> bool {
        self.community == VersionSpec::CommunityVersion
    }
}

impl fmt::Display for VersionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}}}", self.tracked, self.community)
    }
}

/// 판정과 적용에 필요한 버전 정보
#[derive(Debug, Clone)]
pub struct StyleContext {
    /// 제품화 대상 groupId
    pub tracked_group: String,
    /// 커뮤니티 groupId
    pub community_group: Option<String>,
    /// 자체 버전
    pub own_version: String,
    /// 커뮤니티 버전
    pub community_version: String,
    /// 커뮤니티 버전 프로퍼티 이름
    pub community_property: String,
    /// 정식 BOM 모듈
    pub bom_module: Option<Ga>,
}

impl StyleContext {
    fn is_versioned_group(&self, group: &str) -> bool {
        group == self.tracked_group || self.community_group.as_deref() == Some(group)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Placeholder,
    Literal,
}

fn describe(dep: &Dependency, ga: &Ga, raw: &str) -> String {
    let section = if dep.locator.managed { "managed" } else { "dependency" };
    let profile = if dep.locator.profile.is_empty() {
        String::new()
    } else {
        format!(" in profile {}", dep.locator.profile)
    };
    format!("{section} {ga} version '{raw}'{profile}")
}

/// 모듈의 버전 스타일을 판정합니다.
///
/// # Errors
///
/// 판정 섹션에 플레이스홀더와 리터럴이 섞여 있으면 [`EngineError::MixedVersionStyle`]입니다.
pub fn autodetect(
    module: &Module,
    evaluator: &ExpressionEvaluator,
    ctx: &StyleContext,
) -> Result<Option<VersionStyle>, EngineError> {
    if ctx.bom_module.as_ref() == Some(&module.ga) {
        return Ok(Some(VersionStyle::placeholders()));
    }

    let managed: Vec<&Dependency> = module
        .profiles
        .iter()
        .flat_map(|p| p.managed_dependencies.iter())
        .collect();
    if let Some(bom) = &ctx.bom_module {
        for dep in managed.iter().filter(|d| d.is_bom_import()) {
            if &evaluated_ga(module, evaluator, dep)? == bom {
                return Ok(Some(VersionStyle {
                    tracked: VersionSpec::None,
                    community: VersionSpec::None,
                }));
            }
        }
    }

    let declared: Vec<&Dependency> = module
        .profiles
        .iter()
        .flat_map(|p| p.dependencies.iter())
        .collect();
    for section in [managed, declared] {
        if let Some(kind) = section_kind(module, evaluator, ctx, &section)? {
            let style = match kind {
                Kind::Placeholder => VersionStyle::placeholders(),
                Kind::Literal => VersionStyle {
                    tracked: VersionSpec::Literal(ctx.own_version.clone()),
                    community: VersionSpec::Literal(ctx.community_version.clone()),
                },
            };
            return Ok(Some(style));
        }
    }
    Ok(None)
}

fn evaluated_ga(module: &Module, evaluator: &ExpressionEvaluator, dep: &Dependency) -> Result<Ga, EngineError> {
    Ok(Ga::new(
        evaluator.evaluate(&module.ga, &dep.group_id)?,
        evaluator.evaluate(&module.ga, &dep.artifact_id)?,
    ))
}

fn section_kind(
    module: &Module,
    evaluator: &ExpressionEvaluator,
    ctx: &StyleContext,
    section: &[&Dependency],
) -> Result<Option<Kind>, EngineError> {
    let mut first: Option<(Kind, String)> = None;
    for dep in section.iter().filter(|d| !d.is_bom_import()) {
        let Some(raw) = dep.raw_version() else {
            continue;
        };
        let ga = evaluated_ga(module, evaluator, dep)?;
        if ga.group_id != ctx.tracked_group {
            continue;
        }
        let kind = if raw.contains("${") {
            Kind::Placeholder
        } else {
            Kind::Literal
        };
        match &first {
            Some((seen, description)) if *seen != kind => {
                return Err(EngineError::MixedVersionStyle {
                    descriptor: module.descriptor.display().to_string(),
                    first: description.clone(),
                    second: describe(dep, &ga, raw),
                });
            }
            Some(_) => {}
            None => first = Some((kind, describe(dep, &ga, raw))),
        }
    }
    Ok(first.map(|(kind, _)| kind))
}

/// 스타일에 맞게 버전 편집을 계산합니다.
///
/// 커뮤니티 group 아티팩트와 배제된 모듈(`modules - required`)은 커뮤니티 방식을
/// 씁니다. 트리의 모듈이 아닌 대상 group 항목과 BOM import 항목은 건드리지 않습니다.
pub fn apply(
    module: &Module,
    evaluator: &ExpressionEvaluator,
    style: &VersionStyle,
    ctx: &StyleContext,
    modules: &BTreeSet<Ga>,
    required: &BTreeSet<Ga>,
) -> Result<Vec<Transformation>, EngineError> {
    let mut edits = Vec::new();
    for profile in &module.profiles {
        for dep in profile.all_dependencies() {
            if dep.is_bom_import() {
                continue;
            }
            let ga = evaluated_ga(module, evaluator, dep)?;
            if !ctx.is_versioned_group(&ga.group_id) {
                continue;
            }
            let community = ctx.community_group.as_deref() == Some(ga.group_id.as_str());
            let spec = if community {
                &style.community
            } else if !modules.contains(&ga) {
                // 트리에 없는 대상 group 항목은 그대로 둔다
                continue;
            } else if required.contains(&ga) {
                &style.tracked
            } else {
                &style.community
            };
            let expected = spec.render(&ctx.community_property);
            if dep.raw_version() != expected.as_deref() {
                debug!(
                    module = %module.ga,
                    artifact = %ga,
                    from = dep.raw_version().unwrap_or("<none>"),
                    to = expected.as_deref().unwrap_or("<none>"),
                    "version drift"
                );
                edits.push(Transformation::SetDependencyVersion {
                    locator: dep.locator.clone(),
                    version: expected,
                });
            }
        }
    }
    Ok(edits)
}

/// 트리 전체의 버전 스타일 계획
#[derive(Debug, Clone, Default, Serialize)]
pub struct VersionPlan {
    /// 디스크립터별 판정된 스타일
    pub styles: BTreeMap<PathBuf, VersionStyle>,
    /// 디스크립터별 편집
    pub edits: BTreeMap<PathBuf, Vec<Transformation>>,
}

impl VersionPlan {
    /// 편집 수
    pub fn len(&self) -> usize {
        self.edits.values().map(Vec::len).sum()
    }

    /// 편집이 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 디스크립터 경로별로 판정 결과를 한 번만 계산하는 분류기
pub struct VersionStyleClassifier<'a> {
    evaluator: &'a ExpressionEvaluator,
    ctx: &'a StyleContext,
    cache: HashMap<PathBuf, Option<VersionStyle>>,
}

impl<'a> VersionStyleClassifier<'a> {
    /// 평가기와 버전 정보로 분류기를 만듭니다.
    pub fn new(evaluator: &'a ExpressionEvaluator, ctx: &'a StyleContext) -> Self {
        Self {
            evaluator,
            ctx,
            cache: HashMap::new(),
        }
    }

    /// 모듈의 스타일 (캐시됨)
    pub fn classify(&mut self, module: &Module) -> Result<Option<VersionStyle>, EngineError> {
        if let Some(style) = self.cache.get(&module.descriptor) {
            return Ok(style.clone());
        }
        let style = autodetect(module, self.evaluator, self.ctx)?;
        if let Some(s) = &style {
            debug!(module = %module.ga, style = %s, "version style detected");
        }
        self.cache.insert(module.descriptor.clone(), style.clone());
        Ok(style)
    }

    /// 트리 전체에 대해 버전, 커뮤니티 버전 프로퍼티, 부모 버전 편집을 계산합니다.
    pub fn plan(&mut self, graph: &ModuleGraph, required: &BTreeSet<Ga>) -> Result<VersionPlan, EngineError> {
        let mut plan = VersionPlan::default();
        let mut community_property_used = false;
        let modules = graph.module_identities();

        for module in graph.modules_by_identity().values() {
            let mut edits = Vec::new();
            if let Some(style) = self.classify(module)? {
                community_property_used |= style.uses_community_property();
                edits.extend(apply(module, self.evaluator, &style, self.ctx, &modules, required)?);
                plan.styles.insert(module.descriptor.clone(), style);
            }
            if let Some(edit) = parent_version_edit(graph, module, self.evaluator)? {
                edits.push(edit);
            }
            if !edits.is_empty() {
                plan.edits.entry(module.descriptor.clone()).or_default().extend(edits);
            }
        }

        if let Some(root) = graph.root() {
            let property = &self.ctx.community_property;
            let current = root.properties().get(property).map(|v| v.trim());
            if (community_property_used || current.is_some())
                && current != Some(self.ctx.community_version.as_str())
            {
                plan.edits
                    .entry(root.descriptor.clone())
                    .or_default()
                    .push(Transformation::SetProperty {
                        name: property.clone(),
                        value: self.ctx.community_version.clone(),
                    });
            }
        }
        Ok(plan)
    }
}

fn parent_version_edit(
    graph: &ModuleGraph,
    module: &Module,
    evaluator: &ExpressionEvaluator,
) -> Result<Option<Transformation>, EngineError> {
    let (Some(parent_ref), Some(parent)) = (&module.parent, graph.parent_of(&module.ga)) else {
        return Ok(None);
    };
    let expected = evaluator.evaluate(&parent.ga, "${project.version}")?;
    if parent_ref.gav.version.as_deref().map(str::trim) == Some(expected.as_str()) {
        return Ok(None);
    }
    Ok(Some(Transformation::SetParentVersion { version: expected }))
}
