//! 배제 의존성 감사 -- 진입점 전이 의존성 중 금지 패턴 탐지
//!
//! - **report 모드**: 위반을 `진입점 -> 금지 아티팩트` 줄로 모아 실패 정책에 넘깁니다.
//! - **fix 모드**: 위반마다 BOM 디스크립터의 진입점 관리 항목에 `<exclusion>`을
//!   추가한 뒤 같은 진단을 실패 정책에 넘깁니다.

pub mod rules;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use prodtree_core::config::BannedResourceConfig;
use prodtree_core::{Ga, Gav, GavSet, PolicyViolation};
use prodtree_pom::{ExpressionEvaluator, Module, Transformation};

use crate::error::EngineError;

pub use rules::{RuleDocument, RuleDocumentLoader, RuleFilter};

/// 감사 검사 이름
pub const CHECK_NAME: &str = "banned-dependencies";

/// 감사 동작 모드
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditMode {
    /// 진단만 보고
    #[default]
    Report,
    /// exclusion을 추가하고 보고
    Fix,
}

impl fmt::Display for AuditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Report => write!(f, "report"),
            Self::Fix => write!(f, "fix"),
        }
    }
}

impl FromStr for AuditMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "report" => Ok(Self::Report),
            "fix" => Ok(Self::Fix),
            other => Err(EngineError::config(
                "banned.mode",
                format!("'{other}' must be one of: report, fix"),
            )),
        }
    }
}

/// 설정된 규칙 리소스 묶음
///
/// 각 리소스는 처음 필요할 때 한 번만 읽고 컴파일합니다.
pub struct BannedRules {
    loader: RuleDocumentLoader,
    resources: Vec<(BannedResourceConfig, OnceCell<GavSet>)>,
}

impl BannedRules {
    /// 로더와 리소스 목록으로 규칙 묶음을 만듭니다.
    pub fn new(loader: RuleDocumentLoader, resources: &[BannedResourceConfig]) -> Self {
        Self {
            loader,
            resources: resources
                .iter()
                .map(|r| (r.clone(), OnceCell::new()))
                .collect(),
        }
    }

    /// 규칙 리소스가 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    fn compiled(&self, index: usize) -> Result<&GavSet, EngineError> {
        let (resource, cell) = &self.resources[index];
        cell.get_or_try_init(|| {
            let text = self.loader.load(&resource.location)?;
            let mut document = RuleDocument::parse(&resource.location, &text)?;
            if let Some(filter) = &resource.filter {
                let filter_text = self.loader.load(filter)?;
                document.apply_filter(&RuleFilter::parse(filter, &filter_text)?);
            }
            info!(
                location = %resource.location,
                banned = document.banned.len(),
                allowed = document.allowed.len(),
                "banned dependency rules loaded"
            );
            document.compile(&resource.location)
        })
    }

    /// 어느 리소스에서든 금지된 아티팩트인지 여부
    ///
    /// 패턴의 버전 세그먼트는 해석된 버전과 비교합니다.
    pub fn is_banned(&self, gav: &Gav) -> Result<bool, EngineError> {
        for index in 0..self.resources.len() {
            if self.compiled(index)?.contains(&gav.ga.group_id, &gav.ga.artifact_id, gav.version.as_deref()) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// 진입점별 해석된 전이 의존성에서 금지 아티팩트를 찾습니다.
pub fn audit(
    resolved_by_entry_point: &BTreeMap<Ga, BTreeSet<Gav>>,
    rules: &BannedRules,
) -> Result<BTreeMap<Ga, BTreeSet<Ga>>, EngineError> {
    let mut violations: BTreeMap<Ga, BTreeSet<Ga>> = BTreeMap::new();
    for (entry_point, resolved) in resolved_by_entry_point {
        for gav in resolved {
            if rules.is_banned(gav)? {
                violations
                    .entry(entry_point.clone())
                    .or_default()
                    .insert(gav.ga.clone());
            }
        }
    }
    if !violations.is_empty() {
        info!(
            entry_points = violations.len(),
            banned = violations.values().map(BTreeSet::len).sum::<usize>(),
            "banned dependencies detected"
        );
    }
    Ok(violations)
}

/// 위반 목록을 하나의 진단으로 묶습니다. 위반이 없으면 `None`입니다.
pub fn diagnostic(violations: &BTreeMap<Ga, BTreeSet<Ga>>) -> Option<PolicyViolation> {
    if violations.is_empty() {
        return None;
    }
    let mut message = String::from("banned dependencies are pulled in transitively:");
    for (entry_point, banned) in violations {
        for ga in banned {
            message.push_str(&format!("\n    {entry_point} -> {ga}"));
        }
    }
    Some(PolicyViolation::new(CHECK_NAME, message))
}

/// fix 모드 편집을 계산합니다.
///
/// 진입점의 관리 항목이 BOM 모듈 자체 선언에 없으면 경고만 남깁니다.
pub fn fix_edits(
    bom: &Module,
    evaluator: &ExpressionEvaluator,
    violations: &BTreeMap<Ga, BTreeSet<Ga>>,
) -> Result<Vec<Transformation>, EngineError> {
    let mut edits = Vec::new();
    for (entry_point, banned) in violations {
        let mut target = None;
        for dep in &bom.default_profile().managed_dependencies {
            let ga = Ga::new(
                evaluator.evaluate(&bom.ga, &dep.group_id)?,
                evaluator.evaluate(&bom.ga, &dep.artifact_id)?,
            );
            if &ga == entry_point && !dep.is_bom_import() {
                target = Some(dep);
                break;
            }
        }
        let Some(dep) = target else {
            warn!(
                entry_point = %entry_point,
                bom = %bom.descriptor.display(),
                "entry point is not managed by the BOM module itself, cannot add exclusions"
            );
            continue;
        };
        for ga in banned {
            if dep.exclusions.contains(ga) {
                continue;
            }
            edits.push(Transformation::AddExclusion {
                locator: dep.locator.clone(),
                exclusion: ga.clone(),
            });
        }
    }
    Ok(edits)
}
