//! 일관성 검사 -- 짝 검사, 오래된 항목, 전이 의존성 비교, 버전 정합성
//!
//! 각 검사는 위반이 있을 때만 [`PolicyViolation`]을 돌려주며, 호출자가 공통
//! 실패 정책으로 처리합니다.

use std::collections::BTreeSet;

use semver::Version;
use similar::{ChangeTag, TextDiff};

use prodtree_core::{Ga, PolicyViolation};
use prodtree_pom::{ExpressionEvaluator, Module};

use crate::error::EngineError;
use crate::resolver::ManagedConstraint;

/// 짝 검사 이름
pub const PAIRING: &str = "pairing";
/// 오래된 항목 검사 이름
pub const STALENESS: &str = "staleness";
/// 전이 의존성 비교 이름
pub const TRANSITIVE_DIFF: &str = "transitive-diff";
/// 버전 정합성 검사 이름
pub const VERSION_ALIGNMENT: &str = "version-alignment";

/// BOM 모듈이 직접 선언한 관리 항목
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedEntry {
    /// 평가된 식별자
    pub ga: Ga,
    /// 원문 버전
    pub raw_version: Option<String>,
}

/// BOM 모듈 기본 섹션의 관리 항목 (import 제외)
pub fn bom_entries(bom: &Module, evaluator: &ExpressionEvaluator) -> Result<Vec<ManagedEntry>, EngineError> {
    bom.default_profile()
        .managed_dependencies
        .iter()
        .filter(|d| !d.is_bom_import())
        .map(|d| {
            Ok(ManagedEntry {
                ga: Ga::new(
                    evaluator.evaluate(&bom.ga, &d.group_id)?,
                    evaluator.evaluate(&bom.ga, &d.artifact_id)?,
                ),
                raw_version: d.raw_version().map(str::to_owned),
            })
        })
        .collect()
}

fn violation(check: &str, header: &str, lines: &[String]) -> Option<PolicyViolation> {
    if lines.is_empty() {
        return None;
    }
    let mut message = header.to_owned();
    for line in lines {
        message.push_str("\n    ");
        message.push_str(line);
    }
    Some(PolicyViolation::new(check, message))
}

/// 런타임/디플로이먼트 짝 검사
///
/// 관리되는 `X-deployment`에는 관리되는 `X`가 있어야 하고, `X-deployment`가
/// 트리 모듈인 관리 항목 `X`에는 관리되는 `X-deployment`가 있어야 합니다.
pub fn pairing(
    entries: &[ManagedEntry],
    modules: &BTreeSet<Ga>,
    tracked_group: &str,
    suffix: &str,
) -> Option<PolicyViolation> {
    let managed: BTreeSet<&Ga> = entries
        .iter()
        .map(|e| &e.ga)
        .filter(|ga| ga.group_id == tracked_group)
        .collect();
    let mut lines = Vec::new();
    for ga in &managed {
        match ga.artifact_id.strip_suffix(suffix) {
            Some(runtime) => {
                let runtime = Ga::new(tracked_group, runtime);
                if !managed.contains(&runtime) {
                    lines.push(format!("{ga} is managed but {runtime} is not"));
                }
            }
            None => {
                let deployment = Ga::new(tracked_group, format!("{}{suffix}", ga.artifact_id));
                if modules.contains(&deployment) && !managed.contains(&deployment) {
                    lines.push(format!("{ga} is managed but {deployment} is not"));
                }
            }
        }
    }
    violation(PAIRING, "unpaired runtime/deployment constraints:", &lines)
}

/// 오래된 관리 항목 검사
///
/// 버전이 `${project.version}`이거나 자체 버전 리터럴인 대상 group 항목은
/// 트리의 모듈이어야 합니다.
pub fn staleness(
    entries: &[ManagedEntry],
    modules: &BTreeSet<Ga>,
    tracked_group: &str,
    own_version: &str,
) -> Option<PolicyViolation> {
    let lines: Vec<String> = entries
        .iter()
        .filter(|e| e.ga.group_id == tracked_group)
        .filter(|e| {
            matches!(e.raw_version.as_deref(), Some(v) if v == "${project.version}" || v == own_version)
        })
        .filter(|e| !modules.contains(&e.ga))
        .map(|e| format!("{} is managed but no module of the tree provides it", e.ga))
        .collect();
    violation(STALENESS, "stale constraints:", &lines)
}

/// 전이 의존성과 관리 목록 비교
///
/// 관리 목록에서 빠진 전이 의존성은 `+`, 도달하지 않는 관리 항목은 `-` 줄입니다.
pub fn transitive_diff(
    reachable: &BTreeSet<Ga>,
    managed: &[ManagedConstraint],
    tracked_group: &str,
) -> Option<PolicyViolation> {
    let listing = |gas: &mut dyn Iterator<Item = &Ga>| {
        let set: BTreeSet<String> = gas
            .filter(|ga| ga.group_id == tracked_group)
            .map(Ga::to_string)
            .collect();
        set.into_iter().map(|s| s + "\n").collect::<String>()
    };
    let managed_text = listing(&mut managed.iter().map(ManagedConstraint::ga));
    let reachable_text = listing(&mut reachable.iter());

    let diff = TextDiff::from_lines(&managed_text, &reachable_text);
    let lines: Vec<String> = diff
        .iter_all_changes()
        .filter_map(|change| {
            let sign = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => return None,
            };
            Some(format!("{sign}{}", change.value().trim_end()))
        })
        .collect();
    violation(
        TRANSITIVE_DIFF,
        "transitive dependencies differ from managed constraints (+ missing, - unused):",
        &lines,
    )
}

/// 버전 문자열의 숫자 기준선 `major.minor.patch`
///
/// 앞쪽의 숫자 구성 요소만 읽으며 빠진 요소는 0입니다. 숫자로 시작하지 않으면 `None`입니다.
pub fn numeric_base(version: &str) -> Option<Version> {
    let mut parts = [0u64; 3];
    let mut count = 0;
    for segment in version.split(['.', '-']).take(3) {
        let digits: String = segment.chars().take_while(char::is_ascii_digit).collect();
        if digits.is_empty() {
            break;
        }
        parts[count] = digits.parse().ok()?;
        count += 1;
        if digits.len() != segment.len() {
            break;
        }
    }
    (count > 0).then(|| Version::new(parts[0], parts[1], parts[2]))
}

/// 제품화/커뮤니티 버전 정합성 검사
///
/// 배제된 모듈의 관리 항목은 커뮤니티 버전, 필수 모듈의 관리 항목은 자체 버전이어야
/// 하며, 두 버전의 숫자 기준선이 같아야 합니다.
pub fn version_alignment(
    constraints: &[ManagedConstraint],
    modules: &BTreeSet<Ga>,
    required: &BTreeSet<Ga>,
    tracked_group: &str,
    own_version: &str,
    community_version: &str,
) -> Option<PolicyViolation> {
    let mut lines = Vec::new();
    match (numeric_base(own_version), numeric_base(community_version)) {
        (Some(own), Some(community)) if own != community => lines.push(format!(
            "own version {own_version} (base {own}) does not match community version \
             {community_version} (base {community})"
        )),
        (None, _) => lines.push(format!("own version '{own_version}' has no numeric base")),
        (_, None) => lines.push(format!("community version '{community_version}' has no numeric base")),
        _ => {}
    }

    for constraint in constraints {
        let ga = constraint.ga();
        if ga.group_id != tracked_group || !modules.contains(ga) {
            continue;
        }
        let actual = constraint.gavtcs.gav.version_or_empty();
        let (expected, kind) = if required.contains(ga) {
            (own_version, "required")
        } else {
            (community_version, "excluded")
        };
        if actual != expected {
            lines.push(format!("{kind} {ga} is managed at {actual}, expected {expected}"));
        }
    }
    violation(VERSION_ALIGNMENT, "misaligned versions:", &lines)
}
