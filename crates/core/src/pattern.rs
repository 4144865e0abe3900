//! 식별자 패턴 -- `GavPattern` 및 include/exclude 집합 `GavSet`
//!
//! 패턴 형식은 `groupId:artifactId[:version]`이며 각 세그먼트에 `*` 와일드카드를
//! 사용할 수 있습니다. `*`는 한 세그먼트 안의 임의 문자열에 매칭됩니다.
//! 와일드카드가 포함된 세그먼트는 로딩 시 한 번만 정규식으로 컴파일됩니다.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ga::{Ga, WILDCARD};

/// 컴파일된 단일 세그먼트 매처
#[derive(Debug, Clone)]
enum Segment {
    /// `*` 하나 -- 모든 값에 매칭
    Any,
    /// 와일드카드 없는 리터럴
    Literal(String),
    /// 와일드카드 포함 -- 앵커된 정규식
    Glob(Regex),
}

impl Segment {
    fn compile(raw: &str, pattern: &str) -> Result<Self, ConfigError> {
        if raw.is_empty() {
            return Err(ConfigError::InvalidPattern {
                pattern: pattern.to_owned(),
                reason: "empty segment".to_owned(),
            });
        }
        if raw == WILDCARD {
            return Ok(Self::Any);
        }
        if !raw.contains('*') {
            return Ok(Self::Literal(raw.to_owned()));
        }

        let body = raw
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{body}$")).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self::Glob(regex))
    }

    fn matches(&self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Literal(lit) => lit == value,
            Self::Glob(re) => re.is_match(value),
        }
    }
}

/// `groupId:artifactId[:version]` 와일드카드 매처
///
/// 동등성, 순서, 직렬화는 원문 텍스트 기준입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GavPattern {
    raw: String,
    group: Segment,
    artifact: Segment,
    version: Option<Segment>,
}

impl GavPattern {
    /// 패턴 문자열을 컴파일합니다.
    ///
    /// # Errors
    ///
    /// 세그먼트가 비어 있거나 4개 이상이면 [`ConfigError::InvalidPattern`]을 반환합니다.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        let parts: Vec<&str> = trimmed.split(':').collect();
        if parts.len() > 3 {
            return Err(ConfigError::InvalidPattern {
                pattern: raw.to_owned(),
                reason: "expected at most groupId:artifactId:version".to_owned(),
            });
        }

        let group = Segment::compile(parts[0], raw)?;
        let artifact = match parts.get(1) {
            Some(a) => Segment::compile(a, raw)?,
            None => Segment::Any,
        };
        let version = match parts.get(2) {
            Some(v) => Some(Segment::compile(v, raw)?),
            None => None,
        };

        Ok(Self {
            raw: trimmed.to_owned(),
            group,
            artifact,
            version,
        })
    }

    /// 리터럴 `Ga`에 정확히 매칭되는 패턴을 만듭니다.
    pub fn exact(ga: &Ga) -> Self {
        Self {
            raw: ga.to_string(),
            group: Segment::Literal(ga.group_id.clone()),
            artifact: Segment::Literal(ga.artifact_id.clone()),
            version: None,
        }
    }

    /// `*:*` 패턴
    pub fn any() -> Self {
        Self {
            raw: format!("{WILDCARD}:{WILDCARD}"),
            group: Segment::Any,
            artifact: Segment::Any,
            version: None,
        }
    }

    /// 원문 텍스트
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// groupId, artifactId (그리고 주어졌다면 version) 매칭 여부
    ///
    /// 질의에 버전이 없으면 패턴의 버전 세그먼트는 고려하지 않습니다.
    pub fn matches(&self, group_id: &str, artifact_id: &str, version: Option<&str>) -> bool {
        if !self.group.matches(group_id) || !self.artifact.matches(artifact_id) {
            return false;
        }
        match (&self.version, version) {
            (Some(seg), Some(v)) => seg.matches(v),
            _ => true,
        }
    }

    /// `Ga` 매칭 여부
    pub fn matches_ga(&self, ga: &Ga) -> bool {
        self.matches(&ga.group_id, &ga.artifact_id, None)
    }
}

impl PartialEq for GavPattern {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for GavPattern {}

impl PartialOrd for GavPattern {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GavPattern {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl std::hash::Hash for GavPattern {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Display for GavPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for GavPattern {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for GavPattern {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<GavPattern> for String {
    fn from(p: GavPattern) -> Self {
        p.raw
    }
}

/// include/exclude 패턴 집합
///
/// `contains`는 include 중 하나가 매칭되고 exclude가 하나도 매칭되지 않을 때만
/// 참입니다. include 목록이 비어 있으면 아무것도 매칭되지 않으므로, 필터가
/// 생략된 호출 지점은 [`GavSet::all`]을 사용해야 합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GavSet {
    /// 포함 패턴
    #[serde(default)]
    pub includes: Vec<GavPattern>,
    /// 제외 패턴 (포함보다 우선)
    #[serde(default)]
    pub excludes: Vec<GavPattern>,
}

impl GavSet {
    /// 모든 식별자에 매칭되는 집합 (`*:*`)
    pub fn all() -> Self {
        Self {
            includes: vec![GavPattern::any()],
            excludes: Vec::new(),
        }
    }

    /// 아무것도 매칭하지 않는 집합
    pub fn none() -> Self {
        Self::default()
    }

    /// 문자열 목록에서 집합을 만듭니다.
    pub fn parse<S: AsRef<str>>(includes: &[S], excludes: &[S]) -> Result<Self, ConfigError> {
        Ok(Self {
            includes: includes
                .iter()
                .map(|s| GavPattern::parse(s.as_ref()))
                .collect::<Result<_, _>>()?,
            excludes: excludes
                .iter()
                .map(|s| GavPattern::parse(s.as_ref()))
                .collect::<Result<_, _>>()?,
        })
    }

    /// include 패턴을 추가합니다.
    pub fn include(mut self, pattern: GavPattern) -> Self {
        self.includes.push(pattern);
        self
    }

    /// exclude 패턴을 추가합니다.
    pub fn exclude(mut self, pattern: GavPattern) -> Self {
        self.excludes.push(pattern);
        self
    }

    /// 유일한 질의 연산
    pub fn contains(&self, group_id: &str, artifact_id: &str, version: Option<&str>) -> bool {
        self.includes
            .iter()
            .any(|p| p.matches(group_id, artifact_id, version))
            && !self
                .excludes
                .iter()
                .any(|p| p.matches(group_id, artifact_id, version))
    }

    /// `Ga` 질의
    pub fn contains_ga(&self, ga: &Ga) -> bool {
        self.contains(&ga.group_id, &ga.artifact_id, None)
    }

    /// include 목록이 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty()
    }
}

impl fmt::Display for GavSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |v: &[GavPattern]| {
            v.iter()
                .map(GavPattern::as_str)
                .collect::<Vec<_>>()
                .join(",")
        };
        write!(f, "+[{}] -[{}]", join(&self.includes), join(&self.excludes))
    }
}
