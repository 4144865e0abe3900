//! 아티팩트 식별자 -- `Ga`, `Gav`, `Gavtcs`
//!
//! 모든 컴포넌트가 공유하는 값 타입입니다.
//! `Ga`는 groupId, artifactId 순서로 전순서를 가지며 해시 가능합니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 와일드카드 세그먼트
pub const WILDCARD: &str = "*";

/// 기본 아티팩트 타입
pub const DEFAULT_TYPE: &str = "jar";

/// groupId + artifactId 식별자
///
/// `Ga::any()`는 모든 아티팩트를 의미하는 센티널입니다.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ga {
    /// groupId
    pub group_id: String,
    /// artifactId
    pub artifact_id: String,
}

impl Ga {
    /// 새 식별자를 생성합니다.
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    /// 모든 아티팩트에 매칭되는 센티널 `*:*`를 반환합니다.
    pub fn any() -> Self {
        Self::new(WILDCARD, WILDCARD)
    }

    /// 센티널 여부를 확인합니다.
    pub fn is_any(&self) -> bool {
        self.group_id == WILDCARD && self.artifact_id == WILDCARD
    }

    /// 버전을 붙여 `Gav`를 만듭니다.
    pub fn with_version(&self, version: impl Into<String>) -> Gav {
        Gav {
            ga: self.clone(),
            version: Some(version.into()),
        }
    }

    /// `groupId:artifactId` 문자열을 파싱합니다.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let mut parts = s.trim().split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(g), Some(a), None) if !g.is_empty() && !a.is_empty() => Ok(Self::new(g, a)),
            _ => Err(ConfigError::InvalidValue {
                field: "ga".to_owned(),
                reason: format!("'{s}' is not of the form groupId:artifactId"),
            }),
        }
    }
}

impl fmt::Display for Ga {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

impl FromStr for Ga {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// `Ga` + 버전
///
/// 버전은 리터럴, 프로퍼티 표현식, 또는 없음(상속)일 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Gav {
    /// 식별자
    pub ga: Ga,
    /// 버전 (없으면 상속)
    pub version: Option<String>,
}

impl Gav {
    /// 새 `Gav`를 생성합니다.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: Option<String>,
    ) -> Self {
        Self {
            ga: Ga::new(group_id, artifact_id),
            version,
        }
    }

    /// 버전 문자열 (없으면 빈 문자열)
    pub fn version_or_empty(&self) -> &str {
        self.version.as_deref().unwrap_or("")
    }

    /// `groupId:artifactId[:version]` 문자열을 파싱합니다.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        match parts.as_slice() {
            [g, a] if !g.is_empty() && !a.is_empty() => Ok(Self::new(*g, *a, None)),
            [g, a, v] if !g.is_empty() && !a.is_empty() && !v.is_empty() => {
                Ok(Self::new(*g, *a, Some((*v).to_owned())))
            }
            _ => Err(ConfigError::InvalidValue {
                field: "gav".to_owned(),
                reason: format!("'{s}' is not of the form groupId:artifactId[:version]"),
            }),
        }
    }
}

impl fmt::Display for Gav {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}:{v}", self.ga),
            None => write!(f, "{}", self.ga),
        }
    }
}

/// `Gav` + type + classifier + scope
///
/// 아티팩트 저장소에 대해 해석되는 단위입니다.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Gavtcs {
    /// 식별자 + 버전
    pub gav: Gav,
    /// 아티팩트 타입 (기본값 `jar`)
    pub artifact_type: String,
    /// classifier (없으면 빈 문자열)
    pub classifier: String,
    /// scope (없으면 빈 문자열 = compile)
    pub scope: String,
}

impl Gavtcs {
    /// 기본 type/classifier/scope로 생성합니다.
    pub fn new(gav: Gav) -> Self {
        Self {
            gav,
            artifact_type: DEFAULT_TYPE.to_owned(),
            classifier: String::new(),
            scope: String::new(),
        }
    }

    /// type을 지정합니다. 빈 문자열이면 `jar`로 취급합니다.
    pub fn with_type(mut self, artifact_type: impl Into<String>) -> Self {
        let t = artifact_type.into();
        self.artifact_type = if t.is_empty() {
            DEFAULT_TYPE.to_owned()
        } else {
            t
        };
        self
    }

    /// classifier를 지정합니다.
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = classifier.into();
        self
    }

    /// scope를 지정합니다.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// `Ga` 참조
    pub fn ga(&self) -> &Ga {
        &self.gav.ga
    }

    /// 관리 의존성 중복 판정 키 `(Ga, type, classifier)`
    pub fn management_key(&self) -> (Ga, String, String) {
        (
            self.gav.ga.clone(),
            self.artifact_type.clone(),
            self.classifier.clone(),
        )
    }

    /// `type=pom, scope=import` BOM import 여부
    pub fn is_bom_import(&self) -> bool {
        self.artifact_type == "pom" && self.scope == "import"
    }
}

impl fmt::Display for Gavtcs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.gav)?;
        if self.artifact_type != DEFAULT_TYPE || !self.classifier.is_empty() {
            write!(f, ":{}", self.artifact_type)?;
        }
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        if !self.scope.is_empty() {
            write!(f, " ({})", self.scope)?;
        }
        Ok(())
    }
}
