//! 실패 정책 -- FAIL / WARN / IGNORE
//!
//! 배제 의존성 감사와 모든 일관성 검사가 같은 방식으로 위반을 라우팅합니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, PolicyViolation};

/// 정책 게이트 대상 위반 처리 방식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// 위반 시 실행을 중단합니다.
    #[default]
    Fail,
    /// 진단을 경고로 기록하고 계속합니다.
    Warn,
    /// 진단을 억제합니다.
    Ignore,
}

impl FailurePolicy {
    /// 허용 값 목록
    pub const VALUES: [&'static str; 3] = ["fail", "warn", "ignore"];

    /// 위반을 정책에 따라 처리합니다.
    ///
    /// `Fail`이면 위반을 에러로 돌려주고, `Warn`이면 `tracing::warn!`으로
    /// 기록한 뒤 `Ok`를 반환하며, `Ignore`이면 debug 레벨로만 남깁니다.
    pub fn enforce(self, violation: PolicyViolation) -> Result<(), PolicyViolation> {
        match self {
            Self::Fail => Err(violation),
            Self::Warn => {
                warn!(check = %violation.check, "{}", violation.message);
                Ok(())
            }
            Self::Ignore => {
                debug!(check = %violation.check, "violation ignored by policy");
                Ok(())
            }
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fail => write!(f, "fail"),
            Self::Warn => write!(f, "warn"),
            Self::Ignore => write!(f, "ignore"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "warn" => Ok(Self::Warn),
            "ignore" => Ok(Self::Ignore),
            other => Err(ConfigError::InvalidValue {
                field: "checks.failure_policy".to_owned(),
                reason: format!(
                    "'{other}' must be one of: {}",
                    Self::VALUES.join(", ")
                ),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation() -> PolicyViolation {
        PolicyViolation::new("pairing", "org.acme:foo-deployment has no runtime entry")
    }

    #[test]
    fn fail_returns_violation() {
        let err = FailurePolicy::Fail.enforce(violation()).unwrap_err();
        assert_eq!(err.check, "pairing");
    }

    #[test]
    fn warn_and_ignore_continue() {
        assert!(FailurePolicy::Warn.enforce(violation()).is_ok());
        assert!(FailurePolicy::Ignore.enforce(violation()).is_ok());
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("WARN".parse::<FailurePolicy>().unwrap(), FailurePolicy::Warn);
        assert_eq!(
            "ignore".parse::<FailurePolicy>().unwrap(),
            FailurePolicy::Ignore
        );
        assert!("strict".parse::<FailurePolicy>().is_err());
    }

    #[test]
    fn default_is_fail() {
        assert_eq!(FailurePolicy::default(), FailurePolicy::Fail);
        assert_eq!(FailurePolicy::default().to_string(), "fail");
    }
}
