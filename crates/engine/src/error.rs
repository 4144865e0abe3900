//! 엔진 에러 타입
//!
//! [`EngineError`]는 클로저 계산, 버전 스타일 판정, 해석, 평탄화, 감사, 검사 중
//! 발생하는 에러입니다. `From<EngineError> for ProdtreeError` 구현으로 `?` 연산자를
//! 통해 최상위 에러 타입으로 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **설정**: `Config`, `NoMatchingRoot`, `MixedVersionStyle`, `Rules`
//! - **디스크립터**: `Pom`
//! - **해석**: `ArtifactNotFound`, `Cycle`, `IllegalVersion`
//! - **정책**: `Policy`
//! - **파일 I/O**: `Io`, `Archive`

use prodtree_core::error::{ConfigError, PolicyViolation, ProdtreeError, ResolutionError};
use prodtree_pom::PomError;

/// 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 디스크립터 계층 에러
    #[error(transparent)]
    Pom(#[from] PomError),

    /// 루트 패턴이 어떤 모듈에도 매칭되지 않음
    #[error("root pattern '{pattern}' matches no module of the tree")]
    NoMatchingRoot {
        /// 루트 패턴
        pattern: String,
    },

    /// 한 모듈 안에 플레이스홀더와 리터럴 버전이 섞여 있음
    #[error("{descriptor}: mixed version styles between {first} and {second}")]
    MixedVersionStyle {
        /// 모듈 디스크립터
        descriptor: String,
        /// 먼저 본 항목
        first: String,
        /// 다른 종류의 항목
        second: String,
    },

    /// 규칙 문서를 읽거나 해석할 수 없음
    #[error("banned dependency rules {location}: {reason}")]
    Rules {
        /// 문서 위치
        location: String,
        /// 실패 사유
        reason: String,
    },

    /// 아티팩트 디스크립터를 찾을 수 없음
    #[error("artifact not found: {artifact}: {reason}")]
    ArtifactNotFound {
        /// 아티팩트 좌표
        artifact: String,
        /// 실패 사유
        reason: String,
    },

    /// 부모/import 순환
    #[error("cycle detected: {path}")]
    Cycle {
        /// 순환 경로
        path: String,
    },

    /// 해석할 수 없는 버전
    #[error("illegal version '{version}' for {artifact}")]
    IllegalVersion {
        /// 아티팩트 좌표
        artifact: String,
        /// 원문 버전
        version: String,
    },

    /// 실패 정책이 FAIL인 검사 위반
    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    /// 아카이브 처리 실패
    #[error("archive error: {path}: {reason}")]
    Archive {
        /// 아카이브 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },
}

impl EngineError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn config(field: &str, reason: impl Into<String>) -> Self {
        Self::Config {
            field: field.to_owned(),
            reason: reason.into(),
        }
    }
}

impl From<EngineError> for ProdtreeError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Config { field, reason } => {
                ProdtreeError::Config(ConfigError::InvalidValue { field, reason })
            }
            EngineError::Pom(e) => e.into(),
            EngineError::NoMatchingRoot { pattern } => {
                ProdtreeError::Config(ConfigError::InvalidPattern {
                    pattern,
                    reason: "matches no module of the tree".to_owned(),
                })
            }
            EngineError::MixedVersionStyle {
                descriptor,
                first,
                second,
            } => ProdtreeError::Config(ConfigError::InvalidValue {
                field: "version style".to_owned(),
                reason: format!("{descriptor}: mixed version styles between {first} and {second}"),
            }),
            EngineError::Rules { location, reason } => {
                ProdtreeError::Config(ConfigError::InvalidValue {
                    field: "banned.resources".to_owned(),
                    reason: format!("{location}: {reason}"),
                })
            }
            EngineError::ArtifactNotFound { artifact, reason } => {
                ProdtreeError::Resolution(ResolutionError::ArtifactNotFound { artifact, reason })
            }
            EngineError::Cycle { path } => ProdtreeError::Resolution(ResolutionError::Cycle { path }),
            EngineError::IllegalVersion { artifact, version } => {
                ProdtreeError::Resolution(ResolutionError::IllegalVersion { artifact, version })
            }
            EngineError::Policy(v) => ProdtreeError::Policy(v),
            EngineError::Archive { path, reason } => ProdtreeError::Io {
                path,
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, reason),
            },
            EngineError::Io { path, source } => ProdtreeError::Io { path, source },
        }
    }
}
