//! 에러 타입 -- 도메인별 에러 정의
//!
//! 네 가지 분류를 따릅니다.
//!
//! - **설정 에러** ([`ConfigError`]): 항상 치명적, 실패 정책 대상 아님
//! - **해석 에러** ([`ResolutionError`]): 항상 치명적, 부분 결과를 쓰지 않음
//! - **정책 위반** ([`PolicyViolation`]): [`FailurePolicy`](crate::policy::FailurePolicy)를 거침
//! - **I/O 에러**: 항상 치명적, 관련 경로를 포함
//!
//! 디스크립터 파싱/편집 실패([`DescriptorError`])는 경로와 함께 보고되는
//! 치명적 에러입니다.

/// prodtree 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum ProdtreeError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 디스크립터 파싱/편집 에러
    #[error("descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    /// 의존성 해석 에러
    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// 실패 정책이 FAIL일 때의 정책 위반
    #[error("{0}")]
    Policy(#[from] PolicyViolation),

    /// I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },
}

impl ProdtreeError {
    /// 경로를 붙여 I/O 에러를 만듭니다.
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// 패턴 컴파일 실패
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// 프로퍼티 표현식을 해석할 수 없음
    #[error("unresolvable expression '{expression}' in {descriptor}: {reason}")]
    UnresolvedExpression {
        expression: String,
        descriptor: String,
        reason: String,
    },
}

/// 디스크립터 파싱/편집 에러
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// XML 파싱 실패 또는 필수 요소 누락
    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    /// 편집 대상 요소를 찾을 수 없거나 편집이 충돌함
    #[error("cannot edit {path}: {reason}")]
    Edit { path: String, reason: String },
}

/// 의존성 해석 에러
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// 아티팩트 디스크립터를 찾을 수 없음
    #[error("artifact not found: {artifact}: {reason}")]
    ArtifactNotFound { artifact: String, reason: String },

    /// 의존성 순환
    #[error("dependency cycle: {path}")]
    Cycle { path: String },

    /// 해석할 수 없는 버전
    #[error("illegal version '{version}' for {artifact}")]
    IllegalVersion { artifact: String, version: String },
}

/// 정책 게이트 대상 위반
///
/// 검사 이름과 사람이 읽을 수 있는 여러 줄 진단 메시지를 담습니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize)]
#[error("{check} failed:\n{message}")]
pub struct PolicyViolation {
    /// 검사 이름 (예: `staleness`)
    pub check: String,
    /// 진단 메시지
    pub message: String,
}

impl PolicyViolation {
    /// 새 위반을 생성합니다.
    pub fn new(check: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            message: message.into(),
        }
    }
}
