//! 디스크립터 계층 에러 타입
//!
//! [`PomError`]는 디스크립터 파싱, 표현식 평가, 편집 중 발생하는 에러입니다.
//! `From<PomError> for ProdtreeError` 구현으로 `?` 연산자를 통해 상위 에러 타입으로
//! 전파됩니다. 모든 variant는 관련 디스크립터 경로를 포함합니다.

use prodtree_core::error::{ConfigError, DescriptorError, ProdtreeError};

/// 디스크립터 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum PomError {
    /// XML 파싱 실패
    #[error("failed to parse {path}: {reason}")]
    Parse {
        /// 디스크립터 경로
        path: String,
        /// 파싱 실패 사유
        reason: String,
    },

    /// 필수 요소 누락
    #[error("{path}: missing <{element}>")]
    MissingElement {
        /// 디스크립터 경로
        path: String,
        /// 누락된 요소 이름
        element: String,
    },

    /// 같은 식별자를 가진 모듈이 둘 이상
    #[error("duplicate module {ga}: {first} and {second}")]
    DuplicateModule {
        /// 모듈 식별자
        ga: String,
        /// 먼저 발견된 디스크립터
        first: String,
        /// 나중에 발견된 디스크립터
        second: String,
    },

    /// 활성 모듈 링크가 가리키는 디스크립터가 없음
    #[error("{aggregator}: module link '{link}' has no descriptor at {path}")]
    MissingModule {
        /// 링크를 가진 집계 디스크립터
        aggregator: String,
        /// 링크 경로
        link: String,
        /// 기대한 디스크립터 경로
        path: String,
    },

    /// 프로퍼티 표현식 평가 실패
    #[error("unresolvable expression '{expression}' in {descriptor}: {reason}")]
    Expression {
        /// 원문 표현식
        expression: String,
        /// 소유 모듈 디스크립터
        descriptor: String,
        /// 실패 사유
        reason: String,
    },

    /// 지원하지 않는 인코딩
    #[error("{path}: unsupported encoding '{encoding}', only UTF-8")]
    Encoding {
        /// 디스크립터 경로
        path: String,
        /// 요청된 인코딩
        encoding: String,
    },

    /// 편집 대상을 찾을 수 없거나 편집이 충돌함
    #[error("cannot edit {path}: {reason}")]
    Edit {
        /// 디스크립터 경로
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

impl PomError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

impl From<PomError> for ProdtreeError {
    fn from(err: PomError) -> Self {
        match err {
            PomError::Parse { path, reason } => {
                ProdtreeError::Descriptor(DescriptorError::Parse { path, reason })
            }
            PomError::MissingElement { path, element } => {
                ProdtreeError::Descriptor(DescriptorError::Parse {
                    path,
                    reason: format!("missing <{element}>"),
                })
            }
            PomError::DuplicateModule { ga, first, second } => {
                ProdtreeError::Descriptor(DescriptorError::Parse {
                    path: second,
                    reason: format!("duplicate module {ga}, already declared by {first}"),
                })
            }
            PomError::MissingModule {
                aggregator,
                link,
                path,
            } => ProdtreeError::Descriptor(DescriptorError::Parse {
                path: aggregator,
                reason: format!("module link '{link}' has no descriptor at {path}"),
            }),
            PomError::Expression {
                expression,
                descriptor,
                reason,
            } => ProdtreeError::Config(ConfigError::UnresolvedExpression {
                expression,
                descriptor,
                reason,
            }),
            PomError::Encoding { path, encoding } => {
                ProdtreeError::Config(ConfigError::InvalidValue {
                    field: "project.encoding".to_owned(),
                    reason: format!("{path}: unsupported encoding '{encoding}', only UTF-8"),
                })
            }
            PomError::Edit { path, reason } => {
                ProdtreeError::Descriptor(DescriptorError::Edit { path, reason })
            }
            PomError::Io { path, source } => ProdtreeError::Io { path, source },
        }
    }
}
