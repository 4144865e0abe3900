#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod ga;
pub mod pattern;
pub mod policy;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, DescriptorError, PolicyViolation, ProdtreeError, ResolutionError};

// 설정
pub use config::ProdtreeConfig;

// 식별자와 패턴
pub use ga::{Ga, Gav, Gavtcs};
pub use pattern::{GavPattern, GavSet};

// 실패 정책
pub use policy::FailurePolicy;
