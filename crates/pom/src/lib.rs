#![doc = include_str!("../README.md")]

pub mod edit;
pub mod error;
pub mod expr;
pub mod graph;
pub mod model;
pub mod parse;
pub mod profile;

// 에러
pub use error::PomError;

// 모델
pub use model::{Dependency, DependencyLocator, Module, ModuleLink, Profile};

// 그래프와 평가
pub use expr::ExpressionEvaluator;
pub use graph::{LinkEdge, ModuleGraph};
pub use profile::ProfileFilter;

// 편집
pub use edit::{DescriptorEditor, Transformation};
