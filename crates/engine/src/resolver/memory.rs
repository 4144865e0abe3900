//! 메모리 해석기 -- 미리 등록한 아티팩트로만 해석

use std::collections::HashMap;

use prodtree_core::Gav;

use super::collect::{DescriptorSource, collect_with};
use super::{ArtifactResolver, CollectRequest, DependencyNode, DependencySpec, ManagedConstraint};
use crate::error::EngineError;

/// 등록된 아티팩트와 BOM만 아는 해석기
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    artifacts: HashMap<Gav, Vec<DependencySpec>>,
    boms: HashMap<Gav, Vec<ManagedConstraint>>,
}

impl StaticResolver {
    /// 빈 해석기
    pub fn new() -> Self {
        Self::default()
    }

    /// 아티팩트와 그 직접 의존성을 등록합니다.
    pub fn with_artifact(mut self, gav: Gav, dependencies: Vec<DependencySpec>) -> Self {
        self.artifacts.insert(gav, dependencies);
        self
    }

    /// BOM의 관리 항목을 등록합니다.
    pub fn with_bom(mut self, gav: Gav, managed: Vec<ManagedConstraint>) -> Self {
        self.boms.insert(gav, managed);
        self
    }
}

impl DescriptorSource for StaticResolver {
    fn dependencies_of(&self, artifact: &Gav) -> Result<Vec<DependencySpec>, EngineError> {
        self.artifacts
            .get(artifact)
            .cloned()
            .ok_or_else(|| EngineError::ArtifactNotFound {
                artifact: artifact.to_string(),
                reason: "not registered".to_owned(),
            })
    }
}

impl ArtifactResolver for StaticResolver {
    fn managed_dependencies(&self, bom: &Gav) -> Result<Vec<ManagedConstraint>, EngineError> {
        self.boms
            .get(bom)
            .cloned()
            .ok_or_else(|| EngineError::ArtifactNotFound {
                artifact: bom.to_string(),
                reason: "BOM not registered".to_owned(),
            })
    }

    fn collect(&self, request: &CollectRequest) -> Result<DependencyNode, EngineError> {
        collect_with(self, request)
    }
}
