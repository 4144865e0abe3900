//! 아티팩트 해석기 -- 관리 의존성 조회와 전이 의존성 수집
//!
//! [`ArtifactResolver`]는 엔진이 외부 저장소를 보는 유일한 통로입니다.
//! 번들 구현 [`LocalRepositoryResolver`]는 트리 안의 모듈과 로컬 Maven 저장소
//! 레이아웃에서 디스크립터를 읽습니다. 테스트에서는 [`StaticResolver`]를 씁니다.

mod collect;
pub mod local;
pub mod memory;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use prodtree_core::{Ga, Gav, Gavtcs};

use crate::error::EngineError;

pub use local::LocalRepositoryResolver;
pub use memory::StaticResolver;

/// 선언 출처가 붙은 관리 의존성 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedConstraint {
    /// 관리 대상 아티팩트 (버전 해석됨)
    pub gavtcs: Gavtcs,
    /// 관리 항목의 exclusion
    pub exclusions: Vec<Ga>,
    /// 이 항목을 선언한 BOM
    pub origin: Gav,
}

impl ManagedConstraint {
    /// exclusion 없는 항목을 만듭니다.
    pub fn new(gavtcs: Gavtcs, origin: Gav) -> Self {
        Self {
            gavtcs,
            exclusions: Vec::new(),
            origin,
        }
    }

    /// `Ga` 참조
    pub fn ga(&self) -> &Ga {
        self.gavtcs.ga()
    }
}

/// 직접 의존성 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    /// 대상 아티팩트
    pub artifact: Gavtcs,
    /// 이 간선 아래에서 제외할 아티팩트 (`*` 와일드카드 허용)
    pub exclusions: Vec<Ga>,
    /// optional 여부
    pub optional: bool,
}

impl DependencySpec {
    /// exclusion 없는 의존성
    pub fn new(artifact: Gavtcs) -> Self {
        Self {
            artifact,
            exclusions: Vec::new(),
            optional: false,
        }
    }
}

/// 수집 요청
#[derive(Debug, Clone)]
pub struct CollectRequest {
    /// 루트 아티팩트 (결과 트리의 루트 노드)
    pub root: Gav,
    /// 루트의 직접 의존성
    pub dependencies: Vec<DependencySpec>,
    /// 그래프 전체에 적용할 관리 항목
    pub managed: Vec<ManagedConstraint>,
}

/// 해석된 의존성 트리 노드
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyNode {
    /// 해석된 아티팩트
    pub artifact: Gavtcs,
    /// 자식 노드
    pub children: Vec<DependencyNode>,
}

/// 의존성 트리 방문자
pub trait DependencyVisitor {
    /// 노드에 들어갈 때 호출됩니다. `false`면 자식을 건너뜁니다.
    fn enter(&mut self, node: &DependencyNode) -> bool;

    /// 노드를 떠날 때 호출됩니다.
    fn leave(&mut self, _node: &DependencyNode) {}
}

impl DependencyNode {
    /// 자식 없는 노드
    pub fn leaf(artifact: Gavtcs) -> Self {
        Self {
            artifact,
            children: Vec::new(),
        }
    }

    /// 깊이 우선으로 방문합니다.
    pub fn visit<V: DependencyVisitor>(&self, visitor: &mut V) {
        if visitor.enter(self) {
            for child in &self.children {
                child.visit(visitor);
            }
        }
        visitor.leave(self);
    }

    /// 루트를 제외한 모든 노드의 `Ga`
    pub fn transitive_identities(&self) -> BTreeSet<Ga> {
        self.transitive_artifacts().into_keys().collect()
    }

    /// 루트를 제외한 노드의 `Ga`별 해석 버전
    ///
    /// 같은 `Ga`가 여러 번 나오면 먼저 방문한 노드의 버전입니다.
    pub fn transitive_artifacts(&self) -> BTreeMap<Ga, Gav> {
        let mut collector = GavCollector::default();
        for child in &self.children {
            child.visit(&mut collector);
        }
        collector.seen
    }
}

#[derive(Default)]
struct GavCollector {
    seen: BTreeMap<Ga, Gav>,
}

impl DependencyVisitor for GavCollector {
    fn enter(&mut self, node: &DependencyNode) -> bool {
        let ga = node.artifact.ga();
        if self.seen.contains_key(ga) {
            return false;
        }
        self.seen.insert(ga.clone(), node.artifact.gav.clone());
        true
    }
}

/// 아티팩트 해석기
///
/// 구현체는 한 실행 안에서만 쓰이며 동기적으로 호출됩니다.
pub trait ArtifactResolver: Send {
    /// BOM의 유효 관리 의존성 (import BOM을 펼친 결과)
    fn managed_dependencies(&self, bom: &Gav) -> Result<Vec<ManagedConstraint>, EngineError>;

    /// 요청 루트에서 전이 의존성 트리를 수집합니다.
    fn collect(&self, request: &CollectRequest) -> Result<DependencyNode, EngineError>;
}
