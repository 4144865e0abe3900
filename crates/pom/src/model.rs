//! 디스크립터 모델 -- 모듈, 프로파일, 의존성, 모듈 링크
//!
//! 의존성의 groupId/artifactId/version은 평가 전 원문 표현식 그대로 보관합니다.
//! 기본(비 프로파일) 섹션은 id가 빈 문자열인 항상 활성 프로파일로 표현합니다.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use prodtree_core::{Ga, Gav};

/// 기본 섹션의 프로파일 id
pub const DEFAULT_PROFILE: &str = "";

/// 디스크립터 안에서 의존성 요소의 위치
///
/// 편집기가 같은 요소를 다시 찾을 때 사용합니다.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DependencyLocator {
    /// 소속 프로파일 id (기본 섹션은 빈 문자열)
    pub profile: String,
    /// `dependencyManagement` 안에 있는지 여부
    pub managed: bool,
    /// 같은 목록 안의 순번 (0부터)
    pub index: usize,
}

impl fmt::Display for DependencyLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let section = if self.managed {
            "dependencyManagement"
        } else {
            "dependencies"
        };
        if self.profile.is_empty() {
            write!(f, "{section}[{}]", self.index)
        } else {
            write!(f, "profile({})/{section}[{}]", self.profile, self.index)
        }
    }
}

/// 선언된 의존성 (원문 표현식)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    /// groupId 표현식
    pub group_id: String,
    /// artifactId 표현식
    pub artifact_id: String,
    /// version 표현식 (없으면 관리 의존성에서 상속)
    pub version: Option<String>,
    /// type
    pub artifact_type: Option<String>,
    /// classifier
    pub classifier: Option<String>,
    /// scope
    pub scope: Option<String>,
    /// optional 여부
    pub optional: bool,
    /// exclusion 목록 (원문)
    pub exclusions: Vec<Ga>,
    /// 디스크립터 내 위치
    pub locator: DependencyLocator,
}

impl Dependency {
    /// `type=pom, scope=import` 여부
    pub fn is_bom_import(&self) -> bool {
        self.artifact_type.as_deref() == Some("pom") && self.scope.as_deref() == Some("import")
    }

    /// 클로저 계산 시 따라가는 scope인지 여부 (compile, provided, 생략)
    pub fn is_build_scope(&self) -> bool {
        matches!(self.scope.as_deref(), None | Some("compile") | Some("provided"))
    }

    /// 원문 version의 앞뒤 공백 제거 값
    pub fn raw_version(&self) -> Option<&str> {
        self.version.as_deref().map(str::trim)
    }
}

/// 모듈 링크 상태
///
/// 디스크 상에서 `Suppressed`는 `<!-- <module>PATH</module> REASON -->` 주석으로
/// 직렬화되며, 그 형식은 편집기 경계에서만 다룹니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ModuleLink {
    /// `<module>PATH</module>`
    Active {
        /// 링크 경로
        path: String,
    },
    /// 주석 처리된 링크
    Suppressed {
        /// 링크 경로
        path: String,
        /// 주석 뒤에 붙은 마커/사유
        reason: String,
    },
}

impl ModuleLink {
    /// 링크 경로
    pub fn path(&self) -> &str {
        match self {
            Self::Active { path } | Self::Suppressed { path, .. } => path,
        }
    }

    /// 활성 여부
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    /// 주어진 마커로 억제된 링크인지 여부
    pub fn is_suppressed_with(&self, marker: &str) -> bool {
        matches!(self, Self::Suppressed { reason, .. } if reason == marker)
    }

    /// 집계 디스크립터 디렉토리 기준으로 자식 디스크립터 경로를 계산합니다.
    pub fn descriptor_in(&self, aggregator_dir: &Path) -> PathBuf {
        let target = aggregator_dir.join(self.path());
        if self.path().ends_with(".xml") {
            target
        } else {
            target.join("pom.xml")
        }
    }
}

/// 프로퍼티 기반 활성화 조건
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyActivation {
    /// 프로퍼티 이름 (`!` 접두사 제거됨)
    pub name: String,
    /// 기대 값 (없으면 존재 여부만 확인)
    pub value: Option<String>,
    /// `!name` 형식의 부정 조건
    pub negated: bool,
}

/// 프로파일 활성화 조건
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Activation {
    /// `activeByDefault`
    pub active_by_default: bool,
    /// 프로퍼티 조건
    pub property: Option<PropertyActivation>,
    /// 평가하지 않는 조건 (jdk, os, file)
    pub other: Vec<String>,
}

/// 프로파일 (기본 섹션 포함)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    /// 프로파일 id (기본 섹션은 빈 문자열)
    pub id: String,
    /// 활성화 조건
    pub activation: Activation,
    /// 프로퍼티
    pub properties: BTreeMap<String, String>,
    /// 선언 의존성
    pub dependencies: Vec<Dependency>,
    /// 관리 의존성
    pub managed_dependencies: Vec<Dependency>,
    /// 모듈 링크
    pub module_links: Vec<ModuleLink>,
}

impl Profile {
    /// 기본 섹션 여부
    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_PROFILE
    }

    /// 선언 의존성과 관리 의존성을 모두 순회합니다.
    pub fn all_dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.managed_dependencies
            .iter()
            .chain(self.dependencies.iter())
    }
}

/// `<parent>` 참조
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentRef {
    /// 부모 식별자 + 버전 (원문)
    pub gav: Gav,
    /// `relativePath` (원문)
    pub relative_path: Option<String>,
}

/// 트리 안의 모듈 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    /// 모듈 식별자 (groupId 생략 시 부모에서 상속)
    pub ga: Ga,
    /// 모듈 버전 또는 상속된 부모 버전 (원문)
    pub version: String,
    /// 자체 `<version>` 선언 여부
    pub declares_version: bool,
    /// 디스크립터 절대 경로
    pub descriptor: PathBuf,
    /// 트리 루트 기준 디스크립터 디렉토리 (`/` 구분, 루트는 빈 문자열)
    pub rel_dir: String,
    /// packaging (기본값 `jar`)
    pub packaging: String,
    /// 부모 참조
    pub parent: Option<ParentRef>,
    /// 프로파일 목록, 첫 항목은 항상 기본 섹션
    pub profiles: Vec<Profile>,
}

impl Module {
    /// 기본 섹션
    pub fn default_profile(&self) -> &Profile {
        &self.profiles[0]
    }

    /// 기본 섹션의 프로퍼티
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.default_profile().properties
    }

    /// 디스크립터가 위치한 디렉토리
    pub fn dir(&self) -> &Path {
        self.descriptor.parent().unwrap_or_else(|| Path::new("."))
    }

    /// 빌드 출력 디렉토리 (`<dir>/target`)
    pub fn build_output_dir(&self) -> PathBuf {
        self.dir().join("target")
    }

    /// 모든 프로파일의 모듈 링크
    pub fn module_links(&self) -> impl Iterator<Item = (&Profile, &ModuleLink)> {
        self.profiles
            .iter()
            .flat_map(|p| p.module_links.iter().map(move |l| (p, l)))
    }

    /// 집계 모듈 여부
    pub fn is_aggregator(&self) -> bool {
        self.module_links().next().is_some()
    }

    /// id로 프로파일을 찾습니다.
    pub fn profile(&self, id: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// 위치로 의존성을 찾습니다.
    pub fn dependency(&self, locator: &DependencyLocator) -> Option<&Dependency> {
        let profile = self.profile(&locator.profile)?;
        let list = if locator.managed {
            &profile.managed_dependencies
        } else {
            &profile.dependencies
        };
        list.get(locator.index)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.ga, self.descriptor.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(scope: Option<&str>, ty: Option<&str>) -> Dependency {
        Dependency {
            group_id: "g".to_owned(),
            artifact_id: "a".to_owned(),
            version: Some(" 1.0 ".to_owned()),
            artifact_type: ty.map(str::to_owned),
            classifier: None,
            scope: scope.map(str::to_owned),
            optional: false,
            exclusions: Vec::new(),
            locator: DependencyLocator {
                profile: String::new(),
                managed: false,
                index: 0,
            },
        }
    }

    #[test]
    fn build_scope_follows_compile_and_provided_only() {
        assert!(dep(None, None).is_build_scope());
        assert!(dep(Some("compile"), None).is_build_scope());
        assert!(dep(Some("provided"), None).is_build_scope());
        assert!(!dep(Some("test"), None).is_build_scope());
        assert!(!dep(Some("runtime"), None).is_build_scope());
    }

    #[test]
    fn bom_import_detection() {
        assert!(dep(Some("import"), Some("pom")).is_bom_import());
        assert!(!dep(Some("import"), None).is_bom_import());
    }

    #[test]
    fn raw_version_is_trimmed() {
        assert_eq!(dep(None, None).raw_version(), Some("1.0"));
    }

    #[test]
    fn link_descriptor_path() {
        let link = ModuleLink::Active {
            path: "extensions/foo".to_owned(),
        };
        assert_eq!(
            link.descriptor_in(Path::new("/tree")),
            PathBuf::from("/tree/extensions/foo/pom.xml")
        );
        let link = ModuleLink::Suppressed {
            path: "alt/custom-pom.xml".to_owned(),
            reason: "prodtree:excluded".to_owned(),
        };
        assert_eq!(
            link.descriptor_in(Path::new("/tree")),
            PathBuf::from("/tree/alt/custom-pom.xml")
        );
        assert!(link.is_suppressed_with("prodtree:excluded"));
        assert!(!link.is_suppressed_with("other"));
    }

    #[test]
    fn locator_display() {
        let loc = DependencyLocator {
            profile: "full".to_owned(),
            managed: true,
            index: 3,
        };
        assert_eq!(loc.to_string(), "profile(full)/dependencyManagement[3]");
    }
}
