//! 엔진 설정
//!
//! [`EngineConfig`]는 core의 [`ProdtreeConfig`]에서 파생된 타입이 지정된 설정입니다.
//! 문자열 패턴은 [`GavSet`]으로, 경로는 트리 루트 기준 [`PathBuf`]로, 모드 문자열은
//! 열거형으로 한 번만 변환됩니다.
//!
//! # 사용 예시
//!
//! ```
//! use prodtree_engine::EngineConfigBuilder;
//! use prodtree_core::FailurePolicy;
//!
//! let config = EngineConfigBuilder::new()
//!     .root_dir("/tmp/tree")
//!     .tracked_group("org.acme")
//!     .community_version("3.2.0")
//!     .roots(&["org.acme:acme-product"])
//!     .failure_policy(FailurePolicy::Warn)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.failure_policy, FailurePolicy::Warn);
//! ```

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use prodtree_core::config::{BannedResourceConfig, DEFAULT_MARKER};
use prodtree_core::{FailurePolicy, Ga, GavSet, ProdtreeConfig};
use prodtree_pom::ProfileFilter;

use crate::banned::AuditMode;
use crate::error::EngineError;

/// 개별 일관성 검사 스위치
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckToggles {
    /// 런타임/디플로이먼트 짝 검사
    pub pairing: bool,
    /// 오래된 관리 항목 검사
    pub staleness: bool,
    /// 전이 의존성 vs 관리 목록 비교
    pub transitive_diff: bool,
    /// 버전 정합성 검사
    pub version_alignment: bool,
}

impl Default for CheckToggles {
    fn default() -> Self {
        Self {
            pairing: true,
            staleness: true,
            transitive_diff: true,
            version_alignment: true,
        }
    }
}

/// 엔진 설정
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// 트리 루트 디렉토리
    pub root_dir: PathBuf,
    /// 루트 디스크립터 파일명
    pub descriptor: String,
    /// 디스크립터 인코딩
    pub encoding: String,

    /// 제품화 대상 groupId
    pub tracked_group: String,
    /// 커뮤니티 groupId
    pub community_group: Option<String>,
    /// 자체 버전 (없으면 루트 디스크립터 버전)
    pub own_version: Option<String>,
    /// 커뮤니티 버전
    pub community_version: String,
    /// 커뮤니티 버전 프로퍼티 이름
    pub community_version_property: String,
    /// BOM 모듈
    pub bom_module: Option<Ga>,

    /// 필수 루트
    pub roots: GavSet,
    /// 프로파일 수락 술어
    pub profile_filter: ProfileFilter,
    /// 억제 링크 마커
    pub marker: String,
    /// 제외 매니페스트 경로 (트리 루트 기준)
    pub manifest: PathBuf,
    /// 컴포넌트 모듈 경로 접두사
    pub component_path_prefixes: Vec<String>,
    /// 제외 모듈 빌드 출력 정리 여부
    pub clean_excluded_output: bool,

    /// BOM 평탄화 활성화 여부
    pub flatten: bool,
    /// 해석 진입점
    pub entry_points: GavSet,
    /// 제외할 선언 출처 BOM
    pub origin_excludes: GavSet,
    /// 전체 BOM 출력 경로
    pub full_output: PathBuf,
    /// 주석 포함 축소 BOM 출력 경로
    pub reduced_verbose_output: PathBuf,
    /// 축소 BOM 출력 경로
    pub reduced_output: PathBuf,

    /// 감사 모드
    pub banned_mode: AuditMode,
    /// `classpath:` 해석 디렉토리 (트리 루트 기준)
    pub resource_dirs: Vec<PathBuf>,
    /// 규칙 리소스
    pub banned_resources: Vec<BannedResourceConfig>,

    /// 실패 정책
    pub failure_policy: FailurePolicy,
    /// 검사 스위치
    pub checks: CheckToggles,
    /// 디플로이먼트 접미사
    pub deployment_suffix: String,

    /// 로컬 저장소 경로
    pub local_repository: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            descriptor: "pom.xml".to_owned(),
            encoding: "UTF-8".to_owned(),
            tracked_group: String::new(),
            community_group: None,
            own_version: None,
            community_version: String::new(),
            community_version_property: "community.version".to_owned(),
            bom_module: None,
            roots: GavSet::none(),
            profile_filter: ProfileFilter::new(),
            marker: DEFAULT_MARKER.to_owned(),
            manifest: PathBuf::from("product/src/main/generated/excludes.txt"),
            component_path_prefixes: vec!["extensions/".to_owned()],
            clean_excluded_output: true,
            flatten: false,
            entry_points: GavSet::none(),
            origin_excludes: GavSet::none(),
            full_output: PathBuf::from("poms/bom/src/main/generated/flattened-full-pom.xml"),
            reduced_verbose_output: PathBuf::from(
                "poms/bom/src/main/generated/flattened-reduced-verbose-pom.xml",
            ),
            reduced_output: PathBuf::from("poms/bom/src/main/generated/flattened-reduced-pom.xml"),
            banned_mode: AuditMode::Report,
            resource_dirs: Vec::new(),
            banned_resources: Vec::new(),
            failure_policy: FailurePolicy::Fail,
            checks: CheckToggles::default(),
            deployment_suffix: "-deployment".to_owned(),
            local_repository: default_local_repository(),
        }
    }
}

impl EngineConfig {
    /// core 설정에서 엔진 설정을 만듭니다.
    ///
    /// 상대 경로인 `project.root`는 `base_dir` 기준으로 해석합니다.
    pub fn from_core(core: &ProdtreeConfig, base_dir: &Path) -> Result<Self, EngineError> {
        let project = &core.project;
        let non_empty = |s: &str| (!s.trim().is_empty()).then(|| s.trim().to_owned());

        let bom_module = non_empty(&project.bom_module)
            .map(|s| Ga::parse(&s))
            .transpose()
            .map_err(|e| EngineError::config("project.bom_module", e.to_string()))?;
        let roots = GavSet::parse(&core.closure.roots, &core.closure.root_excludes)
            .map_err(|e| EngineError::config("closure.roots", e.to_string()))?;
        let entry_points = GavSet::parse(&core.flatten.entry_points, &core.flatten.entry_point_excludes)
            .map_err(|e| EngineError::config("flatten.entry_points", e.to_string()))?;
        let no_excludes: Vec<String> = Vec::new();
        let origin_excludes = GavSet::parse(&core.flatten.origin_excludes, &no_excludes)
            .map_err(|e| EngineError::config("flatten.origin_excludes", e.to_string()))?;
        let failure_policy = core
            .checks
            .failure_policy
            .parse::<FailurePolicy>()
            .map_err(|e| EngineError::config("checks.failure_policy", e.to_string()))?;
        let banned_mode = core.banned.mode.parse::<AuditMode>()?;

        let profile_filter = if core.closure.all_profiles {
            ProfileFilter::all()
        } else {
            ProfileFilter::new()
        }
        .with_profiles(&core.closure.profiles)
        .with_properties(core.closure.activation_properties.clone());

        let root_dir = {
            let root = Path::new(&project.root);
            if root.is_absolute() {
                root.to_path_buf()
            } else {
                base_dir.join(root)
            }
        };
        let local_repository = match non_empty(&core.resolver.local_repository) {
            Some(path) => PathBuf::from(path),
            None => default_local_repository(),
        };

        let config = Self {
            root_dir,
            descriptor: project.descriptor.clone(),
            encoding: project.encoding.clone(),
            tracked_group: project.tracked_group.clone(),
            community_group: non_empty(&project.community_group),
            own_version: non_empty(&project.own_version),
            community_version: project.community_version.clone(),
            community_version_property: project.community_version_property.clone(),
            bom_module,
            roots,
            profile_filter,
            marker: core.closure.marker.clone(),
            manifest: PathBuf::from(&core.closure.manifest),
            component_path_prefixes: core.closure.component_path_prefixes.clone(),
            clean_excluded_output: core.closure.clean_excluded_output,
            flatten: core.flatten.enabled,
            entry_points,
            origin_excludes,
            full_output: PathBuf::from(&core.flatten.full_output),
            reduced_verbose_output: PathBuf::from(&core.flatten.reduced_verbose_output),
            reduced_output: PathBuf::from(&core.flatten.reduced_output),
            banned_mode,
            resource_dirs: core.banned.resource_dirs.iter().map(PathBuf::from).collect(),
            banned_resources: core.banned.resources.clone(),
            failure_policy,
            checks: CheckToggles {
                pairing: core.checks.pairing,
                staleness: core.checks.staleness,
                transitive_diff: core.checks.transitive_diff,
                version_alignment: core.checks.version_alignment,
            },
            deployment_suffix: core.checks.deployment_suffix.clone(),
            local_repository,
        };
        config.validate()?;
        Ok(config)
    }

    /// 루트 디스크립터 경로
    pub fn root_descriptor(&self) -> PathBuf {
        self.root_dir.join(&self.descriptor)
    }

    /// 트리 루트 기준 경로를 절대 경로로 만듭니다.
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.root_dir.join(relative)
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `tracked_group`, `community_version`, `marker`: 비어 있으면 안 됨
    /// - `roots`: 하나 이상
    /// - 출력 경로: 상대 경로이며 `..`를 포함하지 않음
    /// - `flatten`: 활성화 시 `bom_module` 필요
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.tracked_group.trim().is_empty() {
            return Err(EngineError::config("project.tracked_group", "must not be empty"));
        }
        if self.community_version.trim().is_empty() {
            return Err(EngineError::config("project.community_version", "must not be empty"));
        }
        if self.marker.trim().is_empty() || self.marker.contains("--") {
            return Err(EngineError::config(
                "closure.marker",
                "must be non-empty and must not contain '--'",
            ));
        }
        if self.roots.is_empty() {
            return Err(EngineError::config("closure.roots", "at least one root pattern required"));
        }
        if self.flatten && self.bom_module.is_none() {
            return Err(EngineError::config(
                "project.bom_module",
                "required when flatten is enabled",
            ));
        }

        for (field, path) in [
            ("closure.manifest", &self.manifest),
            ("flatten.full_output", &self.full_output),
            ("flatten.reduced_verbose_output", &self.reduced_verbose_output),
            ("flatten.reduced_output", &self.reduced_output),
        ] {
            if path.as_os_str().is_empty()
                || path.is_absolute()
                || path.components().any(|c| c == Component::ParentDir)
            {
                return Err(EngineError::config(
                    field,
                    format!("'{}' must be a relative path without '..'", path.display()),
                ));
            }
        }
        Ok(())
    }
}

fn default_local_repository() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".m2")
        .join("repository")
}

/// [`EngineConfig`] 빌더
///
/// 유연한 설정 구성 및 빌드 시 유효성 검증을 제공합니다.
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 트리 루트 디렉토리를 설정합니다.
    pub fn root_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.root_dir = dir.into();
        self
    }

    /// 제품화 대상 groupId를 설정합니다.
    pub fn tracked_group(mut self, group: impl Into<String>) -> Self {
        self.config.tracked_group = group.into();
        self
    }

    /// 커뮤니티 groupId를 설정합니다.
    pub fn community_group(mut self, group: impl Into<String>) -> Self {
        self.config.community_group = Some(group.into());
        self
    }

    /// 자체 버전을 설정합니다.
    pub fn own_version(mut self, version: impl Into<String>) -> Self {
        self.config.own_version = Some(version.into());
        self
    }

    /// 커뮤니티 버전을 설정합니다.
    pub fn community_version(mut self, version: impl Into<String>) -> Self {
        self.config.community_version = version.into();
        self
    }

    /// 커뮤니티 버전 프로퍼티 이름을 설정합니다.
    pub fn community_version_property(mut self, name: impl Into<String>) -> Self {
        self.config.community_version_property = name.into();
        self
    }

    /// BOM 모듈을 설정하고 평탄화를 활성화합니다.
    pub fn bom_module(mut self, ga: Ga) -> Self {
        self.config.bom_module = Some(ga);
        self.config.flatten = true;
        self
    }

    /// 평탄화 활성화 여부를 설정합니다.
    pub fn flatten(mut self, enabled: bool) -> Self {
        self.config.flatten = enabled;
        self
    }

    /// 루트 패턴을 설정합니다. 잘못된 패턴은 `build()`에서 보고됩니다.
    pub fn roots<S: AsRef<str>>(mut self, patterns: &[S]) -> Self {
        let no_excludes: [&str; 0] = [];
        let patterns: Vec<&str> = patterns.iter().map(|s| s.as_ref()).collect();
        self.config.roots = GavSet::parse(&patterns, &no_excludes).unwrap_or_default();
        self
    }

    /// 진입점 패턴을 설정합니다.
    pub fn entry_points(mut self, set: GavSet) -> Self {
        self.config.entry_points = set;
        self
    }

    /// 프로파일 필터를 설정합니다.
    pub fn profile_filter(mut self, filter: ProfileFilter) -> Self {
        self.config.profile_filter = filter;
        self
    }

    /// 억제 링크 마커를 설정합니다.
    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.config.marker = marker.into();
        self
    }

    /// 감사 모드를 설정합니다.
    pub fn banned_mode(mut self, mode: AuditMode) -> Self {
        self.config.banned_mode = mode;
        self
    }

    /// 규칙 리소스를 추가합니다.
    pub fn banned_resource(mut self, resource: BannedResourceConfig) -> Self {
        self.config.banned_resources.push(resource);
        self
    }

    /// 실패 정책을 설정합니다.
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    /// 검사 스위치를 설정합니다.
    pub fn checks(mut self, checks: CheckToggles) -> Self {
        self.config.checks = checks;
        self
    }

    /// 로컬 저장소 경로를 설정합니다.
    pub fn local_repository(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.local_repository = path.into();
        self
    }

    /// 빌드 출력 정리 여부를 설정합니다.
    pub fn clean_excluded_output(mut self, clean: bool) -> Self {
        self.config.clean_excluded_output = clean;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `EngineError::Config` 반환
    pub fn build(self) -> Result<EngineConfig, EngineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core() -> ProdtreeConfig {
        let mut c = ProdtreeConfig::default();
        c.project.tracked_group = "org.acme".to_owned();
        c.project.community_version = "3.2.0".to_owned();
        c.project.community_version_property = "acme-community.version".to_owned();
        c.project.bom_module = "org.acme:acme-bom".to_owned();
        c.closure.roots = vec!["org.acme:acme-product".to_owned()];
        c.flatten.entry_points = vec!["org.acme:*".to_owned()];
        c
    }

    #[test]
    fn from_core_converts_types() {
        let config = EngineConfig::from_core(&core(), Path::new("/work")).unwrap();
        assert!(config.root_descriptor().starts_with("/work"));
        assert!(config.root_descriptor().ends_with("pom.xml"));
        assert_eq!(config.bom_module, Some(Ga::new("org.acme", "acme-bom")));
        assert!(config.roots.contains_ga(&Ga::new("org.acme", "acme-product")));
        assert!(config.entry_points.contains_ga(&Ga::new("org.acme", "x")));
        assert_eq!(config.failure_policy, FailurePolicy::Fail);
        assert_eq!(config.banned_mode, AuditMode::Report);
        assert!(config.community_group.is_none());
    }

    #[test]
    fn from_core_rejects_unknown_mode() {
        let mut c = core();
        c.banned.mode = "repair".to_owned();
        assert!(EngineConfig::from_core(&c, Path::new("/")).is_err());
    }

    #[test]
    fn flatten_requires_bom_module() {
        let mut c = core();
        c.project.bom_module = String::new();
        let err = EngineConfig::from_core(&c, Path::new("/")).unwrap_err();
        assert!(err.to_string().contains("bom_module"));
    }

    #[test]
    fn builder_validates() {
        assert!(EngineConfigBuilder::new().build().is_err());
        let config = EngineConfigBuilder::new()
            .tracked_group("g")
            .community_version("1")
            .roots(&["g:*"])
            .build()
            .unwrap();
        assert!(!config.flatten);
    }

    #[test]
    fn output_paths_must_stay_in_tree() {
        let mut config = EngineConfigBuilder::new()
            .tracked_group("g")
            .community_version("1")
            .roots(&["g:*"])
            .build()
            .unwrap();
        config.manifest = PathBuf::from("../escape.txt");
        assert!(config.validate().is_err());
    }
}
