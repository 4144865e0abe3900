//! 설정 관리 -- prodtree.toml 파싱 및 런타임 설정
//!
//! [`ProdtreeConfig`]는 모든 컴포넌트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`PRODTREE_CHECKS_FAILURE_POLICY=warn` 형식)
//! 3. 설정 파일 (`prodtree.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), prodtree_core::error::ProdtreeError> {
//! use prodtree_core::config::ProdtreeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = ProdtreeConfig::load("prodtree.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = ProdtreeConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ProdtreeError};
use crate::ga::Ga;
use crate::pattern::GavPattern;
use crate::policy::FailurePolicy;

/// 기본 모듈 링크 억제 마커
pub const DEFAULT_MARKER: &str = "prodtree:excluded";

/// prodtree 통합 설정
///
/// `prodtree.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 컴포넌트는 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProdtreeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 소스 트리 및 버전 설정
    #[serde(default)]
    pub project: ProjectConfig,
    /// 클로저/모듈 링크 설정
    #[serde(default)]
    pub closure: ClosureConfig,
    /// BOM 평탄화 설정
    #[serde(default)]
    pub flatten: FlattenConfig,
    /// 배제 의존성 감사 설정
    #[serde(default)]
    pub banned: BannedConfig,
    /// 일관성 검사 설정
    #[serde(default)]
    pub checks: ChecksConfig,
    /// 아티팩트 해석기 설정
    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl ProdtreeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ProdtreeError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음, 검증 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ProdtreeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProdtreeError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ProdtreeError::io(path, e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, ProdtreeError> {
        toml::from_str(toml_str).map_err(|e| {
            ProdtreeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `PRODTREE_{SECTION}_{FIELD}`
    /// 예: `PRODTREE_PROJECT_COMMUNITY_VERSION=3.2.0`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "PRODTREE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "PRODTREE_GENERAL_LOG_FORMAT");

        // Project
        override_string(&mut self.project.root, "PRODTREE_PROJECT_ROOT");
        override_string(
            &mut self.project.tracked_group,
            "PRODTREE_PROJECT_TRACKED_GROUP",
        );
        override_string(
            &mut self.project.community_group,
            "PRODTREE_PROJECT_COMMUNITY_GROUP",
        );
        override_string(&mut self.project.own_version, "PRODTREE_PROJECT_OWN_VERSION");
        override_string(
            &mut self.project.community_version,
            "PRODTREE_PROJECT_COMMUNITY_VERSION",
        );
        override_string(&mut self.project.bom_module, "PRODTREE_PROJECT_BOM_MODULE");

        // Closure
        override_csv(&mut self.closure.roots, "PRODTREE_CLOSURE_ROOTS");
        override_csv(&mut self.closure.profiles, "PRODTREE_CLOSURE_PROFILES");
        override_bool(&mut self.closure.all_profiles, "PRODTREE_CLOSURE_ALL_PROFILES");
        override_string(&mut self.closure.manifest, "PRODTREE_CLOSURE_MANIFEST");

        // Flatten
        override_bool(&mut self.flatten.enabled, "PRODTREE_FLATTEN_ENABLED");
        override_csv(
            &mut self.flatten.entry_points,
            "PRODTREE_FLATTEN_ENTRY_POINTS",
        );

        // Banned
        override_string(&mut self.banned.mode, "PRODTREE_BANNED_MODE");

        // Checks
        override_string(
            &mut self.checks.failure_policy,
            "PRODTREE_CHECKS_FAILURE_POLICY",
        );

        // Resolver
        override_string(
            &mut self.resolver.local_repository,
            "PRODTREE_RESOLVER_LOCAL_REPOSITORY",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ProdtreeError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        // 디스크립터 인코딩은 UTF-8만 지원
        if !is_utf8_label(&self.project.encoding) {
            return Err(invalid(
                "project.encoding",
                format!("unsupported encoding '{}', only UTF-8", self.project.encoding),
            ));
        }

        if self.project.tracked_group.trim().is_empty() {
            return Err(invalid("project.tracked_group", "must not be empty"));
        }

        if self.project.community_version.trim().is_empty() {
            return Err(invalid("project.community_version", "must not be empty"));
        }

        if self.project.community_version_property.trim().is_empty() {
            return Err(invalid(
                "project.community_version_property",
                "must not be empty",
            ));
        }

        if !self.project.bom_module.is_empty() {
            Ga::parse(&self.project.bom_module)
                .map_err(|e| invalid("project.bom_module", e.to_string()))?;
        }

        // 클로저 루트
        if self.closure.roots.is_empty() {
            return Err(invalid(
                "closure.roots",
                "at least one root pattern is required",
            ));
        }
        validate_patterns(&self.closure.roots)?;
        validate_patterns(&self.closure.root_excludes)?;

        // XML 주석 안에 들어가므로 `--`를 허용하지 않음
        if self.closure.marker.trim().is_empty() || self.closure.marker.contains("--") {
            return Err(invalid(
                "closure.marker",
                "must be non-empty and must not contain '--'",
            ));
        }

        validate_relative_path("closure.manifest", &self.closure.manifest)?;

        // 평탄화
        if self.flatten.enabled {
            if self.project.bom_module.is_empty() {
                return Err(invalid(
                    "project.bom_module",
                    "required when flatten is enabled",
                ));
            }
            validate_relative_path("flatten.full_output", &self.flatten.full_output)?;
            validate_relative_path(
                "flatten.reduced_verbose_output",
                &self.flatten.reduced_verbose_output,
            )?;
            validate_relative_path("flatten.reduced_output", &self.flatten.reduced_output)?;
        }
        validate_patterns(&self.flatten.entry_points)?;
        validate_patterns(&self.flatten.entry_point_excludes)?;
        validate_patterns(&self.flatten.origin_excludes)?;

        // 배제 감사 모드
        let valid_modes = ["report", "fix"];
        if !valid_modes.contains(&self.banned.mode.as_str()) {
            return Err(invalid(
                "banned.mode",
                format!("must be one of: {}", valid_modes.join(", ")),
            ));
        }
        for (idx, resource) in self.banned.resources.iter().enumerate() {
            if resource.location.trim().is_empty() {
                return Err(invalid(
                    &format!("banned.resources[{idx}].location"),
                    "must not be empty",
                ));
            }
        }

        self.checks.failure_policy.parse::<FailurePolicy>()?;

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 소스 트리 및 버전 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// 소스 트리 루트 디렉토리
    pub root: String,
    /// 루트 디스크립터 파일명
    pub descriptor: String,
    /// 디스크립터 인코딩 (UTF-8만 지원)
    pub encoding: String,
    /// 제품화 대상 groupId
    pub tracked_group: String,
    /// 커뮤니티 groupId (비어 있으면 사용 안 함)
    pub community_group: String,
    /// 자체 버전 리터럴 (비어 있으면 루트 디스크립터 버전)
    pub own_version: String,
    /// 커뮤니티 버전 리터럴
    pub community_version: String,
    /// 커뮤니티 버전을 담는 프로퍼티 이름
    pub community_version_property: String,
    /// BOM 모듈 식별자 (`groupId:artifactId`)
    pub bom_module: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: ".".to_owned(),
            descriptor: "pom.xml".to_owned(),
            encoding: "UTF-8".to_owned(),
            tracked_group: String::new(),
            community_group: String::new(),
            own_version: String::new(),
            community_version: String::new(),
            community_version_property: "community.version".to_owned(),
            bom_module: String::new(),
        }
    }
}

/// 클로저/모듈 링크 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClosureConfig {
    /// 필수 루트 패턴
    pub roots: Vec<String>,
    /// 루트에서 제외할 패턴
    pub root_excludes: Vec<String>,
    /// 활성화할 프로파일 id
    pub profiles: Vec<String>,
    /// 모든 프로파일 수락 여부
    pub all_profiles: bool,
    /// 억제된 모듈 링크 마커
    pub marker: String,
    /// 제외 매니페스트 경로 (트리 루트 기준)
    pub manifest: String,
    /// 컴포넌트 모듈 경로 접두사
    pub component_path_prefixes: Vec<String>,
    /// 제외 모듈 빌드 출력 삭제 여부
    pub clean_excluded_output: bool,
    /// 프로파일 활성화 판정에 쓰는 시스템 프로퍼티
    pub activation_properties: BTreeMap<String, String>,
}

impl Default for ClosureConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            root_excludes: Vec::new(),
            profiles: Vec::new(),
            all_profiles: false,
            marker: DEFAULT_MARKER.to_owned(),
            manifest: "product/src/main/generated/excludes.txt".to_owned(),
            component_path_prefixes: vec!["extensions/".to_owned()],
            clean_excluded_output: true,
            activation_properties: BTreeMap::new(),
        }
    }
}

/// BOM 평탄화 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 해석 진입점 패턴
    pub entry_points: Vec<String>,
    /// 진입점에서 제외할 패턴
    pub entry_point_excludes: Vec<String>,
    /// 제외할 선언 출처 BOM 패턴
    pub origin_excludes: Vec<String>,
    /// 전체 BOM 출력 경로
    pub full_output: String,
    /// 주석 포함 축소 BOM 출력 경로
    pub reduced_verbose_output: String,
    /// 축소 BOM 출력 경로
    pub reduced_output: String,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            entry_points: Vec::new(),
            entry_point_excludes: Vec::new(),
            origin_excludes: Vec::new(),
            full_output: "poms/bom/src/main/generated/flattened-full-pom.xml".to_owned(),
            reduced_verbose_output: "poms/bom/src/main/generated/flattened-reduced-verbose-pom.xml"
                .to_owned(),
            reduced_output: "poms/bom/src/main/generated/flattened-reduced-pom.xml".to_owned(),
        }
    }
}

/// 배제 규칙 리소스 하나
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannedResourceConfig {
    /// 규칙 문서 위치 (`classpath:` 접두사 또는 파일 경로)
    pub location: String,
    /// 선택적 필터 문서 위치
    #[serde(default)]
    pub filter: Option<String>,
}

/// 배제 의존성 감사 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BannedConfig {
    /// 동작 모드 (report, fix)
    pub mode: String,
    /// `classpath:` 위치를 해석할 디렉토리 (트리 루트 기준)
    pub resource_dirs: Vec<String>,
    /// 규칙 리소스 목록
    pub resources: Vec<BannedResourceConfig>,
}

impl Default for BannedConfig {
    fn default() -> Self {
        Self {
            mode: "report".to_owned(),
            resource_dirs: vec!["product/src/main/resources".to_owned()],
            resources: Vec::new(),
        }
    }
}

/// 일관성 검사 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecksConfig {
    /// 실패 정책 (fail, warn, ignore)
    pub failure_policy: String,
    /// 런타임/디플로이먼트 짝 검사
    pub pairing: bool,
    /// 오래된 관리 항목 검사
    pub staleness: bool,
    /// 전이 의존성 vs 관리 목록 비교
    pub transitive_diff: bool,
    /// 제품화/커뮤니티 버전 정합성 검사
    pub version_alignment: bool,
    /// 디플로이먼트 아티팩트 접미사
    pub deployment_suffix: String,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            failure_policy: "fail".to_owned(),
            pairing: true,
            staleness: true,
            transitive_diff: true,
            version_alignment: true,
            deployment_suffix: "-deployment".to_owned(),
        }
    }
}

/// 아티팩트 해석기 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// 로컬 저장소 경로 (비어 있으면 `$HOME/.m2/repository`)
    pub local_repository: String,
}

fn invalid(field: &str, reason: impl Into<String>) -> ProdtreeError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

fn validate_patterns(patterns: &[String]) -> Result<(), ProdtreeError> {
    for p in patterns {
        GavPattern::parse(p)?;
    }
    Ok(())
}

fn validate_relative_path(field: &str, value: &str) -> Result<(), ProdtreeError> {
    let path = Path::new(value);
    if value.trim().is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    if path.is_absolute() {
        return Err(invalid(field, "must be relative to the tree root"));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(invalid(field, "path traversal ('..') is not allowed"));
    }
    Ok(())
}

fn is_utf8_label(encoding: &str) -> bool {
    matches!(encoding.to_lowercase().as_str(), "utf-8" | "utf8")
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
