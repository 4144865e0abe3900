//! 오케스트레이터 -- 트리 단계와 BOM 단계 실행
//!
//! [`ProdEngine`]은 두 단계를 순서대로 실행합니다. 각 단계는 필요한 모든 편집과
//! 생성 파일을 메모리에서 먼저 계산하고, 치명적 에러가 없을 때만 디스크에 씁니다.
//!
//! # 내부 아키텍처
//!
//! ```text
//! tree phase:
//!   ModuleGraph --> select_roots --> required_closure --> complement
//!        |                                  |                 |
//!        +--> plan_links ------------------ + --> manifest    +--> clean_excluded
//!        +--> VersionStyleClassifier::plan
//!                     |
//!                     v
//!            DescriptorEditor::render --> write_if_changed
//!
//! BOM phase:
//!   ModuleGraph --> raw_constraints --> flatten --> render x3 --> write_if_changed
//!                                          |
//!                                          +--> drift
//!                                          +--> banned audit (fix edits)
//!                                          +--> checks --> FailurePolicy
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, info_span};

use prodtree_core::{Ga, Gav, PolicyViolation};
use prodtree_pom::{DescriptorEditor, ExpressionEvaluator, ModuleGraph, Transformation};

use crate::banned::{self, AuditMode, BannedRules, RuleDocumentLoader};
use crate::checks;
use crate::closure::{complement, required_closure, select_roots};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::excludes::{self, CleanupReport};
use crate::files::{read_optional, write_if_changed};
use crate::flatten::{self, Drift};
use crate::resolver::{ArtifactResolver, LocalRepositoryResolver};
use crate::version_style::{StyleContext, VersionStyleClassifier};

/// 트리 단계 결과
#[derive(Debug, Clone, Default, Serialize)]
pub struct TreeReport {
    /// 트리의 모듈 수
    pub modules: usize,
    /// 선택된 루트
    pub roots: Vec<String>,
    /// 필수 모듈 수
    pub required: usize,
    /// 배제된 모듈
    pub excluded: Vec<String>,
    /// 다시 링크된 모듈
    pub relinked: Vec<String>,
    /// 새로 억제된 모듈
    pub unlinked: Vec<String>,
    /// 버전 스타일이 판정된 모듈 수
    pub styled_modules: usize,
    /// 계산된 편집 수
    pub edits: usize,
    /// 실제로 바뀐 디스크립터
    pub descriptors_written: Vec<PathBuf>,
    /// 매니페스트를 새로 썼는지 여부
    pub manifest_written: bool,
    /// 빌드 출력 정리 결과
    pub cleanup: CleanupReport,
}

/// BOM 단계 결과
#[derive(Debug, Clone, Default, Serialize)]
pub struct BomReport {
    /// BOM 좌표
    pub bom: String,
    /// 전체 항목 수
    pub constraints: usize,
    /// 축소 항목 수
    pub reduced: usize,
    /// 해석한 진입점
    pub entry_points: Vec<String>,
    /// 실제로 바뀐 파일
    pub files_written: Vec<PathBuf>,
    /// 이전 축소 BOM 대비 변화
    pub drift: Drift,
    /// `진입점 -> 금지 아티팩트`
    pub banned: Vec<String>,
    /// fix 모드에서 추가한 exclusion 수
    pub exclusions_added: usize,
    /// 정책에 넘긴 위반 (warn/ignore로 통과된 것 포함)
    pub violations: Vec<PolicyViolation>,
}

/// 한 번의 실행 결과
#[derive(Debug, Clone, Serialize)]
pub struct ProdReport {
    /// 로그 연계용 실행 id
    pub run_id: String,
    /// 트리 단계 결과
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree: Option<TreeReport>,
    /// BOM 단계 결과
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bom: Option<BomReport>,
}

/// 제품화 엔진
///
/// 상태를 갖지 않으며, 모든 호출은 디스크의 트리를 새로 읽습니다.
pub struct ProdEngine {
    config: EngineConfig,
    resolver: Option<Box<dyn ArtifactResolver>>,
}

impl ProdEngine {
    /// 설정으로 엔진을 만듭니다. 해석기는 로컬 저장소 해석기를 씁니다.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            resolver: None,
        }
    }

    /// 빌더를 반환합니다.
    pub fn builder() -> ProdEngineBuilder {
        ProdEngineBuilder::new()
    }

    /// 엔진 설정
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 트리 단계와 (평탄화가 켜져 있으면) BOM 단계를 실행합니다.
    pub fn run(&self) -> Result<ProdReport, EngineError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let _span = info_span!("run", run_id = %run_id).entered();

        let tree = self.run_tree_phase()?;
        let bom = if self.config.flatten {
            Some(self.run_bom_phase()?)
        } else {
            info!("flattening disabled, BOM phase skipped");
            None
        };
        Ok(ProdReport {
            run_id,
            tree: Some(tree),
            bom,
        })
    }

    /// 트리 단계만 실행합니다.
    pub fn run_excludes(&self) -> Result<ProdReport, EngineError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let _span = info_span!("excludes", run_id = %run_id).entered();
        Ok(ProdReport {
            run_id,
            tree: Some(self.run_tree_phase()?),
            bom: None,
        })
    }

    /// BOM 단계만 실행합니다.
    pub fn run_flatten(&self) -> Result<ProdReport, EngineError> {
        if !self.config.flatten {
            return Err(EngineError::config("flatten.enabled", "flattening is disabled"));
        }
        let run_id = uuid::Uuid::new_v4().to_string();
        let _span = info_span!("flatten", run_id = %run_id).entered();
        Ok(ProdReport {
            run_id,
            tree: None,
            bom: Some(self.run_bom_phase()?),
        })
    }

    fn parse_graph(&self) -> Result<(ModuleGraph, ExpressionEvaluator), EngineError> {
        let graph = ModuleGraph::parse(self.config.root_descriptor())?;
        let evaluator = graph.expression_evaluator(&self.config.profile_filter)?;
        Ok((graph, evaluator))
    }

    fn own_version(&self, graph: &ModuleGraph, evaluator: &ExpressionEvaluator) -> Result<String, EngineError> {
        if let Some(version) = &self.config.own_version {
            return Ok(version.clone());
        }
        let root = graph
            .root()
            .ok_or_else(|| EngineError::config("project.root", "tree has no root module"))?;
        Ok(evaluator.evaluate(&root.ga, "${project.version}")?)
    }

    fn style_context(&self, own_version: String) -> StyleContext {
        StyleContext {
            tracked_group: self.config.tracked_group.clone(),
            community_group: self.config.community_group.clone(),
            own_version,
            community_version: self.config.community_version.clone(),
            community_property: self.config.community_version_property.clone(),
            bom_module: self.config.bom_module.clone(),
        }
    }

    fn required_set(
        &self,
        graph: &ModuleGraph,
        evaluator: &ExpressionEvaluator,
    ) -> Result<(BTreeSet<Ga>, BTreeSet<Ga>), EngineError> {
        let roots = select_roots(graph, &self.config.roots)?;
        let required = required_closure(graph, &roots, &self.config.profile_filter, evaluator)?;
        Ok((roots, required))
    }

    /// 트리 단계: 링크, 버전 스타일, 매니페스트, 빌드 출력 정리
    pub fn run_tree_phase(&self) -> Result<TreeReport, EngineError> {
        let (graph, evaluator) = self.parse_graph()?;
        let relinked = graph.relinked(&self.config.marker);
        let (roots, required) = self.required_set(&relinked, &evaluator)?;
        let excluded = complement(&relinked, &required);

        let links = excludes::plan_links(&graph, &required, &self.config.marker);
        let ctx = self.style_context(self.own_version(&graph, &evaluator)?);
        let versions = VersionStyleClassifier::new(&evaluator, &ctx).plan(&graph, &required)?;

        let mut edits: BTreeMap<PathBuf, Vec<Transformation>> = BTreeMap::new();
        for (descriptor, list) in links.edits.iter().chain(versions.edits.iter()) {
            edits.entry(descriptor.clone()).or_default().extend(list.iter().cloned());
        }
        let edit_count = edits.values().map(Vec::len).sum();
        let rendered = render_edits(&edits, &self.config.encoding)?;
        let manifest = excludes::manifest_text(&excluded);
        if self.config.clean_excluded_output {
            excludes::check_community_artifacts(&graph, &excluded, &self.config)?;
        }

        let mut report = TreeReport {
            modules: graph.len(),
            roots: roots.iter().map(Ga::to_string).collect(),
            required: required.len(),
            excluded: excluded.iter().map(Ga::to_string).collect(),
            relinked: links.relinked.iter().map(Ga::to_string).collect(),
            unlinked: links.unlinked.iter().map(Ga::to_string).collect(),
            styled_modules: versions.styles.len(),
            edits: edit_count,
            ..TreeReport::default()
        };
        for (path, text) in rendered {
            if write_if_changed(&path, &text)? {
                report.descriptors_written.push(path);
            }
        }
        report.manifest_written = write_if_changed(&self.config.resolve(&self.config.manifest), &manifest)?;
        if self.config.clean_excluded_output {
            report.cleanup = excludes::clean_excluded(&graph, &excluded, &self.config)?;
        }

        info!(
            required = report.required,
            excluded = report.excluded.len(),
            descriptors_written = report.descriptors_written.len(),
            manifest_written = report.manifest_written,
            "tree phase finished"
        );
        Ok(report)
    }

    /// BOM 단계: 평탄화, 변화 감지, 감사, 일관성 검사
    pub fn run_bom_phase(&self) -> Result<BomReport, EngineError> {
        let config = &self.config;
        let bom_ga = config
            .bom_module
            .clone()
            .ok_or_else(|| EngineError::config("project.bom_module", "required when flatten is enabled"))?;

        let (graph, evaluator) = self.parse_graph()?;
        let bom_module = graph.module(&bom_ga).ok_or_else(|| {
            EngineError::config("project.bom_module", format!("{bom_ga} is not a module of the tree"))
        })?;
        let bom = Gav::new(
            bom_ga.group_id.clone(),
            bom_ga.artifact_id.clone(),
            Some(evaluator.evaluate(&bom_ga, "${project.version}")?),
        );
        let own_version = self.own_version(&graph, &evaluator)?;
        let (_, required) = self.required_set(&graph, &evaluator)?;

        let local;
        let resolver: &dyn ArtifactResolver = match &self.resolver {
            Some(resolver) => resolver.as_ref(),
            None => {
                local = LocalRepositoryResolver::new(config.local_repository.clone()).with_workspace(&graph);
                &local
            }
        };

        let raw = flatten::raw_constraints(resolver, &bom, &config.origin_excludes)?;
        let result = flatten::flatten(resolver, &bom, raw, &config.entry_points)?;

        let reduced_path = config.resolve(&config.reduced_output);
        let previous = read_optional(&reduced_path)?;
        let drift = flatten::drift::detect(
            &reduced_path.display().to_string(),
            previous.as_deref(),
            &result.reduced_constraints,
        )?;
        if drift.baseline && !drift.is_empty() {
            info!(
                added = drift.added.len(),
                removed = drift.removed.len(),
                changed = drift.changed.len(),
                "reduced BOM drift detected"
            );
        }

        let rules = BannedRules::new(
            RuleDocumentLoader::new(&config.root_dir, &config.resource_dirs),
            &config.banned_resources,
        );
        let violations = if rules.is_empty() {
            BTreeMap::new()
        } else {
            banned::audit(&result.resolved_by_entry_point, &rules)?
        };
        let fix = if config.banned_mode == AuditMode::Fix && !violations.is_empty() {
            banned::fix_edits(bom_module, &evaluator, &violations)?
        } else {
            Vec::new()
        };
        let exclusions_added = fix.len();
        let mut descriptor_edits = BTreeMap::new();
        if !fix.is_empty() {
            descriptor_edits.insert(bom_module.descriptor.clone(), fix);
        }
        let rendered = render_edits(&descriptor_edits, &config.encoding)?;

        let mut diagnostics: Vec<PolicyViolation> = Vec::new();
        diagnostics.extend(banned::diagnostic(&violations));
        let modules = graph.module_identities();
        let entries = checks::bom_entries(bom_module, &evaluator)?;
        if config.checks.pairing {
            diagnostics.extend(checks::pairing(
                &entries,
                &modules,
                &config.tracked_group,
                &config.deployment_suffix,
            ));
        }
        if config.checks.staleness {
            diagnostics.extend(checks::staleness(&entries, &modules, &config.tracked_group, &own_version));
        }
        if config.checks.transitive_diff {
            diagnostics.extend(checks::transitive_diff(
                &result.all_required(),
                &result.constraints,
                &config.tracked_group,
            ));
        }
        if config.checks.version_alignment {
            diagnostics.extend(checks::version_alignment(
                &result.constraints,
                &modules,
                &required,
                &config.tracked_group,
                &own_version,
                &config.community_version,
            ));
        }

        let mut report = BomReport {
            bom: bom.to_string(),
            constraints: result.constraints.len(),
            reduced: result.reduced_constraints.len(),
            entry_points: result.transitives_by_entry_point.keys().map(Ga::to_string).collect(),
            drift,
            banned: violations
                .iter()
                .flat_map(|(entry_point, banned)| banned.iter().map(move |ga| format!("{entry_point} -> {ga}")))
                .collect(),
            exclusions_added,
            violations: diagnostics.clone(),
            ..BomReport::default()
        };
        for (path, text) in [
            (config.resolve(&config.full_output), &result.full),
            (config.resolve(&config.reduced_verbose_output), &result.reduced_verbose),
            (reduced_path, &result.reduced),
        ] {
            if write_if_changed(&path, text)? {
                report.files_written.push(path);
            }
        }
        for (path, text) in rendered {
            if write_if_changed(&path, &text)? {
                report.files_written.push(path);
            }
        }
        info!(
            bom = %report.bom,
            constraints = report.constraints,
            reduced = report.reduced,
            files_written = report.files_written.len(),
            "BOM phase finished"
        );

        for violation in diagnostics {
            config.failure_policy.enforce(violation)?;
        }
        Ok(report)
    }
}

/// 디스크립터별 편집을 렌더링합니다. 내용이 바뀌는 디스크립터만 돌려줍니다.
fn render_edits(
    edits: &BTreeMap<PathBuf, Vec<Transformation>>,
    encoding: &str,
) -> Result<Vec<(PathBuf, String)>, EngineError> {
    let mut rendered = Vec::new();
    for (path, list) in edits {
        let mut editor = DescriptorEditor::open(path, encoding)?;
        for edit in list {
            editor.queue(edit.clone());
        }
        let text = editor.render()?;
        if text != editor.original() {
            debug!(path = %path.display(), edits = editor.queued().len(), "descriptor edits rendered");
            rendered.push((path.clone(), text));
        }
    }
    Ok(rendered)
}

/// [`ProdEngine`] 빌더
pub struct ProdEngineBuilder {
    config: EngineConfig,
    resolver: Option<Box<dyn ArtifactResolver>>,
}

impl ProdEngineBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            resolver: None,
        }
    }

    /// 엔진 설정을 지정합니다.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// 아티팩트 해석기를 지정합니다.
    ///
    /// 지정하지 않으면 BOM 단계마다 트리 모듈과 로컬 저장소를 읽는 해석기를 만듭니다.
    pub fn resolver(mut self, resolver: Box<dyn ArtifactResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// 설정을 검증하고 엔진을 빌드합니다.
    pub fn build(self) -> Result<ProdEngine, EngineError> {
        self.config.validate()?;
        Ok(ProdEngine {
            config: self.config,
            resolver: self.resolver,
        })
    }
}

impl Default for ProdEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
