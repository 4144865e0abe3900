//! 디스크립터 편집 -- 주석과 서식을 보존하는 부분 치환
//!
//! 변환은 [`DescriptorEditor`]에 쌓였다가 [`DescriptorEditor::render`]에서 한 번에
//! 원본 텍스트에 적용됩니다. 각 변환은 roxmltree 노드의 바이트 범위를 기준으로
//! 한 조각(splice)을 만들며, 조각은 뒤에서부터 적용하므로 앞쪽 오프셋이 흔들리지 않습니다.
//! 편집하지 않은 바이트는 그대로 유지됩니다.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use serde::Serialize;
use tracing::{debug, info};

use prodtree_core::Ga;

use crate::error::PomError;
use crate::model::DependencyLocator;
use crate::parse::{child, child_text, children, parse_suppressed_link, render_suppressed_link};

/// 기본 들여쓰기 단위
const DEFAULT_INDENT: &str = "    ";

/// 디스크립터에 적용할 변환 하나
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transformation {
    /// 의존성 `<version>` 설정 (`None`이면 제거)
    SetDependencyVersion {
        /// 대상 의존성
        locator: DependencyLocator,
        /// 새 버전 원문
        version: Option<String>,
    },
    /// 기본 섹션 `<properties>`의 값 설정 (없으면 추가)
    SetProperty {
        /// 프로퍼티 이름
        name: String,
        /// 값
        value: String,
    },
    /// `<module>` 링크를 마커 주석으로 억제
    SuppressModule {
        /// 링크 경로
        path: String,
        /// 마커
        marker: String,
    },
    /// 마커 주석으로 억제된 링크를 복원
    ActivateModule {
        /// 링크 경로
        path: String,
        /// 마커
        marker: String,
    },
    /// 의존성에 `<exclusion>` 추가 (정렬 위치에 삽입)
    AddExclusion {
        /// 대상 의존성
        locator: DependencyLocator,
        /// 제외할 아티팩트
        exclusion: Ga,
    },
    /// `<parent><version>` 설정
    SetParentVersion {
        /// 새 버전
        version: String,
    },
}

impl fmt::Display for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetDependencyVersion {
                locator,
                version: Some(v),
            } => write!(f, "set version of {locator} to {v}"),
            Self::SetDependencyVersion {
                locator,
                version: None,
            } => write!(f, "remove version of {locator}"),
            Self::SetProperty { name, value } => write!(f, "set property {name} to {value}"),
            Self::SuppressModule { path, .. } => write!(f, "suppress module {path}"),
            Self::ActivateModule { path, .. } => write!(f, "activate module {path}"),
            Self::AddExclusion { locator, exclusion } => {
                write!(f, "exclude {exclusion} from {locator}")
            }
            Self::SetParentVersion { version } => write!(f, "set parent version to {version}"),
        }
    }
}

/// 원본 텍스트의 `[start, end)` 범위를 `text`로 바꾸는 조각
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Splice {
    start: usize,
    end: usize,
    text: String,
}

impl Splice {
    fn replace(range: std::ops::Range<usize>, text: impl Into<String>) -> Self {
        Self {
            start: range.start,
            end: range.end,
            text: text.into(),
        }
    }

    fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            start: at,
            end: at,
            text: text.into(),
        }
    }
}

/// 디스크립터 하나에 대한 편집 세션
#[derive(Debug, Clone)]
pub struct DescriptorEditor {
    path: PathBuf,
    text: String,
    queue: Vec<Transformation>,
}

impl DescriptorEditor {
    /// 디스크립터 파일을 엽니다. UTF-8 인코딩만 지원합니다.
    pub fn open(path: impl AsRef<Path>, encoding: &str) -> Result<Self, PomError> {
        let path = path.as_ref();
        if !encoding.eq_ignore_ascii_case("UTF-8") && !encoding.eq_ignore_ascii_case("UTF8") {
            return Err(PomError::Encoding {
                path: path.display().to_string(),
                encoding: encoding.to_owned(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|e| PomError::io(path, e))?;
        Ok(Self::from_text(path, text))
    }

    /// 메모리 상의 텍스트로 편집 세션을 만듭니다.
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            queue: Vec::new(),
        }
    }

    /// 디스크립터 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 원본 텍스트
    pub fn original(&self) -> &str {
        &self.text
    }

    /// 변환을 큐에 추가합니다. 동일한 변환은 한 번만 쌓입니다.
    pub fn queue(&mut self, transformation: Transformation) {
        if !self.queue.contains(&transformation) {
            self.queue.push(transformation);
        }
    }

    /// 쌓인 변환 목록
    pub fn queued(&self) -> &[Transformation] {
        &self.queue
    }

    /// 쌓인 변환을 원본 텍스트에 적용한 결과를 계산합니다.
    ///
    /// # Errors
    ///
    /// 대상 요소가 없거나, 같은 의존성에 서로 다른 버전이 지정되었거나,
    /// 조각이 겹치면 [`PomError::Edit`]를 반환합니다.
    pub fn render(&self) -> Result<String, PomError> {
        if self.queue.is_empty() {
            return Ok(self.text.clone());
        }
        let doc = Document::parse(&self.text).map_err(|e| PomError::Parse {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        let ctx = Context {
            text: &self.text,
            path: &self.path,
            project: doc.root_element(),
            unit: indent_unit(&self.text, doc.root_element()),
        };

        let mut versions: BTreeMap<&DependencyLocator, &Option<String>> = BTreeMap::new();
        let mut exclusions: BTreeMap<&DependencyLocator, Vec<&Ga>> = BTreeMap::new();
        let mut properties: Vec<(&str, &str)> = Vec::new();
        let mut splices = Vec::new();

        for t in &self.queue {
            match t {
                Transformation::SetDependencyVersion { locator, version } => {
                    if let Some(prev) = versions.insert(locator, version) {
                        if prev != version {
                            return Err(ctx.error(format!(
                                "conflicting versions for {locator}: {prev:?} and {version:?}"
                            )));
                        }
                    }
                }
                Transformation::AddExclusion { locator, exclusion } => {
                    exclusions.entry(locator).or_default().push(exclusion);
                }
                Transformation::SetProperty { name, value } => {
                    properties.push((name, value));
                }
                Transformation::SuppressModule { path, marker } => {
                    splices.extend(ctx.suppress_module(path, marker)?);
                }
                Transformation::ActivateModule { path, marker } => {
                    splices.extend(ctx.activate_module(path, marker)?);
                }
                Transformation::SetParentVersion { version } => {
                    splices.extend(ctx.set_parent_version(version)?);
                }
            }
        }
        for (locator, version) in versions {
            splices.extend(ctx.set_dependency_version(locator, version.as_deref())?);
        }
        for (locator, list) in exclusions {
            splices.extend(ctx.add_exclusions(locator, list)?);
        }
        splices.extend(ctx.set_properties(&properties)?);

        apply_splices(&self.text, splices).map_err(|reason| ctx.error(reason))
    }

    /// 변환을 적용하고 내용이 바뀌었으면 파일에 씁니다.
    ///
    /// 파일이 실제로 바뀌었으면 `true`를 반환합니다.
    pub fn apply(&mut self) -> Result<bool, PomError> {
        let rendered = self.render()?;
        let changed = rendered != self.text;
        if changed {
            std::fs::write(&self.path, &rendered).map_err(|e| PomError::io(&self.path, e))?;
            info!(
                path = %self.path.display(),
                edits = self.queue.len(),
                "descriptor updated"
            );
            self.text = rendered;
        } else {
            debug!(path = %self.path.display(), "descriptor unchanged");
        }
        self.queue.clear();
        Ok(changed)
    }
}

struct Context<'a, 'input> {
    text: &'input str,
    path: &'a Path,
    project: Node<'a, 'input>,
    unit: String,
}

impl<'a, 'input> Context<'a, 'input> {
    fn error(&self, reason: impl Into<String>) -> PomError {
        PomError::Edit {
            path: self.path.display().to_string(),
            reason: reason.into(),
        }
    }

    fn indent(&self, node: Node<'_, '_>) -> &'input str {
        indent_before(self.text, node.range().start)
    }

    fn profile_node(&self, id: &str) -> Option<Node<'a, 'input>> {
        if id.is_empty() {
            return Some(self.project);
        }
        let profiles = child(self.project, "profiles")?;
        children(profiles, "profile").find(|p| child_text(*p, "id").as_deref() == Some(id))
    }

    fn dependency_node(&self, locator: &DependencyLocator) -> Result<Node<'a, 'input>, PomError> {
        let section = self.profile_node(&locator.profile).and_then(|p| {
            if locator.managed {
                child(p, "dependencyManagement").and_then(|dm| child(dm, "dependencies"))
            } else {
                child(p, "dependencies")
            }
        });
        section
            .and_then(|deps| children(deps, "dependency").nth(locator.index))
            .ok_or_else(|| self.error(format!("no dependency at {locator}")))
    }

    /// 모든 `<modules>` 요소 (기본 섹션 + 프로파일)
    fn module_lists(&self) -> Vec<Node<'a, 'input>> {
        let mut lists: Vec<_> = child(self.project, "modules").into_iter().collect();
        if let Some(profiles) = child(self.project, "profiles") {
            lists.extend(children(profiles, "profile").filter_map(|p| child(p, "modules")));
        }
        lists
    }

    fn set_dependency_version(
        &self,
        locator: &DependencyLocator,
        version: Option<&str>,
    ) -> Result<Option<Splice>, PomError> {
        let dep = self.dependency_node(locator)?;
        let current = child(dep, "version");
        let splice = match (current, version) {
            (Some(node), Some(v)) => {
                if child_text(dep, "version").as_deref() == Some(v) {
                    return Ok(None);
                }
                Splice::replace(node.range(), format!("<version>{v}</version>"))
            }
            (None, Some(v)) => {
                let anchor = child(dep, "artifactId")
                    .ok_or_else(|| self.error(format!("dependency at {locator} has no artifactId")))?;
                let indent = self.indent(anchor);
                Splice::insert(
                    anchor.range().end,
                    format!("\n{indent}<version>{v}</version>"),
                )
            }
            (Some(node), None) => Splice::replace(line_span(self.text, node.range()), ""),
            (None, None) => return Ok(None),
        };
        Ok(Some(splice))
    }

    fn add_exclusions(
        &self,
        locator: &DependencyLocator,
        mut wanted: Vec<&Ga>,
    ) -> Result<Vec<Splice>, PomError> {
        let dep = self.dependency_node(locator)?;
        wanted.sort();
        wanted.dedup();

        let Some(list) = child(dep, "exclusions") else {
            let last = dep
                .children()
                .filter(Node::is_element)
                .last()
                .ok_or_else(|| self.error(format!("dependency at {locator} is empty")))?;
            let indent = self.indent(last);
            let inner = format!("{indent}{}", self.unit);
            let mut block = format!("\n{indent}<exclusions>");
            for ga in &wanted {
                block.push('\n');
                block.push_str(&inner);
                block.push_str(&self.render_exclusion(ga, &inner));
            }
            block.push_str(&format!("\n{indent}</exclusions>"));
            return Ok(vec![Splice::insert(last.range().end, block)]);
        };

        let nodes: Vec<(Ga, Node<'_, '_>)> = children(list, "exclusion")
            .filter_map(|e| Some((Ga::new(child_text(e, "groupId")?, child_text(e, "artifactId")?), e)))
            .collect();
        let indent = match nodes.first() {
            Some((_, node)) => self.indent(*node).to_owned(),
            None => format!("{}{}", self.indent(list), self.unit),
        };

        // 삽입 위치(기존 노드 순번)별로 묶는다
        let mut by_slot: BTreeMap<usize, Vec<&Ga>> = BTreeMap::new();
        for ga in wanted {
            if nodes.iter().any(|(existing, _)| existing == ga) {
                continue;
            }
            let slot = nodes.partition_point(|(existing, _)| existing < ga);
            by_slot.entry(slot).or_default().push(ga);
        }

        let mut splices = Vec::new();
        for (slot, gas) in by_slot {
            let rendered: Vec<String> = gas
                .iter()
                .map(|ga| self.render_exclusion(ga, &indent))
                .collect();
            match nodes.get(slot) {
                Some((_, before)) => {
                    let mut text = String::new();
                    for r in rendered {
                        text.push_str(&r);
                        text.push('\n');
                        text.push_str(&indent);
                    }
                    splices.push(Splice::insert(before.range().start, text));
                }
                None => {
                    let mut text = String::new();
                    for r in rendered {
                        text.push('\n');
                        text.push_str(&indent);
                        text.push_str(&r);
                    }
                    match nodes.last() {
                        Some((_, after)) => splices.push(Splice::insert(after.range().end, text)),
                        None => {
                            // 비어 있는 <exclusions/> 또는 <exclusions></exclusions>
                            let outer = self.indent(list);
                            splices.push(Splice::replace(
                                list.range(),
                                format!("<exclusions>{text}\n{outer}</exclusions>"),
                            ));
                        }
                    }
                }
            }
        }
        Ok(splices)
    }

    fn render_exclusion(&self, ga: &Ga, indent: &str) -> String {
        let inner = format!("{indent}{}", self.unit);
        format!(
            "<exclusion>\n{inner}<groupId>{}</groupId>\n{inner}<artifactId>{}</artifactId>\n{indent}</exclusion>",
            ga.group_id, ga.artifact_id
        )
    }

    fn set_properties(&self, props: &[(&str, &str)]) -> Result<Vec<Splice>, PomError> {
        if props.is_empty() {
            return Ok(Vec::new());
        }
        let mut splices = Vec::new();
        let mut missing = Vec::new();
        let list = child(self.project, "properties");

        for (name, value) in props {
            match list.and_then(|l| child(l, name)) {
                Some(node) => {
                    let current = node.text().map(str::trim).unwrap_or_default();
                    if current != *value {
                        splices.push(Splice::replace(
                            node.range(),
                            format!("<{name}>{value}</{name}>"),
                        ));
                    }
                }
                None => missing.push((*name, *value)),
            }
        }
        if missing.is_empty() {
            return Ok(splices);
        }

        let project_indent = self.indent(self.project);
        let list_indent = format!("{project_indent}{}", self.unit);
        let entry_indent = match list.and_then(|l| l.children().find(Node::is_element)) {
            Some(first) => self.indent(first).to_owned(),
            None => format!("{list_indent}{}", self.unit),
        };
        let mut entries = String::new();
        for (name, value) in &missing {
            entries.push_str(&format!("\n{entry_indent}<{name}>{value}</{name}>"));
        }

        match list {
            Some(list) => match list.children().filter(Node::is_element).last() {
                Some(last) => splices.push(Splice::insert(last.range().end, entries)),
                None => {
                    let outer = self.indent(list);
                    splices.push(Splice::replace(
                        list.range(),
                        format!("<properties>{entries}\n{outer}</properties>"),
                    ));
                }
            },
            None => {
                let anchor = ["packaging", "version", "artifactId"]
                    .iter()
                    .find_map(|tag| child(self.project, tag))
                    .ok_or_else(|| self.error("project has no artifactId"))?;
                splices.push(Splice::insert(
                    anchor.range().end,
                    format!("\n\n{list_indent}<properties>{entries}\n{list_indent}</properties>"),
                ));
            }
        }
        Ok(splices)
    }

    fn suppress_module(&self, path: &str, marker: &str) -> Result<Vec<Splice>, PomError> {
        let mut found = false;
        let mut splices = Vec::new();
        for list in self.module_lists() {
            for node in list.children() {
                if node.is_element()
                    && node.tag_name().name() == "module"
                    && node.text().map(str::trim) == Some(path)
                {
                    found = true;
                    splices.push(Splice::replace(node.range(), render_suppressed_link(path, marker)));
                } else if node.is_comment()
                    && node
                        .text()
                        .and_then(parse_suppressed_link)
                        .is_some_and(|(p, _)| p == path)
                {
                    found = true;
                }
            }
        }
        if !found {
            return Err(self.error(format!("no module link '{path}'")));
        }
        Ok(splices)
    }

    fn activate_module(&self, path: &str, marker: &str) -> Result<Vec<Splice>, PomError> {
        let mut found = false;
        let mut splices = Vec::new();
        for list in self.module_lists() {
            for node in list.children() {
                if node.is_element()
                    && node.tag_name().name() == "module"
                    && node.text().map(str::trim) == Some(path)
                {
                    found = true;
                } else if node.is_comment() {
                    let Some((p, reason)) = node.text().and_then(parse_suppressed_link) else {
                        continue;
                    };
                    if p == path && reason == marker {
                        found = true;
                        let range = comment_span(self.text, node.range());
                        splices.push(Splice::replace(range, format!("<module>{path}</module>")));
                    }
                }
            }
        }
        if !found {
            return Err(self.error(format!("no module link '{path}' suppressed with '{marker}'")));
        }
        Ok(splices)
    }

    fn set_parent_version(&self, version: &str) -> Result<Option<Splice>, PomError> {
        let node = child(self.project, "parent")
            .and_then(|p| child(p, "version"))
            .ok_or_else(|| self.error("descriptor has no parent version"))?;
        if node.text().map(str::trim) == Some(version) {
            return Ok(None);
        }
        Ok(Some(Splice::replace(
            node.range(),
            format!("<version>{version}</version>"),
        )))
    }
}

fn apply_splices(text: &str, mut splices: Vec<Splice>) -> Result<String, String> {
    splices.sort_by_key(|s| (s.start, s.end));
    for pair in splices.windows(2) {
        if pair[1].start < pair[0].end {
            return Err(format!(
                "overlapping edits at bytes {}..{} and {}..{}",
                pair[0].start, pair[0].end, pair[1].start, pair[1].end
            ));
        }
    }
    let mut out = text.to_owned();
    for s in splices.iter().rev() {
        out.replace_range(s.start..s.end, &s.text);
    }
    Ok(out)
}

/// `pos` 앞 같은 줄의 공백 들여쓰기 (공백이 아닌 문자가 있으면 빈 문자열)
fn indent_before(text: &str, pos: usize) -> &str {
    let line_start = text[..pos].rfind('\n').map_or(0, |i| i + 1);
    let prefix = &text[line_start..pos];
    if prefix.chars().all(|c| c == ' ' || c == '\t') {
        prefix
    } else {
        ""
    }
}

/// 루트 요소 첫 자식의 상대 들여쓰기로 단위를 추정합니다.
fn indent_unit(text: &str, project: Node<'_, '_>) -> String {
    let base = indent_before(text, project.range().start);
    project
        .children()
        .find(Node::is_element)
        .map(|first| indent_before(text, first.range().start))
        .and_then(|inner| inner.strip_prefix(base))
        .filter(|unit| !unit.is_empty())
        .unwrap_or(DEFAULT_INDENT)
        .to_owned()
}

/// 요소를 지울 때 앞의 줄바꿈과 들여쓰기까지 포함한 범위
fn line_span(text: &str, range: std::ops::Range<usize>) -> std::ops::Range<usize> {
    let indent = indent_before(text, range.start);
    let start = range.start - indent.len();
    if start > 0 && text[..start].ends_with('\n') {
        let start = start - 1;
        let start = if text[..start].ends_with('\r') {
            start - 1
        } else {
            start
        };
        start..range.end
    } else {
        range
    }
}

/// 주석 노드 범위를 `<!--`와 `-->`까지 넓힙니다.
fn comment_span(text: &str, range: std::ops::Range<usize>) -> std::ops::Range<usize> {
    let start = if text[range.start..].starts_with("<!--") {
        range.start
    } else {
        text[..range.start].rfind("<!--").unwrap_or(range.start)
    };
    let end = if text[..range.end].ends_with("-->") {
        range.end
    } else {
        text[range.end..]
            .find("-->")
            .map_or(range.end, |i| range.end + i + 3)
    };
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;

    const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- license header -->
<project>
  <parent>
    <groupId>org.acme</groupId>
    <artifactId>acme-parent</artifactId>
    <version>1.0.0</version>
  </parent>
  <artifactId>acme-foo</artifactId>

  <modules>
    <module>runtime</module>
    <!-- <module>deployment</module> prodtree:excluded -->
  </modules>

  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>org.acme</groupId>
        <artifactId>acme-a</artifactId>
        <version>1.2.3</version>
      </dependency>
      <dependency>
        <groupId>org.acme</groupId>
        <artifactId>acme-b</artifactId>
        <exclusions>
          <exclusion>
            <groupId>a.b</groupId>
            <artifactId>c</artifactId>
          </exclusion>
          <exclusion>
            <groupId>x.y</groupId>
            <artifactId>z</artifactId>
          </exclusion>
        </exclusions>
      </dependency>
    </dependencies>
  </dependencyManagement>
</project>
"#;

    fn managed(index: usize) -> DependencyLocator {
        DependencyLocator {
            profile: String::new(),
            managed: true,
            index,
        }
    }

    fn editor() -> DescriptorEditor {
        DescriptorEditor::from_text("/t/pom.xml", POM)
    }

    #[test]
    fn no_edits_renders_identical_text() {
        assert_eq!(editor().render().unwrap(), POM);
    }

    #[test]
    fn replace_dependency_version_keeps_everything_else() {
        let mut e = editor();
        e.queue(Transformation::SetDependencyVersion {
            locator: managed(0),
            version: Some("1.2.4".to_owned()),
        });
        let out = e.render().unwrap();
        assert_eq!(out, POM.replace("<version>1.2.3</version>", "<version>1.2.4</version>"));
    }

    #[test]
    fn insert_and_remove_dependency_version() {
        let mut e = editor();
        e.queue(Transformation::SetDependencyVersion {
            locator: managed(1),
            version: Some("${b.version}".to_owned()),
        });
        let out = e.render().unwrap();
        assert!(out.contains(
            "<artifactId>acme-b</artifactId>\n        <version>${b.version}</version>"
        ));

        let mut e = editor();
        e.queue(Transformation::SetDependencyVersion {
            locator: managed(0),
            version: None,
        });
        let out = e.render().unwrap();
        assert!(!out.contains("1.2.3"));
        assert!(out.contains("<artifactId>acme-a</artifactId>\n      </dependency>"));
    }

    #[test]
    fn conflicting_versions_are_rejected() {
        let mut e = editor();
        e.queue(Transformation::SetDependencyVersion {
            locator: managed(0),
            version: Some("1".to_owned()),
        });
        e.queue(Transformation::SetDependencyVersion {
            locator: managed(0),
            version: Some("2".to_owned()),
        });
        assert!(matches!(e.render().unwrap_err(), PomError::Edit { .. }));
    }

    #[test]
    fn suppress_and_activate_module() {
        let mut e = editor();
        e.queue(Transformation::SuppressModule {
            path: "runtime".to_owned(),
            marker: "prodtree:excluded".to_owned(),
        });
        e.queue(Transformation::ActivateModule {
            path: "deployment".to_owned(),
            marker: "prodtree:excluded".to_owned(),
        });
        let out = e.render().unwrap();
        assert!(out.contains("    <!-- <module>runtime</module> prodtree:excluded -->\n"));
        assert!(out.contains("    <module>deployment</module>\n"));
        assert!(out.contains("<!-- license header -->"));
    }

    #[test]
    fn suppressing_already_suppressed_link_is_noop() {
        let mut e = editor();
        e.queue(Transformation::SuppressModule {
            path: "deployment".to_owned(),
            marker: "prodtree:excluded".to_owned(),
        });
        assert_eq!(e.render().unwrap(), POM);
    }

    #[test]
    fn unknown_module_link_is_an_error() {
        let mut e = editor();
        e.queue(Transformation::SuppressModule {
            path: "nope".to_owned(),
            marker: "m".to_owned(),
        });
        assert!(e.render().is_err());
    }

    #[test]
    fn exclusions_inserted_in_sorted_position() {
        let mut e = editor();
        e.queue(Transformation::AddExclusion {
            locator: managed(1),
            exclusion: Ga::new("m.n", "o"),
        });
        e.queue(Transformation::AddExclusion {
            locator: managed(1),
            exclusion: Ga::new("a.b", "c"),
        });
        let out = e.render().unwrap();
        let a = out.find("<groupId>a.b</groupId>").unwrap();
        let m = out.find("<groupId>m.n</groupId>").unwrap();
        let x = out.find("<groupId>x.y</groupId>").unwrap();
        assert!(a < m && m < x);
        assert_eq!(out.matches("<groupId>a.b</groupId>").count(), 1);
        assert!(out.contains("          <exclusion>\n            <groupId>m.n</groupId>"));
    }

    #[test]
    fn exclusions_block_created_when_missing() {
        let mut e = editor();
        e.queue(Transformation::AddExclusion {
            locator: managed(0),
            exclusion: Ga::new("com.evil", "thing"),
        });
        let out = e.render().unwrap();
        assert!(out.contains(
            "<version>1.2.3</version>\n        <exclusions>\n          <exclusion>\n            <groupId>com.evil</groupId>"
        ));
    }

    #[test]
    fn property_created_with_properties_block() {
        let mut e = editor();
        e.queue(Transformation::SetProperty {
            name: "community.version".to_owned(),
            value: "3.2.0".to_owned(),
        });
        let out = e.render().unwrap();
        assert!(out.contains(
            "<artifactId>acme-foo</artifactId>\n\n  <properties>\n    <community.version>3.2.0</community.version>\n  </properties>"
        ));
    }

    #[test]
    fn parent_version_update() {
        let mut e = editor();
        e.queue(Transformation::SetParentVersion {
            version: "1.0.1".to_owned(),
        });
        let out = e.render().unwrap();
        assert!(out.contains("<version>1.0.1</version>\n  </parent>"));
    }

    #[test]
    fn queue_dedupes_identical_transformations() {
        let mut e = editor();
        let t = Transformation::SetParentVersion {
            version: "2".to_owned(),
        };
        e.queue(t.clone());
        e.queue(t);
        assert_eq!(e.queued().len(), 1);
    }

    #[test]
    fn apply_writes_only_when_changed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pom.xml");
        std::fs::write(&path, POM).unwrap();

        let mut e = DescriptorEditor::open(&path, "UTF-8").unwrap();
        e.queue(Transformation::SetParentVersion {
            version: "1.0.0".to_owned(),
        });
        assert!(!e.apply().unwrap());

        e.queue(Transformation::SetParentVersion {
            version: "1.1.0".to_owned(),
        });
        assert!(e.apply().unwrap());
        assert!(std::fs::read_to_string(&path).unwrap().contains("1.1.0"));
    }

    #[test]
    fn non_utf8_encoding_is_refused() {
        let err = DescriptorEditor::open("/t/pom.xml", "ISO-8859-1").unwrap_err();
        assert!(matches!(err, PomError::Encoding { .. }));
    }

    fn inserted_exclusions(text: &str) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let mut group = None;
        for line in text.lines().map(str::trim) {
            if let Some(g) = line.strip_prefix("<groupId>g.").and_then(|l| l.strip_suffix("</groupId>")) {
                group = Some(format!("g.{g}"));
            } else if let Some(a) = line.strip_prefix("<artifactId>").and_then(|l| l.strip_suffix("</artifactId>")) {
                if let Some(g) = group.take() {
                    out.push((g, a.to_owned()));
                }
            }
        }
        out
    }

    proptest::proptest! {
        #[test]
        fn exclusion_insertion_is_sorted_and_idempotent(
            picks in proptest::collection::vec((0usize..3, 0usize..3), 1..8)
        ) {
            const GROUPS: [&str; 3] = ["g.c", "g.a", "g.b"];
            const ARTIFACTS: [&str; 3] = ["r", "p", "q"];
            let transformations: Vec<Transformation> = picks
                .iter()
                .map(|&(g, a)| Transformation::AddExclusion {
                    locator: managed(0),
                    exclusion: Ga::new(GROUPS[g], ARTIFACTS[a]),
                })
                .collect();

            let mut e = editor();
            for t in &transformations {
                e.queue(t.clone());
            }
            let once = e.render().unwrap();

            let expected: Vec<(String, String)> = picks
                .iter()
                .map(|&(g, a)| (GROUPS[g].to_owned(), ARTIFACTS[a].to_owned()))
                .collect::<std::collections::BTreeSet<_>>()
                .into_iter()
                .collect();
            proptest::prop_assert_eq!(inserted_exclusions(&once), expected);

            let mut again = DescriptorEditor::from_text("/t/pom.xml", once.clone());
            for t in transformations {
                again.queue(t);
            }
            proptest::prop_assert_eq!(again.render().unwrap(), once);
        }
    }
}
