//! 규칙 문서 로딩 -- enforcer 형식 XML과 필터 문서
//!
//! 규칙 문서의 `bannedDependencies/excludes/exclude`는 금지 패턴,
//! `bannedDependencies/includes/include`는 허용 예외입니다. 필터 문서의
//! `<remove>`는 같은 텍스트의 금지 패턴을 지우고 `<add>`는 패턴을 추가합니다.

use std::path::PathBuf;

use roxmltree::{Document, Node};
use tracing::debug;

use prodtree_core::{GavPattern, GavSet};

use crate::error::EngineError;

const CLASSPATH_PREFIX: &str = "classpath:";

/// `classpath:` 및 파일 시스템 위치를 읽는 로더
#[derive(Debug, Clone)]
pub struct RuleDocumentLoader {
    root_dir: PathBuf,
    resource_dirs: Vec<PathBuf>,
}

impl RuleDocumentLoader {
    /// 트리 루트와 `classpath:` 디렉토리(트리 루트 기준)로 로더를 만듭니다.
    pub fn new(root_dir: impl Into<PathBuf>, resource_dirs: &[PathBuf]) -> Self {
        let root_dir = root_dir.into();
        let resource_dirs = resource_dirs.iter().map(|d| root_dir.join(d)).collect();
        Self {
            root_dir,
            resource_dirs,
        }
    }

    /// 위치를 실제 파일 경로로 바꿉니다.
    pub fn resolve(&self, location: &str) -> Result<PathBuf, EngineError> {
        match location.strip_prefix(CLASSPATH_PREFIX) {
            Some(name) => {
                let name = name.trim_start_matches('/');
                self.resource_dirs
                    .iter()
                    .map(|dir| dir.join(name))
                    .find(|p| p.is_file())
                    .ok_or_else(|| EngineError::Rules {
                        location: location.to_owned(),
                        reason: format!(
                            "not found in resource directories [{}]",
                            self.resource_dirs
                                .iter()
                                .map(|d| d.display().to_string())
                                .collect::<Vec<_>>()
                                .join(", ")
                        ),
                    })
            }
            None => Ok(self.root_dir.join(location)),
        }
    }

    /// 위치의 내용을 UTF-8 텍스트로 읽습니다.
    pub fn load(&self, location: &str) -> Result<String, EngineError> {
        let path = self.resolve(location)?;
        debug!(location, path = %path.display(), "loading rule document");
        std::fs::read_to_string(&path).map_err(|e| EngineError::Rules {
            location: location.to_owned(),
            reason: format!("{}: {e}", path.display()),
        })
    }
}

/// 파싱된 규칙 문서 (패턴 원문)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleDocument {
    /// 금지 패턴
    pub banned: Vec<String>,
    /// 허용 예외
    pub allowed: Vec<String>,
}

/// 필터 문서
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleFilter {
    /// 제거할 금지 패턴 (텍스트 일치)
    pub remove: Vec<String>,
    /// 추가할 금지 패턴
    pub add: Vec<String>,
}

fn parse_xml<'a>(location: &str, text: &'a str) -> Result<Document<'a>, EngineError> {
    Document::parse(text).map_err(|e| EngineError::Rules {
        location: location.to_owned(),
        reason: e.to_string(),
    })
}

fn texts<'a, 'input: 'a>(node: Node<'a, 'input>, tag: &'a str) -> impl Iterator<Item = String> + 'a {
    node.children()
        .filter(move |n| n.has_tag_name(tag))
        .filter_map(|n| n.text())
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
}

impl RuleDocument {
    /// 규칙 문서를 파싱합니다. `bannedDependencies` 요소는 문서 어디에 있어도 됩니다.
    pub fn parse(location: &str, text: &str) -> Result<Self, EngineError> {
        let doc = parse_xml(location, text)?;
        let mut rules = Self::default();
        for banned in doc
            .descendants()
            .filter(|n| n.has_tag_name("bannedDependencies"))
        {
            for excludes in banned.children().filter(|n| n.has_tag_name("excludes")) {
                rules.banned.extend(texts(excludes, "exclude"));
            }
            for includes in banned.children().filter(|n| n.has_tag_name("includes")) {
                rules.allowed.extend(texts(includes, "include"));
            }
        }
        Ok(rules)
    }

    /// 필터를 적용합니다. 제거가 추가보다 먼저입니다.
    pub fn apply_filter(&mut self, filter: &RuleFilter) {
        self.banned.retain(|p| !filter.remove.contains(p));
        for added in &filter.add {
            if !self.banned.contains(added) {
                self.banned.push(added.clone());
            }
        }
    }

    /// 금지/허용 패턴을 `GavSet`으로 컴파일합니다.
    ///
    /// 네 번째 이후 세그먼트(type, scope 등)는 무시합니다.
    pub fn compile(&self, location: &str) -> Result<GavSet, EngineError> {
        let compile = |raw: &String| {
            let head: Vec<&str> = raw.split(':').take(3).collect();
            GavPattern::parse(&head.join(":")).map_err(|e| EngineError::Rules {
                location: location.to_owned(),
                reason: e.to_string(),
            })
        };
        Ok(GavSet {
            includes: self.banned.iter().map(compile).collect::<Result<_, _>>()?,
            excludes: self.allowed.iter().map(compile).collect::<Result<_, _>>()?,
        })
    }
}

impl RuleFilter {
    /// `<filter>` 문서를 파싱합니다.
    pub fn parse(location: &str, text: &str) -> Result<Self, EngineError> {
        let doc = parse_xml(location, text)?;
        let root = doc.root_element();
        if !root.has_tag_name("filter") {
            return Err(EngineError::Rules {
                location: location.to_owned(),
                reason: format!("expected <filter> root element, found <{}>", root.tag_name().name()),
            });
        }
        Ok(Self {
            remove: texts(root, "remove").collect(),
            add: texts(root, "add").collect(),
        })
    }
}
