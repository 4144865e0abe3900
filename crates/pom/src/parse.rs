//! 디스크립터 파싱 -- `pom.xml` 텍스트를 [`Module`]로 변환
//!
//! roxmltree로 문서를 읽고, 기본 섹션과 `<profiles>`의 의존성, 관리 의존성,
//! 프로퍼티, 모듈 링크를 원문 표현식 그대로 추출합니다.
//! 주석 처리된 `<module>` 링크는 [`ModuleLink::Suppressed`]로 읽습니다.

use std::collections::BTreeMap;
use std::path::Path;

use roxmltree::{Document, Node};

use prodtree_core::{Ga, Gav};

use crate::error::PomError;
use crate::model::{
    Activation, DEFAULT_PROFILE, Dependency, DependencyLocator, Module, ModuleLink, ParentRef,
    Profile, PropertyActivation,
};

/// 주석 본문이 억제된 모듈 링크이면 `(path, reason)`을 반환합니다.
pub fn parse_suppressed_link(comment: &str) -> Option<(String, String)> {
    let rest = comment.trim().strip_prefix("<module>")?;
    let end = rest.find("</module>")?;
    let path = rest[..end].trim();
    if path.is_empty() {
        return None;
    }
    let reason = rest[end + "</module>".len()..].trim();
    Some((path.to_owned(), reason.to_owned()))
}

/// 억제된 링크의 디스크 표현을 만듭니다.
pub fn render_suppressed_link(path: &str, marker: &str) -> String {
    format!("<!-- <module>{path}</module> {marker} -->")
}

/// 디스크립터 텍스트를 모듈로 파싱합니다.
///
/// `tree_root`는 [`Module::rel_dir`] 계산에 사용합니다.
pub fn parse_module(descriptor: &Path, text: &str, tree_root: &Path) -> Result<Module, PomError> {
    let path_str = descriptor.display().to_string();
    let doc = Document::parse(text).map_err(|e| PomError::Parse {
        path: path_str.clone(),
        reason: e.to_string(),
    })?;
    let project = doc.root_element();
    if project.tag_name().name() != "project" {
        return Err(PomError::MissingElement {
            path: path_str,
            element: "project".to_owned(),
        });
    }

    let parent = child(project, "parent")
        .map(|p| parse_parent(p, &path_str))
        .transpose()?;

    let group_id = child_text(project, "groupId")
        .or_else(|| parent.as_ref().map(|p| p.gav.ga.group_id.clone()))
        .ok_or_else(|| PomError::MissingElement {
            path: path_str.clone(),
            element: "groupId".to_owned(),
        })?;
    let artifact_id = child_text(project, "artifactId").ok_or_else(|| PomError::MissingElement {
        path: path_str.clone(),
        element: "artifactId".to_owned(),
    })?;
    let own_version = child_text(project, "version");
    let declares_version = own_version.is_some();
    let version = own_version
        .or_else(|| parent.as_ref().and_then(|p| p.gav.version.clone()))
        .ok_or_else(|| PomError::MissingElement {
            path: path_str.clone(),
            element: "version".to_owned(),
        })?;

    let mut profiles = vec![parse_profile_body(
        project,
        DEFAULT_PROFILE,
        Activation::default(),
    )];
    if let Some(list) = child(project, "profiles") {
        for node in children(list, "profile") {
            let id = child_text(node, "id").ok_or_else(|| PomError::MissingElement {
                path: path_str.clone(),
                element: "profile/id".to_owned(),
            })?;
            let activation = child(node, "activation")
                .map(parse_activation)
                .unwrap_or_default();
            profiles.push(parse_profile_body(node, &id, activation));
        }
    }

    Ok(Module {
        ga: Ga::new(group_id, artifact_id),
        version,
        declares_version,
        descriptor: descriptor.to_path_buf(),
        rel_dir: relative_dir(descriptor, tree_root),
        packaging: child_text(project, "packaging").unwrap_or_else(|| "jar".to_owned()),
        parent,
        profiles,
    })
}

fn parse_parent(node: Node<'_, '_>, path: &str) -> Result<ParentRef, PomError> {
    let missing = |element: &str| PomError::MissingElement {
        path: path.to_owned(),
        element: format!("parent/{element}"),
    };
    let group_id = child_text(node, "groupId").ok_or_else(|| missing("groupId"))?;
    let artifact_id = child_text(node, "artifactId").ok_or_else(|| missing("artifactId"))?;
    let version = child_text(node, "version").ok_or_else(|| missing("version"))?;
    Ok(ParentRef {
        gav: Gav::new(group_id, artifact_id, Some(version)),
        relative_path: child_text(node, "relativePath"),
    })
}

fn parse_profile_body(node: Node<'_, '_>, id: &str, activation: Activation) -> Profile {
    let dependencies = child(node, "dependencies")
        .map(|deps| parse_dependency_list(deps, id, false))
        .unwrap_or_default();
    let managed_dependencies = child(node, "dependencyManagement")
        .and_then(|dm| child(dm, "dependencies"))
        .map(|deps| parse_dependency_list(deps, id, true))
        .unwrap_or_default();

    Profile {
        id: id.to_owned(),
        activation,
        properties: parse_properties(node),
        dependencies,
        managed_dependencies,
        module_links: child(node, "modules")
            .map(parse_module_links)
            .unwrap_or_default(),
    }
}

fn parse_activation(node: Node<'_, '_>) -> Activation {
    let mut activation = Activation {
        active_by_default: child_text(node, "activeByDefault")
            .is_some_and(|v| v.eq_ignore_ascii_case("true")),
        ..Activation::default()
    };
    for cond in node.children().filter(Node::is_element) {
        match cond.tag_name().name() {
            "activeByDefault" => {}
            "property" => {
                if let Some(raw) = child_text(cond, "name") {
                    let (negated, name) = match raw.strip_prefix('!') {
                        Some(rest) => (true, rest.to_owned()),
                        None => (false, raw),
                    };
                    activation.property = Some(PropertyActivation {
                        name,
                        value: child_text(cond, "value"),
                        negated,
                    });
                }
            }
            other => activation.other.push(other.to_owned()),
        }
    }
    activation
}

/// `<dependencies>` 요소의 자식 의존성을 파싱합니다.
pub fn parse_dependency_list(node: Node<'_, '_>, profile: &str, managed: bool) -> Vec<Dependency> {
    children(node, "dependency")
        .enumerate()
        .map(|(index, dep)| Dependency {
            group_id: child_text(dep, "groupId").unwrap_or_default(),
            artifact_id: child_text(dep, "artifactId").unwrap_or_default(),
            version: child_text(dep, "version"),
            artifact_type: child_text(dep, "type"),
            classifier: child_text(dep, "classifier"),
            scope: child_text(dep, "scope"),
            optional: child_text(dep, "optional").is_some_and(|v| v.eq_ignore_ascii_case("true")),
            exclusions: parse_exclusions(dep),
            locator: DependencyLocator {
                profile: profile.to_owned(),
                managed,
                index,
            },
        })
        .collect()
}

/// 의존성 요소의 `<exclusions>`를 읽습니다.
pub fn parse_exclusions(dep: Node<'_, '_>) -> Vec<Ga> {
    child(dep, "exclusions")
        .map(|ex| {
            children(ex, "exclusion")
                .filter_map(|e| {
                    Some(Ga::new(
                        child_text(e, "groupId")?,
                        child_text(e, "artifactId")?,
                    ))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_properties(node: Node<'_, '_>) -> BTreeMap<String, String> {
    child(node, "properties")
        .map(|props| {
            props
                .children()
                .filter(Node::is_element)
                .map(|prop| {
                    let value = prop.text().map(|t| t.trim().to_owned()).unwrap_or_default();
                    (prop.tag_name().name().to_owned(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_module_links(modules: Node<'_, '_>) -> Vec<ModuleLink> {
    modules
        .children()
        .filter_map(|node| {
            if node.is_element() && node.tag_name().name() == "module" {
                let path = node.text().map(str::trim).unwrap_or_default();
                (!path.is_empty()).then(|| ModuleLink::Active {
                    path: path.to_owned(),
                })
            } else if node.is_comment() {
                let (path, reason) = parse_suppressed_link(node.text()?)?;
                Some(ModuleLink::Suppressed { path, reason })
            } else {
                None
            }
        })
        .collect()
}

fn relative_dir(descriptor: &Path, tree_root: &Path) -> String {
    descriptor
        .parent()
        .and_then(|dir| dir.strip_prefix(tree_root).ok())
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}

// --- roxmltree 헬퍼 ---

/// 태그 이름이 일치하는 첫 자식 요소
pub fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == tag)
}

/// 태그 이름이 일치하는 모든 자식 요소
pub fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |c| c.is_element() && c.tag_name().name() == tag)
}

/// 자식 요소의 텍스트 (앞뒤 공백 제거, 비어 있으면 `None`)
pub fn child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|c| c.text())
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
}
