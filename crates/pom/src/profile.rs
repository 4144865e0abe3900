//! 프로파일 활성화 판정 -- [`ProfileFilter`]
//!
//! 기본 섹션은 항상 수락합니다. 그 외 프로파일은 명시 id, `activeByDefault`,
//! 프로퍼티 조건 순으로 판정하며 jdk/os/file 조건은 평가하지 않고 비활성으로
//! 취급합니다.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::PomError;
use crate::model::Profile;

/// 프로파일 수락 술어
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileFilter {
    active_ids: BTreeSet<String>,
    inactive_ids: BTreeSet<String>,
    all: bool,
    properties: BTreeMap<String, String>,
}

impl ProfileFilter {
    /// 기본 섹션과 자동 활성 프로파일만 수락하는 필터
    pub fn new() -> Self {
        Self::default()
    }

    /// 모든 프로파일을 수락하는 필터
    pub fn all() -> Self {
        Self {
            all: true,
            ..Self::default()
        }
    }

    /// 프로파일 id 목록을 추가합니다. `!id`는 비활성 지정입니다.
    pub fn with_profiles<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for id in ids {
            let id = id.as_ref().trim();
            match id.strip_prefix('!') {
                Some(rest) => {
                    self.inactive_ids.insert(rest.to_owned());
                }
                None if !id.is_empty() => {
                    self.active_ids.insert(id.to_owned());
                }
                None => {}
            }
        }
        self
    }

    /// 활성화 판정용 프로퍼티를 지정합니다 (`-Dname=value`에 해당).
    pub fn with_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.properties.extend(properties);
        self
    }

    /// 활성화 판정용 프로퍼티
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// 프로파일 수락 여부를 판정합니다.
    ///
    /// # Errors
    ///
    /// 활성화 조건에 평가할 수 없는 `${...}` 표현식이 있으면
    /// [`PomError::Expression`]을 반환합니다.
    pub fn accepts(&self, profile: &Profile, descriptor: &Path) -> Result<bool, PomError> {
        if profile.is_default() {
            return Ok(true);
        }
        if self.inactive_ids.contains(&profile.id) {
            return Ok(false);
        }
        if self.all || self.active_ids.contains(&profile.id) {
            return Ok(true);
        }

        let activation = &profile.activation;
        if !activation.other.is_empty() {
            return Ok(false);
        }
        if let Some(cond) = &activation.property {
            for raw in std::iter::once(&cond.name).chain(cond.value.iter()) {
                if raw.contains("${") {
                    return Err(PomError::Expression {
                        expression: raw.clone(),
                        descriptor: descriptor.display().to_string(),
                        reason: format!("activation of profile '{}' cannot be evaluated", profile.id),
                    });
                }
            }

            let present = self.properties.get(&cond.name);
            let matched = match (&cond.value, present) {
                (None, p) => p.is_some(),
                (Some(expected), Some(actual)) => match expected.strip_prefix('!') {
                    Some(neg) => actual != neg,
                    None => actual == expected,
                },
                (Some(expected), None) => expected.starts_with('!'),
            };
            return Ok(matched != cond.negated);
        }

        Ok(activation.active_by_default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Activation, PropertyActivation};

    fn profile(id: &str, activation: Activation) -> Profile {
        Profile {
            id: id.to_owned(),
            activation,
            properties: BTreeMap::new(),
            dependencies: Vec::new(),
            managed_dependencies: Vec::new(),
            module_links: Vec::new(),
        }
    }

    fn prop(name: &str, value: Option<&str>, negated: bool) -> Activation {
        Activation {
            property: Some(PropertyActivation {
                name: name.to_owned(),
                value: value.map(str::to_owned),
                negated,
            }),
            ..Activation::default()
        }
    }

    const P: &str = "/t/pom.xml";

    #[test]
    fn default_section_always_accepted() {
        let f = ProfileFilter::new().with_profiles(["!"]);
        assert!(f.accepts(&profile("", Activation::default()), Path::new(P)).unwrap());
    }

    #[test]
    fn explicit_ids_and_deactivation() {
        let f = ProfileFilter::new().with_profiles(["full", "!native"]);
        assert!(f.accepts(&profile("full", Activation::default()), Path::new(P)).unwrap());
        let native = profile(
            "native",
            Activation {
                active_by_default: true,
                ..Activation::default()
            },
        );
        assert!(!f.accepts(&native, Path::new(P)).unwrap());
        assert!(!ProfileFilter::all()
            .with_profiles(["!native"])
            .accepts(&native, Path::new(P))
            .unwrap());
    }

    #[test]
    fn property_activation() {
        let f = ProfileFilter::new()
            .with_properties(BTreeMap::from([("quickly".to_owned(), "true".to_owned())]));
        assert!(f.accepts(&profile("q", prop("quickly", None, false)), Path::new(P)).unwrap());
        assert!(!f.accepts(&profile("nq", prop("quickly", None, true)), Path::new(P)).unwrap());
        assert!(f
            .accepts(&profile("v", prop("quickly", Some("true"), false)), Path::new(P))
            .unwrap());
        assert!(!f
            .accepts(&profile("v2", prop("quickly", Some("!true"), false)), Path::new(P))
            .unwrap());
        assert!(ProfileFilter::new()
            .accepts(&profile("absent", prop("quickly", None, true)), Path::new(P))
            .unwrap());
    }

    #[test]
    fn jdk_and_os_conditions_are_inactive() {
        let act = Activation {
            other: vec!["jdk".to_owned()],
            ..Activation::default()
        };
        assert!(!ProfileFilter::new().accepts(&profile("j", act.clone()), Path::new(P)).unwrap());
        assert!(ProfileFilter::new()
            .with_profiles(["j"])
            .accepts(&profile("j", act), Path::new(P))
            .unwrap());
    }

    #[test]
    fn expression_in_activation_is_fatal() {
        let err = ProfileFilter::new()
            .accepts(&profile("x", prop("${flag}", None, false)), Path::new(P))
            .unwrap_err();
        assert!(matches!(err, PomError::Expression { .. }));
    }
}
