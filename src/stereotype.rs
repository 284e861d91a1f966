//! Stereotypes
//!
//! A stereotype is an annotation type meta-annotated with `@Stereotype` that
//! bundles defaults for the beans it is applied to: a scope, the alternative
//! flag, a defaulted `@Named` and interceptor bindings.

use crate::annotations::AnnotationStore;
use crate::error::{DeploymentError, Result};
use crate::index::{AnnotationInstance, ClassInfo, DotName};
use crate::names;
use crate::scope::ScopeInfo;
use ahash::AHashMap;

/// Defaults contributed by one stereotype
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StereotypeInfo {
    name: DotName,
    default_scope: Option<ScopeInfo>,
    alternative: bool,
    named: bool,
    bindings: Vec<AnnotationInstance>,
}

impl StereotypeInfo {
    /// Read a stereotype declaration
    pub(crate) fn from_class(
        class: &ClassInfo,
        store: &AnnotationStore,
        interceptor_bindings: &AHashMap<DotName, ClassInfo>,
    ) -> Result<Self> {
        let mut info = Self::with_scope(class.name().clone(), None);
        for annotation in store.class_annotations(class).iter() {
            let name = annotation.name();
            if name == &*names::ALTERNATIVE {
                info.alternative = true;
            } else if interceptor_bindings.contains_key(name) {
                info.bindings.push(annotation.clone());
            } else if name == &*names::NAMED {
                if annotation.value().and_then(|v| v.as_str()).is_some_and(|v| !v.is_empty()) {
                    return Err(DeploymentError::definition(format!(
                        "Stereotype must not declare @Named with a non-empty value: {}",
                        class.name()
                    )));
                }
                info.named = true;
            } else if let Some(scope) = ScopeInfo::from_name(name) {
                if info.default_scope.is_some_and(|existing| existing != scope) {
                    return Err(DeploymentError::definition(format!(
                        "Stereotype declares more than one scope: {}",
                        class.name()
                    )));
                }
                info.default_scope = Some(scope);
            }
        }
        Ok(info)
    }

    /// Stereotype that only declares a default scope
    pub(crate) fn with_scope(name: DotName, default_scope: Option<ScopeInfo>) -> Self {
        Self {
            name,
            default_scope,
            alternative: false,
            named: false,
            bindings: Vec::new(),
        }
    }

    pub fn name(&self) -> &DotName {
        &self.name
    }

    pub fn default_scope(&self) -> Option<ScopeInfo> {
        self.default_scope
    }

    pub fn is_alternative(&self) -> bool {
        self.alternative
    }

    pub fn is_named(&self) -> bool {
        self.named
    }

    /// Interceptor bindings declared on the stereotype
    pub fn bindings(&self) -> &[AnnotationInstance] {
        &self.bindings
    }
}

/// The single scope all stereotypes agree on.
///
/// Stereotypes without a scope are ignored; two different scopes are a
/// definition error unless the bean declares its own scope.
pub(crate) fn stereotype_scope(stereotypes: &[&StereotypeInfo], subject: &str) -> Result<Option<ScopeInfo>> {
    let mut scope = None;
    for stereotype in stereotypes {
        match (scope, stereotype.default_scope) {
            (_, None) => {}
            (None, Some(declared)) => scope = Some(declared),
            (Some(existing), Some(declared)) if existing == declared => {}
            (Some(_), Some(_)) => {
                return Err(DeploymentError::definition(format!(
                    "All stereotypes must specify the same scope or the bean must declare a scope: {subject}"
                )));
            }
        }
    }
    Ok(scope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicting_stereotype_scopes() {
        let a = StereotypeInfo::with_scope("a.A".into(), Some(ScopeInfo::Singleton));
        let b = StereotypeInfo::with_scope("a.B".into(), Some(ScopeInfo::ApplicationScoped));
        let c = StereotypeInfo::with_scope("a.C".into(), None);
        assert_eq!(stereotype_scope(&[&a, &c], "x").unwrap(), Some(ScopeInfo::Singleton));
        assert_eq!(stereotype_scope(&[&c], "x").unwrap(), None);
        assert!(stereotype_scope(&[&a, &b], "x").is_err());
    }

    #[test]
    fn test_stereotype_with_named_value_rejected() {
        let class = ClassInfo::builder("a.Action")
            .annotation_type()
            .annotation(AnnotationInstance::marker(names::STEREOTYPE.clone()))
            .annotation(AnnotationInstance::marker(names::NAMED.clone()).with_value("x"))
            .build();
        let result = StereotypeInfo::from_class(&class, &AnnotationStore::plain(), &AHashMap::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_stereotype_defaults() {
        let class = ClassInfo::builder("a.Action")
            .annotation_type()
            .annotation(AnnotationInstance::marker(names::STEREOTYPE.clone()))
            .annotation(AnnotationInstance::marker(names::NAMED.clone()))
            .annotation(AnnotationInstance::marker(names::ALTERNATIVE.clone()))
            .annotation(AnnotationInstance::marker(names::REQUEST_SCOPED.clone()))
            .build();
        let info = StereotypeInfo::from_class(&class, &AnnotationStore::plain(), &AHashMap::new()).unwrap();
        assert!(info.is_named());
        assert!(info.is_alternative());
        assert_eq!(info.default_scope(), Some(ScopeInfo::RequestScoped));
    }
}
