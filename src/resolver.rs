//! Typesafe resolution
//!
//! Every injection point must resolve to exactly one bean, or to one of the
//! built-in beans. Results are collected into [`Resolutions`]; every problem
//! found in one run is reported together and no generation happens.

use crate::bean::{BeanId, BeanInfo};
use crate::deployment::BeanDeployment;
use crate::error::{DeploymentError, Result};
use crate::index::{AnnotationInstance, DotName, Type};
use crate::injection::{InjectionPointId, InjectionPointInfo};
use crate::interceptor::InterceptionType;
use crate::names;
use crate::scope::ScopeInfo;
use crate::types;
use ahash::AHashMap;
use std::time::Instant;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Beans the container provides without a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinBean {
    /// `Instance<T>` and `Provider<T>`
    Instance,
    InjectionPoint,
    Event,
    BeanManager,
}

impl BuiltinBean {
    pub const ALL: [BuiltinBean; 4] = [
        BuiltinBean::Instance,
        BuiltinBean::InjectionPoint,
        BuiltinBean::Event,
        BuiltinBean::BeanManager,
    ];

    /// Raw types resolving to this built-in
    pub fn raw_types(self) -> Vec<&'static DotName> {
        match self {
            Self::Instance => vec![&names::INSTANCE, &names::PROVIDER],
            Self::InjectionPoint => vec![&names::INJECTION_POINT],
            Self::Event => vec![&names::EVENT],
            Self::BeanManager => vec![&names::BEAN_MANAGER],
        }
    }

    /// Built-in resolving an injection point of the given required type
    pub fn for_type(required: &Type) -> Option<Self> {
        let raw = required.raw_name()?;
        Self::ALL
            .into_iter()
            .find(|builtin| builtin.raw_types().into_iter().any(|name| name == raw))
    }
}

/// What an injection point resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolvedTarget {
    Bean(BeanId),
    Builtin(BuiltinBean),
}

impl ResolvedTarget {
    pub fn bean(self) -> Option<BeanId> {
        match self {
            Self::Bean(id) => Some(id),
            Self::Builtin(_) => None,
        }
    }
}

/// Resolution result of every injection point of a deployment
#[derive(Debug, Clone, Default)]
pub struct Resolutions {
    targets: AHashMap<InjectionPointId, ResolvedTarget>,
}

impl Resolutions {
    pub fn get(&self, id: InjectionPointId) -> Option<ResolvedTarget> {
        self.targets.get(&id).copied()
    }

    /// Target of a resolved injection point.
    ///
    /// Only valid after a successful resolution run.
    pub fn target(&self, point: &InjectionPointInfo) -> Result<ResolvedTarget> {
        self.get(point.id()).ok_or_else(|| DeploymentError::UnsatisfiedDependency {
            required_type: point.required_type().to_string(),
            qualifiers: point.qualifiers_display(),
            member: point.target().to_string(),
            declared_on: "unresolved injection point".to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Bean targets of a sequence of injection points
    pub fn bean_targets<'p>(&self, points: impl IntoIterator<Item = &'p InjectionPointInfo>) -> Vec<BeanId> {
        points
            .into_iter()
            .filter_map(|p| self.get(p.id()).and_then(ResolvedTarget::bean))
            .collect()
    }

    pub(crate) fn insert(&mut self, id: InjectionPointId, target: ResolvedTarget) {
        self.targets.insert(id, target);
    }
}

/// Typesafe lookups against one deployment
pub struct BeanResolver<'d> {
    deployment: &'d BeanDeployment,
}

impl<'d> BeanResolver<'d> {
    pub fn new(deployment: &'d BeanDeployment) -> Self {
        Self { deployment }
    }

    /// Every active bean with a matching type and all required qualifiers.
    ///
    /// Interceptors are never candidates.
    pub fn resolve(&self, required_type: &Type, required_qualifiers: &[AnnotationInstance]) -> Vec<&'d BeanInfo> {
        self.deployment
            .active_beans()
            .filter(|bean| !bean.is_interceptor())
            .filter(|bean| self.matches(bean, required_type, required_qualifiers))
            .collect()
    }

    pub fn matches(&self, bean: &BeanInfo, required_type: &Type, required_qualifiers: &[AnnotationInstance]) -> bool {
        required_qualifiers
            .iter()
            .all(|required| has_qualifier(self.deployment, required, bean.qualifiers()))
            && self.matches_type(bean, required_type)
    }

    pub fn matches_type(&self, bean: &BeanInfo, required_type: &Type) -> bool {
        let index = self.deployment.index();
        bean.types().iter().any(|bean_type| types::matches(index, required_type, bean_type))
    }
}

/// True if `qualifiers` contains `required` with equal binding members
pub fn has_qualifier(deployment: &BeanDeployment, required: &AnnotationInstance, qualifiers: &[AnnotationInstance]) -> bool {
    qualifiers
        .iter()
        .any(|qualifier| deployment.annotation_matches(required, qualifier))
}

/// Alternative priority of a bean taking part in ambiguity resolution
fn alternative_priority(deployment: &BeanDeployment, bean: &BeanInfo) -> Option<i32> {
    match bean.declaring_bean() {
        Some(declaring) => bean
            .alternative_priority()
            .or_else(|| deployment.bean(declaring).alternative_priority()),
        None => bean.alternative_priority(),
    }
}

/// Pick one bean among several candidates.
///
/// Only alternatives are kept; a single alternative wins. Among several,
/// only those with the highest priority are kept and a single remaining one
/// wins.
pub fn resolve_ambiguity<'a>(deployment: &BeanDeployment, candidates: &[&'a BeanInfo]) -> Option<&'a BeanInfo> {
    let alternatives: Vec<(&'a BeanInfo, i32)> = candidates
        .iter()
        .filter_map(|bean| alternative_priority(deployment, bean).map(|priority| (*bean, priority)))
        .collect();
    match alternatives.as_slice() {
        [] => None,
        [(single, _)] => Some(single),
        _ => {
            let highest = alternatives.iter().map(|(_, p)| *p).max()?;
            let mut top = alternatives.iter().filter(|(_, p)| *p == highest);
            match (top.next(), top.next()) {
                (Some((bean, _)), None) => Some(bean),
                _ => None,
            }
        }
    }
}

/// Human readable owner of an injection point, for error messages
#[derive(Clone, Copy)]
enum Owner<'a> {
    Bean(&'a BeanInfo),
    Other(&'a dyn std::fmt::Display, ScopeInfo),
}

impl Owner<'_> {
    fn describe(&self) -> String {
        match self {
            Owner::Bean(bean) => bean.to_string(),
            Owner::Other(display, _) => display.to_string(),
        }
    }

    fn scope(&self) -> ScopeInfo {
        match self {
            Owner::Bean(bean) => bean.scope(),
            Owner::Other(_, scope) => *scope,
        }
    }

    fn is_bean(&self) -> bool {
        matches!(self, Owner::Bean(_))
    }
}

/// Resolve every injection point of the deployment
pub fn resolve_injection_points(deployment: &BeanDeployment) -> Result<Resolutions> {
    let start = Instant::now();
    let resolver = BeanResolver::new(deployment);
    let mut resolutions = Resolutions::default();
    let mut errors = Vec::new();

    for bean in deployment.active_beans() {
        for point in bean.injection_points() {
            resolve_point(&resolver, deployment, Owner::Bean(bean), point, &mut resolutions, &mut errors);
        }
    }
    for disposer in deployment.disposers() {
        let declaring = deployment.bean(disposer.declaring_bean());
        if deployment.is_removed(declaring.id()) {
            continue;
        }
        for point in disposer.injection().injection_points() {
            let owner = Owner::Other(disposer, declaring.scope());
            resolve_point(&resolver, deployment, owner, point, &mut resolutions, &mut errors);
        }
    }
    for observer in deployment.observers() {
        let declaring = deployment.bean(observer.declaring_bean());
        if deployment.is_removed(declaring.id()) {
            continue;
        }
        for point in observer.injection().injection_points() {
            let owner = Owner::Other(observer, declaring.scope());
            resolve_point(&resolver, deployment, owner, point, &mut resolutions, &mut errors);
        }
    }

    if let Some(error) = DeploymentError::aggregate(errors) {
        #[cfg(feature = "logging")]
        debug!(target: "bean_processor", problems = error.problems().len(), "Resolution failed");
        return Err(error);
    }

    #[cfg(feature = "logging")]
    debug!(
        target: "bean_processor",
        injection_points = resolutions.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Injection points resolved"
    );
    #[cfg(not(feature = "logging"))]
    let _ = start;
    Ok(resolutions)
}

fn resolve_point(
    resolver: &BeanResolver<'_>,
    deployment: &BeanDeployment,
    owner: Owner<'_>,
    point: &InjectionPointInfo,
    resolutions: &mut Resolutions,
    errors: &mut Vec<DeploymentError>,
) {
    if let Some(builtin) = BuiltinBean::for_type(point.required_type()) {
        if builtin == BuiltinBean::InjectionPoint && !(owner.is_bean() && owner.scope() == ScopeInfo::Dependent) {
            errors.push(DeploymentError::definition(format!(
                "Only @Dependent beans can access metadata about an injection point: {} declared on {}",
                point.target(),
                owner.describe()
            )));
            return;
        }
        resolutions.insert(point.id(), ResolvedTarget::Builtin(builtin));
        return;
    }

    let candidates = resolver.resolve(point.required_type(), point.required_qualifiers());
    let selected = match candidates.as_slice() {
        [] => {
            errors.push(DeploymentError::UnsatisfiedDependency {
                required_type: point.required_type().to_string(),
                qualifiers: point.qualifiers_display(),
                member: point.target().to_string(),
                declared_on: owner.describe(),
            });
            return;
        }
        [single] => *single,
        several => match resolve_ambiguity(deployment, several) {
            Some(bean) => bean,
            None => {
                errors.push(DeploymentError::AmbiguousDependency {
                    required_type: point.required_type().to_string(),
                    qualifiers: point.qualifiers_display(),
                    member: point.target().to_string(),
                    declared_on: owner.describe(),
                    candidates: several.iter().map(ToString::to_string).collect(),
                });
                return;
            }
        },
    };
    #[cfg(feature = "logging")]
    trace!(
        target: "bean_processor",
        injection_point = %point,
        bean = %selected.bean_class(),
        "Resolved"
    );
    resolutions.insert(point.id(), ResolvedTarget::Bean(selected.id()));
}

// =============================================================================
// Interceptor resolution
// =============================================================================

/// Matches interceptor bindings against the interceptors of a deployment
pub struct InterceptorResolver<'d> {
    deployment: &'d BeanDeployment,
}

impl<'d> InterceptorResolver<'d> {
    pub fn new(deployment: &'d BeanDeployment) -> Self {
        Self { deployment }
    }

    /// Interceptors taking part in `phase` for the given binding set,
    /// highest priority first, ties in declaration order
    pub fn resolve(&self, phase: InterceptionType, bindings: &[AnnotationInstance]) -> Vec<BeanId> {
        if bindings.is_empty() {
            return Vec::new();
        }
        let mut matching: Vec<(BeanId, i32)> = self
            .deployment
            .active_beans()
            .filter_map(|bean| bean.interceptor_info().map(|info| (bean.id(), info)))
            .filter(|(_, info)| info.intercepts(phase))
            .filter(|(_, info)| {
                info.bindings().iter().all(|declared| {
                    bindings
                        .iter()
                        .any(|present| self.deployment.annotation_matches(declared, present))
                })
            })
            .map(|(id, info)| (id, info.priority()))
            .collect();
        matching.sort_by_key(|(_, priority)| std::cmp::Reverse(*priority));
        matching.into_iter().map(|(id, _)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment::tests::{deploy, marker};
    use crate::interceptor::tests::hook_method;
    use crate::index::{ClassInfo, FieldInfo};

    fn inject(name: &str, ty: &str) -> FieldInfo {
        FieldInfo::new(name, Type::class(ty)).annotation(marker(&names::INJECT))
    }

    fn service_impl(name: &str) -> ClassInfo {
        ClassInfo::builder(name)
            .no_args_constructor()
            .implements(Type::class("a.Service"))
            .annotation(marker(&names::SINGLETON))
            .build()
    }

    fn service() -> ClassInfo {
        ClassInfo::builder("a.Service").interface().build()
    }

    #[test]
    fn test_unique_candidate_resolves() {
        let deployment = deploy(vec![
            service(),
            service_impl("a.Impl"),
            ClassInfo::builder("a.Client")
                .no_args_constructor()
                .annotation(marker(&names::SINGLETON))
                .field(inject("service", "a.Service"))
                .build(),
        ])
        .unwrap();
        let resolutions = resolve_injection_points(&deployment).unwrap();
        let point = deployment.beans()[1].injection_points().next().unwrap();
        assert_eq!(resolutions.get(point.id()), Some(ResolvedTarget::Bean(BeanId(0))));
    }

    #[test]
    fn test_unsatisfied_and_ambiguous_collected() {
        let deployment = deploy(vec![
            service(),
            service_impl("a.C1"),
            service_impl("a.C2"),
            ClassInfo::builder("a.Client")
                .no_args_constructor()
                .annotation(marker(&names::SINGLETON))
                .field(inject("service", "a.Service"))
                .field(inject("missing", "a.Missing"))
                .build(),
        ])
        .unwrap();
        let err = resolve_injection_points(&deployment).unwrap_err();
        assert_eq!(err.problems().len(), 2);
        assert!(err.is_ambiguous());
        assert!(err.is_unsatisfied());
        let message = err.to_string();
        assert!(message.contains("a.C1"));
        assert!(message.contains("a.C2"));
    }

    #[test]
    fn test_alternative_with_highest_priority_wins() {
        let alternative = |name: &str, priority: i32| {
            ClassInfo::builder(name)
                .no_args_constructor()
                .implements(Type::class("a.Service"))
                .annotation(marker(&names::SINGLETON))
                .annotation(marker(&names::ALTERNATIVE))
                .annotation(AnnotationInstance::marker(names::PRIORITY.clone()).with_value(priority))
                .build()
        };
        let deployment = deploy(vec![
            service(),
            service_impl("a.Plain"),
            alternative("a.Low", 1),
            alternative("a.High", 10),
        ])
        .unwrap();
        let resolver = BeanResolver::new(&deployment);
        let candidates = resolver.resolve(&Type::class("a.Service"), &[marker(&names::DEFAULT)]);
        assert_eq!(candidates.len(), 3);
        let selected = resolve_ambiguity(&deployment, &candidates).unwrap();
        assert_eq!(selected.bean_class().as_str(), "a.High");

        let tied = deploy(vec![service(), alternative("a.A", 5), alternative("a.B", 5)]).unwrap();
        let resolver = BeanResolver::new(&tied);
        let candidates = resolver.resolve(&Type::class("a.Service"), &[marker(&names::DEFAULT)]);
        assert!(resolve_ambiguity(&tied, &candidates).is_none());
    }

    #[test]
    fn test_builtin_beans() {
        assert_eq!(
            BuiltinBean::for_type(&Type::parameterized(names::PROVIDER.clone(), [Type::class("a.A")])),
            Some(BuiltinBean::Instance)
        );
        assert_eq!(BuiltinBean::for_type(&Type::class("a.A")), None);

        let deployment = deploy(vec![
            ClassInfo::builder("a.Holder")
                .no_args_constructor()
                .annotation(marker(&names::SINGLETON))
                .field(inject("point", names::INJECTION_POINT.as_str()))
                .build(),
        ])
        .unwrap();
        let err = resolve_injection_points(&deployment).unwrap_err();
        assert!(matches!(err, DeploymentError::Definition(_)));
    }

    #[test]
    fn test_interceptor_resolution_order() {
        let binding = ClassInfo::builder("a.Logged")
            .annotation_type()
            .annotation(marker(&names::INTERCEPTOR_BINDING))
            .build();
        let interceptor = |name: &str, priority: i32| {
            ClassInfo::builder(name)
                .no_args_constructor()
                .annotation(marker(&names::INTERCEPTOR))
                .annotation(AnnotationInstance::marker("a.Logged"))
                .annotation(AnnotationInstance::marker(names::PRIORITY.clone()).with_value(priority))
                .method(hook_method("around", InterceptionType::AroundInvoke))
                .build()
        };
        let deployment = deploy(vec![
            binding,
            interceptor("a.First", 1),
            interceptor("a.Second", 100),
            interceptor("a.Third", 1),
        ])
        .unwrap();
        let resolver = InterceptorResolver::new(&deployment);
        let order: Vec<usize> = resolver
            .resolve(InterceptionType::AroundInvoke, &[AnnotationInstance::marker("a.Logged")])
            .into_iter()
            .map(BeanId::index)
            .collect();
        assert_eq!(order, vec![1, 0, 2]);
        assert!(resolver.resolve(InterceptionType::PreDestroy, &[AnnotationInstance::marker("a.Logged")]).is_empty());
        assert!(resolver.resolve(InterceptionType::AroundInvoke, &[]).is_empty());
    }
}
