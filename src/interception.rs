//! Interception analysis
//!
//! For every class bean, computes the interceptor chain of each business
//! method and of each lifecycle phase, and decides whether the bean needs a
//! generated subclass.

use crate::bean::{BeanId, BeanInfo};
use crate::deployment::BeanDeployment;
use crate::error::{DeploymentError, Result};
use crate::index::{AnnotationInstance, ClassInfo, IndexView, MethodInfo, Modifiers};
use crate::interceptor::InterceptionType;
use crate::names;
use crate::resolver::InterceptorResolver;
use ahash::{AHashMap, AHashSet};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// A business method with a non-empty interceptor chain
#[derive(Debug, Clone)]
pub struct InterceptedMethod {
    method: MethodInfo,
    bindings: Vec<AnnotationInstance>,
    interceptors: Vec<BeanId>,
}

impl InterceptedMethod {
    pub fn method(&self) -> &MethodInfo {
        &self.method
    }

    /// Effective bindings: method level first, then class levels
    pub fn bindings(&self) -> &[AnnotationInstance] {
        &self.bindings
    }

    /// Around-invoke interceptors, outermost first
    pub fn interceptors(&self) -> &[BeanId] {
        &self.interceptors
    }
}

/// Interception data of one class bean
#[derive(Debug, Clone)]
pub struct BeanInterception {
    bean: BeanId,
    methods: Vec<InterceptedMethod>,
    post_construct: Vec<BeanId>,
    pre_destroy: Vec<BeanId>,
    around_construct: Vec<BeanId>,
}

impl BeanInterception {
    #[inline]
    pub fn bean(&self) -> BeanId {
        self.bean
    }

    pub fn intercepted_methods(&self) -> &[InterceptedMethod] {
        &self.methods
    }

    /// Interceptors of a lifecycle phase; empty for around-invoke
    pub fn lifecycle(&self, phase: InterceptionType) -> &[BeanId] {
        match phase {
            InterceptionType::PostConstruct => &self.post_construct,
            InterceptionType::PreDestroy => &self.pre_destroy,
            InterceptionType::AroundConstruct => &self.around_construct,
            InterceptionType::AroundInvoke => &[],
        }
    }

    /// A subclass is generated iff a method is intercepted or a pre-destroy
    /// interceptor applies
    pub fn requires_subclass(&self) -> bool {
        !self.methods.is_empty() || !self.pre_destroy.is_empty()
    }

    /// Every interceptor used by the bean, in first-use order
    pub fn interceptors(&self) -> Vec<BeanId> {
        let mut seen = AHashSet::new();
        self.around_construct
            .iter()
            .chain(&self.post_construct)
            .chain(&self.pre_destroy)
            .chain(self.methods.iter().flat_map(|m| &m.interceptors))
            .copied()
            .filter(|id| seen.insert(*id))
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.methods.is_empty()
            && self.post_construct.is_empty()
            && self.pre_destroy.is_empty()
            && self.around_construct.is_empty()
    }
}

/// Interception data of a deployment, keyed by bean
#[derive(Debug, Clone, Default)]
pub struct InterceptionModel {
    beans: AHashMap<BeanId, BeanInterception>,
}

impl InterceptionModel {
    pub fn get(&self, bean: BeanId) -> Option<&BeanInterception> {
        self.beans.get(&bean)
    }

    pub fn requires_subclass(&self, bean: BeanId) -> bool {
        self.get(bean).is_some_and(BeanInterception::requires_subclass)
    }

    pub fn interceptors_of(&self, bean: BeanId) -> Vec<BeanId> {
        self.get(bean).map(BeanInterception::interceptors).unwrap_or_default()
    }

    /// Number of intercepted beans
    pub fn len(&self) -> usize {
        self.beans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beans.is_empty()
    }
}

/// Analyze every active class bean of the deployment
pub fn analyze(deployment: &BeanDeployment) -> Result<InterceptionModel> {
    let mut model = InterceptionModel::default();
    if !deployment.active_beans().any(BeanInfo::is_interceptor) {
        return Ok(model);
    }
    let resolver = InterceptorResolver::new(deployment);
    let mut errors = Vec::new();
    for bean in deployment.active_beans().filter(|b| b.is_class_bean()) {
        match analyze_bean(deployment, &resolver, bean) {
            Ok(Some(interception)) => {
                model.beans.insert(bean.id(), interception);
            }
            Ok(None) => {}
            Err(error) => errors.push(error),
        }
    }
    if let Some(error) = DeploymentError::aggregate(errors) {
        return Err(error);
    }
    #[cfg(feature = "logging")]
    debug!(
        target: "bean_processor",
        intercepted_beans = model.len(),
        subclasses = model.beans.values().filter(|b| b.requires_subclass()).count(),
        "Interception analyzed"
    );
    Ok(model)
}

fn analyze_bean(
    deployment: &BeanDeployment,
    resolver: &InterceptorResolver<'_>,
    bean: &BeanInfo,
) -> Result<Option<BeanInterception>> {
    let index = deployment.index();
    let class = index
        .class_by_name(bean.bean_class())
        .ok_or_else(|| DeploymentError::class_not_found(bean.bean_class()))?;
    let chain = superclass_chain(index, class);
    let class_bindings = class_level_bindings(deployment, bean, &chain);

    let mut methods = Vec::new();
    for method in business_methods(&chain) {
        let method_bindings = deployment.bindings_of(&deployment.annotation_store().method_annotations(method));
        let bindings = merge_bindings(method_bindings, &class_bindings);
        let interceptors = resolver.resolve(InterceptionType::AroundInvoke, &bindings);
        if interceptors.is_empty() {
            continue;
        }
        if method.flags().is_final() {
            return Err(DeploymentError::definition(format!(
                "Intercepted method must not be final: {method}"
            )));
        }
        #[cfg(feature = "logging")]
        trace!(
            target: "bean_processor",
            method = %method,
            interceptors = interceptors.len(),
            "Intercepted method"
        );
        methods.push(InterceptedMethod {
            method: method.clone(),
            bindings,
            interceptors,
        });
    }

    let constructor_bindings = bean
        .constructor_injection()
        .and_then(|injection| injection.method())
        .or_else(|| class.constructors().find(|c| c.parameters().is_empty()))
        .map(|constructor| deployment.bindings_of(&deployment.annotation_store().method_annotations(constructor)))
        .unwrap_or_default();

    let interception = BeanInterception {
        bean: bean.id(),
        methods,
        post_construct: resolver.resolve(InterceptionType::PostConstruct, &class_bindings),
        pre_destroy: resolver.resolve(InterceptionType::PreDestroy, &class_bindings),
        around_construct: resolver.resolve(
            InterceptionType::AroundConstruct,
            &merge_bindings(constructor_bindings, &class_bindings),
        ),
    };
    if interception.requires_subclass() && class.is_final() {
        return Err(DeploymentError::definition(format!(
            "Intercepted bean class must not be final: {}",
            class.name()
        )));
    }
    Ok((!interception.is_empty()).then_some(interception))
}

/// The class followed by its superclasses, nearest first
pub(crate) fn superclass_chain<'i>(index: &'i dyn IndexView, class: &'i ClassInfo) -> Vec<&'i ClassInfo> {
    let mut chain = vec![class];
    let mut current = class;
    while let Some(super_name) = current.super_name() {
        if names::is_object(super_name) {
            break;
        }
        match index.class_by_name(super_name) {
            Some(parent) => {
                chain.push(parent);
                current = parent;
            }
            None => break,
        }
    }
    chain
}

/// Bindings of the bean class (stereotypes included), then of each
/// superclass; the first occurrence of a binding type wins
fn class_level_bindings(deployment: &BeanDeployment, bean: &BeanInfo, chain: &[&ClassInfo]) -> Vec<AnnotationInstance> {
    let mut bindings = bean.class_bindings().to_vec();
    for superclass in chain.iter().skip(1) {
        let inherited = deployment.bindings_of(&deployment.annotation_store().class_annotations(superclass));
        bindings = merge_bindings(bindings, &inherited);
    }
    bindings
}

/// `first` followed by each binding of `then` whose type is not present yet
fn merge_bindings(mut first: Vec<AnnotationInstance>, then: &[AnnotationInstance]) -> Vec<AnnotationInstance> {
    for binding in then {
        if !first.iter().any(|b| b.name() == binding.name()) {
            first.push(binding.clone());
        }
    }
    first
}

/// Non-static, non-private, non-constructor methods of the chain; an
/// overridden method is reported once, from the nearest class
pub(crate) fn business_methods<'i>(chain: &[&'i ClassInfo]) -> Vec<&'i MethodInfo> {
    let Some(bean_class) = chain.first() else {
        return Vec::new();
    };
    let package = bean_class.name().package_name();
    let mut seen = AHashSet::new();
    let mut methods = Vec::new();
    for class in chain {
        let foreign_package = class.name().package_name() != package;
        for method in class.methods() {
            let flags = method.flags();
            if method.is_constructor()
                || flags.is_static()
                || flags.is_private()
                || flags.contains(Modifiers::BRIDGE)
                || flags.contains(Modifiers::SYNTHETIC)
            {
                continue;
            }
            if foreign_package && flags.is_package_private() {
                continue;
            }
            if !seen.insert(method.signature()) {
                continue;
            }
            methods.push(method);
        }
    }
    methods
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment::tests::{deploy, marker};
    use crate::index::Type;
    use crate::interceptor::tests::hook_method;

    fn logged() -> AnnotationInstance {
        AnnotationInstance::marker("a.Logged")
    }

    fn binding_type() -> ClassInfo {
        ClassInfo::builder("a.Logged")
            .annotation_type()
            .annotation(marker(&names::INTERCEPTOR_BINDING))
            .build()
    }

    fn interceptor(hooks: &[InterceptionType]) -> ClassInfo {
        let mut builder = ClassInfo::builder("a.LoggingInterceptor")
            .no_args_constructor()
            .annotation(marker(&names::INTERCEPTOR))
            .annotation(logged());
        for hook in hooks {
            builder = builder.method(hook_method(&hook.constant().to_lowercase(), *hook));
        }
        builder.build()
    }

    fn bean_of<'d>(deployment: &'d BeanDeployment, name: &str) -> &'d BeanInfo {
        deployment
            .beans()
            .iter()
            .find(|b| b.bean_class().as_str() == name && b.is_class_bean())
            .unwrap()
    }

    #[test]
    fn test_method_binding_requires_subclass() {
        let deployment = deploy(vec![
            binding_type(),
            interceptor(&[InterceptionType::AroundInvoke]),
            ClassInfo::builder("a.Service")
                .no_args_constructor()
                .annotation(marker(&names::SINGLETON))
                .method(MethodInfo::new("ping").annotation(logged()))
                .method(MethodInfo::new("pong"))
                .method(MethodInfo::new("helper").modifiers(Modifiers::PRIVATE).annotation(logged()))
                .build(),
            ClassInfo::builder("a.Plain")
                .no_args_constructor()
                .annotation(marker(&names::SINGLETON))
                .method(MethodInfo::new("ping"))
                .build(),
        ])
        .unwrap();
        let model = analyze(&deployment).unwrap();
        let service = bean_of(&deployment, "a.Service");
        let interception = model.get(service.id()).unwrap();
        let names: Vec<&str> = interception.intercepted_methods().iter().map(|m| m.method().name()).collect();
        assert_eq!(names, vec!["ping"]);
        assert!(model.requires_subclass(service.id()));
        assert!(!model.requires_subclass(bean_of(&deployment, "a.Plain").id()));
    }

    #[test]
    fn test_superclass_methods_and_bindings() {
        let deployment = deploy(vec![
            binding_type(),
            interceptor(&[InterceptionType::AroundInvoke]),
            ClassInfo::builder("b.Base")
                .annotation(logged())
                .method(MethodInfo::new("inherited"))
                .method(MethodInfo::new("overridden"))
                .method(MethodInfo::new("hidden").modifiers(Modifiers::empty()))
                .build(),
            ClassInfo::builder("a.Child")
                .extends(Type::class("b.Base"))
                .no_args_constructor()
                .annotation(marker(&names::SINGLETON))
                .method(MethodInfo::new("overridden"))
                .build(),
        ])
        .unwrap();
        let model = analyze(&deployment).unwrap();
        let child = bean_of(&deployment, "a.Child");
        let methods: Vec<String> = model
            .get(child.id())
            .unwrap()
            .intercepted_methods()
            .iter()
            .map(|m| format!("{}#{}", m.method().declaring_class(), m.method().name()))
            .collect();
        assert_eq!(methods, vec!["a.Child#overridden", "b.Base#inherited"]);
    }

    #[test]
    fn test_lifecycle_interceptors() {
        let deployment = deploy(vec![
            binding_type(),
            interceptor(&[InterceptionType::PostConstruct, InterceptionType::PreDestroy]),
            ClassInfo::builder("a.Service")
                .no_args_constructor()
                .annotation(marker(&names::SINGLETON))
                .annotation(logged())
                .build(),
        ])
        .unwrap();
        let model = analyze(&deployment).unwrap();
        let service = bean_of(&deployment, "a.Service");
        let interception = model.get(service.id()).unwrap();
        assert!(interception.intercepted_methods().is_empty());
        assert_eq!(interception.lifecycle(InterceptionType::PostConstruct).len(), 1);
        assert_eq!(interception.lifecycle(InterceptionType::PreDestroy).len(), 1);
        assert!(interception.lifecycle(InterceptionType::AroundConstruct).is_empty());
        assert!(interception.requires_subclass());
        assert_eq!(model.interceptors_of(service.id()).len(), 1);
    }

    #[test]
    fn test_final_intercepted_method_fails() {
        let deployment = deploy(vec![
            binding_type(),
            interceptor(&[InterceptionType::AroundInvoke]),
            ClassInfo::builder("a.Service")
                .no_args_constructor()
                .annotation(marker(&names::SINGLETON))
                .method(
                    MethodInfo::new("ping")
                        .modifiers(Modifiers::PUBLIC | Modifiers::FINAL)
                        .annotation(logged()),
                )
                .build(),
        ])
        .unwrap();
        let err = analyze(&deployment).unwrap_err();
        assert!(matches!(err, DeploymentError::Definition(message) if message.contains("ping")));
    }

    #[test]
    fn test_foreign_package_private_method_does_not_hide_inherited() {
        let child = ClassInfo::builder("a.Child").extends(Type::class("b.Middle")).build();
        let middle = ClassInfo::builder("b.Middle")
            .extends(Type::class("a.Root"))
            .method(MethodInfo::new("work").modifiers(Modifiers::empty()))
            .build();
        let root = ClassInfo::builder("a.Root")
            .method(MethodInfo::new("work").modifiers(Modifiers::empty()))
            .build();
        let methods: Vec<String> = business_methods(&[&child, &middle, &root])
            .iter()
            .map(|m| format!("{}#{}", m.declaring_class(), m.name()))
            .collect();
        assert_eq!(methods, vec!["a.Root#work"]);
    }

    #[test]
    fn test_merge_keeps_first_occurrence() {
        let near = AnnotationInstance::marker("a.Level").with_value("method");
        let far = AnnotationInstance::marker("a.Level").with_value("class");
        let merged = merge_bindings(vec![near.clone()], &[far, logged()]);
        assert_eq!(merged, vec![near, logged()]);
    }
}
