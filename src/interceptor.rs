//! Interceptor descriptors

use crate::deployment::Discovery;
use crate::error::{DeploymentError, Result};
use crate::bean::priority_value;
use crate::index::{AnnotationInstance, ClassInfo, DotName, MethodInfo, Type};
use crate::names;
use std::fmt;

/// Phase an interceptor can take part in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InterceptionType {
    PostConstruct,
    PreDestroy,
    AroundConstruct,
    AroundInvoke,
}

impl InterceptionType {
    pub const ALL: [InterceptionType; 4] = [
        InterceptionType::PostConstruct,
        InterceptionType::PreDestroy,
        InterceptionType::AroundConstruct,
        InterceptionType::AroundInvoke,
    ];

    /// Annotation marking the hook method for this phase
    pub fn annotation(self) -> &'static DotName {
        match self {
            Self::PostConstruct => &names::POST_CONSTRUCT,
            Self::PreDestroy => &names::PRE_DESTROY,
            Self::AroundConstruct => &names::AROUND_CONSTRUCT,
            Self::AroundInvoke => &names::AROUND_INVOKE,
        }
    }

    /// Constant name used by generated code: `AROUND_INVOKE`
    pub fn constant(self) -> &'static str {
        match self {
            Self::PostConstruct => "POST_CONSTRUCT",
            Self::PreDestroy => "PRE_DESTROY",
            Self::AroundConstruct => "AROUND_CONSTRUCT",
            Self::AroundInvoke => "AROUND_INVOKE",
        }
    }
}

impl fmt::Display for InterceptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.constant())
    }
}

/// Interceptor-specific part of an interceptor bean
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptorInfo {
    bindings: Vec<AnnotationInstance>,
    priority: i32,
    post_construct: Option<MethodInfo>,
    pre_destroy: Option<MethodInfo>,
    around_construct: Option<MethodInfo>,
    around_invoke: Option<MethodInfo>,
}

/// A hook takes exactly one `InvocationContext`; an around-invoke hook also
/// returns a value
fn check_hook(class: &ClassInfo, phase: InterceptionType, method: &MethodInfo) -> Result<()> {
    let takes_context = match method.parameters() {
        [parameter] => parameter.ty().raw_name() == Some(&*names::INVOCATION_CONTEXT),
        _ => false,
    };
    if !takes_context {
        return Err(DeploymentError::definition(format!(
            "Interceptor {} {phase} method must declare a single InvocationContext parameter: {method}",
            class.name()
        )));
    }
    if phase == InterceptionType::AroundInvoke && method.return_type() == &Type::Void {
        return Err(DeploymentError::definition(format!(
            "Interceptor {} {phase} method must return Object: {method}",
            class.name()
        )));
    }
    Ok(())
}

impl InterceptorInfo {
    /// Read bindings, priority and hooks of an `@Interceptor` class
    pub(crate) fn from_class(discovery: &Discovery<'_>, class: &ClassInfo) -> Result<Self> {
        let annotations = discovery.store.class_annotations(class);
        let mut bindings = discovery.bindings_of(&annotations);
        for annotation in annotations.iter() {
            if let Some(stereotype) = discovery.tables.stereotypes.get(annotation.name()) {
                for binding in stereotype.bindings() {
                    if !bindings.iter().any(|b| b.name() == binding.name()) {
                        bindings.push(binding.clone());
                    }
                }
            }
        }
        if bindings.is_empty() {
            return Err(DeploymentError::definition(format!(
                "Interceptor has no bindings: {}",
                class.name()
            )));
        }

        let priority = match annotations.iter().find(|a| a.name() == &*names::PRIORITY) {
            Some(annotation) => priority_value(annotation, class.name())?.unwrap_or(0),
            None => 0,
        };

        let mut info = Self {
            bindings,
            priority,
            post_construct: None,
            pre_destroy: None,
            around_construct: None,
            around_invoke: None,
        };
        for method in class.methods() {
            for phase in InterceptionType::ALL {
                if !discovery.store.method_has(method, phase.annotation()) {
                    continue;
                }
                check_hook(class, phase, method)?;
                let slot = info.slot_mut(phase);
                if slot.is_some() {
                    return Err(DeploymentError::definition(format!(
                        "Interceptor {} declares more than one {phase} method",
                        class.name()
                    )));
                }
                *slot = Some(method.clone());
            }
        }
        Ok(info)
    }

    #[cfg(test)]
    pub(crate) fn for_test(bindings: Vec<AnnotationInstance>, priority: i32, phases: &[InterceptionType]) -> Self {
        let mut info = Self {
            bindings,
            priority,
            post_construct: None,
            pre_destroy: None,
            around_construct: None,
            around_invoke: None,
        };
        for phase in phases {
            *info.slot_mut(*phase) = Some(MethodInfo::new(phase.constant().to_lowercase()));
        }
        info
    }

    fn slot_mut(&mut self, phase: InterceptionType) -> &mut Option<MethodInfo> {
        match phase {
            InterceptionType::PostConstruct => &mut self.post_construct,
            InterceptionType::PreDestroy => &mut self.pre_destroy,
            InterceptionType::AroundConstruct => &mut self.around_construct,
            InterceptionType::AroundInvoke => &mut self.around_invoke,
        }
    }

    pub fn bindings(&self) -> &[AnnotationInstance] {
        &self.bindings
    }

    #[inline]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// True iff a hook method for the phase exists
    pub fn intercepts(&self, phase: InterceptionType) -> bool {
        self.hook(phase).is_some()
    }

    pub fn hook(&self, phase: InterceptionType) -> Option<&MethodInfo> {
        match phase {
            InterceptionType::PostConstruct => self.post_construct.as_ref(),
            InterceptionType::PreDestroy => self.pre_destroy.as_ref(),
            InterceptionType::AroundConstruct => self.around_construct.as_ref(),
            InterceptionType::AroundInvoke => self.around_invoke.as_ref(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::deployment::tests::{deploy, marker};
    use crate::index::MethodParameter;

    /// Well-formed hook of an interceptor class for `phase`
    pub(crate) fn hook_method(name: &str, phase: InterceptionType) -> MethodInfo {
        let method = MethodInfo::new(name)
            .parameter(MethodParameter::new(Type::class(names::INVOCATION_CONTEXT.clone())))
            .annotation(AnnotationInstance::marker(phase.annotation().clone()));
        match phase {
            InterceptionType::AroundInvoke => method.returns(Type::object()),
            _ => method,
        }
    }

    #[test]
    fn test_intercepts_follows_hooks() {
        let info = InterceptorInfo::for_test(
            vec![AnnotationInstance::marker("a.Logged")],
            10,
            &[InterceptionType::AroundInvoke],
        );
        assert!(info.intercepts(InterceptionType::AroundInvoke));
        assert!(!info.intercepts(InterceptionType::PreDestroy));
        assert_eq!(info.hook(InterceptionType::AroundInvoke).unwrap().name(), "around_invoke");
        assert_eq!(info.priority(), 10);
    }

    fn interceptor_with(hook: MethodInfo) -> Vec<ClassInfo> {
        vec![
            ClassInfo::builder("a.Logged")
                .annotation_type()
                .annotation(marker(&names::INTERCEPTOR_BINDING))
                .build(),
            ClassInfo::builder("a.LifeInterceptor")
                .no_args_constructor()
                .annotation(marker(&names::INTERCEPTOR))
                .annotation(AnnotationInstance::marker("a.Logged"))
                .method(hook)
                .build(),
        ]
    }

    #[test]
    fn test_hook_without_invocation_context_rejected() {
        let around = MethodInfo::new("around")
            .returns(Type::object())
            .annotation(marker(&names::AROUND_INVOKE));
        let err = deploy(interceptor_with(around)).err().unwrap();
        assert!(matches!(err, DeploymentError::Definition(ref message) if message.contains("InvocationContext")));
    }

    #[test]
    fn test_void_around_invoke_rejected() {
        let around = MethodInfo::new("around")
            .parameter(MethodParameter::new(Type::class(names::INVOCATION_CONTEXT.clone())))
            .annotation(marker(&names::AROUND_INVOKE));
        let err = deploy(interceptor_with(around)).err().unwrap();
        assert!(matches!(err, DeploymentError::Definition(ref message) if message.contains("must return Object")));
    }

    #[test]
    fn test_priority_out_of_range_rejected() {
        let mut classes = interceptor_with(hook_method("init", InterceptionType::PostConstruct));
        classes[1] = ClassInfo::builder("a.LifeInterceptor")
            .no_args_constructor()
            .annotation(marker(&names::INTERCEPTOR))
            .annotation(AnnotationInstance::marker("a.Logged"))
            .annotation(AnnotationInstance::marker(names::PRIORITY.clone()).with_value(i64::from(i32::MAX) + 1))
            .method(hook_method("init", InterceptionType::PostConstruct))
            .build();
        let err = deploy(classes).err().unwrap();
        assert!(matches!(err, DeploymentError::Definition(ref message) if message.contains("@Priority")));
    }
}
