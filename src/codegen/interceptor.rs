//! Interceptor provider classes
//!
//! An interceptor is a dependent bean whose provider additionally exposes its
//! bindings, priority and a dispatch method invoking the hook of a phase.

use super::bean::{create_method, destroy_method, get_method, provider_skeleton};
use super::output::{Resource, SpecialType};
use super::shape::{Expr, MethodShape, Stmt};
use super::{GenerationContext, bean_dependencies, runtime};
use crate::bean::BeanInfo;
use crate::error::{DeploymentError, Result};
use crate::index::{AnnotationInstance, Type};
use crate::interceptor::InterceptionType;
use crate::names;

#[cfg(feature = "logging")]
use tracing::trace;

pub(crate) fn generate(ctx: &GenerationContext<'_>, bean: &BeanInfo) -> Result<Resource> {
    let info = bean
        .interceptor_info()
        .ok_or_else(|| DeploymentError::definition(format!("Not an interceptor: {}", bean.bean_class())))?;
    let dependencies = bean_dependencies(ctx, bean)?;
    let mut builder = provider_skeleton(ctx, bean, &dependencies, runtime::INJECTABLE_INTERCEPTOR)?;
    builder.push_method(create_method(ctx, bean, &dependencies)?);
    builder.push_method(destroy_method(ctx, bean, &dependencies)?);
    builder.push_method(get_method(bean));

    builder.push_method(
        MethodShape::new("getInterceptorBindings")
            .returns(runtime::SET)
            .stmt(Stmt::ret(Expr::invoke_static(runtime::SET, "of", literals(ctx, info.bindings())?))),
    );
    builder.push_method(
        MethodShape::new("getPriority")
            .returns("int")
            .stmt(Stmt::ret(Expr::Int(i64::from(info.priority())))),
    );

    let phase_constant = |phase: InterceptionType| Expr::static_field(runtime::INTERCEPTION_TYPE, phase.constant());
    let mut intercepts = MethodShape::new("intercepts")
        .param("type", runtime::INTERCEPTION_TYPE)
        .returns("boolean");
    let mut intercept = MethodShape::new("intercept")
        .param("type", runtime::INTERCEPTION_TYPE)
        .param("instance", runtime::OBJECT)
        .param("invocationContext", names::INVOCATION_CONTEXT.as_str())
        .returns(runtime::OBJECT);
    for phase in InterceptionType::ALL {
        let Some(hook) = info.hook(phase) else {
            continue;
        };
        intercepts = intercepts.stmt(Stmt::if_then(
            Expr::local("type").equals(phase_constant(phase)),
            vec![Stmt::ret(Expr::Bool(true))],
        ));
        let target = Expr::local("instance").cast(bean.bean_class().as_str());
        let call = ctx.invoke_method(hook, target, vec![Expr::local("invocationContext")]);
        let body = match hook.return_type() {
            Type::Void => vec![Stmt::Expr(call), Stmt::ret(Expr::Null)],
            _ => vec![Stmt::ret(call)],
        };
        intercept = intercept.stmt(Stmt::if_then(Expr::local("type").equals(phase_constant(phase)), body));
    }
    builder.push_method(intercepts.stmt(Stmt::ret(Expr::Bool(false))));
    builder.push_method(intercept.stmt(Stmt::ret(Expr::Null)));

    let shape = builder.build();
    #[cfg(feature = "logging")]
    trace!(
        target: "bean_processor",
        interceptor = %bean.bean_class(),
        priority = info.priority(),
        "Interceptor provider generated"
    );
    ctx.emit(&shape, Some(SpecialType::InterceptorBean))
}

fn literals(ctx: &GenerationContext<'_>, annotations: &[AnnotationInstance]) -> Result<Vec<Expr>> {
    annotations.iter().map(|a| ctx.literal(a)).collect()
}

#[cfg(test)]
mod tests {
    use crate::codegen::tests::{generate_listings, listing};
    use crate::deployment::tests::marker;
    use crate::index::{AnnotationInstance, ClassInfo, MethodInfo, MethodParameter, Modifiers, Type};
    use crate::interceptor::InterceptionType;
    use crate::names;

    #[test]
    fn test_interceptor_provider() {
        let logged = AnnotationInstance::marker("a.Logged");
        let classes = vec![
            ClassInfo::builder("a.Logged")
                .annotation_type()
                .annotation(marker(&names::INTERCEPTOR_BINDING))
                .build(),
            ClassInfo::builder("a.LoggingInterceptor")
                .no_args_constructor()
                .annotation(marker(&names::INTERCEPTOR))
                .annotation(logged.clone())
                .annotation(AnnotationInstance::marker(names::PRIORITY.clone()).with_value(5))
                .method(
                    MethodInfo::new("log")
                        .returns(Type::object())
                        .modifiers(Modifiers::PRIVATE)
                        .parameter(MethodParameter::new(Type::class("javax.interceptor.InvocationContext")))
                        .annotation(AnnotationInstance::marker(InterceptionType::AroundInvoke.annotation().clone())),
                )
                .build(),
        ];
        let listings = generate_listings(classes).unwrap();
        let text = listing(&listings, "a/LoggingInterceptor_Bean");
        assert!(text.contains("implements org.jboss.protean.arc.InjectableInterceptor"));
        assert!(text.contains("return 5;"));
        assert!(text.contains("if (type.equals(javax.enterprise.inject.spi.InterceptionType.AROUND_INVOKE)) {"));
        assert!(text.contains("org.jboss.protean.arc.Reflections.invokeMethod(a.LoggingInterceptor.class, \"log\""));
        assert!(text.contains("new a.Logged_Shared_AnnotationLiteral()"));
        assert!(!text.contains("POST_CONSTRUCT"));
    }

    #[test]
    fn test_void_lifecycle_hook_returns_null() {
        let logged = AnnotationInstance::marker("a.Logged");
        let classes = vec![
            ClassInfo::builder("a.Logged")
                .annotation_type()
                .annotation(marker(&names::INTERCEPTOR_BINDING))
                .build(),
            ClassInfo::builder("a.LifeInterceptor")
                .no_args_constructor()
                .annotation(marker(&names::INTERCEPTOR))
                .annotation(logged)
                .method(
                    MethodInfo::new("init")
                        .parameter(MethodParameter::new(Type::class(names::INVOCATION_CONTEXT.clone())))
                        .annotation(AnnotationInstance::marker(InterceptionType::PostConstruct.annotation().clone())),
                )
                .build(),
        ];
        let listings = generate_listings(classes).unwrap();
        let text = listing(&listings, "a/LifeInterceptor_Bean");
        assert!(text.contains("            ((a.LifeInterceptor) instance).init(invocationContext);\n            return null;"));
        assert!(!text.contains("return ((a.LifeInterceptor) instance).init(invocationContext);"));
    }
}
