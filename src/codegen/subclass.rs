//! Intercepted subclasses
//!
//! A bean with intercepted business methods, or with pre-destroy
//! interceptors, is instantiated as a generated subclass. Every intercepted
//! method runs its around-invoke chain before forwarding to `super`.

use super::bean::CTX;
use super::output::Resource;
use super::shape::{ClassShape, Expr, FieldShape, MethodShape, Stmt};
use super::{GenerationContext, reference, runtime, subclass_name, type_name};
use crate::bean::{BeanId, BeanInfo};
use crate::error::{DeploymentError, Result};
use crate::index::{MethodInfo, Modifiers, Type};
use crate::interceptor::InterceptionType;

#[cfg(feature = "logging")]
use tracing::trace;

/// `new InterceptorInvocation[]{...}` from `(provider, instance)` pairs
pub(super) fn invocations(phase: InterceptionType, pairs: impl IntoIterator<Item = (Expr, Expr)>) -> Expr {
    let factory = match phase {
        InterceptionType::PostConstruct => "postConstruct",
        InterceptionType::PreDestroy => "preDestroy",
        InterceptionType::AroundConstruct => "aroundConstruct",
        InterceptionType::AroundInvoke => "aroundInvoke",
    };
    Expr::array(
        runtime::INTERCEPTOR_INVOCATION,
        pairs
            .into_iter()
            .map(|(provider, instance)| Expr::invoke_static(runtime::INTERCEPTOR_INVOCATION, factory, [provider, instance])),
    )
}

/// Key of an intercepted method in the chain map
fn method_key(method: &MethodInfo, position: usize) -> String {
    format!("{}_{position}", method.name())
}

fn visibility(flags: Modifiers) -> Modifiers {
    if flags.is_public() {
        Modifiers::PUBLIC
    } else if flags.contains(Modifiers::PROTECTED) {
        Modifiers::PROTECTED
    } else {
        Modifiers::empty()
    }
}

pub(crate) fn generate(ctx: &GenerationContext<'_>, bean: &BeanInfo) -> Result<Resource> {
    let interception = ctx.interception.get(bean.id()).ok_or_else(|| {
        DeploymentError::definition(format!("No interception data for {}", bean.bean_class()))
    })?;
    let interceptors = interception.interceptors();
    let slot_of = |interceptor: BeanId| interceptors.iter().position(|i| *i == interceptor);

    let mut builder = ClassShape::builder(subclass_name(bean))
        .extends(bean.bean_class().as_str())
        .implements(runtime::SUBCLASS)
        .source(bean.bean_class().as_str());

    // constructor: bean constructor parameters, the context, the interceptors
    let mut constructor = MethodShape::constructor();
    let super_params: Vec<Type> = bean
        .constructor_injection()
        .and_then(|injection| injection.method())
        .map(MethodInfo::parameter_types)
        .unwrap_or_default();
    let mut super_args = Vec::with_capacity(super_params.len());
    for (i, ty) in super_params.iter().enumerate() {
        let name = format!("arg{i}");
        constructor = constructor.param(name.clone(), type_name(ty));
        super_args.push(Expr::local(name));
    }
    constructor = constructor
        .param(CTX, runtime::CREATIONAL_CONTEXT)
        .stmt(Expr::invoke_super(super::shape::CONSTRUCTOR, super_args));
    for i in 0..interceptors.len() {
        let provider = format!("interceptorProvider{i}");
        let instance = format!("interceptorInstance{i}");
        builder.push_field(FieldShape::new(provider.clone(), runtime::INJECTABLE_INTERCEPTOR));
        builder.push_field(FieldShape::new(instance.clone(), runtime::OBJECT));
        constructor = constructor
            .param(provider.clone(), runtime::INJECTABLE_INTERCEPTOR)
            .stmt(Stmt::assign(Expr::this_field(provider.clone()), Expr::local(provider.clone())))
            .stmt(Stmt::assign(Expr::this_field(instance), reference(&provider, Expr::local(CTX))));
    }

    let chain_of = |ids: &[BeanId]| -> Result<Vec<(Expr, Expr)>> {
        let mut pairs = Vec::with_capacity(ids.len());
        for id in ids {
            let slot = slot_of(*id).ok_or_else(|| {
                DeploymentError::definition(format!("Interceptor missing from the chain of {}", bean.bean_class()))
            })?;
            pairs.push((
                Expr::this_field(format!("interceptorProvider{slot}")),
                Expr::this_field(format!("interceptorInstance{slot}")),
            ));
        }
        Ok(pairs)
    };

    // lazily built map of method key -> around-invoke chain
    let mut entries = Vec::new();
    for (position, intercepted) in interception.intercepted_methods().iter().enumerate() {
        entries.push(Expr::string(method_key(intercepted.method(), position)));
        entries.push(Expr::invoke_static(
            runtime::LIST,
            "of",
            [invocations(InterceptionType::AroundInvoke, chain_of(intercepted.interceptors())?)],
        ));
    }
    builder.push_field(FieldShape::new("chains", runtime::LAZY_VALUE));
    constructor = constructor.stmt(Stmt::assign(
        Expr::this_field("chains"),
        Expr::new_instance(
            runtime::LAZY_VALUE,
            [Expr::lambda([], Expr::invoke_static(runtime::MAP, "of", entries))],
        ),
    ));
    builder.push_method(constructor);

    for (position, intercepted) in interception.intercepted_methods().iter().enumerate() {
        let method = intercepted.method();
        let mut shape = MethodShape::new(method.name())
            .modifiers(visibility(method.flags()))
            .returns(type_name(method.return_type()));
        let mut args = Vec::with_capacity(method.parameters().len());
        for (i, parameter) in method.parameters().iter().enumerate() {
            let name = format!("arg{i}");
            shape = shape.param(name.clone(), type_name(parameter.ty()));
            args.push(Expr::local(name));
        }
        let chain = Expr::this_field("chains")
            .invoke("get", [])
            .cast(runtime::MAP)
            .invoke("get", [Expr::string(method_key(method, position))])
            .cast(runtime::LIST);
        let proceed = Expr::invoke_static(
            runtime::INVOCATION_CONTEXTS,
            "performAroundInvoke",
            [
                Expr::This,
                Expr::string(method.signature()),
                Expr::array(runtime::OBJECT, args.clone()),
                chain,
                Expr::lambda(["ic"], Expr::invoke_super(method.name(), args)),
            ],
        );
        shape = match method.return_type() {
            Type::Void => shape.stmt(proceed),
            ty => shape.stmt(Stmt::ret(proceed.cast(type_name(ty)))),
        };
        builder.push_method(shape);
    }

    // pre-destroy chain, then the bean's own callbacks
    let mut destroy = MethodShape::new("arc_destroy");
    let pre_destroy = interception.lifecycle(InterceptionType::PreDestroy);
    if !pre_destroy.is_empty() {
        destroy = destroy.stmt(Expr::invoke_static(
            runtime::INVOCATION_CONTEXTS,
            "preDestroy",
            [Expr::This, invocations(InterceptionType::PreDestroy, chain_of(pre_destroy)?)],
        ));
    }
    for callback in bean.pre_destroy_callbacks() {
        destroy = match callback.flags().is_private() {
            true => destroy.stmt(ctx.invoke_method(callback, Expr::This, Vec::new())),
            false => destroy.stmt(Expr::invoke_super(callback.name(), [])),
        };
    }
    builder.push_method(destroy);

    let shape = builder.build();
    #[cfg(feature = "logging")]
    trace!(
        target: "bean_processor",
        bean = %bean.bean_class(),
        intercepted_methods = interception.intercepted_methods().len(),
        "Subclass generated"
    );
    ctx.emit(&shape, None)
}

#[cfg(test)]
mod tests {
    use crate::codegen::tests::{generate_listings, listing};
    use crate::deployment::tests::marker;
    use crate::index::{AnnotationInstance, ClassInfo, MethodInfo, MethodParameter, Type};
    use crate::interceptor::InterceptionType;
    use crate::interceptor::tests::hook_method;
    use crate::names;

    fn logged() -> AnnotationInstance {
        AnnotationInstance::marker("a.Logged")
    }

    fn fixture() -> Vec<ClassInfo> {
        vec![
            ClassInfo::builder("a.Logged")
                .annotation_type()
                .annotation(marker(&names::INTERCEPTOR_BINDING))
                .build(),
            ClassInfo::builder("a.LoggingInterceptor")
                .no_args_constructor()
                .annotation(marker(&names::INTERCEPTOR))
                .annotation(logged())
                .annotation(AnnotationInstance::marker(names::PRIORITY.clone()).with_value(10))
                .method(hook_method("log", InterceptionType::AroundInvoke))
                .method(hook_method("cleanup", InterceptionType::PreDestroy))
                .build(),
            ClassInfo::builder("a.Greeter")
                .no_args_constructor()
                .annotation(marker(&names::SINGLETON))
                .annotation(logged())
                .method(
                    MethodInfo::new("greet")
                        .returns(Type::class("java.lang.String"))
                        .parameter(MethodParameter::new(Type::class("java.lang.String"))),
                )
                .method(MethodInfo::new("reset"))
                .method(MethodInfo::new("close").annotation(marker(&names::PRE_DESTROY)))
                .build(),
        ]
    }

    #[test]
    fn test_subclass_forwards_through_chain() {
        let listings = generate_listings(fixture()).unwrap();
        let text = listing(&listings, "a/Greeter_Subclass");
        assert!(text.contains("class a.Greeter_Subclass extends a.Greeter implements org.jboss.protean.arc.Subclass"));
        assert!(text.contains(
            "public Greeter_Subclass(javax.enterprise.context.spi.CreationalContext ctx, \
             org.jboss.protean.arc.InjectableInterceptor interceptorProvider0) {"
        ));
        assert!(text.contains("        super();"));
        assert!(text.contains("public java.lang.String greet(java.lang.String arg0) {"));
        assert!(text.contains("(ic) -> super.greet(arg0)"));
        assert!(text.contains("\"greet_0\""));
        assert!(text.contains("(ic) -> super.reset()"));
        assert!(text.contains("org.jboss.protean.arc.InvocationContexts.preDestroy(this, new org.jboss.protean.arc.InterceptorInvocation[]{org.jboss.protean.arc.InterceptorInvocation.preDestroy(this.interceptorProvider0, this.interceptorInstance0)});"));
        assert!(text.contains("        super.close();"));

        let provider = listing(&listings, "a/Greeter_Bean");
        assert!(provider.contains("a.Greeter instance = new a.Greeter_Subclass(ctx, this.interceptorProvider0);"));
        assert!(provider.contains("((org.jboss.protean.arc.Subclass) instance).arc_destroy();"));
    }
}
