//! Observer notifier classes

use super::bean::{CTX, point_reference};
use super::output::{Resource, SpecialType};
use super::shape::{ClassShape, Expr, FieldShape, MethodShape, Stmt};
use super::{GenerationContext, observer_dependencies, observer_name, provider_fields, runtime};
use crate::error::{DeploymentError, Result};
use crate::observer::ObserverInfo;

#[cfg(feature = "logging")]
use tracing::trace;

pub(crate) fn generate(ctx: &GenerationContext<'_>, observer: &ObserverInfo) -> Result<Resource> {
    let declaring = ctx.deployment.bean(observer.declaring_bean());
    let declaring_class = declaring.bean_class().to_string();
    let dependencies = observer_dependencies(ctx, observer)?;

    let mut builder = ClassShape::builder(observer_name(ctx.deployment, observer))
        .implements(runtime::INJECTABLE_OBSERVER_METHOD)
        .source(declaring_class.as_str());
    let (fields, mut constructor) = provider_fields(&dependencies);
    for field in fields {
        builder.push_field(field);
    }
    let mut qualifiers = Vec::with_capacity(observer.observed_qualifiers().len());
    for qualifier in observer.observed_qualifiers() {
        qualifiers.push(ctx.literal(qualifier)?);
    }
    builder.push_field(FieldShape::new("qualifiers", runtime::SET));
    constructor = constructor.stmt(Stmt::assign(
        Expr::this_field("qualifiers"),
        Expr::invoke_static(runtime::SET, "of", qualifiers),
    ));
    builder.push_method(constructor);

    builder.push_method(
        MethodShape::new("getObservedType")
            .returns("java.lang.reflect.Type")
            .stmt(Stmt::ret(Expr::invoke_static(
                runtime::TYPES,
                "parse",
                [Expr::string(observer.observed_type().to_string())],
            ))),
    );
    builder.push_method(
        MethodShape::new("getObservedQualifiers")
            .returns(runtime::SET)
            .stmt(Stmt::ret(Expr::this_field("qualifiers"))),
    );
    builder.push_method(
        MethodShape::new("getPriority")
            .returns("int")
            .stmt(Stmt::ret(Expr::Int(i64::from(observer.priority())))),
    );
    builder.push_method(
        MethodShape::new("isAsync")
            .returns("boolean")
            .stmt(Stmt::ret(Expr::Bool(observer.is_async()))),
    );
    builder.push_method(
        MethodShape::new("getBeanClass")
            .returns("java.lang.Class")
            .stmt(Stmt::ret(Expr::ClassLiteral(declaring_class.clone()))),
    );

    // notify: declaring instance, then the event, metadata and injected
    // arguments in a short-lived context
    let method = observer.method();
    let mut notify = MethodShape::new("notify")
        .param("eventContext", runtime::EVENT_CONTEXT)
        .stmt(Stmt::let_(
            CTX,
            runtime::CREATIONAL_CONTEXT_IMPL,
            Expr::new_instance(runtime::CREATIONAL_CONTEXT_IMPL, []),
        ));
    let is_static = method.flags().is_static();
    let target = if is_static {
        None
    } else {
        let mut instance = Expr::this_field("declaringProvider").invoke("get", [Expr::local(CTX)]);
        if declaring.scope().is_normal() {
            instance = instance.cast(runtime::CLIENT_PROXY).invoke("arc_delegate", []);
        }
        notify = notify.stmt(Stmt::let_(
            "declaringInstance",
            declaring_class.clone(),
            instance.cast(declaring_class.clone()),
        ));
        Some(Expr::local("declaringInstance"))
    };

    let mut args = Vec::with_capacity(method.parameters().len());
    for position in 0..method.parameters().len() {
        if position == observer.event_position() {
            args.push(Expr::local("eventContext").invoke("getEvent", []));
        } else if Some(position) == observer.metadata_position() {
            args.push(Expr::local("eventContext").invoke("getMetadata", []));
        } else {
            let point = observer
                .injection()
                .injection_points()
                .iter()
                .find(|p| p.position() == Some(position))
                .ok_or_else(|| DeploymentError::definition(format!("Unresolved observer parameter {position} of {method}")))?;
            args.push(point_reference(&dependencies, point)?);
        }
    }
    let invoke = match target {
        Some(target) => ctx.invoke_method(method, target, args),
        None if method.flags().is_private() => ctx.invoke_method(method, Expr::Null, args),
        None => Expr::invoke_static(method.declaring_class().as_str(), method.name(), args),
    };
    notify = notify.stmt(invoke);
    if !is_static && declaring.scope().is_default() {
        notify = notify.stmt(
            Expr::this_field("declaringProvider")
                .cast(runtime::INJECTABLE_BEAN)
                .invoke("destroy", [Expr::local("declaringInstance"), Expr::local(CTX)]),
        );
    }
    notify = notify.stmt(Expr::local(CTX).invoke("release", []));
    builder.push_method(notify);

    let shape = builder.build();
    #[cfg(feature = "logging")]
    trace!(
        target: "bean_processor",
        observer = %method,
        observed_type = %observer.observed_type(),
        "Observer notifier generated"
    );
    ctx.emit(&shape, Some(SpecialType::Observer))
}

#[cfg(test)]
mod tests {
    use crate::codegen::tests::generate_listings;
    use crate::deployment::tests::marker;
    use crate::index::{AnnotationInstance, ClassInfo, MethodInfo, MethodParameter, Type};
    use crate::names;

    #[test]
    fn test_observer_notifier() {
        let listener = ClassInfo::builder("a.Listener")
            .no_args_constructor()
            .method(
                MethodInfo::new("onOrder")
                    .parameter(
                        MethodParameter::new(Type::class("a.Order"))
                            .annotation(marker(&names::OBSERVES))
                            .annotation(AnnotationInstance::marker(names::PRIORITY.clone()).with_value(7)),
                    )
                    .param(Type::class("a.Audit")),
            )
            .build();
        let audit = ClassInfo::builder("a.Audit")
            .no_args_constructor()
            .annotation(marker(&names::SINGLETON))
            .build();
        let listings = generate_listings(vec![listener, audit]).unwrap();
        let (name, text) = listings
            .iter()
            .find(|(name, _)| name.starts_with("a/Listener_Observer_onOrder_"))
            .unwrap();
        assert_eq!(name.len(), "a/Listener_Observer_onOrder_".len() + 40);
        assert!(text.contains("implements org.jboss.protean.arc.InjectableObserverMethod"));
        assert!(text.contains("return 7;"));
        assert!(text.contains("return false;"));
        assert!(text.contains(
            "declaringInstance.onOrder(eventContext.getEvent(), this.injectProvider0.get(org.jboss.protean.arc.CreationalContextImpl.child(ctx)));"
        ));
        // a dependent declaring instance is destroyed after notification
        assert!(text.contains("((org.jboss.protean.arc.InjectableBean) this.declaringProvider).destroy(declaringInstance, ctx);"));
        assert!(text.contains("ctx.release();"));
    }
}
