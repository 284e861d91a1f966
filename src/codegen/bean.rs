//! Bean provider classes
//!
//! One `InjectableBean` implementation per bean. The provider knows how to
//! create and destroy instances and hands out references according to the
//! bean scope.

use super::literals::value_expr;
use super::output::{Resource, SpecialType};
use super::shape::{ClassShape, ClassShapeBuilder, Expr, FieldShape, MethodShape, Stmt};
use super::subclass::invocations;
use super::{
    Dependencies, GenerationContext, bean_dependencies, bean_provider_name, client_proxy_name, provider_fields,
    reference, runtime, subclass_name, type_name,
};
use crate::bean::{BeanId, BeanInfo, BeanKind, SyntheticInfo};
use crate::error::{DeploymentError, Result};
use crate::index::{FieldInfo, MethodInfo, Type};
use crate::injection::{InjectionKind, InjectionMember, InjectionPointInfo};
use crate::interceptor::InterceptionType;

#[cfg(feature = "logging")]
use tracing::trace;

/// Name of the creational context parameter
pub(super) const CTX: &str = "ctx";

pub(crate) fn generate(ctx: &GenerationContext<'_>, bean: &BeanInfo) -> Result<Resource> {
    let dependencies = bean_dependencies(ctx, bean)?;
    let mut builder = provider_skeleton(ctx, bean, &dependencies, runtime::INJECTABLE_BEAN)?;
    builder.push_method(create_method(ctx, bean, &dependencies)?);
    builder.push_method(destroy_method(ctx, bean, &dependencies)?);
    builder.push_method(get_method(bean));
    if let Some(priority) = bean.alternative_priority() {
        builder.push_method(
            MethodShape::new("getAlternativePriority")
                .returns("java.lang.Integer")
                .stmt(Stmt::ret(Expr::Int(i64::from(priority)))),
        );
    }
    if let Some(name) = bean.name() {
        builder.push_method(
            MethodShape::new("getName")
                .returns(runtime::STRING)
                .stmt(Stmt::ret(Expr::string(name))),
        );
    }
    if bean.declaring_bean().is_some() {
        builder.push_method(
            MethodShape::new("getDeclaringBean")
                .returns(runtime::INJECTABLE_BEAN)
                .stmt(Stmt::ret(Expr::this_field("declaringProvider").cast(runtime::INJECTABLE_BEAN))),
        );
    }
    let shape = builder.build();

    #[cfg(feature = "logging")]
    trace!(
        target: "bean_processor",
        bean = %bean.bean_class(),
        kind = bean.kind().label(),
        provider = shape.name(),
        "Bean provider generated"
    );
    ctx.emit(&shape, Some(SpecialType::Bean))
}

// =============================================================================
// Shared parts
// =============================================================================

/// Provider fields, the constructor and the metadata methods common to bean
/// and interceptor providers
pub(super) fn provider_skeleton(
    ctx: &GenerationContext<'_>,
    bean: &BeanInfo,
    dependencies: &Dependencies,
    interface: &str,
) -> Result<ClassShapeBuilder> {
    let mut builder = ClassShape::builder(bean_provider_name(bean))
        .implements(interface)
        .source(bean.bean_class().as_str());
    let (fields, mut constructor) = provider_fields(dependencies);
    for field in fields {
        builder.push_field(field);
    }

    builder.push_field(FieldShape::new("types", runtime::SET));
    constructor = constructor.stmt(Stmt::assign(
        Expr::this_field("types"),
        Expr::invoke_static(runtime::SET, "of", bean.types().iter().map(type_literal)),
    ));
    let mut qualifiers = Vec::with_capacity(bean.qualifiers().len());
    for qualifier in bean.qualifiers() {
        qualifiers.push(ctx.literal(qualifier)?);
    }
    builder.push_field(FieldShape::new("qualifiers", runtime::SET));
    constructor = constructor.stmt(Stmt::assign(
        Expr::this_field("qualifiers"),
        Expr::invoke_static(runtime::SET, "of", qualifiers),
    ));

    if let Some(synthetic) = bean.synthetic_info() {
        builder.push_field(FieldShape::new("params", runtime::MAP));
        constructor = constructor.stmt(Stmt::assign(Expr::this_field("params"), synthetic_params(bean, synthetic)?));
    }
    if bean.scope().is_normal() {
        builder.push_field(FieldShape::new("proxy", runtime::LAZY_VALUE));
        constructor = constructor.stmt(Stmt::assign(
            Expr::this_field("proxy"),
            Expr::new_instance(
                runtime::LAZY_VALUE,
                [Expr::lambda([], Expr::new_instance(client_proxy_name(bean), [Expr::This]))],
            ),
        ));
    }
    builder.push_method(constructor);

    builder.push_method(
        MethodShape::new("getTypes")
            .returns(runtime::SET)
            .stmt(Stmt::ret(Expr::this_field("types"))),
    );
    builder.push_method(
        MethodShape::new("getScope")
            .returns("java.lang.Class")
            .stmt(Stmt::ret(Expr::ClassLiteral(bean.scope().dot_name().to_string()))),
    );
    builder.push_method(
        MethodShape::new("getQualifiers")
            .returns(runtime::SET)
            .stmt(Stmt::ret(Expr::this_field("qualifiers"))),
    );
    builder.push_method(
        MethodShape::new("getBeanClass")
            .returns("java.lang.Class")
            .stmt(Stmt::ret(Expr::ClassLiteral(bean.bean_class().to_string()))),
    );
    builder.push_method(
        MethodShape::new("getIdentifier")
            .returns(runtime::STRING)
            .stmt(Stmt::ret(Expr::string(bean.identifier()))),
    );
    Ok(builder)
}

/// Runtime representation of a bean type
fn type_literal(ty: &Type) -> Expr {
    match ty {
        Type::Class(name) => Expr::ClassLiteral(name.to_string()),
        other => Expr::invoke_static(runtime::TYPES, "parse", [Expr::string(other.to_string())]),
    }
}

fn synthetic_params(bean: &BeanInfo, synthetic: &SyntheticInfo) -> Result<Expr> {
    let mut pairs = Vec::with_capacity(synthetic.params().len() * 2);
    for (key, value) in synthetic.params() {
        pairs.push(Expr::string(key.clone()));
        pairs.push(value_expr(bean.bean_class(), key, &Type::object(), value)?);
    }
    Ok(Expr::invoke_static(runtime::MAP, "of", pairs))
}

/// References for `points`, in order
pub(super) fn point_references<'p>(
    dependencies: &Dependencies,
    points: impl IntoIterator<Item = &'p InjectionPointInfo>,
) -> Result<Vec<Expr>> {
    points
        .into_iter()
        .map(|point| point_reference(dependencies, point))
        .collect()
}

pub(super) fn point_reference(dependencies: &Dependencies, point: &InjectionPointInfo) -> Result<Expr> {
    let field = dependencies
        .field_for(point.id())
        .ok_or_else(|| DeploymentError::definition(format!("No provider for injection point {}", point.target())))?;
    Ok(reference(field, Expr::local(CTX)))
}

/// Provider fields of the interceptors of `bean`, in interception order
pub(super) fn interceptor_fields<'d>(
    ctx: &GenerationContext<'_>,
    bean: &BeanInfo,
    dependencies: &'d Dependencies,
    interceptors: &[BeanId],
) -> Result<Vec<&'d str>> {
    interceptors
        .iter()
        .map(|interceptor| {
            dependencies.field_for_bean(*interceptor).ok_or_else(|| {
                DeploymentError::definition(format!(
                    "No provider for interceptor {} of {}",
                    ctx.deployment.bean(*interceptor).bean_class(),
                    bean.bean_class()
                ))
            })
        })
        .collect()
}

/// Invocations of a lifecycle phase, with interceptor instances created in
/// the current context
fn bean_invocations(phase: InterceptionType, fields: &[&str]) -> Expr {
    invocations(
        phase,
        fields
            .iter()
            .map(|field| (Expr::this_field(*field), reference(field, Expr::local(CTX)))),
    )
}

/// Call `method` on `target`, or statically when there is no target
fn call(ctx: &GenerationContext<'_>, method: &MethodInfo, target: Option<Expr>, args: Vec<Expr>) -> Expr {
    match target {
        Some(target) => ctx.invoke_method(method, target, args),
        None if method.flags().is_private() => ctx.invoke_method(method, Expr::Null, args),
        None => Expr::invoke_static(method.declaring_class().as_str(), method.name(), args),
    }
}

fn read(ctx: &GenerationContext<'_>, field: &FieldInfo, target: Option<Expr>) -> Expr {
    match target {
        Some(target) => ctx.read_field(field, target),
        None if field.flags().is_private() => ctx.read_field(field, Expr::Null),
        None => Expr::static_field(field.declaring_class().as_str(), field.name()),
    }
}

fn release() -> Stmt {
    Stmt::Expr(Expr::local(CTX).invoke("release", []))
}

// =============================================================================
// create
// =============================================================================

pub(super) fn create_method(ctx: &GenerationContext<'_>, bean: &BeanInfo, dependencies: &Dependencies) -> Result<MethodShape> {
    let body = match bean.kind() {
        BeanKind::Class | BeanKind::Interceptor(_) => class_create(ctx, bean, dependencies)?,
        BeanKind::ProducerMethod { declaring, method, .. } => {
            let mut stmts = Vec::new();
            let target = match method.flags().is_static() {
                true => None,
                false => Some(declaring_instance(ctx, *declaring, &mut stmts)?),
            };
            let args = point_references(dependencies, bean.injection_points())?;
            let produce = call(ctx, method, target, args);
            produced(ctx, bean, *declaring, produce, method.flags().is_static(), stmts)
        }
        BeanKind::ProducerField { declaring, field, .. } => {
            let mut stmts = Vec::new();
            let target = match field.flags().is_static() {
                true => None,
                false => Some(declaring_instance(ctx, *declaring, &mut stmts)?),
            };
            let produce = read(ctx, field, target);
            produced(ctx, bean, *declaring, produce, field.flags().is_static(), stmts)
        }
        BeanKind::Synthetic(synthetic) => vec![Stmt::ret(
            Expr::new_instance(synthetic.creator().as_str(), [])
                .invoke("create", [Expr::local(CTX), Expr::this_field("params")]),
        )],
    };
    Ok(MethodShape::new("create")
        .param(CTX, runtime::CREATIONAL_CONTEXT)
        .returns(type_name(bean.provider_type()).to_string())
        .body(body))
}

/// Constructor injection, field and initializer injection, post-construct
/// interception and callbacks
pub(super) fn class_create(ctx: &GenerationContext<'_>, bean: &BeanInfo, dependencies: &Dependencies) -> Result<Vec<Stmt>> {
    let class = ctx.class_of(bean.bean_class())?;
    let class_name = class.name().to_string();
    let constructor = bean.constructor_injection();
    let args = match constructor {
        Some(injection) => point_references(dependencies, injection.injection_points())?,
        None => Vec::new(),
    };

    let interception = ctx.interception.get(bean.id());
    let mut construct = if ctx.interception.requires_subclass(bean.id()) {
        let mut subclass_args = args;
        subclass_args.push(Expr::local(CTX));
        let interceptors = ctx.interception.interceptors_of(bean.id());
        for field in interceptor_fields(ctx, bean, dependencies, &interceptors)? {
            subclass_args.push(Expr::this_field(field));
        }
        Expr::new_instance(subclass_name(bean), subclass_args)
    } else {
        ctx.new_instance(class, constructor.and_then(|c| c.method()), args)?
    };

    let around_construct = interception
        .map(|i| i.lifecycle(InterceptionType::AroundConstruct))
        .unwrap_or_default();
    if !around_construct.is_empty() {
        let fields = interceptor_fields(ctx, bean, dependencies, around_construct)?;
        construct = Expr::invoke_static(
            runtime::INVOCATION_CONTEXTS,
            "performAroundConstruct",
            [
                Expr::local(CTX),
                bean_invocations(InterceptionType::AroundConstruct, &fields),
                Expr::lambda([], construct),
            ],
        )
        .cast(class_name.clone());
    }

    let instance = || Expr::local("instance");
    let mut stmts = vec![Stmt::let_("instance", class_name, construct)];
    for injection in bean.injections() {
        match (injection.kind(), injection.member()) {
            (InjectionKind::Field, InjectionMember::Field(field)) => {
                let point = injection.injection_points().first().ok_or_else(|| {
                    DeploymentError::definition(format!("Field injection without injection point: {field}"))
                })?;
                stmts.push(ctx.write_field(field, instance(), point_reference(dependencies, point)?));
            }
            (InjectionKind::Initializer, InjectionMember::Method(method)) => {
                let args = point_references(dependencies, injection.injection_points())?;
                stmts.push(Stmt::Expr(ctx.invoke_method(method, instance(), args)));
            }
            _ => {}
        }
    }

    let post_construct = interception
        .map(|i| i.lifecycle(InterceptionType::PostConstruct))
        .unwrap_or_default();
    if !post_construct.is_empty() {
        let fields = interceptor_fields(ctx, bean, dependencies, post_construct)?;
        stmts.push(Stmt::Expr(Expr::invoke_static(
            runtime::INVOCATION_CONTEXTS,
            "postConstruct",
            [
                instance(),
                bean_invocations(InterceptionType::PostConstruct, &fields),
            ],
        )));
    }
    for callback in bean.post_construct_callbacks() {
        stmts.push(Stmt::Expr(ctx.invoke_method(callback, instance(), Vec::new())));
    }
    stmts.push(Stmt::ret(instance()));
    Ok(stmts)
}

/// Obtain the declaring bean instance into `declaringInstance`, through a
/// child context held in `declaringContext`
fn declaring_instance(ctx: &GenerationContext<'_>, declaring: BeanId, stmts: &mut Vec<Stmt>) -> Result<Expr> {
    let declaring = ctx.deployment.bean(declaring);
    stmts.push(Stmt::let_(
        "declaringContext",
        runtime::CREATIONAL_CONTEXT_IMPL,
        Expr::invoke_static(runtime::CREATIONAL_CONTEXT_IMPL, "child", [Expr::local(CTX)]),
    ));
    let mut instance = Expr::this_field("declaringProvider").invoke("get", [Expr::local("declaringContext")]);
    if declaring.scope().is_normal() {
        instance = instance.cast(runtime::CLIENT_PROXY).invoke("arc_delegate", []);
    }
    let class_name = declaring.bean_class().to_string();
    stmts.push(Stmt::let_("declaringInstance", class_name.clone(), instance.cast(class_name)));
    Ok(Expr::local("declaringInstance"))
}

/// Destroy a dependent declaring instance right after use
fn destroy_declaring(ctx: &GenerationContext<'_>, declaring: BeanId, stmts: &mut Vec<Stmt>) {
    if ctx.deployment.bean(declaring).scope().is_default() {
        stmts.push(Stmt::Expr(
            Expr::this_field("declaringProvider")
                .cast(runtime::INJECTABLE_BEAN)
                .invoke("destroy", [Expr::local("declaringInstance"), Expr::local("declaringContext")]),
        ));
    }
}

fn produced(
    ctx: &GenerationContext<'_>,
    bean: &BeanInfo,
    declaring: BeanId,
    produce: Expr,
    is_static: bool,
    mut stmts: Vec<Stmt>,
) -> Vec<Stmt> {
    let result_type = type_name(bean.provider_type()).to_string();
    stmts.push(Stmt::let_("result", result_type, produce));
    if bean.scope().is_normal() {
        stmts.push(Stmt::if_then(
            Expr::local("result").is_null(),
            vec![Stmt::Throw(Expr::new_instance(
                runtime::ILLEGAL_STATE_EXCEPTION,
                [Expr::string(format!(
                    "Normal scoped producer must not return null: {}",
                    bean.bean_class()
                ))],
            ))],
        ));
    }
    if !is_static {
        destroy_declaring(ctx, declaring, &mut stmts);
    }
    stmts.push(Stmt::ret(Expr::local("result")));
    stmts
}

// =============================================================================
// destroy and get
// =============================================================================

pub(super) fn destroy_method(ctx: &GenerationContext<'_>, bean: &BeanInfo, dependencies: &Dependencies) -> Result<MethodShape> {
    let mut stmts = Vec::new();
    match bean.kind() {
        BeanKind::Class | BeanKind::Interceptor(_) => {
            if ctx.interception.requires_subclass(bean.id()) {
                stmts.push(Stmt::Expr(
                    Expr::local("instance").cast(runtime::SUBCLASS).invoke("arc_destroy", []),
                ));
            } else {
                let class_name = bean.bean_class().to_string();
                for callback in bean.pre_destroy_callbacks() {
                    let target = Expr::local("instance").cast(class_name.clone());
                    stmts.push(Stmt::Expr(ctx.invoke_method(callback, target, Vec::new())));
                }
            }
        }
        BeanKind::ProducerMethod { declaring, disposer, .. } | BeanKind::ProducerField { declaring, disposer, .. } => {
            if let Some(disposer) = disposer {
                let disposer = ctx.deployment.disposer(*disposer);
                let method = disposer.method();
                let is_static = method.flags().is_static();
                let target = match is_static {
                    true => None,
                    false => Some(declaring_instance(ctx, *declaring, &mut stmts)?),
                };
                let mut args = Vec::with_capacity(method.parameters().len());
                for position in 0..method.parameters().len() {
                    if position == disposer.disposed_position() {
                        args.push(Expr::local("instance").cast(type_name(disposer.disposed_type()).to_string()));
                        continue;
                    }
                    let point = disposer
                        .injection()
                        .injection_points()
                        .iter()
                        .find(|p| p.position() == Some(position))
                        .ok_or_else(|| {
                            DeploymentError::definition(format!("Unresolved disposer parameter {position} of {method}"))
                        })?;
                    args.push(point_reference(dependencies, point)?);
                }
                stmts.push(Stmt::Expr(call(ctx, method, target, args)));
                if !is_static {
                    destroy_declaring(ctx, *declaring, &mut stmts);
                }
            }
        }
        BeanKind::Synthetic(synthetic) => {
            if let Some(destroyer) = synthetic.destroyer() {
                stmts.push(Stmt::Expr(Expr::new_instance(destroyer.as_str(), []).invoke(
                    "destroy",
                    [Expr::local("instance"), Expr::local(CTX), Expr::this_field("params")],
                )));
            }
        }
    }
    stmts.push(release());
    Ok(MethodShape::new("destroy")
        .param("instance", runtime::OBJECT)
        .param(CTX, runtime::CREATIONAL_CONTEXT)
        .body(stmts))
}

/// Dependent beans are created per call and registered with the parent
/// context; singletons come from the container context; normal scopes
/// return the client proxy
pub(super) fn get_method(bean: &BeanInfo) -> MethodShape {
    let method = MethodShape::new("get")
        .param(CTX, runtime::CREATIONAL_CONTEXT)
        .returns(type_name(bean.provider_type()).to_string());
    let provider_type = type_name(bean.provider_type()).to_string();
    if bean.scope().is_normal() {
        return method.stmt(Stmt::ret(
            Expr::this_field("proxy").invoke("get", []).cast(provider_type),
        ));
    }
    if bean.scope().is_default() {
        return method
            .stmt(Stmt::let_(
                "instance",
                provider_type,
                Expr::This.invoke("create", [Expr::local(CTX)]),
            ))
            .stmt(Expr::invoke_static(
                runtime::CREATIONAL_CONTEXT_IMPL,
                "addDependencyToParent",
                [Expr::This, Expr::local("instance"), Expr::local(CTX)],
            ))
            .stmt(Stmt::ret(Expr::local("instance")));
    }
    method.stmt(Stmt::ret(
        Expr::invoke_static(runtime::ARC, "container", [])
            .invoke("getActiveContext", [Expr::ClassLiteral(bean.scope().dot_name().to_string())])
            .invoke("get", [Expr::This, Expr::local(CTX)])
            .cast(provider_type),
    ))
}

#[cfg(test)]
mod tests {
    use crate::codegen::tests::{generate_listings, listing};
    use crate::deployment::tests::marker;
    use crate::index::{ClassInfo, FieldInfo, MethodInfo, MethodParameter, Modifiers, Type};
    use crate::names;

    fn service() -> ClassInfo {
        ClassInfo::builder("a.Service")
            .no_args_constructor()
            .annotation(marker(&names::SINGLETON))
            .field(FieldInfo::new("repository", Type::class("a.Repository")).annotation(marker(&names::INJECT)))
            .field(
                FieldInfo::new("secret", Type::class("a.Repository"))
                    .modifiers(Modifiers::PRIVATE)
                    .annotation(marker(&names::INJECT)),
            )
            .method(MethodInfo::new("init").annotation(marker(&names::POST_CONSTRUCT)))
            .build()
    }

    fn repository() -> ClassInfo {
        ClassInfo::builder("a.Repository")
            .no_args_constructor()
            .annotation(marker(&names::DEPENDENT))
            .build()
    }

    #[test]
    fn test_class_bean_provider() {
        let listings = generate_listings(vec![service(), repository()]).unwrap();
        let text = listing(&listings, "a/Service_Bean");
        assert!(text.contains("public final class a.Service_Bean implements org.jboss.protean.arc.InjectableBean"));
        assert!(text.contains("private final org.jboss.protean.arc.InjectableReferenceProvider injectProvider0;"));
        assert!(text.contains("a.Service instance = new a.Service();"));
        assert!(text.contains(
            "instance.repository = this.injectProvider0.get(org.jboss.protean.arc.CreationalContextImpl.child(ctx));"
        ));
        assert!(text.contains("org.jboss.protean.arc.Reflections.writeField(a.Service.class, \"secret\", instance,"));
        assert!(text.contains("instance.init();"));
        assert!(text.contains(".getActiveContext(javax.inject.Singleton.class).get(this, ctx)"));

        let dependent = listing(&listings, "a/Repository_Bean");
        assert!(dependent.contains("a.Repository instance = this.create(ctx);"));
        assert!(dependent.contains("addDependencyToParent(this, instance, ctx);"));
    }

    #[test]
    fn test_producer_destroys_dependent_declaring_instance() {
        let factory = ClassInfo::builder("a.Factory")
            .no_args_constructor()
            .method(
                MethodInfo::new("connection")
                    .returns(Type::class("a.Connection"))
                    .parameter(MethodParameter::new(Type::class("a.Repository")))
                    .annotation(marker(&names::PRODUCES)),
            )
            .method(
                MethodInfo::new("close")
                    .parameter(MethodParameter::new(Type::class("a.Connection")).annotation(marker(&names::DISPOSES))),
            )
            .annotation(marker(&names::DEPENDENT))
            .build();
        let listings = generate_listings(vec![factory, repository()]).unwrap();
        let (name, text) = listings
            .iter()
            .find(|(name, _)| name.starts_with("a/Factory_ProducerMethod_connection_"))
            .unwrap();
        assert!(name.ends_with("_Bean"));
        assert!(text.contains("a.Factory declaringInstance = ((a.Factory) this.declaringProvider.get(declaringContext));"));
        assert!(text.contains("a.Connection result = declaringInstance.connection(this.injectProvider0.get("));
        assert!(text.contains(
            "((org.jboss.protean.arc.InjectableBean) this.declaringProvider).destroy(declaringInstance, declaringContext);"
        ));
        assert!(text.contains("declaringInstance.close(((a.Connection) instance));"));
        assert!(text.contains("public org.jboss.protean.arc.InjectableBean getDeclaringBean()"));
    }

    #[test]
    fn test_normal_scoped_bean_returns_proxy() {
        let cart = ClassInfo::builder("a.Cart")
            .no_args_constructor()
            .annotation(marker(&names::APPLICATION_SCOPED))
            .build();
        let listings = generate_listings(vec![cart]).unwrap();
        let text = listing(&listings, "a/Cart_Bean");
        assert!(text.contains("this.proxy = new org.jboss.protean.arc.LazyValue(() -> new a.Cart_ClientProxy(this));"));
        assert!(text.contains("return ((a.Cart) this.proxy.get());"));
    }
}
