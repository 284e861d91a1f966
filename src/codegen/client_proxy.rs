//! Client proxies of normal-scoped beans
//!
//! The proxy extends (or implements) the bean's provider type and looks up
//! the contextual instance on every business method call.

use super::output::Resource;
use super::shape::{ClassShape, Expr, FieldShape, MethodShape, Stmt};
use super::{GenerationContext, client_proxy_name, runtime, type_name};
use crate::bean::BeanInfo;
use crate::error::{DeploymentError, Result};
use crate::index::{ClassInfo, IndexView, MethodInfo, Modifiers, Type};
use crate::interception::{business_methods, superclass_chain};
use ahash::AHashSet;

#[cfg(feature = "logging")]
use tracing::trace;

/// Interfaces reachable from `class`, breadth first, `class` included
fn interface_closure<'i>(index: &'i dyn IndexView, class: &'i ClassInfo) -> Vec<&'i ClassInfo> {
    let mut seen = AHashSet::new();
    let mut closure = vec![class];
    seen.insert(class.name().clone());
    let mut next = 0;
    while next < closure.len() {
        let current = closure[next];
        next += 1;
        for name in current.interface_names() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(interface) = index.class_by_name(name) {
                closure.push(interface);
            }
        }
    }
    closure
}

fn delegated_methods<'i>(index: &'i dyn IndexView, class: &'i ClassInfo) -> Vec<&'i MethodInfo> {
    if class.is_interface() {
        let mut seen = AHashSet::new();
        interface_closure(index, class)
            .into_iter()
            .flat_map(|c| c.methods())
            .filter(|m| !m.flags().is_static() && !m.is_constructor() && seen.insert(m.signature()))
            .collect()
    } else {
        business_methods(&superclass_chain(index, class))
            .into_iter()
            .filter(|m| !m.flags().is_final())
            .collect()
    }
}

pub(crate) fn generate(ctx: &GenerationContext<'_>, bean: &BeanInfo) -> Result<Resource> {
    let provider_type = bean.provider_type().erasure();
    let class = ctx.class_of(&provider_type)?;
    if !class.is_interface() {
        if class.is_final() {
            return Err(DeploymentError::unproxyable(class.name(), "the class is final"));
        }
        let accessible = class
            .constructors()
            .any(|c| c.parameters().is_empty() && !c.flags().is_private());
        if !accessible {
            return Err(DeploymentError::unproxyable(class.name(), "no non-private no-args constructor"));
        }
    }

    let mut builder = ClassShape::builder(client_proxy_name(bean)).source(bean.bean_class().as_str());
    builder = match class.is_interface() {
        true => builder.implements(class.name().as_str()),
        false => builder.extends(class.name().as_str()),
    };
    builder = builder
        .implements(runtime::CLIENT_PROXY)
        .field(FieldShape::new("bean", runtime::INJECTABLE_BEAN))
        .method(
            MethodShape::constructor()
                .param("bean", runtime::INJECTABLE_BEAN)
                .stmt(Expr::invoke_super(super::shape::CONSTRUCTOR, []))
                .stmt(Stmt::assign(Expr::this_field("bean"), Expr::local("bean"))),
        )
        .method(
            MethodShape::new("arc_delegate").returns(runtime::OBJECT).stmt(Stmt::ret(
                Expr::invoke_static(runtime::ARC, "container", [])
                    .invoke("getActiveContext", [Expr::this_field("bean").invoke("getScope", [])])
                    .invoke(
                        "get",
                        [
                            Expr::this_field("bean"),
                            Expr::new_instance(runtime::CREATIONAL_CONTEXT_IMPL, []),
                        ],
                    ),
            )),
        );

    let class_name = class.name().to_string();
    let methods = delegated_methods(ctx.deployment.index(), class);
    for method in &methods {
        let mut shape = MethodShape::new(method.name())
            .modifiers(match method.flags().contains(Modifiers::PROTECTED) {
                true => Modifiers::PROTECTED,
                false if method.flags().is_package_private() => Modifiers::empty(),
                false => Modifiers::PUBLIC,
            })
            .returns(type_name(method.return_type()));
        let mut args = Vec::with_capacity(method.parameters().len());
        for (i, parameter) in method.parameters().iter().enumerate() {
            let name = format!("arg{i}");
            shape = shape.param(name.clone(), type_name(parameter.ty()));
            args.push(Expr::local(name));
        }
        let delegate = Expr::This
            .invoke("arc_delegate", [])
            .cast(class_name.clone())
            .invoke(method.name(), args);
        shape = match method.return_type() {
            Type::Void => shape.stmt(delegate),
            _ => shape.stmt(Stmt::ret(delegate)),
        };
        builder.push_method(shape);
    }

    let shape = builder.build();
    #[cfg(feature = "logging")]
    trace!(
        target: "bean_processor",
        bean = %bean.bean_class(),
        delegated_methods = methods.len(),
        "Client proxy generated"
    );
    ctx.emit(&shape, None)
}
