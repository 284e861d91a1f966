//! The components provider
//!
//! Instantiates every bean provider in dependency order, then every observer
//! notifier, and registers itself as a service provider. Dependencies that
//! form a cycle through a normal-scoped bean are passed as lazy references
//! resolved from the registry once all providers exist.

use super::output::Resource;
use super::shape::{ClassShape, Expr, MethodShape, Stmt};
use super::{
    GenerationContext, bean_dependencies, bean_provider_name, components_provider_name, observer_dependencies,
    observer_name, runtime,
};
use crate::bean::BeanId;
use crate::error::{DeploymentError, Result};
use ahash::AHashSet;

#[cfg(feature = "logging")]
use tracing::debug;

fn bean_local(bean: BeanId) -> String {
    format!("bean{}", bean.index())
}

pub(crate) fn generate(ctx: &GenerationContext<'_>, deployment_name: &str) -> Result<Vec<Resource>> {
    let deployment = ctx.deployment;
    let linearization = ctx.linearization;
    let name = components_provider_name(deployment_name);

    let mut body = vec![
        Stmt::let_("registry", runtime::MAP, Expr::new_instance(runtime::HASH_MAP, [])),
        Stmt::let_("beans", runtime::LIST, Expr::new_instance(runtime::ARRAY_LIST, [])),
        Stmt::let_("observers", runtime::LIST, Expr::new_instance(runtime::ARRAY_LIST, [])),
    ];

    let mut created = AHashSet::new();
    let mut lazy = 0usize;
    for &id in linearization.order() {
        let bean = deployment.bean(id);
        let dependencies = bean_dependencies(ctx, bean)?;
        let mut args = Vec::new();
        for (_, target) in dependencies.constructor_targets() {
            if linearization.is_lazy(id, target) {
                lazy += 1;
                args.push(Expr::new_instance(
                    runtime::LAZY_REFERENCE_PROVIDER,
                    [
                        Expr::local("registry"),
                        Expr::string(deployment.bean(target).identifier()),
                    ],
                ));
            } else if created.contains(&target) {
                args.push(Expr::local(bean_local(target)));
            } else {
                return Err(DeploymentError::definition(format!(
                    "Bean {} is created before its dependency {}",
                    bean.bean_class(),
                    deployment.bean(target).bean_class()
                )));
            }
        }
        let provider = bean_provider_name(bean);
        let local = bean_local(id);
        body.push(Stmt::let_(local.clone(), provider.clone(), Expr::new_instance(provider, args)));
        body.push(Stmt::Expr(Expr::local("registry").invoke(
            "put",
            [Expr::string(bean.identifier()), Expr::local(local.clone())],
        )));
        body.push(Stmt::Expr(Expr::local("beans").invoke("add", [Expr::local(local)])));
        created.insert(id);
    }

    let mut observers = 0usize;
    for observer in deployment.observers() {
        if deployment.is_removed(observer.declaring_bean()) {
            continue;
        }
        let dependencies = observer_dependencies(ctx, observer)?;
        let args = dependencies
            .constructor_targets()
            .map(|(_, target)| Expr::local(bean_local(target)))
            .collect::<Vec<_>>();
        body.push(Stmt::Expr(Expr::local("observers").invoke(
            "add",
            [Expr::new_instance(observer_name(deployment, observer), args)],
        )));
        observers += 1;
    }
    body.push(Stmt::ret(Expr::new_instance(
        runtime::COMPONENTS,
        [Expr::local("beans"), Expr::local("observers")],
    )));

    let shape = ClassShape::builder(name.clone())
        .implements(runtime::COMPONENTS_PROVIDER)
        .method(MethodShape::new("getComponents").returns(runtime::COMPONENTS).body(body))
        .build();

    #[cfg(feature = "logging")]
    debug!(
        target: "bean_processor",
        provider = %name,
        beans = created.len(),
        observers,
        lazy_references = lazy,
        "Components provider generated"
    );
    #[cfg(not(feature = "logging"))]
    let _ = (observers, lazy);

    Ok(vec![
        ctx.emit(&shape, None)?,
        Resource::service_provider(runtime::COMPONENTS_PROVIDER, &[name]),
    ])
}

#[cfg(test)]
mod tests {
    use crate::codegen::tests::{generate_listings, listing};
    use crate::deployment::tests::marker;
    use crate::index::{ClassInfo, FieldInfo, Type};
    use crate::names;

    fn bean(name: &str, scope: &crate::index::DotName, injects: &[&str]) -> ClassInfo {
        let mut builder = ClassInfo::builder(name).no_args_constructor().annotation(marker(scope));
        for (i, dependency) in injects.iter().enumerate() {
            builder = builder.field(FieldInfo::new(format!("f{i}"), Type::class(*dependency)).annotation(marker(&names::INJECT)));
        }
        builder.build()
    }

    #[test]
    fn test_providers_created_in_dependency_order() {
        let listings = generate_listings(vec![
            bean("a.Top", &names::SINGLETON, &["a.Bottom"]),
            bean("a.Bottom", &names::SINGLETON, &[]),
        ])
        .unwrap();
        let text = listing(&listings, "org/jboss/protean/arc/setup/test_ComponentsProvider");
        let bottom = text.find("a.Bottom_Bean bean1 = new a.Bottom_Bean();").unwrap();
        let top = text.find("a.Top_Bean bean0 = new a.Top_Bean(bean1);").unwrap();
        assert!(bottom < top);
        assert!(text.contains("return new org.jboss.protean.arc.Components(beans, observers);"));

        let services = listing(&listings, "META-INF/services/org.jboss.protean.arc.ComponentsProvider");
        assert_eq!(services.trim(), "org.jboss.protean.arc.setup.test_ComponentsProvider");
    }

    #[test]
    fn test_cycle_through_normal_scope_uses_lazy_reference() {
        let listings = generate_listings(vec![
            bean("a.A", &names::APPLICATION_SCOPED, &["a.B"]),
            bean("a.B", &names::SINGLETON, &["a.A"]),
        ])
        .unwrap();
        let text = listing(&listings, "org/jboss/protean/arc/setup/test_ComponentsProvider");
        assert!(text.contains("a.B_Bean bean1 = new a.B_Bean(new org.jboss.protean.arc.LazyReferenceProvider(registry, "));
        assert!(text.contains("a.A_Bean bean0 = new a.A_Bean(bean1);"));
    }
}
