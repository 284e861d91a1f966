//! Unused bean removal

use crate::bean::{BeanId, BeanInfo};
use crate::deployment::BeanDeployment;
use crate::injection::InjectionPointInfo;
use crate::resolver::{BeanResolver, BuiltinBean, ResolvedTarget, Resolutions};
use ahash::AHashSet;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Predicate keeping a bean that would otherwise be removed
pub type UnusedExclusion = Arc<dyn Fn(&BeanInfo) -> bool + Send + Sync>;

/// Beans of the deployment nobody can reach.
///
/// A bean is kept if it is an interceptor, is named, declares an observer, is
/// the target of a kept injection point, is eligible for a kept
/// `Instance<T>` injection point, declares a kept producer or matches an
/// exclusion. Runs to a fixed point: removing a bean releases its own
/// injection points.
pub fn find_unused(deployment: &BeanDeployment, resolutions: &Resolutions, exclusions: &[UnusedExclusion]) -> Vec<BeanId> {
    let observer_beans: AHashSet<BeanId> = deployment.observers().iter().map(|o| o.declaring_bean()).collect();
    let resolver = BeanResolver::new(deployment);

    let mut kept: AHashSet<BeanId> = deployment
        .active_beans()
        .filter(|bean| {
            bean.is_interceptor()
                || bean.name().is_some()
                || observer_beans.contains(&bean.id())
                || exclusions.iter().any(|exclusion| exclusion(bean))
        })
        .map(BeanInfo::id)
        .collect();

    // Observers are entry points: their parameters keep beans alive.
    let mut roots: Vec<&InjectionPointInfo> = deployment
        .observers()
        .iter()
        .flat_map(|o| o.injection().injection_points())
        .collect();

    loop {
        let before = kept.len();
        let live: Vec<&BeanInfo> = deployment.active_beans().filter(|b| kept.contains(&b.id())).collect();
        for bean in live {
            roots.extend(bean.injection_points());
            if let Some(disposer) = bean.disposer() {
                roots.extend(deployment.disposer(disposer).injection().injection_points());
            }
            kept.extend(bean.declaring_bean());
        }
        for point in roots.drain(..) {
            match resolutions.get(point.id()) {
                Some(ResolvedTarget::Bean(target)) => {
                    kept.insert(target);
                }
                Some(ResolvedTarget::Builtin(BuiltinBean::Instance)) => {
                    let Some(element) = point.required_type().arguments().first() else {
                        continue;
                    };
                    kept.extend(
                        resolver
                            .resolve(element, point.required_qualifiers())
                            .into_iter()
                            .map(BeanInfo::id),
                    );
                }
                _ => {}
            }
        }
        if kept.len() == before {
            break;
        }
    }

    let unused: Vec<BeanId> = deployment
        .active_beans()
        .map(BeanInfo::id)
        .filter(|id| !kept.contains(id))
        .collect();

    #[cfg(feature = "logging")]
    {
        for id in &unused {
            trace!(target: "bean_processor", bean = %deployment.bean(*id), "Removing unused bean");
        }
        debug!(target: "bean_processor", removed = unused.len(), kept = kept.len(), "Unused beans found");
    }
    unused
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployment::tests::{deploy, marker};
    use crate::index::{AnnotationInstance, ClassInfo, FieldInfo, MethodInfo, MethodParameter, Type};
    use crate::names;
    use crate::resolver::resolve_injection_points;

    fn singleton(name: &str) -> ClassInfo {
        ClassInfo::builder(name)
            .no_args_constructor()
            .annotation(marker(&names::SINGLETON))
            .build()
    }

    fn unused_classes(deployment: &BeanDeployment, exclusions: &[UnusedExclusion]) -> Vec<String> {
        let resolutions = resolve_injection_points(deployment).unwrap();
        let mut unused: Vec<String> = find_unused(deployment, &resolutions, exclusions)
            .into_iter()
            .map(|id| deployment.bean(id).bean_class().to_string())
            .collect();
        unused.sort();
        unused
    }

    #[test]
    fn test_unreachable_beans_removed() {
        let deployment = deploy(vec![
            singleton("a.Orphan"),
            singleton("a.Used"),
            singleton("a.Transitive"),
            ClassInfo::builder("a.Named")
                .no_args_constructor()
                .annotation(marker(&names::SINGLETON))
                .annotation(marker(&names::NAMED))
                .field(FieldInfo::new("used", Type::class("a.Used")).annotation(marker(&names::INJECT)))
                .build(),
            ClassInfo::builder("a.Middle")
                .no_args_constructor()
                .annotation(marker(&names::SINGLETON))
                .field(FieldInfo::new("t", Type::class("a.Transitive")).annotation(marker(&names::INJECT)))
                .build(),
        ])
        .unwrap();
        assert_eq!(unused_classes(&deployment, &[]), vec!["a.Middle", "a.Orphan", "a.Transitive"]);

        let keep_orphan: UnusedExclusion = Arc::new(|bean: &BeanInfo| bean.bean_class().as_str() == "a.Orphan");
        assert_eq!(unused_classes(&deployment, &[keep_orphan]), vec!["a.Middle", "a.Transitive"]);
    }

    #[test]
    fn test_observers_and_instance_keep_beans() {
        let instance = Type::parameterized(names::INSTANCE.clone(), [Type::class("a.Plugin")]);
        let deployment = deploy(vec![
            singleton("a.Plugin"),
            ClassInfo::builder("a.Listener")
                .no_args_constructor()
                .annotation(marker(&names::SINGLETON))
                .method(
                    MethodInfo::new("onEvent")
                        .parameter(MethodParameter::new(Type::class("a.Event")).annotation(marker(&names::OBSERVES)))
                        .parameter(MethodParameter::new(instance)),
                )
                .build(),
            ClassInfo::builder("a.Factory")
                .no_args_constructor()
                .method(
                    MethodInfo::new("produce")
                        .returns(Type::class("a.Product"))
                        .annotation(AnnotationInstance::marker(names::PRODUCES.clone())),
                )
                .build(),
        ])
        .unwrap();
        assert_eq!(unused_classes(&deployment, &[]), vec!["a.Factory", "a.Factory"]);
    }

    #[test]
    fn test_kept_producer_keeps_declaring_bean() {
        let deployment = deploy(vec![
            singleton("a.Config"),
            ClassInfo::builder("a.Factory")
                .no_args_constructor()
                .field(FieldInfo::new("config", Type::class("a.Config")).annotation(marker(&names::INJECT)))
                .method(
                    MethodInfo::new("produce")
                        .returns(Type::class("a.Product"))
                        .annotation(marker(&names::PRODUCES))
                        .annotation(marker(&names::NAMED)),
                )
                .build(),
        ])
        .unwrap();
        assert!(unused_classes(&deployment, &[]).is_empty());
    }
}
