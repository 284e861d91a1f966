//! Well-known annotation and type names
//!
//! Every name is created once on first use and shared afterwards.

use crate::index::{DotName, OBJECT as OBJECT_NAME};
use once_cell::sync::Lazy;

macro_rules! dot_names {
    ($($(#[$meta:meta])* $ident:ident = $value:literal;)*) => {
        $(
            $(#[$meta])*
            pub static $ident: Lazy<DotName> = Lazy::new(|| DotName::new($value));
        )*
    };
}

dot_names! {
    // injection
    INJECT = "javax.inject.Inject";
    PRODUCES = "javax.enterprise.inject.Produces";
    DISPOSES = "javax.enterprise.inject.Disposes";
    OBSERVES = "javax.enterprise.event.Observes";
    OBSERVES_ASYNC = "javax.enterprise.event.ObservesAsync";

    // meta annotations
    QUALIFIER = "javax.inject.Qualifier";
    NONBINDING = "javax.enterprise.util.Nonbinding";
    INTERCEPTOR_BINDING = "javax.interceptor.InterceptorBinding";
    STEREOTYPE = "javax.enterprise.inject.Stereotype";

    // bean attributes
    INTERCEPTOR = "javax.interceptor.Interceptor";
    PRIORITY = "javax.annotation.Priority";
    ALTERNATIVE = "javax.enterprise.inject.Alternative";
    NAMED = "javax.inject.Named";
    DEFAULT = "javax.enterprise.inject.Default";
    ANY = "javax.enterprise.inject.Any";
    VETOED = "javax.enterprise.inject.Vetoed";

    // lifecycle and interception hooks
    POST_CONSTRUCT = "javax.annotation.PostConstruct";
    PRE_DESTROY = "javax.annotation.PreDestroy";
    AROUND_INVOKE = "javax.interceptor.AroundInvoke";
    AROUND_CONSTRUCT = "javax.interceptor.AroundConstruct";
    INVOCATION_CONTEXT = "javax.interceptor.InvocationContext";

    // scopes
    DEPENDENT = "javax.enterprise.context.Dependent";
    SINGLETON = "javax.inject.Singleton";
    APPLICATION_SCOPED = "javax.enterprise.context.ApplicationScoped";
    REQUEST_SCOPED = "javax.enterprise.context.RequestScoped";

    // built-in bean types
    INSTANCE = "javax.enterprise.inject.Instance";
    PROVIDER = "javax.inject.Provider";
    INJECTION_POINT = "javax.enterprise.inject.spi.InjectionPoint";
    EVENT = "javax.enterprise.event.Event";
    BEAN_MANAGER = "javax.enterprise.inject.spi.BeanManager";
    EVENT_METADATA = "javax.enterprise.inject.spi.EventMetadata";

    /// `java.lang.Object`
    OBJECT = "java.lang.Object";
}

/// True if `name` is `java.lang.Object`
#[inline]
pub fn is_object(name: &DotName) -> bool {
    name.as_str() == OBJECT_NAME
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_shared() {
        assert_eq!(INJECT.simple_name(), "Inject");
        assert_eq!(*OBJECT, DotName::new("java.lang.Object"));
        assert!(is_object(&OBJECT));
        assert!(!is_object(&NAMED));
    }
}
