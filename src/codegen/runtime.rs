//! Runtime classes referenced by generated code

pub const INJECTABLE_BEAN: &str = "org.jboss.protean.arc.InjectableBean";
pub const INJECTABLE_INTERCEPTOR: &str = "org.jboss.protean.arc.InjectableInterceptor";
pub const INJECTABLE_OBSERVER_METHOD: &str = "org.jboss.protean.arc.InjectableObserverMethod";
pub const INJECTABLE_REFERENCE_PROVIDER: &str = "org.jboss.protean.arc.InjectableReferenceProvider";
pub const CREATIONAL_CONTEXT: &str = "javax.enterprise.context.spi.CreationalContext";
pub const CREATIONAL_CONTEXT_IMPL: &str = "org.jboss.protean.arc.CreationalContextImpl";
pub const CLIENT_PROXY: &str = "org.jboss.protean.arc.ClientProxy";
pub const SUBCLASS: &str = "org.jboss.protean.arc.Subclass";
pub const COMPONENTS_PROVIDER: &str = "org.jboss.protean.arc.ComponentsProvider";
pub const COMPONENTS: &str = "org.jboss.protean.arc.Components";
pub const ARC: &str = "org.jboss.protean.arc.Arc";
pub const REFLECTIONS: &str = "org.jboss.protean.arc.Reflections";
pub const LAZY_VALUE: &str = "org.jboss.protean.arc.LazyValue";
pub const LAZY_REFERENCE_PROVIDER: &str = "org.jboss.protean.arc.LazyReferenceProvider";
pub const INVOCATION_CONTEXTS: &str = "org.jboss.protean.arc.InvocationContexts";
pub const INTERCEPTOR_INVOCATION: &str = "org.jboss.protean.arc.InterceptorInvocation";
pub const ANNOTATIONS: &str = "org.jboss.protean.arc.Annotations";
pub const DEFAULT_LITERAL: &str = "org.jboss.protean.arc.DefaultLiteral";
pub const ANY_LITERAL: &str = "org.jboss.protean.arc.AnyLiteral";
pub const EVENT_CONTEXT: &str = "org.jboss.protean.arc.EventContext";
pub const TYPES: &str = "org.jboss.protean.arc.Types";

pub const INSTANCE_PROVIDER: &str = "org.jboss.protean.arc.InstanceProvider";
pub const INJECTION_POINT_PROVIDER: &str = "org.jboss.protean.arc.InjectionPointProvider";
pub const EVENT_PROVIDER: &str = "org.jboss.protean.arc.EventProvider";
pub const BEAN_MANAGER_PROVIDER: &str = "org.jboss.protean.arc.BeanManagerProvider";

pub const ANNOTATION_LITERAL: &str = "javax.enterprise.util.AnnotationLiteral";
pub const INTERCEPTION_TYPE: &str = "javax.enterprise.inject.spi.InterceptionType";
pub const OBJECT: &str = "java.lang.Object";
pub const STRING: &str = "java.lang.String";
pub const SET: &str = "java.util.Set";
pub const HASH_SET: &str = "java.util.HashSet";
pub const LIST: &str = "java.util.List";
pub const ARRAY_LIST: &str = "java.util.ArrayList";
pub const MAP: &str = "java.util.Map";
pub const HASH_MAP: &str = "java.util.HashMap";
pub const COLLECTIONS: &str = "java.util.Collections";
pub const ILLEGAL_STATE_EXCEPTION: &str = "java.lang.IllegalStateException";
