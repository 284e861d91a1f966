//! # bean-processor
//!
//! Build-time bean discovery and container synthesis for a CDI-lite
//! component model.
//!
//! The processor takes an [`index::IndexView`] of class metadata, discovers
//! beans, interceptors and observers, resolves every injection point by type
//! and qualifiers, and emits the classes a lightweight runtime needs to wire
//! the application without any reflection at startup:
//!
//! - one provider class per bean, interceptor and observer method
//! - client proxies for normal-scoped beans
//! - intercepted subclasses
//! - annotation literal classes
//! - a components provider registered as a service
//!
//! ## Quick Start
//!
//! ```rust
//! use bean_processor::prelude::*;
//! use bean_processor::names;
//! use std::sync::Arc;
//!
//! let classes = vec![
//!     ClassInfo::builder("org.acme.Repository")
//!         .no_args_constructor()
//!         .annotation(AnnotationInstance::marker(names::SINGLETON.clone()))
//!         .build(),
//!     ClassInfo::builder("org.acme.Service")
//!         .no_args_constructor()
//!         .annotation(AnnotationInstance::marker(names::APPLICATION_SCOPED.clone()))
//!         .field(
//!             FieldInfo::new("repository", Type::class("org.acme.Repository"))
//!                 .annotation(AnnotationInstance::marker(names::INJECT.clone())),
//!         )
//!         .build(),
//! ];
//!
//! let output = Arc::new(InMemoryOutput::new());
//! let result = BeanProcessor::builder()
//!     .name("acme")
//!     .index(Index::from_classes(classes))
//!     .output(output.clone())
//!     .build()
//!     .process()
//!     .unwrap();
//!
//! assert!(output.contains("org/acme/Service_Bean"));
//! assert!(output.contains("org/acme/Service_ClientProxy"));
//! assert!(result.resources().len() > 2);
//! ```
//!
//! ## Extensions
//!
//! Four extension points take part in a run, each ordered by
//! [`extension::BuildExtension::priority`]:
//!
//! - [`extension::AnnotationsTransformer`] rewrites annotations as they are read
//! - [`extension::DeploymentEnhancer`] adds classes to the index
//! - [`extension::BeanRegistrar`] registers synthetic beans
//! - [`extension::BeanDeploymentValidator`] reports problems after resolution
//!
//! ## Errors
//!
//! Definition problems abort discovery. Resolution problems are collected
//! and reported together as [`DeploymentError::Multiple`].

pub mod annotations;
pub mod bean;
pub mod codegen;
pub mod deployment;
mod error;
pub mod extension;
pub mod graph;
pub mod index;
pub mod injection;
pub mod interception;
pub mod interceptor;
#[cfg(feature = "logging")]
pub mod logging;
pub mod names;
pub mod observer;
mod processor;
pub mod resolver;
pub mod scope;
pub mod stereotype;
pub mod types;
pub mod unused;

pub use error::*;
pub use processor::*;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bean::{BeanId, BeanInfo};
    pub use crate::codegen::{InMemoryOutput, Resource, ResourceOutput};
    pub use crate::deployment::{BeanDefiningAnnotation, BeanDeployment};
    pub use crate::extension::{
        AnnotationsTransformer, BeanDeploymentValidator, BeanRegistrar, BuildContext, BuildExtension,
        DeploymentEnhancer,
    };
    pub use crate::index::{AnnotationInstance, ClassInfo, DotName, FieldInfo, Index, IndexView, MethodInfo, Type};
    pub use crate::scope::ScopeInfo;
    pub use crate::{BeanProcessor, DeploymentError, ProcessingResult, Result};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use crate::index::MethodParameter;
    use crate::names;
    use std::sync::Arc;

    fn marker(name: &DotName) -> AnnotationInstance {
        AnnotationInstance::marker(name.clone())
    }

    fn process(classes: Vec<ClassInfo>) -> Result<(ProcessingResult, Arc<InMemoryOutput>)> {
        let output = Arc::new(InMemoryOutput::new());
        let result = BeanProcessor::builder()
            .name("scenario")
            .index(Index::from_classes(classes))
            .output(output.clone())
            .build()
            .process()?;
        Ok((result, output))
    }

    fn text(output: &InMemoryOutput, name: &str) -> String {
        output
            .get(name)
            .and_then(|r| r.text().map(str::to_string))
            .unwrap_or_else(|| panic!("no resource {name}"))
    }

    fn greeter() -> ClassInfo {
        ClassInfo::builder("a.Greeter").interface().build()
    }

    fn greeter_impl(name: &str) -> ClassInfo {
        ClassInfo::builder(name)
            .no_args_constructor()
            .implements(Type::class("a.Greeter"))
            .annotation(marker(&names::SINGLETON))
            .build()
    }

    fn client() -> ClassInfo {
        ClassInfo::builder("a.Client")
            .no_args_constructor()
            .annotation(marker(&names::SINGLETON))
            .field(FieldInfo::new("greeter", Type::class("a.Greeter")).annotation(marker(&names::INJECT)))
            .build()
    }

    #[test]
    fn test_dependent_bean_is_created_on_every_get() {
        let counter = ClassInfo::builder("a.Counter")
            .no_args_constructor()
            .annotation(marker(&names::DEPENDENT))
            .build();
        let (_, output) = process(vec![counter]).unwrap();
        let provider = text(&output, "a/Counter_Bean");
        assert!(provider.contains("a.Counter instance = this.create(ctx);"));
        assert!(!provider.contains("proxy"));
        assert!(!output.contains("a/Counter_ClientProxy"));
    }

    #[test]
    fn test_constructor_dependency_created_first() {
        let a = ClassInfo::builder("a.A")
            .no_args_constructor()
            .annotation(marker(&names::SINGLETON))
            .build();
        let b = ClassInfo::builder("a.B")
            .annotation(marker(&names::SINGLETON))
            .method(
                MethodInfo::constructor()
                    .parameter(MethodParameter::new(Type::class("a.A")))
                    .annotation(marker(&names::INJECT)),
            )
            .build();
        let (result, output) = process(vec![b, a]).unwrap();
        assert_eq!(result.lazy_references(), 0);

        let provider = text(&output, "a/B_Bean");
        assert!(provider.contains("a.B instance = new a.B(this.injectProvider0.get("));

        let components = text(&output, "org/jboss/protean/arc/setup/scenario_ComponentsProvider");
        let first = components.find("a.A_Bean bean1 = new a.A_Bean();").unwrap();
        let second = components.find("a.B_Bean bean0 = new a.B_Bean(bean1);").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_ambiguous_dependency_fails() {
        let err = process(vec![greeter(), greeter_impl("a.English"), greeter_impl("a.French"), client()]).unwrap_err();
        assert!(err.is_ambiguous());
        let message = err.to_string();
        assert!(message.contains("a.English"));
        assert!(message.contains("a.French"));
    }

    #[test]
    fn test_unsatisfied_dependency_fails_without_output() {
        let output = Arc::new(InMemoryOutput::new());
        let err = BeanProcessor::builder()
            .index(Index::from_classes(vec![greeter(), client()]))
            .output(output.clone())
            .build()
            .process()
            .unwrap_err();
        assert!(err.is_unsatisfied());
        assert!(output.is_empty());
    }

    #[test]
    fn test_named_qualifier_selects_bean() {
        let named = |name: &str, value: &str| {
            ClassInfo::builder(name)
                .no_args_constructor()
                .implements(Type::class("a.Greeter"))
                .annotation(marker(&names::SINGLETON))
                .annotation(marker(&names::NAMED).with_value(value))
                .build()
        };
        let client = ClassInfo::builder("a.Client")
            .no_args_constructor()
            .annotation(marker(&names::SINGLETON))
            .field(
                FieldInfo::new("greeter", Type::class("a.Greeter"))
                    .annotation(marker(&names::INJECT))
                    .annotation(marker(&names::NAMED).with_value("french")),
            )
            .build();
        let (result, _) = process(vec![
            greeter(),
            named("a.English", "english"),
            named("a.French", "french"),
            client,
        ])
        .unwrap();
        let french = result
            .deployment()
            .beans()
            .iter()
            .find(|b| b.bean_class().as_str() == "a.French")
            .unwrap();
        assert_eq!(french.name(), Some("french"));
    }
}
