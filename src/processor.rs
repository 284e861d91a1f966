//! The processing pipeline
//!
//! [`BeanProcessor`] runs one deployment from index to generated resources:
//!
//! 1. initialize build extensions
//! 2. let enhancers add classes to the index
//! 3. let registrars configure synthetic beans
//! 4. build the bean deployment and resolve every injection point
//! 5. run validators
//! 6. optionally remove unused beans
//! 7. analyze interception and order the providers
//! 8. generate and write every resource
//!
//! Any failure aborts the run before anything is written.

use crate::annotations::AnnotationStore;
use crate::bean::BeanId;
use crate::codegen::{
    self, AnnotationLiteralCache, ApplicationClassPredicate, ClassEmitter, GenerationContext, InMemoryOutput,
    NoopReflection, PrivateMembersCollector, ReflectionRegistration, RenderingEmitter, ResourceOutput,
};
use crate::deployment::{BeanDefiningAnnotation, BeanDeployment, builtin_annotation_classes};
use crate::error::{DeploymentError, Result};
use crate::extension::{
    AnnotationsTransformer, BeanDeploymentValidator, BeanRegistrar, BuildContext, BuildExtension, DeploymentContext,
    DeploymentEnhancer, RegistrationContext, ValidationContext, initialize_all,
};
use crate::index::{CompositeIndex, DotName, Index, IndexView};
use crate::resolver::resolve_injection_points;
use crate::unused::{UnusedExclusion, find_unused};
use crate::{graph, interception};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "logging")]
use tracing::debug;

/// Deployment name used when none is configured
pub const DEFAULT_DEPLOYMENT_NAME: &str = "default";

/// Outcome of a successful run
pub struct ProcessingResult {
    deployment: BeanDeployment,
    resources: Vec<String>,
    removed: Vec<BeanId>,
    lazy_references: usize,
}

impl fmt::Debug for ProcessingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingResult")
            .field("beans", &self.deployment.beans().len())
            .field("resources", &self.resources)
            .field("removed", &self.removed)
            .field("lazy_references", &self.lazy_references)
            .finish()
    }
}

impl ProcessingResult {
    /// The deployment, with removed beans marked
    pub fn deployment(&self) -> &BeanDeployment {
        &self.deployment
    }

    /// Names of the written resources, in generation order
    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    /// Beans removed as unused
    pub fn removed(&self) -> &[BeanId] {
        &self.removed
    }

    /// Dependencies wired lazily to break a cycle
    pub fn lazy_references(&self) -> usize {
        self.lazy_references
    }
}

/// Configured processing run
pub struct BeanProcessor {
    name: String,
    index: Arc<dyn IndexView>,
    additional_bean_defining: Vec<BeanDefiningAnnotation>,
    output: Arc<dyn ResourceOutput>,
    emitter: Arc<dyn ClassEmitter>,
    reflection: Arc<dyn ReflectionRegistration>,
    shared_literals: bool,
    transformers: Vec<Arc<dyn AnnotationsTransformer>>,
    enhancers: Vec<Arc<dyn DeploymentEnhancer>>,
    registrars: Vec<Arc<dyn BeanRegistrar>>,
    validators: Vec<Arc<dyn BeanDeploymentValidator>>,
    is_application_class: ApplicationClassPredicate,
    remove_unused: bool,
    unused_exclusions: Vec<UnusedExclusion>,
}

impl fmt::Debug for BeanProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanProcessor")
            .field("name", &self.name)
            .field("transformers", &self.transformers.len())
            .field("enhancers", &self.enhancers.len())
            .field("registrars", &self.registrars.len())
            .field("validators", &self.validators.len())
            .field("remove_unused", &self.remove_unused)
            .finish()
    }
}

impl BeanProcessor {
    pub fn builder() -> BeanProcessorBuilder {
        BeanProcessorBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the whole pipeline and write the generated resources
    pub fn process(&self) -> Result<ProcessingResult> {
        let start = Instant::now();
        let build = Arc::new(BuildContext::new());
        build.put(&BuildContext::DEPLOYMENT_NAME, self.name.clone());

        let transformers = initialize_all(&self.transformers, &build)?;
        let enhancers = initialize_all(&self.enhancers, &build)?;
        let registrars = initialize_all(&self.registrars, &build)?;
        let validators = initialize_all(&self.validators, &build)?;

        let index = self.enhanced_index(&enhancers, &build)?;

        let mut registration = RegistrationContext::new(&build);
        for registrar in &registrars {
            registrar
                .register(&mut registration)
                .map_err(|error| extension_error(registrar.as_ref(), error))?;
        }
        let synthetic = registration.into_configurators();

        let store = Arc::new(AnnotationStore::new(transformers, Arc::clone(&build)));
        let mut deployment = BeanDeployment::build(index, store, &self.additional_bean_defining, synthetic)?;
        build.put(&BuildContext::QUALIFIERS, deployment.qualifier_names());
        build.put(&BuildContext::INTERCEPTOR_BINDINGS, deployment.interceptor_binding_names());

        let resolutions = resolve_injection_points(&deployment)?;

        let mut validation = ValidationContext::new(&deployment, &build);
        for validator in &validators {
            validator.validate(&mut validation);
        }
        if let Some(error) = DeploymentError::aggregate(validation.into_problems()) {
            return Err(error);
        }

        let removed = match self.remove_unused {
            true => {
                let unused = find_unused(&deployment, &resolutions, &self.unused_exclusions);
                deployment.mark_removed(unused.iter().copied());
                unused
            }
            false => Vec::new(),
        };

        let interception = interception::analyze(&deployment)?;
        let linearization = graph::linearize(&deployment, &resolutions, &interception)?;

        let literals = AnnotationLiteralCache::new(self.shared_literals);
        let private_members = PrivateMembersCollector::new();
        let ctx = GenerationContext {
            deployment: &deployment,
            resolutions: &resolutions,
            interception: &interception,
            linearization: &linearization,
            literals: &literals,
            private_members: &private_members,
            reflection: self.reflection.as_ref(),
            emitter: self.emitter.as_ref(),
            is_application_class: self.is_application_class.as_ref(),
        };
        let generated = codegen::generate(&ctx, &self.name)?;

        let mut resources = Vec::with_capacity(generated.len());
        for resource in generated {
            resources.push(resource.name().to_string());
            self.output.write_resource(resource)?;
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "bean_processor",
            deployment = %self.name,
            beans = deployment.active_beans().count(),
            removed = removed.len(),
            resources = resources.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Deployment processed"
        );
        #[cfg(not(feature = "logging"))]
        let _ = start;

        Ok(ProcessingResult {
            lazy_references: linearization.lazy_edge_count(),
            deployment,
            resources,
            removed,
        })
    }

    /// The configured index, joined with enhancer classes and the built-in
    /// qualifier types it lacks
    fn enhanced_index(&self, enhancers: &[Arc<dyn DeploymentEnhancer>], build: &BuildContext) -> Result<Arc<dyn IndexView>> {
        let mut enhancement = DeploymentContext::new(build);
        for enhancer in enhancers {
            enhancer
                .enhance(&mut enhancement)
                .map_err(|error| extension_error(enhancer.as_ref(), error))?;
        }
        let mut added = enhancement.into_classes();
        for builtin in builtin_annotation_classes() {
            let known = self.index.class_by_name(builtin.name()).is_some()
                || added.iter().any(|class| class.name() == builtin.name());
            if !known {
                added.push(builtin);
            }
        }
        if added.is_empty() {
            return Ok(Arc::clone(&self.index));
        }
        #[cfg(feature = "logging")]
        debug!(target: "bean_processor", classes = added.len(), "Index enhanced");
        let extra: Arc<dyn IndexView> = Arc::new(Index::from_classes(added));
        Ok(Arc::new(CompositeIndex::new([Arc::clone(&self.index), extra])))
    }
}

fn extension_error<E: BuildExtension + ?Sized>(extension: &E, error: DeploymentError) -> DeploymentError {
    match error {
        DeploymentError::Extension { .. } => error,
        other => DeploymentError::extension(extension.name(), other.to_string()),
    }
}

/// Builder for [`BeanProcessor`]
pub struct BeanProcessorBuilder {
    processor: BeanProcessor,
}

impl BeanProcessorBuilder {
    fn new() -> Self {
        Self {
            processor: BeanProcessor {
                name: DEFAULT_DEPLOYMENT_NAME.to_string(),
                index: Arc::new(Index::builder().build()),
                additional_bean_defining: Vec::new(),
                output: Arc::new(InMemoryOutput::new()),
                emitter: Arc::new(RenderingEmitter),
                reflection: Arc::new(NoopReflection),
                shared_literals: true,
                transformers: Vec::new(),
                enhancers: Vec::new(),
                registrars: Vec::new(),
                validators: Vec::new(),
                is_application_class: Arc::new(|_: &DotName| true),
                remove_unused: false,
                unused_exclusions: Vec::new(),
            },
        }
    }

    /// Deployment name; also names the components provider
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.processor.name = name.into();
        self
    }

    pub fn index(mut self, index: impl IndexView + 'static) -> Self {
        self.processor.index = Arc::new(index);
        self
    }

    pub fn shared_index(mut self, index: Arc<dyn IndexView>) -> Self {
        self.processor.index = index;
        self
    }

    pub fn bean_defining_annotation(mut self, annotation: BeanDefiningAnnotation) -> Self {
        self.processor.additional_bean_defining.push(annotation);
        self
    }

    pub fn output(mut self, output: Arc<dyn ResourceOutput>) -> Self {
        self.processor.output = output;
        self
    }

    pub fn emitter(mut self, emitter: Arc<dyn ClassEmitter>) -> Self {
        self.processor.emitter = emitter;
        self
    }

    pub fn reflection(mut self, reflection: Arc<dyn ReflectionRegistration>) -> Self {
        self.processor.reflection = reflection;
        self
    }

    /// Generate one literal class per annotation type (default) instead of
    /// creating literals through the runtime helper
    pub fn shared_annotation_literals(mut self, shared: bool) -> Self {
        self.processor.shared_literals = shared;
        self
    }

    pub fn transformer(mut self, transformer: impl AnnotationsTransformer + 'static) -> Self {
        self.processor.transformers.push(Arc::new(transformer));
        self
    }

    pub fn enhancer(mut self, enhancer: impl DeploymentEnhancer + 'static) -> Self {
        self.processor.enhancers.push(Arc::new(enhancer));
        self
    }

    pub fn registrar(mut self, registrar: impl BeanRegistrar + 'static) -> Self {
        self.processor.registrars.push(Arc::new(registrar));
        self
    }

    pub fn validator(mut self, validator: impl BeanDeploymentValidator + 'static) -> Self {
        self.processor.validators.push(Arc::new(validator));
        self
    }

    /// Decides which classes private member usage is reported for at info level
    pub fn application_class_predicate(mut self, predicate: impl Fn(&DotName) -> bool + Send + Sync + 'static) -> Self {
        self.processor.is_application_class = Arc::new(predicate);
        self
    }

    pub fn remove_unused_beans(mut self, remove: bool) -> Self {
        self.processor.remove_unused = remove;
        self
    }

    /// Keep beans matching `exclusion` even when unused
    pub fn unused_exclusion(mut self, exclusion: impl Fn(&crate::bean::BeanInfo) -> bool + Send + Sync + 'static) -> Self {
        self.processor.unused_exclusions.push(Arc::new(exclusion));
        self
    }

    pub fn build(self) -> BeanProcessor {
        self.processor
    }
}
