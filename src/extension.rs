//! Build extension points
//!
//! A processing run can be customized by four kinds of extensions:
//!
//! - [`AnnotationsTransformer`]: add or remove annotations before discovery
//! - [`DeploymentEnhancer`]: add classes to the index
//! - [`BeanRegistrar`]: register synthetic beans through [`BeanConfigurator`]
//! - [`BeanDeploymentValidator`]: report problems once resolution succeeded
//!
//! Every extension is a [`BuildExtension`]. It is initialized once per run
//! with the shared [`BuildContext`] and may opt out by returning `false`.
//! Extensions of one kind run in descending [`BuildExtension::priority`] order.

use crate::bean::BeanInfo;
use crate::deployment::BeanDeployment;
use crate::error::{DeploymentError, Result};
use crate::index::{AnnotationInstance, AnnotationTarget, AnnotationValue, ClassInfo, DotName, TargetKind, Type};
use crate::scope::ScopeInfo;
use ahash::RandomState;
use dashmap::DashMap;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// Priority used when an extension does not override [`BuildExtension::priority`]
pub const DEFAULT_PRIORITY: i32 = 1000;

// =============================================================================
// Build context
// =============================================================================

/// Typed key into the [`BuildContext`]
pub struct Key<V> {
    name: &'static str,
    _marker: PhantomData<fn() -> V>,
}

impl<V> Key<V> {
    /// Create a key; keys with the same name address the same slot
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<V> fmt::Debug for Key<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Key").field(&self.name).finish()
    }
}

/// Key/value store shared by all extensions of one processing run.
///
/// The processor publishes the deployment name up front and the discovered
/// qualifiers and interceptor bindings once the deployment is built.
pub struct BuildContext {
    values: DashMap<&'static str, Arc<dyn Any + Send + Sync>, RandomState>,
}

impl BuildContext {
    /// Name of the deployment being processed
    pub const DEPLOYMENT_NAME: Key<String> = Key::new("deployment-name");
    /// Every qualifier annotation of the deployment
    pub const QUALIFIERS: Key<Vec<DotName>> = Key::new("qualifiers");
    /// Every interceptor binding annotation of the deployment
    pub const INTERCEPTOR_BINDINGS: Key<Vec<DotName>> = Key::new("interceptor-bindings");

    pub fn new() -> Self {
        Self {
            values: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
        }
    }

    /// Get a copy of the value stored under `key`
    pub fn get<V: Clone + Send + Sync + 'static>(&self, key: &Key<V>) -> Option<V> {
        self.values
            .get(key.name)
            .and_then(|value| value.downcast_ref::<V>().cloned())
    }

    /// Store a value, returning the previous one
    pub fn put<V: Clone + Send + Sync + 'static>(&self, key: &Key<V>, value: V) -> Option<V> {
        self.values
            .insert(key.name, Arc::new(value))
            .and_then(|previous| previous.downcast_ref::<V>().cloned())
    }

    pub fn contains<V>(&self, key: &Key<V>) -> bool {
        self.values.contains_key(key.name)
    }
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("entries", &self.values.len())
            .finish()
    }
}

// =============================================================================
// Extension traits
// =============================================================================

/// Common contract of every build extension
pub trait BuildExtension: Send + Sync {
    /// Higher priorities run first
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Called once per run; returning `false` disables the extension
    fn initialize(&self, _context: &BuildContext) -> Result<bool> {
        Ok(true)
    }

    /// Name used in logs and error messages
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Rewrites the annotations seen by the processor
pub trait AnnotationsTransformer: BuildExtension {
    /// Whether `transform` should be called for targets of this kind
    fn applies_to(&self, _kind: TargetKind) -> bool {
        true
    }

    fn transform(&self, context: &mut TransformationContext<'_>);
}

/// Adds classes to the index before discovery
pub trait DeploymentEnhancer: BuildExtension {
    fn enhance(&self, context: &mut DeploymentContext<'_>) -> Result<()>;
}

/// Registers synthetic beans
pub trait BeanRegistrar: BuildExtension {
    fn register(&self, context: &mut RegistrationContext<'_>) -> Result<()>;
}

/// Validates the resolved deployment
pub trait BeanDeploymentValidator: BuildExtension {
    fn validate(&self, context: &mut ValidationContext<'_>);
}

/// Initialize extensions, drop disabled ones and sort by priority.
///
/// The sort is stable: extensions with equal priority keep registration order.
pub(crate) fn initialize_all<E>(extensions: &[Arc<E>], context: &BuildContext) -> Result<Vec<Arc<E>>>
where
    E: BuildExtension + ?Sized,
{
    let mut enabled = Vec::with_capacity(extensions.len());
    for extension in extensions {
        if extension.initialize(context)? {
            enabled.push(Arc::clone(extension));
        } else {
            #[cfg(feature = "logging")]
            debug!(
                target: "bean_processor",
                extension = extension.name(),
                "Build extension disabled itself"
            );
        }
    }
    enabled.sort_by_key(|extension| std::cmp::Reverse(extension.priority()));
    Ok(enabled)
}

// =============================================================================
// Contexts
// =============================================================================

/// Annotations of one target, open for modification by a transformer
pub struct TransformationContext<'a> {
    target: &'a AnnotationTarget,
    annotations: Vec<AnnotationInstance>,
    build: &'a BuildContext,
}

impl<'a> TransformationContext<'a> {
    pub(crate) fn new(
        target: &'a AnnotationTarget,
        annotations: Vec<AnnotationInstance>,
        build: &'a BuildContext,
    ) -> Self {
        Self {
            target,
            annotations,
            build,
        }
    }

    pub fn target(&self) -> &AnnotationTarget {
        self.target
    }

    /// Current annotations, including changes made by earlier transformers
    pub fn annotations(&self) -> &[AnnotationInstance] {
        &self.annotations
    }

    pub fn has(&self, name: &DotName) -> bool {
        self.annotations.iter().any(|a| a.name() == name)
    }

    /// Add an annotation, replacing one of the same type
    pub fn add(&mut self, annotation: AnnotationInstance) -> &mut Self {
        self.annotations.retain(|a| a.name() != annotation.name());
        self.annotations.push(annotation);
        self
    }

    /// Remove every annotation matching the predicate
    pub fn remove(&mut self, predicate: impl Fn(&AnnotationInstance) -> bool) -> &mut Self {
        self.annotations.retain(|a| !predicate(a));
        self
    }

    pub fn build_context(&self) -> &BuildContext {
        self.build
    }

    pub(crate) fn into_annotations(self) -> Vec<AnnotationInstance> {
        self.annotations
    }
}

/// Collects classes contributed by [`DeploymentEnhancer`]s
pub struct DeploymentContext<'a> {
    classes: Vec<ClassInfo>,
    build: &'a BuildContext,
}

impl<'a> DeploymentContext<'a> {
    pub(crate) fn new(build: &'a BuildContext) -> Self {
        Self {
            classes: Vec::new(),
            build,
        }
    }

    /// Make a class visible to discovery
    pub fn add_class(&mut self, class: ClassInfo) -> &mut Self {
        self.classes.push(class);
        self
    }

    pub fn build_context(&self) -> &BuildContext {
        self.build
    }

    pub(crate) fn into_classes(self) -> Vec<ClassInfo> {
        self.classes
    }
}

/// Collects synthetic bean registrations
pub struct RegistrationContext<'a> {
    configurators: Vec<BeanConfigurator>,
    build: &'a BuildContext,
}

impl<'a> RegistrationContext<'a> {
    pub(crate) fn new(build: &'a BuildContext) -> Self {
        Self {
            configurators: Vec::new(),
            build,
        }
    }

    /// Start configuring a synthetic bean with the given implementation class
    pub fn configure(&mut self, implementation_class: impl Into<DotName>) -> &mut BeanConfigurator {
        self.configurators
            .push(BeanConfigurator::new(implementation_class.into()));
        let last = self.configurators.len() - 1;
        &mut self.configurators[last]
    }

    pub fn build_context(&self) -> &BuildContext {
        self.build
    }

    pub(crate) fn into_configurators(self) -> Vec<BeanConfigurator> {
        self.configurators
    }
}

/// Description of a synthetic bean.
///
/// The generated provider instantiates the `creator` class and calls its
/// `create(CreationalContext, Map)` method with the configured params.
#[derive(Debug, Clone)]
pub struct BeanConfigurator {
    pub(crate) implementation_class: DotName,
    pub(crate) types: Vec<Type>,
    pub(crate) qualifiers: Vec<AnnotationInstance>,
    pub(crate) scope: ScopeInfo,
    pub(crate) name: Option<String>,
    pub(crate) alternative_priority: Option<i32>,
    pub(crate) creator: Option<DotName>,
    pub(crate) destroyer: Option<DotName>,
    pub(crate) params: BTreeMap<String, AnnotationValue>,
}

impl BeanConfigurator {
    fn new(implementation_class: DotName) -> Self {
        Self {
            implementation_class,
            types: Vec::new(),
            qualifiers: Vec::new(),
            scope: ScopeInfo::Dependent,
            name: None,
            alternative_priority: None,
            creator: None,
            destroyer: None,
            params: BTreeMap::new(),
        }
    }

    /// Add a bean type; the implementation class is always a bean type
    pub fn add_type(&mut self, ty: Type) -> &mut Self {
        if !self.types.contains(&ty) {
            self.types.push(ty);
        }
        self
    }

    pub fn add_qualifier(&mut self, qualifier: AnnotationInstance) -> &mut Self {
        self.qualifiers.push(qualifier);
        self
    }

    pub fn scope(&mut self, scope: ScopeInfo) -> &mut Self {
        self.scope = scope;
        self
    }

    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    pub fn alternative_priority(&mut self, priority: i32) -> &mut Self {
        self.alternative_priority = Some(priority);
        self
    }

    /// Class whose `create` method produces instances
    pub fn creator(&mut self, creator: impl Into<DotName>) -> &mut Self {
        self.creator = Some(creator.into());
        self
    }

    /// Class whose `destroy` method disposes instances
    pub fn destroyer(&mut self, destroyer: impl Into<DotName>) -> &mut Self {
        self.destroyer = Some(destroyer.into());
        self
    }

    /// Parameter passed to the creator and destroyer
    pub fn param(&mut self, key: impl Into<String>, value: impl Into<AnnotationValue>) -> &mut Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn implementation_class(&self) -> &DotName {
        &self.implementation_class
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.creator.is_none() {
            return Err(DeploymentError::definition(format!(
                "Synthetic bean {} does not declare a creator",
                self.implementation_class
            )));
        }
        if self.types.iter().any(|t| matches!(t, Type::TypeVariable { .. } | Type::Wildcard { .. })) {
            return Err(DeploymentError::definition(format!(
                "Synthetic bean {} declares a type variable or wildcard as a bean type",
                self.implementation_class
            )));
        }
        Ok(())
    }
}

/// Resolved deployment handed to validators
pub struct ValidationContext<'a> {
    deployment: &'a BeanDeployment,
    build: &'a BuildContext,
    problems: Vec<DeploymentError>,
}

impl<'a> ValidationContext<'a> {
    pub(crate) fn new(deployment: &'a BeanDeployment, build: &'a BuildContext) -> Self {
        Self {
            deployment,
            build,
            problems: Vec::new(),
        }
    }

    pub fn deployment(&self) -> &BeanDeployment {
        self.deployment
    }

    pub fn beans(&self) -> &[BeanInfo] {
        self.deployment.beans()
    }

    pub fn build_context(&self) -> &BuildContext {
        self.build
    }

    /// Record a problem; any problem fails the run
    pub fn add_problem(&mut self, message: impl Into<String>) {
        self.problems.push(DeploymentError::Validation(message.into()));
    }

    pub(crate) fn into_problems(self) -> Vec<DeploymentError> {
        self.problems
    }
}
