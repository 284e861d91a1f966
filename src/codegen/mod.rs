//! Code generation
//!
//! Every generator turns resolved model objects into [`ClassShape`]s, hands
//! them to the configured [`ClassEmitter`] and returns named [`Resource`]s.
//! Generated names are deterministic so that providers can reference each
//! other by name.

mod bean;
mod client_proxy;
mod components;
mod interceptor;
pub mod literals;
mod observer;
pub mod output;
pub mod runtime;
pub mod shape;
mod subclass;

pub use literals::{AnnotationLiteralCache, LiteralClass};
pub use output::{ClassEmitter, InMemoryOutput, RenderingEmitter, Resource, ResourceKind, ResourceOutput, SpecialType};
pub use shape::{ClassShape, Expr, FieldShape, MethodShape, Stmt};

use crate::bean::{BeanId, BeanInfo, BeanKind, hash};
use crate::deployment::BeanDeployment;
use crate::error::{DeploymentError, Result};
use crate::graph::Linearization;
use crate::index::{AnnotationInstance, ClassInfo, DotName, FieldInfo, MethodInfo, Type};
use crate::injection::{InjectionPointId, InjectionPointInfo};
use crate::interception::InterceptionModel;
use crate::observer::ObserverInfo;
use crate::resolver::{BuiltinBean, ResolvedTarget, Resolutions};
use ahash::RandomState;
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "logging")]
use tracing::{debug, info};

/// Package of the generated components provider
pub const SETUP_PACKAGE: &str = "org.jboss.protean.arc.setup";

/// Decides whether a class belongs to the application rather than a library
pub type ApplicationClassPredicate = Arc<dyn Fn(&DotName) -> bool + Send + Sync>;

// =============================================================================
// Reflection registration
// =============================================================================

/// Notified of private members generated code accesses reflectively
pub trait ReflectionRegistration: Send + Sync {
    fn register_method(&self, method: &MethodInfo);
    fn register_field(&self, field: &FieldInfo);
}

/// Ignores every registration
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReflection;

impl ReflectionRegistration for NoopReflection {
    fn register_method(&self, _method: &MethodInfo) {}
    fn register_field(&self, _field: &FieldInfo) {}
}

/// Records registered members as `Class#member` strings
#[derive(Debug, Default)]
pub struct RecordingReflection {
    methods: DashSet<String>,
    fields: DashSet<String>,
}

impl RecordingReflection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered methods, sorted
    pub fn methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.methods.iter().map(|m| m.key().clone()).collect();
        methods.sort();
        methods
    }

    /// Registered fields, sorted
    pub fn fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = self.fields.iter().map(|f| f.key().clone()).collect();
        fields.sort();
        fields
    }
}

impl ReflectionRegistration for RecordingReflection {
    fn register_method(&self, method: &MethodInfo) {
        self.methods.insert(method.to_string());
    }

    fn register_field(&self, field: &FieldInfo) {
        self.fields.insert(field.to_string());
    }
}

/// Collects descriptions of private members used by generated code
pub struct PrivateMembersCollector {
    descriptions: DashMap<String, bool, RandomState>,
}

impl PrivateMembersCollector {
    pub fn new() -> Self {
        Self {
            descriptions: DashMap::with_hasher(RandomState::new()),
        }
    }

    pub fn add(&self, application: bool, description: impl Into<String>) {
        self.descriptions.insert(description.into(), application);
    }

    /// Descriptions for application (`true`) or framework classes, sorted
    pub fn descriptions(&self, application: bool) -> Vec<String> {
        let mut found: Vec<String> = self
            .descriptions
            .iter()
            .filter(|e| *e.value() == application)
            .map(|e| e.key().clone())
            .collect();
        found.sort();
        found
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }

    /// Report application usage at info level, the first three entries
    /// only unless debug is enabled; framework usage at debug level
    pub fn log(&self) {
        #[cfg(feature = "logging")]
        {
            let application = self.descriptions(true);
            if !application.is_empty() {
                let limit = if tracing::enabled!(target: "bean_processor", tracing::Level::DEBUG) {
                    usize::MAX
                } else {
                    3
                };
                let mut listed: Vec<String> = application.iter().take(limit).map(|d| format!("\t- {d}")).collect();
                if application.len() > limit {
                    listed.push(format!(
                        "\t- and {} more - enable debug logging to see the full list",
                        application.len() - limit
                    ));
                }
                info!(
                    target: "bean_processor",
                    "Found unrecommended usage of private members (use package-private instead) in application beans:\n{}",
                    listed.join(",\n")
                );
            }
            let framework = self.descriptions(false);
            if !framework.is_empty() {
                debug!(
                    target: "bean_processor",
                    "Found unrecommended usage of private members (use package-private instead) in framework beans:\n{}",
                    framework.iter().map(|d| format!("\t- {d}")).collect::<Vec<_>>().join(",\n")
                );
            }
        }
    }
}

impl Default for PrivateMembersCollector {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Generated names
// =============================================================================

fn base_name(class: &DotName) -> String {
    class.local_name().replace('$', "_")
}

fn in_package_of(class: &DotName, simple: String) -> String {
    match class.package_name() {
        "" => simple,
        package => format!("{package}.{simple}"),
    }
}

/// Fully qualified name of the provider generated for a bean
pub fn bean_provider_name(bean: &BeanInfo) -> String {
    let class = bean.bean_class();
    let base = base_name(class);
    let simple = match bean.kind() {
        BeanKind::Class | BeanKind::Interceptor(_) => format!("{base}_Bean"),
        BeanKind::ProducerMethod { method, .. } => {
            format!("{base}_ProducerMethod_{}_{}_Bean", method.name(), bean.identifier())
        }
        BeanKind::ProducerField { field, .. } => format!("{base}_ProducerField_{}_Bean", field.name()),
        BeanKind::Synthetic(_) => format!("{base}_{}_Synthetic_Bean", bean.identifier()),
    };
    in_package_of(class, simple)
}

fn derived_name(bean: &BeanInfo, suffix: &str) -> String {
    let provider = bean_provider_name(bean);
    let base = provider.strip_suffix("_Bean").unwrap_or(&provider);
    format!("{base}_{suffix}")
}

/// `<base>_ClientProxy`
pub fn client_proxy_name(bean: &BeanInfo) -> String {
    derived_name(bean, "ClientProxy")
}

/// `<base>_Subclass`
pub fn subclass_name(bean: &BeanInfo) -> String {
    derived_name(bean, "Subclass")
}

/// `<Declaring>_Observer_<method>_<hash>`
pub fn observer_name(deployment: &BeanDeployment, observer: &ObserverInfo) -> String {
    let declaring = deployment.bean(observer.declaring_bean()).bean_class();
    let digest = hash(&format!("{}{}", observer.method(), observer.observed_type()));
    in_package_of(
        declaring,
        format!("{}_Observer_{}_{digest}", base_name(declaring), observer.method().name()),
    )
}

/// `<Name>_ComponentsProvider` in the setup package
pub fn components_provider_name(deployment_name: &str) -> String {
    format!("{SETUP_PACKAGE}.{deployment_name}_ComponentsProvider")
}

/// Erased type name used in generated code
pub(crate) fn type_name(ty: &Type) -> String {
    ty.erasure().to_string()
}

// =============================================================================
// Generation context
// =============================================================================

/// Everything a generator needs for one processing run
pub struct GenerationContext<'a> {
    pub deployment: &'a BeanDeployment,
    pub resolutions: &'a Resolutions,
    pub interception: &'a InterceptionModel,
    pub linearization: &'a Linearization,
    pub literals: &'a AnnotationLiteralCache,
    pub private_members: &'a PrivateMembersCollector,
    pub reflection: &'a dyn ReflectionRegistration,
    pub emitter: &'a dyn ClassEmitter,
    pub is_application_class: &'a (dyn Fn(&DotName) -> bool + Send + Sync),
}

impl GenerationContext<'_> {
    /// Emit a shape as a class resource
    pub(crate) fn emit(&self, shape: &ClassShape, special_type: Option<SpecialType>) -> Result<Resource> {
        let data = self.emitter.emit(shape)?;
        Ok(Resource::class(DotName::new(shape.name()).binary_name(), data, special_type))
    }

    pub(crate) fn literal(&self, annotation: &AnnotationInstance) -> Result<Expr> {
        self.literals.literal(self.deployment, annotation)
    }

    /// `new Annotation[]{...}` of literals
    pub(crate) fn literal_array(&self, annotations: &[AnnotationInstance]) -> Result<Expr> {
        let mut literals = Vec::with_capacity(annotations.len());
        for annotation in annotations {
            literals.push(self.literal(annotation)?);
        }
        Ok(Expr::array("java.lang.annotation.Annotation", literals))
    }

    fn record_private(&self, class: &DotName, description: String) {
        self.private_members.add((self.is_application_class)(class), description);
    }

    /// Invoke `method` on `target`, reflectively when it is private
    pub(crate) fn invoke_method(&self, method: &MethodInfo, target: Expr, args: Vec<Expr>) -> Expr {
        if !method.flags().is_private() {
            return target.invoke(method.name(), args);
        }
        self.reflection.register_method(method);
        self.record_private(method.declaring_class(), format!("{method}"));
        Expr::invoke_static(
            runtime::REFLECTIONS,
            "invokeMethod",
            [
                Expr::ClassLiteral(method.declaring_class().to_string()),
                Expr::string(method.name()),
                parameter_types(method),
                target,
                Expr::array(runtime::OBJECT, args),
            ],
        )
    }

    /// Assign `value` to `field` of `target`, reflectively when it is private
    pub(crate) fn write_field(&self, field: &FieldInfo, target: Expr, value: Expr) -> Stmt {
        if !field.flags().is_private() {
            return Stmt::assign(target.field(field.name()), value);
        }
        self.reflection.register_field(field);
        self.record_private(field.declaring_class(), format!("{field}"));
        Stmt::Expr(Expr::invoke_static(
            runtime::REFLECTIONS,
            "writeField",
            [
                Expr::ClassLiteral(field.declaring_class().to_string()),
                Expr::string(field.name()),
                target,
                value,
            ],
        ))
    }

    /// Read `field` of `target`, reflectively when it is private
    pub(crate) fn read_field(&self, field: &FieldInfo, target: Expr) -> Expr {
        if !field.flags().is_private() {
            return target.field(field.name());
        }
        self.reflection.register_field(field);
        self.record_private(field.declaring_class(), format!("{field}"));
        Expr::invoke_static(
            runtime::REFLECTIONS,
            "readField",
            [
                Expr::ClassLiteral(field.declaring_class().to_string()),
                Expr::string(field.name()),
                target,
            ],
        )
    }

    /// Instantiate `class` through `constructor`, reflectively when private
    pub(crate) fn new_instance(&self, class: &ClassInfo, constructor: Option<&MethodInfo>, args: Vec<Expr>) -> Result<Expr> {
        let constructor = match constructor {
            Some(constructor) => constructor,
            None => class
                .constructors()
                .find(|c| c.parameters().is_empty())
                .ok_or_else(|| DeploymentError::NoAccessibleConstructor {
                    class: class.name().to_string(),
                })?,
        };
        if !constructor.flags().is_private() {
            return Ok(Expr::new_instance(class.name().as_str(), args));
        }
        self.reflection.register_method(constructor);
        self.record_private(class.name(), format!("{constructor}"));
        Ok(Expr::invoke_static(
            runtime::REFLECTIONS,
            "newInstance",
            [
                Expr::ClassLiteral(class.name().to_string()),
                parameter_types(constructor),
                Expr::array(runtime::OBJECT, args),
            ],
        ))
    }

    pub(crate) fn class_of(&self, name: &DotName) -> Result<&ClassInfo> {
        self.deployment
            .index()
            .class_by_name(name)
            .ok_or_else(|| DeploymentError::class_not_found(name))
    }
}

fn parameter_types(method: &MethodInfo) -> Expr {
    Expr::array(
        "java.lang.Class",
        method
            .parameters()
            .iter()
            .map(|p| Expr::ClassLiteral(type_name(p.ty()))),
    )
}

// =============================================================================
// Provider dependencies
// =============================================================================

/// Where the reference behind a provider field comes from
#[derive(Debug, Clone)]
pub(crate) enum SlotSource {
    /// Passed to the constructor by the components provider
    Bean(BeanId),
    /// Created in the constructor
    Builtin(Expr),
}

/// A provider field of a generated class
#[derive(Debug, Clone)]
pub(crate) struct ProviderSlot {
    pub field: String,
    pub point: Option<InjectionPointId>,
    pub source: SlotSource,
}

/// Provider fields of a generated bean or observer class, in constructor
/// parameter order
#[derive(Debug, Clone, Default)]
pub(crate) struct Dependencies {
    slots: Vec<ProviderSlot>,
}

impl Dependencies {
    pub fn slots(&self) -> &[ProviderSlot] {
        &self.slots
    }

    pub fn field_for(&self, point: InjectionPointId) -> Option<&str> {
        self.slots
            .iter()
            .find(|s| s.point == Some(point))
            .map(|s| s.field.as_str())
    }

    pub fn field_for_bean(&self, bean: BeanId) -> Option<&str> {
        self.slots
            .iter()
            .find(|s| s.point.is_none() && matches!(s.source, SlotSource::Bean(id) if id == bean))
            .map(|s| s.field.as_str())
    }

    /// Slots filled from constructor parameters
    pub fn constructor_targets(&self) -> impl Iterator<Item = (&str, BeanId)> {
        self.slots.iter().filter_map(|s| match s.source {
            SlotSource::Bean(id) => Some((s.field.as_str(), id)),
            SlotSource::Builtin(_) => None,
        })
    }

    fn push_points<'p>(
        &mut self,
        ctx: &GenerationContext<'_>,
        prefix: &str,
        points: impl IntoIterator<Item = &'p InjectionPointInfo>,
    ) -> Result<()> {
        for (i, point) in points.into_iter().enumerate() {
            let source = match ctx.resolutions.target(point)? {
                ResolvedTarget::Bean(id) => SlotSource::Bean(id),
                ResolvedTarget::Builtin(builtin) => SlotSource::Builtin(builtin_provider(ctx, builtin, point)?),
            };
            self.slots.push(ProviderSlot {
                field: format!("{prefix}{i}"),
                point: Some(point.id()),
                source,
            });
        }
        Ok(())
    }

    fn push_bean(&mut self, field: String, bean: BeanId) {
        self.slots.push(ProviderSlot {
            field,
            point: None,
            source: SlotSource::Bean(bean),
        });
    }
}

fn builtin_provider(ctx: &GenerationContext<'_>, builtin: BuiltinBean, point: &InjectionPointInfo) -> Result<Expr> {
    Ok(match builtin {
        BuiltinBean::Instance => {
            let element = point.required_type().arguments().first().cloned().unwrap_or_else(Type::object);
            Expr::new_instance(
                runtime::INSTANCE_PROVIDER,
                [Expr::string(element.to_string()), ctx.literal_array(point.required_qualifiers())?],
            )
        }
        BuiltinBean::Event => {
            let element = point.required_type().arguments().first().cloned().unwrap_or_else(Type::object);
            Expr::new_instance(
                runtime::EVENT_PROVIDER,
                [Expr::string(element.to_string()), ctx.literal_array(point.required_qualifiers())?],
            )
        }
        BuiltinBean::InjectionPoint => Expr::new_instance(runtime::INJECTION_POINT_PROVIDER, []),
        BuiltinBean::BeanManager => Expr::new_instance(runtime::BEAN_MANAGER_PROVIDER, []),
    })
}

/// Provider fields of a bean provider class: injection points, disposer
/// parameters, the declaring bean and the interceptors
pub(crate) fn bean_dependencies(ctx: &GenerationContext<'_>, bean: &BeanInfo) -> Result<Dependencies> {
    let mut dependencies = Dependencies::default();
    dependencies.push_points(ctx, "injectProvider", bean.injection_points())?;
    if let Some(disposer) = bean.disposer() {
        dependencies.push_points(
            ctx,
            "disposerProvider",
            ctx.deployment.disposer(disposer).injection().injection_points(),
        )?;
    }
    if let Some(declaring) = bean.declaring_bean() {
        dependencies.push_bean("declaringProvider".to_string(), declaring);
    }
    for (i, interceptor) in ctx.interception.interceptors_of(bean.id()).into_iter().enumerate() {
        dependencies.push_bean(format!("interceptorProvider{i}"), interceptor);
    }
    Ok(dependencies)
}

/// Provider fields of an observer notifier: the declaring bean, then the
/// injected parameters
pub(crate) fn observer_dependencies(ctx: &GenerationContext<'_>, observer: &ObserverInfo) -> Result<Dependencies> {
    let mut dependencies = Dependencies::default();
    dependencies.push_bean("declaringProvider".to_string(), observer.declaring_bean());
    dependencies.push_points(ctx, "injectProvider", observer.injection().injection_points())?;
    Ok(dependencies)
}

/// `this.<field>.get(ctx)` with a child creational context
pub(crate) fn reference(field: &str, ctx: Expr) -> Expr {
    Expr::this_field(field).invoke(
        "get",
        [Expr::invoke_static(runtime::CREATIONAL_CONTEXT_IMPL, "child", [ctx])],
    )
}

/// Provider fields and constructor of a class with the given dependencies
pub(crate) fn provider_fields(dependencies: &Dependencies) -> (Vec<FieldShape>, MethodShape) {
    let mut fields = Vec::new();
    let mut constructor = MethodShape::constructor();
    for slot in dependencies.slots() {
        fields.push(FieldShape::new(slot.field.clone(), runtime::INJECTABLE_REFERENCE_PROVIDER));
        constructor = match &slot.source {
            SlotSource::Bean(_) => constructor
                .param(slot.field.clone(), runtime::INJECTABLE_REFERENCE_PROVIDER)
                .stmt(Stmt::assign(Expr::this_field(slot.field.clone()), Expr::local(slot.field.clone()))),
            SlotSource::Builtin(create) => {
                constructor.stmt(Stmt::assign(Expr::this_field(slot.field.clone()), create.clone()))
            }
        };
    }
    (fields, constructor)
}

// =============================================================================
// Orchestration
// =============================================================================

/// Generate every resource of the deployment
pub fn generate(ctx: &GenerationContext<'_>, deployment_name: &str) -> Result<Vec<Resource>> {
    let start = Instant::now();
    let deployment = ctx.deployment;
    let mut resources = Vec::new();

    for bean in deployment.active_beans().filter(|b| b.is_interceptor()) {
        resources.push(interceptor::generate(ctx, bean)?);
    }
    for bean in deployment.active_beans().filter(|b| !b.is_interceptor()) {
        resources.push(self::bean::generate(ctx, bean)?);
        if bean.scope().is_normal() {
            resources.push(client_proxy::generate(ctx, bean)?);
        }
        if ctx.interception.requires_subclass(bean.id()) {
            resources.push(subclass::generate(ctx, bean)?);
        }
    }
    for observer in deployment.observers() {
        if deployment.is_removed(observer.declaring_bean()) {
            continue;
        }
        resources.push(observer::generate(ctx, observer)?);
    }

    ctx.private_members.log();

    resources.extend(components::generate(ctx, deployment_name)?);
    if ctx.literals.has_literals_to_generate() {
        resources.extend(literals::generate_literal_classes(ctx.literals, ctx.emitter)?);
    }

    #[cfg(feature = "logging")]
    debug!(
        target: "bean_processor",
        resources = resources.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Resources generated"
    );
    #[cfg(not(feature = "logging"))]
    let _ = start;
    Ok(resources)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::deployment::tests::deploy;
    use crate::index::ClassInfo;
    use crate::interception;
    use crate::resolver::resolve_injection_points;

    /// Run the whole pipeline over `classes` and return every listing by
    /// resource name
    pub(crate) fn generate_listings(classes: Vec<ClassInfo>) -> Result<Vec<(String, String)>> {
        let deployment = deploy(classes)?;
        let resolutions = resolve_injection_points(&deployment)?;
        let interception = interception::analyze(&deployment)?;
        let linearization = crate::graph::linearize(&deployment, &resolutions, &interception)?;
        let literals = AnnotationLiteralCache::new(true);
        let private_members = PrivateMembersCollector::new();
        let application = |_: &DotName| true;
        let ctx = GenerationContext {
            deployment: &deployment,
            resolutions: &resolutions,
            interception: &interception,
            linearization: &linearization,
            literals: &literals,
            private_members: &private_members,
            reflection: &NoopReflection,
            emitter: &RenderingEmitter,
            is_application_class: &application,
        };
        let resources = generate(&ctx, "test")?;
        Ok(resources
            .into_iter()
            .map(|r| (r.name().to_string(), r.text().unwrap_or_default().to_string()))
            .collect())
    }

    pub(crate) fn listing<'l>(listings: &'l [(String, String)], name: &str) -> &'l str {
        listings
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, text)| text.as_str())
            .unwrap_or_else(|| panic!("no resource {name}"))
    }

    #[test]
    fn test_generated_names() {
        assert_eq!(base_name(&DotName::new("a.Outer$Inner")), "Outer_Inner");
        assert_eq!(in_package_of(&DotName::new("Plain"), "Plain_Bean".to_string()), "Plain_Bean");
        assert_eq!(components_provider_name("app"), "org.jboss.protean.arc.setup.app_ComponentsProvider");
    }

    #[test]
    fn test_private_members_collected() {
        let collector = PrivateMembersCollector::new();
        collector.add(true, "a.Foo#secret");
        collector.add(false, "lib.Bar#hidden");
        assert_eq!(collector.descriptions(true), vec!["a.Foo#secret"]);
        assert_eq!(collector.descriptions(false), vec!["lib.Bar#hidden"]);
        collector.log();
    }
}
