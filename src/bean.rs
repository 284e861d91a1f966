//! Bean descriptors
//!
//! A [`BeanInfo`] is one injectable component of the deployment. What backs
//! it is described by [`BeanKind`]:
//!
//! | Kind | Backed by | Generated provider |
//! |------|-----------|--------------------|
//! | `Class` | a concrete class | `<Simple>_Bean` |
//! | `ProducerMethod` | a method of a declaring bean | `<Declaring>_ProducerMethod_<name>_<hash>_Bean` |
//! | `ProducerField` | a field of a declaring bean | `<Declaring>_ProducerField_<name>_Bean` |
//! | `Synthetic` | a registered creator | `<Simple>_<hash>_Synthetic_Bean` |
//! | `Interceptor` | an `@Interceptor` class | `<Simple>_Bean` |

use crate::deployment::Discovery;
use crate::error::{DeploymentError, Result};
use crate::extension::BeanConfigurator;
use crate::index::{AnnotationInstance, AnnotationTarget, AnnotationValue, ClassInfo, DotName, FieldInfo, MethodInfo, Type};
use crate::injection::{Injection, InjectionPointInfo};
use crate::interceptor::InterceptorInfo;
use crate::names;
use crate::scope::ScopeInfo;
use crate::stereotype::{StereotypeInfo, stereotype_scope};
use crate::types;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "logging")]
use tracing::trace;

/// Position of a bean in its deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BeanId(pub(crate) usize);

impl BeanId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BeanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bean#{}", self.0)
    }
}

/// Creator and destroyer of a synthetic bean
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticInfo {
    creator: DotName,
    destroyer: Option<DotName>,
    params: BTreeMap<String, AnnotationValue>,
}

impl SyntheticInfo {
    pub fn creator(&self) -> &DotName {
        &self.creator
    }

    pub fn destroyer(&self) -> Option<&DotName> {
        self.destroyer.as_ref()
    }

    pub fn params(&self) -> &BTreeMap<String, AnnotationValue> {
        &self.params
    }
}

/// What backs a bean
#[derive(Debug, Clone)]
pub enum BeanKind {
    Class,
    ProducerMethod {
        declaring: BeanId,
        method: MethodInfo,
        disposer: Option<usize>,
    },
    ProducerField {
        declaring: BeanId,
        field: FieldInfo,
        disposer: Option<usize>,
    },
    Synthetic(SyntheticInfo),
    Interceptor(InterceptorInfo),
}

impl BeanKind {
    /// Upper case label used in descriptions: `PRODUCER_METHOD`
    pub fn label(&self) -> &'static str {
        match self {
            Self::Class => "CLASS",
            Self::ProducerMethod { .. } => "PRODUCER_METHOD",
            Self::ProducerField { .. } => "PRODUCER_FIELD",
            Self::Synthetic(_) => "SYNTHETIC",
            Self::Interceptor(_) => "INTERCEPTOR",
        }
    }
}

/// One injectable component
#[derive(Debug, Clone)]
pub struct BeanInfo {
    id: BeanId,
    kind: BeanKind,
    bean_class: DotName,
    provider_type: Type,
    types: Vec<Type>,
    qualifiers: Vec<AnnotationInstance>,
    scope: ScopeInfo,
    injections: Vec<Injection>,
    alternative_priority: Option<i32>,
    name: Option<String>,
    stereotypes: Vec<DotName>,
    class_bindings: Vec<AnnotationInstance>,
    post_construct: Vec<MethodInfo>,
    pre_destroy: Vec<MethodInfo>,
    identifier: String,
}

impl BeanInfo {
    #[inline]
    pub fn id(&self) -> BeanId {
        self.id
    }

    pub fn kind(&self) -> &BeanKind {
        &self.kind
    }

    /// The class bean class, the declaring class of a producer or the
    /// implementation class of a synthetic bean
    pub fn bean_class(&self) -> &DotName {
        &self.bean_class
    }

    /// Type instances are handed out as
    pub fn provider_type(&self) -> &Type {
        &self.provider_type
    }

    /// Bean type closure, provider type first
    pub fn types(&self) -> &[Type] {
        &self.types
    }

    /// Qualifiers, always including `@Any`
    pub fn qualifiers(&self) -> &[AnnotationInstance] {
        &self.qualifiers
    }

    #[inline]
    pub fn scope(&self) -> ScopeInfo {
        self.scope
    }

    pub fn injections(&self) -> &[Injection] {
        &self.injections
    }

    /// Every injection point of the bean, constructor first
    pub fn injection_points(&self) -> impl Iterator<Item = &InjectionPointInfo> {
        self.injections.iter().flat_map(|i| i.injection_points())
    }

    pub fn constructor_injection(&self) -> Option<&Injection> {
        self.injections.iter().find(|i| i.is_constructor())
    }

    pub fn alternative_priority(&self) -> Option<i32> {
        self.alternative_priority
    }

    /// Alternatives take part in ambiguity resolution
    pub fn is_alternative(&self) -> bool {
        self.alternative_priority.is_some()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn stereotypes(&self) -> &[DotName] {
        &self.stereotypes
    }

    /// Interceptor bindings declared on the bean class and its stereotypes
    pub fn class_bindings(&self) -> &[AnnotationInstance] {
        &self.class_bindings
    }

    /// `@PostConstruct` callbacks, superclass first
    pub fn post_construct_callbacks(&self) -> &[MethodInfo] {
        &self.post_construct
    }

    /// `@PreDestroy` callbacks, superclass first
    pub fn pre_destroy_callbacks(&self) -> &[MethodInfo] {
        &self.pre_destroy
    }

    /// Stable identifier derived from what backs the bean
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn declaring_bean(&self) -> Option<BeanId> {
        match &self.kind {
            BeanKind::ProducerMethod { declaring, .. } | BeanKind::ProducerField { declaring, .. } => {
                Some(*declaring)
            }
            _ => None,
        }
    }

    /// Index of the matched disposer in the deployment
    pub fn disposer(&self) -> Option<usize> {
        match &self.kind {
            BeanKind::ProducerMethod { disposer, .. } | BeanKind::ProducerField { disposer, .. } => *disposer,
            _ => None,
        }
    }

    pub fn is_class_bean(&self) -> bool {
        matches!(self.kind, BeanKind::Class)
    }

    pub fn is_producer_method(&self) -> bool {
        matches!(self.kind, BeanKind::ProducerMethod { .. })
    }

    pub fn is_producer_field(&self) -> bool {
        matches!(self.kind, BeanKind::ProducerField { .. })
    }

    pub fn is_producer(&self) -> bool {
        self.declaring_bean().is_some()
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self.kind, BeanKind::Synthetic(_))
    }

    pub fn is_interceptor(&self) -> bool {
        matches!(self.kind, BeanKind::Interceptor(_))
    }

    pub fn interceptor_info(&self) -> Option<&InterceptorInfo> {
        match &self.kind {
            BeanKind::Interceptor(info) => Some(info),
            _ => None,
        }
    }

    pub fn synthetic_info(&self) -> Option<&SyntheticInfo> {
        match &self.kind {
            BeanKind::Synthetic(info) => Some(info),
            _ => None,
        }
    }

    pub fn has_default_qualifier(&self) -> bool {
        self.qualifiers.iter().any(|q| q.name() == &*names::DEFAULT)
    }
}

impl fmt::Display for BeanInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types: Vec<String> = self.types.iter().map(ToString::to_string).collect();
        let qualifiers: Vec<String> = self.qualifiers.iter().map(ToString::to_string).collect();
        let target = match &self.kind {
            BeanKind::ProducerMethod { method, .. } => method.to_string(),
            BeanKind::ProducerField { field, .. } => field.to_string(),
            _ => self.bean_class.to_string(),
        };
        write!(
            f,
            "{} bean [types=[{}], qualifiers=[{}], target={}]",
            self.kind.label(),
            types.join(", "),
            qualifiers.join(", "),
            target
        )
    }
}

// =============================================================================
// Creation
// =============================================================================

/// Qualifiers, scope, name and alternative status read from annotations
struct Attributes<'t> {
    qualifiers: Vec<AnnotationInstance>,
    scope: Option<ScopeInfo>,
    alternative: bool,
    priority: Option<i32>,
    named: Option<Option<String>>,
    stereotypes: Vec<&'t StereotypeInfo>,
}

impl<'t> Attributes<'t> {
    fn scan(discovery: &Discovery<'t>, annotations: &[AnnotationInstance], subject: &str) -> Result<Self> {
        let mut attributes = Self {
            qualifiers: Vec::new(),
            scope: None,
            alternative: false,
            priority: None,
            named: None,
            stereotypes: Vec::new(),
        };
        for annotation in annotations {
            let name = annotation.name();
            if discovery.is_qualifier(name) {
                if name == &*names::NAMED {
                    attributes.named = Some(
                        annotation
                            .value()
                            .and_then(|v| v.as_str())
                            .filter(|v| !v.is_empty())
                            .map(str::to_string),
                    );
                }
                attributes.qualifiers.push(annotation.clone());
            } else if name == &*names::ALTERNATIVE {
                attributes.alternative = true;
            } else if name == &*names::PRIORITY {
                attributes.priority = priority_value(annotation, subject)?;
            } else if let Some(scope) = ScopeInfo::from_name(name) {
                attributes.scope.get_or_insert(scope);
            } else if let Some(stereotype) = discovery.tables.stereotypes.get(name) {
                attributes.stereotypes.push(stereotype);
            }
        }
        Ok(attributes)
    }

    /// Scope declared directly, else the stereotype scope, else `@Dependent`
    fn resolve_scope(&self, subject: &str) -> Result<ScopeInfo> {
        match self.scope {
            Some(scope) => Ok(scope),
            None => Ok(stereotype_scope(&self.stereotypes, subject)?.unwrap_or_default()),
        }
    }

    fn is_alternative(&self) -> bool {
        self.alternative || self.stereotypes.iter().any(|s| s.is_alternative())
    }

    /// Explicit `@Named` value, else the default name if `@Named` or a named
    /// stereotype is present
    fn name(&self, default_name: impl FnOnce() -> String) -> Option<String> {
        match &self.named {
            Some(Some(explicit)) => Some(explicit.clone()),
            Some(None) => Some(default_name()),
            None if self.stereotypes.iter().any(|s| s.is_named()) => Some(default_name()),
            None => None,
        }
    }

    fn stereotype_names(&self) -> Vec<DotName> {
        self.stereotypes.iter().map(|s| s.name().clone()).collect()
    }
}

/// Add `@Default` when no qualifier other than `@Named` is declared; always
/// add `@Any`. A `@Named` without a value carries the bean name.
fn normalize_qualifiers(mut qualifiers: Vec<AnnotationInstance>, name: Option<&str>) -> Vec<AnnotationInstance> {
    if let Some(name) = name {
        for qualifier in qualifiers.iter_mut().filter(|q| q.name() == &*names::NAMED) {
            let defaulted = qualifier.value().and_then(|v| v.as_str()).is_none_or(str::is_empty);
            if defaulted {
                *qualifier = AnnotationInstance::marker(names::NAMED.clone()).with_value(name);
            }
        }
    }
    let has_default = qualifiers.iter().any(|q| q.name() == &*names::DEFAULT);
    if !has_default && qualifiers.iter().all(|q| q.name() == &*names::NAMED || q.name() == &*names::ANY) {
        qualifiers.push(AnnotationInstance::marker(names::DEFAULT.clone()));
    }
    if !qualifiers.iter().any(|q| q.name() == &*names::ANY) {
        qualifiers.push(AnnotationInstance::marker(names::ANY.clone()));
    }
    qualifiers
}

/// `@Priority` value as an `i32`; a value out of range is a definition error
pub(crate) fn priority_value(annotation: &AnnotationInstance, subject: impl fmt::Display) -> Result<Option<i32>> {
    let Some(value) = annotation.value().and_then(|v| v.as_int()) else {
        return Ok(None);
    };
    i32::try_from(value)
        .map(Some)
        .map_err(|_| DeploymentError::definition(format!("@Priority value {value} out of range on {subject}")))
}

/// Hex encoded, truncated SHA-256 of the input
pub(crate) fn hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..20])
}

/// Decapitalized simple name: `FooBar` -> `fooBar`, `URLHandler` stays
pub(crate) fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(first), Some(second)) if first.is_uppercase() && second.is_uppercase() => name.to_string(),
        (Some(first), _) => first.to_lowercase().chain(name.chars().skip(1)).collect(),
        (None, _) => String::new(),
    }
}

/// Default bean name of a producer method: the property name for getters
pub(crate) fn default_method_name(method: &MethodInfo) -> String {
    let name = method.name();
    for prefix in ["get", "is"] {
        if let Some(property) = name.strip_prefix(prefix) {
            if property.chars().next().is_some_and(char::is_uppercase) {
                return decapitalize(property);
            }
        }
    }
    name.to_string()
}

/// Class interceptor bindings, with stereotype bindings added when their type
/// is not already present
fn class_bindings(discovery: &Discovery<'_>, annotations: &[AnnotationInstance], attributes: &Attributes<'_>) -> Vec<AnnotationInstance> {
    let mut bindings = discovery.bindings_of(annotations);
    for stereotype in &attributes.stereotypes {
        for binding in stereotype.bindings() {
            if !bindings.iter().any(|b| b.name() == binding.name()) {
                bindings.push(binding.clone());
            }
        }
    }
    bindings
}

/// Void, parameterless methods annotated with `annotation`, superclass first
fn lifecycle_callbacks(discovery: &Discovery<'_>, class: &ClassInfo, annotation: &DotName) -> Result<Vec<MethodInfo>> {
    let mut callbacks = Vec::new();
    for current in crate::injection::hierarchy_top_down(discovery, class) {
        for method in current.methods() {
            if !discovery.store.method_has(method, annotation) {
                continue;
            }
            if method.return_type() != &Type::Void || !method.parameters().is_empty() {
                return Err(DeploymentError::definition(format!(
                    "Lifecycle callback @{} must be void and take no parameters: {method}",
                    annotation.simple_name()
                )));
            }
            callbacks.push(method.clone());
        }
    }
    Ok(callbacks)
}

pub(crate) fn create_class_bean(discovery: &mut Discovery<'_>, id: BeanId, class: &ClassInfo) -> Result<BeanInfo> {
    let annotations = discovery.store.class_annotations(class);
    let subject = class.name().to_string();
    let attributes = Attributes::scan(discovery, &annotations, &subject)?;
    let scope = attributes.resolve_scope(&subject)?;
    let name = attributes.name(|| decapitalize(class.name().simple_name()));
    let alternative_priority = if attributes.is_alternative() { attributes.priority } else { None };
    let class_bindings = class_bindings(discovery, &annotations, &attributes);
    let stereotypes = attributes.stereotype_names();
    let qualifiers = normalize_qualifiers(attributes.qualifiers, name.as_deref());
    let post_construct = lifecycle_callbacks(discovery, class, &names::POST_CONSTRUCT)?;
    let pre_destroy = lifecycle_callbacks(discovery, class, &names::PRE_DESTROY)?;
    let injections = Injection::for_class_bean(discovery, class)?;

    let bean = BeanInfo {
        id,
        kind: BeanKind::Class,
        bean_class: class.name().clone(),
        provider_type: class.as_type(),
        types: types::class_closure(discovery.index, class),
        qualifiers,
        scope,
        injections,
        alternative_priority,
        name,
        stereotypes,
        class_bindings,
        post_construct,
        pre_destroy,
        identifier: hash(&format!("CLASS{subject}")),
    };
    #[cfg(feature = "logging")]
    trace!(target: "bean_processor", bean = %bean, "Created class bean");
    Ok(bean)
}

/// Priority of an alternative producer: the declaring bean's priority, or
/// `@Priority` on the declaring class when the declaring bean is not an
/// alternative itself
fn producer_alternative_priority(
    discovery: &Discovery<'_>,
    attributes: &Attributes<'_>,
    declaring: &BeanInfo,
) -> Option<i32> {
    if !attributes.is_alternative() && !declaring.is_alternative() {
        return None;
    }
    declaring.alternative_priority().or_else(|| {
        discovery
            .index
            .class_by_name(declaring.bean_class())
            .and_then(|class| discovery.store.class_annotation(class, &names::PRIORITY))
            .and_then(|a| a.value().and_then(|v| v.as_int()))
            .and_then(|p| i32::try_from(p).ok())
    })
}

fn check_producer_scope(scope: ScopeInfo, produced: &Type, subject: &str) -> Result<()> {
    if scope.is_normal() && matches!(produced, Type::Primitive(_) | Type::Array(_)) {
        return Err(DeploymentError::unproxyable(
            produced,
            format!("normal scoped producer {subject} must declare a proxyable type"),
        ));
    }
    Ok(())
}

pub(crate) fn create_producer_method(
    discovery: &mut Discovery<'_>,
    id: BeanId,
    method: &MethodInfo,
    declaring: &BeanInfo,
    disposer: Option<usize>,
) -> Result<BeanInfo> {
    let subject = method.to_string();
    let annotations = discovery.store.method_annotations(method);
    let attributes = Attributes::scan(discovery, &annotations, &subject)?;
    let scope = attributes.resolve_scope(&subject)?;
    check_producer_scope(scope, method.return_type(), &subject)?;
    let types = types::producer_closure(discovery.index, method.return_type(), &subject)?;
    let name = attributes.name(|| default_method_name(method));
    let alternative_priority = producer_alternative_priority(discovery, &attributes, declaring);
    let stereotypes = attributes.stereotype_names();
    let qualifiers = normalize_qualifiers(attributes.qualifiers, name.as_deref());
    let injections = vec![Injection::for_producer(discovery, method)];

    Ok(BeanInfo {
        id,
        kind: BeanKind::ProducerMethod {
            declaring: declaring.id(),
            method: method.clone(),
            disposer,
        },
        bean_class: declaring.bean_class().clone(),
        provider_type: method.return_type().clone(),
        types,
        qualifiers,
        scope,
        injections,
        alternative_priority,
        name,
        stereotypes,
        class_bindings: Vec::new(),
        post_construct: Vec::new(),
        pre_destroy: Vec::new(),
        identifier: hash(&format!("PRODUCER_METHOD{}{subject}", declaring.identifier())),
    })
}

pub(crate) fn create_producer_field(
    discovery: &mut Discovery<'_>,
    id: BeanId,
    field: &FieldInfo,
    declaring: &BeanInfo,
    disposer: Option<usize>,
) -> Result<BeanInfo> {
    let subject = field.to_string();
    let annotations = discovery.store.field_annotations(field);
    let attributes = Attributes::scan(discovery, &annotations, &subject)?;
    let scope = attributes.resolve_scope(&subject)?;
    check_producer_scope(scope, field.ty(), &subject)?;
    let types = types::producer_closure(discovery.index, field.ty(), &subject)?;
    let name = attributes.name(|| field.name().to_string());
    let alternative_priority = producer_alternative_priority(discovery, &attributes, declaring);
    let stereotypes = attributes.stereotype_names();
    let qualifiers = normalize_qualifiers(attributes.qualifiers, name.as_deref());

    Ok(BeanInfo {
        id,
        kind: BeanKind::ProducerField {
            declaring: declaring.id(),
            field: field.clone(),
            disposer,
        },
        bean_class: declaring.bean_class().clone(),
        provider_type: field.ty().clone(),
        types,
        qualifiers,
        scope,
        injections: Vec::new(),
        alternative_priority,
        name,
        stereotypes,
        class_bindings: Vec::new(),
        post_construct: Vec::new(),
        pre_destroy: Vec::new(),
        identifier: hash(&format!("PRODUCER_FIELD{}{subject}", declaring.identifier())),
    })
}

pub(crate) fn create_synthetic(discovery: &Discovery<'_>, id: BeanId, configurator: BeanConfigurator) -> Result<BeanInfo> {
    configurator.validate()?;
    let BeanConfigurator {
        implementation_class,
        mut types,
        qualifiers,
        scope,
        name,
        alternative_priority,
        creator,
        destroyer,
        params,
    } = configurator;
    let provider_type = Type::Class(implementation_class.clone());
    if !types.contains(&provider_type) {
        types.insert(0, provider_type.clone());
    }
    if !types.iter().any(Type::is_object) {
        types.push(Type::object());
    }
    let unknown: Vec<&AnnotationInstance> = qualifiers
        .iter()
        .filter(|q| !discovery.is_qualifier(q.name()))
        .collect();
    if let Some(first) = unknown.first() {
        return Err(DeploymentError::definition(format!(
            "Synthetic bean {implementation_class} declares {first} which is not a qualifier"
        )));
    }
    let creator = creator.ok_or_else(|| {
        DeploymentError::definition(format!("Synthetic bean {implementation_class} does not declare a creator"))
    })?;
    let qualifiers = normalize_qualifiers(qualifiers, name.as_deref());
    let description: Vec<String> = types.iter().map(ToString::to_string).collect();
    let identifier = hash(&format!("SYNTHETIC{implementation_class}{}{creator}", description.join(",")));

    Ok(BeanInfo {
        id,
        kind: BeanKind::Synthetic(SyntheticInfo {
            creator,
            destroyer,
            params,
        }),
        bean_class: implementation_class,
        provider_type,
        types,
        qualifiers,
        scope,
        injections: Vec::new(),
        alternative_priority,
        name,
        stereotypes: Vec::new(),
        class_bindings: Vec::new(),
        post_construct: Vec::new(),
        pre_destroy: Vec::new(),
        identifier,
    })
}

pub(crate) fn create_interceptor(discovery: &mut Discovery<'_>, id: BeanId, class: &ClassInfo) -> Result<BeanInfo> {
    let info = InterceptorInfo::from_class(discovery, class)?;
    let injections = Injection::for_class_bean(discovery, class)?;
    let subject = class.name().to_string();
    Ok(BeanInfo {
        id,
        kind: BeanKind::Interceptor(info),
        bean_class: class.name().clone(),
        provider_type: class.as_type(),
        types: types::class_closure(discovery.index, class),
        qualifiers: normalize_qualifiers(Vec::new(), None),
        scope: ScopeInfo::Dependent,
        injections,
        alternative_priority: None,
        name: None,
        stereotypes: Vec::new(),
        class_bindings: Vec::new(),
        post_construct: Vec::new(),
        pre_destroy: Vec::new(),
        identifier: hash(&format!("INTERCEPTOR{subject}")),
    })
}

/// Annotation target of the member backing a bean, if any
pub fn backing_target(bean: &BeanInfo) -> Option<AnnotationTarget> {
    match &bean.kind {
        BeanKind::Class | BeanKind::Interceptor(_) => Some(AnnotationTarget::Class(bean.bean_class.clone())),
        BeanKind::ProducerMethod { method, .. } => Some(method.target()),
        BeanKind::ProducerField { field, .. } => Some(field.target()),
        BeanKind::Synthetic(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names() {
        assert_eq!(decapitalize("FooBar"), "fooBar");
        assert_eq!(decapitalize("URLHandler"), "URLHandler");
        assert_eq!(decapitalize(""), "");
        assert_eq!(default_method_name(&MethodInfo::new("getPrice")), "price");
        assert_eq!(default_method_name(&MethodInfo::new("isActive")), "active");
        assert_eq!(default_method_name(&MethodInfo::new("gettysburg")), "gettysburg");
        assert_eq!(default_method_name(&MethodInfo::new("produce")), "produce");
    }

    #[test]
    fn test_normalize_qualifiers() {
        let plain = normalize_qualifiers(Vec::new(), None);
        let names: Vec<&str> = plain.iter().map(|q| q.name().simple_name()).collect();
        assert_eq!(names, vec!["Default", "Any"]);

        let named = normalize_qualifiers(vec![AnnotationInstance::marker(names::NAMED.clone()).with_value("x")], Some("x"));
        assert!(named.iter().any(|q| q.name() == &*names::DEFAULT));

        let custom = normalize_qualifiers(vec![AnnotationInstance::marker("a.Fast")], None);
        assert!(!custom.iter().any(|q| q.name() == &*names::DEFAULT));
        assert!(custom.iter().any(|q| q.name() == &*names::ANY));

        let defaulted = normalize_qualifiers(vec![AnnotationInstance::marker(names::NAMED.clone())], Some("cart"));
        let named = defaulted.iter().find(|q| q.name() == &*names::NAMED).unwrap();
        assert_eq!(named.value().and_then(|v| v.as_str()), Some("cart"));
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(hash("a"), hash("a"));
        assert_ne!(hash("a"), hash("b"));
        assert_eq!(hash("a").len(), 40);
    }
}
