//! Bean discovery
//!
//! [`BeanDeployment::build`] scans the index and produces the immutable
//! catalog of one processing run: qualifiers, interceptor bindings,
//! stereotypes, beans (interceptors included), observers and disposers.
//!
//! Bean ids follow discovery order: interceptors first, then class beans in
//! index order, then producer methods, producer fields and finally synthetic
//! beans.

use crate::annotations::AnnotationStore;
use crate::bean::{self, BeanId, BeanInfo};
use crate::error::{DeploymentError, Result};
use crate::extension::BeanConfigurator;
use crate::index::{AnnotationInstance, AnnotationValue, ClassInfo, DotName, FieldInfo, IndexView, MethodInfo, NestingType, Type};
use crate::injection::{InjectionPointId, InjectionPointInfo};
use crate::names;
use crate::observer::{DisposerInfo, ObserverInfo};
use crate::resolver;
use crate::scope::ScopeInfo;
use crate::stereotype::StereotypeInfo;
use crate::types;
use ahash::{AHashMap, AHashSet};
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// An additional annotation that makes a class a bean
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeanDefiningAnnotation {
    annotation: DotName,
    default_scope: Option<ScopeInfo>,
}

impl BeanDefiningAnnotation {
    pub fn new(annotation: impl Into<DotName>) -> Self {
        Self {
            annotation: annotation.into(),
            default_scope: None,
        }
    }

    /// Beans defined by this annotation get `scope` unless they declare one
    pub fn with_default_scope(mut self, scope: ScopeInfo) -> Self {
        self.default_scope = Some(scope);
        self
    }

    pub fn annotation(&self) -> &DotName {
        &self.annotation
    }

    pub fn default_scope(&self) -> Option<ScopeInfo> {
        self.default_scope
    }
}

// =============================================================================
// Discovery state
// =============================================================================

/// Meta-annotation lookups found before beans are discovered
#[derive(Debug, Default)]
pub(crate) struct DiscoveryTables {
    pub(crate) qualifiers: AHashMap<DotName, ClassInfo>,
    pub(crate) interceptor_bindings: AHashMap<DotName, ClassInfo>,
    pub(crate) stereotypes: AHashMap<DotName, StereotypeInfo>,
}

impl DiscoveryTables {
    pub(crate) fn scan(
        index: &dyn IndexView,
        store: &AnnotationStore,
        additional: &[BeanDefiningAnnotation],
    ) -> Result<Self> {
        let mut tables = Self::default();
        for class in index.known_classes() {
            if !class.is_annotation() {
                continue;
            }
            if store.class_has(class, &names::QUALIFIER) {
                tables.qualifiers.insert(class.name().clone(), class.clone());
            }
            if store.class_has(class, &names::INTERCEPTOR_BINDING) {
                tables.interceptor_bindings.insert(class.name().clone(), class.clone());
            }
        }
        for class in index.known_classes() {
            if class.is_annotation() && store.class_has(class, &names::STEREOTYPE) {
                let stereotype = StereotypeInfo::from_class(class, store, &tables.interceptor_bindings)?;
                tables.stereotypes.insert(class.name().clone(), stereotype);
            }
        }
        for annotation in additional {
            if annotation.default_scope.is_some() {
                tables.stereotypes.insert(
                    annotation.annotation.clone(),
                    StereotypeInfo::with_scope(annotation.annotation.clone(), annotation.default_scope),
                );
            }
        }
        Ok(tables)
    }
}

/// Shared state while beans are being created
pub(crate) struct Discovery<'a> {
    pub(crate) index: &'a dyn IndexView,
    pub(crate) store: &'a AnnotationStore,
    pub(crate) tables: &'a DiscoveryTables,
    next_injection_point: usize,
}

impl<'a> Discovery<'a> {
    pub(crate) fn new(index: &'a dyn IndexView, store: &'a AnnotationStore, tables: &'a DiscoveryTables) -> Self {
        Self {
            index,
            store,
            tables,
            next_injection_point: 0,
        }
    }

    pub(crate) fn next_injection_point_id(&mut self) -> InjectionPointId {
        let id = InjectionPointId(self.next_injection_point);
        self.next_injection_point += 1;
        id
    }

    pub(crate) fn is_qualifier(&self, name: &DotName) -> bool {
        self.tables.qualifiers.contains_key(name)
    }

    pub(crate) fn qualifiers_of(&self, annotations: &[AnnotationInstance]) -> Vec<AnnotationInstance> {
        annotations
            .iter()
            .filter(|a| self.is_qualifier(a.name()))
            .cloned()
            .collect()
    }

    pub(crate) fn bindings_of(&self, annotations: &[AnnotationInstance]) -> Vec<AnnotationInstance> {
        annotations
            .iter()
            .filter(|a| self.tables.interceptor_bindings.contains_key(a.name()))
            .cloned()
            .collect()
    }
}

// =============================================================================
// Deployment
// =============================================================================

/// `@Default`, `@Any` and `@Named` as annotation classes, for indexes
/// that lack them
pub(crate) fn builtin_annotation_classes() -> Vec<ClassInfo> {
    let qualifier = |name: &DotName| {
        ClassInfo::builder(name.clone())
            .annotation_type()
            .annotation(AnnotationInstance::marker(names::QUALIFIER.clone()))
    };
    vec![
        qualifier(&names::DEFAULT).build(),
        qualifier(&names::ANY).build(),
        qualifier(&names::NAMED)
            .method(MethodInfo::member("value", Type::class("java.lang.String")).default_value(""))
            .build(),
    ]
}

/// Catalog of one processing run
pub struct BeanDeployment {
    index: Arc<dyn IndexView>,
    store: Arc<AnnotationStore>,
    tables: DiscoveryTables,
    beans: Vec<BeanInfo>,
    observers: Vec<ObserverInfo>,
    disposers: Vec<DisposerInfo>,
    removed: AHashSet<BeanId>,
}

/// Members of candidate classes, classified during the scan
#[derive(Default)]
struct Candidates<'i> {
    interceptors: Vec<&'i ClassInfo>,
    bean_classes: Vec<&'i ClassInfo>,
    producer_methods: Vec<&'i MethodInfo>,
    producer_fields: Vec<&'i FieldInfo>,
    disposers: Vec<(&'i MethodInfo, usize)>,
    observers: Vec<(&'i MethodInfo, usize)>,
}

impl BeanDeployment {
    /// Discover every bean of the index
    pub fn build(
        index: Arc<dyn IndexView>,
        store: Arc<AnnotationStore>,
        additional: &[BeanDefiningAnnotation],
        synthetic: Vec<BeanConfigurator>,
    ) -> Result<Self> {
        let start = Instant::now();
        let tables = DiscoveryTables::scan(index.as_ref(), &store, additional)?;

        let bean_defining: AHashSet<DotName> = ScopeInfo::ALL
            .iter()
            .map(|s| s.dot_name())
            .chain(additional.iter().map(|a| a.annotation.clone()))
            .chain(tables.stereotypes.keys().cloned())
            .collect();

        let (beans, observers, disposers) = {
            let mut discovery = Discovery::new(index.as_ref(), &store, &tables);
            let candidates = scan_classes(&discovery, &bean_defining)?;
            create_beans(&mut discovery, candidates, synthetic)?
        };

        let deployment = Self {
            index,
            store,
            tables,
            beans,
            observers,
            disposers,
            removed: AHashSet::new(),
        };
        deployment.validate_names()?;

        #[cfg(feature = "logging")]
        debug!(
            target: "bean_processor",
            beans = deployment.beans.len(),
            observers = deployment.observers.len(),
            qualifiers = deployment.tables.qualifiers.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Bean deployment created"
        );
        #[cfg(not(feature = "logging"))]
        let _ = start;
        Ok(deployment)
    }

    /// Two beans with the same name are an error unless alternatives decide
    fn validate_names(&self) -> Result<()> {
        let mut by_name: AHashMap<&str, Vec<&BeanInfo>> = AHashMap::new();
        let mut order: Vec<&str> = Vec::new();
        for bean in &self.beans {
            if let Some(name) = bean.name() {
                let entry = by_name.entry(name).or_default();
                if entry.is_empty() {
                    order.push(name);
                }
                entry.push(bean);
            }
        }
        let mut errors = Vec::new();
        for name in order {
            let Some(beans) = by_name.get(name) else {
                continue;
            };
            if beans.len() > 1 && resolver::resolve_ambiguity(self, beans).is_none() {
                errors.push(DeploymentError::AmbiguousName {
                    name: name.to_string(),
                    beans: beans.iter().map(ToString::to_string).collect(),
                });
            }
        }
        DeploymentError::aggregate(errors).map_or(Ok(()), Err)
    }

    pub fn index(&self) -> &dyn IndexView {
        self.index.as_ref()
    }

    pub fn annotation_store(&self) -> &AnnotationStore {
        &self.store
    }

    /// Every bean ever discovered; a bean's id is its position
    pub fn beans(&self) -> &[BeanInfo] {
        &self.beans
    }

    pub fn bean(&self, id: BeanId) -> &BeanInfo {
        &self.beans[id.0]
    }

    /// Beans still part of the deployment
    pub fn active_beans(&self) -> impl Iterator<Item = &BeanInfo> {
        self.beans.iter().filter(|b| !self.removed.contains(&b.id()))
    }

    /// Interceptor beans, in discovery order
    pub fn interceptors(&self) -> impl Iterator<Item = &BeanInfo> {
        self.beans.iter().filter(|b| b.is_interceptor())
    }

    pub fn observers(&self) -> &[ObserverInfo] {
        &self.observers
    }

    pub fn disposers(&self) -> &[DisposerInfo] {
        &self.disposers
    }

    pub fn disposer(&self, index: usize) -> &DisposerInfo {
        &self.disposers[index]
    }

    /// Every injection point: beans, disposers and observers
    pub fn injection_points(&self) -> impl Iterator<Item = &InjectionPointInfo> {
        self.beans
            .iter()
            .flat_map(|b| b.injection_points())
            .chain(self.disposers.iter().flat_map(|d| d.injection().injection_points()))
            .chain(self.observers.iter().flat_map(|o| o.injection().injection_points()))
    }

    pub fn qualifier(&self, name: &DotName) -> Option<&ClassInfo> {
        self.tables.qualifiers.get(name)
    }

    pub fn qualifier_names(&self) -> Vec<DotName> {
        let mut names: Vec<DotName> = self.tables.qualifiers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn interceptor_binding(&self, name: &DotName) -> Option<&ClassInfo> {
        self.tables.interceptor_bindings.get(name)
    }

    pub fn interceptor_binding_names(&self) -> Vec<DotName> {
        let mut names: Vec<DotName> = self.tables.interceptor_bindings.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn stereotype(&self, name: &DotName) -> Option<&StereotypeInfo> {
        self.tables.stereotypes.get(name)
    }

    /// Interceptor bindings among `annotations`
    pub fn bindings_of(&self, annotations: &[AnnotationInstance]) -> Vec<AnnotationInstance> {
        annotations
            .iter()
            .filter(|a| self.tables.interceptor_bindings.contains_key(a.name()))
            .cloned()
            .collect()
    }

    /// Binding member values compared by qualifier and binding matching:
    /// explicit values plus defaults, minus `@Nonbinding` members
    pub fn binding_values(&self, annotation: &AnnotationInstance) -> Vec<(String, AnnotationValue)> {
        let declaration = self
            .tables
            .qualifiers
            .get(annotation.name())
            .or_else(|| self.tables.interceptor_bindings.get(annotation.name()));
        match declaration {
            Some(class) => class
                .methods()
                .iter()
                .filter(|m| !m.is_constructor() && !m.has_annotation(&names::NONBINDING))
                .filter_map(|m| {
                    annotation
                        .member(m.name())
                        .or(m.member_default())
                        .map(|v| (m.name().to_string(), v.clone()))
                })
                .collect(),
            None => annotation.values().to_vec(),
        }
    }

    /// True if `candidate` equals `required` on every binding member
    pub fn annotation_matches(&self, required: &AnnotationInstance, candidate: &AnnotationInstance) -> bool {
        required.name() == candidate.name() && self.binding_values(required) == self.binding_values(candidate)
    }

    pub(crate) fn mark_removed(&mut self, ids: impl IntoIterator<Item = BeanId>) {
        self.removed.extend(ids);
    }

    pub fn is_removed(&self, id: BeanId) -> bool {
        self.removed.contains(&id)
    }

    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }
}

impl std::fmt::Debug for BeanDeployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanDeployment")
            .field("beans", &self.beans.len())
            .field("observers", &self.observers.len())
            .field("disposers", &self.disposers.len())
            .field("removed", &self.removed.len())
            .finish()
    }
}

// =============================================================================
// Scanning
// =============================================================================

/// A class can be instantiated by the container if it has a no-args
/// constructor, an `@Inject` constructor or exactly one constructor
fn has_usable_constructor(store: &AnnotationStore, class: &ClassInfo) -> bool {
    if class.has_no_args_constructor() {
        return true;
    }
    let mut with_inject = 0;
    let mut without_inject = 0;
    for constructor in class.constructors() {
        if store.method_has(constructor, &names::INJECT) {
            with_inject += 1;
        } else {
            without_inject += 1;
        }
    }
    with_inject > 0 || without_inject == 1
}

fn is_skipped(store: &AnnotationStore, class: &ClassInfo) -> bool {
    if class.is_interface() || class.is_annotation() || class.is_enum() || class.is_abstract() {
        return true;
    }
    match class.nesting() {
        NestingType::Anonymous | NestingType::Local => return true,
        NestingType::Inner if !class.flags().is_static() => return true,
        _ => {}
    }
    !has_usable_constructor(store, class) || store.class_has(class, &names::VETOED)
}

fn scan_classes<'i>(discovery: &Discovery<'i>, bean_defining: &AHashSet<DotName>) -> Result<Candidates<'i>> {
    let store = discovery.store;
    let mut candidates = Candidates::default();

    for class in discovery.index.known_classes() {
        if is_skipped(store, class) {
            #[cfg(feature = "logging")]
            trace!(target: "bean_processor", class = %class.name(), "Skipping class");
            continue;
        }
        if store.class_has(class, &names::INTERCEPTOR) {
            candidates.interceptors.push(class);
            continue;
        }

        let annotations = store.class_annotations(class);
        let mut is_bean = annotations.iter().any(|a| bean_defining.contains(a.name()));

        for method in class.methods() {
            if store.method_has(method, &names::PRODUCES) {
                candidates.producer_methods.push(method);
                is_bean = true;
            } else if let Some(position) = annotated_parameter(method, &names::DISPOSES) {
                candidates.disposers.push((method, position));
            } else if let Some(position) = annotated_parameter(method, &names::OBSERVES)
                .or_else(|| annotated_parameter(method, &names::OBSERVES_ASYNC))
            {
                candidates.observers.push((method, position));
                is_bean = true;
            }
        }
        for field in class.fields() {
            if store.field_has(field, &names::PRODUCES) {
                candidates.producer_fields.push(field);
                is_bean = true;
            }
        }
        if is_bean {
            candidates.bean_classes.push(class);
        }
    }
    Ok(candidates)
}

fn annotated_parameter(method: &MethodInfo, annotation: &DotName) -> Option<usize> {
    method.parameters().iter().position(|p| p.has_annotation(annotation))
}

type Catalog = (Vec<BeanInfo>, Vec<ObserverInfo>, Vec<DisposerInfo>);

fn create_beans(
    discovery: &mut Discovery<'_>,
    candidates: Candidates<'_>,
    synthetic: Vec<BeanConfigurator>,
) -> Result<Catalog> {
    let mut beans: Vec<BeanInfo> = Vec::new();
    let mut by_class: AHashMap<DotName, BeanId> = AHashMap::new();

    for class in &candidates.interceptors {
        let id = BeanId(beans.len());
        beans.push(bean::create_interceptor(discovery, id, class)?);
    }
    for class in &candidates.bean_classes {
        let id = BeanId(beans.len());
        beans.push(bean::create_class_bean(discovery, id, class)?);
        by_class.insert(class.name().clone(), id);
    }

    let mut disposers = Vec::new();
    for (method, position) in &candidates.disposers {
        if let Some(&declaring) = by_class.get(method.declaring_class()) {
            disposers.push(DisposerInfo::create(discovery, declaring, method, *position)?);
        }
    }

    for method in &candidates.producer_methods {
        let Some(&declaring) = by_class.get(method.declaring_class()) else {
            continue;
        };
        let id = BeanId(beans.len());
        let declaring_bean = &beans[declaring.0];
        let annotations = discovery.store.method_annotations(method);
        let disposer = find_disposer(
            discovery,
            declaring,
            method.return_type(),
            &discovery.qualifiers_of(&annotations),
            &disposers,
            &method.to_string(),
        )?;
        let producer = bean::create_producer_method(discovery, id, method, declaring_bean, disposer)?;
        beans.push(producer);
    }

    for field in &candidates.producer_fields {
        let Some(&declaring) = by_class.get(field.declaring_class()) else {
            continue;
        };
        let id = BeanId(beans.len());
        let declaring_bean = &beans[declaring.0];
        let annotations = discovery.store.field_annotations(field);
        let disposer = find_disposer(
            discovery,
            declaring,
            field.ty(),
            &discovery.qualifiers_of(&annotations),
            &disposers,
            &field.to_string(),
        )?;
        let producer = bean::create_producer_field(discovery, id, field, declaring_bean, disposer)?;
        beans.push(producer);
    }

    let mut observers = Vec::new();
    for (method, position) in &candidates.observers {
        if let Some(&declaring) = by_class.get(method.declaring_class()) {
            observers.push(ObserverInfo::create(discovery, declaring, method, *position)?);
        }
    }

    for configurator in synthetic {
        let id = BeanId(beans.len());
        beans.push(bean::create_synthetic(discovery, id, configurator)?);
    }

    #[cfg(feature = "logging")]
    for bean in &beans {
        trace!(target: "bean_processor", bean = %bean, "Created");
    }
    Ok((beans, observers, disposers))
}

/// The disposer of the declaring bean whose disposed parameter accepts the
/// produced type and whose qualifiers are all present on the producer
fn find_disposer(
    discovery: &Discovery<'_>,
    declaring: BeanId,
    produced: &Type,
    producer_qualifiers: &[AnnotationInstance],
    disposers: &[DisposerInfo],
    subject: &str,
) -> Result<Option<usize>> {
    let mut found = Vec::new();
    for (position, disposer) in disposers.iter().enumerate() {
        if disposer.declaring_bean() != declaring {
            continue;
        }
        let qualifiers_match = disposer.disposed_qualifiers().iter().all(|required| {
            if required.name() == &*names::DEFAULT {
                producer_qualifiers.iter().all(|q| q.name() == &*names::NAMED)
            } else {
                producer_qualifiers.iter().any(|q| q == required)
            }
        });
        if qualifiers_match && types::matches(discovery.index, disposer.disposed_type(), produced) {
            found.push(position);
        }
    }
    match found.len() {
        0 => Ok(None),
        1 => Ok(Some(found[0])),
        _ => Err(DeploymentError::MultipleDisposers {
            producer: subject.to_string(),
        }),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::index::{Index, MethodParameter, Modifiers};
    use crate::resolver::{ResolvedTarget, resolve_injection_points};

    pub(crate) fn marker(name: &DotName) -> AnnotationInstance {
        AnnotationInstance::marker(name.clone())
    }

    pub(crate) fn deploy(classes: Vec<ClassInfo>) -> Result<BeanDeployment> {
        let index = Index::builder()
            .classes(builtin_annotation_classes())
            .classes(classes)
            .build();
        BeanDeployment::build(Arc::new(index), Arc::new(AnnotationStore::plain()), &[], Vec::new())
    }

    #[test]
    fn test_skip_rules() {
        let deployment = deploy(vec![
            ClassInfo::builder("a.Iface").interface().annotation(marker(&names::SINGLETON)).build(),
            ClassInfo::builder("a.Inner")
                .nesting(NestingType::Inner)
                .no_args_constructor()
                .annotation(marker(&names::SINGLETON))
                .build(),
            ClassInfo::builder("a.StaticInner")
                .nesting(NestingType::Inner)
                .modifiers(Modifiers::PUBLIC | Modifiers::STATIC)
                .no_args_constructor()
                .annotation(marker(&names::SINGLETON))
                .build(),
            ClassInfo::builder("a.Vetoed")
                .no_args_constructor()
                .annotation(marker(&names::SINGLETON))
                .annotation(marker(&names::VETOED))
                .build(),
            ClassInfo::builder("a.TwoConstructors")
                .annotation(marker(&names::SINGLETON))
                .method(MethodInfo::constructor().param(Type::class("a.X")))
                .method(MethodInfo::constructor().param(Type::class("a.Y")))
                .build(),
            ClassInfo::builder("a.Plain").no_args_constructor().build(),
        ])
        .unwrap();
        let classes: Vec<&str> = deployment.beans().iter().map(|b| b.bean_class().as_str()).collect();
        assert_eq!(classes, vec!["a.StaticInner"]);
    }

    #[test]
    fn test_abstract_scoped_class_skipped() {
        let deployment = deploy(vec![
            ClassInfo::builder("a.Base")
                .modifiers(Modifiers::PUBLIC | Modifiers::ABSTRACT)
                .no_args_constructor()
                .annotation(marker(&names::APPLICATION_SCOPED))
                .build(),
            ClassInfo::builder("a.Impl")
                .extends(Type::class("a.Base"))
                .no_args_constructor()
                .annotation(marker(&names::APPLICATION_SCOPED))
                .build(),
        ])
        .unwrap();
        let classes: Vec<&str> = deployment.beans().iter().map(|b| b.bean_class().as_str()).collect();
        assert_eq!(classes, vec!["a.Impl"]);
    }

    #[test]
    fn test_bare_named_matches_field_default_name() {
        let deployment = deploy(vec![
            ClassInfo::builder("a.ShoppingCart")
                .no_args_constructor()
                .annotation(marker(&names::SINGLETON))
                .annotation(marker(&names::NAMED))
                .build(),
            ClassInfo::builder("a.Checkout")
                .no_args_constructor()
                .annotation(marker(&names::SINGLETON))
                .field(
                    FieldInfo::new("shoppingCart", Type::class("a.ShoppingCart"))
                        .annotation(marker(&names::INJECT))
                        .annotation(marker(&names::NAMED)),
                )
                .build(),
        ])
        .unwrap();
        let bean = |class: &str| {
            deployment
                .beans()
                .iter()
                .find(|b| b.bean_class().as_str() == class)
                .unwrap()
        };
        let cart = bean("a.ShoppingCart");
        assert_eq!(cart.name(), Some("shoppingCart"));
        let resolutions = resolve_injection_points(&deployment).unwrap();
        let point = bean("a.Checkout").injection_points().next().unwrap();
        assert_eq!(resolutions.get(point.id()), Some(ResolvedTarget::Bean(cart.id())));
    }

    #[test]
    fn test_no_scope_is_dependent_with_default() {
        let deployment = deploy(vec![
            ClassInfo::builder("a.Factory")
                .no_args_constructor()
                .method(MethodInfo::new("produce").returns(Type::class("a.Product")).annotation(marker(&names::PRODUCES)))
                .build(),
        ])
        .unwrap();
        assert_eq!(deployment.beans().len(), 2);
        let factory = &deployment.beans()[0];
        assert!(factory.is_class_bean());
        assert_eq!(factory.scope(), ScopeInfo::Dependent);
        assert!(factory.has_default_qualifier());
        let producer = &deployment.beans()[1];
        assert_eq!(producer.declaring_bean(), Some(factory.id()));
        assert_eq!(producer.types()[0], Type::class("a.Product"));
    }

    #[test]
    fn test_disposer_matching() {
        let product = Type::class("a.Product");
        let disposer = |name: &str| {
            MethodInfo::new(name).parameter(MethodParameter::new(product.clone()).annotation(marker(&names::DISPOSES)))
        };
        let single = deploy(vec![
            ClassInfo::builder("a.Factory")
                .no_args_constructor()
                .annotation(marker(&names::SINGLETON))
                .method(MethodInfo::new("produce").returns(product.clone()).annotation(marker(&names::PRODUCES)))
                .method(disposer("dispose"))
                .build(),
        ])
        .unwrap();
        assert_eq!(single.beans()[1].disposer(), Some(0));

        let multiple = deploy(vec![
            ClassInfo::builder("a.Factory")
                .no_args_constructor()
                .annotation(marker(&names::SINGLETON))
                .method(MethodInfo::new("produce").returns(product.clone()).annotation(marker(&names::PRODUCES)))
                .method(disposer("dispose"))
                .method(disposer("disposeAgain"))
                .build(),
        ]);
        assert!(matches!(multiple, Err(DeploymentError::MultipleDisposers { .. })));
    }

    #[test]
    fn test_observer_discovery() {
        let deployment = deploy(vec![
            ClassInfo::builder("a.Listener")
                .no_args_constructor()
                .method(
                    MethodInfo::new("onEvent")
                        .parameter(
                            MethodParameter::new(Type::class("a.Event"))
                                .annotation(marker(&names::OBSERVES_ASYNC))
                                .annotation(AnnotationInstance::marker(names::PRIORITY.clone()).with_value(10)),
                        )
                        .param(Type::class(names::EVENT_METADATA.clone())),
                )
                .build(),
        ])
        .unwrap();
        assert_eq!(deployment.beans().len(), 1);
        let observer = &deployment.observers()[0];
        assert!(observer.is_async());
        assert_eq!(observer.priority(), 10);
        assert_eq!(observer.metadata_position(), Some(1));
        assert!(observer.injection().injection_points().is_empty());
    }

    #[test]
    fn test_observer_priority_out_of_range() {
        let result = deploy(vec![
            ClassInfo::builder("a.Listener")
                .no_args_constructor()
                .method(
                    MethodInfo::new("onEvent").parameter(
                        MethodParameter::new(Type::class("a.Event"))
                            .annotation(marker(&names::OBSERVES))
                            .annotation(marker(&names::PRIORITY).with_value(i64::from(i32::MIN) - 1)),
                    ),
                )
                .build(),
        ]);
        let err = result.err().unwrap();
        assert!(err.to_string().contains("@Priority value -2147483649 out of range"));
    }

    #[test]
    fn test_ambiguous_names() {
        let named = || AnnotationInstance::marker(names::NAMED.clone()).with_value("same");
        let result = deploy(vec![
            ClassInfo::builder("a.One").no_args_constructor().annotation(marker(&names::SINGLETON)).annotation(named()).build(),
            ClassInfo::builder("a.Two").no_args_constructor().annotation(marker(&names::SINGLETON)).annotation(named()).build(),
        ]);
        assert!(matches!(result, Err(DeploymentError::AmbiguousName { .. })));
    }

    #[test]
    fn test_stereotype_contributes_scope_and_name() {
        let deployment = deploy(vec![
            ClassInfo::builder("a.Model")
                .annotation_type()
                .annotation(marker(&names::STEREOTYPE))
                .annotation(marker(&names::REQUEST_SCOPED))
                .annotation(marker(&names::NAMED))
                .build(),
            ClassInfo::builder("a.ShoppingCart")
                .no_args_constructor()
                .annotation(AnnotationInstance::marker("a.Model"))
                .build(),
        ])
        .unwrap();
        let bean = &deployment.beans()[0];
        assert_eq!(bean.scope(), ScopeInfo::RequestScoped);
        assert_eq!(bean.name(), Some("shoppingCart"));
        assert_eq!(bean.stereotypes(), &[DotName::new("a.Model")]);
    }

    #[test]
    fn test_nonbinding_members_ignored() {
        let deployment = deploy(vec![
            ClassInfo::builder("a.Config")
                .annotation_type()
                .annotation(marker(&names::QUALIFIER))
                .method(MethodInfo::member("key", Type::class("java.lang.String")))
                .method(
                    MethodInfo::member("comment", Type::class("java.lang.String"))
                        .annotation(marker(&names::NONBINDING))
                        .default_value(""),
                )
                .build(),
        ])
        .unwrap();
        let a = AnnotationInstance::marker("a.Config").with("key", "x").with("comment", "first");
        let b = AnnotationInstance::marker("a.Config").with("key", "x").with("comment", "second");
        let c = AnnotationInstance::marker("a.Config").with("key", "y");
        assert!(deployment.annotation_matches(&a, &b));
        assert!(!deployment.annotation_matches(&a, &c));
    }
}
