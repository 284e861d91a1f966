//! Injection points and injection sites
//!
//! An [`Injection`] is one place where the container supplies values: a bean
//! constructor, an initializer method, an injected field, the parameters of a
//! producer method, disposer or observer. Each value it supplies is an
//! [`InjectionPointInfo`] with a required type and required qualifiers.
//!
//! Injection points are immutable. What they resolve to is recorded in
//! [`Resolutions`](crate::resolver::Resolutions), keyed by [`InjectionPointId`].

use crate::deployment::Discovery;
use crate::error::{DeploymentError, Result};
use crate::index::{AnnotationInstance, ClassInfo, DotName, FieldInfo, MethodInfo, Type};
use crate::names;
use std::fmt;

/// Stable identity of an injection point within one deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InjectionPointId(pub(crate) usize);

impl InjectionPointId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Where an injection point receives its value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InjectionTarget {
    Field { class: DotName, name: String },
    Parameter { method: String, position: usize },
}

impl fmt::Display for InjectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field { class, name } => write!(f, "{class}#{name}"),
            Self::Parameter { method, position } => write!(f, "{method} (parameter {position})"),
        }
    }
}

/// One required dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionPointInfo {
    id: InjectionPointId,
    required_type: Type,
    required_qualifiers: Vec<AnnotationInstance>,
    target: InjectionTarget,
}

impl InjectionPointInfo {
    #[inline]
    pub fn id(&self) -> InjectionPointId {
        self.id
    }

    #[inline]
    pub fn required_type(&self) -> &Type {
        &self.required_type
    }

    /// Required qualifiers; `@Default` when none was declared
    pub fn required_qualifiers(&self) -> &[AnnotationInstance] {
        &self.required_qualifiers
    }

    pub fn target(&self) -> &InjectionTarget {
        &self.target
    }

    /// Position in the parameter list, `None` for fields
    pub fn position(&self) -> Option<usize> {
        match self.target {
            InjectionTarget::Parameter { position, .. } => Some(position),
            InjectionTarget::Field { .. } => None,
        }
    }

    pub fn has_default_qualifier(&self) -> bool {
        self.required_qualifiers.len() == 1 && self.required_qualifiers[0].name() == &*names::DEFAULT
    }

    /// Qualifiers rendered for error messages: `[@Default]`
    pub fn qualifiers_display(&self) -> String {
        let rendered: Vec<String> = self.required_qualifiers.iter().map(ToString::to_string).collect();
        format!("[{}]", rendered.join(", "))
    }
}

impl fmt::Display for InjectionPointInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.required_type, self.target)
    }
}

/// Kind of an injection site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InjectionKind {
    Constructor,
    Initializer,
    Field,
    ProducerMethod,
    Disposer,
    Observer,
}

/// The member an injection belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionMember {
    Method(MethodInfo),
    Field(FieldInfo),
}

/// One injection site with its injection points
#[derive(Debug, Clone)]
pub struct Injection {
    kind: InjectionKind,
    member: InjectionMember,
    injection_points: Vec<InjectionPointInfo>,
}

impl Injection {
    #[inline]
    pub fn kind(&self) -> InjectionKind {
        self.kind
    }

    pub fn member(&self) -> &InjectionMember {
        &self.member
    }

    pub fn method(&self) -> Option<&MethodInfo> {
        match &self.member {
            InjectionMember::Method(method) => Some(method),
            InjectionMember::Field(_) => None,
        }
    }

    pub fn field(&self) -> Option<&FieldInfo> {
        match &self.member {
            InjectionMember::Field(field) => Some(field),
            InjectionMember::Method(_) => None,
        }
    }

    pub fn injection_points(&self) -> &[InjectionPointInfo] {
        &self.injection_points
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == InjectionKind::Constructor
    }

    /// Injections of a class bean or interceptor: the bean constructor first,
    /// then fields and initializers from the top of the hierarchy down
    pub(crate) fn for_class_bean(discovery: &mut Discovery<'_>, class: &ClassInfo) -> Result<Vec<Injection>> {
        let mut injections = Vec::new();

        if let Some(constructor) = bean_constructor(discovery, class)? {
            let points = parameter_points(discovery, &constructor, None);
            injections.push(Injection {
                kind: InjectionKind::Constructor,
                member: InjectionMember::Method(constructor),
                injection_points: points,
            });
        }

        for current in hierarchy_top_down(discovery, class) {
            for field in current.fields() {
                if field.flags().is_static() || !discovery.store.field_has(field, &names::INJECT) {
                    continue;
                }
                if field.flags().is_final() {
                    return Err(DeploymentError::definition(format!(
                        "Injected field must not be final: {field}"
                    )));
                }
                let point = field_point(discovery, field);
                injections.push(Injection {
                    kind: InjectionKind::Field,
                    member: InjectionMember::Field(field.clone()),
                    injection_points: vec![point],
                });
            }
            for method in current.methods() {
                if method.is_constructor()
                    || method.flags().is_static()
                    || !discovery.store.method_has(method, &names::INJECT)
                {
                    continue;
                }
                let points = parameter_points(discovery, method, None);
                injections.push(Injection {
                    kind: InjectionKind::Initializer,
                    member: InjectionMember::Method(method.clone()),
                    injection_points: points,
                });
            }
        }
        Ok(injections)
    }

    /// Parameters of a producer method
    pub(crate) fn for_producer(discovery: &mut Discovery<'_>, method: &MethodInfo) -> Injection {
        Injection {
            kind: InjectionKind::ProducerMethod,
            member: InjectionMember::Method(method.clone()),
            injection_points: parameter_points(discovery, method, None),
        }
    }

    /// Parameters of a disposer method except the disposed one
    pub(crate) fn for_disposer(discovery: &mut Discovery<'_>, method: &MethodInfo, disposed: usize) -> Injection {
        Injection {
            kind: InjectionKind::Disposer,
            member: InjectionMember::Method(method.clone()),
            injection_points: parameter_points(discovery, method, Some(&[disposed])),
        }
    }

    /// Parameters of an observer method except the event and its metadata
    pub(crate) fn for_observer(discovery: &mut Discovery<'_>, method: &MethodInfo, skipped: &[usize]) -> Injection {
        Injection {
            kind: InjectionKind::Observer,
            member: InjectionMember::Method(method.clone()),
            injection_points: parameter_points(discovery, method, Some(skipped)),
        }
    }
}

/// Constructor used to instantiate a class bean, if it takes parameters or
/// is explicitly annotated `@Inject`
fn bean_constructor(discovery: &Discovery<'_>, class: &ClassInfo) -> Result<Option<MethodInfo>> {
    let constructors: Vec<&MethodInfo> = class.constructors().collect();
    let injected: Vec<&MethodInfo> = constructors
        .iter()
        .copied()
        .filter(|c| discovery.store.method_has(c, &names::INJECT))
        .collect();
    match injected.len() {
        0 => {}
        1 => return Ok(Some(injected[0].clone())),
        _ => {
            return Err(DeploymentError::definition(format!(
                "Multiple @Inject constructors found on {}",
                class.name()
            )));
        }
    }
    if !class.has_no_args_constructor() && constructors.len() == 1 {
        return Ok(Some(constructors[0].clone()));
    }
    Ok(None)
}

/// The class and its indexed superclasses, `java.lang.Object` excluded,
/// outermost superclass first
pub(crate) fn hierarchy_top_down<'i>(discovery: &Discovery<'i>, class: &'i ClassInfo) -> Vec<&'i ClassInfo> {
    let mut chain = vec![class];
    let mut current = class;
    while let Some(super_name) = current.super_name() {
        if names::is_object(super_name) {
            break;
        }
        match discovery.index.class_by_name(super_name) {
            Some(super_class) => {
                chain.push(super_class);
                current = super_class;
            }
            None => break,
        }
    }
    chain.reverse();
    chain
}

fn parameter_points(discovery: &mut Discovery<'_>, method: &MethodInfo, skipped: Option<&[usize]>) -> Vec<InjectionPointInfo> {
    let mut points = Vec::with_capacity(method.parameters().len());
    for (position, parameter) in method.parameters().iter().enumerate() {
        if skipped.is_some_and(|skipped| skipped.contains(&position)) {
            continue;
        }
        let qualifiers = discovery.qualifiers_of(parameter.annotations());
        points.push(InjectionPointInfo {
            id: discovery.next_injection_point_id(),
            required_type: parameter.ty().clone(),
            required_qualifiers: default_if_empty(qualifiers),
            target: InjectionTarget::Parameter {
                method: method.to_string(),
                position,
            },
        });
    }
    points
}

fn field_point(discovery: &mut Discovery<'_>, field: &FieldInfo) -> InjectionPointInfo {
    let annotations = discovery.store.field_annotations(field);
    let qualifiers = discovery
        .qualifiers_of(&annotations)
        .into_iter()
        .map(|q| {
            if q.name() == &*names::NAMED && q.value().is_none() {
                // @Named without a value on a field defaults to the field name
                q.with_value(field.name())
            } else {
                q
            }
        })
        .collect();
    InjectionPointInfo {
        id: discovery.next_injection_point_id(),
        required_type: field.ty().clone(),
        required_qualifiers: default_if_empty(qualifiers),
        target: InjectionTarget::Field {
            class: field.declaring_class().clone(),
            name: field.name().to_string(),
        },
    }
}

fn default_if_empty(qualifiers: Vec<AnnotationInstance>) -> Vec<AnnotationInstance> {
    if qualifiers.is_empty() {
        vec![AnnotationInstance::marker(names::DEFAULT.clone())]
    } else {
        qualifiers
    }
}

#[cfg(test)]
pub(crate) fn test_point(id: usize, required_type: Type, qualifiers: Vec<AnnotationInstance>) -> InjectionPointInfo {
    InjectionPointInfo {
        id: InjectionPointId(id),
        required_type,
        required_qualifiers: default_if_empty(qualifiers),
        target: InjectionTarget::Field {
            class: DotName::new("test.Target"),
            name: format!("field{id}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::AnnotationStore;
    use crate::deployment::DiscoveryTables;
    use crate::index::{Index, IndexView, MethodParameter, Modifiers};

    fn index() -> Index {
        Index::builder()
            .class(
                ClassInfo::builder("a.Base")
                    .no_args_constructor()
                    .field(
                        FieldInfo::new("base", Type::class("a.Dep"))
                            .annotation(AnnotationInstance::marker(names::INJECT.clone())),
                    )
                    .build(),
            )
            .class(
                ClassInfo::builder("a.Bean")
                    .extends(Type::class("a.Base"))
                    .method(
                        MethodInfo::constructor()
                            .annotation(AnnotationInstance::marker(names::INJECT.clone()))
                            .param(Type::class("a.Dep")),
                    )
                    .field(
                        FieldInfo::new("own", Type::class("a.Dep"))
                            .annotation(AnnotationInstance::marker(names::INJECT.clone()))
                            .annotation(AnnotationInstance::marker(names::NAMED.clone())),
                    )
                    .field(
                        FieldInfo::new("constant", Type::class("a.Dep"))
                            .modifiers(Modifiers::STATIC)
                            .annotation(AnnotationInstance::marker(names::INJECT.clone())),
                    )
                    .method(
                        MethodInfo::new("init")
                            .annotation(AnnotationInstance::marker(names::INJECT.clone()))
                            .parameter(MethodParameter::new(Type::class("a.Dep"))),
                    )
                    .build(),
            )
            .class(
                ClassInfo::builder(names::NAMED.clone())
                    .annotation_type()
                    .annotation(AnnotationInstance::marker(names::QUALIFIER.clone()))
                    .build(),
            )
            .build()
    }

    #[test]
    fn test_class_bean_injection_order() {
        let index = index();
        let store = AnnotationStore::plain();
        let tables = DiscoveryTables::scan(&index, &store, &[]).unwrap();
        let mut discovery = Discovery::new(&index, &store, &tables);
        let class = index.class_by_name(&"a.Bean".into()).unwrap();
        let injections = Injection::for_class_bean(&mut discovery, class).unwrap();

        let kinds: Vec<InjectionKind> = injections.iter().map(Injection::kind).collect();
        assert_eq!(
            kinds,
            vec![
                InjectionKind::Constructor,
                InjectionKind::Field,
                InjectionKind::Field,
                InjectionKind::Initializer
            ]
        );
        assert_eq!(injections[1].field().unwrap().name(), "base");

        let own = &injections[2].injection_points()[0];
        assert_eq!(own.required_qualifiers()[0].value().and_then(|v| v.as_str()), Some("own"));

        let ids: Vec<usize> = injections
            .iter()
            .flat_map(|i| i.injection_points())
            .map(|p| p.id().index())
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_default_qualifier_added() {
        let point = test_point(0, Type::class("a.A"), Vec::new());
        assert!(point.has_default_qualifier());
        assert_eq!(point.qualifiers_display(), "[@Default]");
    }
}
