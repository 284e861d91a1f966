//! Bean type closures and typesafe assignability
//!
//! The closure of a bean is every type it can be injected as: the provider
//! type, all superclasses and implemented interfaces with type variables
//! substituted along the way, and `java.lang.Object`.
//!
//! Matching a required type against a bean type follows the usual rules for
//! typesafe resolution: identical raw types, then per-argument matching where
//! wildcards and type variables are checked against their bounds and actual
//! types are invariant.

use crate::error::{DeploymentError, Result};
use crate::index::{ClassInfo, DotName, IndexView, Type};
use ahash::AHashMap;

/// Type closure of a class bean, provider type first
pub fn class_closure(index: &dyn IndexView, class: &ClassInfo) -> Vec<Type> {
    let mut closure = Vec::new();
    collect(index, class, class.as_type(), &mut closure);
    ensure_object(&mut closure);
    closure
}

/// Type closure of a producer given its declared type
pub fn producer_closure(index: &dyn IndexView, produced: &Type, producer: &str) -> Result<Vec<Type>> {
    let mut closure = Vec::new();
    match produced {
        Type::TypeVariable { .. } | Type::Wildcard { .. } => {
            return Err(DeploymentError::definition(format!(
                "Producer {producer} declares a type variable or wildcard as its type: {produced}"
            )));
        }
        Type::Void => {
            return Err(DeploymentError::definition(format!(
                "Producer method {producer} must not return void"
            )));
        }
        Type::Class(_) | Type::Parameterized { .. } => {
            match produced.raw_name().and_then(|name| index.class_by_name(name)) {
                Some(class) => collect(index, class, produced.clone(), &mut closure),
                None => closure.push(produced.clone()),
            }
        }
        Type::Primitive(_) | Type::Array(_) => closure.push(produced.clone()),
    }
    ensure_object(&mut closure);
    Ok(closure)
}

fn collect(index: &dyn IndexView, class: &ClassInfo, ty: Type, closure: &mut Vec<Type>) {
    if closure.contains(&ty) {
        return;
    }
    let bindings = bind_parameters(class, &ty);
    closure.push(ty);
    let supertypes = class.super_type().into_iter().chain(class.interface_types());
    for supertype in supertypes {
        let resolved = substitute(supertype, &bindings);
        match resolved.raw_name().and_then(|name| index.class_by_name(name)) {
            Some(super_class) => collect(index, super_class, resolved, closure),
            None => {
                if !closure.contains(&resolved) {
                    closure.push(resolved);
                }
            }
        }
    }
}

fn ensure_object(closure: &mut Vec<Type>) {
    if !closure.iter().any(Type::is_object) {
        closure.push(Type::object());
    }
}

/// Map the type variables declared by `class` to the arguments of `ty`
fn bind_parameters(class: &ClassInfo, ty: &Type) -> AHashMap<String, Type> {
    let mut bindings = AHashMap::new();
    let arguments = ty.arguments();
    if arguments.len() != class.type_parameters().len() {
        return bindings;
    }
    for (parameter, argument) in class.type_parameters().iter().zip(arguments) {
        if let Type::TypeVariable { identifier, .. } = parameter {
            bindings.insert(identifier.clone(), argument.clone());
        }
    }
    bindings
}

/// Replace type variables bound in `bindings`
pub fn substitute(ty: &Type, bindings: &AHashMap<String, Type>) -> Type {
    if bindings.is_empty() {
        return ty.clone();
    }
    match ty {
        Type::TypeVariable { identifier, .. } => bindings
            .get(identifier)
            .cloned()
            .unwrap_or_else(|| ty.clone()),
        Type::Parameterized { raw, arguments } => Type::Parameterized {
            raw: raw.clone(),
            arguments: arguments.iter().map(|a| substitute(a, bindings)).collect(),
        },
        Type::Wildcard {
            extends,
            super_bound,
        } => Type::Wildcard {
            extends: extends.as_deref().map(|b| Box::new(substitute(b, bindings))),
            super_bound: super_bound
                .as_deref()
                .map(|b| Box::new(substitute(b, bindings))),
        },
        Type::Array(component) => Type::array(substitute(component, bindings)),
        other => other.clone(),
    }
}

/// True if a bean with type `bean_type` may be injected where `required` is
/// required.
pub fn matches(index: &dyn IndexView, required: &Type, bean_type: &Type) -> bool {
    match (required, bean_type) {
        (Type::Primitive(r), Type::Primitive(b)) => r == b,
        (Type::Primitive(p), Type::Class(name)) | (Type::Class(name), Type::Primitive(p)) => {
            name.as_str() == p.boxed()
        }
        (Type::Class(r), Type::Class(b)) => r == b,
        (Type::Class(r), Type::Parameterized { raw, arguments })
        | (Type::Parameterized { raw, arguments }, Type::Class(r)) => {
            r == raw && arguments.iter().all(is_object_or_unbounded)
        }
        (
            Type::Parameterized {
                raw: required_raw,
                arguments: required_args,
            },
            Type::Parameterized {
                raw: bean_raw,
                arguments: bean_args,
            },
        ) => {
            required_raw == bean_raw
                && required_args.len() == bean_args.len()
                && required_args
                    .iter()
                    .zip(bean_args)
                    .all(|(r, b)| parameter_matches(index, r, b))
        }
        (Type::Array(r), Type::Array(b)) => matches(index, r, b),
        _ => false,
    }
}

fn parameter_matches(index: &dyn IndexView, required: &Type, bean: &Type) -> bool {
    match (required, bean) {
        (Type::Wildcard { .. }, Type::TypeVariable { .. }) => {
            let bean_upper = upper_bounds(bean);
            upper_bounds(required)
                .iter()
                .all(|wildcard_upper| {
                    bean_upper.iter().all(|b| {
                        is_assignable(index, b, wildcard_upper) || is_assignable(index, wildcard_upper, b)
                    })
                })
                && lower_bound(required).is_none_or(|lower| {
                    bean_upper.iter().all(|b| is_assignable(index, lower, b))
                })
        }
        (Type::Wildcard { .. }, _) => {
            upper_bounds(required)
                .iter()
                .all(|upper| is_assignable(index, bean, upper))
                && lower_bound(required).is_none_or(|lower| is_assignable(index, lower, bean))
        }
        (Type::TypeVariable { .. }, Type::TypeVariable { .. }) => {
            let bean_upper = upper_bounds(bean);
            upper_bounds(required)
                .iter()
                .all(|r| bean_upper.iter().all(|b| is_assignable(index, r, b)))
        }
        (_, Type::TypeVariable { .. }) => upper_bounds(bean)
            .iter()
            .all(|upper| is_assignable(index, required, upper)),
        (Type::TypeVariable { .. }, _) => upper_bounds(required)
            .iter()
            .all(|upper| is_assignable(index, bean, upper)),
        _ => matches(index, required, bean),
    }
}

fn is_object_or_unbounded(ty: &Type) -> bool {
    match ty {
        Type::TypeVariable { bounds, .. } => bounds.iter().all(Type::is_object),
        other => other.is_object(),
    }
}

fn upper_bounds(ty: &Type) -> Vec<Type> {
    match ty {
        Type::TypeVariable { bounds, .. } if !bounds.is_empty() => bounds.clone(),
        Type::Wildcard {
            extends: Some(bound),
            ..
        } => vec![(**bound).clone()],
        Type::TypeVariable { .. } | Type::Wildcard { .. } => vec![Type::object()],
        other => vec![other.clone()],
    }
}

fn lower_bound(ty: &Type) -> Option<&Type> {
    match ty {
        Type::Wildcard { super_bound, .. } => super_bound.as_deref(),
        _ => None,
    }
}

/// True if a value of type `from` can be assigned to `to` by raw subtyping
pub fn is_assignable(index: &dyn IndexView, from: &Type, to: &Type) -> bool {
    if to.is_object() {
        return true;
    }
    match (from, to) {
        (Type::Primitive(a), Type::Primitive(b)) => a == b,
        (Type::Array(a), Type::Array(b)) => is_assignable(index, a, b),
        (Type::TypeVariable { .. } | Type::Wildcard { .. }, _) => upper_bounds(from)
            .iter()
            .any(|bound| is_assignable(index, bound, to)),
        (_, Type::TypeVariable { .. } | Type::Wildcard { .. }) => upper_bounds(to)
            .iter()
            .all(|bound| is_assignable(index, from, bound)),
        _ => match (from.raw_name(), to.raw_name()) {
            (Some(sub), Some(sup)) => index.is_subtype_of(sub, sup),
            _ => false,
        },
    }
}

/// Raw names of every type in a closure
pub fn raw_names(closure: &[Type]) -> Vec<DotName> {
    closure.iter().filter_map(|t| t.raw_name().cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Index, Primitive};

    fn hierarchy() -> Index {
        Index::builder()
            .class(
                ClassInfo::builder("a.Repository")
                    .interface()
                    .type_parameter(Type::type_variable("T"))
                    .build(),
            )
            .class(
                ClassInfo::builder("a.AbstractRepo")
                    .type_parameter(Type::type_variable("E"))
                    .implements(Type::parameterized("a.Repository", [Type::type_variable("E")]))
                    .build(),
            )
            .class(
                ClassInfo::builder("a.UserRepo")
                    .extends(Type::parameterized("a.AbstractRepo", [Type::class("a.User")]))
                    .build(),
            )
            .class(ClassInfo::builder("a.Entity").build())
            .class(ClassInfo::builder("a.User").extends(Type::class("a.Entity")).build())
            .build()
    }

    #[test]
    fn test_closure_substitutes_type_variables() {
        let index = hierarchy();
        let class = index.class_by_name(&"a.UserRepo".into()).unwrap();
        let closure = class_closure(&index, class);
        assert_eq!(closure[0], Type::class("a.UserRepo"));
        assert!(closure.contains(&Type::parameterized("a.AbstractRepo", [Type::class("a.User")])));
        assert!(closure.contains(&Type::parameterized("a.Repository", [Type::class("a.User")])));
        assert!(closure.contains(&Type::object()));
        assert_eq!(closure.iter().filter(|t| t.is_object()).count(), 1);
    }

    #[test]
    fn test_producer_closure_of_primitive() {
        let index = hierarchy();
        let closure = producer_closure(&index, &Type::Primitive(Primitive::Int), "a.P#f").unwrap();
        assert_eq!(closure, vec![Type::Primitive(Primitive::Int), Type::object()]);
        assert!(producer_closure(&index, &Type::type_variable("T"), "a.P#f").is_err());
    }

    #[test]
    fn test_boxing_matches() {
        let index = hierarchy();
        let int = Type::Primitive(Primitive::Int);
        let integer = Type::class("java.lang.Integer");
        assert!(matches(&index, &int, &integer));
        assert!(matches(&index, &integer, &int));
        assert!(!matches(&index, &Type::class("java.lang.Long"), &int));
    }

    #[test]
    fn test_parameterized_invariant() {
        let index = hierarchy();
        let users = Type::parameterized("a.Repository", [Type::class("a.User")]);
        let entities = Type::parameterized("a.Repository", [Type::class("a.Entity")]);
        assert!(matches(&index, &users, &users.clone()));
        assert!(!matches(&index, &entities, &users));
    }

    #[test]
    fn test_wildcard_bounds() {
        let index = hierarchy();
        let users = Type::parameterized("a.Repository", [Type::class("a.User")]);
        let extends_entity =
            Type::parameterized("a.Repository", [Type::wildcard_extends(Type::class("a.Entity"))]);
        let super_user =
            Type::parameterized("a.Repository", [Type::wildcard_super(Type::class("a.User"))]);
        let any = Type::parameterized("a.Repository", [Type::wildcard()]);
        assert!(matches(&index, &extends_entity, &users));
        assert!(matches(&index, &super_user, &users));
        assert!(matches(&index, &any, &users));

        let entities = Type::parameterized("a.Repository", [Type::class("a.Entity")]);
        let extends_user =
            Type::parameterized("a.Repository", [Type::wildcard_extends(Type::class("a.User"))]);
        assert!(!matches(&index, &extends_user, &entities));
    }

    #[test]
    fn test_raw_required_type() {
        let index = hierarchy();
        let raw = Type::class("a.Repository");
        let unbounded = Type::parameterized("a.Repository", [Type::type_variable("T")]);
        let objects = Type::parameterized("a.Repository", [Type::object()]);
        let users = Type::parameterized("a.Repository", [Type::class("a.User")]);
        assert!(matches(&index, &raw, &unbounded));
        assert!(matches(&index, &raw, &objects));
        assert!(!matches(&index, &raw, &users));
    }

    #[test]
    fn test_type_variable_bean_parameter() {
        let index = hierarchy();
        let bounded = Type::parameterized(
            "a.Repository",
            [Type::bounded_type_variable("T", [Type::class("a.Entity")])],
        );
        let users = Type::parameterized("a.Repository", [Type::class("a.User")]);
        let strings = Type::parameterized("a.Repository", [Type::class("java.lang.String")]);
        assert!(matches(&index, &users, &bounded));
        assert!(!matches(&index, &strings, &bounded));
    }
}
