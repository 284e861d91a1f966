//! Annotation literals
//!
//! Generated code needs annotation instances at runtime (qualifiers,
//! interceptor bindings). Shared literal classes are collected in a cache
//! owned by the processing run and generated once at the end.

use super::output::{ClassEmitter, Resource};
use super::runtime;
use super::shape::{ClassShape, Expr, FieldShape, MethodShape, Stmt};
use crate::deployment::BeanDeployment;
use crate::error::{DeploymentError, Result};
use crate::index::{AnnotationInstance, AnnotationValue, DotName, Type};
use crate::names;
use ahash::RandomState;
use dashmap::DashMap;

#[cfg(feature = "logging")]
use tracing::trace;

/// A shared literal class to generate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralClass {
    annotation: DotName,
    generated_name: String,
    members: Vec<(String, String)>,
}

impl LiteralClass {
    pub fn annotation(&self) -> &DotName {
        &self.annotation
    }

    /// Fully qualified name of the generated class
    pub fn generated_name(&self) -> &str {
        &self.generated_name
    }

    /// Member names with their erased types, sorted by name
    pub fn members(&self) -> &[(String, String)] {
        &self.members
    }
}

/// Literal classes referenced while generating one deployment
pub struct AnnotationLiteralCache {
    shared: bool,
    literals: DashMap<DotName, LiteralClass, RandomState>,
}

impl AnnotationLiteralCache {
    /// With `shared` unset, literals are created through the runtime helper
    /// and no literal classes are generated
    pub fn new(shared: bool) -> Self {
        Self {
            shared,
            literals: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
        }
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    /// Expression creating `annotation` at runtime
    pub fn literal(&self, deployment: &BeanDeployment, annotation: &AnnotationInstance) -> Result<Expr> {
        let name = annotation.name();
        if name == &*names::DEFAULT {
            return Ok(Expr::static_field(runtime::DEFAULT_LITERAL, "INSTANCE"));
        }
        if name == &*names::ANY {
            return Ok(Expr::static_field(runtime::ANY_LITERAL, "INSTANCE"));
        }
        let class = deployment
            .index()
            .class_by_name(name)
            .ok_or_else(|| DeploymentError::class_not_found(name))?;

        let mut members: Vec<_> = class.methods().iter().filter(|m| !m.is_constructor()).collect();
        members.sort_by(|a, b| a.name().cmp(b.name()));
        let mut values = Vec::with_capacity(members.len());
        for member in &members {
            let value = annotation
                .member(member.name())
                .or(member.member_default())
                .ok_or_else(|| DeploymentError::UnsupportedAnnotationMember {
                    annotation: name.to_string(),
                    member: member.name().to_string(),
                    reason: "no value and no default value".to_string(),
                })?;
            values.push((member.name(), value_expr(name, member.name(), member.return_type(), value)?));
        }

        if !self.shared {
            let mut pairs = Vec::with_capacity(values.len() * 2);
            for (member, value) in values {
                pairs.push(Expr::string(member));
                pairs.push(value);
            }
            return Ok(Expr::invoke_static(
                runtime::ANNOTATIONS,
                "literal",
                [Expr::ClassLiteral(name.to_string()), Expr::array(runtime::OBJECT, pairs)],
            ));
        }

        let generated_name = shared_literal_name(name);
        self.literals.entry(name.clone()).or_insert_with(|| {
            #[cfg(feature = "logging")]
            trace!(target: "bean_processor", annotation = %name, "Shared annotation literal");
            LiteralClass {
                annotation: name.clone(),
                generated_name: generated_name.clone(),
                members: members
                    .iter()
                    .map(|m| (m.name().to_string(), m.return_type().erasure().to_string()))
                    .collect(),
            }
        });
        Ok(Expr::new_instance(generated_name, values.into_iter().map(|(_, v)| v)))
    }

    pub fn has_literals_to_generate(&self) -> bool {
        !self.literals.is_empty()
    }

    /// Cached literal classes, sorted by generated name
    pub fn literal_classes(&self) -> Vec<LiteralClass> {
        let mut classes: Vec<LiteralClass> = self.literals.iter().map(|e| e.value().clone()).collect();
        classes.sort_by(|a, b| a.generated_name.cmp(&b.generated_name));
        classes
    }
}

/// `<package>.<Simple>_Shared_AnnotationLiteral`
fn shared_literal_name(annotation: &DotName) -> String {
    let base = format!("{}_Shared_AnnotationLiteral", annotation.local_name().replace('$', "_"));
    match annotation.package_name() {
        "" => base,
        package => format!("{package}.{base}"),
    }
}

pub(crate) fn value_expr(annotation: &DotName, member: &str, member_type: &Type, value: &AnnotationValue) -> Result<Expr> {
    Ok(match value {
        AnnotationValue::Boolean(b) => Expr::Bool(*b),
        AnnotationValue::Integer(i) => Expr::Int(*i),
        AnnotationValue::String(s) => Expr::string(s.clone()),
        AnnotationValue::Enum { type_name, constant } => Expr::static_field(type_name.as_str(), constant.clone()),
        AnnotationValue::Class(ty) => Expr::ClassLiteral(ty.erasure().to_string()),
        AnnotationValue::Array(elements) => {
            let component = match member_type {
                Type::Array(component) => component.as_ref().clone(),
                other => other.clone(),
            };
            let mut rendered = Vec::with_capacity(elements.len());
            for element in elements {
                rendered.push(value_expr(annotation, member, &component, element)?);
            }
            Expr::array(component.erasure().to_string(), rendered)
        }
        AnnotationValue::Nested(_) => {
            return Err(DeploymentError::UnsupportedAnnotationMember {
                annotation: annotation.to_string(),
                member: member.to_string(),
                reason: "nested annotation values are not supported".to_string(),
            });
        }
    })
}

/// Generate every cached shared literal class
pub fn generate_literal_classes(cache: &AnnotationLiteralCache, emitter: &dyn ClassEmitter) -> Result<Vec<Resource>> {
    let mut resources = Vec::new();
    for literal in cache.literal_classes() {
        let mut builder = ClassShape::builder(literal.generated_name())
            .extends(runtime::ANNOTATION_LITERAL)
            .implements(literal.annotation().as_str())
            .source(literal.annotation().as_str());
        let mut constructor = MethodShape::constructor();
        for (member, ty) in literal.members() {
            builder.push_field(FieldShape::new(member.clone(), ty.clone()));
            constructor = constructor
                .param(member.clone(), ty.clone())
                .stmt(Stmt::assign(Expr::this_field(member.clone()), Expr::local(member.clone())));
            builder.push_method(
                MethodShape::new(member.clone())
                    .returns(ty.clone())
                    .stmt(Stmt::ret(Expr::this_field(member.clone()))),
            );
        }
        let shape = builder.method(constructor).build();
        let name = DotName::new(shape.name()).binary_name();
        resources.push(Resource::class(name, emitter.emit(&shape)?, None));
    }
    Ok(resources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::output::RenderingEmitter;
    use crate::deployment::tests::{deploy, marker};
    use crate::index::{ClassInfo, MethodInfo};

    fn qualifier_with_members() -> ClassInfo {
        ClassInfo::builder("a.Color")
            .annotation_type()
            .annotation(marker(&names::QUALIFIER))
            .method(MethodInfo::member("value", Type::class("java.lang.String")))
            .method(MethodInfo::member("weight", Type::class("int")).default_value(1))
            .method(MethodInfo::member("nested", Type::class("a.Inner")).default_value(
                AnnotationValue::Array(Vec::new()),
            ))
            .build()
    }

    #[test]
    fn test_shared_literal_cached_once() {
        let deployment = deploy(vec![qualifier_with_members()]).unwrap();
        let cache = AnnotationLiteralCache::new(true);
        let red = AnnotationInstance::marker("a.Color").with_value("red");
        let first = cache.literal(&deployment, &red).unwrap();
        cache.literal(&deployment, &AnnotationInstance::marker("a.Color").with_value("blue")).unwrap();
        assert_eq!(first.to_string(), r#"new a.Color_Shared_AnnotationLiteral(new a.Inner[]{}, "red", 1)"#);
        assert_eq!(cache.literal_classes().len(), 1);

        let resources = generate_literal_classes(&cache, &RenderingEmitter).unwrap();
        assert_eq!(resources[0].name(), "a/Color_Shared_AnnotationLiteral");
        let listing = resources[0].text().unwrap();
        assert!(listing.contains("extends javax.enterprise.util.AnnotationLiteral implements a.Color"));
        assert!(listing.contains("public java.lang.String value()"));
    }

    #[test]
    fn test_builtin_and_unshared_literals() {
        let deployment = deploy(vec![qualifier_with_members()]).unwrap();
        let cache = AnnotationLiteralCache::new(false);
        let default = cache.literal(&deployment, &marker(&names::DEFAULT)).unwrap();
        assert_eq!(default.to_string(), "org.jboss.protean.arc.DefaultLiteral.INSTANCE");
        let red = cache
            .literal(&deployment, &AnnotationInstance::marker("a.Color").with_value("red"))
            .unwrap();
        assert!(red.to_string().starts_with("org.jboss.protean.arc.Annotations.literal(a.Color.class"));
        assert!(!cache.has_literals_to_generate());
    }

    #[test]
    fn test_missing_value_and_nested_are_unsupported() {
        let deployment = deploy(vec![qualifier_with_members()]).unwrap();
        let cache = AnnotationLiteralCache::new(true);
        let err = cache.literal(&deployment, &AnnotationInstance::marker("a.Color")).unwrap_err();
        assert!(matches!(err, DeploymentError::UnsupportedAnnotationMember { ref member, .. } if member == "value"));

        let nested = AnnotationInstance::marker("a.Color")
            .with_value("red")
            .with("nested", AnnotationValue::Nested(AnnotationInstance::marker("a.Inner")));
        let err = cache.literal(&deployment, &nested).unwrap_err();
        assert!(matches!(err, DeploymentError::UnsupportedAnnotationMember { ref member, .. } if member == "nested"));
    }
}
