//! Read-only type and annotation index
//!
//! The processor never inspects classes directly. Every "is annotated with"
//! check, member lookup and hierarchy walk goes through an [`IndexView`].
//!
//! [`Index`] is an in-memory implementation assembled from [`ClassInfo`]
//! values, which are in turn built with [`ClassInfo::builder`]:
//!
//! ```rust
//! use bean_processor::index::{AnnotationInstance, ClassInfo, FieldInfo, Index, IndexView, Type};
//!
//! let index = Index::builder()
//!     .class(ClassInfo::builder("com.acme.Greeter")
//!         .annotation(AnnotationInstance::marker("javax.enterprise.context.ApplicationScoped"))
//!         .no_args_constructor()
//!         .build())
//!     .class(ClassInfo::builder("com.acme.Client")
//!         .no_args_constructor()
//!         .field(FieldInfo::new("greeter", Type::class("com.acme.Greeter"))
//!             .annotation(AnnotationInstance::marker("javax.inject.Inject")))
//!         .build())
//!     .build();
//!
//! assert!(index.class_by_name(&"com.acme.Greeter".into()).is_some());
//! ```

use ahash::AHashMap;
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

// =============================================================================
// Names
// =============================================================================

/// Fully qualified, dot separated type name (`com.acme.Outer$Inner`).
///
/// Cheap to clone; the underlying string is shared.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DotName(Arc<str>);

impl DotName {
    /// Create a name from its dotted string form
    #[inline]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The dotted string form
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name without the package: `Outer$Inner`
    pub fn local_name(&self) -> &str {
        match self.0.rfind('.') {
            Some(i) => &self.0[i + 1..],
            None => &self.0,
        }
    }

    /// Name without package and enclosing classes: `Inner`
    pub fn simple_name(&self) -> &str {
        let local = self.local_name();
        match local.rfind('$') {
            Some(i) => &local[i + 1..],
            None => local,
        }
    }

    /// Package part, empty for the default package
    pub fn package_name(&self) -> &str {
        match self.0.rfind('.') {
            Some(i) => &self.0[..i],
            None => "",
        }
    }

    /// Slash separated form used for generated resources: `com/acme/Outer$Inner`
    pub fn binary_name(&self) -> String {
        self.0.replace('.', "/")
    }
}

impl fmt::Debug for DotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for DotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DotName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DotName {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

// =============================================================================
// Types
// =============================================================================

/// Primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
}

impl Primitive {
    /// Keyword name (`int`)
    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Char => "char",
        }
    }

    /// The wrapper class (`java.lang.Integer`)
    pub fn boxed(self) -> &'static str {
        match self {
            Self::Boolean => "java.lang.Boolean",
            Self::Byte => "java.lang.Byte",
            Self::Short => "java.lang.Short",
            Self::Int => "java.lang.Integer",
            Self::Long => "java.lang.Long",
            Self::Float => "java.lang.Float",
            Self::Double => "java.lang.Double",
            Self::Char => "java.lang.Character",
        }
    }
}

/// A (possibly generic) type reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Raw or non-generic class
    Class(DotName),
    /// `raw<arguments...>`
    Parameterized { raw: DotName, arguments: Vec<Type> },
    /// Type variable with its bounds; an empty bound list means `Object`
    TypeVariable { identifier: String, bounds: Vec<Type> },
    /// `?`, `? extends T` or `? super T`
    Wildcard {
        extends: Option<Box<Type>>,
        super_bound: Option<Box<Type>>,
    },
    Primitive(Primitive),
    Array(Box<Type>),
    Void,
}

impl Type {
    /// A class type
    pub fn class(name: impl Into<DotName>) -> Self {
        Self::Class(name.into())
    }

    /// A parameterized type
    pub fn parameterized(raw: impl Into<DotName>, arguments: impl IntoIterator<Item = Type>) -> Self {
        Self::Parameterized {
            raw: raw.into(),
            arguments: arguments.into_iter().collect(),
        }
    }

    /// An unbounded type variable
    pub fn type_variable(identifier: impl Into<String>) -> Self {
        Self::TypeVariable {
            identifier: identifier.into(),
            bounds: Vec::new(),
        }
    }

    /// A bounded type variable
    pub fn bounded_type_variable(identifier: impl Into<String>, bounds: impl IntoIterator<Item = Type>) -> Self {
        Self::TypeVariable {
            identifier: identifier.into(),
            bounds: bounds.into_iter().collect(),
        }
    }

    /// `?`
    pub fn wildcard() -> Self {
        Self::Wildcard {
            extends: None,
            super_bound: None,
        }
    }

    /// `? extends bound`
    pub fn wildcard_extends(bound: Type) -> Self {
        Self::Wildcard {
            extends: Some(Box::new(bound)),
            super_bound: None,
        }
    }

    /// `? super bound`
    pub fn wildcard_super(bound: Type) -> Self {
        Self::Wildcard {
            extends: None,
            super_bound: Some(Box::new(bound)),
        }
    }

    /// `component[]`
    pub fn array(component: Type) -> Self {
        Self::Array(Box::new(component))
    }

    /// `java.lang.Object`
    pub fn object() -> Self {
        Self::class(OBJECT)
    }

    /// Raw class name for class and parameterized types
    pub fn raw_name(&self) -> Option<&DotName> {
        match self {
            Self::Class(name) => Some(name),
            Self::Parameterized { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Name used in generated code and error messages.
    ///
    /// Erases generics; type variables erase to their first bound.
    pub fn erasure(&self) -> DotName {
        match self {
            Self::Class(name) => name.clone(),
            Self::Parameterized { raw, .. } => raw.clone(),
            Self::TypeVariable { bounds, .. } => bounds
                .first()
                .map(Type::erasure)
                .unwrap_or_else(|| DotName::new(OBJECT)),
            Self::Wildcard { extends, .. } => extends
                .as_deref()
                .map(Type::erasure)
                .unwrap_or_else(|| DotName::new(OBJECT)),
            Self::Primitive(p) => DotName::new(p.name()),
            Self::Array(component) => DotName::new(format!("{}[]", component.erasure())),
            Self::Void => DotName::new("void"),
        }
    }

    /// Type arguments of a parameterized type
    pub fn arguments(&self) -> &[Type] {
        match self {
            Self::Parameterized { arguments, .. } => arguments,
            _ => &[],
        }
    }

    /// True for `java.lang.Object`
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Class(name) if name.as_str() == OBJECT)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(name) => write!(f, "{name}"),
            Self::Parameterized { raw, arguments } => {
                write!(f, "{raw}<")?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{argument}")?;
                }
                f.write_str(">")
            }
            Self::TypeVariable { identifier, .. } => f.write_str(identifier),
            Self::Wildcard {
                extends: Some(bound),
                ..
            } => write!(f, "? extends {bound}"),
            Self::Wildcard {
                super_bound: Some(bound),
                ..
            } => write!(f, "? super {bound}"),
            Self::Wildcard { .. } => f.write_str("?"),
            Self::Primitive(p) => f.write_str(p.name()),
            Self::Array(component) => write!(f, "{component}[]"),
            Self::Void => f.write_str("void"),
        }
    }
}

/// `java.lang.Object`
pub const OBJECT: &str = "java.lang.Object";

// =============================================================================
// Modifiers
// =============================================================================

/// Access and property flags of classes and members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u16);

impl Modifiers {
    pub const PUBLIC: Self = Self(0x0001);
    pub const PRIVATE: Self = Self(0x0002);
    pub const PROTECTED: Self = Self(0x0004);
    pub const STATIC: Self = Self(0x0008);
    pub const FINAL: Self = Self(0x0010);
    pub const BRIDGE: Self = Self(0x0040);
    pub const INTERFACE: Self = Self(0x0200);
    pub const ABSTRACT: Self = Self(0x0400);
    pub const SYNTHETIC: Self = Self(0x1000);
    pub const ANNOTATION: Self = Self(0x2000);
    pub const ENUM: Self = Self(0x4000);

    /// No flags: package-private
    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn is_public(self) -> bool {
        self.contains(Self::PUBLIC)
    }

    #[inline]
    pub const fn is_private(self) -> bool {
        self.contains(Self::PRIVATE)
    }

    #[inline]
    pub const fn is_static(self) -> bool {
        self.contains(Self::STATIC)
    }

    #[inline]
    pub const fn is_final(self) -> bool {
        self.contains(Self::FINAL)
    }

    /// Neither public, protected nor private
    #[inline]
    pub const fn is_package_private(self) -> bool {
        self.0 & (Self::PUBLIC.0 | Self::PRIVATE.0 | Self::PROTECTED.0) == 0
    }
}

impl BitOr for Modifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

// =============================================================================
// Annotations
// =============================================================================

/// An annotation member value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnnotationValue {
    Boolean(bool),
    Integer(i64),
    String(String),
    Enum { type_name: DotName, constant: String },
    Class(Type),
    Nested(AnnotationInstance),
    Array(Vec<AnnotationValue>),
}

impl AnnotationValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Enum {
                type_name,
                constant,
            } => write!(f, "{}.{constant}", type_name.simple_name()),
            Self::Class(ty) => write!(f, "{ty}.class"),
            Self::Nested(annotation) => write!(f, "{annotation}"),
            Self::Array(values) => {
                f.write_str("{")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for AnnotationValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AnnotationValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for AnnotationValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for AnnotationValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for AnnotationValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// An annotation usage: type name plus explicitly given member values.
///
/// Member values are kept sorted by member name so that two instances with
/// the same values compare equal regardless of declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnotationInstance {
    name: DotName,
    values: Vec<(String, AnnotationValue)>,
}

impl AnnotationInstance {
    /// Annotation without member values
    pub fn marker(name: impl Into<DotName>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    /// Builder style member setter
    pub fn with(mut self, member: impl Into<String>, value: impl Into<AnnotationValue>) -> Self {
        let member = member.into();
        let value = value.into();
        match self.values.binary_search_by(|(m, _)| m.as_str().cmp(member.as_str())) {
            Ok(pos) => self.values[pos].1 = value,
            Err(pos) => self.values.insert(pos, (member, value)),
        }
        self
    }

    /// Shorthand for the `value` member
    pub fn with_value(self, value: impl Into<AnnotationValue>) -> Self {
        self.with("value", value)
    }

    #[inline]
    pub fn name(&self) -> &DotName {
        &self.name
    }

    /// Explicit value of a member
    pub fn member(&self, member: &str) -> Option<&AnnotationValue> {
        self.values
            .iter()
            .find(|(m, _)| m == member)
            .map(|(_, v)| v)
    }

    /// Explicit value of the `value` member
    pub fn value(&self) -> Option<&AnnotationValue> {
        self.member("value")
    }

    /// All explicit member values, sorted by member name
    pub fn values(&self) -> &[(String, AnnotationValue)] {
        &self.values
    }
}

impl fmt::Display for AnnotationInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name.simple_name())?;
        if !self.values.is_empty() {
            f.write_str("(")?;
            for (i, (member, value)) in self.values.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{member} = {value}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Identity of an annotated element, used as a cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnnotationTarget {
    Class(DotName),
    Method {
        class: DotName,
        name: String,
        parameters: Vec<Type>,
    },
    Field {
        class: DotName,
        name: String,
    },
}

impl AnnotationTarget {
    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Class(_) => TargetKind::Class,
            Self::Method { .. } => TargetKind::Method,
            Self::Field { .. } => TargetKind::Field,
        }
    }
}

impl fmt::Display for AnnotationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(name) => write!(f, "{name}"),
            Self::Method {
                class,
                name,
                parameters,
            } => {
                write!(f, "{class}#{name}(")?;
                for (i, p) in parameters.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{p}")?;
                }
                f.write_str(")")
            }
            Self::Field { class, name } => write!(f, "{class}#{name}"),
        }
    }
}

/// Kind of an [`AnnotationTarget`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Class,
    Method,
    Field,
}

// =============================================================================
// Members
// =============================================================================

/// Constructor name used for [`MethodInfo`] entries describing constructors
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// One method parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodParameter {
    ty: Type,
    name: Option<String>,
    annotations: Vec<AnnotationInstance>,
}

impl MethodParameter {
    pub fn new(ty: Type) -> Self {
        Self {
            ty,
            name: None,
            annotations: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn annotation(mut self, annotation: AnnotationInstance) -> Self {
        self.annotations.push(annotation);
        self
    }

    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn annotations(&self) -> &[AnnotationInstance] {
        &self.annotations
    }

    pub fn has_annotation(&self, name: &DotName) -> bool {
        self.annotations.iter().any(|a| a.name() == name)
    }

    pub fn annotation_named(&self, name: &DotName) -> Option<&AnnotationInstance> {
        self.annotations.iter().find(|a| a.name() == name)
    }
}

/// A method or constructor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodInfo {
    declaring_class: DotName,
    name: String,
    parameters: Vec<MethodParameter>,
    return_type: Type,
    flags: Modifiers,
    annotations: Vec<AnnotationInstance>,
    default_value: Option<AnnotationValue>,
}

impl MethodInfo {
    /// A public method returning `void`; the declaring class is set when the
    /// method is added to a [`ClassBuilder`]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            declaring_class: DotName::new(""),
            name: name.into(),
            parameters: Vec::new(),
            return_type: Type::Void,
            flags: Modifiers::PUBLIC,
            annotations: Vec::new(),
            default_value: None,
        }
    }

    /// A public constructor
    pub fn constructor() -> Self {
        Self::new(CONSTRUCTOR_NAME)
    }

    /// An annotation member declaration (`String value() default ""`)
    pub fn member(name: impl Into<String>, ty: Type) -> Self {
        Self::new(name).returns(ty).modifiers(Modifiers::PUBLIC | Modifiers::ABSTRACT)
    }

    pub fn returns(mut self, ty: Type) -> Self {
        self.return_type = ty;
        self
    }

    pub fn param(mut self, ty: Type) -> Self {
        self.parameters.push(MethodParameter::new(ty));
        self
    }

    pub fn parameter(mut self, parameter: MethodParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn modifiers(mut self, flags: Modifiers) -> Self {
        self.flags = flags;
        self
    }

    pub fn annotation(mut self, annotation: AnnotationInstance) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn default_value(mut self, value: impl Into<AnnotationValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    #[inline]
    pub fn declaring_class(&self) -> &DotName {
        &self.declaring_class
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[MethodParameter] {
        &self.parameters
    }

    pub fn parameter_types(&self) -> Vec<Type> {
        self.parameters.iter().map(|p| p.ty.clone()).collect()
    }

    #[inline]
    pub fn return_type(&self) -> &Type {
        &self.return_type
    }

    #[inline]
    pub fn flags(&self) -> Modifiers {
        self.flags
    }

    pub fn annotations(&self) -> &[AnnotationInstance] {
        &self.annotations
    }

    pub fn has_annotation(&self, name: &DotName) -> bool {
        self.annotations.iter().any(|a| a.name() == name)
    }

    pub fn annotation_named(&self, name: &DotName) -> Option<&AnnotationInstance> {
        self.annotations.iter().find(|a| a.name() == name)
    }

    /// Default of an annotation member
    pub fn member_default(&self) -> Option<&AnnotationValue> {
        self.default_value.as_ref()
    }

    #[inline]
    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }

    /// Name plus erased parameter types: `produce(java.lang.String,int)`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| p.ty.erasure().to_string())
            .collect();
        format!("{}({})", self.name, params.join(","))
    }

    pub fn target(&self) -> AnnotationTarget {
        AnnotationTarget::Method {
            class: self.declaring_class.clone(),
            name: self.name.clone(),
            parameters: self.parameter_types(),
        }
    }
}

impl fmt::Display for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.declaring_class, self.signature())
    }
}

/// A field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldInfo {
    declaring_class: DotName,
    name: String,
    ty: Type,
    flags: Modifiers,
    annotations: Vec<AnnotationInstance>,
}

impl FieldInfo {
    /// A package-private field; the declaring class is set by [`ClassBuilder`]
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            declaring_class: DotName::new(""),
            name: name.into(),
            ty,
            flags: Modifiers::empty(),
            annotations: Vec::new(),
        }
    }

    pub fn modifiers(mut self, flags: Modifiers) -> Self {
        self.flags = flags;
        self
    }

    pub fn annotation(mut self, annotation: AnnotationInstance) -> Self {
        self.annotations.push(annotation);
        self
    }

    #[inline]
    pub fn declaring_class(&self) -> &DotName {
        &self.declaring_class
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    #[inline]
    pub fn flags(&self) -> Modifiers {
        self.flags
    }

    pub fn annotations(&self) -> &[AnnotationInstance] {
        &self.annotations
    }

    pub fn has_annotation(&self, name: &DotName) -> bool {
        self.annotations.iter().any(|a| a.name() == name)
    }

    pub fn target(&self) -> AnnotationTarget {
        AnnotationTarget::Field {
            class: self.declaring_class.clone(),
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.declaring_class, self.name)
    }
}

// =============================================================================
// Classes
// =============================================================================

/// How a class is nested in its enclosing class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NestingType {
    #[default]
    TopLevel,
    /// Member class; static members are treated like top level classes
    Inner,
    Local,
    Anonymous,
}

/// Everything the processor needs to know about one class.
#[derive(Debug, Clone)]
pub struct ClassInfo {
    name: DotName,
    flags: Modifiers,
    nesting: NestingType,
    super_type: Option<Type>,
    interfaces: Vec<Type>,
    type_parameters: Vec<Type>,
    annotations: Vec<AnnotationInstance>,
    fields: Vec<FieldInfo>,
    methods: Vec<MethodInfo>,
}

impl ClassInfo {
    /// Start building a public top level class extending `java.lang.Object`
    pub fn builder(name: impl Into<DotName>) -> ClassBuilder {
        ClassBuilder::new(name.into())
    }

    #[inline]
    pub fn name(&self) -> &DotName {
        &self.name
    }

    #[inline]
    pub fn flags(&self) -> Modifiers {
        self.flags
    }

    #[inline]
    pub fn nesting(&self) -> NestingType {
        self.nesting
    }

    pub fn super_type(&self) -> Option<&Type> {
        self.super_type.as_ref()
    }

    pub fn super_name(&self) -> Option<&DotName> {
        self.super_type.as_ref().and_then(Type::raw_name)
    }

    pub fn interface_types(&self) -> &[Type] {
        &self.interfaces
    }

    pub fn interface_names(&self) -> impl Iterator<Item = &DotName> {
        self.interfaces.iter().filter_map(Type::raw_name)
    }

    pub fn type_parameters(&self) -> &[Type] {
        &self.type_parameters
    }

    /// Class level annotations as declared in the index
    pub fn annotations(&self) -> &[AnnotationInstance] {
        &self.annotations
    }

    pub fn has_annotation(&self, name: &DotName) -> bool {
        self.annotations.iter().any(|a| a.name() == name)
    }

    pub fn annotation_named(&self, name: &DotName) -> Option<&AnnotationInstance> {
        self.annotations.iter().find(|a| a.name() == name)
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    /// First method with the given name
    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn constructors(&self) -> impl Iterator<Item = &MethodInfo> {
        self.methods.iter().filter(|m| m.is_constructor())
    }

    pub fn has_no_args_constructor(&self) -> bool {
        self.constructors().any(|c| c.parameters.is_empty())
    }

    pub fn is_interface(&self) -> bool {
        self.flags.contains(Modifiers::INTERFACE)
    }

    pub fn is_annotation(&self) -> bool {
        self.flags.contains(Modifiers::ANNOTATION)
    }

    pub fn is_enum(&self) -> bool {
        self.flags.contains(Modifiers::ENUM)
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.contains(Modifiers::ABSTRACT)
    }

    pub fn is_final(&self) -> bool {
        self.flags.is_final()
    }

    pub fn target(&self) -> AnnotationTarget {
        AnnotationTarget::Class(self.name.clone())
    }

    /// The type of this class as seen from outside: parameterized by its own
    /// type variables when generic
    pub fn as_type(&self) -> Type {
        if self.type_parameters.is_empty() {
            Type::Class(self.name.clone())
        } else {
            Type::Parameterized {
                raw: self.name.clone(),
                arguments: self.type_parameters.clone(),
            }
        }
    }
}

/// Fluent builder for [`ClassInfo`]
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    class: ClassInfo,
}

impl ClassBuilder {
    fn new(name: DotName) -> Self {
        Self {
            class: ClassInfo {
                name,
                flags: Modifiers::PUBLIC,
                nesting: NestingType::TopLevel,
                super_type: Some(Type::object()),
                interfaces: Vec::new(),
                type_parameters: Vec::new(),
                annotations: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
            },
        }
    }

    pub fn modifiers(mut self, flags: Modifiers) -> Self {
        self.class.flags = flags;
        self
    }

    /// Mark as a public interface without a superclass
    pub fn interface(mut self) -> Self {
        self.class.flags = Modifiers::PUBLIC | Modifiers::INTERFACE | Modifiers::ABSTRACT;
        self.class.super_type = None;
        self
    }

    /// Mark as an annotation type
    pub fn annotation_type(mut self) -> Self {
        self.class.flags =
            Modifiers::PUBLIC | Modifiers::INTERFACE | Modifiers::ABSTRACT | Modifiers::ANNOTATION;
        self.class.super_type = None;
        self
    }

    pub fn nesting(mut self, nesting: NestingType) -> Self {
        self.class.nesting = nesting;
        self
    }

    pub fn extends(mut self, super_type: Type) -> Self {
        self.class.super_type = Some(super_type);
        self
    }

    pub fn implements(mut self, interface: Type) -> Self {
        self.class.interfaces.push(interface);
        self
    }

    pub fn type_parameter(mut self, parameter: Type) -> Self {
        self.class.type_parameters.push(parameter);
        self
    }

    pub fn annotation(mut self, annotation: AnnotationInstance) -> Self {
        self.class.annotations.push(annotation);
        self
    }

    pub fn field(mut self, mut field: FieldInfo) -> Self {
        field.declaring_class = self.class.name.clone();
        self.class.fields.push(field);
        self
    }

    pub fn method(mut self, mut method: MethodInfo) -> Self {
        method.declaring_class = self.class.name.clone();
        self.class.methods.push(method);
        self
    }

    /// Add a public no-args constructor
    pub fn no_args_constructor(self) -> Self {
        self.method(MethodInfo::constructor())
    }

    pub fn build(self) -> ClassInfo {
        self.class
    }
}

// =============================================================================
// Index
// =============================================================================

/// Read-only queries against the type/annotation index.
pub trait IndexView: Send + Sync {
    /// Look up a class by name
    fn class_by_name(&self, name: &DotName) -> Option<&ClassInfo>;

    /// Every class known to the index, in a stable order
    fn known_classes(&self) -> Vec<&ClassInfo>;

    /// Classes carrying the given class level annotation
    fn classes_annotated_with(&self, annotation: &DotName) -> Vec<&ClassInfo> {
        self.known_classes()
            .into_iter()
            .filter(|c| c.has_annotation(annotation))
            .collect()
    }

    /// True if `sub` equals `sup` or has it among its transitive supertypes
    fn is_subtype_of(&self, sub: &DotName, sup: &DotName) -> bool {
        if sub == sup || sup.as_str() == OBJECT {
            return true;
        }
        let mut pending = vec![sub.clone()];
        let mut seen: Vec<DotName> = Vec::new();
        while let Some(current) = pending.pop() {
            if &current == sup {
                return true;
            }
            if seen.contains(&current) {
                continue;
            }
            if let Some(class) = self.class_by_name(&current) {
                pending.extend(class.super_name().cloned());
                pending.extend(class.interface_names().cloned());
            }
            seen.push(current);
        }
        false
    }
}

/// In-memory index, preserving insertion order
#[derive(Debug, Clone, Default)]
pub struct Index {
    classes: AHashMap<DotName, ClassInfo>,
    order: Vec<DotName>,
}

impl Index {
    pub fn builder() -> IndexBuilder {
        IndexBuilder::default()
    }

    /// Build an index from classes; later duplicates replace earlier ones
    pub fn from_classes(classes: impl IntoIterator<Item = ClassInfo>) -> Self {
        let mut index = Self::default();
        for class in classes {
            index.insert(class);
        }
        index
    }

    fn insert(&mut self, class: ClassInfo) {
        let name = class.name.clone();
        if self.classes.insert(name.clone(), class).is_none() {
            self.order.push(name);
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl IndexView for Index {
    fn class_by_name(&self, name: &DotName) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    fn known_classes(&self) -> Vec<&ClassInfo> {
        self.order
            .iter()
            .filter_map(|name| self.classes.get(name))
            .collect()
    }
}

/// Builder for [`Index`]
#[derive(Debug, Default)]
pub struct IndexBuilder {
    classes: Vec<ClassInfo>,
}

impl IndexBuilder {
    pub fn class(mut self, class: ClassInfo) -> Self {
        self.classes.push(class);
        self
    }

    pub fn classes(mut self, classes: impl IntoIterator<Item = ClassInfo>) -> Self {
        self.classes.extend(classes);
        self
    }

    pub fn build(self) -> Index {
        Index::from_classes(self.classes)
    }
}

/// Several indexes viewed as one; the first index defining a class wins
#[derive(Clone)]
pub struct CompositeIndex {
    parts: Vec<Arc<dyn IndexView>>,
}

impl CompositeIndex {
    pub fn new(parts: impl IntoIterator<Item = Arc<dyn IndexView>>) -> Self {
        Self {
            parts: parts.into_iter().collect(),
        }
    }
}

impl IndexView for CompositeIndex {
    fn class_by_name(&self, name: &DotName) -> Option<&ClassInfo> {
        self.parts.iter().find_map(|part| part.class_by_name(name))
    }

    fn known_classes(&self) -> Vec<&ClassInfo> {
        let mut seen = ahash::AHashSet::new();
        let mut classes = Vec::new();
        for part in &self.parts {
            for class in part.known_classes() {
                if seen.insert(class.name().clone()) {
                    classes.push(class);
                }
            }
        }
        classes
    }
}

impl fmt::Debug for CompositeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeIndex")
            .field("parts", &self.parts.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_name_parts() {
        let name = DotName::new("com.acme.Outer$Inner");
        assert_eq!(name.local_name(), "Outer$Inner");
        assert_eq!(name.simple_name(), "Inner");
        assert_eq!(name.package_name(), "com.acme");
        assert_eq!(name.binary_name(), "com/acme/Outer$Inner");
        assert_eq!(DotName::new("Top").package_name(), "");
    }

    #[test]
    fn test_annotation_values_are_order_independent() {
        let a = AnnotationInstance::marker("q.Q").with("b", 1).with("a", "x");
        let b = AnnotationInstance::marker("q.Q").with("a", "x").with("b", 1);
        assert_eq!(a, b);
        assert_eq!(a.member("b"), Some(&AnnotationValue::Integer(1)));
        assert_eq!(a.to_string(), "@Q(a = \"x\", b = 1)");
    }

    #[test]
    fn test_type_display_and_erasure() {
        let ty = Type::parameterized(
            "java.util.List",
            [Type::wildcard_extends(Type::class("java.lang.Number"))],
        );
        assert_eq!(ty.to_string(), "java.util.List<? extends java.lang.Number>");
        assert_eq!(ty.erasure().as_str(), "java.util.List");
        assert_eq!(Type::type_variable("T").erasure().as_str(), OBJECT);
    }

    #[test]
    fn test_builder_sets_declaring_class() {
        let class = ClassInfo::builder("a.Foo")
            .no_args_constructor()
            .method(MethodInfo::new("ping").param(Type::Primitive(Primitive::Int)))
            .field(FieldInfo::new("bar", Type::class("a.Bar")))
            .build();
        assert!(class.has_no_args_constructor());
        assert_eq!(class.method("ping").unwrap().declaring_class().as_str(), "a.Foo");
        assert_eq!(class.method("ping").unwrap().signature(), "ping(int)");
        assert_eq!(class.field("bar").unwrap().declaring_class().as_str(), "a.Foo");
        assert_eq!(class.super_name().map(DotName::as_str), Some(OBJECT));
    }

    #[test]
    fn test_subtype_walks_interfaces_and_superclasses() {
        let index = Index::builder()
            .class(ClassInfo::builder("a.Service").interface().build())
            .class(
                ClassInfo::builder("a.Base")
                    .implements(Type::class("a.Service"))
                    .build(),
            )
            .class(ClassInfo::builder("a.Impl").extends(Type::class("a.Base")).build())
            .build();
        assert!(index.is_subtype_of(&"a.Impl".into(), &"a.Service".into()));
        assert!(index.is_subtype_of(&"a.Impl".into(), &OBJECT.into()));
        assert!(!index.is_subtype_of(&"a.Service".into(), &"a.Impl".into()));
    }

    #[test]
    fn test_composite_index_first_part_wins() {
        let first: Arc<dyn IndexView> = Arc::new(Index::from_classes([ClassInfo::builder("a.A")
            .modifiers(Modifiers::PUBLIC | Modifiers::FINAL)
            .build()]));
        let second: Arc<dyn IndexView> = Arc::new(Index::from_classes([
            ClassInfo::builder("a.A").build(),
            ClassInfo::builder("a.B").build(),
        ]));
        let composite = CompositeIndex::new([first, second]);
        assert!(composite.class_by_name(&"a.A".into()).unwrap().is_final());
        assert_eq!(composite.known_classes().len(), 2);
    }
}
