//! Structural class shapes
//!
//! Generators describe classes as a tree of fields, methods and statements.
//! A [`ClassEmitter`](super::ClassEmitter) turns a shape into bytes; the
//! `Display` impl renders a Java-like listing.

use crate::index::Modifiers;
use std::fmt::{self, Write};

// =============================================================================
// Expressions and statements
// =============================================================================

/// An expression in a generated method body
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    This,
    /// A local variable or parameter
    Local(String),
    /// `Type.class`
    ClassLiteral(String),
    Field {
        target: Box<Expr>,
        name: String,
    },
    StaticField {
        class: String,
        name: String,
    },
    Invoke {
        target: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    InvokeStatic {
        class: String,
        method: String,
        args: Vec<Expr>,
    },
    InvokeSuper {
        method: String,
        args: Vec<Expr>,
    },
    New {
        class: String,
        args: Vec<Expr>,
    },
    NewArray {
        component: String,
        elements: Vec<Expr>,
    },
    Cast {
        ty: String,
        expr: Box<Expr>,
    },
    /// `(a, b) -> body`
    Lambda {
        params: Vec<String>,
        body: Box<Expr>,
    },
    IsNull(Box<Expr>),
    Equals(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn string(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    pub fn local(name: impl Into<String>) -> Self {
        Self::Local(name.into())
    }

    /// `this.<name>`
    pub fn this_field(name: impl Into<String>) -> Self {
        Self::Field {
            target: Box::new(Self::This),
            name: name.into(),
        }
    }

    pub fn static_field(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self::StaticField {
            class: class.into(),
            name: name.into(),
        }
    }

    /// `<self>.<name>`
    pub fn field(self, name: impl Into<String>) -> Self {
        Self::Field {
            target: Box::new(self),
            name: name.into(),
        }
    }

    /// `<self>.<method>(args)`
    pub fn invoke(self, method: impl Into<String>, args: impl IntoIterator<Item = Expr>) -> Self {
        Self::Invoke {
            target: Box::new(self),
            method: method.into(),
            args: args.into_iter().collect(),
        }
    }

    pub fn invoke_static(class: impl Into<String>, method: impl Into<String>, args: impl IntoIterator<Item = Expr>) -> Self {
        Self::InvokeStatic {
            class: class.into(),
            method: method.into(),
            args: args.into_iter().collect(),
        }
    }

    pub fn invoke_super(method: impl Into<String>, args: impl IntoIterator<Item = Expr>) -> Self {
        Self::InvokeSuper {
            method: method.into(),
            args: args.into_iter().collect(),
        }
    }

    pub fn new_instance(class: impl Into<String>, args: impl IntoIterator<Item = Expr>) -> Self {
        Self::New {
            class: class.into(),
            args: args.into_iter().collect(),
        }
    }

    pub fn array(component: impl Into<String>, elements: impl IntoIterator<Item = Expr>) -> Self {
        Self::NewArray {
            component: component.into(),
            elements: elements.into_iter().collect(),
        }
    }

    pub fn cast(self, ty: impl Into<String>) -> Self {
        Self::Cast {
            ty: ty.into(),
            expr: Box::new(self),
        }
    }

    pub fn lambda(params: impl IntoIterator<Item = &'static str>, body: Expr) -> Self {
        Self::Lambda {
            params: params.into_iter().map(str::to_string).collect(),
            body: Box::new(body),
        }
    }

    pub fn is_null(self) -> Self {
        Self::IsNull(Box::new(self))
    }

    pub fn equals(self, other: Expr) -> Self {
        Self::Equals(Box::new(self), Box::new(other))
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Null => f.write_str("null"),
            Expr::Bool(value) => write!(f, "{value}"),
            Expr::Int(value) => write!(f, "{value}"),
            Expr::Str(value) => write!(f, "{value:?}"),
            Expr::This => f.write_str("this"),
            Expr::Local(name) => f.write_str(name),
            Expr::ClassLiteral(ty) => write!(f, "{ty}.class"),
            Expr::Field { target, name } => write!(f, "{target}.{name}"),
            Expr::StaticField { class, name } => write!(f, "{class}.{name}"),
            Expr::Invoke { target, method, args } => {
                write!(f, "{target}.{method}(")?;
                write_args(f, args)?;
                f.write_str(")")
            }
            Expr::InvokeStatic { class, method, args } => {
                write!(f, "{class}.{method}(")?;
                write_args(f, args)?;
                f.write_str(")")
            }
            Expr::InvokeSuper { method, args } if method == CONSTRUCTOR => {
                f.write_str("super(")?;
                write_args(f, args)?;
                f.write_str(")")
            }
            Expr::InvokeSuper { method, args } => {
                write!(f, "super.{method}(")?;
                write_args(f, args)?;
                f.write_str(")")
            }
            Expr::New { class, args } => {
                write!(f, "new {class}(")?;
                write_args(f, args)?;
                f.write_str(")")
            }
            Expr::NewArray { component, elements } => {
                write!(f, "new {component}[]{{")?;
                write_args(f, elements)?;
                f.write_str("}")
            }
            Expr::Cast { ty, expr } => write!(f, "(({ty}) {expr})"),
            Expr::Lambda { params, body } => write!(f, "({}) -> {body}", params.join(", ")),
            Expr::IsNull(expr) => write!(f, "{expr} == null"),
            Expr::Equals(left, right) => write!(f, "{left}.equals({right})"),
        }
    }
}

/// A statement in a generated method body
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let { name: String, ty: String, value: Expr },
    Assign { target: Expr, value: Expr },
    Expr(Expr),
    Return(Option<Expr>),
    If { condition: Expr, then: Vec<Stmt>, otherwise: Vec<Stmt> },
    Throw(Expr),
}

impl Stmt {
    pub fn let_(name: impl Into<String>, ty: impl Into<String>, value: Expr) -> Self {
        Self::Let {
            name: name.into(),
            ty: ty.into(),
            value,
        }
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Self::Assign { target, value }
    }

    pub fn ret(value: Expr) -> Self {
        Self::Return(Some(value))
    }

    pub fn if_then(condition: Expr, then: Vec<Stmt>) -> Self {
        Self::If {
            condition,
            then,
            otherwise: Vec::new(),
        }
    }

    fn render(&self, out: &mut String, depth: usize) -> fmt::Result {
        let indent = "    ".repeat(depth);
        match self {
            Stmt::Let { name, ty, value } => writeln!(out, "{indent}{ty} {name} = {value};"),
            Stmt::Assign { target, value } => writeln!(out, "{indent}{target} = {value};"),
            Stmt::Expr(expr) => writeln!(out, "{indent}{expr};"),
            Stmt::Return(Some(value)) => writeln!(out, "{indent}return {value};"),
            Stmt::Return(None) => writeln!(out, "{indent}return;"),
            Stmt::Throw(value) => writeln!(out, "{indent}throw {value};"),
            Stmt::If {
                condition,
                then,
                otherwise,
            } => {
                writeln!(out, "{indent}if ({condition}) {{")?;
                for stmt in then {
                    stmt.render(out, depth + 1)?;
                }
                if !otherwise.is_empty() {
                    writeln!(out, "{indent}}} else {{")?;
                    for stmt in otherwise {
                        stmt.render(out, depth + 1)?;
                    }
                }
                writeln!(out, "{indent}}}")
            }
        }
    }
}

impl From<Expr> for Stmt {
    fn from(expr: Expr) -> Self {
        Stmt::Expr(expr)
    }
}

// =============================================================================
// Members
// =============================================================================

fn modifier_keywords(flags: Modifiers) -> String {
    let mut keywords = Vec::new();
    if flags.contains(Modifiers::PUBLIC) {
        keywords.push("public");
    } else if flags.contains(Modifiers::PROTECTED) {
        keywords.push("protected");
    } else if flags.contains(Modifiers::PRIVATE) {
        keywords.push("private");
    }
    if flags.contains(Modifiers::ABSTRACT) {
        keywords.push("abstract");
    }
    if flags.contains(Modifiers::STATIC) {
        keywords.push("static");
    }
    if flags.contains(Modifiers::FINAL) {
        keywords.push("final");
    }
    let mut rendered = keywords.join(" ");
    if !rendered.is_empty() {
        rendered.push(' ');
    }
    rendered
}

/// A field of a generated class
#[derive(Debug, Clone, PartialEq)]
pub struct FieldShape {
    name: String,
    ty: String,
    flags: Modifiers,
}

impl FieldShape {
    /// A private final field
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            flags: Modifiers::PRIVATE | Modifiers::FINAL,
        }
    }

    pub fn modifiers(mut self, flags: Modifiers) -> Self {
        self.flags = flags;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &str {
        &self.ty
    }

    pub fn flags(&self) -> Modifiers {
        self.flags
    }
}

/// Name of constructors in a [`MethodShape`]
pub const CONSTRUCTOR: &str = "<init>";

/// A method or constructor of a generated class
#[derive(Debug, Clone, PartialEq)]
pub struct MethodShape {
    name: String,
    params: Vec<(String, String)>,
    returns: String,
    flags: Modifiers,
    body: Vec<Stmt>,
}

impl MethodShape {
    /// A public method returning void
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: "void".to_string(),
            flags: Modifiers::PUBLIC,
            body: Vec::new(),
        }
    }

    pub fn constructor() -> Self {
        Self::new(CONSTRUCTOR)
    }

    pub fn param(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.params.push((name.into(), ty.into()));
        self
    }

    pub fn returns(mut self, ty: impl Into<String>) -> Self {
        self.returns = ty.into();
        self
    }

    pub fn modifiers(mut self, flags: Modifiers) -> Self {
        self.flags = flags;
        self
    }

    pub fn stmt(mut self, stmt: impl Into<Stmt>) -> Self {
        self.body.push(stmt.into());
        self
    }

    pub fn body(mut self, stmts: impl IntoIterator<Item = Stmt>) -> Self {
        self.body.extend(stmts);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn return_type(&self) -> &str {
        &self.returns
    }

    pub fn flags(&self) -> Modifiers {
        self.flags
    }

    pub fn statements(&self) -> &[Stmt] {
        &self.body
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR
    }

    fn render(&self, out: &mut String, class_simple_name: &str) -> fmt::Result {
        let params: Vec<String> = self.params.iter().map(|(name, ty)| format!("{ty} {name}")).collect();
        if self.is_constructor() {
            writeln!(
                out,
                "    {}{class_simple_name}({}) {{",
                modifier_keywords(self.flags),
                params.join(", ")
            )?;
        } else {
            writeln!(
                out,
                "    {}{} {}({}) {{",
                modifier_keywords(self.flags),
                self.returns,
                self.name,
                params.join(", ")
            )?;
        }
        for stmt in &self.body {
            stmt.render(out, 2)?;
        }
        writeln!(out, "    }}")
    }
}

// =============================================================================
// Classes
// =============================================================================

/// A generated class
#[derive(Debug, Clone, PartialEq)]
pub struct ClassShape {
    name: String,
    flags: Modifiers,
    super_class: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<FieldShape>,
    methods: Vec<MethodShape>,
    source: Option<String>,
}

impl ClassShape {
    /// A public final class extending `java.lang.Object`
    pub fn builder(name: impl Into<String>) -> ClassShapeBuilder {
        ClassShapeBuilder {
            shape: ClassShape {
                name: name.into(),
                flags: Modifiers::PUBLIC | Modifiers::FINAL,
                super_class: None,
                interfaces: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
                source: None,
            },
        }
    }

    /// Fully qualified, dot separated name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flags(&self) -> Modifiers {
        self.flags
    }

    pub fn super_class(&self) -> Option<&str> {
        self.super_class.as_deref()
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    pub fn fields(&self) -> &[FieldShape] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldShape> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn methods(&self) -> &[MethodShape] {
        &self.methods
    }

    /// First method with the given name
    pub fn method(&self, name: &str) -> Option<&MethodShape> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.method(name).is_some()
    }

    pub fn constructor(&self) -> Option<&MethodShape> {
        self.method(CONSTRUCTOR)
    }

    /// Class this shape was generated for
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn simple_name(&self) -> &str {
        match self.name.rfind('.') {
            Some(i) => &self.name[i + 1..],
            None => &self.name,
        }
    }
}

impl fmt::Display for ClassShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        if let Some(source) = &self.source {
            writeln!(out, "// generated from {source}")?;
        }
        write!(out, "{}class {}", modifier_keywords(self.flags), self.name)?;
        if let Some(super_class) = &self.super_class {
            write!(out, " extends {super_class}")?;
        }
        if !self.interfaces.is_empty() {
            write!(out, " implements {}", self.interfaces.join(", "))?;
        }
        writeln!(out, " {{")?;
        for field in &self.fields {
            writeln!(out, "    {}{} {};", modifier_keywords(field.flags), field.ty, field.name)?;
        }
        for method in &self.methods {
            writeln!(out)?;
            method.render(&mut out, self.simple_name())?;
        }
        out.push_str("}\n");
        f.write_str(&out)
    }
}

/// Builder for [`ClassShape`]
#[derive(Debug, Clone)]
pub struct ClassShapeBuilder {
    shape: ClassShape,
}

impl ClassShapeBuilder {
    pub fn modifiers(mut self, flags: Modifiers) -> Self {
        self.shape.flags = flags;
        self
    }

    pub fn extends(mut self, super_class: impl Into<String>) -> Self {
        self.shape.super_class = Some(super_class.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.shape.interfaces.push(interface.into());
        self
    }

    pub fn field(mut self, field: FieldShape) -> Self {
        self.shape.fields.push(field);
        self
    }

    pub fn method(mut self, method: MethodShape) -> Self {
        self.shape.methods.push(method);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.shape.source = Some(source.into());
        self
    }

    /// Append to the fields and methods while building in steps
    pub fn push_field(&mut self, field: FieldShape) {
        self.shape.fields.push(field);
    }

    pub fn push_method(&mut self, method: MethodShape) {
        self.shape.methods.push(method);
    }

    pub fn build(self) -> ClassShape {
        self.shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_listing() {
        let shape = ClassShape::builder("a.Foo_Bean")
            .implements("arc.InjectableBean")
            .source("a.Foo")
            .field(FieldShape::new("delegate", "a.Foo"))
            .method(
                MethodShape::constructor()
                    .param("delegate", "a.Foo")
                    .stmt(Stmt::assign(Expr::this_field("delegate"), Expr::local("delegate"))),
            )
            .method(
                MethodShape::new("get")
                    .returns("java.lang.Object")
                    .stmt(Stmt::if_then(
                        Expr::this_field("delegate").is_null(),
                        vec![Stmt::Throw(Expr::new_instance("java.lang.IllegalStateException", []))],
                    ))
                    .stmt(Stmt::ret(Expr::this_field("delegate").invoke("toString", []))),
            )
            .build();
        let listing = shape.to_string();
        assert!(listing.starts_with("// generated from a.Foo\npublic final class a.Foo_Bean implements arc.InjectableBean {"));
        assert!(listing.contains("    private final a.Foo delegate;"));
        assert!(listing.contains("    public Foo_Bean(a.Foo delegate) {\n        this.delegate = delegate;\n    }"));
        assert!(listing.contains("        if (this.delegate == null) {\n            throw new java.lang.IllegalStateException();\n        }"));
        assert!(listing.contains("return this.delegate.toString();"));
        assert!(shape.constructor().is_some());
        assert!(shape.has_method("get"));
    }

    #[test]
    fn test_expression_rendering() {
        let expr = Expr::invoke_static("a.Util", "of", [Expr::string("x\"y"), Expr::Int(3), Expr::Null]);
        assert_eq!(expr.to_string(), r#"a.Util.of("x\"y", 3, null)"#);
        let lambda = Expr::lambda(["ctx"], Expr::local("ctx").invoke("get", []));
        assert_eq!(lambda.to_string(), "(ctx) -> ctx.get()");
        assert_eq!(Expr::array("int", [Expr::Int(1), Expr::Int(2)]).to_string(), "new int[]{1, 2}");
        assert_eq!(Expr::local("o").cast("a.Foo").to_string(), "((a.Foo) o)");
    }
}
