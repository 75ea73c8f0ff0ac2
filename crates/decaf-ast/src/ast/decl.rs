//! Declaration nodes: classes, fields, methods, formals and local variables.

use decaf_core::{PrimitiveKind, Span, Visibility};

use super::StmtId;

/// A name with the location it was written at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// A type as written in a declaration, before class names are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeName {
    Primitive(PrimitiveKind),
    Class(String),
}

/// A type annotation with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr {
    pub name: TypeName,
    pub span: Span,
}

impl TypeExpr {
    /// Classify a type spelling: primitive keywords (and their aliases) or a class name.
    pub fn parse(name: &str, span: Span) -> Self {
        let name = match PrimitiveKind::from_name(name) {
            Some(kind) => TypeName::Primitive(kind),
            None => TypeName::Class(name.to_string()),
        };
        Self { name, span }
    }

    pub fn is_void(&self) -> bool {
        self.name == TypeName::Primitive(PrimitiveKind::Void)
    }
}

impl std::fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            TypeName::Primitive(kind) => write!(f, "{}", kind),
            TypeName::Class(name) => f.write_str(name),
        }
    }
}

/// `class Name [extends Parent] { fields methods }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub parent: Option<Ident>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub span: Span,
}

/// A field declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub visibility: Visibility,
    pub is_static: bool,
    pub span: Span,
}

/// A method declaration; `body` is always a `Block` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub return_type: TypeExpr,
    pub params: Vec<Formal>,
    pub body: StmtId,
    pub visibility: Visibility,
    pub is_static: bool,
    pub span: Span,
}

impl MethodDecl {
    /// Mark the method `static`.
    pub fn into_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Mark the method `private`.
    pub fn into_private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }
}

impl FieldDecl {
    pub fn into_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn into_private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }
}

/// A formal parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Formal {
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

/// A local variable declared by a `VarDeclStmt`.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_expr_classifies_names() {
        let int = TypeExpr::parse("int", Span::new(1, 1));
        assert_eq!(int.name, TypeName::Primitive(PrimitiveKind::Int));

        let class = TypeExpr::parse("Animal", Span::new(1, 1));
        assert_eq!(class.name, TypeName::Class("Animal".into()));
        assert_eq!(class.to_string(), "Animal");

        assert!(TypeExpr::parse("void", Span::default()).is_void());
    }
}
