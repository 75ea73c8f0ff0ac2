//! Type resolution for converting AST type annotations to semantic [`DataType`]s.

use decaf_ast::{TypeExpr, TypeName};
use decaf_core::{CompilationError, DataType};
use decaf_registry::SymbolRegistry;

/// Resolves AST type annotations against the registered classes.
pub struct TypeResolver<'reg> {
    registry: &'reg SymbolRegistry,
}

impl<'reg> TypeResolver<'reg> {
    pub fn new(registry: &'reg SymbolRegistry) -> Self {
        Self { registry }
    }

    /// Resolve a type annotation.
    ///
    /// Class names must be registered; anything else is an unknown type.
    pub fn resolve(&self, ty: &TypeExpr) -> Result<DataType, CompilationError> {
        match &ty.name {
            TypeName::Primitive(kind) => Ok(DataType::Primitive(*kind)),
            TypeName::Class(name) => self
                .registry
                .class_by_name(name)
                .map(DataType::Class)
                .ok_or_else(|| CompilationError::UnknownType {
                    name: name.clone(),
                    span: ty.span,
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decaf_core::{ErrorKind, Span};

    #[test]
    fn resolves_primitives_and_classes() {
        let mut registry = SymbolRegistry::new();
        let animal = registry.register_class("Animal", None, Span::default()).unwrap();
        let resolver = TypeResolver::new(&registry);

        let int = TypeExpr::parse("int", Span::new(1, 1));
        assert_eq!(resolver.resolve(&int), Ok(DataType::int()));

        let class = TypeExpr::parse("Animal", Span::new(1, 1));
        assert_eq!(resolver.resolve(&class), Ok(DataType::Class(animal)));
    }

    #[test]
    fn unknown_class_is_resolution_error() {
        let registry = SymbolRegistry::new();
        let resolver = TypeResolver::new(&registry);
        let err = resolver
            .resolve(&TypeExpr::parse("Ghost", Span::new(4, 7)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResolutionError);
        assert_eq!(err.span(), Span::new(4, 7));
    }
}
