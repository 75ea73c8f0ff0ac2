//! Primitive type kinds for Decaf's built-in value types.

use std::fmt;

/// Primitive type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Void,
    Bool,
    Int,
    Double,
    String,
}

impl PrimitiveKind {
    /// Get the source spelling of this primitive type.
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Void => "void",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Double => "double",
            PrimitiveKind::String => "string",
        }
    }

    /// Parse a type keyword, accepting the `boolean` and `float` aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "void" => Some(PrimitiveKind::Void),
            "bool" | "boolean" => Some(PrimitiveKind::Bool),
            "int" => Some(PrimitiveKind::Int),
            "double" | "float" => Some(PrimitiveKind::Double),
            "string" | "String" => Some(PrimitiveKind::String),
            _ => None,
        }
    }

    /// Check if this is `int` or `double`.
    pub const fn is_numeric(self) -> bool {
        matches!(self, PrimitiveKind::Int | PrimitiveKind::Double)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_accepts_aliases() {
        assert_eq!(PrimitiveKind::from_name("boolean"), Some(PrimitiveKind::Bool));
        assert_eq!(PrimitiveKind::from_name("float"), Some(PrimitiveKind::Double));
        assert_eq!(PrimitiveKind::from_name("String"), Some(PrimitiveKind::String));
        assert_eq!(PrimitiveKind::from_name("Animal"), None);
    }

    #[test]
    fn numeric_kinds() {
        assert!(PrimitiveKind::Int.is_numeric());
        assert!(PrimitiveKind::Double.is_numeric());
        assert!(!PrimitiveKind::Bool.is_numeric());
        assert!(!PrimitiveKind::String.is_numeric());
    }
}
