//! The static type computed for every expression.

use std::fmt;

use super::PrimitiveKind;
use crate::ClassId;

/// A Decaf static type.
///
/// Class types refer to their descriptor by id; rendering a class type by
/// name needs the registry, so `Display` here only prints the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// `int`, `double`, `bool`, `string` or `void`.
    Primitive(PrimitiveKind),
    /// An instance of a declared class.
    Class(ClassId),
    /// The type of the `null` literal, assignable to any class type.
    Null,
}

impl DataType {
    pub const fn void() -> Self {
        DataType::Primitive(PrimitiveKind::Void)
    }

    pub const fn int() -> Self {
        DataType::Primitive(PrimitiveKind::Int)
    }

    pub const fn double() -> Self {
        DataType::Primitive(PrimitiveKind::Double)
    }

    pub const fn bool() -> Self {
        DataType::Primitive(PrimitiveKind::Bool)
    }

    pub const fn string() -> Self {
        DataType::Primitive(PrimitiveKind::String)
    }

    pub const fn is_void(&self) -> bool {
        matches!(self, DataType::Primitive(PrimitiveKind::Void))
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, DataType::Primitive(PrimitiveKind::Bool))
    }

    /// `int` or `double`.
    pub const fn is_numeric(&self) -> bool {
        match self {
            DataType::Primitive(kind) => kind.is_numeric(),
            _ => false,
        }
    }

    /// Class types and `null`: values held as heap references.
    pub const fn is_reference(&self) -> bool {
        matches!(self, DataType::Class(_) | DataType::Null)
    }

    /// The class id if this is a class type.
    pub const fn class_id(&self) -> Option<ClassId> {
        match self {
            DataType::Class(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<PrimitiveKind> for DataType {
    fn from(kind: PrimitiveKind) -> Self {
        DataType::Primitive(kind)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Primitive(kind) => write!(f, "{}", kind),
            DataType::Class(id) => write!(f, "{}", id),
            DataType::Null => write!(f, "null"),
        }
    }
}
