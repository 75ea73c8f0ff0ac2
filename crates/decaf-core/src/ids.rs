//! Index types for the symbol graph.
//!
//! Every descriptor created during resolution lives in a `Vec` owned by the
//! compilation unit's registry; these newtypes are the indices into them.
//! They are plain `u32`s so descriptors can refer to each other (a class to
//! its parent, a scope to its enclosing scope) without shared ownership.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Create an id from a raw index.
            #[inline]
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            /// Create an id from a `Vec` position.
            #[inline]
            pub fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            /// Get the underlying index.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identifies a class descriptor.
    ClassId,
    "class_"
);
define_id!(
    /// Identifies a field descriptor.
    FieldId,
    "field_"
);
define_id!(
    /// Identifies a method descriptor.
    MethodId,
    "method_"
);
define_id!(
    /// Identifies a parameter or local variable descriptor.
    VarId,
    "var_"
);
define_id!(
    /// Identifies a scope in the scope tree.
    ScopeId,
    "scope_"
);
