//! Decaf Registry crate.
//!
//! The symbol graph of one compilation unit. Every descriptor and scope is
//! created during resolution, read during type checking, and read again by
//! the code generator; nothing here outlives the [`SymbolRegistry`] that owns it.

pub mod entries;
pub mod inheritance;
pub mod registry;
pub mod scope;

pub use entries::{ClassEntry, FieldEntry, MethodEntry, StorageClass, VariableEntry};
pub use inheritance::InheritanceGraph;
pub use registry::{Ancestors, SymbolRegistry};
pub use scope::{Scope, ScopeKind, ScopeTree, Symbol};
