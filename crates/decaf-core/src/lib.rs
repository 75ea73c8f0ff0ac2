//! Decaf Core crate.
//!
//! Definitions shared by every stage of the Decaf compiler:
//!
//! - [`Span`]: source locations carried by every AST node and diagnostic
//! - [`ClassId`], [`FieldId`], [`MethodId`], [`VarId`], [`ScopeId`]: indices into the symbol graph
//! - [`DataType`] and [`PrimitiveKind`]: the static types of the language
//! - [`Visibility`]: member access modifiers
//! - [`CompilationError`] and [`ErrorKind`]: semantic errors raised by the core passes
//! - [`Diagnostic`] and [`Diagnostics`]: the line-oriented report a failing phase surfaces

pub mod diagnostics;
pub mod error;
pub mod ids;
pub mod span;
pub mod types;

pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{CompilationError, ErrorKind};
pub use ids::{ClassId, FieldId, MethodId, ScopeId, VarId};
pub use span::Span;
pub use types::{DataType, PrimitiveKind, Visibility};
