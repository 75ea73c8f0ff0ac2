//! Resolution passes.
//!
//! - **Pass 1 ([`RegistrationPass`])**: register class names, resolve parents,
//!   reject unknown parents and inheritance cycles.
//! - **Pass 2 ([`MemberPass`])**: register fields, methods and formals
//!   parents-first, check overrides, lay out vtable slots.
//! - **Pass 3 ([`ResolutionPass`])**: open block scopes, register locals and
//!   bind every identifier in every method body.
//!
//! All three run before the resolution phase reports; their errors are
//! collected together.

mod members;
mod registration;
mod resolution;

pub use members::{MemberOutput, MemberPass};
pub use registration::{RegistrationOutput, RegistrationPass};
pub use resolution::{ResolutionOutput, ResolutionPass};
