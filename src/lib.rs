//! Decaf
//!
//! Compiles a parsed Decaf program, handed over as a JSON syntax tree, to a
//! textual listing for the register abstract machine.
//!
//! ```ignore
//! use decaf::Unit;
//!
//! let unit = Unit::from_json(&std::fs::read_to_string("hello.json")?)?;
//! match unit.build() {
//!     Ok(artifact) => artifact.write_to("hello.ami")?,
//!     Err(diagnostics) => eprintln!("{}", diagnostics),
//! }
//! ```
//!
//! The pipeline lives in the workspace crates and is re-exported here:
//!
//! - [`decaf_core`]: spans, ids, types, errors and diagnostics
//! - [`decaf_ast`]: the syntax tree and its JSON ingestion boundary
//! - [`decaf_registry`]: classes, members, scopes and inheritance
//! - [`decaf_compiler`]: resolution, type checking and code generation

pub mod error;
pub mod unit;

pub use error::DecafError;
pub use unit::{Artifact, Unit};

pub use decaf_ast::{IngestError, Program, ProgramBuilder};
pub use decaf_compiler::{Compiler, CompilerOptions, Listing};
pub use decaf_core::{CompilationError, Diagnostic, Diagnostics, ErrorKind, Span};
pub use decaf_registry::SymbolRegistry;
