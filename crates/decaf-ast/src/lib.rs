//! Decaf AST crate.
//!
//! The closed set of node kinds the compiler core accepts, stored in flat
//! arenas and addressed by [`ExprId`] and [`StmtId`]. Trees arrive from the
//! external parser as JSON and are validated once by [`ingest`]; tests and
//! in-process front ends build them directly with [`ProgramBuilder`].
//!
//! # Example
//!
//! ```
//! use decaf_ast::ProgramBuilder;
//!
//! let mut b = ProgramBuilder::new();
//! let hello = b.string("hello");
//! let print = b.print(hello);
//! let body = b.block(vec![print]);
//! let main = b.method("main", "void", &[], body);
//! b.class("Main", None, vec![], vec![main]);
//! let program = b.finish();
//!
//! assert_eq!(program.classes.len(), 1);
//! ```

pub mod ast;
pub mod builder;
pub mod ingest;

pub use ast::*;
pub use builder::ProgramBuilder;
pub use ingest::{IngestError, from_json, from_value};
