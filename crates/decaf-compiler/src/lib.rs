//! Decaf Compiler
//!
//! The middle-end and back-end of the Decaf compiler: it takes a parsed
//! [`Program`] and produces a textual listing for the register abstract
//! machine.
//!
//! ## Architecture
//!
//! - **Resolution**: register classes, members and locals and bind every
//!   identifier ([`passes`])
//! - **Type checking**: type every expression and check the typing rules
//!   ([`typecheck`])
//! - **Code generation**: lay out objects and frames, then lower every
//!   method to instructions ([`codegen`])
//!
//! Each phase collects all of its errors. A phase that reports any error
//! stops the pipeline, so later phases only ever see consistent input.
//!
//! ## Modules
//!
//! - [`annotations`]: side tables that map AST nodes to symbols and types
//! - [`asm`]: abstract-machine instructions and the listing
//! - [`codegen`]: layouts, frames, register pool and lowering
//! - [`emit`]: instruction buffer, labels and loop jump targets
//! - [`options`]: compiler configuration
//! - [`passes`]: resolution passes
//! - [`type_resolver`]: type annotations to [`DataType`](decaf_core::DataType)s
//! - [`typecheck`]: static type checking

pub mod annotations;
pub mod asm;
pub mod codegen;
pub mod emit;
pub mod options;
pub mod passes;
pub mod type_resolver;
pub mod typecheck;

pub use annotations::{Bindings, CallTarget, Dispatch, MethodSource, TypeTable};
pub use asm::{Instruction, Listing, PrintKind, Reg};
pub use codegen::{CodeGenerator, CodegenOutput};
pub use options::CompilerOptions;
pub use passes::{MemberPass, RegistrationPass, ResolutionPass};
pub use type_resolver::TypeResolver;
pub use typecheck::{ReturnChecker, TypeCheckOutput, TypeChecker};

pub use decaf_core::{CompilationError, Diagnostics};

use decaf_ast::Program;
use decaf_registry::SymbolRegistry;
use log::debug;

/// The main compiler entry point.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompilerOptions,
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile a program to a listing.
    ///
    /// Returns the diagnostics of the first phase that reported errors, in
    /// source order.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(&self, program: &Program) -> Result<Listing, Diagnostics> {
        let mut registry = SymbolRegistry::new();

        let registration = RegistrationPass::new(program, &mut registry).run();
        let mut errors = registration.errors;
        let members = MemberPass::new(
            program,
            &mut registry,
            &registration.class_ids,
            &registration.order,
        )
        .run();
        errors.extend(members.errors);
        // Bodies of a program with a broken class graph are not resolved.
        let resolution = if errors.is_empty() {
            let resolution = ResolutionPass::new(program, &mut registry, &members.methods).run();
            errors.extend(resolution.errors);
            Some(resolution.bindings)
        } else {
            None
        };
        debug!(
            "resolution: {} classes, {} methods, {} errors",
            registry.class_count(),
            members.methods.len(),
            errors.len()
        );
        let bindings = match resolution {
            Some(bindings) if errors.is_empty() => bindings,
            _ => return Err(diagnostics(errors)),
        };

        let checked = TypeChecker::new(program, &registry, &bindings, &members.methods).run();
        debug!(
            "type check: {} typed expressions, {} errors",
            checked.types.typed_count(),
            checked.errors.len()
        );
        if !checked.errors.is_empty() {
            return Err(diagnostics(checked.errors));
        }

        let output = CodeGenerator::new(
            program,
            &registry,
            &bindings,
            &checked.types,
            &members.methods,
            &registration.order,
            &self.options,
        )
        .run();
        debug!(
            "codegen: {} instructions, {} errors",
            output.listing.len(),
            output.errors.len()
        );
        if !output.errors.is_empty() {
            return Err(diagnostics(output.errors));
        }
        Ok(output.listing)
    }
}

fn diagnostics(mut errors: Vec<CompilationError>) -> Diagnostics {
    errors.sort_by_key(CompilationError::span);
    errors.into_iter().collect()
}
