//! Static type checking.
//!
//! [`TypeChecker`] runs after resolution succeeds. It computes the static
//! type of every expression, resolves member names against the receiver's
//! static type, checks operator, assignment, call, return and condition rules
//! and verifies that non-void methods return on every path.
//!
//! Results land in a [`TypeTable`]; the code generator relies on it for
//! operand types, field ids and call dispatch.
//!
//! Expressions are checked bottom-up and statements top-down, both with
//! explicit work stacks so nesting depth is limited by memory, not the call
//! stack. An expression that failed to check yields no type, which silences
//! the errors its parents would otherwise repeat.

mod expr;
mod return_checker;
mod stmt;

pub use return_checker::ReturnChecker;

use decaf_ast::Program;
use decaf_core::{ClassId, CompilationError, DataType, MethodId};
use decaf_registry::SymbolRegistry;

use crate::annotations::{Bindings, MethodSource, TypeTable};

/// Output of the type checker.
#[derive(Debug, Default)]
pub struct TypeCheckOutput {
    pub types: TypeTable,
    pub errors: Vec<CompilationError>,
}

/// The method whose body is being checked.
#[derive(Debug, Clone, Copy)]
struct MethodContext {
    method: MethodId,
    class: ClassId,
    is_static: bool,
    return_type: DataType,
}

/// What an expression denotes.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ExprInfo {
    /// A value of this type (possibly `void` for calls).
    Value(DataType),
    /// A class name; only usable as a receiver for static members.
    ClassRef(ClassId),
    /// `super`; only usable as a receiver. Holds the parent class.
    Super(ClassId),
}

/// Type checker over every method body of a resolved program.
pub struct TypeChecker<'a> {
    program: &'a Program,
    registry: &'a SymbolRegistry,
    bindings: &'a Bindings,
    methods: &'a [MethodSource],
    types: TypeTable,
    errors: Vec<CompilationError>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(
        program: &'a Program,
        registry: &'a SymbolRegistry,
        bindings: &'a Bindings,
        methods: &'a [MethodSource],
    ) -> Self {
        Self {
            program,
            registry,
            bindings,
            methods,
            types: TypeTable::with_expr_count(program.expr_count()),
            errors: Vec::new(),
        }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self) -> TypeCheckOutput {
        let program = self.program;
        // Declaration order, so diagnostics follow the source rather than the
        // parents-first registration order.
        let mut methods: Vec<_> = self
            .methods
            .iter()
            .enumerate()
            .map(|(index, &source)| (source, MethodId::from_index(index)))
            .collect();
        methods.sort_by_key(|(source, _)| (source.class, source.method));
        for (source, id) in methods {
            let entry = self.registry.method(id);
            let ctx = MethodContext {
                method: id,
                class: entry.owner,
                is_static: entry.is_static,
                return_type: entry.return_type,
            };
            let decl = &program.classes[source.class].methods[source.method];

            self.check_body(&ctx, decl.body);

            if !ctx.return_type.is_void() && ReturnChecker::new(program).can_complete(decl.body) {
                self.errors.push(CompilationError::MissingReturn {
                    method: self.registry.method_path(id),
                    expected: self.registry.type_name(ctx.return_type),
                    span: decl.span,
                });
            }
        }

        log::debug!(
            "type check: {} typed expressions, {} errors",
            self.types.typed_count(),
            self.errors.len()
        );
        TypeCheckOutput {
            types: self.types,
            errors: self.errors,
        }
    }

    // ==========================================================================
    // Shared helpers
    // ==========================================================================

    fn type_name(&self, ty: DataType) -> String {
        self.registry.type_name(ty)
    }

    fn error(&mut self, error: CompilationError) {
        self.errors.push(error);
    }
}
