//! Resolution Pass (Pass 3) - bind names in method bodies.
//!
//! Walks every method body with an explicit work stack, opening a block scope
//! for each nested `Block` and each `For`, registering locals as their
//! declarations are reached, and binding `Identifier` and `New` expressions.
//!
//! The body's outermost block shares the method scope with the formals, so a
//! top-level local may not reuse a parameter name; nested blocks may shadow.
//!
//! Member names after a `.` are left to the type checker, which needs the
//! receiver's static type to look them up.

use decaf_ast::{ExprId, ExprKind, Program, StmtId, StmtKind};
use decaf_core::{CompilationError, DataType, MethodId, ScopeId, VarId};
use decaf_registry::{StorageClass, Symbol, SymbolRegistry, VariableEntry};

use crate::annotations::{Bindings, MethodSource};
use crate::type_resolver::TypeResolver;

/// Output of the resolution pass.
#[derive(Debug, Default)]
pub struct ResolutionOutput {
    pub bindings: Bindings,
    pub errors: Vec<CompilationError>,
}

/// Pending work for one method body.
enum Task {
    /// A statement resolved in `scope`.
    Stmt(StmtId, ScopeId),
    /// An expression resolved in `scope`.
    Expr(ExprId, ScopeId),
}

/// Resolution Pass - locals and identifier bindings.
pub struct ResolutionPass<'a> {
    program: &'a Program,
    registry: &'a mut SymbolRegistry,
    methods: &'a [MethodSource],
}

impl<'a> ResolutionPass<'a> {
    pub fn new(
        program: &'a Program,
        registry: &'a mut SymbolRegistry,
        methods: &'a [MethodSource],
    ) -> Self {
        Self {
            program,
            registry,
            methods,
        }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self) -> ResolutionOutput {
        let mut output = ResolutionOutput {
            bindings: Bindings::with_method_count(self.methods.len()),
            errors: Vec::new(),
        };

        let program = self.program;
        for (index, source) in self.methods.iter().enumerate() {
            let decl = &program.classes[source.class].methods[source.method];
            self.resolve_body(MethodId::from_index(index), decl.body, &mut output);
        }

        log::debug!(
            "resolution: {} bindings, {} errors",
            output.bindings.binding_count(),
            output.errors.len()
        );
        output
    }

    fn resolve_body(&mut self, method: MethodId, body: StmtId, output: &mut ResolutionOutput) {
        let method_scope = self.registry.method(method).scope;

        // The outermost block reuses the method scope instead of opening one.
        let mut stack = Vec::new();
        match &self.program.stmt(body).kind {
            StmtKind::Block(stmts) => {
                stack.extend(stmts.iter().rev().map(|&s| Task::Stmt(s, method_scope)));
            }
            _ => stack.push(Task::Stmt(body, method_scope)),
        }

        while let Some(task) = stack.pop() {
            match task {
                Task::Stmt(stmt, scope) => self.resolve_stmt(method, stmt, scope, &mut stack, output),
                Task::Expr(expr, scope) => self.resolve_expr(method, expr, scope, &mut stack, output),
            }
        }
    }

    // ==========================================================================
    // Statements
    // ==========================================================================

    fn resolve_stmt(
        &mut self,
        method: MethodId,
        id: StmtId,
        scope: ScopeId,
        stack: &mut Vec<Task>,
        output: &mut ResolutionOutput,
    ) {
        let program = self.program;
        let stmt = program.stmt(id);
        // Children are pushed in reverse so they pop in source order; a local
        // is only visible to statements after its declaration.
        match &stmt.kind {
            StmtKind::Block(stmts) => {
                let inner = self.registry.push_block_scope(scope);
                stack.extend(stmts.iter().rev().map(|&s| Task::Stmt(s, inner)));
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if let Some(else_branch) = else_branch {
                    stack.push(Task::Stmt(*else_branch, scope));
                }
                stack.push(Task::Stmt(*then_branch, scope));
                stack.push(Task::Expr(*cond, scope));
            }
            StmtKind::While { cond, body } => {
                stack.push(Task::Stmt(*body, scope));
                stack.push(Task::Expr(*cond, scope));
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                let inner = self.registry.push_block_scope(scope);
                stack.push(Task::Stmt(*body, inner));
                if let Some(update) = update {
                    stack.push(Task::Stmt(*update, inner));
                }
                if let Some(cond) = cond {
                    stack.push(Task::Expr(*cond, inner));
                }
                if let Some(init) = init {
                    stack.push(Task::Stmt(*init, inner));
                }
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    stack.push(Task::Expr(*value, scope));
                }
            }
            StmtKind::Expr(expr) | StmtKind::Print(expr) => stack.push(Task::Expr(*expr, scope)),
            StmtKind::Assign { target, value } => {
                stack.push(Task::Expr(*value, scope));
                stack.push(Task::Expr(*target, scope));
            }
            StmtKind::VarDecl(vars) => {
                for var in vars {
                    let ty = match TypeResolver::new(self.registry).resolve(&var.ty) {
                        Ok(ty) => ty,
                        Err(error) => {
                            output.errors.push(error);
                            // Placeholder; the phase fails so it is never checked.
                            DataType::Null
                        }
                    };
                    let index = output.bindings.locals(method).len() as u32;
                    let entry = VariableEntry {
                        id: VarId::new(0),
                        name: var.name.clone(),
                        ty,
                        method,
                        storage: StorageClass::Local(index),
                        span: var.span,
                    };
                    match self.registry.register_variable(scope, entry) {
                        Ok(var_id) => {
                            output.bindings.declare(id, var_id);
                            output.bindings.add_local(method, var_id);
                        }
                        Err(_) => output.errors.push(CompilationError::DuplicateDeclaration {
                            name: var.name.clone(),
                            scope: format!("method '{}'", self.registry.method_path(method)),
                            span: var.span,
                        }),
                    }
                }
            }
            StmtKind::Break | StmtKind::Continue | StmtKind::Skip => {}
        }
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    fn resolve_expr(
        &mut self,
        method: MethodId,
        id: ExprId,
        scope: ScopeId,
        stack: &mut Vec<Task>,
        output: &mut ResolutionOutput,
    ) {
        let program = self.program;
        let expr = program.expr(id);
        match &expr.kind {
            ExprKind::Identifier(name) => match self.registry.lookup(scope, name) {
                Some(symbol) => output.bindings.bind(id, symbol),
                None => output.errors.push(CompilationError::UndeclaredIdentifier {
                    name: name.clone(),
                    span: expr.span,
                }),
            },
            ExprKind::This => {
                if self.registry.method(method).is_static {
                    output.errors.push(CompilationError::InvalidReceiver {
                        keyword: "this",
                        reason: "cannot be used in a static method",
                        span: expr.span,
                    });
                }
            }
            ExprKind::Super => {
                let entry = self.registry.method(method);
                let reason = if entry.is_static {
                    Some("cannot be used in a static method")
                } else if self.registry.class(entry.owner).parent.is_none() {
                    Some("cannot be used in a class without a parent")
                } else {
                    None
                };
                if let Some(reason) = reason {
                    output.errors.push(CompilationError::InvalidReceiver {
                        keyword: "super",
                        reason,
                        span: expr.span,
                    });
                }
            }
            ExprKind::New { class } => match self.registry.class_by_name(class) {
                Some(class_id) => output.bindings.bind(id, Symbol::Class(class_id)),
                None => output.errors.push(CompilationError::UnknownType {
                    name: class.clone(),
                    span: expr.span,
                }),
            },
            _ => stack.extend(expr.children().into_iter().rev().map(|c| Task::Expr(c, scope))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::{MemberPass, RegistrationPass};
    use decaf_ast::{BinaryOp, ProgramBuilder};
    use decaf_core::ErrorKind;

    fn run(program: &Program) -> (SymbolRegistry, ResolutionOutput) {
        let mut registry = SymbolRegistry::new();
        let registration = RegistrationPass::new(program, &mut registry).run();
        let members = MemberPass::new(
            program,
            &mut registry,
            &registration.class_ids,
            &registration.order,
        )
        .run();
        assert!(members.errors.is_empty(), "{:?}", members.errors);
        let output = ResolutionPass::new(program, &mut registry, &members.methods).run();
        (registry, output)
    }

    #[test]
    fn binds_locals_params_fields_and_classes() {
        let mut b = ProgramBuilder::new();
        let decl = b.var("total", "int");
        let total = b.ident("total");
        let n = b.ident("n");
        let count = b.ident("count");
        let sum = b.binary(BinaryOp::Add, n, count);
        let assign = b.assign(total, sum);
        let obj = b.new_object("Counter");
        let keep = b.expr_stmt(obj);
        let body = b.block(vec![decl, assign, keep]);
        let add = b.method("add", "void", &[("n", "int")], body);
        let field = b.field("count", "int");
        b.class("Counter", None, vec![field], vec![add]);
        let program = b.finish();

        let (registry, output) = run(&program);
        assert!(output.errors.is_empty(), "{:?}", output.errors);

        let Some(Symbol::Variable(var)) = output.bindings.symbol(total) else {
            panic!("total should bind to a variable");
        };
        assert_eq!(registry.variable(var).storage, StorageClass::Local(0));
        assert_eq!(output.bindings.declarations(decl), &[var]);

        let Some(Symbol::Variable(param)) = output.bindings.symbol(n) else {
            panic!("n should bind to a parameter");
        };
        assert!(registry.variable(param).is_parameter());
        assert!(matches!(output.bindings.symbol(count), Some(Symbol::Field(_))));
        assert!(matches!(output.bindings.symbol(obj), Some(Symbol::Class(_))));
    }

    #[test]
    fn inherited_field_resolves_through_parent_scope() {
        let mut b = ProgramBuilder::new();
        let name = b.field("name", "string");
        b.class("Animal", None, vec![name], vec![]);
        let use_name = b.ident("name");
        let print = b.print(use_name);
        let body = b.block(vec![print]);
        let speak = b.method("speak", "void", &[], body);
        b.class("Dog", Some("Animal"), vec![], vec![speak]);
        let program = b.finish();

        let (registry, output) = run(&program);
        assert!(output.errors.is_empty());
        let Some(Symbol::Field(field)) = output.bindings.symbol(use_name) else {
            panic!("name should bind to the inherited field");
        };
        assert_eq!(registry.class(registry.field(field).owner).name, "Animal");
    }

    #[test]
    fn undeclared_identifier_names_variable_and_line() {
        let mut b = ProgramBuilder::new();
        b.at(4, 9);
        let ghost = b.ident("ghost");
        let print = b.print(ghost);
        let body = b.block(vec![print]);
        let main = b.method("main", "void", &[], body);
        b.class("Main", None, vec![], vec![main]);
        let program = b.finish();

        let (_, output) = run(&program);
        assert_eq!(output.errors.len(), 1);
        let err = &output.errors[0];
        assert_eq!(err.kind(), ErrorKind::ResolutionError);
        assert_eq!(err.span().line, 4);
        assert!(err.to_string().contains("'ghost'"));
    }

    #[test]
    fn use_before_declaration_is_undeclared() {
        let mut b = ProgramBuilder::new();
        let x = b.ident("x");
        let one = b.int(1);
        let assign = b.assign(x, one);
        let decl = b.var("x", "int");
        let body = b.block(vec![assign, decl]);
        let main = b.method("main", "void", &[], body);
        b.class("Main", None, vec![], vec![main]);
        let program = b.finish();

        let (_, output) = run(&program);
        assert_eq!(output.errors.len(), 1);
        assert!(matches!(output.errors[0], CompilationError::UndeclaredIdentifier { .. }));
    }

    #[test]
    fn parameter_redeclared_at_top_level_but_shadowed_in_block() {
        let mut b = ProgramBuilder::new();
        let inner = b.var("n", "double");
        let nested = b.block(vec![inner]);
        let outer = b.var("n", "int");
        let body = b.block(vec![nested, outer]);
        let m = b.method("m", "void", &[("n", "int")], body);
        b.class("A", None, vec![], vec![m]);
        let program = b.finish();

        let (_, output) = run(&program);
        assert_eq!(output.errors.len(), 1);
        assert!(matches!(output.errors[0], CompilationError::DuplicateDeclaration { .. }));
        assert_eq!(output.bindings.locals(MethodId::new(0)).len(), 1);
    }

    #[test]
    fn for_scope_ends_with_the_loop() {
        let mut b = ProgramBuilder::new();
        let init = b.var("i", "int");
        let i = b.ident("i");
        let ten = b.int(10);
        let cond = b.binary(BinaryOp::Less, i, ten);
        let skip = b.skip();
        let body = b.block(vec![skip]);
        let for_stmt = b.for_stmt(Some(init), Some(cond), None, body);
        let after = b.ident("i");
        let print = b.print(after);
        let method_body = b.block(vec![for_stmt, print]);
        let main = b.method("main", "void", &[], method_body);
        b.class("Main", None, vec![], vec![main]);
        let program = b.finish();

        let (_, output) = run(&program);
        assert!(matches!(output.bindings.symbol(i), Some(Symbol::Variable(_))));
        assert_eq!(output.errors.len(), 1);
        assert_eq!(output.bindings.symbol(after), None);
    }

    #[test]
    fn receiver_keywords_in_invalid_contexts() {
        let mut b = ProgramBuilder::new();
        let this = b.this();
        let print_this = b.print(this);
        let body = b.block(vec![print_this]);
        let helper = b.method("helper", "void", &[], body).into_static();
        let sup = b.super_ref();
        let call = b.call(Some(sup), "run", vec![]);
        let stmt = b.expr_stmt(call);
        let body = b.block(vec![stmt]);
        let run_m = b.method("run", "void", &[], body);
        b.class("Root", None, vec![], vec![helper, run_m]);
        let program = b.finish();

        let (_, output) = run(&program);
        let messages: Vec<_> = output.errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "'this' cannot be used in a static method",
                "'super' cannot be used in a class without a parent",
            ]
        );
    }

    #[test]
    fn unknown_class_in_new_and_local_type() {
        let mut b = ProgramBuilder::new();
        let decl = b.var("g", "Ghost");
        let obj = b.new_object("Phantom");
        let stmt = b.expr_stmt(obj);
        let body = b.block(vec![decl, stmt]);
        let main = b.method("main", "void", &[], body);
        b.class("Main", None, vec![], vec![main]);
        let program = b.finish();

        let (_, output) = run(&program);
        assert_eq!(output.errors.len(), 2);
        assert!(output.errors.iter().all(|e| matches!(e, CompilationError::UnknownType { .. })));
    }
}
