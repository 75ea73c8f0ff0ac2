//! Statement checking.
//!
//! Method bodies are walked top-down with a work stack. Loop bodies are
//! bracketed by `EnterLoop`/`LeaveLoop` tasks so `break` and `continue` know
//! whether a loop encloses them.

use decaf_ast::{ExprId, ExprKind, StmtId, StmtKind};
use decaf_core::{CompilationError, Span};
use decaf_registry::Symbol;

use super::expr::printable;
use super::{ExprInfo, MethodContext, TypeChecker};

enum Task {
    Stmt(StmtId),
    EnterLoop,
    LeaveLoop,
}

impl TypeChecker<'_> {
    pub(super) fn check_body(&mut self, ctx: &MethodContext, body: StmtId) {
        let mut stack = vec![Task::Stmt(body)];
        let mut loop_depth = 0usize;

        while let Some(task) = stack.pop() {
            match task {
                Task::EnterLoop => loop_depth += 1,
                Task::LeaveLoop => loop_depth -= 1,
                Task::Stmt(id) => self.check_stmt(ctx, id, loop_depth, &mut stack),
            }
        }
    }

    fn check_stmt(
        &mut self,
        ctx: &MethodContext,
        id: StmtId,
        loop_depth: usize,
        stack: &mut Vec<Task>,
    ) {
        let program = self.program;
        let stmt = program.stmt(id);
        match &stmt.kind {
            StmtKind::Block(stmts) => stack.extend(stmts.iter().rev().map(|&s| Task::Stmt(s))),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.check_condition(ctx, "if", *cond);
                if let Some(else_branch) = else_branch {
                    stack.push(Task::Stmt(*else_branch));
                }
                stack.push(Task::Stmt(*then_branch));
            }
            StmtKind::While { cond, body } => {
                self.check_condition(ctx, "while", *cond);
                stack.extend([Task::LeaveLoop, Task::Stmt(*body), Task::EnterLoop]);
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                if let Some(cond) = cond {
                    self.check_condition(ctx, "for", *cond);
                }
                stack.push(Task::LeaveLoop);
                if let Some(update) = update {
                    stack.push(Task::Stmt(*update));
                }
                stack.extend([Task::Stmt(*body), Task::EnterLoop]);
                if let Some(init) = init {
                    stack.push(Task::Stmt(*init));
                }
            }
            StmtKind::Return(value) => self.check_return(ctx, *value, stmt.span),
            StmtKind::Expr(expr) => {
                let info = self.check_expr(ctx, *expr);
                // A call to a void method is a fine statement.
                if !matches!(info, Some(ExprInfo::Value(_))) {
                    self.value(*expr, info);
                }
            }
            StmtKind::Assign { target, value } => self.check_assign(ctx, *target, *value),
            StmtKind::VarDecl(_) | StmtKind::Skip => {}
            StmtKind::Print(value) => {
                if let Some(ty) = self.check_value(ctx, *value)
                    && printable(ty).is_none()
                {
                    self.error(CompilationError::PrintType {
                        found: self.type_name(ty),
                        span: program.expr(*value).span,
                    });
                }
            }
            StmtKind::Break | StmtKind::Continue if loop_depth == 0 => {
                let keyword = if matches!(stmt.kind, StmtKind::Break) {
                    "break"
                } else {
                    "continue"
                };
                self.error(CompilationError::OutsideLoop {
                    keyword,
                    span: stmt.span,
                });
            }
            StmtKind::Break | StmtKind::Continue => {}
        }
    }

    fn check_condition(&mut self, ctx: &MethodContext, construct: &'static str, cond: ExprId) {
        if let Some(ty) = self.check_value(ctx, cond)
            && !ty.is_bool()
        {
            self.error(CompilationError::NonBoolCondition {
                construct,
                found: self.type_name(ty),
                span: self.program.expr(cond).span,
            });
        }
    }

    fn check_return(&mut self, ctx: &MethodContext, value: Option<ExprId>, span: Span) {
        let path = self.registry.method_path(ctx.method);
        let expected = ctx.return_type;
        match value {
            Some(value) if expected.is_void() => {
                self.check_expr(ctx, value);
                self.error(CompilationError::ReturnMismatch {
                    message: format!("void method '{}' cannot return a value", path),
                    span,
                });
            }
            Some(value) => {
                let Some(found) = self.check_value(ctx, value) else {
                    return;
                };
                if !self.registry.is_assignable(found, expected) {
                    self.error(CompilationError::ReturnMismatch {
                        message: format!(
                            "cannot return '{}' from method '{}' declared to return '{}'",
                            self.type_name(found),
                            path,
                            self.type_name(expected)
                        ),
                        span,
                    });
                }
            }
            None if !expected.is_void() => {
                self.error(CompilationError::ReturnMismatch {
                    message: format!(
                        "method '{}' must return a value of type '{}'",
                        path,
                        self.type_name(expected)
                    ),
                    span,
                });
            }
            None => {}
        }
    }

    fn check_assign(&mut self, ctx: &MethodContext, target: ExprId, value: ExprId) {
        if !self.is_lvalue(target) {
            self.error(CompilationError::NotAssignable {
                span: self.program.expr(target).span,
            });
            self.check_expr(ctx, value);
            return;
        }
        let target_info = self.check_expr(ctx, target);
        let value_ty = self.check_value(ctx, value);
        let (Some(ExprInfo::Value(expected)), Some(found)) = (target_info, value_ty) else {
            return;
        };
        if !self.registry.is_assignable(found, expected) {
            self.error(CompilationError::IncompatibleAssignment {
                expected: self.type_name(expected),
                found: self.type_name(found),
                target: self.describe_target(target),
                span: self.program.expr(value).span,
            });
        }
    }

    /// `variable 'x'` or `field 'f'` for diagnostics.
    fn describe_target(&self, target: ExprId) -> String {
        match &self.program.expr(target).kind {
            ExprKind::Identifier(name) => match self.bindings.symbol(target) {
                Some(Symbol::Field(_)) => format!("field '{}'", name),
                _ => format!("variable '{}'", name),
            },
            ExprKind::FieldAccess { field, .. } => format!("field '{}'", field),
            _ => "expression".to_string(),
        }
    }
}
