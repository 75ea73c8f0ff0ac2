//! Statement code generation.
//!
//! Statements are walked with an explicit task stack, like expressions.
//! Structured control flow is lowered to labels and jumps here; the
//! enclosing loop's `break` and `continue` targets live in the emitter's
//! [`JumpManager`](crate::emit::JumpManager).

use decaf_ast::{ExprId, ExprKind, StmtId, StmtKind};
use decaf_core::{CompilationError, DataType, Span};

use super::MethodGenerator;
use crate::asm::{Instruction, PrintKind};
use crate::emit::LoopLabels;

enum Task {
    Stmt(StmtId),
    Label(String),
    Jump(String),
    /// Loop header of a `for`, placed after its initializer.
    ForHead {
        cond: Option<ExprId>,
        top: String,
        cont: String,
        end: String,
    },
    LeaveLoop,
}

impl MethodGenerator<'_, '_> {
    pub(super) fn generate_body(&mut self, body: StmtId) -> Result<(), CompilationError> {
        let mut tasks = vec![Task::Stmt(body)];

        while let Some(task) = tasks.pop() {
            match task {
                Task::Stmt(id) => {
                    self.gen_stmt(id, &mut tasks)?;
                    // Values never outlive the statement that produced them.
                    if self.pool.live_count() != 0 {
                        return Err(CompilationError::internal(
                            format!("{} values live after statement", self.pool.live_count()),
                            self.program.stmt(id).span,
                        ));
                    }
                }
                Task::Label(label) => self.emitter.place_label(label),
                Task::Jump(label) => self.emitter.emit(Instruction::Jmp(label)),
                Task::ForHead {
                    cond,
                    top,
                    cont,
                    end,
                } => {
                    self.emitter.place_label(top.clone());
                    if let Some(cond) = cond {
                        self.branch_if_false(cond, &end)?;
                    }
                    self.emitter.jumps_mut().enter_loop(LoopLabels {
                        break_label: end,
                        continue_label: cont,
                    });
                }
                Task::LeaveLoop => {
                    self.emitter.jumps_mut().exit_loop();
                }
            }
        }
        Ok(())
    }

    /// Emit the statement's own code and queue its children.
    fn gen_stmt(&mut self, id: StmtId, tasks: &mut Vec<Task>) -> Result<(), CompilationError> {
        let program = self.program;
        let stmt = program.stmt(id);
        let span = stmt.span;

        match &stmt.kind {
            StmtKind::Block(children) => {
                tasks.extend(children.iter().rev().copied().map(Task::Stmt));
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let else_label = else_branch.map(|_| self.emitter.fresh_label());
                let end = self.emitter.fresh_label();
                self.branch_if_false(*cond, else_label.as_ref().unwrap_or(&end))?;

                tasks.push(Task::Label(end.clone()));
                if let (Some(else_branch), Some(else_label)) = (else_branch, else_label) {
                    tasks.push(Task::Stmt(*else_branch));
                    tasks.push(Task::Label(else_label));
                    tasks.push(Task::Jump(end));
                }
                tasks.push(Task::Stmt(*then_branch));
            }
            StmtKind::While { cond, body } => {
                let top = self.emitter.fresh_label();
                let end = self.emitter.fresh_label();
                self.emitter.place_label(top.clone());
                self.branch_if_false(*cond, &end)?;
                self.emitter.jumps_mut().enter_loop(LoopLabels {
                    break_label: end.clone(),
                    continue_label: top.clone(),
                });

                tasks.push(Task::Label(end));
                tasks.push(Task::LeaveLoop);
                tasks.push(Task::Jump(top));
                tasks.push(Task::Stmt(*body));
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                let top = self.emitter.fresh_label();
                let cont = self.emitter.fresh_label();
                let end = self.emitter.fresh_label();

                tasks.push(Task::Label(end.clone()));
                tasks.push(Task::LeaveLoop);
                tasks.push(Task::Jump(top.clone()));
                if let Some(update) = update {
                    tasks.push(Task::Stmt(*update));
                }
                tasks.push(Task::Label(cont.clone()));
                tasks.push(Task::Stmt(*body));
                tasks.push(Task::ForHead {
                    cond: *cond,
                    top,
                    cont,
                    end,
                });
                if let Some(init) = init {
                    tasks.push(Task::Stmt(*init));
                }
            }
            StmtKind::Return(value) => match value {
                Some(value) => {
                    let value = self.gen_value(*value)?;
                    let reg = self.load_one(value, span)?;
                    self.emitter.emit(Instruction::RetValue(reg));
                    self.pool.release(value);
                }
                None => self.emitter.emit(Instruction::Ret),
            },
            StmtKind::Expr(expr) => {
                if let Some(value) = self.gen_expr(*expr)? {
                    self.pool.release(value);
                }
            }
            StmtKind::Assign { target, value } => self.gen_assign(*target, *value, span)?,
            StmtKind::VarDecl(_) => {
                let bindings = self.bindings;
                for &var in bindings.declarations(id) {
                    let slot = self.frame.slot(var).ok_or_else(|| {
                        CompilationError::internal("variable without a frame slot", span)
                    })?;
                    let (value, reg) = self.acquire(span)?;
                    self.emitter
                        .emit(if self.registry.variable(var).ty == DataType::double() {
                            Instruction::MoveImmedF(reg, 0.0)
                        } else {
                            Instruction::MoveImmedI(reg, 0)
                        });
                    self.emitter.emit(Instruction::StoreStack(slot, reg));
                    self.pool.release(value);
                }
            }
            StmtKind::Print(expr) => {
                let kind = match self.types.type_of(*expr) {
                    Some(DataType::Primitive(kind)) => PrintKind::for_primitive(kind),
                    _ => None,
                }
                .ok_or_else(|| CompilationError::internal("unprintable value", span))?;
                let value = self.gen_value(*expr)?;
                let reg = self.load_one(value, span)?;
                self.emitter.emit(Instruction::Print(kind, reg));
                self.pool.release(value);
            }
            StmtKind::Break => {
                let label = self.emitter.jumps().break_label().map(str::to_owned);
                let label = label
                    .ok_or_else(|| CompilationError::internal("'break' outside a loop", span))?;
                self.emitter.emit(Instruction::Jmp(label));
            }
            StmtKind::Continue => {
                let label = self.emitter.jumps().continue_label().map(str::to_owned);
                let label = label
                    .ok_or_else(|| CompilationError::internal("'continue' outside a loop", span))?;
                self.emitter.emit(Instruction::Jmp(label));
            }
            StmtKind::Skip => {}
        }
        self.pool.unpin_all();
        Ok(())
    }

    /// Evaluate `cond` and branch to `label` when it is false.
    fn branch_if_false(&mut self, cond: ExprId, label: &str) -> Result<(), CompilationError> {
        let span = self.span(cond);
        let value = self.gen_value(cond)?;
        let reg = self.load_one(value, span)?;
        self.emitter.emit(Instruction::Bz(reg, label.to_owned()));
        self.pool.release(value);
        self.pool.unpin_all();
        Ok(())
    }

    fn gen_assign(
        &mut self,
        target: ExprId,
        value: ExprId,
        span: Span,
    ) -> Result<(), CompilationError> {
        // An object receiver is evaluated before the assigned value.
        let mut receiver = Vec::new();
        if matches!(self.program.expr(target).kind, ExprKind::FieldAccess { .. }) {
            for operand in self.operands(target)? {
                receiver.push(Some(self.gen_value(operand)?));
            }
        }
        let value = self.gen_value(value)?;
        let place = self.place(target, receiver, span)?;
        let source = self.load_one(value, span)?;
        self.store(place, source, span)?;
        self.pool.release(value);
        Ok(())
    }
}
