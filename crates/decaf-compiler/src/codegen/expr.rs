//! Expression code generation.
//!
//! Postorder with an explicit work stack. Every finished node leaves exactly
//! one entry on the value stack: the [`Value`] holding its result, or `None`
//! for a call to a void method. A parent pops its operands' entries in
//! evaluation order, emits its own instructions and pushes its result.
//!
//! `&&` and `||` are the exception: the right operand is generated between a
//! conditional branch and a join label, so it only runs when needed.

use decaf_ast::{BinaryOp, ExprId, ExprKind, IncDecOp, Literal, UnaryOp};
use decaf_core::{CompilationError, DataType, FieldId, Span};
use decaf_registry::Symbol;

use super::registers::Value;
use super::{MethodGenerator, emit_object_init};
use crate::annotations::Dispatch;
use crate::asm::{BinaryOpcode, Instruction, Reg, UnaryOpcode};
use crate::emit::method_label;

enum Task {
    Eval(ExprId),
    /// Operands are on the value stack.
    Finish(ExprId),
    /// Left operand of `&&`/`||` is on the value stack.
    Branch(ExprId),
    /// Right operand is on the value stack; the result goes to `reg`.
    Join { expr: ExprId, reg: u8, label: String },
}

/// Where a field lives, as reached from an expression.
enum FieldBase {
    Static,
    /// `this`, implicitly or through `super`.
    This,
    /// An evaluated receiver object.
    Object,
}

impl MethodGenerator<'_, '_> {
    /// Generate `root`; returns the value holding its result.
    pub(super) fn gen_expr(&mut self, root: ExprId) -> Result<Option<Value>, CompilationError> {
        let mut tasks = vec![Task::Eval(root)];
        let mut values: Vec<Option<Value>> = Vec::new();

        while let Some(task) = tasks.pop() {
            match task {
                Task::Eval(id) => {
                    if let ExprKind::Binary { op, lhs, .. } = &self.program.expr(id).kind
                        && op.is_short_circuit()
                    {
                        tasks.push(Task::Branch(id));
                        tasks.push(Task::Eval(*lhs));
                        continue;
                    }
                    tasks.push(Task::Finish(id));
                    let operands = self.operands(id)?;
                    tasks.extend(operands.into_iter().rev().map(Task::Eval));
                }
                Task::Finish(id) => {
                    let count = self.operands(id)?.len();
                    let split = values.len().checked_sub(count).ok_or_else(|| {
                        CompilationError::internal("operand stack underflow", self.span(id))
                    })?;
                    let operands = values.split_off(split);
                    let result = self.finish(id, operands)?;
                    values.push(result);
                    self.pool.unpin_all();
                }
                Task::Branch(id) => {
                    let span = self.span(id);
                    let (op, rhs) = match &self.program.expr(id).kind {
                        ExprKind::Binary { op, rhs, .. } => (*op, *rhs),
                        _ => return Err(CompilationError::internal("expected && or ||", span)),
                    };
                    let lhs = operand(values.pop().flatten(), span)?;

                    // Nothing else may sit in a register across the branch:
                    // the right operand's spills would only happen on one path.
                    self.pool.spill_all_except(&[lhs], self.emitter.code_mut());
                    let reg = self.load_one(lhs, span)?;
                    let label = self.emitter.fresh_label();
                    self.emitter.emit(match op {
                        BinaryOp::Or => Instruction::Bnz(reg, label.clone()),
                        _ => Instruction::Bz(reg, label.clone()),
                    });
                    self.pool.release(lhs);
                    self.pool.unpin_all();

                    let Reg::R(reg) = reg else {
                        return Err(CompilationError::internal("operand in rv", span));
                    };
                    tasks.push(Task::Join { expr: id, reg, label });
                    tasks.push(Task::Eval(rhs));
                }
                Task::Join { expr, reg, label } => {
                    let span = self.span(expr);
                    let rhs = operand(values.pop().flatten(), span)?;
                    let source = self.load_one(rhs, span)?;
                    if source != Reg::R(reg) {
                        self.emitter.emit(Instruction::Move(Reg::R(reg), source));
                    }
                    self.pool.release(rhs);
                    self.emitter.place_label(label);
                    let (value, _) = self
                        .pool
                        .acquire_specific(reg, self.emitter.code_mut(), span)?;
                    values.push(Some(value));
                    self.pool.unpin_all();
                }
            }
        }

        match values.as_slice() {
            [result] => Ok(*result),
            _ => Err(CompilationError::internal(
                format!("expression left {} values", values.len()),
                self.span(root),
            )),
        }
    }

    /// Generate `root` and require a value.
    pub(super) fn gen_value(&mut self, root: ExprId) -> Result<Value, CompilationError> {
        let value = self.gen_expr(root)?;
        operand(value, self.span(root))
    }

    /// Sub-expressions evaluated into values before `id` itself, in order.
    pub(super) fn operands(&self, id: ExprId) -> Result<Vec<ExprId>, CompilationError> {
        let expr = self.program.expr(id);
        Ok(match &expr.kind {
            ExprKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            ExprKind::Unary { operand, .. } => vec![*operand],
            ExprKind::Call { receiver, args, .. } => {
                let target = self.types.call(id).ok_or_else(|| {
                    CompilationError::internal("call without a resolved target", expr.span)
                })?;
                let evaluated_receiver = match (target.dispatch, receiver) {
                    (Dispatch::Virtual { .. }, Some(r)) => Some(*r),
                    _ => None,
                };
                evaluated_receiver.into_iter().chain(args.iter().copied()).collect()
            }
            ExprKind::FieldAccess { receiver, .. } => match self.field_base(id)? {
                FieldBase::Object => vec![*receiver],
                FieldBase::Static | FieldBase::This => Vec::new(),
            },
            ExprKind::IncDec { target, .. } => match &self.program.expr(*target).kind {
                ExprKind::FieldAccess { .. } => self.operands(*target)?,
                _ => Vec::new(),
            },
            ExprKind::Literal(_)
            | ExprKind::Identifier(_)
            | ExprKind::This
            | ExprKind::Super
            | ExprKind::New { .. } => Vec::new(),
        })
    }

    fn finish(
        &mut self,
        id: ExprId,
        operands: Vec<Option<Value>>,
    ) -> Result<Option<Value>, CompilationError> {
        let program = self.program;
        let expr = program.expr(id);
        let span = expr.span;

        match &expr.kind {
            ExprKind::Literal(literal) => {
                let (value, d) = self.acquire(span)?;
                self.emitter.emit(match literal {
                    Literal::Int(v) => Instruction::MoveImmedI(d, *v),
                    Literal::Double(v) => Instruction::MoveImmedF(d, *v),
                    Literal::Bool(v) => Instruction::MoveImmedI(d, i32::from(*v)),
                    Literal::String(v) => Instruction::MoveImmedS(d, v.clone()),
                    Literal::Null => Instruction::MoveImmedI(d, 0),
                });
                Ok(Some(value))
            }
            ExprKind::Identifier(_) => self.gen_identifier(id, span).map(Some),
            ExprKind::This => {
                let slot = self.this_slot(span)?;
                let (value, d) = self.acquire(span)?;
                self.emitter.emit(Instruction::LoadStack(d, slot));
                Ok(Some(value))
            }
            ExprKind::Super => Err(CompilationError::internal(
                "'super' evaluated as a value",
                span,
            )),
            ExprKind::New { .. } => {
                let Some(Symbol::Class(class)) = self.bindings.symbol(id) else {
                    return Err(CompilationError::internal("unresolved class in 'new'", span));
                };
                let (value, d) = self.acquire(span)?;
                let (scratch, t) = self.acquire(span)?;
                emit_object_init(
                    self.emitter.code_mut(),
                    self.registry,
                    self.layouts,
                    class,
                    d,
                    t,
                );
                self.pool.release(scratch);
                Ok(Some(value))
            }
            ExprKind::Unary { op, operand: inner } => {
                let [v] = operands_of::<1>(operands, span)?;
                let opcode = match op {
                    UnaryOp::Not => UnaryOpcode::Not,
                    UnaryOp::Neg if self.is_double(*inner) => UnaryOpcode::FNeg,
                    UnaryOp::Neg => UnaryOpcode::INeg,
                };
                let s = self.load_one(v, span)?;
                self.pool.release(v);
                let (value, d) = self.acquire(span)?;
                self.emitter.emit(Instruction::Unary(opcode, d, s));
                Ok(Some(value))
            }
            ExprKind::Binary { op, lhs, .. } => {
                let [l, r] = operands_of::<2>(operands, span)?;
                let opcode = binary_opcode(*op, self.is_double(*lhs)).ok_or_else(|| {
                    CompilationError::internal("short-circuit operator in binary form", span)
                })?;
                let regs = self.pool.load(&[l, r], self.emitter.code_mut(), span)?;
                self.pool.release(l);
                self.pool.release(r);
                let (value, d) = self.acquire(span)?;
                self.emitter
                    .emit(Instruction::Binary(opcode, d, regs[0], regs[1]));
                Ok(Some(value))
            }
            ExprKind::Call { .. } => self.gen_call(id, operands, span),
            ExprKind::FieldAccess { .. } => {
                let field = self.field_of(id)?;
                let offset = self.offset(field, span)?;
                match self.field_base(id)? {
                    FieldBase::Static => {
                        let (value, d) = self.acquire(span)?;
                        self.emitter.emit(Instruction::SLoad(d, offset));
                        Ok(Some(value))
                    }
                    FieldBase::This => self.load_this_field(offset, span).map(Some),
                    FieldBase::Object => {
                        let [object] = operands_of::<1>(operands, span)?;
                        let base = self.load_one(object, span)?;
                        self.pool.release(object);
                        let (value, d) = self.acquire(span)?;
                        self.emitter.emit(Instruction::HLoad(d, base, offset));
                        Ok(Some(value))
                    }
                }
            }
            ExprKind::IncDec { op, prefix, target } => {
                self.gen_inc_dec(id, *op, *prefix, *target, operands, span)
            }
        }
    }

    // ==========================================================================
    // Names and fields
    // ==========================================================================

    fn gen_identifier(&mut self, id: ExprId, span: Span) -> Result<Value, CompilationError> {
        match self.bindings.symbol(id) {
            Some(Symbol::Variable(var)) => {
                let slot = self.frame.slot(var).ok_or_else(|| {
                    CompilationError::internal("variable without a frame slot", span)
                })?;
                let (value, d) = self.acquire(span)?;
                self.emitter.emit(Instruction::LoadStack(d, slot));
                Ok(value)
            }
            Some(Symbol::Field(field)) => {
                let offset = self.offset(field, span)?;
                if self.registry.field(field).is_static {
                    let (value, d) = self.acquire(span)?;
                    self.emitter.emit(Instruction::SLoad(d, offset));
                    Ok(value)
                } else {
                    self.load_this_field(offset, span)
                }
            }
            _ => Err(CompilationError::internal(
                "identifier does not name a value",
                span,
            )),
        }
    }

    fn load_this_field(&mut self, offset: u32, span: Span) -> Result<Value, CompilationError> {
        let slot = self.this_slot(span)?;
        let (value, d) = self.acquire(span)?;
        self.emitter.emit(Instruction::LoadStack(d, slot));
        self.emitter.emit(Instruction::HLoad(d, d, offset));
        Ok(value)
    }

    fn field_base(&self, id: ExprId) -> Result<FieldBase, CompilationError> {
        let field = self.field_of(id)?;
        if self.registry.field(field).is_static {
            return Ok(FieldBase::Static);
        }
        Ok(match &self.program.expr(id).kind {
            ExprKind::FieldAccess { receiver, .. }
                if !matches!(self.program.expr(*receiver).kind, ExprKind::Super) =>
            {
                FieldBase::Object
            }
            _ => FieldBase::This,
        })
    }

    /// Field named by an identifier or field access.
    pub(super) fn field_of(&self, id: ExprId) -> Result<FieldId, CompilationError> {
        self.types
            .field(id)
            .ok_or_else(|| CompilationError::internal("unresolved field", self.span(id)))
    }

    pub(super) fn offset(&self, field: FieldId, span: Span) -> Result<u32, CompilationError> {
        self.layouts
            .field_offset(field)
            .ok_or_else(|| CompilationError::internal("field without an offset", span))
    }

    // ==========================================================================
    // Calls
    // ==========================================================================

    fn gen_call(
        &mut self,
        id: ExprId,
        operands: Vec<Option<Value>>,
        span: Span,
    ) -> Result<Option<Value>, CompilationError> {
        let registry = self.registry;
        let target = self
            .types
            .call(id)
            .ok_or_else(|| CompilationError::internal("call without a resolved target", span))?;
        let callee = registry.method(target.method);
        let has_receiver_operand = operands.len() > callee.arity();

        let mut operands = operands.into_iter();
        let mut pushed = 0u32;
        let mut receiver = None;

        // Receiver first, then arguments left to right.
        match target.dispatch {
            Dispatch::Virtual { .. } if has_receiver_operand => {
                let object = operand(operands.next().flatten(), span)?;
                let reg = self.load_one(object, span)?;
                self.emitter.emit(Instruction::Push(reg));
                receiver = Some(object);
                pushed += 1;
            }
            Dispatch::Virtual { .. } | Dispatch::Super => {
                let slot = self.this_slot(span)?;
                let (this, t) = self.acquire(span)?;
                self.emitter.emit(Instruction::LoadStack(t, slot));
                self.emitter.emit(Instruction::Push(t));
                self.pool.release(this);
                pushed += 1;
            }
            Dispatch::Static => {}
        }
        for arg in operands {
            let arg = operand(arg, span)?;
            let reg = self.load_one(arg, span)?;
            self.emitter.emit(Instruction::Push(reg));
            self.pool.release(arg);
            pushed += 1;
        }

        // No register survives a call.
        let keep: Vec<Value> = receiver.into_iter().collect();
        self.pool.spill_all_except(&keep, self.emitter.code_mut());

        let owner = &registry.class(callee.owner).name;
        match target.dispatch {
            Dispatch::Virtual { slot } => {
                let (vtable, t) = match receiver {
                    Some(object) => {
                        let base = self.load_one(object, span)?;
                        self.pool.release(object);
                        let (vtable, t) = self.acquire(span)?;
                        self.emitter.emit(Instruction::HLoad(t, base, 0));
                        (vtable, t)
                    }
                    None => {
                        let this_slot = self.this_slot(span)?;
                        let (vtable, t) = self.acquire(span)?;
                        self.emitter.emit(Instruction::LoadStack(t, this_slot));
                        self.emitter.emit(Instruction::HLoad(t, t, 0));
                        (vtable, t)
                    }
                };
                self.emitter.emit(Instruction::VCall(t, slot));
                self.pool.release(vtable);
            }
            Dispatch::Super | Dispatch::Static => {
                self.emitter
                    .emit(Instruction::Call(method_label(owner, &callee.name)));
            }
        }
        if pushed > 0 {
            self.emitter.emit(Instruction::PopN(pushed));
        }

        if callee.return_type.is_void() {
            return Ok(None);
        }
        let (value, d) = self.acquire(span)?;
        self.emitter.emit(Instruction::Move(d, Reg::Rv));
        Ok(Some(value))
    }

    // ==========================================================================
    // Increment and decrement
    // ==========================================================================

    fn gen_inc_dec(
        &mut self,
        id: ExprId,
        op: IncDecOp,
        prefix: bool,
        target: ExprId,
        operands: Vec<Option<Value>>,
        span: Span,
    ) -> Result<Option<Value>, CompilationError> {
        let double = self.is_double(id);
        let opcode = match (op, double) {
            (IncDecOp::Increment, false) => BinaryOpcode::IAdd,
            (IncDecOp::Decrement, false) => BinaryOpcode::ISub,
            (IncDecOp::Increment, true) => BinaryOpcode::FAdd,
            (IncDecOp::Decrement, true) => BinaryOpcode::FSub,
        };

        let place = self.place(target, operands, span)?;
        let (old, ro) = self.acquire(span)?;
        match place {
            Place::Slot(slot) => self.emitter.emit(Instruction::LoadStack(ro, slot)),
            Place::Static(offset) => self.emitter.emit(Instruction::SLoad(ro, offset)),
            Place::Heap(object, offset) => {
                let base = self.load_one(object, span)?;
                self.emitter.emit(Instruction::HLoad(ro, base, offset));
            }
        }

        let (new, rn) = self.acquire(span)?;
        self.emitter.emit(if double {
            Instruction::MoveImmedF(rn, 1.0)
        } else {
            Instruction::MoveImmedI(rn, 1)
        });
        self.emitter.emit(Instruction::Binary(opcode, rn, ro, rn));
        self.store(place, rn, span)?;

        if prefix {
            self.pool.release(old);
            Ok(Some(new))
        } else {
            self.pool.release(new);
            Ok(Some(old))
        }
    }

    /// Resolve an assignable expression to its storage.
    ///
    /// For a field of an evaluated object, `operands` holds that object.
    pub(super) fn place(
        &mut self,
        target: ExprId,
        operands: Vec<Option<Value>>,
        span: Span,
    ) -> Result<Place, CompilationError> {
        let program = self.program;
        let expr = program.expr(target);
        match (&expr.kind, self.bindings.symbol(target)) {
            (ExprKind::Identifier(_), Some(Symbol::Variable(var))) => self
                .frame
                .slot(var)
                .map(Place::Slot)
                .ok_or_else(|| CompilationError::internal("variable without a frame slot", span)),
            (ExprKind::Identifier(_), _) | (ExprKind::FieldAccess { .. }, _) => {
                let field = self.field_of(target)?;
                let offset = self.offset(field, span)?;
                match self.field_base(target)? {
                    FieldBase::Static => Ok(Place::Static(offset)),
                    FieldBase::This => {
                        let slot = self.this_slot(span)?;
                        let (this, t) = self.acquire(span)?;
                        self.emitter.emit(Instruction::LoadStack(t, slot));
                        Ok(Place::Heap(this, offset))
                    }
                    FieldBase::Object => {
                        let [object] = operands_of::<1>(operands, span)?;
                        Ok(Place::Heap(object, offset))
                    }
                }
            }
            _ => Err(CompilationError::internal("expression is not assignable", span)),
        }
    }

    /// Write `source` to `place`, consuming the place's object if any.
    pub(super) fn store(
        &mut self,
        place: Place,
        source: Reg,
        span: Span,
    ) -> Result<(), CompilationError> {
        match place {
            Place::Slot(slot) => self.emitter.emit(Instruction::StoreStack(slot, source)),
            Place::Static(offset) => self.emitter.emit(Instruction::SStore(offset, source)),
            Place::Heap(object, offset) => {
                let base = self.load_one(object, span)?;
                self.emitter.emit(Instruction::HStore(base, offset, source));
                self.pool.release(object);
            }
        }
        Ok(())
    }

    // ==========================================================================
    // Helpers
    // ==========================================================================

    pub(super) fn acquire(&mut self, span: Span) -> Result<(Value, Reg), CompilationError> {
        self.pool.acquire(self.emitter.code_mut(), span)
    }

    pub(super) fn load_one(&mut self, value: Value, span: Span) -> Result<Reg, CompilationError> {
        let regs = self.pool.load(&[value], self.emitter.code_mut(), span)?;
        regs.first()
            .copied()
            .ok_or_else(|| CompilationError::internal("load returned no register", span))
    }

    fn is_double(&self, id: ExprId) -> bool {
        self.types.type_of(id) == Some(DataType::double())
    }

    pub(super) fn span(&self, id: ExprId) -> Span {
        self.program.expr(id).span
    }
}

/// Storage an assignment or increment writes to.
pub(super) enum Place {
    /// A parameter or local.
    Slot(u32),
    /// A static field.
    Static(u32),
    /// An instance field of the object held in the value.
    Heap(Value, u32),
}

fn operand(value: Option<Value>, span: Span) -> Result<Value, CompilationError> {
    value.ok_or_else(|| CompilationError::internal("operand has no value", span))
}

fn operands_of<const N: usize>(
    operands: Vec<Option<Value>>,
    span: Span,
) -> Result<[Value; N], CompilationError> {
    let values = operands
        .into_iter()
        .map(|v| operand(v, span))
        .collect::<Result<Vec<_>, _>>()?;
    values.try_into().map_err(|values: Vec<Value>| {
        CompilationError::internal(
            format!("expected {} operands, found {}", N, values.len()),
            span,
        )
    })
}

fn binary_opcode(op: BinaryOp, double: bool) -> Option<BinaryOpcode> {
    use BinaryOpcode::*;
    Some(match (op, double) {
        (BinaryOp::Add, false) => IAdd,
        (BinaryOp::Sub, false) => ISub,
        (BinaryOp::Mul, false) => IMul,
        (BinaryOp::Div, false) => IDiv,
        (BinaryOp::Less, false) => ILt,
        (BinaryOp::LessEqual, false) => ILeq,
        (BinaryOp::Greater, false) => IGt,
        (BinaryOp::GreaterEqual, false) => IGeq,
        (BinaryOp::Equal, false) => IEq,
        (BinaryOp::NotEqual, false) => INe,
        (BinaryOp::Add, true) => FAdd,
        (BinaryOp::Sub, true) => FSub,
        (BinaryOp::Mul, true) => FMul,
        (BinaryOp::Div, true) => FDiv,
        (BinaryOp::Less, true) => FLt,
        (BinaryOp::LessEqual, true) => FLeq,
        (BinaryOp::Greater, true) => FGt,
        (BinaryOp::GreaterEqual, true) => FGeq,
        (BinaryOp::Equal, true) => FEq,
        (BinaryOp::NotEqual, true) => FNe,
        (BinaryOp::And | BinaryOp::Or, _) => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcodes_follow_operand_type() {
        assert_eq!(binary_opcode(BinaryOp::Add, false), Some(BinaryOpcode::IAdd));
        assert_eq!(binary_opcode(BinaryOp::Less, true), Some(BinaryOpcode::FLt));
        assert_eq!(binary_opcode(BinaryOp::Equal, true), Some(BinaryOpcode::FEq));
        assert_eq!(binary_opcode(BinaryOp::NotEqual, false), Some(BinaryOpcode::INe));
        assert_eq!(binary_opcode(BinaryOp::And, false), None);
    }

    #[test]
    fn operands_of_checks_arity() {
        let span = Span::new(3, 4);
        assert!(operands_of::<1>(vec![], span).is_err());
        assert!(operands_of::<0>(vec![], span).is_ok());
        let err = operands_of::<1>(vec![None], span).unwrap_err();
        assert_eq!(err.span(), span);
    }
}
