//! Expression nodes.

use decaf_core::Span;

use super::{BinaryOp, ExprId, IncDecOp, UnaryOp};

/// An expression with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// The closed set of expression kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// `lhs op rhs`
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    /// `op operand`
    Unary { op: UnaryOp, operand: ExprId },
    Literal(Literal),
    /// A bare name: local, parameter, field, or class name used as a receiver.
    Identifier(String),
    This,
    /// Only valid as a call or field-access receiver.
    Super,
    /// `new ClassName()`
    New { class: String },
    /// `receiver.method(args)`; no receiver means the enclosing class.
    Call {
        receiver: Option<ExprId>,
        method: String,
        args: Vec<ExprId>,
    },
    /// `receiver.field`
    FieldAccess { receiver: ExprId, field: String },
    /// `++x`, `x--`, ...
    IncDec {
        op: IncDecOp,
        prefix: bool,
        target: ExprId,
    },
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i32),
    Double(f64),
    Bool(bool),
    String(String),
    Null,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Child expressions in evaluation order.
    pub fn children(&self) -> Vec<ExprId> {
        match &self.kind {
            ExprKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            ExprKind::Unary { operand, .. } => vec![*operand],
            ExprKind::Call { receiver, args, .. } => {
                receiver.iter().copied().chain(args.iter().copied()).collect()
            }
            ExprKind::FieldAccess { receiver, .. } => vec![*receiver],
            ExprKind::IncDec { target, .. } => vec![*target],
            ExprKind::Literal(_)
            | ExprKind::Identifier(_)
            | ExprKind::This
            | ExprKind::Super
            | ExprKind::New { .. } => Vec::new(),
        }
    }
}
