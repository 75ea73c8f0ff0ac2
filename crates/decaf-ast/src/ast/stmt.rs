//! Statement nodes.

use decaf_core::Span;

use super::{ExprId, StmtId, VarDecl};

/// A statement with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

/// The closed set of statement kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `{ stmts }`, opening a new scope.
    Block(Vec<StmtId>),
    If {
        cond: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    While {
        cond: ExprId,
        body: StmtId,
    },
    /// `for (init; cond; update) body`; a missing condition loops forever.
    For {
        init: Option<StmtId>,
        cond: Option<ExprId>,
        update: Option<StmtId>,
        body: StmtId,
    },
    Return(Option<ExprId>),
    /// An expression evaluated for its effect.
    Expr(ExprId),
    Assign {
        target: ExprId,
        value: ExprId,
    },
    VarDecl(Vec<VarDecl>),
    Print(ExprId),
    Break,
    Continue,
    /// The empty statement.
    Skip,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}
