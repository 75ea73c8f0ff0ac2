//! Programmatic construction of Decaf programs.
//!
//! Every node gets the builder's current position, which starts at 1:1 and
//! is moved with [`ProgramBuilder::at`], so tests can assert on the lines
//! their diagnostics point to.

use decaf_core::{Span, Visibility};

use crate::ast::*;

/// Builds a [`Program`] node by node.
#[derive(Debug)]
pub struct ProgramBuilder {
    program: Program,
    span: Span,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            program: Program::new(),
            span: Span::new(1, 1),
        }
    }

    /// Set the position given to subsequently created nodes.
    pub fn at(&mut self, line: u32, col: u32) -> &mut Self {
        self.span = Span::new(line, col);
        self
    }

    /// Current position.
    pub fn span(&self) -> Span {
        self.span
    }

    pub fn finish(self) -> Program {
        self.program
    }

    // ==========================================================================
    // Declarations
    // ==========================================================================

    /// Add a class; returns its index in [`Program::classes`].
    pub fn class(
        &mut self,
        name: &str,
        parent: Option<&str>,
        fields: Vec<FieldDecl>,
        methods: Vec<MethodDecl>,
    ) -> usize {
        let span = self.span;
        self.program.classes.push(ClassDecl {
            name: name.to_string(),
            parent: parent.map(|p| Ident::new(p, span)),
            fields,
            methods,
            span,
        });
        self.program.classes.len() - 1
    }

    pub fn field(&self, name: &str, ty: &str) -> FieldDecl {
        FieldDecl {
            name: name.to_string(),
            ty: TypeExpr::parse(ty, self.span),
            visibility: Visibility::Public,
            is_static: false,
            span: self.span,
        }
    }

    /// A public instance method; `params` are `(name, type)` pairs.
    pub fn method(
        &self,
        name: &str,
        return_type: &str,
        params: &[(&str, &str)],
        body: StmtId,
    ) -> MethodDecl {
        MethodDecl {
            name: name.to_string(),
            return_type: TypeExpr::parse(return_type, self.span),
            params: params
                .iter()
                .map(|(name, ty)| Formal {
                    name: name.to_string(),
                    ty: TypeExpr::parse(ty, self.span),
                    span: self.span,
                })
                .collect(),
            body,
            visibility: Visibility::Public,
            is_static: false,
            span: self.span,
        }
    }

    // ==========================================================================
    // Statements
    // ==========================================================================

    fn stmt(&mut self, kind: StmtKind) -> StmtId {
        self.program.add_stmt(Stmt::new(kind, self.span))
    }

    pub fn block(&mut self, stmts: Vec<StmtId>) -> StmtId {
        self.stmt(StmtKind::Block(stmts))
    }

    pub fn if_stmt(&mut self, cond: ExprId, then_branch: StmtId, else_branch: Option<StmtId>) -> StmtId {
        self.stmt(StmtKind::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    pub fn while_stmt(&mut self, cond: ExprId, body: StmtId) -> StmtId {
        self.stmt(StmtKind::While { cond, body })
    }

    pub fn for_stmt(
        &mut self,
        init: Option<StmtId>,
        cond: Option<ExprId>,
        update: Option<StmtId>,
        body: StmtId,
    ) -> StmtId {
        self.stmt(StmtKind::For {
            init,
            cond,
            update,
            body,
        })
    }

    pub fn ret(&mut self, value: Option<ExprId>) -> StmtId {
        self.stmt(StmtKind::Return(value))
    }

    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        self.stmt(StmtKind::Expr(expr))
    }

    pub fn assign(&mut self, target: ExprId, value: ExprId) -> StmtId {
        self.stmt(StmtKind::Assign { target, value })
    }

    /// Declare one local variable.
    pub fn var(&mut self, name: &str, ty: &str) -> StmtId {
        self.vars(&[(name, ty)])
    }

    /// Declare several local variables in one statement.
    pub fn vars(&mut self, vars: &[(&str, &str)]) -> StmtId {
        let span = self.span;
        let vars = vars
            .iter()
            .map(|(name, ty)| VarDecl {
                name: name.to_string(),
                ty: TypeExpr::parse(ty, span),
                span,
            })
            .collect();
        self.stmt(StmtKind::VarDecl(vars))
    }

    pub fn print(&mut self, value: ExprId) -> StmtId {
        self.stmt(StmtKind::Print(value))
    }

    pub fn break_stmt(&mut self) -> StmtId {
        self.stmt(StmtKind::Break)
    }

    pub fn continue_stmt(&mut self) -> StmtId {
        self.stmt(StmtKind::Continue)
    }

    pub fn skip(&mut self) -> StmtId {
        self.stmt(StmtKind::Skip)
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    fn expr(&mut self, kind: ExprKind) -> ExprId {
        self.program.add_expr(Expr::new(kind, self.span))
    }

    pub fn int(&mut self, value: i32) -> ExprId {
        self.expr(ExprKind::Literal(Literal::Int(value)))
    }

    pub fn double(&mut self, value: f64) -> ExprId {
        self.expr(ExprKind::Literal(Literal::Double(value)))
    }

    pub fn bool(&mut self, value: bool) -> ExprId {
        self.expr(ExprKind::Literal(Literal::Bool(value)))
    }

    pub fn string(&mut self, value: &str) -> ExprId {
        self.expr(ExprKind::Literal(Literal::String(value.to_string())))
    }

    pub fn null(&mut self) -> ExprId {
        self.expr(ExprKind::Literal(Literal::Null))
    }

    pub fn ident(&mut self, name: &str) -> ExprId {
        self.expr(ExprKind::Identifier(name.to_string()))
    }

    pub fn this(&mut self) -> ExprId {
        self.expr(ExprKind::This)
    }

    pub fn super_ref(&mut self) -> ExprId {
        self.expr(ExprKind::Super)
    }

    pub fn new_object(&mut self, class: &str) -> ExprId {
        self.expr(ExprKind::New {
            class: class.to_string(),
        })
    }

    pub fn call(&mut self, receiver: Option<ExprId>, method: &str, args: Vec<ExprId>) -> ExprId {
        self.expr(ExprKind::Call {
            receiver,
            method: method.to_string(),
            args,
        })
    }

    pub fn field_access(&mut self, receiver: ExprId, field: &str) -> ExprId {
        self.expr(ExprKind::FieldAccess {
            receiver,
            field: field.to_string(),
        })
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.expr(ExprKind::Binary { op, lhs, rhs })
    }

    pub fn unary(&mut self, op: UnaryOp, operand: ExprId) -> ExprId {
        self.expr(ExprKind::Unary { op, operand })
    }

    pub fn inc_dec(&mut self, op: IncDecOp, prefix: bool, target: ExprId) -> ExprId {
        self.expr(ExprKind::IncDec { op, prefix, target })
    }
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}
