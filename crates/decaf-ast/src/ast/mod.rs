//! Abstract Syntax Tree for Decaf.
//!
//! Declarations are plain owned structs; expressions and statements live in
//! two flat arenas on [`Program`] and refer to their children by id. The
//! passes walk these arenas with explicit work stacks, so tree depth never
//! turns into call-stack depth.

pub mod decl;
pub mod expr;
pub mod node;
pub mod ops;
pub mod stmt;

pub use decl::*;
pub use expr::*;
pub use node::*;
pub use ops::*;
pub use stmt::*;

/// A complete compilation unit: every class plus the node arenas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    /// Classes in declaration order.
    pub classes: Vec<ClassDecl>,
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an expression by id.
    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    /// Get a statement by id.
    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    /// Append an expression to the arena.
    pub fn add_expr(&mut self, expr: Expr) -> ExprId {
        let id = ExprId::from_index(self.exprs.len());
        self.exprs.push(expr);
        id
    }

    /// Append a statement to the arena.
    pub fn add_stmt(&mut self, stmt: Stmt) -> StmtId {
        let id = StmtId::from_index(self.stmts.len());
        self.stmts.push(stmt);
        id
    }

    /// Number of expressions; side tables indexed by [`ExprId`] use this size.
    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    /// Number of statements; side tables indexed by [`StmtId`] use this size.
    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }

    /// Iterate every method with its owning class.
    pub fn methods(&self) -> impl Iterator<Item = (&ClassDecl, &MethodDecl)> {
        self.classes
            .iter()
            .flat_map(|class| class.methods.iter().map(move |method| (class, method)))
    }
}
