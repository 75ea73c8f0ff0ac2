//! Side tables that carry each phase's results to the next.
//!
//! The AST is never mutated. Resolution produces [`Bindings`] (which
//! declaration every name refers to), type checking produces a [`TypeTable`]
//! (the static type of every expression and how each member access is
//! dispatched), and the code generator reads both.

use rustc_hash::FxHashMap;

use decaf_ast::{ExprId, StmtId};
use decaf_core::{DataType, FieldId, MethodId, VarId};
use decaf_registry::Symbol;

// ============================================================================
// Method sources
// ============================================================================

/// Where a registered method was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSource {
    /// Index into `Program::classes`.
    pub class: usize,
    /// Index into that class's `methods`.
    pub method: usize,
}

// ============================================================================
// Bindings
// ============================================================================

/// Resolution results.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    /// `Identifier` and `New` expressions to the declaration they name.
    symbols: FxHashMap<ExprId, Symbol>,
    /// `VarDecl` statements to the variables they introduce.
    declarations: FxHashMap<StmtId, Vec<VarId>>,
    /// Locals of each method in declaration order, indexed by [`MethodId`].
    locals: Vec<Vec<VarId>>,
}

impl Bindings {
    pub fn with_method_count(count: usize) -> Self {
        Self {
            locals: vec![Vec::new(); count],
            ..Self::default()
        }
    }

    pub fn bind(&mut self, expr: ExprId, symbol: Symbol) {
        self.symbols.insert(expr, symbol);
    }

    pub fn symbol(&self, expr: ExprId) -> Option<Symbol> {
        self.symbols.get(&expr).copied()
    }

    pub fn declare(&mut self, stmt: StmtId, var: VarId) {
        self.declarations.entry(stmt).or_default().push(var);
    }

    pub fn declarations(&self, stmt: StmtId) -> &[VarId] {
        self.declarations.get(&stmt).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn add_local(&mut self, method: MethodId, var: VarId) {
        if self.locals.len() <= method.index() {
            self.locals.resize(method.index() + 1, Vec::new());
        }
        self.locals[method.index()].push(var);
    }

    pub fn locals(&self, method: MethodId) -> &[VarId] {
        self.locals.get(method.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn binding_count(&self) -> usize {
        self.symbols.len()
    }
}

// ============================================================================
// Type table
// ============================================================================

/// How a call reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Through the receiver's vtable at `slot`.
    Virtual { slot: u32 },
    /// Directly to the parent implementation, with `this` as receiver.
    Super,
    /// Directly, with no receiver.
    Static,
}

/// The statically resolved target of a `Call`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTarget {
    pub method: MethodId,
    pub dispatch: Dispatch,
}

/// Type checking results.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    /// Static type per expression; `None` for class references and `super`.
    types: Vec<Option<DataType>>,
    calls: FxHashMap<ExprId, CallTarget>,
    fields: FxHashMap<ExprId, FieldId>,
}

impl TypeTable {
    pub fn with_expr_count(count: usize) -> Self {
        Self {
            types: vec![None; count],
            ..Self::default()
        }
    }

    pub fn set_type(&mut self, expr: ExprId, ty: DataType) {
        if let Some(slot) = self.types.get_mut(expr.index()) {
            *slot = Some(ty);
        }
    }

    pub fn type_of(&self, expr: ExprId) -> Option<DataType> {
        self.types.get(expr.index()).copied().flatten()
    }

    pub fn set_call(&mut self, expr: ExprId, target: CallTarget) {
        self.calls.insert(expr, target);
    }

    pub fn call(&self, expr: ExprId) -> Option<CallTarget> {
        self.calls.get(&expr).copied()
    }

    pub fn set_field(&mut self, expr: ExprId, field: FieldId) {
        self.fields.insert(expr, field);
    }

    pub fn field(&self, expr: ExprId) -> Option<FieldId> {
        self.fields.get(&expr).copied()
    }

    pub fn typed_count(&self) -> usize {
        self.types.iter().filter(|t| t.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_default_to_empty() {
        let mut bindings = Bindings::with_method_count(1);
        let stmt = StmtId::from_index(4);
        assert!(bindings.declarations(stmt).is_empty());
        bindings.declare(stmt, VarId::new(0));
        bindings.declare(stmt, VarId::new(1));
        assert_eq!(bindings.declarations(stmt), &[VarId::new(0), VarId::new(1)]);
    }

    #[test]
    fn locals_grow_on_demand() {
        let mut bindings = Bindings::default();
        bindings.add_local(MethodId::new(2), VarId::new(5));
        assert_eq!(bindings.locals(MethodId::new(2)), &[VarId::new(5)]);
        assert!(bindings.locals(MethodId::new(0)).is_empty());
        assert!(bindings.locals(MethodId::new(9)).is_empty());
    }

    #[test]
    fn type_table_ignores_out_of_range_ids() {
        let mut table = TypeTable::with_expr_count(2);
        table.set_type(ExprId::from_index(1), DataType::int());
        table.set_type(ExprId::from_index(7), DataType::int());
        assert_eq!(table.type_of(ExprId::from_index(1)), Some(DataType::int()));
        assert_eq!(table.type_of(ExprId::from_index(7)), None);
        assert_eq!(table.typed_count(), 1);
    }
}
