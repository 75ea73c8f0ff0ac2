//! Scope tree.
//!
//! Scopes are stored in one `Vec` and point at their enclosing scope by
//! index. Each scope keeps its symbols in declaration order alongside a
//! name index, so lookups are O(1) and iteration is deterministic.

use rustc_hash::FxHashMap;

use decaf_core::{ClassId, FieldId, MethodId, ScopeId, VarId};

/// What a name in a scope is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Class(ClassId),
    Field(FieldId),
    Method(MethodId),
    Variable(VarId),
}

impl Symbol {
    /// Role name used in diagnostics.
    pub const fn role(&self) -> &'static str {
        match self {
            Symbol::Class(_) => "class",
            Symbol::Field(_) => "field",
            Symbol::Method(_) => "method",
            Symbol::Variable(_) => "variable",
        }
    }
}

/// The kind of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Holds every class name.
    Global,
    /// Holds the members declared by one class.
    Class(ClassId),
    /// Holds a method's formals and top-level locals.
    Method(MethodId),
    /// A nested `{ }` block.
    Block,
}

/// One scope: ordered name to symbol mapping with a parent link.
#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    symbols: Vec<(String, Symbol)>,
    index: FxHashMap<String, usize>,
}

impl Scope {
    fn new(id: ScopeId, kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            id,
            kind,
            parent,
            symbols: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Look a name up in this scope only.
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.index.get(name).map(|&i| self.symbols[i].1)
    }

    /// Symbols in declaration order.
    pub fn symbols(&self) -> impl Iterator<Item = (&str, Symbol)> {
        self.symbols.iter().map(|(name, symbol)| (name.as_str(), *symbol))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// All scopes of a compilation unit. Scope 0 is the global scope.
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeId::new(0), ScopeKind::Global, None)],
        }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId::new(0)
    }

    /// Open a scope nested in `parent`.
    pub fn push(&mut self, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        let id = ScopeId::from_index(self.scopes.len());
        self.scopes.push(Scope::new(id, kind, Some(parent)));
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    /// Bind `name` in `scope`.
    ///
    /// Returns the existing symbol if the name is already bound in that
    /// scope; the binding is left unchanged in that case.
    pub fn declare(&mut self, scope: ScopeId, name: &str, symbol: Symbol) -> Result<(), Symbol> {
        let scope = &mut self.scopes[scope.index()];
        if let Some(existing) = scope.get(name) {
            return Err(existing);
        }
        scope.index.insert(name.to_string(), scope.symbols.len());
        scope.symbols.push((name.to_string(), symbol));
        Ok(())
    }

    /// Walk from `scope` out to the global scope.
    pub fn chain(&self, scope: ScopeId) -> impl Iterator<Item = &Scope> {
        let mut next = Some(scope);
        std::iter::from_fn(move || {
            let scope = self.get(next?);
            next = scope.parent;
            Some(scope)
        })
    }

    /// The method scope enclosing `scope`, if any.
    pub fn enclosing_method(&self, scope: ScopeId) -> Option<MethodId> {
        self.chain(scope).find_map(|s| match s.kind {
            ScopeKind::Method(method) => Some(method),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}
