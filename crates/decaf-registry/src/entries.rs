//! Descriptors for classes, fields, methods and variables.
//!
//! Descriptors refer to each other by id. A class holds its parent's id, never
//! the parent itself, so the graph can be built in any order and read
//! without borrowing through it.

use decaf_core::{ClassId, DataType, FieldId, MethodId, ScopeId, Span, VarId, Visibility};

// ============================================================================
// ClassEntry
// ============================================================================

/// A registered class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassEntry {
    pub id: ClassId,
    pub name: String,
    /// Parent name as written; `None` for root classes.
    pub parent_name: Option<String>,
    /// Resolved parent. Stays `None` when the parent is unknown or cyclic.
    pub parent: Option<ClassId>,
    /// The class member scope.
    pub scope: ScopeId,
    /// Own fields in declaration order.
    pub fields: Vec<FieldId>,
    /// Own methods in declaration order.
    pub methods: Vec<MethodId>,
    /// Virtual method table: slot index to implementation, inherited slots first.
    pub vtable: Vec<MethodId>,
    pub span: Span,
}

impl ClassEntry {
    pub fn new(id: ClassId, name: impl Into<String>, scope: ScopeId, span: Span) -> Self {
        Self {
            id,
            name: name.into(),
            parent_name: None,
            parent: None,
            scope,
            fields: Vec::new(),
            methods: Vec::new(),
            vtable: Vec::new(),
            span,
        }
    }

    pub fn with_parent_name(mut self, parent: impl Into<String>) -> Self {
        self.parent_name = Some(parent.into());
        self
    }
}

// ============================================================================
// FieldEntry
// ============================================================================

/// A field declared in a class.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub id: FieldId,
    pub name: String,
    pub ty: DataType,
    pub owner: ClassId,
    pub visibility: Visibility,
    pub is_static: bool,
    pub span: Span,
}

// ============================================================================
// MethodEntry
// ============================================================================

/// A method declared in a class.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodEntry {
    pub id: MethodId,
    pub name: String,
    /// Parameter variables in order.
    pub params: Vec<VarId>,
    pub param_types: Vec<DataType>,
    pub return_type: DataType,
    pub owner: ClassId,
    pub visibility: Visibility,
    pub is_static: bool,
    /// Slot in the owner's vtable; `None` for static methods.
    pub vtable_slot: Option<u32>,
    /// The ancestor method this one overrides.
    pub overrides: Option<MethodId>,
    /// The method body scope, holding formals and top-level locals.
    pub scope: ScopeId,
    pub span: Span,
}

impl MethodEntry {
    pub fn arity(&self) -> usize {
        self.param_types.len()
    }
}

// ============================================================================
// VariableEntry
// ============================================================================

/// Where a variable lives relative to its method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    /// The `index`th formal parameter.
    Parameter(u32),
    /// The `index`th local declared in the method body, in declaration order.
    Local(u32),
}

/// A formal parameter or local variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableEntry {
    pub id: VarId,
    pub name: String,
    pub ty: DataType,
    pub method: MethodId,
    pub storage: StorageClass,
    pub span: Span,
}

impl VariableEntry {
    pub fn is_parameter(&self) -> bool {
        matches!(self.storage, StorageClass::Parameter(_))
    }
}
