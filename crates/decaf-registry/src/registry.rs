//! SymbolRegistry - owner of every descriptor and scope in a compilation unit.
//!
//! # Storage Model
//!
//! - **Descriptors**: classes, fields, methods and variables live in dense
//!   `Vec`s indexed by their id newtypes.
//! - **Scopes**: a [`ScopeTree`]; the global scope maps class names, each
//!   class scope maps its own members, method and block scopes map variables.
//! - **Inheritance**: each [`ClassEntry`] stores its parent id. Lookups that
//!   cross classes walk that chain with [`SymbolRegistry::ancestors`].
//!
//! The registry is filled by the resolution passes and only read afterwards.

use decaf_core::{ClassId, DataType, FieldId, MethodId, ScopeId, VarId};

use crate::entries::{ClassEntry, FieldEntry, MethodEntry, VariableEntry};
use crate::scope::{ScopeKind, ScopeTree, Symbol};

/// The symbol graph of one compilation unit.
#[derive(Debug, Clone, Default)]
pub struct SymbolRegistry {
    classes: Vec<ClassEntry>,
    fields: Vec<FieldEntry>,
    methods: Vec<MethodEntry>,
    variables: Vec<VariableEntry>,
    scopes: ScopeTree,
}

impl SymbolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Register a class name in the global scope and open its member scope.
    ///
    /// On a duplicate name the existing symbol is returned and nothing is
    /// registered.
    pub fn register_class(
        &mut self,
        name: &str,
        parent_name: Option<&str>,
        span: decaf_core::Span,
    ) -> Result<ClassId, Symbol> {
        let id = ClassId::from_index(self.classes.len());
        let global = self.scopes.global();
        self.scopes.declare(global, name, Symbol::Class(id))?;
        let scope = self.scopes.push(ScopeKind::Class(id), global);
        let mut entry = ClassEntry::new(id, name, scope, span);
        if let Some(parent) = parent_name {
            entry = entry.with_parent_name(parent);
        }
        self.classes.push(entry);
        Ok(id)
    }

    /// Add a field descriptor to its owner and bind it in the owner's scope.
    pub fn register_field(&mut self, mut entry: FieldEntry) -> Result<FieldId, Symbol> {
        let id = FieldId::from_index(self.fields.len());
        entry.id = id;
        let scope = self.classes[entry.owner.index()].scope;
        self.scopes.declare(scope, &entry.name, Symbol::Field(id))?;
        self.classes[entry.owner.index()].fields.push(id);
        self.fields.push(entry);
        Ok(id)
    }

    /// Add a method descriptor to its owner, bind it, and open its body scope.
    ///
    /// The `scope` of `entry` is overwritten with the new method scope.
    pub fn register_method(&mut self, mut entry: MethodEntry) -> Result<MethodId, Symbol> {
        let id = MethodId::from_index(self.methods.len());
        entry.id = id;
        let class_scope = self.classes[entry.owner.index()].scope;
        self.scopes.declare(class_scope, &entry.name, Symbol::Method(id))?;
        entry.scope = self.scopes.push(ScopeKind::Method(id), class_scope);
        self.classes[entry.owner.index()].methods.push(id);
        self.methods.push(entry);
        Ok(id)
    }

    /// Add a variable descriptor and bind it in `scope`.
    pub fn register_variable(
        &mut self,
        scope: ScopeId,
        mut entry: VariableEntry,
    ) -> Result<VarId, Symbol> {
        let id = VarId::from_index(self.variables.len());
        entry.id = id;
        self.scopes.declare(scope, &entry.name, Symbol::Variable(id))?;
        self.variables.push(entry);
        Ok(id)
    }

    /// Open a block scope nested in `parent`.
    pub fn push_block_scope(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.push(ScopeKind::Block, parent)
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassEntry {
        &mut self.classes[id.index()]
    }

    pub fn method_mut(&mut self, id: MethodId) -> &mut MethodEntry {
        &mut self.methods[id.index()]
    }

    // ==========================================================================
    // Access
    // ==========================================================================

    pub fn class(&self, id: ClassId) -> &ClassEntry {
        &self.classes[id.index()]
    }

    pub fn field(&self, id: FieldId) -> &FieldEntry {
        &self.fields[id.index()]
    }

    pub fn method(&self, id: MethodId) -> &MethodEntry {
        &self.methods[id.index()]
    }

    pub fn variable(&self, id: VarId) -> &VariableEntry {
        &self.variables[id.index()]
    }

    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    /// Classes in declaration order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassEntry> {
        self.classes.iter()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        match self.scopes.get(self.scopes.global()).get(name) {
            Some(Symbol::Class(id)) => Some(id),
            _ => None,
        }
    }

    // ==========================================================================
    // Inheritance
    // ==========================================================================

    /// The class itself followed by its ancestors, nearest first.
    pub fn ancestors(&self, class: ClassId) -> Ancestors<'_> {
        Ancestors {
            registry: self,
            next: Some(class),
            remaining: self.classes.len(),
        }
    }

    /// `sub` is `sup` or a descendant of it.
    pub fn is_subclass(&self, sub: ClassId, sup: ClassId) -> bool {
        self.ancestors(sub).any(|c| c == sup)
    }

    /// The `≤` relation: `from` may be stored where `to` is expected.
    pub fn is_assignable(&self, from: DataType, to: DataType) -> bool {
        match (from, to) {
            _ if from == to => true,
            (DataType::Null, DataType::Class(_)) => true,
            (DataType::Class(sub), DataType::Class(sup)) => self.is_subclass(sub, sup),
            _ => false,
        }
    }

    /// Either type is `≤` the other.
    pub fn are_related(&self, a: DataType, b: DataType) -> bool {
        self.is_assignable(a, b) || self.is_assignable(b, a)
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    /// A member declared in `class` or the nearest ancestor declaring it.
    pub fn find_member(&self, class: ClassId, name: &str) -> Option<Symbol> {
        self.ancestors(class)
            .find_map(|c| self.scopes.get(self.class(c).scope).get(name))
    }

    /// A member declared in a proper ancestor of `class`.
    pub fn find_inherited_member(&self, class: ClassId, name: &str) -> Option<Symbol> {
        self.class(class)
            .parent
            .and_then(|parent| self.find_member(parent, name))
    }

    /// A field visible through `class`, walking the inheritance chain outward.
    pub fn find_field(&self, class: ClassId, name: &str) -> Option<FieldId> {
        match self.find_member(class, name) {
            Some(Symbol::Field(id)) => Some(id),
            _ => None,
        }
    }

    /// A method visible through `class`, walking the inheritance chain outward.
    pub fn find_method(&self, class: ClassId, name: &str) -> Option<MethodId> {
        match self.find_member(class, name) {
            Some(Symbol::Method(id)) => Some(id),
            _ => None,
        }
    }

    /// Resolve `name` as seen from `scope`.
    ///
    /// Walks block scopes out to the method scope, then the class scope and
    /// every ancestor's member scope, then the global scope. The first match
    /// wins.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<Symbol> {
        for s in self.scopes.chain(scope) {
            if let Some(symbol) = s.get(name) {
                return Some(symbol);
            }
            if let ScopeKind::Class(class) = s.kind
                && let Some(symbol) = self.find_inherited_member(class, name)
            {
                return Some(symbol);
            }
        }
        None
    }

    // ==========================================================================
    // Display helpers
    // ==========================================================================

    /// Source spelling of a type, with class names resolved.
    pub fn type_name(&self, ty: DataType) -> String {
        match ty {
            DataType::Class(id) => self.class(id).name.clone(),
            other => other.to_string(),
        }
    }

    /// `Class.method` for diagnostics and labels.
    pub fn method_path(&self, id: MethodId) -> String {
        let method = self.method(id);
        format!("{}.{}", self.class(method.owner).name, method.name)
    }
}

/// Iterator over a class and its ancestors, nearest first.
///
/// Bounded by the number of classes, so a parent chain corrupted into a
/// cycle still terminates.
pub struct Ancestors<'a> {
    registry: &'a SymbolRegistry,
    next: Option<ClassId>,
    remaining: usize,
}

impl Iterator for Ancestors<'_> {
    type Item = ClassId;

    fn next(&mut self) -> Option<ClassId> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next?;
        self.remaining -= 1;
        self.next = self.registry.class(current).parent;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::StorageClass;
    use decaf_core::{Span, Visibility};

    fn field(owner: ClassId, name: &str, ty: DataType) -> FieldEntry {
        FieldEntry {
            id: FieldId::new(0),
            name: name.into(),
            ty,
            owner,
            visibility: Visibility::Public,
            is_static: false,
            span: Span::default(),
        }
    }

    fn method(owner: ClassId, name: &str) -> MethodEntry {
        MethodEntry {
            id: MethodId::new(0),
            name: name.into(),
            params: Vec::new(),
            param_types: Vec::new(),
            return_type: DataType::void(),
            owner,
            visibility: Visibility::Public,
            is_static: false,
            vtable_slot: None,
            overrides: None,
            scope: ScopeId::new(0),
            span: Span::default(),
        }
    }

    /// `Animal { name; speak() }`, `Dog extends Animal { bark() }`.
    fn animals() -> (SymbolRegistry, ClassId, ClassId) {
        let mut reg = SymbolRegistry::new();
        let animal = reg.register_class("Animal", None, Span::default()).unwrap();
        let dog = reg
            .register_class("Dog", Some("Animal"), Span::default())
            .unwrap();
        reg.class_mut(dog).parent = Some(animal);
        reg.register_field(field(animal, "name", DataType::string())).unwrap();
        reg.register_method(method(animal, "speak")).unwrap();
        reg.register_method(method(dog, "bark")).unwrap();
        (reg, animal, dog)
    }

    #[test]
    fn duplicate_class_is_rejected() {
        let mut reg = SymbolRegistry::new();
        let a = reg.register_class("A", None, Span::default()).unwrap();
        assert_eq!(
            reg.register_class("A", None, Span::default()),
            Err(Symbol::Class(a))
        );
        assert_eq!(reg.class_count(), 1);
    }

    #[test]
    fn subclass_relation() {
        let (reg, animal, dog) = animals();
        assert!(reg.is_subclass(dog, animal));
        assert!(!reg.is_subclass(animal, dog));
        assert!(reg.is_assignable(DataType::Class(dog), DataType::Class(animal)));
        assert!(!reg.is_assignable(DataType::Class(animal), DataType::Class(dog)));
        assert!(reg.is_assignable(DataType::Null, DataType::Class(dog)));
        assert!(!reg.is_assignable(DataType::Null, DataType::int()));
        assert!(!reg.is_assignable(DataType::bool(), DataType::int()));
        assert!(reg.are_related(DataType::Class(animal), DataType::Class(dog)));
    }

    #[test]
    fn members_found_through_ancestors() {
        let (reg, _, dog) = animals();
        assert!(reg.find_field(dog, "name").is_some());
        assert!(reg.find_method(dog, "speak").is_some());
        assert!(reg.find_method(dog, "bark").is_some());
        assert!(reg.find_method(dog, "name").is_none());
        assert!(reg.find_inherited_member(dog, "bark").is_none());
    }

    #[test]
    fn lookup_walks_blocks_class_ancestors_then_global() {
        let (mut reg, animal, dog) = animals();
        let bark = reg.find_method(dog, "bark").unwrap();
        let method_scope = reg.method(bark).scope;
        let block = reg.push_block_scope(method_scope);
        let local = reg
            .register_variable(
                block,
                VariableEntry {
                    id: VarId::new(0),
                    name: "name".into(),
                    ty: DataType::int(),
                    method: bark,
                    storage: StorageClass::Local(0),
                    span: Span::default(),
                },
            )
            .unwrap();

        // Innermost binding shadows the inherited field.
        assert_eq!(reg.lookup(block, "name"), Some(Symbol::Variable(local)));
        assert_eq!(
            reg.lookup(method_scope, "name"),
            reg.find_field(animal, "name").map(Symbol::Field)
        );
        assert_eq!(reg.lookup(block, "Dog"), Some(Symbol::Class(dog)));
        assert_eq!(reg.lookup(block, "missing"), None);
    }

    #[test]
    fn ancestors_terminate_on_corrupt_cycle() {
        let mut reg = SymbolRegistry::new();
        let a = reg.register_class("A", None, Span::default()).unwrap();
        let b = reg.register_class("B", None, Span::default()).unwrap();
        reg.class_mut(a).parent = Some(b);
        reg.class_mut(b).parent = Some(a);
        assert_eq!(reg.ancestors(a).count(), 2);
    }

    #[test]
    fn type_names() {
        let (reg, animal, _) = animals();
        assert_eq!(reg.type_name(DataType::Class(animal)), "Animal");
        assert_eq!(reg.type_name(DataType::int()), "int");
    }
}
