//! Member Pass (Pass 2) - register fields, methods and formals.
//!
//! Classes are visited parents-first, so when a class is processed every
//! ancestor's members and vtable are final. That lets this pass:
//!
//! - reject a member name already used in the class, or used by an ancestor
//!   in the other role (field vs. method), or by an ancestor field;
//! - mark a method sharing an ancestor method's name as an override and check
//!   its signature matches exactly;
//! - build the class vtable by copying the parent's and either overwriting
//!   the overridden slot or appending a new one.
//!
//! ## Example
//!
//! ```text
//! class Animal { string speak(); void eat(); }   V_Animal: [Animal.speak, Animal.eat]
//! class Dog : Animal { string speak(); void fetch(); }
//!                                                V_Dog:    [Dog.speak, Animal.eat, Dog.fetch]
//! ```

use rustc_hash::FxHashMap;

use decaf_ast::{ClassDecl, FieldDecl, MethodDecl, Program};
use decaf_core::{ClassId, CompilationError, DataType, FieldId, MethodId, ScopeId, VarId};
use decaf_registry::{
    FieldEntry, MethodEntry, StorageClass, Symbol, SymbolRegistry, VariableEntry,
};

use crate::annotations::MethodSource;
use crate::type_resolver::TypeResolver;

/// Output of the member pass.
#[derive(Debug, Default)]
pub struct MemberOutput {
    /// Declaration site per registered method, indexed by [`MethodId`].
    pub methods: Vec<MethodSource>,
    pub fields_registered: usize,
    pub overrides: usize,
    pub errors: Vec<CompilationError>,
}

/// Member Pass - fields, methods, overrides and vtables.
pub struct MemberPass<'a> {
    program: &'a Program,
    registry: &'a mut SymbolRegistry,
    class_ids: &'a [Option<ClassId>],
    order: &'a [ClassId],
}

impl<'a> MemberPass<'a> {
    pub fn new(
        program: &'a Program,
        registry: &'a mut SymbolRegistry,
        class_ids: &'a [Option<ClassId>],
        order: &'a [ClassId],
    ) -> Self {
        Self {
            program,
            registry,
            class_ids,
            order,
        }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self) -> MemberOutput {
        let mut output = MemberOutput::default();

        let decl_of: FxHashMap<ClassId, usize> = self
            .class_ids
            .iter()
            .enumerate()
            .filter_map(|(index, id)| id.map(|id| (id, index)))
            .collect();

        let program = self.program;
        for &class in self.order {
            let Some(&decl_index) = decl_of.get(&class) else {
                continue;
            };
            let decl = &program.classes[decl_index];
            self.register_fields(class, decl, &mut output);
            self.register_methods(class, decl_index, decl, &mut output);
            self.build_vtable(class);
        }

        log::debug!(
            "members: {} fields, {} methods ({} overrides), {} errors",
            output.fields_registered,
            output.methods.len(),
            output.overrides,
            output.errors.len()
        );
        output
    }

    // ==========================================================================
    // Fields
    // ==========================================================================

    fn register_fields(&mut self, class: ClassId, decl: &ClassDecl, output: &mut MemberOutput) {
        for field in &decl.fields {
            if let Some(error) = self.field_conflict(class, field) {
                output.errors.push(error);
                continue;
            }
            let ty = match TypeResolver::new(self.registry).resolve(&field.ty) {
                Ok(ty) => ty,
                Err(error) => {
                    output.errors.push(error);
                    // Placeholder; the phase fails so it is never type checked.
                    DataType::Null
                }
            };
            let entry = FieldEntry {
                id: FieldId::new(0),
                name: field.name.clone(),
                ty,
                owner: class,
                visibility: field.visibility,
                is_static: field.is_static,
                span: field.span,
            };
            if self.registry.register_field(entry).is_ok() {
                output.fields_registered += 1;
            }
        }
    }

    fn field_conflict(&self, class: ClassId, field: &FieldDecl) -> Option<CompilationError> {
        let entry = self.registry.class(class);
        match self.registry.scopes().get(entry.scope).get(&field.name) {
            Some(Symbol::Field(_)) => {
                return Some(CompilationError::DuplicateDeclaration {
                    name: field.name.clone(),
                    scope: format!("class '{}'", entry.name),
                    span: field.span,
                });
            }
            Some(other) => {
                return Some(CompilationError::MemberRoleConflict {
                    name: field.name.clone(),
                    role: other.role(),
                    other_role: "field",
                    class: entry.name.clone(),
                    span: field.span,
                });
            }
            None => {}
        }
        match self.registry.find_inherited_member(class, &field.name)? {
            Symbol::Field(inherited) => {
                let owner = self.registry.field(inherited).owner;
                Some(CompilationError::HiddenField {
                    name: field.name.clone(),
                    ancestor: self.registry.class(owner).name.clone(),
                    span: field.span,
                })
            }
            other => Some(CompilationError::MemberRoleConflict {
                name: field.name.clone(),
                role: other.role(),
                other_role: "field",
                class: self.owner_name(other),
                span: field.span,
            }),
        }
    }

    // ==========================================================================
    // Methods
    // ==========================================================================

    fn register_methods(
        &mut self,
        class: ClassId,
        decl_index: usize,
        decl: &ClassDecl,
        output: &mut MemberOutput,
    ) {
        for (method_index, method) in decl.methods.iter().enumerate() {
            let inherited = match self.method_conflict(class, method) {
                Ok(inherited) => inherited,
                Err(error) => {
                    output.errors.push(error);
                    continue;
                }
            };

            let resolver = TypeResolver::new(self.registry);
            let mut param_types = Vec::with_capacity(method.params.len());
            for param in &method.params {
                match resolver.resolve(&param.ty) {
                    Ok(ty) => param_types.push(ty),
                    Err(error) => {
                        output.errors.push(error);
                        param_types.push(DataType::Null);
                    }
                }
            }
            let return_type = match resolver.resolve(&method.return_type) {
                Ok(ty) => ty,
                Err(error) => {
                    output.errors.push(error);
                    DataType::void()
                }
            };

            let entry = MethodEntry {
                id: MethodId::new(0),
                name: method.name.clone(),
                params: Vec::new(),
                param_types,
                return_type,
                owner: class,
                visibility: method.visibility,
                is_static: method.is_static,
                vtable_slot: None,
                overrides: None,
                scope: ScopeId::new(0),
                span: method.span,
            };

            let overrides = match inherited {
                Some(parent) => match self.check_override(&entry, parent) {
                    Ok(()) => Some(parent),
                    Err(error) => {
                        output.errors.push(error);
                        None
                    }
                },
                None => None,
            };

            let Ok(id) = self.registry.register_method(entry) else {
                continue;
            };
            output.methods.push(MethodSource {
                class: decl_index,
                method: method_index,
            });
            if overrides.is_some() {
                output.overrides += 1;
            }
            self.registry.method_mut(id).overrides = overrides;

            let params = self.register_params(id, method, output);
            self.registry.method_mut(id).params = params;
        }
    }

    /// Checks the method name against the class and its ancestors.
    ///
    /// Returns the ancestor method it would override, if any.
    fn method_conflict(
        &self,
        class: ClassId,
        method: &MethodDecl,
    ) -> Result<Option<MethodId>, CompilationError> {
        let entry = self.registry.class(class);
        match self.registry.scopes().get(entry.scope).get(&method.name) {
            Some(Symbol::Method(_)) => {
                return Err(CompilationError::DuplicateDeclaration {
                    name: method.name.clone(),
                    scope: format!("class '{}'", entry.name),
                    span: method.span,
                });
            }
            Some(other) => {
                return Err(CompilationError::MemberRoleConflict {
                    name: method.name.clone(),
                    role: other.role(),
                    other_role: "method",
                    class: entry.name.clone(),
                    span: method.span,
                });
            }
            None => {}
        }
        match self.registry.find_inherited_member(class, &method.name) {
            None => Ok(None),
            Some(Symbol::Method(parent)) => Ok(Some(parent)),
            Some(other) => Err(CompilationError::MemberRoleConflict {
                name: method.name.clone(),
                role: other.role(),
                other_role: "method",
                class: self.owner_name(other),
                span: method.span,
            }),
        }
    }

    fn check_override(&self, method: &MethodEntry, parent: MethodId) -> Result<(), CompilationError> {
        let overridden = self.registry.method(parent);
        let reason = if method.is_static != overridden.is_static {
            Some(if method.is_static {
                "a static method cannot override an instance method".to_string()
            } else {
                "an instance method cannot override a static method".to_string()
            })
        } else if method.param_types != overridden.param_types {
            Some(format!(
                "parameter types ({}) differ from ({})",
                self.type_list(&method.param_types),
                self.type_list(&overridden.param_types)
            ))
        } else if method.return_type != overridden.return_type {
            Some(format!(
                "return type '{}' differs from '{}'",
                self.registry.type_name(method.return_type),
                self.registry.type_name(overridden.return_type)
            ))
        } else {
            None
        };

        match reason {
            None => Ok(()),
            Some(reason) => Err(CompilationError::IncompatibleOverride {
                class: self.registry.class(method.owner).name.clone(),
                method: method.name.clone(),
                ancestor: self.registry.class(overridden.owner).name.clone(),
                reason,
                span: method.span,
            }),
        }
    }

    fn register_params(
        &mut self,
        method: MethodId,
        decl: &MethodDecl,
        output: &mut MemberOutput,
    ) -> Vec<VarId> {
        let scope = self.registry.method(method).scope;
        let types = self.registry.method(method).param_types.clone();
        let mut params = Vec::with_capacity(decl.params.len());
        for (index, (param, ty)) in decl.params.iter().zip(types).enumerate() {
            let entry = VariableEntry {
                id: VarId::new(0),
                name: param.name.clone(),
                ty,
                method,
                storage: StorageClass::Parameter(index as u32),
                span: param.span,
            };
            match self.registry.register_variable(scope, entry) {
                Ok(id) => params.push(id),
                Err(_) => output.errors.push(CompilationError::DuplicateDeclaration {
                    name: param.name.clone(),
                    scope: format!("method '{}'", self.registry.method_path(method)),
                    span: param.span,
                }),
            }
        }
        params
    }

    // ==========================================================================
    // Vtables
    // ==========================================================================

    fn build_vtable(&mut self, class: ClassId) {
        let mut vtable = match self.registry.class(class).parent {
            Some(parent) => self.registry.class(parent).vtable.clone(),
            None => Vec::new(),
        };

        let methods = self.registry.class(class).methods.clone();
        for id in methods {
            let method = self.registry.method(id);
            if method.is_static {
                continue;
            }
            let inherited_slot = method
                .overrides
                .and_then(|parent| self.registry.method(parent).vtable_slot);
            let slot = match inherited_slot {
                Some(slot) => {
                    vtable[slot as usize] = id;
                    slot
                }
                None => {
                    vtable.push(id);
                    (vtable.len() - 1) as u32
                }
            };
            self.registry.method_mut(id).vtable_slot = Some(slot);
        }

        log::trace!(
            "vtable for {}: {} slots",
            self.registry.class(class).name,
            vtable.len()
        );
        self.registry.class_mut(class).vtable = vtable;
    }

    // ==========================================================================
    // Helpers
    // ==========================================================================

    fn type_list(&self, types: &[DataType]) -> String {
        types
            .iter()
            .map(|&t| self.registry.type_name(t))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn owner_name(&self, symbol: Symbol) -> String {
        let owner = match symbol {
            Symbol::Field(id) => self.registry.field(id).owner,
            Symbol::Method(id) => self.registry.method(id).owner,
            Symbol::Class(id) => id,
            Symbol::Variable(id) => {
                let method = self.registry.variable(id).method;
                self.registry.method(method).owner
            }
        };
        self.registry.class(owner).name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::RegistrationPass;
    use decaf_ast::ProgramBuilder;
    use decaf_core::ErrorKind;

    fn run(program: &Program) -> (SymbolRegistry, MemberOutput) {
        let mut registry = SymbolRegistry::new();
        let registration = RegistrationPass::new(program, &mut registry).run();
        assert!(registration.errors.is_empty(), "{:?}", registration.errors);
        let output = MemberPass::new(
            program,
            &mut registry,
            &registration.class_ids,
            &registration.order,
        )
        .run();
        (registry, output)
    }

    /// `Dog` declared before `Animal` to exercise parents-first order.
    fn animals(dog_speak_returns: &str) -> Program {
        let mut b = ProgramBuilder::new();
        let body = b.block(vec![]);
        let speak = b.method("speak", dog_speak_returns, &[], body);
        let fetch = b.method("fetch", "void", &[], body);
        b.class("Dog", Some("Animal"), vec![], vec![speak, fetch]);

        let speak = b.method("speak", "string", &[], body);
        let eat = b.method("eat", "void", &[("amount", "int")], body);
        let name = b.field("name", "string");
        b.class("Animal", None, vec![name], vec![speak, eat]);
        b.finish()
    }

    #[test]
    fn override_shares_vtable_slot() {
        let program = animals("string");
        let (registry, output) = run(&program);
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        assert_eq!(output.overrides, 1);

        let animal = registry.class_by_name("Animal").unwrap();
        let dog = registry.class_by_name("Dog").unwrap();
        let animal_speak = registry.find_method(animal, "speak").unwrap();
        let dog_speak = registry.find_method(dog, "speak").unwrap();

        assert_eq!(registry.method(dog_speak).overrides, Some(animal_speak));
        assert_eq!(
            registry.method(dog_speak).vtable_slot,
            registry.method(animal_speak).vtable_slot
        );

        let names: Vec<_> = registry
            .class(dog)
            .vtable
            .iter()
            .map(|&m| registry.method_path(m))
            .collect();
        assert_eq!(names, vec!["Dog.speak", "Animal.eat", "Dog.fetch"]);
    }

    #[test]
    fn override_with_other_return_type_is_rejected() {
        let program = animals("int");
        let (_, output) = run(&program);
        assert_eq!(output.errors.len(), 1);
        let err = &output.errors[0];
        assert_eq!(err.kind(), ErrorKind::DeclarationError);
        assert!(err.to_string().contains("return type 'int' differs from 'string'"));
    }

    #[test]
    fn override_with_other_params_is_rejected() {
        let mut b = ProgramBuilder::new();
        let body = b.block(vec![]);
        let eat = b.method("eat", "void", &[("amount", "int")], body);
        b.class("Animal", None, vec![], vec![eat]);
        let eat = b.method("eat", "void", &[("amount", "double")], body);
        b.class("Dog", Some("Animal"), vec![], vec![eat]);
        let program = b.finish();

        let (_, output) = run(&program);
        assert_eq!(output.errors.len(), 1);
        assert!(output.errors[0].to_string().contains("parameter types (double) differ from (int)"));
    }

    #[test]
    fn static_cannot_override_instance() {
        let mut b = ProgramBuilder::new();
        let body = b.block(vec![]);
        let run_m = b.method("run", "void", &[], body);
        b.class("A", None, vec![], vec![run_m]);
        let run_s = b.method("run", "void", &[], body).into_static();
        b.class("B", Some("A"), vec![], vec![run_s]);
        let program = b.finish();

        let (registry, output) = run(&program);
        assert_eq!(output.errors.len(), 1);
        assert!(output.errors[0].to_string().contains("static method cannot override"));
        let b_run = registry.find_method(registry.class_by_name("B").unwrap(), "run").unwrap();
        assert_eq!(registry.method(b_run).vtable_slot, None);
    }

    #[test]
    fn duplicate_members_and_role_conflicts() {
        let mut b = ProgramBuilder::new();
        let body = b.block(vec![]);
        let size = b.method("size", "int", &[], body);
        let x1 = b.field("x", "int");
        b.at(3, 1);
        let x2 = b.field("x", "double");
        let size_field = b.field("size", "int");
        b.class("A", None, vec![x1, x2, size_field], vec![size]);
        let program = b.finish();

        let (_, output) = run(&program);
        assert_eq!(output.errors.len(), 2);
        assert!(matches!(output.errors[0], CompilationError::DuplicateDeclaration { .. }));
        assert_eq!(output.errors[0].span().line, 3);
        // The field is registered first, so the method is the conflicting one.
        assert!(matches!(
            output.errors[1],
            CompilationError::MemberRoleConflict { role: "field", other_role: "method", .. }
        ));
    }

    #[test]
    fn inherited_name_reused_in_other_role() {
        let mut b = ProgramBuilder::new();
        let body = b.block(vec![]);
        let name = b.field("name", "string");
        let age = b.field("age", "int");
        b.class("Animal", None, vec![name, age], vec![]);
        let name_method = b.method("name", "string", &[], body);
        let age_again = b.field("age", "int");
        b.class("Dog", Some("Animal"), vec![age_again], vec![name_method]);
        let program = b.finish();

        let (_, output) = run(&program);
        assert_eq!(output.errors.len(), 2);
        assert!(matches!(output.errors[0], CompilationError::HiddenField { .. }));
        assert!(matches!(output.errors[1], CompilationError::MemberRoleConflict { .. }));
    }

    #[test]
    fn duplicate_parameter_names() {
        let mut b = ProgramBuilder::new();
        let body = b.block(vec![]);
        let m = b.method("m", "void", &[("a", "int"), ("a", "int")], body);
        b.class("A", None, vec![], vec![m]);
        let program = b.finish();

        let (_, output) = run(&program);
        assert_eq!(output.errors.len(), 1);
        assert!(output.errors[0].to_string().contains("method 'A.m'"));
    }

    #[test]
    fn unknown_member_types_are_resolution_errors() {
        let mut b = ProgramBuilder::new();
        let body = b.block(vec![]);
        let m = b.method("m", "Ghost", &[("p", "Phantom")], body);
        let f = b.field("f", "Spirit");
        b.class("A", None, vec![f], vec![m]);
        let program = b.finish();

        let (_, output) = run(&program);
        assert_eq!(output.errors.len(), 3);
        assert!(output.errors.iter().all(|e| e.kind() == ErrorKind::ResolutionError));
    }
}
