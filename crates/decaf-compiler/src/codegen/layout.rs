//! Object, static-area and frame layout.
//!
//! # Objects
//!
//! Word 0 of every object holds its vtable address. Instance fields follow,
//! ancestors' fields first, so a field keeps the same offset in every
//! subclass:
//!
//! ```text
//! Animal: [vtable | name]
//! Dog:    [vtable | name | tricks]
//! ```
//!
//! # Static data
//!
//! Static fields of all classes share one area, in class then field
//! declaration order.
//!
//! # Frames
//!
//! ```text
//! slot 0              this (instance methods only)
//! slot 1..            parameters, in order
//! slot P..            locals, in declaration order
//! slot P + L..        spill slots
//! ```

use rustc_hash::FxHashMap;

use decaf_core::{ClassId, FieldId, MethodId, VarId};
use decaf_registry::{StorageClass, SymbolRegistry};

use crate::annotations::Bindings;

/// Field offsets and object sizes for every class.
#[derive(Debug, Clone, Default)]
pub struct Layouts {
    /// Heap offset per instance field, static-area offset per static field.
    offsets: FxHashMap<FieldId, u32>,
    /// Words per object, including the vtable word, per [`ClassId`].
    object_sizes: Vec<u32>,
    /// Instance fields per class in offset order, inherited ones included.
    instance_fields: Vec<Vec<FieldId>>,
    static_size: u32,
}

impl Layouts {
    /// Lay out every class; `order` must list parents before children.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compute(registry: &SymbolRegistry, order: &[ClassId]) -> Self {
        let count = registry.class_count();
        let mut layouts = Layouts {
            object_sizes: vec![1; count],
            instance_fields: vec![Vec::new(); count],
            ..Layouts::default()
        };

        for &class in order {
            let entry = registry.class(class);
            let mut fields = match entry.parent {
                Some(parent) => layouts.instance_fields[parent.index()].clone(),
                None => Vec::new(),
            };
            for &field in &entry.fields {
                if !registry.field(field).is_static {
                    layouts.offsets.insert(field, 1 + fields.len() as u32);
                    fields.push(field);
                }
            }
            layouts.object_sizes[class.index()] = 1 + fields.len() as u32;
            layouts.instance_fields[class.index()] = fields;
        }

        for class in registry.classes() {
            for &field in &class.fields {
                if registry.field(field).is_static {
                    layouts.offsets.insert(field, layouts.static_size);
                    layouts.static_size += 1;
                }
            }
        }

        log::debug!(
            "layout: {} classes, {} static words",
            count,
            layouts.static_size
        );
        layouts
    }

    /// Heap offset of an instance field, or static-area offset of a static one.
    pub fn field_offset(&self, field: FieldId) -> Option<u32> {
        self.offsets.get(&field).copied()
    }

    pub fn object_size(&self, class: ClassId) -> u32 {
        self.object_sizes.get(class.index()).copied().unwrap_or(1)
    }

    /// Instance fields of `class` in offset order.
    pub fn instance_fields(&self, class: ClassId) -> &[FieldId] {
        self.instance_fields
            .get(class.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Words in the static data area.
    pub fn static_size(&self) -> u32 {
        self.static_size
    }
}

/// Slot assignment for one method's activation record.
#[derive(Debug, Clone)]
pub struct FrameLayout {
    slots: FxHashMap<VarId, u32>,
    has_this: bool,
    /// Slots pushed by the caller: receiver and parameters.
    incoming: u32,
    locals: u32,
}

impl FrameLayout {
    pub fn for_method(registry: &SymbolRegistry, bindings: &Bindings, method: MethodId) -> Self {
        let entry = registry.method(method);
        let has_this = !entry.is_static;
        let base = u32::from(has_this);
        let mut slots = FxHashMap::default();

        for &param in &entry.params {
            if let StorageClass::Parameter(index) = registry.variable(param).storage {
                slots.insert(param, base + index);
            }
        }
        let incoming = base + entry.arity() as u32;

        let locals = bindings.locals(method);
        for &local in locals {
            if let StorageClass::Local(index) = registry.variable(local).storage {
                slots.insert(local, incoming + index);
            }
        }

        Self {
            slots,
            has_this,
            incoming,
            locals: locals.len() as u32,
        }
    }

    /// Slot of `this`, if the method has a receiver.
    pub fn this_slot(&self) -> Option<u32> {
        self.has_this.then_some(0)
    }

    pub fn slot(&self, var: VarId) -> Option<u32> {
        self.slots.get(&var).copied()
    }

    /// First slot after the locals; spill slot `i` lives at `spill_base() + i`.
    pub fn spill_base(&self) -> u32 {
        self.incoming + self.locals
    }

    pub fn local_count(&self) -> u32 {
        self.locals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::{MemberPass, RegistrationPass, ResolutionPass};
    use decaf_ast::{Program, ProgramBuilder};

    struct Resolved {
        registry: SymbolRegistry,
        order: Vec<ClassId>,
        bindings: Bindings,
    }

    fn resolve(program: &Program) -> Resolved {
        let mut registry = SymbolRegistry::new();
        let registration = RegistrationPass::new(program, &mut registry).run();
        let members = MemberPass::new(
            program,
            &mut registry,
            &registration.class_ids,
            &registration.order,
        )
        .run();
        let resolution = ResolutionPass::new(program, &mut registry, &members.methods).run();
        Resolved {
            registry,
            order: registration.order,
            bindings: resolution.bindings,
        }
    }

    #[test]
    fn inherited_fields_keep_their_offsets() {
        let mut b = ProgramBuilder::new();
        let tricks = b.field("tricks", "int");
        let dog_count = b.field("dogs", "int").into_static();
        b.class("Dog", Some("Animal"), vec![tricks, dog_count], vec![]);
        let name = b.field("name", "string");
        let age = b.field("age", "int");
        let animal_count = b.field("animals", "int").into_static();
        b.class("Animal", None, vec![name, animal_count, age], vec![]);
        let program = b.finish();

        let r = resolve(&program);
        let layouts = Layouts::compute(&r.registry, &r.order);
        let animal = r.registry.class_by_name("Animal").unwrap();
        let dog = r.registry.class_by_name("Dog").unwrap();
        let offset = |class, name| {
            layouts
                .field_offset(r.registry.find_field(class, name).unwrap())
                .unwrap()
        };

        assert_eq!(layouts.object_size(animal), 3);
        assert_eq!(layouts.object_size(dog), 4);
        assert_eq!(offset(animal, "name"), 1);
        assert_eq!(offset(animal, "age"), 2);
        assert_eq!(offset(dog, "name"), 1);
        assert_eq!(offset(dog, "tricks"), 3);
        assert_eq!(layouts.instance_fields(dog).len(), 3);

        // Static area follows declaration order: Dog first.
        assert_eq!(layouts.static_size(), 2);
        assert_eq!(offset(dog, "dogs"), 0);
        assert_eq!(offset(animal, "animals"), 1);
    }

    #[test]
    fn frame_puts_this_then_params_then_locals() {
        let mut b = ProgramBuilder::new();
        let x = b.var("x", "int");
        let y = b.var("y", "double");
        let inner = b.block(vec![y]);
        let body = b.block(vec![x, inner]);
        let m = b.method("m", "void", &[("a", "int"), ("b", "bool")], body);
        let body = b.block(vec![]);
        let s = b.method("s", "void", &[("a", "int")], body).into_static();
        b.class("A", None, vec![], vec![m, s]);
        let program = b.finish();

        let r = resolve(&program);
        let m = MethodId::new(0);
        let frame = FrameLayout::for_method(&r.registry, &r.bindings, m);
        let params = &r.registry.method(m).params;
        let locals = r.bindings.locals(m);

        assert_eq!(frame.this_slot(), Some(0));
        assert_eq!(frame.slot(params[0]), Some(1));
        assert_eq!(frame.slot(params[1]), Some(2));
        assert_eq!(frame.slot(locals[0]), Some(3));
        assert_eq!(frame.slot(locals[1]), Some(4));
        assert_eq!(frame.local_count(), 2);
        assert_eq!(frame.spill_base(), 5);

        let s = MethodId::new(1);
        let frame = FrameLayout::for_method(&r.registry, &r.bindings, s);
        assert_eq!(frame.this_slot(), None);
        assert_eq!(frame.slot(r.registry.method(s).params[0]), Some(0));
        assert_eq!(frame.spill_base(), 1);
    }
}
