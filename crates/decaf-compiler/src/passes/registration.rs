//! Registration Pass (Pass 1) - register class names and resolve inheritance.
//!
//! ## Algorithm
//!
//! 1. Register every class name in the global scope, in declaration order.
//!    A repeated name is a duplicate declaration and the later class is dropped.
//! 2. Resolve each declared parent name. An unknown parent is reported and
//!    the class is treated as a root.
//! 3. Build the inheritance graph and report each cycle once. Classes on a
//!    cycle lose their parent link so later passes can keep going.
//! 4. Produce the parents-first order Pass 2 walks.

use decaf_ast::Program;
use decaf_core::{ClassId, CompilationError};
use decaf_registry::{InheritanceGraph, SymbolRegistry};

/// Output of the registration pass.
#[derive(Debug, Default)]
pub struct RegistrationOutput {
    /// Registry id per `Program::classes` entry; `None` for dropped duplicates.
    pub class_ids: Vec<Option<ClassId>>,
    /// Registered classes with every parent before its children.
    pub order: Vec<ClassId>,
    /// Collected errors.
    pub errors: Vec<CompilationError>,
}

/// Registration Pass - class names and the inheritance graph.
pub struct RegistrationPass<'a> {
    program: &'a Program,
    registry: &'a mut SymbolRegistry,
}

impl<'a> RegistrationPass<'a> {
    pub fn new(program: &'a Program, registry: &'a mut SymbolRegistry) -> Self {
        Self { program, registry }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self) -> RegistrationOutput {
        let mut output = RegistrationOutput::default();

        for class in &self.program.classes {
            let parent = class.parent.as_ref().map(|p| p.name.as_str());
            match self.registry.register_class(&class.name, parent, class.span) {
                Ok(id) => output.class_ids.push(Some(id)),
                Err(_) => {
                    output.errors.push(CompilationError::DuplicateDeclaration {
                        name: class.name.clone(),
                        scope: "the global scope".to_string(),
                        span: class.span,
                    });
                    output.class_ids.push(None);
                }
            }
        }

        self.resolve_parents(&mut output);
        self.break_cycles(&mut output);

        log::debug!(
            "registration: {} classes, {} errors",
            self.registry.class_count(),
            output.errors.len()
        );
        output
    }

    fn resolve_parents(&mut self, output: &mut RegistrationOutput) {
        for (decl, id) in self.program.classes.iter().zip(output.class_ids.clone()) {
            let (Some(id), Some(parent)) = (id, &decl.parent) else {
                continue;
            };
            match self.registry.class_by_name(&parent.name) {
                Some(parent_id) => self.registry.class_mut(id).parent = Some(parent_id),
                None => output.errors.push(CompilationError::UnknownParent {
                    class: decl.name.clone(),
                    parent: parent.name.clone(),
                    span: parent.span,
                }),
            }
        }
    }

    fn break_cycles(&mut self, output: &mut RegistrationOutput) {
        let graph = self.graph();
        for cycle in graph.cycles() {
            let Some(&first) = cycle.first() else {
                continue;
            };
            let class = self.registry.class(first);
            output.errors.push(CompilationError::CircularInheritance {
                cycle: self.describe_cycle(first),
                span: class.span,
            });
            for id in cycle {
                self.registry.class_mut(id).parent = None;
            }
        }

        // Acyclic now; fall back to declaration order if that ever fails.
        output.order = self.graph().parents_first().unwrap_or_else(|| {
            self.registry.classes().map(|c| c.id).collect()
        });
    }

    fn graph(&self) -> InheritanceGraph {
        let links: Vec<_> = self.registry.classes().map(|c| (c.id, c.parent)).collect();
        InheritanceGraph::new(&links)
    }

    /// `A -> B -> A`, following parent links from `start`.
    fn describe_cycle(&self, start: ClassId) -> String {
        let mut names = vec![self.registry.class(start).name.clone()];
        let mut current = self.registry.class(start).parent;
        while let Some(id) = current {
            names.push(self.registry.class(id).name.clone());
            if id == start || names.len() > self.registry.class_count() {
                break;
            }
            current = self.registry.class(id).parent;
        }
        names.join(" -> ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decaf_ast::ProgramBuilder;
    use decaf_core::ErrorKind;

    fn run(program: &Program) -> (SymbolRegistry, RegistrationOutput) {
        let mut registry = SymbolRegistry::new();
        let output = RegistrationPass::new(program, &mut registry).run();
        (registry, output)
    }

    #[test]
    fn registers_classes_parents_first() {
        let mut b = ProgramBuilder::new();
        b.class("Dog", Some("Animal"), vec![], vec![]);
        b.class("Animal", None, vec![], vec![]);
        let program = b.finish();

        let (registry, output) = run(&program);
        assert!(output.errors.is_empty());
        let dog = output.class_ids[0].unwrap();
        let animal = output.class_ids[1].unwrap();
        assert_eq!(registry.class(dog).parent, Some(animal));

        let pos = |c| output.order.iter().position(|&x| x == c).unwrap();
        assert!(pos(animal) < pos(dog));
    }

    #[test]
    fn duplicate_class_is_declaration_error() {
        let mut b = ProgramBuilder::new();
        b.class("A", None, vec![], vec![]);
        b.at(5, 1);
        b.class("A", None, vec![], vec![]);
        let program = b.finish();

        let (_, output) = run(&program);
        assert_eq!(output.errors.len(), 1);
        assert_eq!(output.errors[0].kind(), ErrorKind::DeclarationError);
        assert_eq!(output.errors[0].span().line, 5);
        assert_eq!(output.class_ids[1], None);
    }

    #[test]
    fn missing_parent_is_reported() {
        let mut b = ProgramBuilder::new();
        b.class("A", Some("B"), vec![], vec![]);
        let program = b.finish();

        let (registry, output) = run(&program);
        assert_eq!(output.errors.len(), 1);
        let err = &output.errors[0];
        assert_eq!(err.kind(), ErrorKind::DeclarationError);
        assert!(err.to_string().contains("'B'"));
        assert_eq!(registry.class(output.class_ids[0].unwrap()).parent, None);
    }

    #[test]
    fn cycle_is_reported_once() {
        let mut b = ProgramBuilder::new();
        b.class("A", Some("B"), vec![], vec![]);
        b.class("B", Some("A"), vec![], vec![]);
        let program = b.finish();

        let (registry, output) = run(&program);
        assert_eq!(output.errors.len(), 1);
        assert!(matches!(
            &output.errors[0],
            CompilationError::CircularInheritance { cycle, .. } if cycle == "A -> B -> A"
        ));
        assert!(registry.classes().all(|c| c.parent.is_none()));
        assert_eq!(output.order.len(), 2);
    }

    #[test]
    fn self_inheritance_is_a_cycle() {
        let mut b = ProgramBuilder::new();
        b.class("Loop", Some("Loop"), vec![], vec![]);
        let program = b.finish();

        let (_, output) = run(&program);
        assert!(matches!(
            &output.errors[0],
            CompilationError::CircularInheritance { cycle, .. } if cycle == "Loop -> Loop"
        ));
    }
}
