//! Code generation for the register abstract machine.
//!
//! Runs only on a program that resolved and type checked cleanly. The
//! listing is assembled in a fixed order:
//!
//! 1. `.static_data N` sizing the static field area;
//! 2. one `.vtable` directive per class, in declaration order;
//! 3. the `__start` entry stub, when enabled and a `main` exists;
//! 4. every method, in class then method declaration order.
//!
//! Each method body is generated by a [`MethodGenerator`] into its own
//! buffer first, so its `enter K` can account for the spill slots the body
//! ended up needing.

mod expr;
mod layout;
mod registers;
mod stmt;

pub use layout::{FrameLayout, Layouts};
pub use registers::{RegisterPool, Value};

use decaf_ast::Program;
use decaf_core::{ClassId, CompilationError, DataType, FieldId, MethodId, PrimitiveKind, Span};
use decaf_registry::SymbolRegistry;

use crate::annotations::{Bindings, MethodSource, TypeTable};
use crate::asm::{Instruction, Listing, Reg};
use crate::emit::{ENTRY_LABEL, Emitter, LabelAllocator, method_label, vtable_label};
use crate::options::CompilerOptions;

/// Output of code generation.
#[derive(Debug, Default)]
pub struct CodegenOutput {
    pub listing: Listing,
    pub errors: Vec<CompilationError>,
}

/// Whole-program code generator.
pub struct CodeGenerator<'a> {
    program: &'a Program,
    registry: &'a SymbolRegistry,
    bindings: &'a Bindings,
    types: &'a TypeTable,
    methods: &'a [MethodSource],
    order: &'a [ClassId],
    options: &'a CompilerOptions,
}

impl<'a> CodeGenerator<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        program: &'a Program,
        registry: &'a SymbolRegistry,
        bindings: &'a Bindings,
        types: &'a TypeTable,
        methods: &'a [MethodSource],
        order: &'a [ClassId],
        options: &'a CompilerOptions,
    ) -> Self {
        Self {
            program,
            registry,
            bindings,
            types,
            methods,
            order,
            options,
        }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(self) -> CodegenOutput {
        let mut output = CodegenOutput::default();
        let layouts = Layouts::compute(self.registry, self.order);

        output
            .listing
            .push(Instruction::StaticData(layouts.static_size()));
        for class in self.registry.classes() {
            let slots = class
                .vtable
                .iter()
                .map(|&m| self.label_of(m))
                .collect();
            output.listing.push(Instruction::VTable {
                label: vtable_label(&class.name),
                slots,
            });
        }

        let methods = self.methods_in_declaration_order();
        if self.options.emit_entry_stub {
            self.entry_stub(&methods, &layouts, &mut output.listing);
        }

        let mut labels = LabelAllocator::new();
        for (source, method) in methods {
            let decl = &self.program.classes[source.class].methods[source.method];
            let frame = FrameLayout::for_method(self.registry, self.bindings, method);
            let generator = MethodGenerator {
                program: self.program,
                registry: self.registry,
                bindings: self.bindings,
                types: self.types,
                layouts: &layouts,
                pool: RegisterPool::new(self.options.register_count, frame.spill_base()),
                frame,
                emitter: Emitter::new(&mut labels),
                method,
            };
            match generator.generate(decl.body) {
                Ok(code) => output.listing.extend(code),
                Err(error) => output.errors.push(error),
            }
        }

        log::debug!(
            "codegen: {} instructions, {} errors",
            output.listing.len(),
            output.errors.len()
        );
        output
    }

    fn label_of(&self, method: MethodId) -> String {
        let entry = self.registry.method(method);
        method_label(&self.registry.class(entry.owner).name, &entry.name)
    }

    /// Registered methods sorted by where they were declared.
    fn methods_in_declaration_order(&self) -> Vec<(MethodSource, MethodId)> {
        let mut methods: Vec<_> = self
            .methods
            .iter()
            .enumerate()
            .map(|(index, &source)| (source, MethodId::from_index(index)))
            .collect();
        methods.sort_by_key(|(source, _)| (source.class, source.method));
        methods
    }

    /// `__start`: build the receiver if needed, call the first `main`, halt.
    fn entry_stub(
        &self,
        methods: &[(MethodSource, MethodId)],
        layouts: &Layouts,
        listing: &mut Listing,
    ) {
        let Some(&(_, main)) = methods
            .iter()
            .find(|(_, id)| self.registry.method(*id).name == "main")
        else {
            log::debug!("no main method; entry stub omitted");
            return;
        };
        let entry = self.registry.method(main);
        if entry.arity() > 0 {
            log::warn!(
                "'{}' takes parameters; entry stub omitted",
                self.registry.method_path(main)
            );
            return;
        }

        let mut code = vec![Instruction::Label(ENTRY_LABEL.to_string())];
        if entry.is_static {
            code.push(Instruction::Call(self.label_of(main)));
        } else {
            let (object, scratch) = (Reg::R(0), Reg::R(1));
            emit_object_init(&mut code, self.registry, layouts, entry.owner, object, scratch);
            code.push(Instruction::Push(object));
            code.push(Instruction::Call(self.label_of(main)));
            code.push(Instruction::PopN(1));
        }
        code.push(Instruction::Halt);
        listing.extend(code);
    }
}

/// Allocate an object of `class` into `object`: store its vtable in word 0
/// and zero every field. Clobbers `scratch`.
pub(crate) fn emit_object_init(
    code: &mut Vec<Instruction>,
    registry: &SymbolRegistry,
    layouts: &Layouts,
    class: ClassId,
    object: Reg,
    scratch: Reg,
) {
    code.push(Instruction::HAlloc(object, layouts.object_size(class)));
    code.push(Instruction::MoveLabel(
        scratch,
        vtable_label(&registry.class(class).name),
    ));
    code.push(Instruction::HStore(object, 0, scratch));

    let (doubles, words): (Vec<&FieldId>, Vec<&FieldId>) = layouts
        .instance_fields(class)
        .iter()
        .partition(|&&f| registry.field(f).ty == DataType::Primitive(PrimitiveKind::Double));
    if !words.is_empty() {
        code.push(Instruction::MoveImmedI(scratch, 0));
        for field in words {
            if let Some(offset) = layouts.field_offset(*field) {
                code.push(Instruction::HStore(object, offset, scratch));
            }
        }
    }
    if !doubles.is_empty() {
        code.push(Instruction::MoveImmedF(scratch, 0.0));
        for field in doubles {
            if let Some(offset) = layouts.field_offset(*field) {
                code.push(Instruction::HStore(object, offset, scratch));
            }
        }
    }
}

/// Generates one method body.
pub(crate) struct MethodGenerator<'a, 'l> {
    program: &'a Program,
    registry: &'a SymbolRegistry,
    bindings: &'a Bindings,
    types: &'a TypeTable,
    layouts: &'a Layouts,
    frame: FrameLayout,
    pool: RegisterPool,
    emitter: Emitter<'l>,
    method: MethodId,
}

impl MethodGenerator<'_, '_> {
    /// Label, `enter K` and body of the method.
    fn generate(mut self, body: decaf_ast::StmtId) -> Result<Vec<Instruction>, CompilationError> {
        self.generate_body(body)?;

        let entry = self.registry.method(self.method);
        if entry.return_type.is_void() && !self.emitter.ends_with_terminator() {
            self.emitter.emit(Instruction::Ret);
        }

        let frame_size = self.frame.local_count() + self.pool.spill_slots();
        log::debug!(
            "{}: frame of {} slots ({} locals, {} spill slots, {} spills)",
            self.registry.method_path(self.method),
            frame_size,
            self.frame.local_count(),
            self.pool.spill_slots(),
            self.pool.spill_count()
        );

        let owner = &self.registry.class(entry.owner).name;
        let mut code = vec![
            Instruction::Label(method_label(owner, &entry.name)),
            Instruction::Enter(frame_size),
        ];
        code.extend(self.emitter.finish());
        Ok(code)
    }

    /// Frame slot of `this`.
    fn this_slot(&self, span: Span) -> Result<u32, CompilationError> {
        self.frame.this_slot().ok_or_else(|| {
            CompilationError::internal(
                format!(
                    "'this' needed in static method '{}'",
                    self.registry.method_path(self.method)
                ),
                span,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::{MemberPass, RegistrationPass, ResolutionPass};
    use crate::typecheck::TypeChecker;
    use decaf_ast::{BinaryOp, IncDecOp, ProgramBuilder, StmtId, UnaryOp};

    fn generate(program: &Program, options: &CompilerOptions) -> Vec<String> {
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
        let checked =
            TypeChecker::new(program, &registry, &resolution.bindings, &members.methods).run();
        assert!(checked.errors.is_empty(), "{:?}", checked.errors);

        let output = CodeGenerator::new(
            program,
            &registry,
            &resolution.bindings,
            &checked.types,
            &members.methods,
            &registration.order,
            options,
        )
        .run();
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        output
            .listing
            .to_string()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn lines(program: &Program) -> Vec<String> {
        generate(program, &CompilerOptions::default())
    }

    /// The lines of one method, from its label up to the next label that
    /// starts another method.
    fn method_lines(lines: &[String], label: &str) -> Vec<String> {
        let start = lines
            .iter()
            .position(|l| l == &format!("{}:", label))
            .unwrap_or_else(|| panic!("no label {}", label));
        lines[start..]
            .iter()
            .enumerate()
            .take_while(|(i, l)| *i == 0 || !(l.starts_with("M_") || l.starts_with("__start")))
            .map(|(_, l)| l.clone())
            .collect()
    }

    fn main_with(b: &mut ProgramBuilder, stmts: Vec<StmtId>) {
        let body = b.block(stmts);
        let main = b.method("main", "void", &[], body).into_static();
        b.class("Main", None, vec![], vec![main]);
    }

    #[test]
    fn hello_world() {
        let mut b = ProgramBuilder::new();
        let hello = b.string("Hello, World!");
        let print = b.print(hello);
        main_with(&mut b, vec![print]);
        let program = b.finish();

        assert_eq!(
            lines(&program),
            vec![
                ".static_data 0",
                ".vtable V_4Main",
                "__start:",
                "    call M_4Main_main",
                "    halt",
                "M_4Main_main:",
                "    enter 0",
                "    move_immed_s r0, \"Hello, World!\"",
                "    print_s r0",
                "    ret",
            ]
        );
    }

    #[test]
    fn override_shares_slot_in_vtables() {
        let mut b = ProgramBuilder::new();
        let hi = b.string("...");
        let ret = b.ret(Some(hi));
        let body = b.block(vec![ret]);
        let speak = b.method("speak", "string", &[], body);
        let empty = b.block(vec![]);
        let eat = b.method("eat", "void", &[], empty);
        b.class("Animal", None, vec![], vec![speak, eat]);
        let woof = b.string("woof");
        let ret = b.ret(Some(woof));
        let body = b.block(vec![ret]);
        let speak = b.method("speak", "string", &[], body);
        b.class("Dog", Some("Animal"), vec![], vec![speak]);

        let decl = b.var("a", "Animal");
        let a = b.ident("a");
        let dog = b.new_object("Dog");
        let assign = b.assign(a, dog);
        let a = b.ident("a");
        let call = b.call(Some(a), "speak", vec![]);
        let print = b.print(call);
        main_with(&mut b, vec![decl, assign, print]);
        let program = b.finish();

        let lines = lines(&program);
        assert!(lines.contains(&".vtable V_6Animal M_6Animal_speak, M_6Animal_eat".to_string()));
        assert!(lines.contains(&".vtable V_3Dog M_3Dog_speak, M_6Animal_eat".to_string()));

        assert_eq!(
            method_lines(&lines, "M_4Main_main"),
            vec![
                "M_4Main_main:",
                "    enter 1",
                "    move_immed_i r0, 0",
                "    store_stack 0, r0",
                "    halloc r0, 1",
                "    move_label r1, V_3Dog",
                "    hstore r0, 0, r1",
                "    store_stack 0, r0",
                "    load_stack r0, 0",
                "    push r0",
                "    hload r0, r0, 0",
                "    vcall r0, 0",
                "    popn 1",
                "    move r0, rv",
                "    print_s r0",
                "    ret",
            ]
        );
    }

    #[test]
    fn fields_are_initialised_and_addressed() {
        let mut b = ProgramBuilder::new();
        let x = b.ident("x");
        let y = b.ident("y");
        let sum = b.binary(BinaryOp::Add, x, y);
        let ret = b.ret(Some(sum));
        let body = b.block(vec![ret]);
        let total = b.method("total", "double", &[], body);
        let x = b.field("x", "double");
        let y = b.field("y", "double");
        let tag = b.field("tag", "string");
        b.class("Point", None, vec![x, tag, y], vec![total]);
        let obj = b.new_object("Point");
        let stmt = b.expr_stmt(obj);
        main_with(&mut b, vec![stmt]);
        let program = b.finish();

        let lines = lines(&program);
        assert_eq!(
            method_lines(&lines, "M_5Point_total"),
            vec![
                "M_5Point_total:",
                "    enter 0",
                "    load_stack r0, 0",
                "    hload r0, r0, 1",
                "    load_stack r1, 0",
                "    hload r1, r1, 3",
                "    fadd r0, r0, r1",
                "    ret r0",
            ]
        );
        assert_eq!(
            method_lines(&lines, "M_4Main_main")[2..9],
            [
                "    halloc r0, 4",
                "    move_label r1, V_5Point",
                "    hstore r0, 0, r1",
                "    move_immed_i r1, 0",
                "    hstore r0, 2, r1",
                "    move_immed_f r1, 0.0",
                "    hstore r0, 1, r1",
            ]
        );
    }

    #[test]
    fn short_circuit_skips_the_right_operand() {
        let mut b = ProgramBuilder::new();
        let flag = b.var("ok", "bool");
        let ok = b.ident("ok");
        let no = b.bool(false);
        let and = b.binary(BinaryOp::And, ok, no);
        let print = b.print(and);
        main_with(&mut b, vec![flag, print]);
        let program = b.finish();

        assert_eq!(
            method_lines(&lines(&program), "M_4Main_main"),
            vec![
                "M_4Main_main:",
                "    enter 1",
                "    move_immed_i r0, 0",
                "    store_stack 0, r0",
                "    load_stack r0, 0",
                "    bz r0, L0",
                "    move_immed_i r0, 0",
                "L0:",
                "    print_b r0",
                "    ret",
            ]
        );
    }

    #[test]
    fn unary_operators_follow_operand_type() {
        let mut b = ProgramBuilder::new();
        let half = b.double(2.5);
        let neg_d = b.unary(UnaryOp::Neg, half);
        let p1 = b.print(neg_d);
        let three = b.int(3);
        let neg_i = b.unary(UnaryOp::Neg, three);
        let p2 = b.print(neg_i);
        let yes = b.bool(true);
        let not = b.unary(UnaryOp::Not, yes);
        let p3 = b.print(not);
        main_with(&mut b, vec![p1, p2, p3]);
        let program = b.finish();

        let main = method_lines(&lines(&program), "M_4Main_main");
        let ops: Vec<&str> = main
            .iter()
            .filter_map(|l| l.trim_start().split(' ').next())
            .filter(|op| matches!(*op, "fneg" | "ineg" | "not"))
            .collect();
        assert_eq!(ops, vec!["fneg", "ineg", "not"]);
    }

    #[test]
    fn loops_use_fresh_labels_and_break_targets() {
        let mut b = ProgramBuilder::new();
        let decl = b.var("i", "int");
        let i = b.ident("i");
        let ten = b.int(10);
        let cond = b.binary(BinaryOp::Less, i, ten);
        let i = b.ident("i");
        let inc = b.inc_dec(IncDecOp::Increment, false, i);
        let step = b.expr_stmt(inc);
        let brk = b.break_stmt();
        let body = b.block(vec![step, brk]);
        let while_stmt = b.while_stmt(cond, body);
        main_with(&mut b, vec![decl, while_stmt]);
        let program = b.finish();

        assert_eq!(
            method_lines(&lines(&program), "M_4Main_main"),
            vec![
                "M_4Main_main:",
                "    enter 1",
                "    move_immed_i r0, 0",
                "    store_stack 0, r0",
                "L0:",
                "    load_stack r0, 0",
                "    move_immed_i r1, 10",
                "    ilt r0, r0, r1",
                "    bz r0, L1",
                "    load_stack r0, 0",
                "    move_immed_i r1, 1",
                "    iadd r1, r0, r1",
                "    store_stack 0, r1",
                "    jmp L1",
                "    jmp L0",
                "L1:",
                "    ret",
            ]
        );
    }

    #[test]
    fn deep_expressions_spill_with_a_small_pool() {
        // 1 + (2 + (3 + (4 + 5))) keeps five values live with three registers.
        let mut b = ProgramBuilder::new();
        let n: Vec<_> = (1..=5).map(|v| b.int(v)).collect();
        let inner = b.binary(BinaryOp::Add, n[3], n[4]);
        let middle = b.binary(BinaryOp::Add, n[2], inner);
        let outer = b.binary(BinaryOp::Add, n[1], middle);
        let top = b.binary(BinaryOp::Add, n[0], outer);
        let print = b.print(top);
        main_with(&mut b, vec![print]);
        let program = b.finish();

        let options = CompilerOptions::new().with_register_count(3);
        let lines = generate(&program, &options);
        let main = method_lines(&lines, "M_4Main_main");
        assert_eq!(main[1], "    enter 2");
        assert_eq!(main[5], "    store_stack 0, r0");
        assert_eq!(main[7], "    store_stack 1, r1");
        assert!(main.contains(&"    load_stack r1, 1".to_string()));
        assert!(main.contains(&"    load_stack r1, 0".to_string()));
        assert!(main.iter().all(|l| !l.contains("r3")), "{:?}", main);
        assert_eq!(main[main.len() - 2], "    print_i r0");
    }

    #[test]
    fn live_values_are_spilled_around_calls() {
        let mut b = ProgramBuilder::new();
        let one = b.int(1);
        let ret = b.ret(Some(one));
        let body = b.block(vec![ret]);
        let one_m = b.method("one", "int", &[], body).into_static();
        let two = b.int(2);
        let call = b.call(None, "one", vec![]);
        let sum = b.binary(BinaryOp::Add, two, call);
        let print = b.print(sum);
        let body = b.block(vec![print]);
        let main = b.method("main", "void", &[], body).into_static();
        b.class("Main", None, vec![], vec![one_m, main]);
        let program = b.finish();

        assert_eq!(
            method_lines(&lines(&program), "M_4Main_main"),
            vec![
                "M_4Main_main:",
                "    enter 1",
                "    move_immed_i r0, 2",
                "    store_stack 0, r0",
                "    call M_4Main_one",
                "    move r0, rv",
                "    load_stack r1, 0",
                "    iadd r0, r1, r0",
                "    print_i r0",
                "    ret",
            ]
        );
    }

    #[test]
    fn instance_main_gets_a_receiver_and_stub_can_be_disabled() {
        let mut b = ProgramBuilder::new();
        let body = b.block(vec![]);
        let main = b.method("main", "void", &[], body);
        let count = b.field("count", "int");
        b.class("App", None, vec![count], vec![main]);
        let program = b.finish();

        let lines = lines(&program);
        assert_eq!(
            lines[2..11],
            [
                "__start:",
                "    halloc r0, 2",
                "    move_label r1, V_3App",
                "    hstore r0, 0, r1",
                "    move_immed_i r1, 0",
                "    hstore r0, 1, r1",
                "    push r0",
                "    call M_3App_main",
                "    popn 1",
            ]
        );

        let options = CompilerOptions::new().with_entry_stub(false);
        let lines = generate(&program, &options);
        assert!(!lines.iter().any(|l| l.contains("__start")));
    }

    #[test]
    fn every_defined_label_is_unique() {
        let mut b = ProgramBuilder::new();
        let body = b.block(vec![]);
        let c = b.method("c", "void", &[], body).into_static();
        b.class("A_B", None, vec![], vec![c]);
        let body = b.block(vec![]);
        let b_c = b.method("B_c", "void", &[], body).into_static();
        b.class("A", None, vec![], vec![b_c]);
        main_with(&mut b, vec![]);
        let program = b.finish();

        let lines = lines(&program);
        let defined: Vec<&String> = lines
            .iter()
            .filter(|l| !l.starts_with(' ') && l.ends_with(':'))
            .collect();
        let unique: rustc_hash::FxHashSet<&String> = defined.iter().copied().collect();
        assert_eq!(defined.len(), unique.len(), "{:?}", defined);
        assert!(lines.contains(&"M_3A_B_c:".to_string()));
        assert!(lines.contains(&"M_1A_B_c:".to_string()));
        assert!(lines.contains(&".vtable V_3A_B".to_string()));
        assert!(lines.contains(&".vtable V_1A".to_string()));
    }
}
