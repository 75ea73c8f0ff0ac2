//! Abstract machine instructions.
//!
//! Each variant renders as one listing line without indentation; the
//! [`super::Listing`] decides indentation by [`Instruction::is_flush_left`].

use std::fmt;

use decaf_core::PrimitiveKind;

/// A machine register: the bounded pool `r0..`, or the return value register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    R(u8),
    /// Holds a method's return value after `ret`.
    Rv,
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reg::R(n) => write!(f, "r{}", n),
            Reg::Rv => f.write_str("rv"),
        }
    }
}

/// Three-register arithmetic and comparison opcodes.
///
/// Comparisons write `1` or `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOpcode {
    IAdd,
    ISub,
    IMul,
    IDiv,
    ILt,
    ILeq,
    IGt,
    IGeq,
    IEq,
    INe,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FLt,
    FLeq,
    FGt,
    FGeq,
    FEq,
    FNe,
}

impl BinaryOpcode {
    pub const fn mnemonic(self) -> &'static str {
        match self {
            BinaryOpcode::IAdd => "iadd",
            BinaryOpcode::ISub => "isub",
            BinaryOpcode::IMul => "imul",
            BinaryOpcode::IDiv => "idiv",
            BinaryOpcode::ILt => "ilt",
            BinaryOpcode::ILeq => "ileq",
            BinaryOpcode::IGt => "igt",
            BinaryOpcode::IGeq => "igeq",
            BinaryOpcode::IEq => "ieq",
            BinaryOpcode::INe => "ine",
            BinaryOpcode::FAdd => "fadd",
            BinaryOpcode::FSub => "fsub",
            BinaryOpcode::FMul => "fmul",
            BinaryOpcode::FDiv => "fdiv",
            BinaryOpcode::FLt => "flt",
            BinaryOpcode::FLeq => "fleq",
            BinaryOpcode::FGt => "fgt",
            BinaryOpcode::FGeq => "fgeq",
            BinaryOpcode::FEq => "feq",
            BinaryOpcode::FNe => "fne",
        }
    }
}

/// Two-register opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOpcode {
    INeg,
    FNeg,
    /// Logical not of a `0`/`1` word.
    Not,
}

impl UnaryOpcode {
    pub const fn mnemonic(self) -> &'static str {
        match self {
            UnaryOpcode::INeg => "ineg",
            UnaryOpcode::FNeg => "fneg",
            UnaryOpcode::Not => "not",
        }
    }
}

/// Which builtin print routine to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrintKind {
    Int,
    Double,
    Bool,
    String,
}

impl PrintKind {
    /// The print routine for a value type, if printable.
    pub const fn for_primitive(kind: PrimitiveKind) -> Option<Self> {
        match kind {
            PrimitiveKind::Int => Some(PrintKind::Int),
            PrimitiveKind::Double => Some(PrintKind::Double),
            PrimitiveKind::Bool => Some(PrintKind::Bool),
            PrimitiveKind::String => Some(PrintKind::String),
            PrimitiveKind::Void => None,
        }
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            PrintKind::Int => "print_i",
            PrintKind::Double => "print_f",
            PrintKind::Bool => "print_b",
            PrintKind::String => "print_s",
        }
    }
}

/// One listing line.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    // Directives and labels
    /// `label:`
    Label(String),
    /// `.static_data N`: words reserved for static fields.
    StaticData(u32),
    /// `.vtable V_Class M_a, M_b`: defines a vtable label and its slots.
    VTable { label: String, slots: Vec<String> },

    // Constants
    MoveImmedI(Reg, i32),
    MoveImmedF(Reg, f64),
    MoveImmedS(Reg, String),
    MoveLabel(Reg, String),

    // Data movement
    Move(Reg, Reg),
    /// `load_stack rD, slot`
    LoadStack(Reg, u32),
    /// `store_stack slot, rS`
    StoreStack(u32, Reg),
    /// `hload rD, rBase, offset`
    HLoad(Reg, Reg, u32),
    /// `hstore rBase, offset, rS`
    HStore(Reg, u32, Reg),
    /// `sload rD, offset`
    SLoad(Reg, u32),
    /// `sstore offset, rS`
    SStore(u32, Reg),

    // Arithmetic and comparison
    Binary(BinaryOpcode, Reg, Reg, Reg),
    Unary(UnaryOpcode, Reg, Reg),

    // Control
    Jmp(String),
    /// Branch if zero.
    Bz(Reg, String),
    /// Branch if not zero.
    Bnz(Reg, String),

    // Call and return
    Push(Reg),
    PopN(u32),
    Call(String),
    /// `vcall rVtable, slot`
    VCall(Reg, u32),
    /// Reserve `K` frame slots for locals and spills.
    Enter(u32),
    Ret,
    RetValue(Reg),
    Halt,

    // Allocation
    /// `halloc rD, words`
    HAlloc(Reg, u32),

    // Builtin I/O
    Print(PrintKind, Reg),
}

impl Instruction {
    /// Labels and directives are written without indentation.
    pub fn is_flush_left(&self) -> bool {
        matches!(
            self,
            Instruction::Label(_) | Instruction::StaticData(_) | Instruction::VTable { .. }
        )
    }

    /// Instructions after which control never falls through.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Jmp(_) | Instruction::Ret | Instruction::RetValue(_) | Instruction::Halt
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Label(label) => write!(f, "{}:", label),
            Instruction::StaticData(words) => write!(f, ".static_data {}", words),
            Instruction::VTable { label, slots } => {
                write!(f, ".vtable {}", label)?;
                if !slots.is_empty() {
                    write!(f, " {}", slots.join(", "))?;
                }
                Ok(())
            }
            Instruction::MoveImmedI(d, value) => write!(f, "move_immed_i {}, {}", d, value),
            Instruction::MoveImmedF(d, value) => write!(f, "move_immed_f {}, {:?}", d, value),
            Instruction::MoveImmedS(d, value) => {
                write!(f, "move_immed_s {}, \"{}\"", d, value.escape_debug())
            }
            Instruction::MoveLabel(d, label) => write!(f, "move_label {}, {}", d, label),
            Instruction::Move(d, s) => write!(f, "move {}, {}", d, s),
            Instruction::LoadStack(d, slot) => write!(f, "load_stack {}, {}", d, slot),
            Instruction::StoreStack(slot, s) => write!(f, "store_stack {}, {}", slot, s),
            Instruction::HLoad(d, base, offset) => write!(f, "hload {}, {}, {}", d, base, offset),
            Instruction::HStore(base, offset, s) => {
                write!(f, "hstore {}, {}, {}", base, offset, s)
            }
            Instruction::SLoad(d, offset) => write!(f, "sload {}, {}", d, offset),
            Instruction::SStore(offset, s) => write!(f, "sstore {}, {}", offset, s),
            Instruction::Binary(op, d, a, b) => write!(f, "{} {}, {}, {}", op.mnemonic(), d, a, b),
            Instruction::Unary(op, d, s) => write!(f, "{} {}, {}", op.mnemonic(), d, s),
            Instruction::Jmp(label) => write!(f, "jmp {}", label),
            Instruction::Bz(c, label) => write!(f, "bz {}, {}", c, label),
            Instruction::Bnz(c, label) => write!(f, "bnz {}, {}", c, label),
            Instruction::Push(s) => write!(f, "push {}", s),
            Instruction::PopN(n) => write!(f, "popn {}", n),
            Instruction::Call(label) => write!(f, "call {}", label),
            Instruction::VCall(vtable, slot) => write!(f, "vcall {}, {}", vtable, slot),
            Instruction::Enter(slots) => write!(f, "enter {}", slots),
            Instruction::Ret => f.write_str("ret"),
            Instruction::RetValue(s) => write!(f, "ret {}", s),
            Instruction::Halt => f.write_str("halt"),
            Instruction::HAlloc(d, words) => write!(f, "halloc {}, {}", d, words),
            Instruction::Print(kind, s) => write!(f, "{} {}", kind.mnemonic(), s),
        }
    }
}
