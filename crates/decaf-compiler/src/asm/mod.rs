//! Abstract machine instruction set and the textual listing it is written as.

mod instruction;
mod listing;

pub use instruction::{BinaryOpcode, Instruction, PrintKind, Reg, UnaryOpcode};
pub use listing::Listing;
