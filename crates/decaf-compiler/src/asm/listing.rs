//! The ordered instruction listing written as the output artifact.

use std::fmt;
use std::io::{self, Write};

use super::Instruction;

/// An ordered instruction stream.
///
/// Rendering preserves generation order exactly: one instruction or label
/// per line, instructions indented by four spaces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    instructions: Vec<Instruction>,
}

impl Listing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn extend(&mut self, instructions: impl IntoIterator<Item = Instruction>) {
        self.instructions.extend(instructions);
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Write the listing text to `out`.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for instruction in &self.instructions {
            if instruction.is_flush_left() {
                writeln!(out, "{}", instruction)?;
            } else {
                writeln!(out, "    {}", instruction)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instruction in &self.instructions {
            if instruction.is_flush_left() {
                writeln!(f, "{}", instruction)?;
            } else {
                writeln!(f, "    {}", instruction)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::{PrintKind, Reg};

    fn sample() -> Listing {
        let mut listing = Listing::new();
        listing.push(Instruction::Label("M_Main_main".into()));
        listing.push(Instruction::Enter(0));
        listing.push(Instruction::MoveImmedS(Reg::R(0), "hello".into()));
        listing.push(Instruction::Print(PrintKind::String, Reg::R(0)));
        listing.push(Instruction::Ret);
        listing
    }

    #[test]
    fn indents_instructions_not_labels() {
        let text = sample().to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "M_Main_main:");
        assert_eq!(lines[1], "    enter 0");
        assert_eq!(lines[3], "    print_s r0");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn write_to_matches_display() {
        let listing = sample();
        let mut buffer = Vec::new();
        listing.write_to(&mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), listing.to_string());
    }
}
