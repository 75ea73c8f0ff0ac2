//! Instruction emitter for one method body.
//!
//! [`Emitter`] collects instructions in generation order, hands out unique
//! control-flow labels and tracks loop labels for `break`/`continue`.

mod jumps;

pub use jumps::{JumpManager, LoopLabels};

use crate::asm::Instruction;

/// Unique `L<n>` labels across a whole compilation unit.
#[derive(Debug, Default)]
pub struct LabelAllocator {
    next: u32,
}

impl LabelAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> String {
        let label = format!("L{}", self.next);
        self.next += 1;
        log::trace!("allocated label {}", label);
        label
    }
}

/// Label of a method's code: `M_<len><Class>_<method>`.
///
/// The class name is prefixed with its length so that names containing `_`
/// cannot run together: `A_B.c` and `A.B_c` become `M_3A_B_c` and `M_1A_B_c`.
/// Identifiers never start with a digit, so the prefix always ends where the
/// name begins.
pub fn method_label(class: &str, method: &str) -> String {
    format!("M_{}{}_{}", class.len(), class, method)
}

/// Label of a class's vtable: `V_<len><Class>`.
pub fn vtable_label(class: &str) -> String {
    format!("V_{}{}", class.len(), class)
}

/// Label of the entry stub.
pub const ENTRY_LABEL: &str = "__start";

/// Collects the instructions of one method.
pub struct Emitter<'l> {
    code: Vec<Instruction>,
    labels: &'l mut LabelAllocator,
    jumps: JumpManager,
}

impl<'l> Emitter<'l> {
    pub fn new(labels: &'l mut LabelAllocator) -> Self {
        Self {
            code: Vec::new(),
            labels,
            jumps: JumpManager::new(),
        }
    }

    pub fn emit(&mut self, instruction: Instruction) {
        self.code.push(instruction);
    }

    pub fn code_mut(&mut self) -> &mut Vec<Instruction> {
        &mut self.code
    }

    pub fn fresh_label(&mut self) -> String {
        self.labels.fresh()
    }

    pub fn place_label(&mut self, label: String) {
        self.code.push(Instruction::Label(label));
    }

    pub fn jumps(&self) -> &JumpManager {
        &self.jumps
    }

    pub fn jumps_mut(&mut self) -> &mut JumpManager {
        &mut self.jumps
    }

    /// Whether the last emitted instruction never falls through.
    pub fn ends_with_terminator(&self) -> bool {
        self.code.last().is_some_and(Instruction::is_terminator)
    }

    pub fn finish(self) -> Vec<Instruction> {
        self.code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_unique_across_emitters() {
        let mut labels = LabelAllocator::new();
        let first = {
            let mut emitter = Emitter::new(&mut labels);
            emitter.fresh_label()
        };
        let mut emitter = Emitter::new(&mut labels);
        let second = emitter.fresh_label();
        assert_eq!(first, "L0");
        assert_eq!(second, "L1");
    }

    #[test]
    fn label_naming() {
        assert_eq!(method_label("Dog", "speak"), "M_3Dog_speak");
        assert_eq!(vtable_label("Dog"), "V_3Dog");
    }

    #[test]
    fn underscored_names_get_distinct_labels() {
        assert_ne!(method_label("A_B", "c"), method_label("A", "B_c"));
        assert_ne!(method_label("A1", "x"), method_label("A", "1x"));
    }

    #[test]
    fn tracks_terminators() {
        let mut labels = LabelAllocator::new();
        let mut emitter = Emitter::new(&mut labels);
        assert!(!emitter.ends_with_terminator());
        emitter.emit(Instruction::Ret);
        assert!(emitter.ends_with_terminator());
        emitter.place_label("L9".into());
        assert!(!emitter.ends_with_terminator());
        assert_eq!(emitter.finish().len(), 2);
    }
}
