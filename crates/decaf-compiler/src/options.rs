//! Compiler configuration.

/// Smallest usable register pool: the widest instruction sequence the code
/// generator emits holds three operands at once.
pub const MIN_REGISTERS: usize = 3;

/// Default size of the register pool.
pub const DEFAULT_REGISTERS: usize = 8;

/// Options controlling code generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Size of the bounded register pool `r0..r{N-1}`.
    pub register_count: usize,
    /// Emit a `__start` stub that calls the first `main` method and halts.
    pub emit_entry_stub: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            register_count: DEFAULT_REGISTERS,
            emit_entry_stub: true,
        }
    }
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the register pool size; values below [`MIN_REGISTERS`] are raised to it.
    pub fn with_register_count(mut self, count: usize) -> Self {
        if count < MIN_REGISTERS {
            log::warn!(
                "register count {} is below the minimum of {}; using {}",
                count,
                MIN_REGISTERS,
                MIN_REGISTERS
            );
        }
        self.register_count = count.clamp(MIN_REGISTERS, u8::MAX as usize + 1);
        self
    }

    pub fn with_entry_stub(mut self, emit: bool) -> Self {
        self.emit_entry_stub = emit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = CompilerOptions::new();
        assert_eq!(options.register_count, 8);
        assert!(options.emit_entry_stub);
    }

    #[test]
    fn register_count_is_clamped() {
        assert_eq!(CompilerOptions::new().with_register_count(1).register_count, 3);
        assert_eq!(CompilerOptions::new().with_register_count(4).register_count, 4);
        assert_eq!(CompilerOptions::new().with_register_count(1000).register_count, 256);
    }
}
