//! Bounded register pool with spilling.
//!
//! Values produced during expression evaluation are tracked as [`Value`]
//! handles. Each handle lives either in a register or, once evicted, in a
//! spill slot of the current frame. Producing a value acquires a register;
//! consuming it releases the register (or spill slot) for reuse.
//!
//! When every register is taken, the least-recently-acquired value that is
//! not pinned is written to a spill slot with `store_stack`. It comes back
//! with `load_stack` the next time it is [`load`](RegisterPool::load)ed.
//! Values are pinned while an instruction is being assembled from them, so
//! the operands of one instruction never evict each other.

use rustc_hash::FxHashMap;

use decaf_core::{CompilationError, Span};

use crate::asm::{Instruction, Reg};

/// Handle to a live intermediate value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Value(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Register(u8),
    /// Index into the method's spill area.
    Spilled(u32),
}

#[derive(Debug, Clone, Copy)]
struct Live {
    location: Location,
    /// Acquisition tick; smaller is older.
    acquired: u64,
    pinned: bool,
}

/// Register pool for one method body.
#[derive(Debug)]
pub struct RegisterPool {
    register_count: usize,
    /// Occupant per register.
    registers: Vec<Option<Value>>,
    live: FxHashMap<Value, Live>,
    next_value: u32,
    clock: u64,
    /// First frame slot of the spill area.
    spill_base: u32,
    free_spills: Vec<u32>,
    spill_slots: u32,
    spill_count: usize,
}

impl RegisterPool {
    pub fn new(register_count: usize, spill_base: u32) -> Self {
        Self {
            register_count,
            registers: vec![None; register_count],
            live: FxHashMap::default(),
            next_value: 0,
            clock: 0,
            spill_base,
            free_spills: Vec::new(),
            spill_slots: 0,
            spill_count: 0,
        }
    }

    /// Produce a new value in a free register, spilling if needed.
    ///
    /// The new value is pinned until [`unpin_all`](Self::unpin_all).
    pub fn acquire(
        &mut self,
        code: &mut Vec<Instruction>,
        span: Span,
    ) -> Result<(Value, Reg), CompilationError> {
        let index = match self.free_register() {
            Some(index) => index,
            None => self.evict(code, span)?,
        };
        Ok(self.occupy(index))
    }

    /// Produce a new value in register `index`, evicting its occupant.
    pub fn acquire_specific(
        &mut self,
        index: u8,
        code: &mut Vec<Instruction>,
        span: Span,
    ) -> Result<(Value, Reg), CompilationError> {
        if let Some(occupant) = self.registers.get(index as usize).copied().flatten() {
            if self.live.get(&occupant).is_some_and(|l| l.pinned) {
                return Err(CompilationError::internal(
                    format!("register r{} is pinned", index),
                    span,
                ));
            }
            self.spill(occupant, code);
        }
        Ok(self.occupy(index))
    }

    /// Make `values` resident and pin them; returns their registers in order.
    pub fn load(
        &mut self,
        values: &[Value],
        code: &mut Vec<Instruction>,
        span: Span,
    ) -> Result<Vec<Reg>, CompilationError> {
        for value in values {
            if let Some(live) = self.live.get_mut(value) {
                live.pinned = true;
            }
        }

        let mut regs = Vec::with_capacity(values.len());
        for &value in values {
            let live = self.live.get(&value).copied().ok_or_else(|| {
                CompilationError::internal(format!("value {} is not live", value.0), span)
            })?;
            let index = match live.location {
                Location::Register(index) => index,
                Location::Spilled(spill) => {
                    let index = match self.free_register() {
                        Some(index) => index,
                        None => self.evict(code, span)?,
                    };
                    code.push(Instruction::LoadStack(Reg::R(index), self.spill_base + spill));
                    self.free_spills.push(spill);
                    self.registers[index as usize] = Some(value);
                    self.clock += 1;
                    self.live.insert(
                        value,
                        Live {
                            location: Location::Register(index),
                            acquired: self.clock,
                            pinned: true,
                        },
                    );
                    log::trace!("reload value {} into r{}", value.0, index);
                    index
                }
            };
            regs.push(Reg::R(index));
        }
        Ok(regs)
    }

    /// Consume `value`, freeing its register or spill slot.
    pub fn release(&mut self, value: Value) {
        match self.live.remove(&value).map(|l| l.location) {
            Some(Location::Register(index)) => self.registers[index as usize] = None,
            Some(Location::Spilled(spill)) => self.free_spills.push(spill),
            None => {}
        }
    }

    /// Spill every resident value except `keep`, e.g. before a call.
    pub fn spill_all_except(&mut self, keep: &[Value], code: &mut Vec<Instruction>) {
        let mut resident: Vec<(u64, Value)> = self
            .live
            .iter()
            .filter(|(value, live)| {
                matches!(live.location, Location::Register(_)) && !keep.contains(*value)
            })
            .map(|(&value, live)| (live.acquired, value))
            .collect();
        // Oldest first keeps the emitted order stable.
        resident.sort_unstable();
        for (_, value) in resident {
            self.spill(value, code);
        }
    }

    pub fn unpin_all(&mut self) {
        for live in self.live.values_mut() {
            live.pinned = false;
        }
    }

    /// Values not yet consumed.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Spill slots needed so far; the frame reserves this many.
    pub fn spill_slots(&self) -> u32 {
        self.spill_slots
    }

    /// Number of `store_stack` spills emitted.
    pub fn spill_count(&self) -> usize {
        self.spill_count
    }

    // ==========================================================================
    // Internals
    // ==========================================================================

    fn free_register(&self) -> Option<u8> {
        self.registers
            .iter()
            .position(Option::is_none)
            .map(|index| index as u8)
    }

    fn occupy(&mut self, index: u8) -> (Value, Reg) {
        let value = Value(self.next_value);
        self.next_value += 1;
        self.clock += 1;
        self.registers[index as usize] = Some(value);
        self.live.insert(
            value,
            Live {
                location: Location::Register(index),
                acquired: self.clock,
                pinned: true,
            },
        );
        (value, Reg::R(index))
    }

    /// Spill the least-recently-acquired unpinned resident value.
    fn evict(&mut self, code: &mut Vec<Instruction>, span: Span) -> Result<u8, CompilationError> {
        let victim = self
            .live
            .iter()
            .filter(|(_, live)| !live.pinned && matches!(live.location, Location::Register(_)))
            .min_by_key(|(_, live)| live.acquired)
            .map(|(&value, live)| (value, live.location));

        match victim {
            Some((value, Location::Register(index))) => {
                self.spill(value, code);
                Ok(index)
            }
            _ => Err(CompilationError::internal(
                format!(
                    "all {} registers are pinned by one expression",
                    self.register_count
                ),
                span,
            )),
        }
    }

    fn spill(&mut self, value: Value, code: &mut Vec<Instruction>) {
        let Some(live) = self.live.get(&value).copied() else {
            return;
        };
        let Location::Register(index) = live.location else {
            return;
        };
        let spill = self.free_spills.pop().unwrap_or_else(|| {
            self.spill_slots += 1;
            self.spill_slots - 1
        });
        code.push(Instruction::StoreStack(self.spill_base + spill, Reg::R(index)));
        self.registers[index as usize] = None;
        self.spill_count += 1;
        self.live.insert(
            value,
            Live {
                location: Location::Spilled(spill),
                ..live
            },
        );
        log::trace!("spill value {} from r{} to slot {}", value.0, index, spill);
    }
}
