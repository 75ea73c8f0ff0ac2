//! Loop label tracking for `break` and `continue`.

/// Labels of one enclosing loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopLabels {
    /// Where `break` jumps: just past the loop.
    pub break_label: String,
    /// Where `continue` jumps: the condition test, or a `for` update.
    pub continue_label: String,
}

/// Stack of loop contexts, innermost last.
#[derive(Debug, Default)]
pub struct JumpManager {
    loops: Vec<LoopLabels>,
}

impl JumpManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_loop(&mut self, labels: LoopLabels) {
        self.loops.push(labels);
    }

    pub fn exit_loop(&mut self) -> Option<LoopLabels> {
        self.loops.pop()
    }

    pub fn in_loop(&self) -> bool {
        !self.loops.is_empty()
    }

    pub fn break_label(&self) -> Option<&str> {
        self.loops.last().map(|l| l.break_label.as_str())
    }

    pub fn continue_label(&self) -> Option<&str> {
        self.loops.last().map(|l| l.continue_label.as_str())
    }

    pub fn loop_depth(&self) -> usize {
        self.loops.len()
    }
}
