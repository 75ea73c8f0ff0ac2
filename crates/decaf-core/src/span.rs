//! Source location tracking for error reporting.
//!
//! Provides [`Span`] to track where AST nodes and errors occur in source code.

use std::fmt;

/// A span of source code, represented by its starting position.
///
/// The external parser reports the line:column where each node starts;
/// the core never sees source text, so that is all a span records.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub col: u32,
}

impl Span {
    /// Create a new span from a line and column.
    #[inline]
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }

    /// Whether this span carries no location (both coordinates zero).
    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.line == 0 && self.col == 0
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_display() {
        let span = Span::new(3, 15);
        assert_eq!(format!("{}", span), "3:15");
        assert_eq!(format!("{:?}", span), "3:15");
    }

    #[test]
    fn default_span_is_unknown() {
        assert!(Span::default().is_unknown());
        assert!(!Span::new(1, 1).is_unknown());
    }

    #[test]
    fn spans_order_by_line_then_column() {
        assert!(Span::new(1, 9) < Span::new(2, 1));
        assert!(Span::new(2, 1) < Span::new(2, 4));
    }
}
