//! Line-oriented diagnostics surfaced by a failing phase.

use std::fmt;

use crate::{CompilationError, ErrorKind, Span};

/// A single diagnostic line.
///
/// Renders as `<line>:<col>: <kind>: <message>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub span: Span,
    pub message: String,
}

impl From<&CompilationError> for Diagnostic {
    fn from(error: &CompilationError) -> Self {
        Diagnostic {
            kind: error.kind(),
            span: error.span(),
            message: error.to_string(),
        }
    }
}

impl From<CompilationError> for Diagnostic {
    fn from(error: CompilationError) -> Self {
        Diagnostic::from(&error)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.span, self.kind, self.message)
    }
}

/// The ordered diagnostics of one phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: impl Into<Diagnostic>) {
        self.items.push(diagnostic.into());
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    /// Count the diagnostics of one kind.
    pub fn count_of(&self, kind: ErrorKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    /// Check whether any diagnostic has the given kind.
    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        self.items.iter().any(|d| d.kind == kind)
    }
}

impl FromIterator<CompilationError> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = CompilationError>>(iter: I) -> Self {
        Diagnostics {
            items: iter.into_iter().map(Diagnostic::from).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}
