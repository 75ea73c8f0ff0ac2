//! Top-level error type for the compilation unit and the `decafc` binary.

use std::path::PathBuf;

use decaf_ast::IngestError;
use decaf_core::Diagnostics;

/// Everything that can stop a compilation.
#[derive(Debug, thiserror::Error)]
pub enum DecafError {
    /// The syntax tree could not be read.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// A phase reported diagnostics.
    #[error("{0}")]
    Compile(Diagnostics),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<Diagnostics> for DecafError {
    fn from(diagnostics: Diagnostics) -> Self {
        DecafError::Compile(diagnostics)
    }
}

impl DecafError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DecafError::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit status for this error: 1 for diagnostics, 2 when the
    /// input or output could not be handled at all.
    pub fn exit_code(&self) -> i32 {
        match self {
            DecafError::Compile(_) => 1,
            DecafError::Ingest(_) | DecafError::Io { .. } => 2,
        }
    }

    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            DecafError::Compile(diagnostics) => Some(diagnostics),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decaf_core::{CompilationError, Span};

    #[test]
    fn exit_codes() {
        let diagnostics: Diagnostics = [CompilationError::UndeclaredIdentifier {
            name: "x".into(),
            span: Span::new(1, 1),
        }]
        .into_iter()
        .collect();
        assert_eq!(DecafError::from(diagnostics).exit_code(), 1);

        let ingest = decaf_ast::from_json("{").unwrap_err();
        assert_eq!(DecafError::from(ingest).exit_code(), 2);

        let io = DecafError::io(
            "out.ami",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(io.exit_code(), 2);
        assert_eq!(io.to_string(), "out.ami: denied");
    }

    #[test]
    fn compile_error_displays_its_diagnostics() {
        let diagnostics: Diagnostics = [CompilationError::UndeclaredIdentifier {
            name: "count".into(),
            span: Span::new(4, 9),
        }]
        .into_iter()
        .collect();
        let error = DecafError::from(diagnostics);
        assert_eq!(
            error.to_string(),
            "4:9: ResolutionError: undeclared identifier 'count'"
        );
        assert_eq!(error.diagnostics().map(Diagnostics::len), Some(1));
    }
}
