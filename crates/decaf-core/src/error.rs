//! Semantic errors raised by the Decaf core passes.
//!
//! Every variant carries the [`Span`] of the offending node and renders a
//! rule-specific message. Variants are grouped by [`ErrorKind`], which is what
//! the line-oriented diagnostics report:
//!
//! ```text
//! CompilationError
//! ├── DeclarationError - duplicate names, bad parents, incompatible overrides
//! ├── ResolutionError  - unbound identifiers, types and members
//! ├── TypeError        - operator, assignment, call, return and flow typing
//! ├── VisibilityError  - private members used outside their class
//! └── InternalError    - code generator invariant breaks
//! ```

use std::fmt;

use thiserror::Error;

use crate::Span;

// ============================================================================
// Error Kinds
// ============================================================================

/// The category a [`CompilationError`] is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    DeclarationError,
    ResolutionError,
    TypeError,
    VisibilityError,
    InternalError,
}

impl ErrorKind {
    pub const fn name(self) -> &'static str {
        match self {
            ErrorKind::DeclarationError => "DeclarationError",
            ErrorKind::ResolutionError => "ResolutionError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::VisibilityError => "VisibilityError",
            ErrorKind::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Compilation Errors
// ============================================================================

/// Errors produced by resolution, type checking and code generation.
///
/// The message does not include the location; [`crate::Diagnostic`] prefixes
/// it with `line:col` and the kind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilationError {
    // ------------------------------------------------------------------
    // DeclarationError
    // ------------------------------------------------------------------
    /// Two declarations with the same name in one scope.
    #[error("duplicate declaration of '{name}' in {scope}")]
    DuplicateDeclaration {
        name: String,
        /// Human description of the scope, e.g. `class 'Dog'`.
        scope: String,
        span: Span,
    },

    /// A member name reused with another role (field vs. method).
    #[error("'{name}' is declared as a {role} in class '{class}' and cannot be redeclared as a {other_role}")]
    MemberRoleConflict {
        name: String,
        role: &'static str,
        other_role: &'static str,
        class: String,
        span: Span,
    },

    /// A field with the same name as an inherited field.
    #[error("field '{name}' hides the field inherited from class '{ancestor}'")]
    HiddenField {
        name: String,
        ancestor: String,
        span: Span,
    },

    /// A class extends a name that is not a declared class.
    #[error("class '{class}' extends undeclared class '{parent}'")]
    UnknownParent {
        class: String,
        parent: String,
        span: Span,
    },

    /// A class takes part in an inheritance cycle.
    #[error("circular inheritance: {cycle}")]
    CircularInheritance {
        /// The classes on the cycle, e.g. `A -> B -> A`.
        cycle: String,
        span: Span,
    },

    /// An override whose signature differs from the overridden method.
    #[error("method '{class}.{method}' overrides '{ancestor}.{method}' incompatibly: {reason}")]
    IncompatibleOverride {
        class: String,
        method: String,
        ancestor: String,
        reason: String,
        span: Span,
    },

    // ------------------------------------------------------------------
    // ResolutionError
    // ------------------------------------------------------------------
    /// An identifier that does not resolve to any declaration.
    #[error("undeclared identifier '{name}'")]
    UndeclaredIdentifier { name: String, span: Span },

    /// A type name that is neither primitive nor a declared class.
    #[error("unknown type '{name}'")]
    UnknownType { name: String, span: Span },

    /// A field or method not found in a class or its ancestors.
    #[error("class '{class}' has no {role} named '{name}'")]
    UnknownMember {
        class: String,
        role: &'static str,
        name: String,
        span: Span,
    },

    /// `this` or `super` where no receiver exists.
    #[error("'{keyword}' {reason}")]
    InvalidReceiver {
        keyword: &'static str,
        reason: &'static str,
        span: Span,
    },

    // ------------------------------------------------------------------
    // TypeError
    // ------------------------------------------------------------------
    /// Operand types do not fit an operator.
    #[error("operator '{op}' {message}")]
    OperatorMismatch {
        op: &'static str,
        message: String,
        span: Span,
    },

    /// A value whose type is not assignable to the target type.
    #[error("cannot assign a value of type '{found}' to {target} of type '{expected}'")]
    IncompatibleAssignment {
        expected: String,
        found: String,
        /// What is assigned, e.g. `variable 'x'`.
        target: String,
        span: Span,
    },

    /// Assignment or increment target that is not a variable or field.
    #[error("expression is not assignable")]
    NotAssignable { span: Span },

    /// A condition that is not `bool`.
    #[error("{construct} condition must be of type 'bool', found '{found}'")]
    NonBoolCondition {
        construct: &'static str,
        found: String,
        span: Span,
    },

    /// A call with the wrong number of arguments.
    #[error("method '{method}' expects {expected} argument(s), found {found}")]
    ArgumentCount {
        method: String,
        expected: usize,
        found: usize,
        span: Span,
    },

    /// A call argument not assignable to its parameter type.
    #[error("argument {position} of '{method}' expects type '{expected}', found '{found}'")]
    ArgumentType {
        method: String,
        position: usize,
        expected: String,
        found: String,
        span: Span,
    },

    /// A return value that does not fit the declared return type.
    #[error("{message}")]
    ReturnMismatch { message: String, span: Span },

    /// A non-void method whose body can complete without returning.
    #[error("method '{method}' must return a value of type '{expected}' on every path")]
    MissingReturn {
        method: String,
        expected: String,
        span: Span,
    },

    /// Member access on a value that is not an object.
    #[error("cannot access member '{member}' on a value of type '{found}'")]
    NotAnObject {
        member: String,
        found: String,
        span: Span,
    },

    /// Instance member reached without an instance, or static member through one.
    #[error("{message}")]
    StaticContext { message: String, span: Span },

    /// A class or method name used where a value is required.
    #[error("{role} name '{name}' cannot be used as a value")]
    NotAValue {
        role: &'static str,
        name: String,
        span: Span,
    },

    /// `void` used as a value.
    #[error("expression of type 'void' cannot be used as a value")]
    VoidValue { span: Span },

    /// `break` or `continue` with no enclosing loop.
    #[error("'{keyword}' outside of a loop")]
    OutsideLoop { keyword: &'static str, span: Span },

    /// `print` of a type outside the builtin overload set.
    #[error("print accepts int, double, bool or string, found '{found}'")]
    PrintType { found: String, span: Span },

    // ------------------------------------------------------------------
    // VisibilityError
    // ------------------------------------------------------------------
    /// A private member used outside its declaring class.
    #[error("{role} '{name}' is private to class '{class}'")]
    PrivateMember {
        role: &'static str,
        name: String,
        class: String,
        span: Span,
    },

    // ------------------------------------------------------------------
    // InternalError
    // ------------------------------------------------------------------
    /// An invariant the earlier phases guarantee did not hold.
    #[error("internal compiler error: {message}")]
    Internal { message: String, span: Span },
}

impl CompilationError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            CompilationError::DuplicateDeclaration { span, .. }
            | CompilationError::MemberRoleConflict { span, .. }
            | CompilationError::HiddenField { span, .. }
            | CompilationError::UnknownParent { span, .. }
            | CompilationError::CircularInheritance { span, .. }
            | CompilationError::IncompatibleOverride { span, .. }
            | CompilationError::UndeclaredIdentifier { span, .. }
            | CompilationError::UnknownType { span, .. }
            | CompilationError::UnknownMember { span, .. }
            | CompilationError::InvalidReceiver { span, .. }
            | CompilationError::OperatorMismatch { span, .. }
            | CompilationError::IncompatibleAssignment { span, .. }
            | CompilationError::NotAssignable { span }
            | CompilationError::NonBoolCondition { span, .. }
            | CompilationError::ArgumentCount { span, .. }
            | CompilationError::ArgumentType { span, .. }
            | CompilationError::ReturnMismatch { span, .. }
            | CompilationError::MissingReturn { span, .. }
            | CompilationError::NotAnObject { span, .. }
            | CompilationError::StaticContext { span, .. }
            | CompilationError::NotAValue { span, .. }
            | CompilationError::VoidValue { span }
            | CompilationError::OutsideLoop { span, .. }
            | CompilationError::PrintType { span, .. }
            | CompilationError::PrivateMember { span, .. }
            | CompilationError::Internal { span, .. } => *span,
        }
    }

    /// Get the category this error is reported under.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompilationError::DuplicateDeclaration { .. }
            | CompilationError::MemberRoleConflict { .. }
            | CompilationError::HiddenField { .. }
            | CompilationError::UnknownParent { .. }
            | CompilationError::CircularInheritance { .. }
            | CompilationError::IncompatibleOverride { .. } => ErrorKind::DeclarationError,

            CompilationError::UndeclaredIdentifier { .. }
            | CompilationError::UnknownType { .. }
            | CompilationError::UnknownMember { .. }
            | CompilationError::InvalidReceiver { .. } => ErrorKind::ResolutionError,

            CompilationError::OperatorMismatch { .. }
            | CompilationError::IncompatibleAssignment { .. }
            | CompilationError::NotAssignable { .. }
            | CompilationError::NonBoolCondition { .. }
            | CompilationError::ArgumentCount { .. }
            | CompilationError::ArgumentType { .. }
            | CompilationError::ReturnMismatch { .. }
            | CompilationError::MissingReturn { .. }
            | CompilationError::NotAnObject { .. }
            | CompilationError::StaticContext { .. }
            | CompilationError::NotAValue { .. }
            | CompilationError::VoidValue { .. }
            | CompilationError::OutsideLoop { .. }
            | CompilationError::PrintType { .. } => ErrorKind::TypeError,

            CompilationError::PrivateMember { .. } => ErrorKind::VisibilityError,

            CompilationError::Internal { .. } => ErrorKind::InternalError,
        }
    }

    /// Shorthand for an [`CompilationError::Internal`] error.
    pub fn internal(message: impl Into<String>, span: Span) -> Self {
        CompilationError::Internal {
            message: message.into(),
            span,
        }
    }
}
