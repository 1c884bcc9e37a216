//! Compile-time diagnostics ("notes")
//!
//! Notes attach to the construct that detected the problem and bubble up to
//! the nearest non-implicit ancestor, so one top-level declaration
//! accumulates everything found beneath it. Compilation is best-effort: an
//! erroring subtree never stops sibling subtrees from being checked.
//!
//! A construct carrying any [`Severity::Error`] note is poisoned and can
//! never become fully compiled (and therefore can never produce a runtime
//! node).

use super::ConstructId;
use crate::entities::DeclarationError;
use thiserror::Error;

/// Severity of a compile-time note
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Style,
    Warning,
    Error,
}

/// The closed set of diagnostics the compilation pipeline can produce
#[derive(Debug, Clone, Error)]
pub enum NoteKind {
    #[error("use of undeclared name '{name}'")]
    UnknownName { name: String },

    #[error("'{name}' does not name a variable")]
    NotAVariable { name: String },

    #[error("'{name}' does not name a function")]
    NotAFunction { name: String },

    #[error("'{name}' does not name a class")]
    NotAClass { name: String },

    #[error(transparent)]
    Redeclaration(#[from] DeclarationError),

    #[error("no matching function for call to '{name}'")]
    NoMatchingFunction { name: String },

    #[error("no viable constructor for class '{class}'")]
    NoViableConstructor { class: String },

    #[error("function '{name}' is used but never defined")]
    FunctionNotDefined { name: String },

    #[error("function '{name}' expects {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("cannot call non-const member function '{name}' on a const receiver")]
    ConstReceiver { name: String },

    #[error("a reference cannot be default-initialized; it must bind to something")]
    ReferenceDefaultInit,

    #[error("a reference cannot be value-initialized; it must bind to something")]
    ReferenceValueInit,

    #[error("list initialization of a reference is not allowed")]
    ReferenceListInit,

    #[error("cannot bind a reference of type '{target}' to an expression of type '{from}'")]
    ReferenceBindFailed { target: String, from: String },

    #[error("list initialization of type '{target}' is not allowed")]
    AtomicListInit { target: String },

    #[error("an initializer for '{target}' requires exactly one expression")]
    SingleInitializerRequired { target: String },

    #[error("direct initialization of an array is only allowed for a char array from a single string literal")]
    ArrayDirectInit,

    #[error("string literal of length {literal_len} does not fit in an array of length {array_len}")]
    StringLiteralTooLong {
        literal_len: usize,
        array_len: usize,
    },

    #[error("too many initializers: {supplied} supplied for an array of length {capacity}")]
    TooManyInitializers { supplied: usize, capacity: usize },

    #[error("class '{class}' has no accessible destructor")]
    NoDestructor { class: String },

    #[error("class '{class}' has no member named '{member}'")]
    UnknownMember { class: String, member: String },

    #[error("invalid operands of types '{lhs}' and '{rhs}' to binary operator")]
    InvalidBinaryOperands { lhs: String, rhs: String },

    #[error("invalid operand of type '{ty}' to unary operator")]
    InvalidUnaryOperand { ty: String },

    #[error("cannot dereference an expression of non-pointer type '{ty}'")]
    DerefNonPointer { ty: String },

    #[error("cannot take the address of a non-lvalue expression")]
    AddressOfRvalue,

    #[error("cannot subscript an expression of type '{ty}'")]
    SubscriptNonArray { ty: String },

    #[error("cannot assign to an expression of const type '{ty}'")]
    AssignToConst { ty: String },

    #[error("the left operand of an assignment must be an lvalue")]
    AssignToRvalue,

    #[error("assignment to an expression of type '{ty}' is not supported")]
    UnsupportedAssignment { ty: String },

    #[error("cannot convert an expression of type '{from}' to '{to}'")]
    ConversionFailed { from: String, to: String },

    #[error("cannot use an expression of type '{ty}' in a boolean context")]
    NotConvertibleToBool { ty: String },

    #[error("the branches of a conditional expression have incompatible types '{lhs}' and '{rhs}'")]
    IncompatibleTernaryBranches { lhs: String, rhs: String },

    #[error("a function of void return type cannot return a value")]
    ReturnValueInVoidFunction,

    #[error("a function with non-void return type must return a value")]
    MissingReturnValue,

    #[error("a function name cannot be used as a value here")]
    FunctionNameAsValue,

    #[error("'{name}' has incomplete type and cannot be used here")]
    IncompleteType { name: String },

    #[error("no main() function found")]
    NoMainFunction,
}

/// A diagnostic attached to a construct
#[derive(Debug, Clone)]
pub struct Note {
    /// The construct the note is attached to after bubbling; `None` for
    /// translation-unit level diagnostics (e.g. missing `main`)
    pub construct: Option<ConstructId>,
    pub severity: Severity,
    pub kind: NoteKind,
}

impl Note {
    pub fn error(construct: ConstructId, kind: NoteKind) -> Self {
        Note {
            construct: Some(construct),
            severity: Severity::Error,
            kind,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Note {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.severity {
            Severity::Style => "style",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}: {}", tag, self.kind)
    }
}
