use fire_lexer::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemaErrorKind {
    UndefinedName,
    AmbiguousName,
    AmbiguousCall,
    NoMatchingOverload,
    TooFewArguments,
    TooManyArguments,
    DuplicateArgument,
    UnknownArgument,
    TypeMismatch,
    InvalidOperator,
    UseBeforeDeduction,
    NotEnumOrClass,
    EnumeratorNotFound,
    NotSupported,
    NotCallable,
    UnknownMember,
    InvalidAssignTarget,
    MisplacedStatement,
    InvalidType,
    Internal,
}

/// A binding or type error. Notes point at related declarations.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} at {}..{}", span.start, span.end)]
pub struct SemaError {
    pub kind: SemaErrorKind,
    pub message: String,
    pub span: Span,
    pub notes: Vec<(String, Span)>,
}

impl SemaError {
    pub fn new(kind: SemaErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self { kind, message: message.into(), span, notes: Vec::new() }
    }

    pub fn with_note(mut self, message: impl Into<String>, span: Span) -> Self {
        self.notes.push((message.into(), span));
        self
    }
}
