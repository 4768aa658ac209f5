use fire_lexer::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    StackOverflow,
    TypeMismatch,
    IndexOutOfRange,
    DivisionByZero,
    IntegerOverflow,
    InvalidOperation,
    DuplicateArgument,
    UnknownArgument,
    MissingArgument,
    TooManyArguments,
    NotCallable,
    NotImplemented,
    UncaughtThrow,
    AssertionFailed,
    Io,
    Internal,
}

/// A fatal evaluation failure. `notes` carry the call chain it unwound through.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub message: String,
    pub span: Span,
    pub notes: Vec<(String, Span)>,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self { kind, message: message.into(), span, notes: Vec::new() }
    }

    pub fn type_mismatch(message: impl Into<String>, span: Span) -> Self {
        Self::new(RuntimeErrorKind::TypeMismatch, message, span)
    }

    pub fn internal(message: impl Into<String>, span: Span) -> Self {
        Self::new(RuntimeErrorKind::Internal, message, span)
    }

    pub fn with_note(mut self, message: impl Into<String>, span: Span) -> Self {
        self.notes.push((message.into(), span));
        self
    }
}
