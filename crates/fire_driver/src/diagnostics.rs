//! Error rendering with ariadne.

use std::io;

use ariadne::{Color, Label, Report, ReportKind, Source};
use fire_lexer::{LexError, Span};
use fire_parser::ParseError;
use fire_runtime::RuntimeError;
use fire_sema::SemaError;

/// Any error the pipeline reports, flattened for rendering.
pub struct Diagnostic {
    pub header: String,
    pub message: String,
    pub span: Span,
    pub notes: Vec<(String, Span)>,
}

impl From<&LexError> for Diagnostic {
    fn from(err: &LexError) -> Self {
        Self { header: "LexError".to_string(), message: err.message.clone(), span: err.span, notes: Vec::new() }
    }
}

impl From<&ParseError> for Diagnostic {
    fn from(err: &ParseError) -> Self {
        Self { header: "ParseError".to_string(), message: err.message.clone(), span: err.span, notes: Vec::new() }
    }
}

impl From<&SemaError> for Diagnostic {
    fn from(err: &SemaError) -> Self {
        Self {
            header: format!("{:?}", err.kind),
            message: err.message.clone(),
            span: err.span,
            notes: err.notes.clone(),
        }
    }
}

impl From<&RuntimeError> for Diagnostic {
    fn from(err: &RuntimeError) -> Self {
        Self {
            header: format!("{:?}", err.kind),
            message: err.message.clone(),
            span: err.span,
            notes: err.notes.clone(),
        }
    }
}

/// Clamp a span into the source so labels never point past the end.
fn range(span: Span, len: usize) -> std::ops::Range<usize> {
    let start = span.start.min(len);
    start..span.end.clamp(start, len)
}

/// Print `diagnostic` to stderr with the offending source lines.
pub fn emit(path: &str, source: &str, diagnostic: &Diagnostic) -> io::Result<()> {
    let len = source.len();
    let mut report = Report::build(ReportKind::Error, path, range(diagnostic.span, len).start)
        .with_code(&diagnostic.header)
        .with_message(&diagnostic.message)
        .with_label(
            Label::new((path, range(diagnostic.span, len)))
                .with_message(&diagnostic.message)
                .with_color(Color::Red),
        );
    for (note, span) in &diagnostic.notes {
        report = report.with_label(Label::new((path, range(*span, len))).with_message(note).with_color(Color::Blue));
    }
    report.finish().eprint((path, Source::from(source)))
}

pub fn emit_all(path: &str, source: &str, diagnostics: impl IntoIterator<Item = Diagnostic>) -> io::Result<()> {
    for diagnostic in diagnostics {
        emit(path, source, &diagnostic)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fire_runtime::RuntimeErrorKind;

    #[test]
    fn test_range_is_clamped_to_source() {
        assert_eq!(range(Span::new(3, 9), 5), 3..5);
        assert_eq!(range(Span::new(8, 9), 5), 5..5);
        assert_eq!(range(Span::new(1, 2), 5), 1..2);
    }

    #[test]
    fn test_runtime_notes_are_kept() {
        let err = RuntimeError::new(RuntimeErrorKind::StackOverflow, "stack overflow", Span::new(0, 1))
            .with_note("in call to 'f'", Span::new(2, 3));
        let diagnostic = Diagnostic::from(&err);
        assert_eq!(diagnostic.header, "StackOverflow");
        assert_eq!(diagnostic.notes.len(), 1);
    }
}
