//! Syntax errors raised while parsing.

use cidx_diagnostic::{Diagnostic, ErrorCode};
use cidx_ir::{FileId, Span, Token};

/// Parse error with error code for rich diagnostics.
///
/// Errors propagate with `?` up to the nearest declaration or statement,
/// which turns them into a problem node and resynchronizes.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ParseError {
    pub code: ErrorCode,
    pub message: String,
    pub span: Span,
    pub file: FileId,
    /// Label text for the primary span.
    pub context: Option<String>,
}

impl ParseError {
    pub fn new(code: ErrorCode, message: impl Into<String>, span: Span, file: FileId) -> Self {
        ParseError {
            code,
            message: message.into(),
            span,
            file,
            context: None,
        }
    }

    /// Error located at `token`.
    pub fn at(code: ErrorCode, message: impl Into<String>, token: &Token) -> Self {
        Self::new(code, message, token.span, token.file)
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.code)
            .with_message(&self.message)
            .in_file(self.file)
            .with_label(self.span, self.context.as_deref().unwrap_or("here"))
    }
}

pub(crate) type PResult<T> = Result<T, ParseError>;
