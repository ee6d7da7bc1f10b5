//! Parse error types.

use deft_ir::{Span, TagKind};
use deft_lexer::{LexError, LexErrorKind};

/// A parse error and where it happened.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        ParseError { kind, span }
    }

    /// Shift the span into template coordinates.
    #[must_use]
    pub fn offset(self, base: u32) -> Self {
        ParseError {
            kind: self.kind,
            span: self.span.offset(base),
        }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::new(ParseErrorKind::Lex(err.kind), err.span)
    }
}

/// What went wrong.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("{0}")]
    Lex(LexErrorKind),

    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },

    #[error("unexpected {found} after the end of the expression")]
    TrailingInput { found: String },

    #[error("empty expression")]
    EmptyExpression,

    #[error("unknown tag `{0}`")]
    UnknownTag(String),

    #[error("`{found}` has no matching opening tag")]
    UnexpectedEndTag { found: String },

    #[error("`{tag}` block is never closed")]
    UnclosedBlock { tag: TagKind },

    #[error("malformed `{tag}` tag: {message}")]
    MalformedTag { tag: TagKind, message: String },
}
