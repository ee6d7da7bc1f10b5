//! Lexer error types.

use deft_ir::Span;

/// A lexer error with the span it occurred at.
#[derive(Clone, Debug, Eq, PartialEq, Hash, thiserror::Error)]
#[error("{kind}")]
pub struct LexError {
    pub span: Span,
    pub kind: LexErrorKind,
}

impl LexError {
    pub fn new(kind: LexErrorKind, span: Span) -> Self {
        LexError { span, kind }
    }
}

/// What kind of lexer error occurred.
#[derive(Clone, Debug, Eq, PartialEq, Hash, thiserror::Error)]
pub enum LexErrorKind {
    /// `{{` without a matching `}}`.
    #[error("unclosed expression, expected `}}}}`")]
    UnterminatedExpression,
    /// `{%` without a matching `%}`.
    #[error("unclosed tag, expected `%}}`")]
    UnterminatedTag,
    /// `{#` without a matching `#}`.
    #[error("unclosed comment, expected `#}}`")]
    UnterminatedComment,
    /// `{% raw %}` without `{% endraw %}`.
    #[error("raw block is never closed, expected `{{% endraw %}}`")]
    UnterminatedRaw,
    /// Missing closing quote.
    #[error("unterminated string literal")]
    UnterminatedString,
    /// Integer literal does not fit in 64 bits.
    #[error("integer literal is too large")]
    IntOverflow,
    /// Float literal could not be parsed.
    #[error("invalid float literal")]
    InvalidFloat,
    /// A character that starts no token.
    #[error("unexpected character `{0}`")]
    UnexpectedChar(char),
}
