//! Token cursor for navigating the token stream.
//!
//! Provides token access, lookahead, and consumption methods. The token
//! list always ends in `Eof`, so the cursor never runs off the end.

use deft_ir::Span;
use deft_lexer::{Token, TokenKind};

use crate::error::{ParseError, ParseErrorKind};

/// Cursor for navigating tokens.
pub struct Cursor<'a> {
    tokens: Vec<Token>,
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor over tokens lexed from `src`.
    ///
    /// `tokens` must be non-empty and end in `Eof`.
    pub fn new(tokens: Vec<Token>, src: &'a str) -> Self {
        debug_assert!(
            matches!(tokens.last(), Some(t) if t.kind == TokenKind::Eof),
            "token stream must end in Eof"
        );
        Cursor {
            tokens,
            src,
            pos: 0,
        }
    }

    /// The source the tokens came from.
    pub fn src(&self) -> &'a str {
        self.src
    }

    /// Get the current token.
    #[inline]
    pub fn current(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    /// Get the current token's kind.
    #[inline]
    pub fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    /// Get the current token's span.
    #[inline]
    pub fn current_span(&self) -> Span {
        self.current().span
    }

    /// Look `n` tokens ahead of the current one.
    pub fn peek_kind(&self, n: usize) -> &TokenKind {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + n).min(last)].kind
    }

    /// Span of the most recently consumed token.
    pub fn previous_span(&self) -> Span {
        match self.pos.checked_sub(1) {
            Some(prev) => self.tokens[prev].span,
            None => Span::DUMMY,
        }
    }

    /// Whether the current token is `kind`.
    #[inline]
    pub fn check(&self, kind: &TokenKind) -> bool {
        self.current_kind() == kind
    }

    /// Whether the current token is the identifier `word`.
    #[inline]
    pub fn check_ident(&self, word: &str) -> bool {
        self.current_kind().is_ident(word)
    }

    /// Whether the stream is exhausted.
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.check(&TokenKind::Eof)
    }

    /// Consume the current token and return it.
    pub fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    /// Consume the current token if it is `kind`.
    pub fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume the current token if it is the identifier `word`.
    pub fn eat_ident(&mut self, word: &str) -> bool {
        if self.check_ident(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume `kind` or report what was found instead.
    pub fn expect(&mut self, kind: &TokenKind) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("`{kind}`")))
        }
    }

    /// Consume an identifier and return its text.
    pub fn expect_ident(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Ident(name) = self.current_kind() {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected("an identifier"))
        }
    }

    /// Require that every token has been consumed.
    pub fn expect_end(&self) -> Result<(), ParseError> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(ParseError::new(
                ParseErrorKind::TrailingInput {
                    found: self.current_kind().describe(),
                },
                self.current_span(),
            ))
        }
    }

    /// Build an "expected X, found Y" error at the current token.
    pub fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::new(
            ParseErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                found: self.current_kind().describe(),
            },
            self.current_span(),
        )
    }

    /// Source text between two byte offsets.
    pub fn slice(&self, start: u32, end: u32) -> &'a str {
        self.src.get(start as usize..end as usize).unwrap_or("")
    }
}
