//! Expression tokenizer.
//!
//! Turns the inner text of an expression or tag into a token list ending in
//! [`TokenKind::Eof`]. Spans are relative to the text passed in; callers
//! shift them with [`Span::offset`] when they need template coordinates.

use deft_ir::Span;

use crate::cursor::Cursor;
use crate::error::{LexError, LexErrorKind};
use crate::token::{Token, TokenKind};

/// Tokenize expression source.
pub fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    let mut scanner = Scanner {
        cursor: Cursor::new(src),
    };
    let mut tokens = Vec::new();
    loop {
        let token = scanner.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

/// Whether `c` can start an identifier.
pub fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

/// Whether `c` can continue an identifier.
pub fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

struct Scanner<'a> {
    cursor: Cursor<'a>,
}

impl Scanner<'_> {
    fn next_token(&mut self) -> Result<Token, LexError> {
        self.cursor.eat_whitespace();
        let start = self.cursor.pos();
        if self.cursor.is_eof() {
            return Ok(Token::new(TokenKind::Eof, Span::new(start, start)));
        }

        let b = self.cursor.current();
        let kind = match b {
            b'0'..=b'9' => return self.number(start),
            b'\'' | b'"' => return self.string(start, b),
            b'(' => self.single(TokenKind::LParen),
            b')' => self.single(TokenKind::RParen),
            b'[' => self.single(TokenKind::LBracket),
            b']' => self.single(TokenKind::RBracket),
            b'{' => self.single(TokenKind::LBrace),
            b'}' => self.single(TokenKind::RBrace),
            b',' => self.single(TokenKind::Comma),
            b':' => self.single(TokenKind::Colon),
            b'.' => self.single(TokenKind::Dot),
            b'|' => self.single(TokenKind::Pipe),
            b'~' => self.single(TokenKind::Tilde),
            b'+' => self.single(TokenKind::Plus),
            b'-' => self.single(TokenKind::Minus),
            b'%' => self.single(TokenKind::Percent),
            b'*' => self.one_or_two(b'*', TokenKind::Star, TokenKind::StarStar),
            b'/' => self.one_or_two(b'/', TokenKind::Slash, TokenKind::SlashSlash),
            b'=' => self.one_or_two(b'=', TokenKind::Assign, TokenKind::EqEq),
            b'<' => self.one_or_two(b'=', TokenKind::Lt, TokenKind::LtEq),
            b'>' => self.one_or_two(b'=', TokenKind::Gt, TokenKind::GtEq),
            b'!' if self.cursor.peek() == b'=' => {
                self.cursor.advance_n(2);
                TokenKind::NotEq
            }
            _ => match self.cursor.current_char() {
                Some(c) if is_ident_start(c) => return Ok(self.ident(start)),
                Some(c) => {
                    self.cursor.advance_char();
                    return Err(LexError::new(
                        LexErrorKind::UnexpectedChar(c),
                        Span::new(start, self.cursor.pos()),
                    ));
                }
                None => TokenKind::Eof,
            },
        };
        Ok(Token::new(kind, Span::new(start, self.cursor.pos())))
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.cursor.advance();
        kind
    }

    fn one_or_two(&mut self, second: u8, one: TokenKind, two: TokenKind) -> TokenKind {
        if self.cursor.peek() == second {
            self.cursor.advance_n(2);
            two
        } else {
            self.cursor.advance();
            one
        }
    }

    fn ident(&mut self, start: u32) -> Token {
        while let Some(c) = self.cursor.current_char() {
            if !is_ident_continue(c) {
                break;
            }
            self.cursor.advance_char();
        }
        let text = self.cursor.slice_from(start);
        Token::new(
            TokenKind::Ident(text.to_string()),
            Span::new(start, self.cursor.pos()),
        )
    }

    /// Decimal integer or float (`1`, `1.5`, `2e10`, `1.5e-3`).
    fn number(&mut self, start: u32) -> Result<Token, LexError> {
        self.cursor.eat_while(|b| b.is_ascii_digit());
        let mut is_float = false;

        if self.cursor.current() == b'.' && self.cursor.peek().is_ascii_digit() {
            is_float = true;
            self.cursor.advance();
            self.cursor.eat_while(|b| b.is_ascii_digit());
        }

        if matches!(self.cursor.current(), b'e' | b'E') {
            let sign = matches!(self.cursor.peek(), b'+' | b'-');
            let digit_at = if sign {
                self.cursor.peek2()
            } else {
                self.cursor.peek()
            };
            if digit_at.is_ascii_digit() {
                is_float = true;
                self.cursor.advance_n(if sign { 2 } else { 1 });
                self.cursor.eat_while(|b| b.is_ascii_digit());
            }
        }

        let span = Span::new(start, self.cursor.pos());
        let text = self.cursor.slice_from(start);
        let kind = if is_float {
            let value = text
                .parse::<f64>()
                .map_err(|_| LexError::new(LexErrorKind::InvalidFloat, span))?;
            TokenKind::Float(value)
        } else {
            let value = text
                .parse::<i64>()
                .map_err(|_| LexError::new(LexErrorKind::IntOverflow, span))?;
            TokenKind::Int(value)
        };
        Ok(Token::new(kind, span))
    }

    /// Quoted string; decodes `\\ \' \" \n \r \t`, keeps other escapes as
    /// written.
    fn string(&mut self, start: u32, quote: u8) -> Result<Token, LexError> {
        self.cursor.advance();
        let mut value = String::new();
        loop {
            if self.cursor.is_eof() {
                return Err(LexError::new(
                    LexErrorKind::UnterminatedString,
                    Span::new(start, self.cursor.pos()),
                ));
            }
            match self.cursor.current() {
                b if b == quote => {
                    self.cursor.advance();
                    break;
                }
                b'\\' => {
                    self.cursor.advance();
                    match self.cursor.current() {
                        b'n' => value.push('\n'),
                        b'r' => value.push('\r'),
                        b't' => value.push('\t'),
                        b'\\' => value.push('\\'),
                        b'\'' => value.push('\''),
                        b'"' => value.push('"'),
                        _ => {
                            value.push('\\');
                            continue;
                        }
                    }
                    self.cursor.advance();
                }
                _ => {
                    let char_start = self.cursor.pos();
                    self.cursor.advance_char();
                    value.push_str(self.cursor.slice_from(char_start));
                }
            }
        }
        Ok(Token::new(
            TokenKind::Str(value),
            Span::new(start, self.cursor.pos()),
        ))
    }
}

#[cfg(test)]
mod tests;
