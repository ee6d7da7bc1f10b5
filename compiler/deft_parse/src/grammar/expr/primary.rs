//! Primary expressions: literals, names, list and map displays, and
//! parenthesized expressions.

use deft_ir::{Expr, Literal};
use deft_lexer::TokenKind;

use crate::error::ParseErrorKind;
use crate::{ParseError, Parser};

impl Parser<'_> {
    pub(crate) fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.cursor.current().clone();
        match token.kind {
            TokenKind::Ident(name) => {
                self.cursor.advance();
                Ok(match name.as_str() {
                    "none" | "None" | "null" => Expr::Literal(Literal::None),
                    "true" | "True" => Expr::Literal(Literal::Bool(true)),
                    "false" | "False" => Expr::Literal(Literal::Bool(false)),
                    _ => Expr::Name(name),
                })
            }
            TokenKind::Int(n) => {
                self.cursor.advance();
                Ok(Expr::Literal(Literal::Int(n)))
            }
            TokenKind::Float(x) => {
                self.cursor.advance();
                Ok(Expr::Literal(Literal::Float(x)))
            }
            TokenKind::Str(s) => {
                self.cursor.advance();
                Ok(Expr::Literal(Literal::Str(s)))
            }
            TokenKind::LParen => {
                self.cursor.advance();
                let inner = self.parse_expr()?;
                self.cursor.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_list(),
            TokenKind::LBrace => self.parse_map(),
            TokenKind::Eof if self.cursor.previous_span().is_empty() => Err(ParseError::new(
                ParseErrorKind::EmptyExpression,
                self.cursor.current_span(),
            )),
            _ => Err(self.cursor.unexpected("an expression")),
        }
    }

    /// Parse `[a, b, ...]`; a trailing comma is allowed.
    fn parse_list(&mut self) -> Result<Expr, ParseError> {
        self.cursor.expect(&TokenKind::LBracket)?;
        let mut items = Vec::new();
        while !self.cursor.check(&TokenKind::RBracket) {
            items.push(self.parse_expr()?);
            if !self.cursor.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.cursor.expect(&TokenKind::RBracket)?;
        Ok(Expr::List(items))
    }

    /// Parse `{key: value, ...}`; a trailing comma is allowed.
    fn parse_map(&mut self) -> Result<Expr, ParseError> {
        self.cursor.expect(&TokenKind::LBrace)?;
        let mut entries = Vec::new();
        while !self.cursor.check(&TokenKind::RBrace) {
            let key = self.parse_expr()?;
            self.cursor.expect(&TokenKind::Colon)?;
            let value = self.parse_expr()?;
            entries.push((key, value));
            if !self.cursor.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.cursor.expect(&TokenKind::RBrace)?;
        Ok(Expr::Map(entries))
    }
}
