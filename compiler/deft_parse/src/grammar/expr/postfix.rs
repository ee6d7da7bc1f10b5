//! Postfix forms (`.attr`, `[index]`, `(args)`) and filters (`|name(args)`).

use deft_ir::{Arg, Expr};
use deft_lexer::TokenKind;

use crate::{ParseError, Parser};

impl Parser<'_> {
    /// Parse a postfix chain followed by any number of filters.
    pub(crate) fn parse_filtered(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_postfix()?;
        while self.cursor.eat(&TokenKind::Pipe) {
            let name = self.cursor.expect_ident()?;
            let args = if self.cursor.check(&TokenKind::LParen) {
                self.parse_call_args()?
            } else {
                Vec::new()
            };
            expr = Expr::Filter {
                target: Box::new(expr),
                name,
                args,
            };
        }
        Ok(expr)
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.cursor.current_kind() {
                TokenKind::Dot => {
                    self.cursor.advance();
                    let name = self.cursor.expect_ident()?;
                    expr = Expr::Attr {
                        target: Box::new(expr),
                        name,
                    };
                }
                TokenKind::LBracket => {
                    self.cursor.advance();
                    let index = self.parse_expr()?;
                    self.cursor.expect(&TokenKind::RBracket)?;
                    expr = Expr::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                TokenKind::LParen => {
                    let args = self.parse_call_args()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Parse `(a, key=b, ...)`; the cursor is on `(`.
    pub(crate) fn parse_call_args(&mut self) -> Result<Vec<Arg>, ParseError> {
        self.cursor.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        while !self.cursor.check(&TokenKind::RParen) {
            let named = matches!(self.cursor.current_kind(), TokenKind::Ident(_))
                && *self.cursor.peek_kind(1) == TokenKind::Assign;
            let arg = if named {
                let name = self.cursor.expect_ident()?;
                self.cursor.advance();
                Arg::named(name, self.parse_expr()?)
            } else {
                Arg::positional(self.parse_expr()?)
            };
            args.push(arg);
            if !self.cursor.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.cursor.expect(&TokenKind::RParen)?;
        Ok(args)
    }
}
