//! Tag headers.
//!
//! Each parser here receives the text after the tag keyword. Expressions
//! embedded in a header are kept as source text; only the structural parts
//! (targets, parameter names) are parsed.

use deft_ir::{MacroParam, SetTarget, TagKind};
use deft_lexer::TokenKind;

use crate::error::ParseErrorKind;
use crate::{ParseError, Parser};

/// Parsed `set` header.
pub(crate) struct SetHeader {
    pub targets: Vec<SetTarget>,
    pub value: String,
}

/// Parsed `for` header.
pub(crate) struct ForHeader {
    pub targets: Vec<String>,
    pub iter: String,
}

/// Parsed `macro` header.
pub(crate) struct MacroHeader {
    pub name: String,
    pub params: Vec<MacroParam>,
}

fn malformed(tag: TagKind, message: &str, span: deft_ir::Span) -> ParseError {
    ParseError::new(
        ParseErrorKind::MalformedTag {
            tag,
            message: message.to_string(),
        },
        span,
    )
}

impl Parser<'_> {
    /// `a[.attr], b = value`
    pub(crate) fn parse_set_header(&mut self) -> Result<SetHeader, ParseError> {
        let mut targets = Vec::new();
        loop {
            let name = self.cursor.expect_ident()?;
            let attr = if self.cursor.eat(&TokenKind::Dot) {
                Some(self.cursor.expect_ident()?)
            } else {
                None
            };
            targets.push(SetTarget { name, attr });
            if !self.cursor.eat(&TokenKind::Comma) {
                break;
            }
        }
        if !self.cursor.check(&TokenKind::Assign) {
            return Err(malformed(
                TagKind::Set,
                "expected `=` after the assignment targets",
                self.cursor.current_span(),
            ));
        }
        let assign = self.cursor.advance();
        let value = self.rest_from(assign.span.end);
        if value.is_empty() {
            return Err(malformed(TagKind::Set, "missing value", assign.span));
        }
        Ok(SetHeader { targets, value })
    }

    /// `x[, y] in iterable`
    pub(crate) fn parse_for_header(&mut self) -> Result<ForHeader, ParseError> {
        let mut targets = vec![self.cursor.expect_ident()?];
        while self.cursor.eat(&TokenKind::Comma) {
            targets.push(self.cursor.expect_ident()?);
        }
        if !self.cursor.check_ident("in") {
            return Err(malformed(
                TagKind::For,
                "expected `in` after the loop variables",
                self.cursor.current_span(),
            ));
        }
        let in_token = self.cursor.advance();
        let iter = self.rest_from(in_token.span.end);
        if iter.is_empty() {
            return Err(malformed(TagKind::For, "missing iterable", in_token.span));
        }
        Ok(ForHeader { targets, iter })
    }

    /// `name(p, q=default)`
    pub(crate) fn parse_macro_header(&mut self) -> Result<MacroHeader, ParseError> {
        let name = self.cursor.expect_ident()?;
        self.cursor.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.cursor.check(&TokenKind::RParen) {
            let param = self.cursor.expect_ident()?;
            let default = if self.cursor.eat(&TokenKind::Assign) {
                let start = self.cursor.current_span().start;
                self.parse_expr()?;
                let end = self.cursor.previous_span().end;
                Some(self.cursor.slice(start, end).to_string())
            } else {
                None
            };
            params.push(MacroParam {
                name: param,
                default,
            });
            if !self.cursor.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.cursor.expect(&TokenKind::RParen)?;
        self.cursor.expect_end()?;
        Ok(MacroHeader { name, params })
    }

    /// Trimmed source text from `offset` to the end of the header.
    fn rest_from(&self, offset: u32) -> String {
        let src = self.cursor.src();
        src.get(offset as usize..).unwrap_or("").trim().to_string()
    }
}

/// Parse the argument of `autoescape`: empty or `true` enables, `false`
/// disables.
pub(crate) fn parse_autoescape_arg(arg: &str, span: deft_ir::Span) -> Result<bool, ParseError> {
    match arg.trim() {
        "" | "true" | "True" => Ok(true),
        "false" | "False" => Ok(false),
        _ => Err(malformed(
            TagKind::Autoescape,
            "expected `true` or `false`",
            span,
        )),
    }
}
