//! Deft parser.
//!
//! - [`parse_expr`] parses one expression into an [`Expr`] tree.
//! - [`parse_expr_list`] parses a comma-separated expression list (the
//!   right-hand side of a multi-target `set`).
//! - [`parse_template`] builds the node tree of a whole template.
//!
//! Template parsing validates structure (block nesting, tag headers) but
//! keeps tag expressions as source text. The evaluator parses them on use
//! through [`parse_expr`], so one malformed expression costs a warning
//! rather than the whole template.

mod cursor;
mod error;
mod grammar;

use deft_ir::Expr;
use deft_lexer::{tokenize, TokenKind};

pub use cursor::Cursor;
pub use error::{ParseError, ParseErrorKind};
pub use grammar::parse_template;

/// Expression parser over one token stream.
pub struct Parser<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Parser<'a> {
    /// Tokenize `src` and position the parser at its first token.
    pub fn new(src: &'a str) -> Result<Self, ParseError> {
        let tokens = tokenize(src)?;
        Ok(Parser {
            cursor: Cursor::new(tokens, src),
        })
    }
}

/// Parse a complete expression.
pub fn parse_expr(src: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(src)?;
    let expr = parser.parse_expr()?;
    parser.cursor.expect_end()?;
    Ok(expr)
}

/// Parse `e1, e2, ...` into its elements.
///
/// A single expression without commas yields a one-element list.
pub fn parse_expr_list(src: &str) -> Result<Vec<Expr>, ParseError> {
    let mut parser = Parser::new(src)?;
    let mut items = vec![parser.parse_expr()?];
    while parser.cursor.eat(&TokenKind::Comma) {
        if parser.cursor.is_at_end() {
            break;
        }
        items.push(parser.parse_expr()?);
    }
    parser.cursor.expect_end()?;
    Ok(items)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
