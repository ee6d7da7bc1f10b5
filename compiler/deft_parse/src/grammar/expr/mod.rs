//! Expression parsing.
//!
//! This module extends Parser with methods for parsing expressions,
//! from the conditional expression down to primaries.
//!
//! # Module Structure
//!
//! - `mod.rs`: Entry point (`parse_expr`) and the precedence chain
//! - `operators.rs`: Operator matching helpers
//! - `primary.rs`: Literals, names, list and map displays, parentheses
//! - `postfix.rs`: Attribute, index, call, filter

mod operators;
mod postfix;
mod primary;

use deft_ir::{BinaryOp, Expr, Literal, UnaryOp};
use deft_lexer::TokenKind;
use deft_stack::ensure_sufficient_stack;

use crate::{ParseError, Parser};

impl Parser<'_> {
    /// Parse an expression.
    ///
    /// Uses `ensure_sufficient_stack` to prevent stack overflow
    /// on deeply nested expressions.
    pub(crate) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        ensure_sufficient_stack(|| self.parse_conditional())
    }

    /// Parse `then if cond else otherwise` (lowest precedence).
    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let then = self.parse_binary_or()?;
        if !self.cursor.eat_ident("if") {
            return Ok(then);
        }
        let cond = self.parse_binary_or()?;
        let otherwise = if self.cursor.eat_ident("else") {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        Ok(Expr::Cond {
            then: Box::new(then),
            cond: Box::new(cond),
            otherwise,
        })
    }

    /// Parse `or`.
    fn parse_binary_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_binary_and()?;
        while self.cursor.eat_ident("or") {
            let right = self.parse_binary_and()?;
            left = Expr::binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    /// Parse `and`.
    fn parse_binary_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        while self.cursor.eat_ident("and") {
            let right = self.parse_not()?;
            left = Expr::binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    /// Parse prefix `not`.
    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.cursor.eat_ident("not") {
            let operand = ensure_sufficient_stack(|| self.parse_not())?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    /// Parse comparisons, membership and `is` tests.
    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_concat()?;
        loop {
            if self.cursor.check_ident("is") {
                left = self.parse_test(left)?;
            } else if let Some(op) = self.match_comparison_op() {
                self.consume_comparison_op(op);
                let right = self.parse_concat()?;
                left = Expr::binary(op, left, right);
            } else {
                return Ok(left);
            }
        }
    }

    /// Parse `target is [not] name[(args)]`; the cursor is on `is`.
    fn parse_test(&mut self, target: Expr) -> Result<Expr, ParseError> {
        self.cursor.advance();
        let negated = self.cursor.eat_ident("not");
        let name = self.cursor.expect_ident()?;
        let args = if self.cursor.check(&TokenKind::LParen) {
            self.parse_call_args()?
        } else {
            Vec::new()
        };
        Ok(Expr::Test {
            target: Box::new(target),
            name,
            args,
            negated,
        })
    }

    /// Parse `~` (string concatenation).
    fn parse_concat(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        while self.cursor.eat(&TokenKind::Tilde) {
            let right = self.parse_additive()?;
            left = Expr::binary(BinaryOp::Concat, left, right);
        }
        Ok(left)
    }

    /// Parse `+` and `-`.
    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        while let Some(op) = self.match_additive_op() {
            self.cursor.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    /// Parse `*`, `/`, `//` and `%`.
    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_power()?;
        while let Some(op) = self.match_multiplicative_op() {
            self.cursor.advance();
            let right = self.parse_power()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    /// Parse `**`.
    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        while self.cursor.eat(&TokenKind::StarStar) {
            let right = self.parse_unary()?;
            left = Expr::binary(BinaryOp::Pow, left, right);
        }
        Ok(left)
    }

    /// Parse prefix `-` and `+`.
    ///
    /// Negating a numeric literal folds into the literal, so `-3` is one
    /// `Literal` node and prints back as `-3`.
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let Some(op) = self.match_unary_op() else {
            return self.parse_filtered();
        };
        self.cursor.advance();
        let operand = ensure_sufficient_stack(|| self.parse_unary())?;
        Ok(match (op, operand) {
            (UnaryOp::Neg, Expr::Literal(Literal::Int(n))) if n.checked_neg().is_some() => {
                Expr::Literal(Literal::Int(-n))
            }
            (UnaryOp::Neg, Expr::Literal(Literal::Float(x))) => Expr::Literal(Literal::Float(-x)),
            (op, operand) => Expr::Unary {
                op,
                operand: Box::new(operand),
            },
        })
    }
}
