//! Operator Matching Helpers
//!
//! Helper methods for matching binary and unary operators during parsing.

use deft_ir::{BinaryOp, UnaryOp};
use deft_lexer::TokenKind;

use crate::Parser;

impl Parser<'_> {
    /// Match a comparison or membership operator at the cursor.
    ///
    /// `not in` spans two tokens; use `consume_comparison_op` to step over
    /// whichever form matched.
    pub(crate) fn match_comparison_op(&self) -> Option<BinaryOp> {
        match self.cursor.current_kind() {
            TokenKind::EqEq => Some(BinaryOp::Eq),
            TokenKind::NotEq => Some(BinaryOp::NotEq),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::LtEq => Some(BinaryOp::LtEq),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::GtEq => Some(BinaryOp::GtEq),
            TokenKind::Ident(word) if word == "in" => Some(BinaryOp::In),
            TokenKind::Ident(word) if word == "not" && self.cursor.peek_kind(1).is_ident("in") => {
                Some(BinaryOp::NotIn)
            }
            _ => None,
        }
    }

    pub(crate) fn consume_comparison_op(&mut self, op: BinaryOp) {
        self.cursor.advance();
        if op == BinaryOp::NotIn {
            self.cursor.advance();
        }
    }

    pub(crate) fn match_additive_op(&self) -> Option<BinaryOp> {
        match self.cursor.current_kind() {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            _ => None,
        }
    }

    pub(crate) fn match_multiplicative_op(&self) -> Option<BinaryOp> {
        match self.cursor.current_kind() {
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            TokenKind::SlashSlash => Some(BinaryOp::FloorDiv),
            TokenKind::Percent => Some(BinaryOp::Mod),
            _ => None,
        }
    }

    pub(crate) fn match_unary_op(&self) -> Option<UnaryOp> {
        match self.cursor.current_kind() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Pos),
            _ => None,
        }
    }
}
