//! Expression and template trees.
//!
//! # Module Structure
//!
//! - `expr`: expression nodes, literals, call arguments
//! - `operators`: binary and unary operators with precedence
//! - `node`: template nodes (text, output, tags) and `Template`

mod expr;
mod node;
mod operators;

pub use expr::{
    quote, write_quoted, Arg, Expr, Literal, PREC_ATOM, PREC_COMPARE, PREC_COND, PREC_FILTER,
};
pub use node::{write_nodes, IfBranch, MacroDef, MacroParam, Node, SetTarget, Template};
pub use operators::{BinaryOp, UnaryOp};

#[cfg(test)]
mod tests;
