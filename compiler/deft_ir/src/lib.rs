//! Deft IR - template and expression trees
//!
//! This crate contains the data structures shared by the deft crates:
//! - Spans for source locations
//! - Host data handed to the renderer (`Data`)
//! - Expression trees (`Expr`) with a canonical source printer
//! - Template node trees (`Node`, `Template`) with a source printer
//! - Tag kinds (`TagKind`)
//!
//! # Design Philosophy
//!
//! Every tree prints back to source. Partial rendering emits template text
//! for whatever it could not resolve, so the printers are load-bearing: the
//! text they produce must parse back to an equal tree.

pub mod ast;
mod data;
mod span;
mod tag;

pub use ast::{
    quote, write_quoted, Arg, BinaryOp, Expr, IfBranch, Literal, MacroDef, MacroParam, Node,
    SetTarget, Template, UnaryOp,
};
pub use data::Data;
pub use span::Span;
pub use tag::TagKind;
