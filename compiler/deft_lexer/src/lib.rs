//! Deft lexer.
//!
//! Two layers:
//! - [`segment`] splits template source into text, expression, statement
//!   and raw segments, applying whitespace control and dropping comments.
//! - [`tokenize`] turns the inner text of one expression or tag into
//!   tokens for the parser.
//!
//! Both run over the same byte [`Cursor`].

mod cursor;
mod error;
mod scanner;
mod segment;
mod token;

pub use cursor::Cursor;
pub use error::{LexError, LexErrorKind};
pub use scanner::{is_ident_continue, is_ident_start, tokenize};
pub use segment::{segment, Segment, SegmentKind};
pub use token::{Token, TokenKind};
