//! Parser tests.
//!
//! - `expr`: expression grammar, precedence and error cases
//! - `template`: block structure and tag headers
//! - `roundtrip`: printed expressions parse back to the same tree

mod expr;
mod template;
