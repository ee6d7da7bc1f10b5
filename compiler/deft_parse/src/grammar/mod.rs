//! Grammar productions, split by construct.
//!
//! - `expr/`: the expression precedence chain
//! - `tags.rs`: tag headers (`set`, `for`, `macro`, `autoescape`)
//! - `template.rs`: block structure of a whole template

mod expr;
mod tags;
mod template;

pub use template::parse_template;
