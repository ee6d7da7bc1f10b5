//! Runtime values.
//!
//! Primitives are stored inline. Containers (lists, maps, namespaces) live in
//! the render call's [`Heap`] and values hold an [`ObjId`] into it, so two
//! bindings alias exactly when they hold the same id. That identity is what
//! the alias resolver tracks.
//!
//! # Module Structure
//!
//! - `heap`: the per-call arena, host data import, fingerprints, equality
//! - `repr`: display text, literal expressions and back

mod heap;
mod repr;

use std::rc::Rc;
use std::sync::Arc;

use deft_ir::MacroDef;

pub use heap::{Heap, HeapObject};
pub use repr::escape_html;

/// Index of a container in the render call's heap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjId(u32);

impl ObjId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A runtime value.
///
/// `PartialEq` is shallow: containers compare by identity. Use
/// [`Heap::deep_eq`] for template-level equality.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    /// Text already safe for HTML output.
    Markup(Rc<str>),
    List(ObjId),
    Map(ObjId),
    /// Mutable attribute bag created by `namespace()`.
    Namespace(ObjId),
    Macro(Arc<MacroDef>),
    /// A builtin function, by registry name.
    Function(&'static str),
}

impl Value {
    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn markup(s: impl Into<Rc<str>>) -> Self {
        Value::Markup(s.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Markup(_) => "markup",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Namespace(_) => "namespace",
            Value::Macro(_) => "macro",
            Value::Function(_) => "function",
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Heap id for containers.
    #[inline]
    pub fn object(&self) -> Option<ObjId> {
        match self {
            Value::List(id) | Value::Map(id) | Value::Namespace(id) => Some(*id),
            _ => None,
        }
    }

    #[inline]
    pub fn is_container(&self) -> bool {
        self.object().is_some()
    }

    /// Text of a string or markup value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Markup(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view; booleans do not count as numbers.
    #[expect(
        clippy::cast_precision_loss,
        reason = "mixed arithmetic follows float semantics past 2^53"
    )]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
