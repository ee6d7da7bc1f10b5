//! Text forms of values.
//!
//! Two directions matter for partial rendering:
//!
//! - display: what `{{ value }}` writes into the output
//! - literal: an [`Expr`] that evaluates back to an equal value, which is how
//!   deferred bindings are reconstructed as template source
//!
//! Literal conversion fails for values with no source form (macros inside
//! containers, cycles, non-finite floats).

use std::fmt::Write;

use deft_ir::{write_quoted, Arg, Expr, Literal};
use rustc_hash::FxHashMap;

use super::heap::Path;
use super::{Heap, HeapObject, ObjId, Value};

impl Heap {
    /// Output text of a value.
    pub fn display(&self, value: &Value) -> String {
        let mut out = String::new();
        self.write_display(&mut out, value);
        out
    }

    pub fn write_display(&self, out: &mut String, value: &Value) {
        match value {
            Value::None => {}
            Value::Str(s) | Value::Markup(s) => out.push_str(s),
            _ => self.write_repr(out, value, &mut Path::new()),
        }
    }

    fn write_repr(&self, out: &mut String, value: &Value, path: &mut Path) {
        match value {
            Value::None => out.push_str("none"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Int(n) => {
                let _ = write!(out, "{n}");
            }
            Value::Float(x) => {
                let _ = write!(out, "{x:?}");
            }
            Value::Str(s) | Value::Markup(s) => {
                let _ = write_quoted(out, s);
            }
            Value::Macro(def) => {
                let _ = write!(out, "<macro {}>", def.name);
            }
            Value::Function(name) => {
                let _ = write!(out, "<function {name}>");
            }
            Value::List(id) | Value::Map(id) | Value::Namespace(id) => {
                if path.contains(id) {
                    out.push_str(if matches!(value, Value::List(_)) {
                        "[...]"
                    } else {
                        "{...}"
                    });
                    return;
                }
                path.push(*id);
                match self.get(*id) {
                    HeapObject::List(items) => {
                        out.push('[');
                        for (i, item) in items.iter().enumerate() {
                            if i > 0 {
                                out.push_str(", ");
                            }
                            self.write_repr(out, item, path);
                        }
                        out.push(']');
                    }
                    HeapObject::Map(entries) => self.write_entries(out, entries, path),
                    HeapObject::Namespace(entries) => {
                        out.push_str("namespace(");
                        self.write_entries(out, entries, path);
                        out.push(')');
                    }
                }
                path.pop();
            }
        }
    }

    fn write_entries(&self, out: &mut String, entries: &[(String, Value)], path: &mut Path) {
        out.push('{');
        for (i, (k, v)) in entries.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write_quoted(out, k);
            out.push_str(": ");
            self.write_repr(out, v, path);
        }
        out.push('}');
    }

    /// Literal expression for a value, if it has one.
    pub fn to_expr(&self, value: &Value) -> Option<Expr> {
        self.to_expr_inner(value, &mut Path::new(), &FxHashMap::default())
    }

    /// Literal expression in which nested containers listed in `names` are
    /// written as references to those names.
    pub fn to_expr_naming(&self, value: &Value, names: &FxHashMap<ObjId, String>) -> Option<Expr> {
        self.to_expr_inner(value, &mut Path::new(), names)
    }

    fn to_expr_inner(
        &self,
        value: &Value,
        path: &mut Path,
        names: &FxHashMap<ObjId, String>,
    ) -> Option<Expr> {
        let lit = match value {
            Value::None => Literal::None,
            Value::Bool(b) => Literal::Bool(*b),
            Value::Int(n) => Literal::Int(*n),
            Value::Float(x) if x.is_finite() => Literal::Float(*x),
            Value::Float(_) | Value::Macro(_) => return None,
            Value::Str(s) => Literal::Str(s.to_string()),
            Value::Markup(s) => {
                return Some(Expr::Filter {
                    target: Box::new(Expr::str(s.to_string())),
                    name: "safe".into(),
                    args: vec![],
                })
            }
            Value::Function(name) => return Some(Expr::name(*name)),
            Value::List(id) | Value::Map(id) | Value::Namespace(id) => {
                if let (false, Some(name)) = (path.is_empty(), names.get(id)) {
                    return Some(Expr::name(name.as_str()));
                }
                if path.contains(id) {
                    return None;
                }
                path.push(*id);
                let expr = match self.get(*id) {
                    HeapObject::List(items) => items
                        .iter()
                        .map(|item| self.to_expr_inner(item, path, names))
                        .collect::<Option<Vec<_>>>()
                        .map(Expr::List),
                    HeapObject::Map(entries) => self.entries_expr(entries, path, names),
                    HeapObject::Namespace(entries) => self
                        .entries_expr(entries, path, names)
                        .map(|map| Expr::call(Expr::name("namespace"), vec![Arg::positional(map)])),
                };
                path.pop();
                return expr;
            }
        };
        Some(Expr::Literal(lit))
    }

    fn entries_expr(
        &self,
        entries: &[(String, Value)],
        path: &mut Path,
        names: &FxHashMap<ObjId, String>,
    ) -> Option<Expr> {
        entries
            .iter()
            .map(|(k, v)| Some((Expr::str(k.as_str()), self.to_expr_inner(v, path, names)?)))
            .collect::<Option<Vec<_>>>()
            .map(Expr::Map)
    }

    /// Literal source text for a value.
    pub fn literal(&self, value: &Value) -> Option<String> {
        self.to_expr(value).map(|e| e.to_string())
    }

    /// Build a value from a literal expression (the inverse of [`to_expr`]).
    ///
    /// Returns `None` for anything that is not a literal form.
    ///
    /// [`to_expr`]: Heap::to_expr
    pub fn from_literal(&mut self, expr: &Expr) -> Option<Value> {
        match expr {
            Expr::Literal(lit) => Some(match lit {
                Literal::None => Value::None,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(n) => Value::Int(*n),
                Literal::Float(x) => Value::Float(*x),
                Literal::Str(s) => Value::str(s.as_str()),
            }),
            Expr::List(items) => {
                let items = items
                    .iter()
                    .map(|item| self.from_literal(item))
                    .collect::<Option<Vec<_>>>()?;
                Some(self.new_list(items))
            }
            Expr::Map(entries) => {
                let entries = self.literal_entries(entries)?;
                Some(self.new_map(entries))
            }
            Expr::Filter { target, name, args } if name == "safe" && args.is_empty() => {
                match target.as_ref() {
                    Expr::Literal(Literal::Str(s)) => Some(Value::markup(s.as_str())),
                    _ => None,
                }
            }
            Expr::Call { callee, args } if matches!(callee.as_ref(), Expr::Name(n) if n == "namespace") => {
                match args.as_slice() {
                    [Arg {
                        name: None,
                        value: Expr::Map(entries),
                    }] => {
                        let entries = self.literal_entries(entries)?;
                        Some(self.new_namespace(entries))
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn literal_entries(&mut self, entries: &[(Expr, Expr)]) -> Option<Vec<(String, Value)>> {
        entries
            .iter()
            .map(|(k, v)| match k {
                Expr::Literal(Literal::Str(key)) => Some((key.clone(), self.from_literal(v)?)),
                _ => None,
            })
            .collect()
    }
}

/// HTML-escape text for autoescaped output.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
