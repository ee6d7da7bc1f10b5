//! Filter implementations.

use std::cmp::Ordering;
use std::fmt::Write;

use super::{Builtins, CallArgs};
use crate::errors::{invalid_argument, wrong_arg_type, EvalError};
use crate::value::escape_html;
use crate::{Heap, HeapObject, Value};

pub(super) fn register(b: &mut Builtins) {
    b.register_filter("upper", upper);
    b.register_filter("lower", lower);
    b.register_filter("title", title);
    b.register_filter("capitalize", capitalize);
    b.register_filter("trim", trim);
    b.register_filter("length", length);
    b.register_filter("count", length);
    b.register_filter("default", default);
    b.register_filter("d", default);
    b.register_filter("join", join);
    b.register_filter("first", first);
    b.register_filter("last", last);
    b.register_filter("abs", abs);
    b.register_filter("int", int);
    b.register_filter("float", float);
    b.register_filter("string", string);
    b.register_filter("list", list);
    b.register_filter("sort", sort);
    b.register_filter("reverse", reverse);
    b.register_filter("sum", sum);
    b.register_filter("round", round);
    b.register_filter("replace", replace);
    b.register_filter("escape", escape);
    b.register_filter("e", escape);
    b.register_filter("safe", safe);
    b.register_filter("tojson", tojson);
}

/// Apply a text transform, keeping markup as markup.
fn map_text(heap: &Heap, v: &Value, f: impl FnOnce(&str) -> String) -> Value {
    match v {
        Value::Markup(s) => Value::markup(f(s)),
        Value::Str(s) => Value::str(f(s)),
        other => Value::str(f(&heap.display(other))),
    }
}

fn upper(heap: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("upper", 0, &[])?;
    Ok(map_text(heap, v, str::to_uppercase))
}

fn lower(heap: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("lower", 0, &[])?;
    Ok(map_text(heap, v, str::to_lowercase))
}

fn title(heap: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("title", 0, &[])?;
    Ok(map_text(heap, v, |s| {
        let mut out = String::with_capacity(s.len());
        let mut at_word_start = true;
        for c in s.chars() {
            if c.is_alphanumeric() {
                if at_word_start {
                    out.extend(c.to_uppercase());
                } else {
                    out.extend(c.to_lowercase());
                }
                at_word_start = false;
            } else {
                out.push(c);
                at_word_start = true;
            }
        }
        out
    }))
}

fn capitalize(heap: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("capitalize", 0, &[])?;
    Ok(map_text(heap, v, |s| {
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
            None => String::new(),
        }
    }))
}

fn trim(heap: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("trim", 0, &[])?;
    Ok(map_text(heap, v, |s| s.trim().to_string()))
}

/// Length of a sized value.
fn len_of(heap: &Heap, v: &Value) -> Option<usize> {
    match v {
        Value::Str(s) | Value::Markup(s) => Some(s.chars().count()),
        Value::List(id) => Some(heap.items(*id).len()),
        Value::Map(id) | Value::Namespace(id) => Some(heap.entries(*id).len()),
        _ => None,
    }
}

fn length(heap: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("length", 0, &[])?;
    let n = len_of(heap, v).ok_or_else(|| wrong_arg_type("length", "a sized value", v.type_name()))?;
    Ok(Value::Int(i64::try_from(n).unwrap_or(i64::MAX)))
}

fn default(heap: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("default", 2, &["default_value", "boolean"])?;
    let fallback = args.get(0, "default_value").cloned().unwrap_or_else(|| Value::str(""));
    let boolean = args.get(1, "boolean").is_some_and(|b| heap.truthy(b));
    let missing = if boolean { !heap.truthy(v) } else { v.is_none() };
    Ok(if missing { fallback } else { v.clone() })
}

/// Items a filter iterates over: list elements, map keys, characters.
pub(crate) fn iter_items(heap: &Heap, v: &Value, name: &str) -> Result<Vec<Value>, EvalError> {
    match v {
        Value::List(id) => Ok(heap.items(*id).to_vec()),
        Value::Map(id) | Value::Namespace(id) => Ok(heap
            .entries(*id)
            .iter()
            .map(|(k, _)| Value::str(k.as_str()))
            .collect()),
        Value::Str(s) | Value::Markup(s) => {
            Ok(s.chars().map(|c| Value::str(c.to_string())).collect())
        }
        Value::None => Ok(Vec::new()),
        other => Err(wrong_arg_type(name, "an iterable", other.type_name())),
    }
}

fn join(heap: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("join", 1, &["d"])?;
    let sep = args.get(0, "d").map(|s| heap.display(s)).unwrap_or_default();
    let items = iter_items(heap, v, "join")?;
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(&sep);
        }
        heap.write_display(&mut out, item);
    }
    Ok(Value::str(out))
}

fn first(heap: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("first", 0, &[])?;
    Ok(iter_items(heap, v, "first")?.into_iter().next().unwrap_or_default())
}

fn last(heap: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("last", 0, &[])?;
    Ok(iter_items(heap, v, "last")?.pop().unwrap_or_default())
}

fn abs(_: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("abs", 0, &[])?;
    match v {
        Value::Int(n) => n
            .checked_abs()
            .map(Value::Int)
            .ok_or(EvalError::IntegerOverflow("abs")),
        Value::Float(x) => Ok(Value::Float(x.abs())),
        other => Err(wrong_arg_type("abs", "a number", other.type_name())),
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "float to int conversion truncates like the template language"
)]
fn int(_: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("int", 1, &["default"])?;
    let fallback = || args.get(0, "default").cloned().unwrap_or(Value::Int(0));
    Ok(match v {
        Value::Int(n) => Value::Int(*n),
        Value::Bool(b) => Value::Int(i64::from(*b)),
        Value::Float(x) if x.is_finite() => Value::Int(x.trunc() as i64),
        Value::Str(s) | Value::Markup(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(n) => Value::Int(n),
                Err(_) => match s.parse::<f64>() {
                    Ok(x) if x.is_finite() => Value::Int(x.trunc() as i64),
                    _ => fallback(),
                },
            }
        }
        _ => fallback(),
    })
}

fn float(_: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("float", 1, &["default"])?;
    let fallback = || args.get(0, "default").cloned().unwrap_or(Value::Float(0.0));
    Ok(match v {
        Value::Int(_) | Value::Float(_) => Value::Float(v.as_f64().unwrap_or_default()),
        Value::Bool(b) => Value::Float(if *b { 1.0 } else { 0.0 }),
        Value::Str(s) | Value::Markup(s) => s.trim().parse::<f64>().map_or_else(|_| fallback(), Value::Float),
        _ => fallback(),
    })
}

fn string(heap: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("string", 0, &[])?;
    Ok(match v {
        Value::Str(_) | Value::Markup(_) => v.clone(),
        other => Value::str(heap.display(other)),
    })
}

fn list(heap: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("list", 0, &[])?;
    let items = iter_items(heap, v, "list")?;
    Ok(heap.new_list(items))
}

fn sort(heap: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("sort", 1, &["reverse"])?;
    let reverse = args.get(0, "reverse").is_some_and(|r| heap.truthy(r));
    let mut items = iter_items(heap, v, "sort")?;
    let mut unordered = false;
    items.sort_by(|a, b| {
        heap.compare(a, b).unwrap_or_else(|| {
            unordered = true;
            Ordering::Equal
        })
    });
    if unordered {
        return Err(invalid_argument("sort", "values are not mutually comparable"));
    }
    if reverse {
        items.reverse();
    }
    Ok(heap.new_list(items))
}

fn reverse(heap: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("reverse", 0, &[])?;
    match v {
        Value::Str(s) => Ok(Value::str(s.chars().rev().collect::<String>())),
        Value::Markup(s) => Ok(Value::markup(s.chars().rev().collect::<String>())),
        _ => {
            let mut items = iter_items(heap, v, "reverse")?;
            items.reverse();
            Ok(heap.new_list(items))
        }
    }
}

fn sum(heap: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("sum", 1, &["start"])?;
    let mut total = args.get(0, "start").cloned().unwrap_or(Value::Int(0));
    for item in iter_items(heap, v, "sum")? {
        total = match (&total, &item) {
            (Value::Int(a), Value::Int(b)) => Value::Int(
                a.checked_add(*b)
                    .ok_or(EvalError::IntegerOverflow("sum"))?,
            ),
            _ => match (total.as_f64(), item.as_f64()) {
                (Some(a), Some(b)) => Value::Float(a + b),
                _ => return Err(wrong_arg_type("sum", "numbers", item.type_name())),
            },
        };
    }
    Ok(total)
}

fn round(heap: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("round", 2, &["precision", "method"])?;
    let x = v
        .as_f64()
        .ok_or_else(|| wrong_arg_type("round", "a number", v.type_name()))?;
    let precision = match args.get(0, "precision") {
        Some(Value::Int(p)) => i32::try_from(*p).map_err(|_| invalid_argument("round", "precision out of range"))?,
        Some(other) => return Err(wrong_arg_type("round", "an int", other.type_name())),
        None => 0,
    };
    let method = args
        .get(1, "method")
        .map_or_else(|| "common".to_string(), |m| heap.display(m));
    let scale = 10f64.powi(precision);
    let scaled = x * scale;
    let rounded = match method.as_str() {
        "common" => scaled.round(),
        "ceil" => scaled.ceil(),
        "floor" => scaled.floor(),
        other => {
            return Err(invalid_argument(
                "round",
                format!("method must be common, ceil or floor, not `{other}`"),
            ))
        }
    };
    Ok(Value::Float(rounded / scale))
}

fn replace(heap: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("replace", 3, &["old", "new", "count"])?;
    let (Some(old), Some(new)) = (args.get(0, "old"), args.get(1, "new")) else {
        return Err(invalid_argument("replace", "needs `old` and `new`"));
    };
    let (old, new) = (heap.display(old), heap.display(new));
    let count = match args.get(2, "count") {
        Some(Value::Int(n)) => usize::try_from(*n).ok(),
        _ => None,
    };
    Ok(map_text(heap, v, |s| match count {
        Some(n) => s.replacen(&old, &new, n),
        None => s.replace(&old, &new),
    }))
}

fn escape(heap: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("escape", 0, &[])?;
    Ok(match v {
        Value::Markup(_) => v.clone(),
        other => Value::markup(escape_html(&heap.display(other))),
    })
}

fn safe(heap: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("safe", 0, &[])?;
    Ok(match v {
        Value::Markup(_) => v.clone(),
        other => Value::markup(heap.display(other)),
    })
}

fn tojson(heap: &mut Heap, v: &Value, args: &CallArgs) -> Result<Value, EvalError> {
    args.check("tojson", 0, &[])?;
    let mut out = String::new();
    write_json(heap, &mut out, v, 0);
    Ok(Value::markup(out))
}

/// Nesting guard for self-containing values.
const MAX_JSON_DEPTH: usize = 64;

fn write_json(heap: &Heap, out: &mut String, v: &Value, depth: usize) {
    if depth > MAX_JSON_DEPTH {
        out.push_str("null");
        return;
    }
    match v {
        Value::None | Value::Macro(_) | Value::Function(_) => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int(n) => {
            let _ = write!(out, "{n}");
        }
        Value::Float(x) if x.is_finite() => {
            let _ = write!(out, "{x:?}");
        }
        Value::Float(_) => out.push_str("null"),
        Value::Str(s) | Value::Markup(s) => write_json_str(out, s),
        Value::List(id) | Value::Map(id) | Value::Namespace(id) => match heap.get(*id) {
            HeapObject::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_json(heap, out, item, depth + 1);
                }
                out.push(']');
            }
            HeapObject::Map(entries) | HeapObject::Namespace(entries) => {
                out.push('{');
                for (i, (k, item)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_json_str(out, k);
                    out.push_str(": ");
                    write_json(heap, out, item, depth + 1);
                }
                out.push('}');
            }
        },
    }
}

/// JSON string with HTML-sensitive characters escaped, so the result is safe
/// to embed in markup.
fn write_json_str(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\'' => out.push_str("\\u0027"),
            c if u32::from(c) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
