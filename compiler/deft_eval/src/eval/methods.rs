//! Built-in methods on lists, maps, namespaces and strings.
//!
//! Dispatch is by receiver type, then method name. Mutating methods change
//! the receiver in place on the heap; every alias of the container sees the
//! change.

use crate::builtins::{iter_items, CallArgs};
use crate::errors::{invalid_argument, no_such_method, wrong_arg_type, EvalError};
use crate::{Heap, HeapObject, ObjId, Value};

/// Methods that modify their receiver.
pub(crate) fn is_mutating(name: &str) -> bool {
    matches!(name, "append" | "extend" | "insert" | "pop" | "update")
}

/// Call `receiver.name(args)`.
pub(crate) fn call_method(
    heap: &mut Heap,
    receiver: &Value,
    name: &str,
    args: &CallArgs,
) -> Result<Value, EvalError> {
    match receiver {
        Value::List(id) => list_method(heap, *id, name, args),
        Value::Map(id) | Value::Namespace(id) => map_method(heap, *id, name, args),
        Value::Str(s) | Value::Markup(s) => str_method(heap, s, name, args),
        other => Err(no_such_method(name, other.type_name())),
    }
}

fn arg<'a>(args: &'a CallArgs, method: &str, index: usize, param: &str) -> Result<&'a Value, EvalError> {
    args.get(index, param)
        .ok_or_else(|| invalid_argument(method, format!("missing argument `{param}`")))
}

fn int_arg(method: &str, v: &Value) -> Result<i64, EvalError> {
    match v {
        Value::Int(n) => Ok(*n),
        other => Err(wrong_arg_type(method, "an int", other.type_name())),
    }
}

fn str_arg<'a>(method: &str, v: &'a Value) -> Result<&'a str, EvalError> {
    v.as_str()
        .ok_or_else(|| wrong_arg_type(method, "a string", v.type_name()))
}

/// Position for `insert`/`pop`: negative counts from the end, clamped.
fn clamp_index(index: i64, len: usize) -> usize {
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let i = if index < 0 { (index + len_i).max(0) } else { index.min(len_i) };
    usize::try_from(i).unwrap_or(len)
}

fn list_items_mut(heap: &mut Heap, id: ObjId) -> Option<&mut Vec<Value>> {
    match heap.get_mut(id) {
        HeapObject::List(items) => Some(items),
        HeapObject::Map(_) | HeapObject::Namespace(_) => None,
    }
}

fn list_method(heap: &mut Heap, id: ObjId, name: &str, args: &CallArgs) -> Result<Value, EvalError> {
    match name {
        "append" => {
            args.check(name, 1, &["item"])?;
            let item = arg(args, name, 0, "item")?.clone();
            if let Some(items) = list_items_mut(heap, id) {
                items.push(item);
            }
            Ok(Value::None)
        }
        "extend" => {
            args.check(name, 1, &["items"])?;
            let extra = iter_items(heap, arg(args, name, 0, "items")?, name)?;
            if let Some(items) = list_items_mut(heap, id) {
                items.extend(extra);
            }
            Ok(Value::None)
        }
        "insert" => {
            args.check(name, 2, &["index", "item"])?;
            let index = int_arg(name, arg(args, name, 0, "index")?)?;
            let item = arg(args, name, 1, "item")?.clone();
            if let Some(items) = list_items_mut(heap, id) {
                let at = clamp_index(index, items.len());
                items.insert(at, item);
            }
            Ok(Value::None)
        }
        "pop" => {
            args.check(name, 1, &["index"])?;
            let index = match args.get(0, "index") {
                Some(v) => int_arg(name, v)?,
                None => -1,
            };
            let Some(items) = list_items_mut(heap, id) else {
                return Ok(Value::None);
            };
            let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
            let resolved = if index < 0 { index + len } else { index };
            match usize::try_from(resolved) {
                Ok(i) if i < items.len() => Ok(items.remove(i)),
                _ => Err(EvalError::IndexOutOfRange(index)),
            }
        }
        "index" => {
            args.check(name, 1, &["item"])?;
            let needle = arg(args, name, 0, "item")?;
            let position = heap.items(id).iter().position(|v| heap.deep_eq(v, needle));
            match position {
                Some(i) => Ok(Value::Int(i64::try_from(i).unwrap_or(i64::MAX))),
                None => Err(invalid_argument(name, "item is not in the list")),
            }
        }
        "count" => {
            args.check(name, 1, &["item"])?;
            let needle = arg(args, name, 0, "item")?;
            let count = heap.items(id).iter().filter(|v| heap.deep_eq(v, needle)).count();
            Ok(Value::Int(i64::try_from(count).unwrap_or(i64::MAX)))
        }
        _ => Err(no_such_method(name, "list")),
    }
}

fn map_method(heap: &mut Heap, id: ObjId, name: &str, args: &CallArgs) -> Result<Value, EvalError> {
    let type_name = match heap.get(id) {
        HeapObject::Namespace(_) => "namespace",
        _ => "map",
    };
    match name {
        "get" => {
            args.check(name, 2, &["key", "default"])?;
            let key = heap.display(arg(args, name, 0, "key")?);
            let fallback = args.get(1, "default").cloned().unwrap_or_default();
            Ok(heap.entry(id, &key).cloned().unwrap_or(fallback))
        }
        "keys" => {
            args.check(name, 0, &[])?;
            let keys = heap
                .entries(id)
                .iter()
                .map(|(k, _)| Value::str(k.as_str()))
                .collect();
            Ok(heap.new_list(keys))
        }
        "values" => {
            args.check(name, 0, &[])?;
            let values = heap.entries(id).iter().map(|(_, v)| v.clone()).collect();
            Ok(heap.new_list(values))
        }
        "items" => {
            args.check(name, 0, &[])?;
            let entries = heap.entries(id).to_vec();
            let pairs = entries
                .into_iter()
                .map(|(k, v)| heap.new_list(vec![Value::str(k), v]))
                .collect();
            Ok(heap.new_list(pairs))
        }
        "update" => {
            args.check(name, 1, &[])?;
            let mut updates = match args.positional.first() {
                Some(Value::Map(other) | Value::Namespace(other)) => heap.entries(*other).to_vec(),
                Some(other) => return Err(wrong_arg_type(name, "a map", other.type_name())),
                None => Vec::new(),
            };
            updates.extend(args.named.iter().cloned());
            for (key, value) in updates {
                heap.set_entry(id, &key, value);
            }
            Ok(Value::None)
        }
        _ => Err(no_such_method(name, type_name)),
    }
}

fn str_method(heap: &mut Heap, s: &str, name: &str, args: &CallArgs) -> Result<Value, EvalError> {
    match name {
        "upper" => {
            args.check(name, 0, &[])?;
            Ok(Value::str(s.to_uppercase()))
        }
        "lower" => {
            args.check(name, 0, &[])?;
            Ok(Value::str(s.to_lowercase()))
        }
        "strip" => {
            args.check(name, 1, &["chars"])?;
            match args.get(0, "chars") {
                Some(chars) => {
                    let chars = str_arg(name, chars)?;
                    Ok(Value::str(s.trim_matches(|c| chars.contains(c))))
                }
                None => Ok(Value::str(s.trim())),
            }
        }
        "startswith" => {
            args.check(name, 1, &["prefix"])?;
            let prefix = str_arg(name, arg(args, name, 0, "prefix")?)?;
            Ok(Value::Bool(s.starts_with(prefix)))
        }
        "endswith" => {
            args.check(name, 1, &["suffix"])?;
            let suffix = str_arg(name, arg(args, name, 0, "suffix")?)?;
            Ok(Value::Bool(s.ends_with(suffix)))
        }
        "replace" => {
            args.check(name, 3, &["old", "new", "count"])?;
            let old = str_arg(name, arg(args, name, 0, "old")?)?;
            let new = str_arg(name, arg(args, name, 1, "new")?)?;
            let replaced = match args.get(2, "count") {
                Some(count) => {
                    let count = usize::try_from(int_arg(name, count)?.max(0)).unwrap_or(0);
                    s.replacen(old, new, count)
                }
                None => s.replace(old, new),
            };
            Ok(Value::str(replaced))
        }
        "split" => {
            args.check(name, 2, &["sep", "maxsplit"])?;
            let limit = match args.get(1, "maxsplit") {
                Some(n) => usize::try_from(int_arg(name, n)?).ok(),
                None => None,
            };
            let parts: Vec<Value> = match args.get(0, "sep") {
                Some(Value::None) | None => {
                    let words = s.split_whitespace();
                    match limit {
                        Some(n) => split_whitespace_limited(s, n),
                        None => words.map(Value::str).collect(),
                    }
                }
                Some(sep) => {
                    let sep = str_arg(name, sep)?;
                    if sep.is_empty() {
                        return Err(invalid_argument(name, "empty separator"));
                    }
                    match limit {
                        Some(n) => s.splitn(n + 1, sep).map(Value::str).collect(),
                        None => s.split(sep).map(Value::str).collect(),
                    }
                }
            };
            Ok(heap.new_list(parts))
        }
        _ => Err(no_such_method(name, "str")),
    }
}

/// Whitespace split producing at most `limit` splits; the remainder is kept
/// whole with its leading whitespace trimmed.
fn split_whitespace_limited(s: &str, limit: usize) -> Vec<Value> {
    let mut parts = Vec::new();
    let mut rest = s.trim_start();
    while parts.len() < limit && !rest.is_empty() {
        match rest.find(char::is_whitespace) {
            Some(end) => {
                parts.push(Value::str(&rest[..end]));
                rest = rest[end..].trim_start();
            }
            None => {
                parts.push(Value::str(rest));
                rest = "";
            }
        }
    }
    if !rest.is_empty() {
        parts.push(Value::str(rest));
    }
    parts
}
