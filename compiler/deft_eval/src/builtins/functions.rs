//! Free functions.

use super::{Builtins, CallArgs};
use crate::errors::{invalid_argument, wrong_arg_count, wrong_arg_type, EvalError};
use crate::{Heap, Value};

/// Longest list `range` will build.
const MAX_RANGE: i64 = 100_000;

pub(super) fn register(b: &mut Builtins) {
    b.register_function("range", range);
    b.register_function("namespace", namespace);
    b.register_function("dict", dict);
}

fn range(heap: &mut Heap, args: &CallArgs) -> Result<Value, EvalError> {
    if !args.named.is_empty() {
        return Err(invalid_argument("range", "takes no named arguments"));
    }
    let ints = args
        .positional
        .iter()
        .map(|v| match v {
            Value::Int(n) => Ok(*n),
            other => Err(wrong_arg_type("range", "an int", other.type_name())),
        })
        .collect::<Result<Vec<_>, _>>()?;
    let (start, stop, step) = match ints.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => return Err(wrong_arg_count("range", "1 to 3", ints.len())),
    };
    if step == 0 {
        return Err(invalid_argument("range", "step must not be zero"));
    }
    let mut items = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        if i64::try_from(items.len()).unwrap_or(i64::MAX) >= MAX_RANGE {
            return Err(invalid_argument("range", format!("longer than {MAX_RANGE} items")));
        }
        items.push(Value::Int(i));
        match i.checked_add(step) {
            Some(next) => i = next,
            None => break,
        }
    }
    Ok(heap.new_list(items))
}

/// Entries from an optional positional map plus named arguments.
fn entries(heap: &Heap, name: &str, args: &CallArgs) -> Result<Vec<(String, Value)>, EvalError> {
    let mut entries = match args.positional.as_slice() {
        [] => Vec::new(),
        [Value::Map(id) | Value::Namespace(id)] => heap.entries(*id).to_vec(),
        [other] => return Err(wrong_arg_type(name, "a map", other.type_name())),
        more => return Err(wrong_arg_count(name, "at most 1", more.len())),
    };
    for (k, v) in &args.named {
        match entries.iter_mut().find(|(existing, _)| existing == k) {
            Some(slot) => slot.1 = v.clone(),
            None => entries.push((k.clone(), v.clone())),
        }
    }
    Ok(entries)
}

fn namespace(heap: &mut Heap, args: &CallArgs) -> Result<Value, EvalError> {
    let entries = entries(heap, "namespace", args)?;
    Ok(heap.new_namespace(entries))
}

fn dict(heap: &mut Heap, args: &CallArgs) -> Result<Value, EvalError> {
    let entries = entries(heap, "dict", args)?;
    Ok(heap.new_map(entries))
}
