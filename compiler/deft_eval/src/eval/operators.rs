//! Binary and unary operators on concrete values.
//!
//! Direct enum dispatch over the operand pair. Integer arithmetic is checked;
//! overflow is an evaluation error rather than a wrap. Division and modulo
//! follow floored semantics (`-7 // 2 == -4`, `-7 % 2 == 1`).

use std::cmp::Ordering;

use deft_ir::{BinaryOp, UnaryOp};

use crate::errors::{binary_type_mismatch, unary_type_mismatch, EvalError};
use crate::{Heap, HeapObject, Value};

/// Longest string or list repetition will build.
const MAX_REPEAT: usize = 1 << 20;

#[inline]
fn checked_arith(result: Option<i64>, op_name: &'static str) -> Result<Value, EvalError> {
    result.map(Value::Int).ok_or(EvalError::IntegerOverflow(op_name))
}

fn mismatch(op: BinaryOp, left: &Value, right: &Value) -> EvalError {
    binary_type_mismatch(op.as_symbol(), left.type_name(), right.type_name())
}

/// Evaluate `left op right`.
///
/// `and`/`or` are normally short-circuited by the evaluator; here they only
/// pick an operand.
pub(crate) fn binary(
    heap: &mut Heap,
    op: BinaryOp,
    left: &Value,
    right: &Value,
) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add => add(heap, left, right),
        BinaryOp::Sub | BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod | BinaryOp::Pow => {
            arith(op, left, right)
        }
        BinaryOp::Mul => mul(heap, left, right),
        BinaryOp::Concat => {
            let mut text = heap.display(left);
            heap.write_display(&mut text, right);
            Ok(Value::str(text))
        }
        BinaryOp::Eq => Ok(Value::Bool(heap.deep_eq(left, right))),
        BinaryOp::NotEq => Ok(Value::Bool(!heap.deep_eq(left, right))),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = heap
                .compare(left, right)
                .ok_or_else(|| mismatch(op, left, right))?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::LtEq => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::In => contains(heap, op, left, right).map(Value::Bool),
        BinaryOp::NotIn => contains(heap, op, left, right).map(|found| Value::Bool(!found)),
        BinaryOp::And => Ok(if heap.truthy(left) {
            right.clone()
        } else {
            left.clone()
        }),
        BinaryOp::Or => Ok(if heap.truthy(left) {
            left.clone()
        } else {
            right.clone()
        }),
    }
}

fn add(heap: &mut Heap, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Str(a) | Value::Markup(a), Value::Str(b) | Value::Markup(b)) => {
            Ok(Value::str(format!("{a}{b}")))
        }
        (Value::List(a), Value::List(b)) => {
            let mut items = heap.items(*a).to_vec();
            items.extend_from_slice(heap.items(*b));
            Ok(heap.new_list(items))
        }
        _ => arith(BinaryOp::Add, left, right),
    }
}

fn mul(heap: &mut Heap, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
            let count = repeat_count(*n, s.len())?;
            Ok(Value::str(s.repeat(count)))
        }
        (Value::List(id), Value::Int(n)) | (Value::Int(n), Value::List(id)) => {
            let items = heap.items(*id).to_vec();
            let count = repeat_count(*n, items.len())?;
            let repeated = items
                .iter()
                .cycle()
                .take(items.len() * count)
                .cloned()
                .collect();
            Ok(heap.new_list(repeated))
        }
        _ => arith(BinaryOp::Mul, left, right),
    }
}

fn repeat_count(n: i64, unit: usize) -> Result<usize, EvalError> {
    let count = usize::try_from(n.max(0)).unwrap_or(usize::MAX);
    if unit.saturating_mul(count) > MAX_REPEAT {
        return Err(EvalError::IntegerOverflow("*"));
    }
    Ok(count)
}

/// Numeric operators. Two ints stay integral except for `/`; any float
/// operand promotes both sides.
fn arith(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_arith(op, *a, *b),
        (Value::Bool(_), _) | (_, Value::Bool(_)) => Err(mismatch(op, left, right)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => float_arith(op, a, b),
            _ => Err(mismatch(op, left, right)),
        },
    }
}

fn int_arith(op: BinaryOp, a: i64, b: i64) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add => checked_arith(a.checked_add(b), "+"),
        BinaryOp::Sub => checked_arith(a.checked_sub(b), "-"),
        BinaryOp::Mul => checked_arith(a.checked_mul(b), "*"),
        BinaryOp::Div => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            #[expect(clippy::cast_precision_loss, reason = "true division yields a float")]
            let quotient = a as f64 / b as f64;
            Ok(Value::Float(quotient))
        }
        BinaryOp::FloorDiv => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            let q = a.checked_div(b).ok_or(EvalError::IntegerOverflow("//"))?;
            let floored = if a % b != 0 && ((a < 0) != (b < 0)) { q - 1 } else { q };
            Ok(Value::Int(floored))
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            let r = a.checked_rem(b).ok_or(EvalError::IntegerOverflow("%"))?;
            Ok(Value::Int(if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r }))
        }
        BinaryOp::Pow => match u32::try_from(b) {
            Ok(exp) => checked_arith(a.checked_pow(exp), "**"),
            Err(_) if b < 0 => match (Value::Int(a).as_f64(), Value::Int(b).as_f64()) {
                (Some(base), Some(exp)) => float_arith(op, base, exp),
                _ => Err(EvalError::IntegerOverflow("**")),
            },
            Err(_) => Err(EvalError::IntegerOverflow("**")),
        },
        _ => Err(binary_type_mismatch(op.as_symbol(), "int", "int")),
    }
}

fn float_arith(op: BinaryOp, a: f64, b: f64) -> Result<Value, EvalError> {
    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod if b == 0.0 => {
            return Err(EvalError::DivisionByZero)
        }
        BinaryOp::Div => a / b,
        BinaryOp::FloorDiv => (a / b).floor(),
        BinaryOp::Mod => a - b * (a / b).floor(),
        BinaryOp::Pow => a.powf(b),
        _ => return Err(binary_type_mismatch(op.as_symbol(), "float", "float")),
    };
    Ok(Value::Float(value))
}

/// `needle in haystack`.
fn contains(heap: &Heap, op: BinaryOp, needle: &Value, haystack: &Value) -> Result<bool, EvalError> {
    match haystack {
        Value::Str(h) | Value::Markup(h) => match needle {
            Value::Str(n) | Value::Markup(n) => Ok(h.contains(&**n)),
            _ => Err(mismatch(op, needle, haystack)),
        },
        Value::List(id) => Ok(heap
            .items(*id)
            .iter()
            .any(|item| heap.deep_eq(item, needle))),
        Value::Map(id) | Value::Namespace(id) => match heap.get(*id) {
            HeapObject::Map(entries) | HeapObject::Namespace(entries) => {
                let key = needle.as_str();
                Ok(key.is_some_and(|key| entries.iter().any(|(k, _)| k == key)))
            }
            HeapObject::List(_) => Ok(false),
        },
        _ => Err(mismatch(op, needle, haystack)),
    }
}

/// Evaluate a unary operator.
pub(crate) fn unary(heap: &Heap, op: UnaryOp, value: &Value) -> Result<Value, EvalError> {
    match (op, value) {
        (UnaryOp::Not, v) => Ok(Value::Bool(!heap.truthy(v))),
        (UnaryOp::Neg, Value::Int(n)) => n.checked_neg().map(Value::Int).ok_or(EvalError::IntegerOverflow("-")),
        (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOp::Pos, Value::Int(_) | Value::Float(_)) => Ok(value.clone()),
        (UnaryOp::Neg | UnaryOp::Pos, other) => {
            Err(unary_type_mismatch(op.as_symbol(), other.type_name()))
        }
    }
}
