//! Test implementations (`x is name`).
//!
//! `defined` and `undefined` registered here only see the value. The
//! evaluator answers them itself when the target is a bare name, since only
//! the scope chain knows whether a name is bound.

use super::{Builtins, CallArgs};
use crate::errors::{wrong_arg_type, EvalError};
use crate::{Heap, Value};

pub(super) fn register(b: &mut Builtins) {
    b.register_test("defined", |_, v, _| Ok(!v.is_none()));
    b.register_test("undefined", |_, v, _| Ok(v.is_none()));
    b.register_test("none", |_, v, _| Ok(v.is_none()));
    b.register_test("number", |_, v, _| Ok(matches!(v, Value::Int(_) | Value::Float(_))));
    b.register_test("string", |_, v, _| Ok(matches!(v, Value::Str(_) | Value::Markup(_))));
    b.register_test("mapping", |_, v, _| Ok(matches!(v, Value::Map(_) | Value::Namespace(_))));
    b.register_test("sequence", |_, v, _| {
        Ok(matches!(v, Value::List(_) | Value::Str(_) | Value::Markup(_)))
    });
    b.register_test("even", even);
    b.register_test("odd", odd);
    b.register_test("divisibleby", divisibleby);
}

fn int_arg(name: &str, v: &Value) -> Result<i64, EvalError> {
    match v {
        Value::Int(n) => Ok(*n),
        other => Err(wrong_arg_type(name, "an int", other.type_name())),
    }
}

fn even(_: &Heap, v: &Value, args: &CallArgs) -> Result<bool, EvalError> {
    args.check("even", 0, &[])?;
    Ok(int_arg("even", v)? % 2 == 0)
}

fn odd(_: &Heap, v: &Value, args: &CallArgs) -> Result<bool, EvalError> {
    args.check("odd", 0, &[])?;
    Ok(int_arg("odd", v)? % 2 != 0)
}

fn divisibleby(_: &Heap, v: &Value, args: &CallArgs) -> Result<bool, EvalError> {
    args.check("divisibleby", 1, &["num"])?;
    let divisor = match args.get(0, "num") {
        Some(d) => int_arg("divisibleby", d)?,
        None => return Err(wrong_arg_type("divisibleby", "an int", "none")),
    };
    if divisor == 0 {
        return Err(EvalError::DivisionByZero);
    }
    Ok(int_arg("divisibleby", v)? % divisor == 0)
}
