use deft_ir::Data;
use pretty_assertions::assert_eq;

use super::*;

fn filter(heap: &mut Heap, name: &str, v: &Value, args: Vec<Value>) -> Result<Value, EvalError> {
    let f = Builtins::standard().filter(name).unwrap();
    f(heap, v, &CallArgs::positional(args))
}

fn shown(heap: &Heap, v: &Value) -> String {
    heap.display(v)
}

#[test]
fn test_registry_lookup() {
    let builtins = Builtins::standard();
    assert!(builtins.filter("upper").is_some());
    assert!(builtins.filter("nope").is_none());
    assert!(builtins.test("divisibleby").is_some());
    assert_eq!(builtins.function("range").map(|(n, _)| n), Some("range"));
}

#[test]
fn test_text_filters() {
    let mut heap = Heap::new();
    let v = Value::str("hello wORLD");
    let upper = filter(&mut heap, "upper", &v, vec![]).unwrap();
    assert_eq!(shown(&heap, &upper), "HELLO WORLD");
    let title = filter(&mut heap, "title", &v, vec![]).unwrap();
    assert_eq!(shown(&heap, &title), "Hello World");
    let cap = filter(&mut heap, "capitalize", &v, vec![]).unwrap();
    assert_eq!(shown(&heap, &cap), "Hello world");
    let trimmed = filter(&mut heap, "trim", &Value::str("  x "), vec![]).unwrap();
    assert_eq!(shown(&heap, &trimmed), "x");
}

#[test]
fn test_default_filter() {
    let mut heap = Heap::new();
    let fallback = filter(&mut heap, "d", &Value::None, vec![Value::Int(3)]).unwrap();
    assert_eq!(fallback, Value::Int(3));
    let kept = filter(&mut heap, "default", &Value::str(""), vec![Value::Int(3)]).unwrap();
    assert_eq!(kept, Value::str(""));
    let boolean = filter(
        &mut heap,
        "default",
        &Value::str(""),
        vec![Value::Int(3), Value::Bool(true)],
    )
    .unwrap();
    assert_eq!(boolean, Value::Int(3));
}

#[test]
fn test_collection_filters() {
    let mut heap = Heap::new();
    let list = heap.import(&Data::list([3, 1, 2]));
    let sorted = filter(&mut heap, "sort", &list, vec![]).unwrap();
    assert_eq!(shown(&heap, &sorted), "[1, 2, 3]");
    let joined = filter(&mut heap, "join", &sorted, vec![Value::str("-")]).unwrap();
    assert_eq!(shown(&heap, &joined), "1-2-3");
    assert_eq!(filter(&mut heap, "sum", &list, vec![]).unwrap(), Value::Int(6));
    assert_eq!(filter(&mut heap, "length", &list, vec![]).unwrap(), Value::Int(3));
    assert_eq!(filter(&mut heap, "first", &list, vec![]).unwrap(), Value::Int(3));
    assert_eq!(filter(&mut heap, "last", &list, vec![]).unwrap(), Value::Int(2));
    let reversed = filter(&mut heap, "reverse", &list, vec![]).unwrap();
    assert_eq!(shown(&heap, &reversed), "[2, 1, 3]");
    // Sorting copies: the source list is untouched.
    assert_eq!(shown(&heap, &list), "[3, 1, 2]");
}

#[test]
fn test_numeric_filters() {
    let mut heap = Heap::new();
    assert_eq!(filter(&mut heap, "int", &Value::str("42"), vec![]).unwrap(), Value::Int(42));
    assert_eq!(filter(&mut heap, "int", &Value::str("4.7"), vec![]).unwrap(), Value::Int(4));
    assert_eq!(filter(&mut heap, "int", &Value::str("x"), vec![]).unwrap(), Value::Int(0));
    assert_eq!(
        filter(&mut heap, "float", &Value::Int(2), vec![]).unwrap(),
        Value::Float(2.0)
    );
    assert_eq!(filter(&mut heap, "abs", &Value::Int(-2), vec![]).unwrap(), Value::Int(2));
    assert_eq!(
        filter(&mut heap, "round", &Value::Float(2.567), vec![Value::Int(1)]).unwrap(),
        Value::Float(2.6)
    );
    assert_eq!(
        filter(
            &mut heap,
            "round",
            &Value::Float(2.1),
            vec![Value::Int(0), Value::str("ceil")]
        )
        .unwrap(),
        Value::Float(3.0)
    );
}

#[test]
fn test_markup_filters() {
    let mut heap = Heap::new();
    assert_eq!(
        filter(&mut heap, "escape", &Value::str("<b>"), vec![]).unwrap(),
        Value::markup("&lt;b&gt;")
    );
    assert_eq!(
        filter(&mut heap, "safe", &Value::str("<b>"), vec![]).unwrap(),
        Value::markup("<b>")
    );
    let data = heap.import(&Data::map([("a", Data::list([1])), ("b", Data::from("<x>"))]));
    assert_eq!(
        filter(&mut heap, "tojson", &data, vec![]).unwrap(),
        Value::markup(r#"{"a": [1], "b": "\u003cx\u003e"}"#)
    );
}

#[test]
fn test_filter_errors() {
    let mut heap = Heap::new();
    assert!(matches!(
        filter(&mut heap, "length", &Value::Int(1), vec![]),
        Err(EvalError::WrongArgType { .. })
    ));
    assert!(matches!(
        filter(&mut heap, "upper", &Value::str("a"), vec![Value::Int(1)]),
        Err(EvalError::ArityMismatch { .. })
    ));
}

#[test]
fn test_predicates() {
    let heap = Heap::new();
    let builtins = Builtins::standard();
    let check = |name: &str, v: Value, args: Vec<Value>| {
        builtins.test(name).unwrap()(&heap, &v, &CallArgs::positional(args))
    };
    assert_eq!(check("even", Value::Int(4), vec![]), Ok(true));
    assert_eq!(check("odd", Value::Int(4), vec![]), Ok(false));
    assert_eq!(check("divisibleby", Value::Int(9), vec![Value::Int(3)]), Ok(true));
    assert_eq!(
        check("divisibleby", Value::Int(9), vec![Value::Int(0)]),
        Err(EvalError::DivisionByZero)
    );
    assert_eq!(check("number", Value::Float(1.0), vec![]), Ok(true));
    assert_eq!(check("string", Value::Int(1), vec![]), Ok(false));
}

#[test]
fn test_functions() {
    let mut heap = Heap::new();
    let builtins = Builtins::standard();
    let (_, range) = builtins.function("range").unwrap();
    let r = range(&mut heap, &CallArgs::positional(vec![Value::Int(1), Value::Int(7), Value::Int(2)])).unwrap();
    assert_eq!(shown(&heap, &r), "[1, 3, 5]");
    let down = range(&mut heap, &CallArgs::positional(vec![Value::Int(3), Value::Int(0), Value::Int(-1)])).unwrap();
    assert_eq!(shown(&heap, &down), "[3, 2, 1]");

    let (_, namespace) = builtins.function("namespace").unwrap();
    let ns = namespace(
        &mut heap,
        &CallArgs {
            positional: vec![],
            named: vec![("count".into(), Value::Int(0))],
        },
    )
    .unwrap();
    assert_eq!(shown(&heap, &ns), "namespace({'count': 0})");
}
