use deft_ir::Data;
use pretty_assertions::assert_eq;

use super::*;

fn sample(heap: &mut Heap) -> Value {
    heap.import(&Data::map([
        ("name", Data::from("Ada")),
        ("tags", Data::list(["a", "b"])),
        ("n", Data::from(2)),
        ("x", Data::from(0.5)),
        ("none", Data::None),
    ]))
}

#[test]
fn test_display() {
    let mut heap = Heap::new();
    let v = sample(&mut heap);
    assert_eq!(
        heap.display(&v),
        "{'name': 'Ada', 'tags': ['a', 'b'], 'n': 2, 'x': 0.5, 'none': none}"
    );
    assert_eq!(heap.display(&Value::None), "");
    assert_eq!(heap.display(&Value::Bool(true)), "true");
    assert_eq!(heap.display(&Value::Float(1.0)), "1.0");
    assert_eq!(heap.display(&Value::str("it's")), "it's");
}

#[test]
fn test_literal_reparses_to_equal_value() {
    let mut heap = Heap::new();
    let v = sample(&mut heap);
    let text = heap.literal(&v).unwrap();
    let expr = deft_parse::parse_expr(&text).unwrap();
    let back = heap.from_literal(&expr).unwrap();
    assert!(heap.deep_eq(&v, &back));
    assert_ne!(v.object(), back.object());
}

#[test]
fn test_namespace_and_markup_literals() {
    let mut heap = Heap::new();
    let ns = heap.new_namespace(vec![("count".into(), Value::Int(0))]);
    assert_eq!(heap.literal(&ns).unwrap(), "namespace({'count': 0})");
    assert_eq!(heap.literal(&Value::markup("<b>")).unwrap(), "'<b>'|safe");

    let expr = deft_parse::parse_expr("namespace({'count': 0})").unwrap();
    assert!(matches!(heap.from_literal(&expr), Some(Value::Namespace(_))));
}

#[test]
fn test_values_without_literal_form() {
    let mut heap = Heap::new();
    assert_eq!(heap.literal(&Value::Float(f64::NAN)), None);

    let list = heap.new_list(vec![]);
    if let Value::List(id) = list {
        if let HeapObject::List(items) = heap.get_mut(id) {
            items.push(Value::List(id));
        }
    }
    assert_eq!(heap.literal(&list), None);
    assert_eq!(heap.display(&list), "[[...]]");
}

#[test]
fn test_fingerprint_tracks_identity_and_content() {
    let mut heap = Heap::new();
    let a = heap.import(&Data::list([1, 2]));
    let b = heap.import(&Data::list([1, 2]));
    assert_ne!(heap.fingerprint(&a), heap.fingerprint(&b));
    assert!(heap.deep_eq(&a, &b));

    let before = heap.fingerprint(&a);
    if let Value::List(id) = a {
        if let HeapObject::List(items) = heap.get_mut(id) {
            items.push(Value::Int(3));
        }
    }
    assert_ne!(heap.fingerprint(&a), before);
    assert_eq!(heap.fingerprint(&Value::Int(3)), heap.fingerprint(&Value::Int(3)));
}

#[test]
fn test_deep_eq_numbers_and_text() {
    let heap = Heap::new();
    assert!(heap.deep_eq(&Value::Int(1), &Value::Float(1.0)));
    assert!(heap.deep_eq(&Value::str("a"), &Value::markup("a")));
    assert!(!heap.deep_eq(&Value::Bool(true), &Value::Int(1)));
}

#[test]
fn test_truthiness() {
    let mut heap = Heap::new();
    let empty = heap.new_list(vec![]);
    let full = heap.import(&Data::list([0]));
    assert!(!heap.truthy(&empty));
    assert!(heap.truthy(&full));
    assert!(!heap.truthy(&Value::str("")));
    assert!(!heap.truthy(&Value::Float(0.0)));
    assert!(heap.truthy(&Value::Int(-1)));
}

#[test]
fn test_escape_html() {
    assert_eq!(
        escape_html(r#"<a href="x">'&'</a>"#),
        "&lt;a href=&#34;x&#34;&gt;&#39;&amp;&#39;&lt;/a&gt;"
    );
}

#[test]
fn test_reachable_follows_nesting_and_cycles() {
    let mut heap = Heap::new();
    let inner = heap.new_list(vec![Value::Int(1)]);
    let outer = heap.new_map(vec![("k".to_string(), inner.clone())]);
    let (inner_id, outer_id) = (inner.object().unwrap(), outer.object().unwrap());
    if let HeapObject::List(items) = heap.get_mut(inner_id) {
        items.push(outer.clone());
    }

    let reach = heap.reachable(&inner);
    assert_eq!(reach.len(), 2);
    assert!(reach.contains(&inner_id) && reach.contains(&outer_id));
    assert!(heap.reachable(&Value::Int(1)).is_empty());
}

#[test]
fn test_literal_names_nested_containers() {
    let mut heap = Heap::new();
    let inner = heap.new_list(vec![Value::Int(1)]);
    let outer = heap.new_map(vec![("k".to_string(), inner.clone())]);
    let mut names = rustc_hash::FxHashMap::default();
    names.insert(inner.object().unwrap(), "a".to_string());
    names.insert(outer.object().unwrap(), "b".to_string());

    let text = heap.to_expr_naming(&outer, &names).unwrap().to_string();
    assert_eq!(text, "{'k': a}");
    assert_eq!(heap.to_expr_naming(&inner, &names).unwrap().to_string(), "[1]");
    assert_eq!(heap.literal(&outer).unwrap(), "{'k': [1]}");
}
