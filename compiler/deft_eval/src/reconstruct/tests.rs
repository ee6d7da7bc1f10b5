use std::sync::Arc;

use deft_ir::Node;
use deft_parse::parse_template;
use pretty_assertions::assert_eq;

use super::*;
use crate::config::DisabledTags;
use crate::context::Binding;
use crate::engine::{Context, Engine};

fn macro_value(src: &str) -> (Arc<deft_ir::MacroDef>, Value) {
    let template = parse_template(src).unwrap();
    let Some(Node::Macro(def)) = template.nodes.into_iter().next() else {
        panic!("expected a macro node");
    };
    (Arc::clone(&def), Value::Macro(def))
}

#[test]
fn test_plain_values_share_one_set() {
    let engine = Engine::default();
    let mut renderer = engine.renderer(&Context::new());
    let list = renderer.heap.new_list(vec![Value::Int(1), Value::str("two")]);
    let out = renderer
        .reconstruct(&[
            ("a".to_string(), Value::Int(1)),
            ("s".to_string(), Value::str("it's")),
            ("l".to_string(), list),
            ("a".to_string(), Value::Int(9)),
        ])
        .unwrap();
    assert_eq!(out, r"{% set a, s, l = 1, 'it\'s', [1, 'two'] %}");
    assert_eq!(renderer.counters.syntax, 1);
    assert_eq!(renderer.counters.bindings, 1);
}

#[test]
fn test_empty_batch_emits_nothing() {
    let engine = Engine::default();
    let mut renderer = engine.renderer(&Context::new());
    assert_eq!(renderer.reconstruct(&[]).unwrap(), "");
    assert_eq!(renderer.counters.syntax, 0);
}

#[test]
fn test_alias_refs_point_at_source() {
    let engine = Engine::default();
    let mut renderer = engine.renderer(&Context::new().insert("a", vec![1, 2]));
    let list = renderer.scopes.get("a").and_then(Binding::value).cloned().unwrap();
    renderer.scopes.put("b", list);
    renderer.defer_binding("b", None);

    let batch = std::mem::take(&mut renderer.pending);
    let out = renderer.reconstruct(&batch).unwrap();
    assert_eq!(out, "{% set a = [1, 2] %}{% set b = a %}");
    assert!(renderer.aliases.groups()[0].reconstructed);
}

#[test]
fn test_macro_emitted_once_per_frame() {
    let engine = Engine::default();
    let mut renderer = engine.renderer(&Context::new());
    let (def, value) = macro_value("{% macro m(x) %}[{{ x }}]{% endmacro %}");

    let out = renderer
        .reconstruct(&[("m".to_string(), value.clone()), ("other".to_string(), value.clone())])
        .unwrap();
    assert_eq!(out, format!("{def}{{% set other = m %}}"));

    let again = renderer.reconstruct(&[("m".to_string(), value)]).unwrap();
    assert_eq!(again, "");
}

#[test]
fn test_disabled_set_fails_region() {
    let engine = Engine::builder().disable(DisabledTags::SET).build();
    let mut renderer = engine.renderer(&Context::new());
    let error = renderer
        .reconstruct(&[("a".to_string(), Value::Int(1))])
        .unwrap_err();
    assert_eq!(error, ReconstructError::DisabledFeature { tag: TagKind::Set });
}

#[test]
fn test_disabled_macro_fails_region() {
    let engine = Engine::builder().disable(DisabledTags::MACRO).build();
    let mut renderer = engine.renderer(&Context::new());
    let (_, value) = macro_value("{% macro m() %}x{% endmacro %}");
    let error = renderer.reconstruct(&[("m".to_string(), value)]).unwrap_err();
    assert_eq!(error, ReconstructError::DisabledFeature { tag: TagKind::Macro });
}

#[test]
fn test_value_without_literal_form() {
    let engine = Engine::default();
    let mut renderer = engine.renderer(&Context::new());
    let error = renderer
        .reconstruct(&[("x".to_string(), Value::Float(f64::NAN))])
        .unwrap_err();
    assert_eq!(
        error,
        ReconstructError::CannotReconstructValue {
            key: "x".to_string()
        }
    );
}

#[test]
fn test_nested_container_refers_to_its_binding() {
    let engine = Engine::default();
    let mut renderer = engine.renderer(&Context::new());
    let inner = renderer.heap.new_list(vec![Value::Int(1)]);
    let outer = renderer.heap.new_map(vec![("k".to_string(), inner.clone())]);
    let wrapper = renderer.heap.new_list(vec![outer.clone()]);
    let out = renderer
        .reconstruct(&[
            ("c".to_string(), wrapper),
            ("b".to_string(), outer),
            ("a".to_string(), inner),
            ("n".to_string(), Value::Int(3)),
        ])
        .unwrap();
    assert_eq!(
        out,
        "{% set a, n = [1], 3 %}{% set b = {'k': a} %}{% set c = [b] %}"
    );
}

#[test]
fn test_mutually_nested_containers_fail() {
    let engine = Engine::default();
    let mut renderer = engine.renderer(&Context::new());
    let first = renderer.heap.new_list(vec![]);
    let second = renderer.heap.new_list(vec![first.clone()]);
    if let crate::HeapObject::List(items) = renderer.heap.get_mut(first.object().unwrap()) {
        items.push(second.clone());
    }
    let error = renderer
        .reconstruct(&[("p".to_string(), first), ("q".to_string(), second)])
        .unwrap_err();
    assert_eq!(
        error,
        ReconstructError::CannotReconstructValue {
            key: "p".to_string()
        }
    );
}
