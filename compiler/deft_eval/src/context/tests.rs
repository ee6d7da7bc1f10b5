use pretty_assertions::assert_eq;

use super::*;

fn chain() -> ScopeChain {
    ScopeChain::new(false, Some(4))
}

#[test]
fn test_put_writes_innermost_frame() {
    let mut scopes = chain();
    scopes.put("x", Value::Int(1));
    scopes.push_frame(FrameKind::Loop).ok();
    scopes.put("x", Value::Int(2));
    assert_eq!(scopes.get("x"), Some(&Binding::Value(Value::Int(2))));
    scopes.pop_frame();
    assert_eq!(scopes.get("x"), Some(&Binding::Value(Value::Int(1))));
}

#[test]
fn test_lookup_walks_to_parent() {
    let mut scopes = chain();
    scopes.put("x", Value::Int(1));
    scopes.push_frame(FrameKind::Block).ok();
    assert_eq!(scopes.find("x").map(|(i, _)| i), Some(0));
    assert_eq!(scopes.get("missing"), None);
}

#[test]
fn test_rebinding_keeps_sequence() {
    let mut scopes = chain();
    scopes.put("a", Value::Int(1));
    scopes.put("b", Value::Int(2));
    scopes.put("a", Value::Int(3));
    let order: Vec<_> = scopes.current().slots().iter().map(|(k, _)| k.to_string()).collect();
    assert_eq!(order, vec!["a", "b"]);
}

#[test]
fn test_mark_deferred_local() {
    let mut scopes = chain();
    scopes.put("x", Value::Int(1));
    assert_eq!(scopes.mark_deferred("x"), Some(Deferral::Local(Value::Int(1))));
    assert_eq!(
        scopes.get("x"),
        Some(&Binding::Deferred(DeferredValue::WithOriginal(Value::Int(1))))
    );
    // Already deferred: no second transition.
    assert_eq!(scopes.mark_deferred("x"), None);
}

#[test]
fn test_mark_deferred_skips_none_meta_and_absent() {
    let mut scopes = chain();
    scopes.put("n", Value::None);
    scopes.put_meta("loop", Binding::Value(Value::Int(1)));
    assert_eq!(scopes.mark_deferred("n"), None);
    assert_eq!(scopes.mark_deferred("loop"), None);
    assert_eq!(scopes.mark_deferred("absent"), None);
}

#[test]
fn test_shadow_is_absorbed_where_declared() {
    let mut scopes = chain();
    scopes.put("x", Value::Int(7));
    scopes.push_frame(FrameKind::Loop).ok();
    scopes.push_frame(FrameKind::Loop).ok();

    assert_eq!(scopes.mark_deferred("x"), Some(Deferral::Shadowed));
    // The root binding is untouched until the chain unwinds.
    assert_eq!(
        scopes.frame(0).slot("x").map(|s| &s.binding),
        Some(&Binding::Value(Value::Int(7)))
    );

    let (_, pending) = scopes.pop_frame();
    assert!(pending.is_empty());
    assert!(matches!(
        scopes.current().slot("x").map(|s| &s.binding),
        Some(Binding::Deferred(DeferredValue::Shadow(_)))
    ));

    let (_, pending) = scopes.pop_frame();
    assert_eq!(pending, vec![("x".to_string(), Value::Int(7))]);
    assert_eq!(
        scopes.get("x"),
        Some(&Binding::Deferred(DeferredValue::WithOriginal(Value::Int(7))))
    );
}

#[test]
fn test_depth_budget_excludes_speculative_frames() {
    let mut scopes = ScopeChain::new(false, Some(1));
    assert!(scopes.push_frame(FrameKind::Speculative).is_ok());
    assert!(scopes.push_frame(FrameKind::Loop).is_ok());
    assert!(scopes.push_frame(FrameKind::Loop).is_err());
    assert_eq!(scopes.depth(), 1);
}

#[test]
fn test_children_inherit_mode_and_macro_stack() {
    let mut scopes = ScopeChain::new(true, None);
    scopes.push_macro_frame("m").ok();
    scopes.current_mut().deferred_execution = true;
    scopes.push_frame(FrameKind::Speculative).ok();
    let frame = scopes.current();
    assert_eq!(frame.macro_stack, vec!["m".to_string()]);
    assert!(frame.deferred_execution);
    assert!(frame.autoescape);
    assert!(scopes.is_same_lexical_scope(1, 2));
    assert!(!scopes.is_same_lexical_scope(0, 2));
}

#[test]
fn test_visible_prefers_innermost() {
    let mut scopes = chain();
    scopes.put("a", Value::Int(1));
    scopes.put("b", Value::Int(2));
    scopes.push_frame(FrameKind::Block).ok();
    scopes.put("a", Value::Int(3));
    let visible: Vec<_> = scopes
        .visible()
        .into_iter()
        .map(|(k, i, b)| (k, i, b.value().cloned()))
        .collect();
    assert_eq!(
        visible,
        vec![
            ("b".to_string(), 0, Some(Value::Int(2))),
            ("a".to_string(), 1, Some(Value::Int(3))),
        ]
    );
}
