use pretty_assertions::assert_eq;

use super::*;
use crate::config::{ConflictPolicy, DisabledTags};

#[test]
fn test_builder_sets_config() {
    let engine = Engine::builder()
        .max_output_size(Some(10))
        .max_render_depth(None)
        .conflict_policy(ConflictPolicy::PreservePrior)
        .check_for_context_changes(false)
        .autoescape(true)
        .disable(DisabledTags::DO)
        .disable(DisabledTags::RAW)
        .build();
    let config = engine.config();
    assert_eq!(config.max_output_size, Some(10));
    assert_eq!(config.max_render_depth, None);
    assert_eq!(config.conflict_policy, ConflictPolicy::PreservePrior);
    assert!(!config.check_for_context_changes);
    assert!(config.autoescape);
    assert_eq!(config.disabled, DisabledTags::DO | DisabledTags::RAW);
}

#[test]
fn test_default_engine_uses_default_config() {
    assert_eq!(Engine::default().config(), &EngineConfig::default());
}

#[test]
fn test_context_insert_replaces_and_defer_dedups() {
    let context = Context::new()
        .insert("a", 1)
        .insert("b", 2)
        .insert("a", 3)
        .defer("x")
        .defer("x");
    assert_eq!(
        context.data(),
        &[("a".to_string(), Data::Int(3)), ("b".to_string(), Data::Int(2))]
    );
    assert_eq!(context.deferred(), &["x".to_string()]);
}

#[test]
fn test_globals_and_context_precedence() {
    let engine = Engine::builder().global("site", "deft").global("n", 1).build();
    engine.set_global("year", 2024);
    let rendered = engine
        .render_str("{{ site }} {{ year }} {{ n }}", &Context::new().insert("n", 2))
        .unwrap();
    assert_eq!(rendered.output, "deft 2024 2");
    assert!(rendered.is_clean());
}

#[test]
fn test_clones_share_globals() {
    let engine = Engine::default();
    let clone = engine.clone();
    clone.set_global("shared", true);
    let rendered = engine.render_str("{{ shared }}", &Context::new()).unwrap();
    assert_eq!(rendered.output, "true");
}

#[test]
fn test_render_str_reports_parse_errors() {
    let engine = Engine::default();
    assert!(engine.render_str("{% if x %}unclosed", &Context::new()).is_err());
}

#[test]
fn test_render_all_keeps_input_order() {
    let engine = Engine::default();
    let template = engine.parse("{{ v * 2 }}").unwrap();
    let contexts: Vec<Context> = (0..16).map(|i| Context::new().insert("v", i)).collect();
    let jobs: Vec<(&Template, &Context)> = contexts.iter().map(|c| (&template, c)).collect();
    let outputs: Vec<String> = engine
        .render_all(&jobs)
        .into_iter()
        .map(|r| r.output)
        .collect();
    let expected: Vec<String> = (0..16).map(|i| (i * 2).to_string()).collect();
    assert_eq!(outputs, expected);
}

#[test]
fn test_render_never_shares_state_between_calls() {
    let engine = Engine::default();
    let template = engine.parse("{% set x = x + 1 %}{{ x }}").unwrap();
    let context = Context::new().insert("x", 1);
    assert_eq!(engine.render(&template, &context).output, "2");
    assert_eq!(engine.render(&template, &context).output, "2");
}
