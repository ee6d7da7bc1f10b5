//! Shared helpers for two-pass tests.

use deft_eval::{Context, Engine, Rendered};
use deft_ir::Data;

/// Render `src` with `full` data, except that `deferred` keys are withheld.
pub fn first_pass(engine: &Engine, src: &str, full: &[(&str, Data)], deferred: &[&str]) -> Rendered {
    let mut context = Context::new();
    for (key, value) in full {
        if !deferred.contains(key) {
            context = context.insert(*key, value.clone());
        }
    }
    for key in deferred {
        context = context.defer(*key);
    }
    let rendered = engine.render_str(src, &context).unwrap();
    assert!(rendered.fatal.is_none(), "first pass aborted: {:?}", rendered.errors);
    rendered
}

pub fn full_context(full: &[(&str, Data)]) -> Context {
    full.iter()
        .fold(Context::new(), |context, (key, value)| context.insert(*key, value.clone()))
}

/// Render `src` in two passes and in one, and return both outputs.
pub fn two_pass(src: &str, full: &[(&str, Data)], deferred: &[&str]) -> (String, String) {
    deft_eval::init_tracing();
    let engine = Engine::default();
    let first = first_pass(&engine, src, full, deferred);
    let context = full_context(full);
    let second = engine.render_str(&first.output, &context).unwrap();
    let direct = engine.render_str(src, &context).unwrap();
    assert!(second.is_clean(), "second pass errors: {:?}", second.errors);
    (second.output, direct.output)
}

/// Assert two-pass rendering matches a direct render.
pub fn assert_round_trip(src: &str, full: &[(&str, Data)], deferred: &[&str]) {
    let (two, one) = two_pass(src, full, deferred);
    pretty_assertions::assert_eq!(two, one, "template: {src}");
}
