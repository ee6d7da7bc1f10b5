use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;
use crate::engine::{Context, Engine};

fn context() -> Context {
    Context::new()
        .insert("m", 5)
        .insert("nothing", None::<i64>)
        .defer("n")
}

#[test]
fn test_candidate_words_keeps_dotted_names() {
    assert_eq!(candidate_words("a + b.c"), vec!["a", "b.c"]);
}

#[test]
fn test_candidate_words_skips_string_contents() {
    assert_eq!(candidate_words("'x y' ~ z"), vec!["z"]);
    assert_eq!(candidate_words(r#""a" ~ 'it\'s' ~ b"#), vec!["b"]);
}

#[test]
fn test_candidate_words_drops_numbers_keywords_and_keys() {
    assert_eq!(
        candidate_words("f(x, key=1) and 2 == k or 1.5 is none"),
        vec!["f", "x", "k"]
    );
    assert_eq!(candidate_words("a == b"), vec!["a", "b"]);
    assert_eq!(candidate_words("(x).y"), vec!["x"]);
}

#[test]
fn test_find_deferred_words_checks_roots() {
    let engine = Engine::default();
    let renderer = engine.renderer(&context());
    let words = renderer.find_deferred_words("n.a + m + nothing + missing");
    let expected: BTreeSet<String> = ["m", "n"].iter().map(ToString::to_string).collect();
    assert_eq!(words, expected);
}

#[test]
fn test_resolve_expression_three_ways() {
    let engine = Engine::default();
    let mut renderer = engine.renderer(&context());
    assert_eq!(
        renderer.resolve_expression("m + 1").unwrap(),
        ResolutionResult::Resolved(Value::Int(6))
    );
    match renderer.resolve_expression("n + m").unwrap() {
        ResolutionResult::Partial {
            text,
            deferred_words,
        } => {
            assert_eq!(text, "n + 5");
            assert!(deferred_words.contains("n"));
        }
        other => panic!("expected partial, got {other:?}"),
    }
    match renderer.resolve_expression("n").unwrap() {
        ResolutionResult::Deferred { text, .. } => assert_eq!(text, "n"),
        other => panic!("expected deferred, got {other:?}"),
    }
}

#[test]
fn test_bad_expression_resolves_to_none_with_warning() {
    let engine = Engine::default();
    let mut renderer = engine.renderer(&context());
    assert_eq!(
        renderer.resolve_expression("1 +").unwrap(),
        ResolutionResult::Resolved(Value::None)
    );
    assert_eq!(
        renderer.resolve_expression("1 // 0").unwrap(),
        ResolutionResult::Resolved(Value::None)
    );
    let kinds: Vec<_> = renderer.errors().iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![crate::errors::ErrorKind::SyntaxError, crate::errors::ErrorKind::EvalError]
    );
}

#[test]
fn test_resolve_composite_strips_list_brackets() {
    let engine = Engine::default();
    let mut renderer = engine.renderer(&context());
    match renderer.resolve_composite("m, n").unwrap() {
        ResolutionResult::Partial { text, .. } => assert_eq!(text, "5, n"),
        other => panic!("expected partial, got {other:?}"),
    }
    match renderer.resolve_composite(" 1, n ").unwrap() {
        ResolutionResult::Deferred { text, .. } => assert_eq!(text, "1, n"),
        other => panic!("expected deferred, got {other:?}"),
    }
}

fn reserved_word() -> impl Strategy<Value = &'static str> {
    prop::sample::select(RESERVED.to_vec())
}

proptest! {
    #[test]
    fn scan_is_deterministic(text in ".{0,40}") {
        prop_assert_eq!(candidate_words(&text), candidate_words(&text));
    }

    #[test]
    fn reserved_words_are_never_candidates(word in reserved_word(), name in "[a-z][a-z0-9_]{0,6}") {
        prop_assume!(!is_reserved(&name));
        let text = format!("{word} {name}");
        prop_assert_eq!(candidate_words(&text), vec![name.as_str()]);
    }

    #[test]
    fn reserved_prefix_does_not_hide_a_name(word in reserved_word(), suffix in "[a-z0-9]{1,4}") {
        let name = format!("{word}_{suffix}");
        prop_assert_eq!(candidate_words(&name), vec![name.as_str()]);
    }

    #[test]
    fn quoted_text_yields_no_words(body in "[a-zA-Z0-9 _.]{0,16}") {
        let text = format!("'{body}'");
        prop_assert!(candidate_words(&text).is_empty());
    }
}
