use pretty_assertions::assert_eq;

use crate::config::DisabledTags;
use crate::engine::{Context, Engine};
use crate::errors::{ErrorKind, RenderError, Severity};

fn partial() -> Context {
    Context::new()
        .insert("m", 5)
        .insert("name", "deft")
        .insert("markup", "<b>")
        .defer("n")
}

fn render(engine: &Engine, src: &str, context: &Context) -> String {
    let rendered = engine.render_str(src, context).unwrap();
    assert_eq!(rendered.fatal, None, "{:?}", rendered.errors);
    rendered.output
}

#[test]
fn test_full_render() {
    let engine = Engine::default();
    let context = Context::new().insert("name", "deft").insert("items", vec![1, 2, 3]);
    let out = render(
        &engine,
        "Hi {{ name }}:{% for i in items %} {{ loop.index }}={{ i }}{% endfor %}",
        &context,
    );
    assert_eq!(out, "Hi deft: 1=1 2=2 3=3");
}

#[test]
fn test_deferred_output_is_reemitted() {
    let engine = Engine::default();
    assert_eq!(render(&engine, "{{ n }}", &partial()), "{{ n }}");
    assert_eq!(render(&engine, "{{ n + m }}", &partial()), "{{ n + 5 }}");
    assert_eq!(
        render(&engine, "{{ name }} {{ n|upper }}", &partial()),
        "deft {{ n|upper }}"
    );
}

#[test]
fn test_deferred_if_keeps_all_arms() {
    let engine = Engine::default();
    assert_eq!(
        render(&engine, "{% if n %}yes {{ m }}{% else %}no{% endif %}", &partial()),
        "{% if n %}yes 5{% else %}no{% endif %}"
    );
}

#[test]
fn test_known_later_condition_closes_chain() {
    let engine = Engine::default();
    assert_eq!(
        render(
            &engine,
            "{% if n %}a{% elif m > 10 %}b{% elif m == 5 %}c{% else %}d{% endif %}",
            &partial()
        ),
        "{% if n %}a{% else %}c{% endif %}"
    );
}

#[test]
fn test_known_if_takes_branch() {
    let engine = Engine::default();
    assert_eq!(
        render(&engine, "{% if m == 5 %}five{% else %}{{ n }}{% endif %}", &partial()),
        "five"
    );
}

#[test]
fn test_assignment_in_deferred_branch_reconstructs_prior_value() {
    let engine = Engine::default();
    let out = render(
        &engine,
        "{% set a = 1 %}{% if n %}{% set a = 2 %}{% endif %}{{ a }}",
        &partial(),
    );
    assert_eq!(out, "{% set a = 1 %}{% if n %}{% set a = 2 %}{% endif %}{{ a }}");
}

#[test]
fn test_deferred_loop_body() {
    let engine = Engine::default();
    assert_eq!(
        render(&engine, "{% for x in n %}{{ x }}-{{ m }}{% endfor %}", &partial()),
        "{% for x in n %}{{ x }}-5{% endfor %}"
    );
}

#[test]
fn test_loop_iteration_with_bindings_is_wrapped() {
    let engine = Engine::default();
    assert_eq!(
        render(&engine, "{% for i in [1] %}{% set x = n %}{% endfor %}", &partial()),
        "{% for __ignored__ in [0] %}{% set x = n %}{% endfor %}"
    );
}

#[test]
fn test_partial_macro_call() {
    let engine = Engine::default();
    let src = "{% macro greet(who) %}Hi {{ who }} {{ n }}{% endmacro %}{{ greet('bob') }}";
    assert_eq!(render(&engine, src, &partial()), "Hi bob {{ n }}");
    assert_eq!(
        render(&engine, src, &Context::new().insert("n", "!")),
        "Hi bob !"
    );
}

#[test]
fn test_autoescape() {
    let engine = Engine::builder().autoescape(true).build();
    assert_eq!(
        render(&engine, "{{ markup }}{{ markup|safe }}", &partial()),
        "&lt;b&gt;<b>"
    );

    let engine = Engine::default();
    assert_eq!(
        render(&engine, "{% autoescape true %}{{ markup }}{% endautoescape %}", &partial()),
        "&lt;b&gt;"
    );
    assert_eq!(
        render(&engine, "{% autoescape true %}{{ n }}{% endautoescape %}", &partial()),
        "{% autoescape true %}{{ n }}{% endautoescape %}"
    );
}

#[test]
fn test_raw_text_protected_in_partial_render() {
    let engine = Engine::default();
    assert_eq!(
        render(&engine, "{% raw %}{{ a }}{% endraw %}", &partial()),
        "{% raw %}{{ a }}{% endraw %}"
    );
    assert_eq!(
        render(&engine, "{% raw %}{{ a }}{% endraw %}", &Context::new()),
        "{{ a }}"
    );

    let engine = Engine::builder().preserve_raw(false).build();
    assert_eq!(
        render(&engine, "{% raw %}{{ a }}{% endraw %}", &partial()),
        "{{ a }}"
    );
}

#[test]
fn test_disabled_tag_drops_region() {
    let engine = Engine::builder().disable(DisabledTags::FOR).build();
    let rendered = engine
        .render_str("a{% for i in [1] %}x{% endfor %}b", &Context::new())
        .unwrap();
    assert_eq!(rendered.output, "ab");
    assert_eq!(rendered.errors.len(), 1);
    assert_eq!(rendered.errors[0].kind, ErrorKind::DisabledFeature);
    assert_eq!(rendered.errors[0].severity, Severity::Error);
}

#[test]
fn test_output_limit_is_fatal() {
    let engine = Engine::builder().max_output_size(Some(4)).build();
    let rendered = engine.render_str("abc{{ name }}", &partial()).unwrap();
    assert_eq!(rendered.output, "abc");
    assert_eq!(
        rendered.fatal,
        Some(RenderError::OutputTooBig { limit: 4, size: 7 })
    );
    assert_eq!(rendered.errors.last().map(|e| e.kind), Some(ErrorKind::OutputTooBig));
}

#[test]
fn test_recursive_macro_hits_depth_limit() {
    let engine = Engine::builder().max_render_depth(Some(8)).build();
    let rendered = engine
        .render_str("{% macro r(k) %}{{ r(k) }}{% endmacro %}{{ r(1) }}", &Context::new())
        .unwrap();
    assert_eq!(rendered.fatal, Some(RenderError::RecursionTooDeep { limit: 8 }));
}

#[test]
fn test_eval_errors_are_warnings() {
    let engine = Engine::default();
    let rendered = engine.render_str("[{{ 1 // 0 }}]", &Context::new()).unwrap();
    assert_eq!(rendered.output, "[]");
    assert_eq!(rendered.fatal, None);
    assert_eq!(rendered.errors.len(), 1);
    assert_eq!(rendered.errors[0].severity, Severity::Warning);
}
