use deft_eval::{Context, Engine};
use deft_ir::Data;
use pretty_assertions::assert_eq;

use crate::common::{assert_round_trip, first_pass};

fn numbers() -> Data {
    Data::list([1, 2, 3])
}

#[test]
fn conditional_assignment() {
    let src = "{% set a = 1 %}{% if n %}{% set a = 2 %}{% endif %}{{ a }}";
    assert_round_trip(src, &[("n", Data::from(true))], &["n"]);
    assert_round_trip(src, &[("n", Data::from(false))], &["n"]);
}

#[test]
fn elif_chain() {
    let src = "{% if n %}a{% elif m > 10 %}b{% elif m == 5 %}c{% else %}d{% endif %}";
    for n in [true, false] {
        assert_round_trip(src, &[("n", Data::from(n)), ("m", Data::from(5))], &["n"]);
    }
}

#[test]
fn deferred_loop() {
    let src = "{% for x in n %}{{ x }}-{{ m }};{% endfor %}";
    assert_round_trip(src, &[("n", numbers()), ("m", Data::from(5))], &["n"]);
    assert_round_trip(src, &[("n", Data::list(Vec::<i64>::new())), ("m", Data::from(5))], &["n"]);
}

#[test]
fn deferred_loop_with_namespace_accumulator() {
    let src = "{% set ns = namespace(count=0) %}\
               {% for i in n %}{% set ns.count = ns.count + i %}{% endfor %}\
               {{ ns.count }}";
    assert_round_trip(src, &[("n", numbers())], &["n"]);
}

#[test]
fn known_loop_with_deferred_assignment() {
    let src = "{% for i in [1, 2] %}{% set x = n %}{{ x }}{% endfor %}";
    assert_round_trip(src, &[("n", Data::from(7))], &["n"]);
}

#[test]
fn partially_evaluated_macro() {
    let src = "{% macro greet(who) %}Hi {{ who }} {{ n }}{% endmacro %}{{ greet('bob') }}";
    assert_round_trip(src, &[("n", Data::from("!"))], &["n"]);
}

#[test]
fn filters_on_deferred_values() {
    let src = "{{ n|length }}-{{ m }} {{ n|first }}";
    assert_round_trip(src, &[("n", numbers()), ("m", Data::from(1))], &["n"]);
}

#[test]
fn raw_output_is_not_reinterpreted() {
    let src = "{{ s }}{% raw %}{{ literally }}{% endraw %}{{ n }}";
    let full = [("s", Data::from("{{ nope }}")), ("n", Data::from(1))];
    let engine = Engine::default();
    let first = first_pass(&engine, src, &full, &["n"]);
    assert_eq!(
        first.output,
        "{% raw %}{{ nope }}{% endraw %}{% raw %}{{ literally }}{% endraw %}{{ n }}"
    );
    let second = engine
        .render_str(&first.output, &Context::new().insert("n", 1))
        .unwrap();
    assert_eq!(second.output, "{{ nope }}{{ literally }}1");
}

/// Rendering pass-one output again with the same data changes nothing.
#[test]
fn partial_output_is_a_fixed_point() {
    let cases: &[(&str, &[(&str, Data)])] = &[
        ("{{ n + m }}", &[("m", Data::from(5))]),
        ("{% set a = 1 %}{% if n %}{% set a = 2 %}{% endif %}{{ a }}", &[]),
        ("{% for x in n %}{{ x }}-{{ m }};{% endfor %}", &[("m", Data::from(5))]),
        (
            "{% set a = [1, 2, 3] %}{% set b = a %}{% if n %}{% do a.append(4) %}{% endif %}{{ b }}",
            &[],
        ),
        (
            "{% set a = [1] %}{% set b = {'k': a} %}{% if n %}{% do a.append(2) %}{% endif %}{{ b }}",
            &[],
        ),
    ];
    let engine = Engine::default();
    for (src, data) in cases {
        let first = first_pass(&engine, src, data, &["n"]);
        let again = first_pass(&engine, &first.output, data, &["n"]);
        assert_eq!(again.output, first.output, "template: {src}");
    }
}
