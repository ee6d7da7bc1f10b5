use deft_eval::{Context, DisabledTags, Engine, ErrorKind};
use deft_ir::Data;
use pretty_assertions::assert_eq;

use crate::common::{assert_round_trip, first_pass};

#[test]
fn deferred_name_is_reemitted_as_itself() {
    let engine = Engine::default();
    let first = first_pass(&engine, "{{ n }}", &[], &["n"]);
    assert_eq!(first.output, "{{ n }}");
    assert!(first.is_clean());

    let second = engine
        .render_str(&first.output, &Context::new().insert("n", 7))
        .unwrap();
    assert_eq!(second.output, "7");
}

#[test]
fn known_operand_is_inlined() {
    let engine = Engine::default();
    let first = first_pass(&engine, "{{ n + m }}", &[("m", Data::from(5))], &["n"]);
    assert_eq!(first.output, "{{ n + 5 }}");

    let second = engine
        .render_str(&first.output, &Context::new().insert("n", 3))
        .unwrap();
    assert_eq!(second.output, "8");
}

const ALIASED: &str =
    "{% set a = [1, 2, 3] %}{% set b = a %}{% if x %}{% do a.append(4) %}{% endif %}{{ b }}";

#[test]
fn aliases_are_reconstructed_together() {
    let engine = Engine::default();
    let first = first_pass(&engine, ALIASED, &[], &["x"]);
    assert_eq!(
        first.output,
        "{% set a = [1, 2, 3] %}{% set b = a %}{% if x %}{% do a.append(4) %}{% endif %}{{ b }}"
    );
}

#[test]
fn aliased_mutation_survives_second_pass() {
    assert_round_trip(ALIASED, &[("x", Data::from(true))], &["x"]);
    assert_round_trip(ALIASED, &[("x", Data::from(false))], &["x"]);
}

const CONTAINED: &str =
    "{% set a = [1] %}{% set b = {'k': a} %}{% if x %}{% do a.append(2) %}{% endif %}{{ b }}";

#[test]
fn holders_of_a_deferred_container_are_deferred() {
    let engine = Engine::default();
    let first = first_pass(&engine, CONTAINED, &[], &["x"]);
    assert_eq!(
        first.output,
        "{% set a = [1] %}{% set b = {'k': a} %}{% if x %}{% do a.append(2) %}{% endif %}{{ b }}"
    );
}

#[test]
fn mutation_through_contained_container_survives_second_pass() {
    for x in [true, false] {
        assert_round_trip(CONTAINED, &[("x", Data::from(x))], &["x"]);
    }
    let through_holder =
        "{% set a = [1] %}{% set b = {'k': a} %}{% if x %}{% do b.k.append(2) %}{% endif %}{{ a }}";
    for x in [true, false] {
        assert_round_trip(through_holder, &[("x", Data::from(x))], &["x"]);
    }
}

#[test]
fn disabled_assignment_drops_the_region() {
    let engine = Engine::builder().disable(DisabledTags::SET).build();
    let context = Context::new().insert("a", vec![1, 2]).defer("x");
    let rendered = engine
        .render_str("{% if x %}{% do a.append(3) %}{% endif %}{{ a }}", &context)
        .unwrap();
    assert_eq!(rendered.output, "{{ a }}");
    assert!(!rendered.output.contains("{% set"));
    assert_eq!(rendered.fatal, None);
    let kinds: Vec<ErrorKind> = rendered.errors.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![ErrorKind::DisabledFeature]);
}

#[test]
fn disabled_tag_not_needed_is_harmless() {
    let engine = Engine::builder().disable(DisabledTags::MACRO).build();
    let context = Context::new().insert("m", 5).defer("n");
    let rendered = engine.render_str("{{ n + m }}", &context).unwrap();
    assert_eq!(rendered.output, "{{ n + 5 }}");
    assert!(rendered.is_clean());
}
