use super::*;
use pretty_assertions::assert_eq;

fn kinds_and_text(src: &str) -> Vec<(SegmentKind, &str)> {
    match segment(src) {
        Ok(segments) => segments.into_iter().map(|s| (s.kind, s.text)).collect(),
        Err(err) => panic!("segmenting {src:?} failed: {err}"),
    }
}

#[test]
fn test_text_only() {
    assert_eq!(
        kinds_and_text("hello world"),
        vec![(SegmentKind::Text, "hello world")]
    );
    assert_eq!(kinds_and_text(""), vec![]);
}

#[test]
fn test_expression_and_statement() {
    assert_eq!(
        kinds_and_text("a {{ x + 1 }} b {% set y = 2 %}c"),
        vec![
            (SegmentKind::Text, "a "),
            (SegmentKind::Expression, "x + 1"),
            (SegmentKind::Text, " b "),
            (SegmentKind::Statement, "set y = 2"),
            (SegmentKind::Text, "c"),
        ]
    );
}

#[test]
fn test_comment_dropped() {
    assert_eq!(
        kinds_and_text("a{# note {{ x }} #}b"),
        vec![(SegmentKind::Text, "a"), (SegmentKind::Text, "b")]
    );
}

#[test]
fn test_whitespace_control() {
    assert_eq!(
        kinds_and_text("a  \n{%- set x = 1 -%}\n  b"),
        vec![
            (SegmentKind::Text, "a"),
            (SegmentKind::Statement, "set x = 1"),
            (SegmentKind::Text, "b"),
        ]
    );
    assert_eq!(
        kinds_and_text("a {{- x }} b"),
        vec![
            (SegmentKind::Text, "a"),
            (SegmentKind::Expression, "x"),
            (SegmentKind::Text, " b"),
        ]
    );
}

#[test]
fn test_quote_aware_closer() {
    assert_eq!(
        kinds_and_text("{{ '}}' ~ \"%}\" }}"),
        vec![(SegmentKind::Expression, "'}}' ~ \"%}\"")]
    );
}

#[test]
fn test_nested_map_literal() {
    assert_eq!(
        kinds_and_text("{{ {'a': {'b': 1}} }}!"),
        vec![
            (SegmentKind::Expression, "{'a': {'b': 1}}"),
            (SegmentKind::Text, "!"),
        ]
    );
}

#[test]
fn test_raw_block() {
    assert_eq!(
        kinds_and_text("x{% raw %}{{ not evaluated }}{% endraw %}y"),
        vec![
            (SegmentKind::Text, "x"),
            (SegmentKind::Raw, "{{ not evaluated }}"),
            (SegmentKind::Text, "y"),
        ]
    );
}

#[test]
fn test_raw_block_trimmed() {
    assert_eq!(
        kinds_and_text("{% raw -%}  {{ a }}  {%- endraw %}"),
        vec![(SegmentKind::Raw, "{{ a }}")]
    );
}

#[test]
fn test_lone_brace_is_text() {
    assert_eq!(
        kinds_and_text("a { b } c"),
        vec![(SegmentKind::Text, "a { b } c")]
    );
}

#[test]
fn test_spans_cover_inner_text() {
    let src = "ab{{  name  }}";
    let segments = segment(src).unwrap();
    let expr = &segments[1];
    assert_eq!(&src[expr.span.to_range()], "name");
}

#[test]
fn test_unterminated() {
    let err = segment("a {{ x").err();
    assert_eq!(
        err.map(|e| e.kind),
        Some(LexErrorKind::UnterminatedExpression)
    );
    let err = segment("{% raw %}never closed").err();
    assert_eq!(err.map(|e| e.kind), Some(LexErrorKind::UnterminatedRaw));
    let err = segment("{# open").err();
    assert_eq!(err.map(|e| e.kind), Some(LexErrorKind::UnterminatedComment));
}
