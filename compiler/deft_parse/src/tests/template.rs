use deft_ir::{Node, SetTarget, Span, TagKind};
use pretty_assertions::assert_eq;

use crate::{parse_template, ParseErrorKind};

fn reprint(src: &str) -> String {
    parse_template(src).unwrap().to_string()
}

#[test]
fn test_text_and_output() {
    let template = parse_template("Hello {{ name }}!").unwrap();
    assert_eq!(
        template.nodes,
        vec![
            Node::Text("Hello ".into()),
            Node::Output {
                expr: "name".into(),
                span: Span::new(9, 13),
            },
            Node::Text("!".into()),
        ]
    );
}

#[test]
fn test_set_targets() {
    let template = parse_template("{% set ns.total, b = 1, 2 %}").unwrap();
    match &template.nodes[0] {
        Node::Set { targets, value, .. } => {
            assert_eq!(
                targets,
                &vec![
                    SetTarget {
                        name: "ns".into(),
                        attr: Some("total".into()),
                    },
                    SetTarget::name("b"),
                ]
            );
            assert_eq!(value, "1, 2");
        }
        other => panic!("expected set, got {other:?}"),
    }
}

#[test]
fn test_if_chain_structure() {
    let template = parse_template("{% if a %}1{% elif b %}2{% else %}3{% endif %}").unwrap();
    match &template.nodes[0] {
        Node::If {
            branches,
            otherwise,
            ..
        } => {
            assert_eq!(branches.len(), 2);
            assert_eq!(branches[0].cond, "a");
            assert_eq!(branches[1].cond, "b");
            assert_eq!(otherwise, &Some(vec![Node::Text("3".into())]));
        }
        other => panic!("expected if, got {other:?}"),
    }
}

#[test]
fn test_reprint_is_stable() {
    let sources = [
        "{% for k, v in items %}{{ k }}={{ v }}{% else %}empty{% endfor %}",
        "{% macro greet(who, punct='!') %}Hi {{ who ~ punct }}{% endmacro %}",
        "{% autoescape false %}{{ x }}{% endautoescape %}",
        "{% do list.append(1) %}",
        "{% raw %}{{ kept }}{% endraw %}",
        "{% if a %}{% if b %}x{% endif %}{% endif %}",
    ];
    for src in sources {
        assert_eq!(reprint(src), src);
    }
}

#[test]
fn test_autoescape_default_is_enabled() {
    assert_eq!(
        reprint("{% autoescape %}x{% endautoescape %}"),
        "{% autoescape true %}x{% endautoescape %}"
    );
}

#[test]
fn test_macro_default_keeps_source() {
    let template = parse_template("{% macro m(a, b=[1, 2]|length) %}{% endmacro %}").unwrap();
    match &template.nodes[0] {
        Node::Macro(def) => {
            assert_eq!(def.params[1].default.as_deref(), Some("[1, 2]|length"));
        }
        other => panic!("expected macro, got {other:?}"),
    }
}

#[test]
fn test_malformed_expression_is_not_a_template_error() {
    // Expression text is parsed later, at render time.
    let template = parse_template("{{ 1 + }}").unwrap();
    assert_eq!(template.nodes.len(), 1);
}

#[test]
fn test_structure_errors() {
    let kind = |src: &str| parse_template(src).err().map(|e| e.kind);

    assert_eq!(
        kind("{% if a %}x"),
        Some(ParseErrorKind::UnclosedBlock { tag: TagKind::If })
    );
    assert_eq!(
        kind("{% endfor %}"),
        Some(ParseErrorKind::UnexpectedEndTag {
            found: "endfor".into()
        })
    );
    assert_eq!(
        kind("{% for x in y %}{% endif %}"),
        Some(ParseErrorKind::UnexpectedEndTag {
            found: "endif".into()
        })
    );
    assert_eq!(
        kind("{% block body %}"),
        Some(ParseErrorKind::UnknownTag("block".into()))
    );
    assert!(matches!(
        kind("{% set x %}"),
        Some(ParseErrorKind::MalformedTag {
            tag: TagKind::Set,
            ..
        })
    ));
    assert!(matches!(
        kind("{% for x of y %}{% endfor %}"),
        Some(ParseErrorKind::MalformedTag {
            tag: TagKind::For,
            ..
        })
    ));
    assert!(matches!(
        kind("{% autoescape maybe %}{% endautoescape %}"),
        Some(ParseErrorKind::MalformedTag {
            tag: TagKind::Autoescape,
            ..
        })
    ));
}

#[test]
fn test_header_error_spans_are_absolute() {
    let src = "abc{% set 1 = 2 %}";
    let err = parse_template(src).unwrap_err();
    assert_eq!(&src[err.span.to_range()], "1");
}
