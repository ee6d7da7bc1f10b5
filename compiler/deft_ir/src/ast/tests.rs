use super::*;
use crate::Span;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn b(op: BinaryOp, l: Expr, r: Expr) -> Expr {
    Expr::binary(op, l, r)
}

#[test]
fn test_binary_precedence_parens() {
    // (a + b) * c keeps its parentheses, a + b * c does not gain any
    let e = b(
        BinaryOp::Mul,
        b(BinaryOp::Add, Expr::name("a"), Expr::name("b")),
        Expr::name("c"),
    );
    assert_eq!(e.to_string(), "(a + b) * c");

    let e = b(
        BinaryOp::Add,
        Expr::name("a"),
        b(BinaryOp::Mul, Expr::name("b"), Expr::name("c")),
    );
    assert_eq!(e.to_string(), "a + b * c");
}

#[test]
fn test_left_associative_right_operand() {
    let e = b(
        BinaryOp::Sub,
        Expr::name("a"),
        b(BinaryOp::Sub, Expr::name("b"), Expr::name("c")),
    );
    assert_eq!(e.to_string(), "a - (b - c)");
}

#[test]
fn test_negative_literal_as_postfix_target() {
    let e = Expr::attr(Expr::int(-3), "real");
    assert_eq!(e.to_string(), "(-3).real");
}

#[test]
fn test_double_negation_spacing() {
    let e = Expr::Unary {
        op: UnaryOp::Neg,
        operand: Box::new(Expr::int(-3)),
    };
    assert_eq!(e.to_string(), "- -3");
}

#[test]
fn test_literals() {
    assert_eq!(Expr::Literal(Literal::None).to_string(), "none");
    assert_eq!(Expr::Literal(Literal::Bool(true)).to_string(), "true");
    assert_eq!(Expr::Literal(Literal::Float(1.0)).to_string(), "1.0");
    assert_eq!(Expr::Literal(Literal::Float(0.25)).to_string(), "0.25");
    assert_eq!(Expr::str("it's\n").to_string(), r"'it\'s\n'");
}

#[test]
fn test_filter_and_test() {
    let filtered = Expr::Filter {
        target: Box::new(b(BinaryOp::Add, Expr::name("a"), Expr::int(1))),
        name: "default".into(),
        args: vec![Arg::positional(Expr::int(0))],
    };
    assert_eq!(filtered.to_string(), "(a + 1)|default(0)");

    let test = Expr::Test {
        target: Box::new(Expr::name("x")),
        name: "divisibleby".into(),
        args: vec![Arg::positional(Expr::int(3))],
        negated: true,
    };
    assert_eq!(test.to_string(), "x is not divisibleby(3)");
}

#[test]
fn test_call_named_args() {
    let e = Expr::call(
        Expr::name("namespace"),
        vec![Arg::named("count", Expr::int(0))],
    );
    assert_eq!(e.to_string(), "namespace(count=0)");
}

#[test]
fn test_conditional_nesting() {
    let inner = Expr::Cond {
        then: Box::new(Expr::name("a")),
        cond: Box::new(Expr::name("b")),
        otherwise: Some(Box::new(Expr::name("c"))),
    };
    let outer = Expr::Cond {
        then: Box::new(inner),
        cond: Box::new(Expr::name("d")),
        otherwise: None,
    };
    assert_eq!(outer.to_string(), "(a if b else c) if d");
}

#[test]
fn test_map_and_list() {
    let e = Expr::Map(vec![(
        Expr::str("k"),
        Expr::List(vec![Expr::int(1), Expr::int(2)]),
    )]);
    assert_eq!(e.to_string(), "{'k': [1, 2]}");
}

#[test]
fn test_root_name() {
    let e = Expr::Index {
        target: Box::new(Expr::attr(Expr::name("ns"), "items")),
        index: Box::new(Expr::int(0)),
    };
    assert_eq!(e.root_name(), Some("ns"));
    assert_eq!(Expr::int(1).root_name(), None);
}

#[test]
fn test_node_printing() {
    let template = Template::new(vec![
        Node::Text("a ".into()),
        Node::Set {
            targets: vec![SetTarget::name("x"), SetTarget::name("y")],
            value: "1, 2".into(),
            span: Span::DUMMY,
        },
        Node::For {
            targets: vec!["i".into()],
            iter: "items".into(),
            body: vec![Node::Output {
                expr: "i".into(),
                span: Span::DUMMY,
            }],
            otherwise: Some(vec![Node::Text("none".into())]),
            span: Span::DUMMY,
        },
    ]);
    assert_eq!(
        template.to_string(),
        "a {% set x, y = 1, 2 %}{% for i in items %}{{ i }}{% else %}none{% endfor %}"
    );
}

#[test]
fn test_macro_printing() {
    let def = MacroDef {
        name: "greet".into(),
        params: vec![
            MacroParam {
                name: "who".into(),
                default: None,
            },
            MacroParam {
                name: "punct".into(),
                default: Some("'!'".into()),
            },
        ],
        body: vec![Node::Output {
            expr: "who ~ punct".into(),
            span: Span::DUMMY,
        }],
        span: Span::DUMMY,
    };
    assert_eq!(
        Node::Macro(Arc::new(def)).to_string(),
        "{% macro greet(who, punct='!') %}{{ who ~ punct }}{% endmacro %}"
    );
}

#[test]
fn test_if_and_autoescape_printing() {
    let node = Node::Autoescape {
        enabled: false,
        body: vec![Node::If {
            branches: vec![
                IfBranch {
                    cond: "a".into(),
                    body: vec![Node::Text("1".into())],
                    span: Span::DUMMY,
                },
                IfBranch {
                    cond: "b".into(),
                    body: vec![Node::Text("2".into())],
                    span: Span::DUMMY,
                },
            ],
            otherwise: None,
            span: Span::DUMMY,
        }],
        span: Span::DUMMY,
    };
    assert_eq!(
        node.to_string(),
        "{% autoescape false %}{% if a %}1{% elif b %}2{% endif %}{% endautoescape %}"
    );
}

#[test]
fn test_tag_kind_keywords() {
    use crate::TagKind;
    for kind in TagKind::ALL {
        assert_eq!(TagKind::from_keyword(kind.as_str()), Some(kind));
    }
    assert_eq!(TagKind::from_keyword("block"), None);
}
