use deft_ir::{Arg, BinaryOp, Expr, Literal, UnaryOp};
use pretty_assertions::assert_eq;

use crate::{parse_expr, parse_expr_list, ParseErrorKind};

fn parse(src: &str) -> Expr {
    parse_expr(src).unwrap()
}

fn name(s: &str) -> Expr {
    Expr::name(s)
}

#[test]
fn test_literals() {
    assert_eq!(parse("none"), Expr::Literal(Literal::None));
    assert_eq!(parse("None"), Expr::Literal(Literal::None));
    assert_eq!(parse("True"), Expr::Literal(Literal::Bool(true)));
    assert_eq!(parse("42"), Expr::int(42));
    assert_eq!(parse("-42"), Expr::int(-42));
    assert_eq!(parse("-1.5"), Expr::Literal(Literal::Float(-1.5)));
    assert_eq!(parse("'hi'"), Expr::str("hi"));
}

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(
        parse("n + m * 2"),
        Expr::binary(
            BinaryOp::Add,
            name("n"),
            Expr::binary(BinaryOp::Mul, name("m"), Expr::int(2))
        )
    );
    assert_eq!(
        parse("(n + m) * 2"),
        Expr::binary(
            BinaryOp::Mul,
            Expr::binary(BinaryOp::Add, name("n"), name("m")),
            Expr::int(2)
        )
    );
}

#[test]
fn test_unary_binds_tighter_than_power() {
    assert_eq!(
        parse("-x ** 2"),
        Expr::binary(
            BinaryOp::Pow,
            Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(name("x")),
            },
            Expr::int(2)
        )
    );
}

#[test]
fn test_logic_and_membership() {
    assert_eq!(
        parse("not a in b and c"),
        Expr::binary(
            BinaryOp::And,
            Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(Expr::binary(BinaryOp::In, name("a"), name("b"))),
            },
            name("c")
        )
    );
    assert_eq!(
        parse("a not in b"),
        Expr::binary(BinaryOp::NotIn, name("a"), name("b"))
    );
}

#[test]
fn test_tests() {
    assert_eq!(
        parse("x is not none"),
        Expr::Test {
            target: Box::new(name("x")),
            name: "none".into(),
            args: vec![],
            negated: true,
        }
    );
    assert_eq!(
        parse("x is divisibleby(3)"),
        Expr::Test {
            target: Box::new(name("x")),
            name: "divisibleby".into(),
            args: vec![Arg::positional(Expr::int(3))],
            negated: false,
        }
    );
}

#[test]
fn test_postfix_and_filters() {
    assert_eq!(
        parse("items[0].name|upper|default('x')"),
        Expr::Filter {
            target: Box::new(Expr::Filter {
                target: Box::new(Expr::attr(
                    Expr::Index {
                        target: Box::new(name("items")),
                        index: Box::new(Expr::int(0)),
                    },
                    "name"
                )),
                name: "upper".into(),
                args: vec![],
            }),
            name: "default".into(),
            args: vec![Arg::positional(Expr::str("x"))],
        }
    );
}

#[test]
fn test_method_call_with_named_args() {
    assert_eq!(
        parse("ns.update(count=1, other)"),
        Expr::call(
            Expr::attr(name("ns"), "update"),
            vec![Arg::named("count", Expr::int(1)), Arg::positional(name("other"))]
        )
    );
}

#[test]
fn test_conditional() {
    assert_eq!(
        parse("a if c else b"),
        Expr::Cond {
            then: Box::new(name("a")),
            cond: Box::new(name("c")),
            otherwise: Some(Box::new(name("b"))),
        }
    );
    assert_eq!(
        parse("a if c"),
        Expr::Cond {
            then: Box::new(name("a")),
            cond: Box::new(name("c")),
            otherwise: None,
        }
    );
}

#[test]
fn test_displays() {
    assert_eq!(
        parse("[1, 'a', ]"),
        Expr::List(vec![Expr::int(1), Expr::str("a")])
    );
    assert_eq!(
        parse("{'k': [1], 'j': {}}"),
        Expr::Map(vec![
            (Expr::str("k"), Expr::List(vec![Expr::int(1)])),
            (Expr::str("j"), Expr::Map(vec![])),
        ])
    );
}

#[test]
fn test_expr_list() {
    assert_eq!(
        parse_expr_list("1, n + 1").unwrap(),
        vec![
            Expr::int(1),
            Expr::binary(BinaryOp::Add, name("n"), Expr::int(1))
        ]
    );
    assert_eq!(parse_expr_list("x").unwrap(), vec![name("x")]);
}

#[test]
fn test_errors() {
    assert_eq!(
        parse_expr("").err().map(|e| e.kind),
        Some(ParseErrorKind::EmptyExpression)
    );
    assert!(matches!(
        parse_expr("a +").err().map(|e| e.kind),
        Some(ParseErrorKind::UnexpectedToken { .. })
    ));
    assert!(matches!(
        parse_expr("a b").err().map(|e| e.kind),
        Some(ParseErrorKind::TrailingInput { .. })
    ));
    assert!(matches!(
        parse_expr("(a").err().map(|e| e.kind),
        Some(ParseErrorKind::UnexpectedToken { .. })
    ));
    assert!(matches!(
        parse_expr("'open").err().map(|e| e.kind),
        Some(ParseErrorKind::Lex(_))
    ));
}

#[test]
fn test_deep_nesting() {
    let depth = 2_000;
    let src = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(parse(&src), Expr::int(1));
}
