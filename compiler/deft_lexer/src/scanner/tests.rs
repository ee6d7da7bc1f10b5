use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn kinds(src: &str) -> Vec<TokenKind> {
    match tokenize(src) {
        Ok(tokens) => tokens.into_iter().map(|t| t.kind).collect(),
        Err(err) => panic!("tokenizing {src:?} failed: {err}"),
    }
}

fn ident(s: &str) -> TokenKind {
    TokenKind::Ident(s.to_string())
}

#[test]
fn test_operators() {
    assert_eq!(
        kinds("a ** b // c != d <= e"),
        vec![
            ident("a"),
            TokenKind::StarStar,
            ident("b"),
            TokenKind::SlashSlash,
            ident("c"),
            TokenKind::NotEq,
            ident("d"),
            TokenKind::LtEq,
            ident("e"),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_numbers() {
    assert_eq!(
        kinds("1 2.5 1e3 1.5e-2 7.x"),
        vec![
            TokenKind::Int(1),
            TokenKind::Float(2.5),
            TokenKind::Float(1000.0),
            TokenKind::Float(0.015),
            TokenKind::Int(7),
            TokenKind::Dot,
            ident("x"),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_strings_and_escapes() {
    assert_eq!(
        kinds(r#"'it\'s' "a\nb" '\d'"#),
        vec![
            TokenKind::Str("it's".into()),
            TokenKind::Str("a\nb".into()),
            TokenKind::Str("\\d".into()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_attribute_chain() {
    assert_eq!(
        kinds("loop.index0|string"),
        vec![
            ident("loop"),
            TokenKind::Dot,
            ident("index0"),
            TokenKind::Pipe,
            ident("string"),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_unicode_identifier() {
    assert_eq!(kinds("größe"), vec![ident("größe"), TokenKind::Eof]);
}

#[test]
fn test_errors() {
    let err = tokenize("'open").err().map(|e| e.kind);
    assert_eq!(err, Some(LexErrorKind::UnterminatedString));
    let err = tokenize("a $ b").err().map(|e| e.kind);
    assert_eq!(err, Some(LexErrorKind::UnexpectedChar('$')));
    let err = tokenize("99999999999999999999").err().map(|e| e.kind);
    assert_eq!(err, Some(LexErrorKind::IntOverflow));
}

#[test]
fn test_spans() {
    let tokens = tokenize("ab + 'c'").unwrap_or_default();
    let spans: Vec<_> = tokens.iter().map(|t| t.span.to_range()).collect();
    assert_eq!(spans, vec![0..2, 3..4, 5..8, 8..8]);
}

proptest! {
    #[test]
    fn float_debug_text_relexes(x in -1.0e12f64..1.0e12) {
        let text = format!("{:?}", x.abs());
        let tokens = kinds(&text);
        prop_assert_eq!(tokens, vec![TokenKind::Float(x.abs()), TokenKind::Eof]);
    }

    #[test]
    fn quoted_strings_relex(s in "\\PC*") {
        let text = deft_ir::quote(&s);
        prop_assert_eq!(kinds(&text), vec![TokenKind::Str(s), TokenKind::Eof]);
    }
}
