//! Expression tree.
//!
//! Expressions are kept as an ordinary boxed tree. They are small (a tag's
//! worth of source) and the partial evaluator rebuilds residual trees out of
//! their pieces, which a flat arena would make awkward.
//!
//! `Display` prints canonical source that re-parses to an equal tree.
//! Parentheses are inserted only where precedence requires them.

use std::fmt::{self, Write as _};

use super::operators::{BinaryOp, UnaryOp};

/// Precedence of atoms and postfix forms (`x.a`, `x[i]`, `f()`).
pub const PREC_ATOM: u8 = 0;
/// Precedence of filter application (`x|f`).
pub const PREC_FILTER: u8 = 1;
/// Precedence of comparisons and `is` tests.
pub const PREC_COMPARE: u8 = 7;
/// Precedence of the conditional expression (`a if c else b`).
pub const PREC_COND: u8 = 11;

/// Literal values.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Literal {
    fn precedence(&self) -> u8 {
        match self {
            Literal::Int(n) if *n < 0 => UnaryOp::Neg.precedence(),
            Literal::Float(x) if x.is_sign_negative() => UnaryOp::Neg.precedence(),
            _ => PREC_ATOM,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::None => f.write_str("none"),
            Literal::Bool(true) => f.write_str("true"),
            Literal::Bool(false) => f.write_str("false"),
            Literal::Int(n) => write!(f, "{n}"),
            // `{:?}` always keeps a fractional part or exponent, so the text
            // re-lexes as a float.
            Literal::Float(x) => write!(f, "{x:?}"),
            Literal::Str(s) => write_quoted(f, s),
        }
    }
}

/// Write `s` as a single-quoted string literal.
pub fn write_quoted(out: &mut impl fmt::Write, s: &str) -> fmt::Result {
    out.write_char('\'')?;
    for c in s.chars() {
        match c {
            '\\' => out.write_str("\\\\")?,
            '\'' => out.write_str("\\'")?,
            '\n' => out.write_str("\\n")?,
            '\r' => out.write_str("\\r")?,
            '\t' => out.write_str("\\t")?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('\'')
}

/// Quote `s` as a string literal.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    // Writing to a String cannot fail.
    let _ = write_quoted(&mut out, s);
    out
}

/// A call, filter, or test argument, optionally named (`key=value`).
#[derive(Clone, Debug, PartialEq)]
pub struct Arg {
    pub name: Option<String>,
    pub value: Expr,
}

impl Arg {
    pub fn positional(value: Expr) -> Self {
        Arg { name: None, value }
    }

    pub fn named(name: impl Into<String>, value: Expr) -> Self {
        Arg {
            name: Some(name.into()),
            value,
        }
    }
}

/// Expression node.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Name(String),
    List(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
    Attr {
        target: Box<Expr>,
        name: String,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Arg>,
    },
    Filter {
        target: Box<Expr>,
        name: String,
        args: Vec<Arg>,
    },
    Test {
        target: Box<Expr>,
        name: String,
        args: Vec<Arg>,
        negated: bool,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `then if cond else otherwise`; a missing `else` yields none.
    Cond {
        then: Box<Expr>,
        cond: Box<Expr>,
        otherwise: Option<Box<Expr>>,
    },
}

impl Expr {
    pub fn name(name: impl Into<String>) -> Self {
        Expr::Name(name.into())
    }

    pub fn int(n: i64) -> Self {
        Expr::Literal(Literal::Int(n))
    }

    pub fn str(s: impl Into<String>) -> Self {
        Expr::Literal(Literal::Str(s.into()))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn attr(target: Expr, name: impl Into<String>) -> Self {
        Expr::Attr {
            target: Box::new(target),
            name: name.into(),
        }
    }

    pub fn call(callee: Expr, args: Vec<Arg>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    /// Root identifier of a name or attribute chain (`a` for `a.b.c`).
    pub fn root_name(&self) -> Option<&str> {
        match self {
            Expr::Name(name) => Some(name),
            Expr::Attr { target, .. } | Expr::Index { target, .. } => target.root_name(),
            _ => None,
        }
    }

    /// Returns the precedence level of this expression's outermost form.
    pub fn precedence(&self) -> u8 {
        match self {
            Expr::Literal(lit) => lit.precedence(),
            Expr::Name(_)
            | Expr::List(_)
            | Expr::Map(_)
            | Expr::Attr { .. }
            | Expr::Index { .. }
            | Expr::Call { .. } => PREC_ATOM,
            Expr::Filter { .. } => PREC_FILTER,
            Expr::Test { .. } => PREC_COMPARE,
            Expr::Unary { op, .. } => op.precedence(),
            Expr::Binary { op, .. } => op.precedence(),
            Expr::Cond { .. } => PREC_COND,
        }
    }
}

fn write_child(f: &mut fmt::Formatter<'_>, child: &Expr, max: u8) -> fmt::Result {
    if child.precedence() > max {
        write!(f, "({child})")
    } else {
        write!(f, "{child}")
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Arg]) -> fmt::Result {
    f.write_char('(')?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        if let Some(name) = &arg.name {
            write!(f, "{name}=")?;
        }
        write!(f, "{}", arg.value)?;
    }
    f.write_char(')')
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(lit) => write!(f, "{lit}"),
            Expr::Name(name) => f.write_str(name),
            Expr::List(items) => {
                f.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_char(']')
            }
            Expr::Map(entries) => {
                f.write_char('{')?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_char('}')
            }
            Expr::Attr { target, name } => {
                write_child(f, target, PREC_ATOM)?;
                write!(f, ".{name}")
            }
            Expr::Index { target, index } => {
                write_child(f, target, PREC_ATOM)?;
                write!(f, "[{index}]")
            }
            Expr::Call { callee, args } => {
                write_child(f, callee, PREC_ATOM)?;
                write_args(f, args)
            }
            Expr::Filter { target, name, args } => {
                write_child(f, target, PREC_FILTER)?;
                write!(f, "|{name}")?;
                if args.is_empty() {
                    Ok(())
                } else {
                    write_args(f, args)
                }
            }
            Expr::Test {
                target,
                name,
                args,
                negated,
            } => {
                write_child(f, target, PREC_COMPARE)?;
                f.write_str(if *negated { " is not " } else { " is " })?;
                f.write_str(name)?;
                if args.is_empty() {
                    Ok(())
                } else {
                    write_args(f, args)
                }
            }
            Expr::Unary { op, operand } => {
                f.write_str(op.as_symbol())?;
                let text = if operand.precedence() > op.precedence() {
                    format!("({operand})")
                } else {
                    operand.to_string()
                };
                // `- -3` must not lex as a single token pair `--`.
                if *op != UnaryOp::Not && text.starts_with(['-', '+']) {
                    f.write_char(' ')?;
                }
                f.write_str(&text)
            }
            Expr::Binary { op, left, right } => {
                let prec = op.precedence();
                write_child(f, left, prec)?;
                write!(f, " {} ", op.as_symbol())?;
                write_child(f, right, prec - 1)
            }
            Expr::Cond {
                then,
                cond,
                otherwise,
            } => {
                write_child(f, then, PREC_COND - 1)?;
                f.write_str(" if ")?;
                write_child(f, cond, PREC_COND - 1)?;
                if let Some(otherwise) = otherwise {
                    f.write_str(" else ")?;
                    write_child(f, otherwise, PREC_COND)?;
                }
                Ok(())
            }
        }
    }
}
