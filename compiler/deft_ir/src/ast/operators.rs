//! Binary and Unary Operators
//!
//! Precedence numbers follow one convention throughout the crate:
//! higher number = lower precedence (binds less tightly).

/// Binary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,

    // String concatenation
    Concat,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,

    // Logical
    And,
    Or,
}

impl BinaryOp {
    /// Returns the source-level symbol for this operator.
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::Concat => "~",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::And => "and",
            Self::Or => "or",
        }
    }

    /// Returns the precedence level of this operator.
    ///
    /// - 3: `**`
    /// - 4: `*` `/` `//` `%`
    /// - 5: `+` `-`
    /// - 6: `~`
    /// - 7: `==` `!=` `<` `<=` `>` `>=` `in` `not in`
    /// - 9: `and`
    /// - 10: `or`
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Pow => 3,
            Self::Mul | Self::Div | Self::FloorDiv | Self::Mod => 4,
            Self::Add | Self::Sub => 5,
            Self::Concat => 6,
            Self::Eq
            | Self::NotEq
            | Self::Lt
            | Self::LtEq
            | Self::Gt
            | Self::GtEq
            | Self::In
            | Self::NotIn => 7,
            Self::And => 9,
            Self::Or => 10,
        }
    }
}

/// Unary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

impl UnaryOp {
    /// Returns the source-level spelling, including any trailing space.
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Pos => "+",
            Self::Not => "not ",
        }
    }

    /// Returns the precedence level of this operator.
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Neg | Self::Pos => 2,
            Self::Not => 8,
        }
    }
}
