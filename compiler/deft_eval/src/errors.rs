//! Error types for rendering.
//!
//! Three tiers, matching how far a failure reaches:
//!
//! - [`EvalError`]: one expression could not be evaluated. Recorded as a
//!   warning; the expression resolves to `None`.
//! - [`ReconstructError`]: a region could not be turned back into template
//!   source. The node emits nothing and rendering continues.
//! - [`RenderError`]: a resource limit was hit. The whole call stops and
//!   returns what it had produced so far.
//!
//! Factory functions are the constructors used by the evaluator, so message
//! wording lives in one place.

use deft_ir::{Span, TagKind};
use deft_stack::DepthExceeded;
use thiserror::Error;

/// Failure that aborts the render call.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("output exceeded the maximum size of {limit} bytes (reached {size})")]
    OutputTooBig { limit: usize, size: usize },
    #[error("render depth exceeded the maximum of {limit}")]
    RecursionTooDeep { limit: usize },
}

impl From<DepthExceeded> for RenderError {
    fn from(e: DepthExceeded) -> Self {
        RenderError::RecursionTooDeep { limit: e.limit }
    }
}

/// Failure that aborts the current region (node).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReconstructError {
    #[error("cannot reconstruct the value of `{key}` as template source")]
    CannotReconstructValue { key: String },
    #[error("the `{tag}` tag is disabled")]
    DisabledFeature { tag: TagKind },
}

/// Either tier that escapes a region.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegionError {
    #[error(transparent)]
    Fatal(#[from] RenderError),
    #[error(transparent)]
    Reconstruct(#[from] ReconstructError),
}

impl From<DepthExceeded> for RegionError {
    fn from(e: DepthExceeded) -> Self {
        RegionError::Fatal(e.into())
    }
}

/// Expression-level evaluation failure.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("unknown filter `{0}`")]
    UnknownFilter(String),
    #[error("unknown test `{0}`")]
    UnknownTest(String),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("{type_name} has no method `{method}`")]
    NoSuchMethod {
        method: String,
        type_name: &'static str,
    },
    #[error("unsupported operand types for `{op}`: {left} and {right}")]
    BinaryTypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("bad operand type for unary `{op}`: {type_name}")]
    UnaryTypeMismatch {
        op: &'static str,
        type_name: &'static str,
    },
    #[error("`{name}` expected {expected}, got {got}")]
    WrongArgType {
        name: String,
        expected: &'static str,
        got: &'static str,
    },
    #[error("`{name}` takes {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: &'static str,
        got: usize,
    },
    #[error("`{name}` got an unexpected argument `{arg}`")]
    UnexpectedArgument { name: String, arg: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow in `{0}`")]
    IntegerOverflow(&'static str),
    #[error("index {0} out of range")]
    IndexOutOfRange(i64),
    #[error("{0} is not iterable")]
    NotIterable(&'static str),
    #[error("{0} is not callable")]
    NotCallable(&'static str),
    #[error("cannot unpack {got} value(s) into {expected} target(s)")]
    UnpackMismatch { expected: usize, got: usize },
    #[error("cannot assign attribute `{attr}` on {type_name}")]
    AttributeAssignment {
        attr: String,
        type_name: &'static str,
    },
    #[error("invalid argument for `{name}`: {message}")]
    InvalidArgument { name: String, message: String },
}

#[cold]
pub fn unknown_filter(name: &str) -> EvalError {
    EvalError::UnknownFilter(name.to_string())
}

#[cold]
pub fn unknown_test(name: &str) -> EvalError {
    EvalError::UnknownTest(name.to_string())
}

#[cold]
pub fn unknown_function(name: &str) -> EvalError {
    EvalError::UnknownFunction(name.to_string())
}

#[cold]
pub fn no_such_method(method: &str, type_name: &'static str) -> EvalError {
    EvalError::NoSuchMethod {
        method: method.to_string(),
        type_name,
    }
}

#[cold]
pub fn binary_type_mismatch(op: &'static str, left: &'static str, right: &'static str) -> EvalError {
    EvalError::BinaryTypeMismatch { op, left, right }
}

#[cold]
pub fn unary_type_mismatch(op: &'static str, type_name: &'static str) -> EvalError {
    EvalError::UnaryTypeMismatch { op, type_name }
}

#[cold]
pub fn wrong_arg_type(name: &str, expected: &'static str, got: &'static str) -> EvalError {
    EvalError::WrongArgType {
        name: name.to_string(),
        expected,
        got,
    }
}

#[cold]
pub fn wrong_arg_count(name: &str, expected: &'static str, got: usize) -> EvalError {
    EvalError::ArityMismatch {
        name: name.to_string(),
        expected,
        got,
    }
}

#[cold]
pub fn unexpected_argument(name: &str, arg: &str) -> EvalError {
    EvalError::UnexpectedArgument {
        name: name.to_string(),
        arg: arg.to_string(),
    }
}

#[cold]
pub fn invalid_argument(name: &str, message: impl Into<String>) -> EvalError {
    EvalError::InvalidArgument {
        name: name.to_string(),
        message: message.into(),
    }
}

/// Severity of a recorded error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The expression degraded to `None`; output is still usable.
    Warning,
    /// A region was dropped from the output.
    Error,
    /// The render call stopped early.
    Fatal,
}

/// Category of a recorded error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SyntaxError,
    EvalError,
    CannotReconstructValue,
    DisabledFeature,
    OutputTooBig,
    RecursionTooDeep,
}

/// One entry in a render call's error list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateError {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
}

impl TemplateError {
    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        TemplateError {
            kind: ErrorKind::SyntaxError,
            severity: Severity::Warning,
            message: message.into(),
            span,
        }
    }

    pub fn eval(error: &EvalError, span: Span) -> Self {
        TemplateError {
            kind: ErrorKind::EvalError,
            severity: Severity::Warning,
            message: error.to_string(),
            span,
        }
    }

    pub fn reconstruct(error: &ReconstructError, span: Span) -> Self {
        let kind = match error {
            ReconstructError::CannotReconstructValue { .. } => ErrorKind::CannotReconstructValue,
            ReconstructError::DisabledFeature { .. } => ErrorKind::DisabledFeature,
        };
        TemplateError {
            kind,
            severity: Severity::Error,
            message: error.to_string(),
            span,
        }
    }

    pub fn fatal(error: &RenderError, span: Span) -> Self {
        let kind = match error {
            RenderError::OutputTooBig { .. } => ErrorKind::OutputTooBig,
            RenderError::RecursionTooDeep { .. } => ErrorKind::RecursionTooDeep,
        };
        TemplateError {
            kind,
            severity: Severity::Fatal,
            message: error.to_string(),
            span,
        }
    }
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        write!(f, "{level} at {:?}: {}", self.span, self.message)
    }
}
