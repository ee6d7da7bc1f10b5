//! Template node tree.
//!
//! Tag expressions are stored as source text rather than parsed trees. The
//! evaluator parses them when it resolves them, which is what lets a
//! malformed expression degrade to a warning instead of failing the whole
//! template.
//!
//! `Display` prints template source for every node; the reconstructor relies
//! on this to re-emit macro definitions and deferred blocks verbatim.

use std::fmt;
use std::sync::Arc;

use crate::Span;

/// Assignment target of a `set` tag: `name` or `name.attr`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SetTarget {
    pub name: String,
    pub attr: Option<String>,
}

impl SetTarget {
    pub fn name(name: impl Into<String>) -> Self {
        SetTarget {
            name: name.into(),
            attr: None,
        }
    }
}

impl fmt::Display for SetTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attr {
            Some(attr) => write!(f, "{}.{attr}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// One `if`/`elif` arm.
#[derive(Clone, Debug, PartialEq)]
pub struct IfBranch {
    pub cond: String,
    pub body: Vec<Node>,
    pub span: Span,
}

/// Macro parameter with optional default expression source.
#[derive(Clone, Debug, PartialEq)]
pub struct MacroParam {
    pub name: String,
    pub default: Option<String>,
}

/// A `{% macro %}` definition.
///
/// Shared behind `Arc` so macro values can point back at their definition
/// without copying the body.
#[derive(Clone, Debug, PartialEq)]
pub struct MacroDef {
    pub name: String,
    pub params: Vec<MacroParam>,
    pub body: Vec<Node>,
    pub span: Span,
}

impl fmt::Display for MacroDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{% macro {}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&param.name)?;
            if let Some(default) = &param.default {
                write!(f, "={default}")?;
            }
        }
        f.write_str(") %}")?;
        write_nodes(f, &self.body)?;
        f.write_str("{% endmacro %}")
    }
}

/// Template node.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Text(String),
    Output {
        expr: String,
        span: Span,
    },
    Set {
        targets: Vec<SetTarget>,
        value: String,
        span: Span,
    },
    If {
        branches: Vec<IfBranch>,
        otherwise: Option<Vec<Node>>,
        span: Span,
    },
    For {
        targets: Vec<String>,
        iter: String,
        body: Vec<Node>,
        otherwise: Option<Vec<Node>>,
        span: Span,
    },
    Macro(Arc<MacroDef>),
    Do {
        expr: String,
        span: Span,
    },
    Raw(String),
    Autoescape {
        enabled: bool,
        body: Vec<Node>,
        span: Span,
    },
}

impl Node {
    /// Span of the node's opening tag, or `Span::DUMMY` for text.
    pub fn span(&self) -> Span {
        match self {
            Node::Text(_) | Node::Raw(_) => Span::DUMMY,
            Node::Output { span, .. }
            | Node::Set { span, .. }
            | Node::If { span, .. }
            | Node::For { span, .. }
            | Node::Do { span, .. }
            | Node::Autoescape { span, .. } => *span,
            Node::Macro(def) => def.span,
        }
    }
}

/// Write a node sequence as template source.
pub fn write_nodes(f: &mut fmt::Formatter<'_>, nodes: &[Node]) -> fmt::Result {
    for node in nodes {
        write!(f, "{node}")?;
    }
    Ok(())
}

fn write_targets(f: &mut fmt::Formatter<'_>, targets: &[impl fmt::Display]) -> fmt::Result {
    for (i, target) in targets.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{target}")?;
    }
    Ok(())
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(text) => f.write_str(text),
            Node::Output { expr, .. } => write!(f, "{{{{ {expr} }}}}"),
            Node::Set { targets, value, .. } => {
                f.write_str("{% set ")?;
                write_targets(f, targets)?;
                write!(f, " = {value} %}}")
            }
            Node::If {
                branches,
                otherwise,
                ..
            } => {
                for (i, branch) in branches.iter().enumerate() {
                    let keyword = if i == 0 { "if" } else { "elif" };
                    write!(f, "{{% {keyword} {} %}}", branch.cond)?;
                    write_nodes(f, &branch.body)?;
                }
                if let Some(otherwise) = otherwise {
                    f.write_str("{% else %}")?;
                    write_nodes(f, otherwise)?;
                }
                f.write_str("{% endif %}")
            }
            Node::For {
                targets,
                iter,
                body,
                otherwise,
                ..
            } => {
                f.write_str("{% for ")?;
                write_targets(f, targets)?;
                write!(f, " in {iter} %}}")?;
                write_nodes(f, body)?;
                if let Some(otherwise) = otherwise {
                    f.write_str("{% else %}")?;
                    write_nodes(f, otherwise)?;
                }
                f.write_str("{% endfor %}")
            }
            Node::Macro(def) => write!(f, "{def}"),
            Node::Do { expr, .. } => write!(f, "{{% do {expr} %}}"),
            Node::Raw(text) => write!(f, "{{% raw %}}{text}{{% endraw %}}"),
            Node::Autoescape { enabled, body, .. } => {
                write!(f, "{{% autoescape {enabled} %}}")?;
                write_nodes(f, body)?;
                f.write_str("{% endautoescape %}")
            }
        }
    }
}

/// A parsed template.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Template {
    pub nodes: Vec<Node>,
}

impl Template {
    pub fn new(nodes: Vec<Node>) -> Self {
        Template { nodes }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_nodes(f, &self.nodes)
    }
}
