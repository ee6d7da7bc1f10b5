//! Template structure.
//!
//! Segments from the lexer are folded into a node tree with an explicit
//! stack of open blocks. Each open block collects the nodes of its current
//! body; `elif`/`else` move the collected body into the block's state and
//! start a fresh one.

use std::mem;
use std::sync::Arc;

use deft_ir::{IfBranch, MacroDef, MacroParam, Node, Span, TagKind, Template};
use deft_lexer::{segment, SegmentKind};

use super::tags::parse_autoescape_arg;
use crate::error::ParseErrorKind;
use crate::{ParseError, Parser};

enum OpenKind {
    Root,
    If {
        branches: Vec<IfBranch>,
        cond: String,
        cond_span: Span,
        in_else: bool,
    },
    For {
        targets: Vec<String>,
        iter: String,
        /// Set once `else` is seen.
        body: Option<Vec<Node>>,
    },
    Macro {
        name: String,
        params: Vec<MacroParam>,
    },
    Autoescape {
        enabled: bool,
    },
}

impl OpenKind {
    fn tag(&self) -> Option<TagKind> {
        match self {
            OpenKind::Root => None,
            OpenKind::If { .. } => Some(TagKind::If),
            OpenKind::For { .. } => Some(TagKind::For),
            OpenKind::Macro { .. } => Some(TagKind::Macro),
            OpenKind::Autoescape { .. } => Some(TagKind::Autoescape),
        }
    }
}

struct OpenBlock {
    kind: OpenKind,
    nodes: Vec<Node>,
    span: Span,
}

struct TemplateBuilder {
    stack: Vec<OpenBlock>,
}

/// Parse template source into a node tree.
#[tracing::instrument(level = "debug", skip_all, fields(len = src.len()))]
pub fn parse_template(src: &str) -> Result<Template, ParseError> {
    let mut builder = TemplateBuilder {
        stack: vec![OpenBlock {
            kind: OpenKind::Root,
            nodes: Vec::new(),
            span: Span::DUMMY,
        }],
    };

    for seg in segment(src)? {
        match seg.kind {
            SegmentKind::Text => builder.push(Node::Text(seg.text.to_string())),
            SegmentKind::Raw => builder.push(Node::Raw(seg.text.to_string())),
            SegmentKind::Expression => builder.push(Node::Output {
                expr: seg.text.to_string(),
                span: seg.span,
            }),
            SegmentKind::Statement => builder.statement(seg.text, seg.span)?,
        }
    }

    if builder.stack.len() > 1 {
        if let Some(open) = builder.stack.pop() {
            if let Some(tag) = open.kind.tag() {
                return Err(ParseError::new(
                    ParseErrorKind::UnclosedBlock { tag },
                    open.span,
                ));
            }
        }
    }
    let nodes = builder
        .stack
        .pop()
        .map(|root| root.nodes)
        .unwrap_or_default();
    tracing::debug!(nodes = nodes.len(), "parsed template");
    Ok(Template::new(nodes))
}

impl TemplateBuilder {
    fn push(&mut self, node: Node) {
        if let Some(top) = self.stack.last_mut() {
            top.nodes.push(node);
        }
    }

    fn open(&mut self, kind: OpenKind, span: Span) {
        self.stack.push(OpenBlock {
            kind,
            nodes: Vec::new(),
            span,
        });
    }

    fn statement(&mut self, text: &str, span: Span) -> Result<(), ParseError> {
        let (keyword, rest) = text
            .split_once(|c: char| c.is_ascii_whitespace())
            .unwrap_or((text, ""));
        let rest_offset = u32::try_from(text.len() - rest.len()).unwrap_or(0);
        let rest_span = Span::new(span.start + rest_offset, span.end);

        match keyword {
            "set" => {
                let mut parser = Parser::new(rest).map_err(|e| e.offset(rest_span.start))?;
                let set = parser
                    .parse_set_header()
                    .map_err(|e| e.offset(rest_span.start))?;
                self.push(Node::Set {
                    targets: set.targets,
                    value: set.value,
                    span,
                });
            }
            "do" => {
                if rest.trim().is_empty() {
                    return Err(ParseError::new(
                        ParseErrorKind::MalformedTag {
                            tag: TagKind::Do,
                            message: "missing expression".to_string(),
                        },
                        span,
                    ));
                }
                self.push(Node::Do {
                    expr: rest.trim().to_string(),
                    span: rest_span,
                });
            }
            "if" => self.open(
                OpenKind::If {
                    branches: Vec::new(),
                    cond: rest.trim().to_string(),
                    cond_span: rest_span,
                    in_else: false,
                },
                span,
            ),
            "elif" => self.elif(rest.trim(), rest_span, keyword)?,
            "else" => self.else_branch(span, keyword)?,
            "endif" => self.close_if(span, keyword)?,
            "for" => {
                let mut parser = Parser::new(rest).map_err(|e| e.offset(rest_span.start))?;
                let header = parser
                    .parse_for_header()
                    .map_err(|e| e.offset(rest_span.start))?;
                self.open(
                    OpenKind::For {
                        targets: header.targets,
                        iter: header.iter,
                        body: None,
                    },
                    span,
                );
            }
            "endfor" => self.close_for(span, keyword)?,
            "macro" => {
                let mut parser = Parser::new(rest).map_err(|e| e.offset(rest_span.start))?;
                let header = parser
                    .parse_macro_header()
                    .map_err(|e| e.offset(rest_span.start))?;
                self.open(
                    OpenKind::Macro {
                        name: header.name,
                        params: header.params,
                    },
                    span,
                );
            }
            "endmacro" => self.close_macro(span, keyword)?,
            "autoescape" => {
                let enabled = parse_autoescape_arg(rest, rest_span)?;
                self.open(OpenKind::Autoescape { enabled }, span);
            }
            "endautoescape" => self.close_autoescape(span, keyword)?,
            _ => {
                return Err(ParseError::new(
                    ParseErrorKind::UnknownTag(keyword.to_string()),
                    span,
                ))
            }
        }
        Ok(())
    }

    fn pop_matching(
        &mut self,
        tag: TagKind,
        span: Span,
        keyword: &str,
    ) -> Result<OpenBlock, ParseError> {
        match self.stack.last() {
            Some(top) if top.kind.tag() == Some(tag) => {
                self.stack.pop().ok_or_else(|| unexpected_end(keyword, span))
            }
            _ => Err(unexpected_end(keyword, span)),
        }
    }

    fn elif(&mut self, cond: &str, cond_span: Span, keyword: &str) -> Result<(), ParseError> {
        match self.stack.last_mut() {
            Some(OpenBlock {
                kind:
                    OpenKind::If {
                        branches,
                        cond: current,
                        cond_span: current_span,
                        in_else: false,
                    },
                nodes,
                ..
            }) => {
                branches.push(IfBranch {
                    cond: mem::replace(current, cond.to_string()),
                    body: mem::take(nodes),
                    span: mem::replace(current_span, cond_span),
                });
                Ok(())
            }
            _ => Err(unexpected_end(keyword, cond_span)),
        }
    }

    fn else_branch(&mut self, span: Span, keyword: &str) -> Result<(), ParseError> {
        match self.stack.last_mut() {
            Some(OpenBlock {
                kind:
                    OpenKind::If {
                        branches,
                        cond,
                        cond_span,
                        in_else,
                    },
                nodes,
                ..
            }) if !*in_else => {
                branches.push(IfBranch {
                    cond: mem::take(cond),
                    body: mem::take(nodes),
                    span: *cond_span,
                });
                *in_else = true;
                Ok(())
            }
            Some(OpenBlock {
                kind: OpenKind::For { body, .. },
                nodes,
                ..
            }) if body.is_none() => {
                *body = Some(mem::take(nodes));
                Ok(())
            }
            _ => Err(unexpected_end(keyword, span)),
        }
    }

    fn close_if(&mut self, span: Span, keyword: &str) -> Result<(), ParseError> {
        let open = self.pop_matching(TagKind::If, span, keyword)?;
        if let OpenKind::If {
            mut branches,
            cond,
            cond_span,
            in_else,
        } = open.kind
        {
            let otherwise = if in_else {
                Some(open.nodes)
            } else {
                branches.push(IfBranch {
                    cond,
                    body: open.nodes,
                    span: cond_span,
                });
                None
            };
            self.push(Node::If {
                branches,
                otherwise,
                span: open.span,
            });
        }
        Ok(())
    }

    fn close_for(&mut self, span: Span, keyword: &str) -> Result<(), ParseError> {
        let open = self.pop_matching(TagKind::For, span, keyword)?;
        if let OpenKind::For {
            targets,
            iter,
            body,
        } = open.kind
        {
            let (body, otherwise) = match body {
                Some(body) => (body, Some(open.nodes)),
                None => (open.nodes, None),
            };
            self.push(Node::For {
                targets,
                iter,
                body,
                otherwise,
                span: open.span,
            });
        }
        Ok(())
    }

    fn close_macro(&mut self, span: Span, keyword: &str) -> Result<(), ParseError> {
        let open = self.pop_matching(TagKind::Macro, span, keyword)?;
        if let OpenKind::Macro { name, params } = open.kind {
            self.push(Node::Macro(Arc::new(MacroDef {
                name,
                params,
                body: open.nodes,
                span: open.span,
            })));
        }
        Ok(())
    }

    fn close_autoescape(&mut self, span: Span, keyword: &str) -> Result<(), ParseError> {
        let open = self.pop_matching(TagKind::Autoescape, span, keyword)?;
        if let OpenKind::Autoescape { enabled } = open.kind {
            self.push(Node::Autoescape {
                enabled,
                body: open.nodes,
                span: open.span,
            });
        }
        Ok(())
    }
}

fn unexpected_end(keyword: &str, span: Span) -> ParseError {
    ParseError::new(
        ParseErrorKind::UnexpectedEndTag {
            found: keyword.to_string(),
        },
        span,
    )
}
