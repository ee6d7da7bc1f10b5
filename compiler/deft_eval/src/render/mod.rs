//! The per-call renderer.
//!
//! One [`Renderer`] exists per render call. It owns everything mutable
//! about the call (heap, scope chain, alias groups, error list, counters),
//! so concurrent calls on one engine share nothing but the engine's
//! read-only registries.
//!
//! # Regions
//!
//! Every node renders into a scratch buffer. When it succeeds, the node's
//! reconstruction prefix (bindings deferred while rendering it) is written
//! first, then the buffer. A reconstruction failure drops the node from the
//! output and is recorded; a resource limit aborts the call.
//!
//! # Module Structure
//!
//! - `tags`: one handler per tag kind
//! - `macros`: macro invocation

mod macros;
mod tags;

use std::mem;
use std::rc::Rc;

use deft_ir::{Expr, Node, Span, TagKind};
use deft_stack::ensure_sufficient_stack;
use rustc_hash::FxHashMap;

use crate::alias::AliasTable;
use crate::context::{Binding, DeferredValue, ScopeChain, IGNORED_NAME};
use crate::engine::{Context, Engine};
use crate::errors::{ReconstructError, RegionError, RenderError, TemplateError};
use crate::value::escape_html;
use crate::{Heap, Value};

pub(crate) use macros::Region;

/// Deferred syntax and reconstructed bindings emitted so far.
///
/// Callers snapshot the counters around a region and compare afterwards to
/// learn whether the region emitted anything deferred.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Counters {
    pub syntax: usize,
    pub bindings: usize,
}

/// State of one render call.
pub struct Renderer<'e> {
    pub(crate) engine: &'e Engine,
    pub(crate) heap: Heap,
    pub(crate) scopes: ScopeChain,
    pub(crate) aliases: AliasTable,
    pub(crate) errors: Vec<TemplateError>,
    /// Deferrals waiting for reconstruction at the current level.
    pub(crate) pending: Vec<(String, Value)>,
    pub(crate) counters: Counters,
    /// Span of the node being rendered, for error reports.
    pub(crate) span: Span,
    pub(crate) exprs: FxHashMap<String, Rc<Expr>>,
    /// Whether the call started with deferred keys.
    partial: bool,
}

impl<'e> Renderer<'e> {
    /// Set up a call: globals first, then context data, then deferred keys.
    pub(crate) fn new(engine: &'e Engine, context: &Context) -> Self {
        let config = &engine.config;
        let mut heap = Heap::new();
        let mut scopes = ScopeChain::new(config.autoescape, config.max_render_depth);
        {
            let globals = engine.globals.read();
            let mut names: Vec<_> = globals.keys().collect();
            names.sort();
            for name in names {
                let value = heap.import(&globals[name]);
                scopes.put(name, value);
            }
        }
        for (key, data) in context.data() {
            let value = heap.import(data);
            scopes.put(key, value);
        }
        for key in context.deferred() {
            scopes.put_binding(key, Binding::Deferred(DeferredValue::Empty));
        }
        Renderer {
            engine,
            heap,
            scopes,
            aliases: AliasTable::default(),
            errors: Vec::new(),
            pending: Vec::new(),
            counters: Counters::default(),
            span: Span::DUMMY,
            exprs: FxHashMap::default(),
            partial: !context.deferred().is_empty(),
        }
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn scopes(&self) -> &ScopeChain {
        &self.scopes
    }

    /// Errors recorded so far.
    pub fn errors(&self) -> &[TemplateError] {
        &self.errors
    }

    /// Render a node sequence into `out`.
    pub(crate) fn render_nodes(&mut self, nodes: &[Node], out: &mut String) -> Result<(), RenderError> {
        for node in nodes {
            ensure_sufficient_stack(|| self.render_node(node, out))?;
        }
        Ok(())
    }

    fn render_node(&mut self, node: &Node, out: &mut String) -> Result<(), RenderError> {
        let mark = self.pending.len();
        let span = node.span();
        let saved = if span == Span::DUMMY {
            self.span
        } else {
            mem::replace(&mut self.span, span)
        };
        let mut body = String::new();
        let result = self
            .render_node_inner(node, &mut body)
            .and_then(|()| self.flush_pending(mark));
        let outcome = match result {
            Ok(prefix) => self.push(out, &prefix).and_then(|()| self.push(out, &body)),
            Err(RegionError::Reconstruct(e)) => {
                tracing::debug!(error = %e, "region dropped");
                self.pending.truncate(mark);
                self.errors.push(TemplateError::reconstruct(&e, self.span));
                Ok(())
            }
            Err(RegionError::Fatal(e)) => Err(e),
        };
        self.span = saved;
        outcome
    }

    fn render_node_inner(&mut self, node: &Node, out: &mut String) -> Result<(), RegionError> {
        match node {
            Node::Text(text) => Ok(self.push(out, text)?),
            Node::Output { expr, .. } => self.render_output(expr, out),
            Node::Set { targets, value, .. } => self.render_set(targets, value, out),
            Node::If {
                branches,
                otherwise,
                ..
            } => self.render_if(branches, otherwise.as_deref(), out),
            Node::For {
                targets,
                iter,
                body,
                otherwise,
                ..
            } => self.render_for(targets, iter, body, otherwise.as_deref(), out),
            Node::Macro(def) => self.render_macro_def(def, out),
            Node::Do { expr, .. } => self.render_do(expr, out),
            Node::Raw(text) => self.render_raw(text, out),
            Node::Autoescape { enabled, body, .. } => self.render_autoescape(*enabled, body, out),
        }
    }

    /// Reconstruct the deferrals queued since `mark`.
    fn flush_pending(&mut self, mark: usize) -> Result<String, RegionError> {
        if self.pending.len() <= mark {
            return Ok(String::new());
        }
        let batch = self.pending.split_off(mark);
        Ok(self.reconstruct(&batch)?)
    }

    /// Append to a buffer, enforcing the output size limit.
    pub(crate) fn push(&self, out: &mut String, text: &str) -> Result<(), RenderError> {
        if let Some(limit) = self.engine.config.max_output_size {
            let size = out.len() + text.len();
            if size > limit {
                return Err(RenderError::OutputTooBig { limit, size });
            }
        }
        out.push_str(text);
        Ok(())
    }

    /// Record a non-fatal error at the current node.
    pub(crate) fn warn(&mut self, error: TemplateError) {
        tracing::debug!(message = %error.message, "template warning");
        self.errors.push(error);
    }

    /// Fail the region if `tag` is disabled.
    pub(crate) fn check_enabled(&self, tag: TagKind) -> Result<(), ReconstructError> {
        if self.engine.config.disabled.is_disabled(tag) {
            return Err(ReconstructError::DisabledFeature { tag });
        }
        Ok(())
    }

    /// Text of a resolved value as it appears in the output.
    pub(crate) fn render_value(&self, value: &Value) -> String {
        let text = self.heap.display(value);
        let text = if self.scopes.current().autoescape && !matches!(value, Value::Markup(_)) {
            escape_html(&text)
        } else {
            text
        };
        self.protect_raw(text)
    }

    /// Wrap resolved text in a raw block when pass two would otherwise read
    /// template syntax inside it.
    pub(crate) fn protect_raw(&self, text: String) -> String {
        let looks_like_syntax = text.contains("{{") || text.contains("{%") || text.contains("{#");
        if self.partial && self.engine.config.preserve_raw && looks_like_syntax {
            format!("{{% raw %}}{text}{{% endraw %}}")
        } else {
            text
        }
    }

    /// Wrap text that emitted bindings so they stay local in pass two.
    pub(crate) fn child_scope_wrap(&self, text: &str) -> Result<String, ReconstructError> {
        self.check_enabled(TagKind::For)?;
        Ok(format!(
            "{{% for {IGNORED_NAME} in [0] %}}{text}{{% endfor %}}"
        ))
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
