//! Engine, render context and results.
//!
//! An [`Engine`] holds configuration, the builtin registry and shared
//! globals. It is cheap to clone and safe to share across threads; each
//! render call builds its own [`Renderer`] and shares nothing mutable.

mod builder;

pub use builder::EngineBuilder;

use deft_ir::{Data, Template};
use deft_parse::{parse_template, ParseError};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::builtins::Builtins;
use crate::config::EngineConfig;
use crate::errors::{RenderError, TemplateError};
use crate::render::Renderer;
use crate::shared::{SharedMutableRegistry, SharedRegistry};

/// Template engine.
#[derive(Clone, Debug)]
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) builtins: SharedRegistry<Builtins>,
    pub(crate) globals: SharedMutableRegistry<FxHashMap<String, Data>>,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::builder().build()
    }
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse template source.
    pub fn parse(&self, src: &str) -> Result<Template, ParseError> {
        parse_template(src)
    }

    /// Bind a global visible to every later render call.
    ///
    /// Calls already running keep the globals they started with.
    pub fn set_global(&self, key: impl Into<String>, value: impl Into<Data>) {
        self.globals.write().insert(key.into(), value.into());
    }

    /// Render `template` against `context`.
    ///
    /// Never fails as a whole: warnings and dropped regions are listed in
    /// [`Rendered::errors`], and a call stopped by a resource limit returns
    /// the output produced so far with [`Rendered::fatal`] set.
    #[tracing::instrument(level = "debug", skip_all, fields(nodes = template.nodes.len()))]
    pub fn render(&self, template: &Template, context: &Context) -> Rendered {
        let mut renderer = Renderer::new(self, context);
        let mut output = String::new();
        let fatal = renderer.render_nodes(&template.nodes, &mut output).err();
        if let Some(error) = &fatal {
            tracing::debug!(%error, "render aborted");
            renderer.errors.push(TemplateError::fatal(error, renderer.span));
        }
        tracing::debug!(
            errors = renderer.errors.len(),
            deferred_syntax = renderer.counters.syntax,
            "render finished"
        );
        Rendered {
            output,
            errors: renderer.errors,
            fatal,
        }
    }

    /// A renderer over `context` for evaluating single expressions.
    pub fn renderer(&self, context: &Context) -> Renderer<'_> {
        Renderer::new(self, context)
    }

    /// Parse and render in one step.
    pub fn render_str(&self, src: &str, context: &Context) -> Result<Rendered, ParseError> {
        let template = self.parse(src)?;
        Ok(self.render(&template, context))
    }

    /// Render independent calls in parallel, results in input order.
    pub fn render_all(&self, jobs: &[(&Template, &Context)]) -> Vec<Rendered> {
        jobs.par_iter()
            .map(|(template, context)| self.render(template, context))
            .collect()
    }
}

/// Data for one render call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Context {
    data: Vec<(String, Data)>,
    deferred: Vec<String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to known data.
    #[must_use]
    pub fn insert(mut self, key: impl Into<String>, value: impl Into<Data>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.data.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.data.push((key, value)),
        }
        self
    }

    /// Mark `key` as unknown to this pass.
    #[must_use]
    pub fn defer(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        if !self.deferred.contains(&key) {
            self.deferred.push(key);
        }
        self
    }

    pub fn data(&self) -> &[(String, Data)] {
        &self.data
    }

    pub fn deferred(&self) -> &[String] {
        &self.deferred
    }
}

/// Result of one render call.
#[derive(Clone, Debug, PartialEq)]
pub struct Rendered {
    pub output: String,
    pub errors: Vec<TemplateError>,
    /// Set when the call stopped early.
    pub fatal: Option<RenderError>,
}

impl Rendered {
    /// Whether the call finished with nothing recorded.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.fatal.is_none()
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
