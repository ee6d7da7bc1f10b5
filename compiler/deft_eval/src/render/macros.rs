//! Macro invocation.

use std::sync::Arc;

use deft_ir::MacroDef;

use super::Renderer;
use crate::builtins::CallArgs;
use crate::errors::{invalid_argument, unexpected_argument, RegionError, TemplateError};
use crate::eval::{EvalFlags, EvalOutcome};
use crate::speculate::Speculative;
use crate::Value;

/// Output of a rendered region.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Region {
    pub text: String,
    /// The region emitted deferred syntax.
    pub deferred: bool,
    /// The region emitted reconstructed bindings.
    pub bindings_emitted: bool,
}

impl Speculative for Region {
    fn is_resolved(&self) -> bool {
        !self.deferred
    }
}

/// `None` when the call could not be evaluated at all (a parameter default
/// depends on deferred data).
impl Speculative for Option<Region> {
    fn is_resolved(&self) -> bool {
        self.as_ref().is_some_and(Speculative::is_resolved)
    }
}

impl Renderer<'_> {
    /// Run a macro body with `args` bound to its parameters.
    pub(crate) fn invoke_macro(
        &mut self,
        def: &Arc<MacroDef>,
        args: &CallArgs,
    ) -> Result<Option<Region>, RegionError> {
        tracing::debug!(name = %def.name, "invoking macro");
        self.scopes.push_macro_frame(&def.name)?;
        let result = self.run_macro_body(def, args);
        let (_, absorbed) = self.scopes.pop_frame();
        self.pending.extend(absorbed);
        result
    }

    fn run_macro_body(
        &mut self,
        def: &MacroDef,
        args: &CallArgs,
    ) -> Result<Option<Region>, RegionError> {
        if args.positional.len() > def.params.len() {
            let error = invalid_argument(
                &def.name,
                format!(
                    "takes at most {} positional argument(s), got {}",
                    def.params.len(),
                    args.positional.len()
                ),
            );
            self.warn(TemplateError::eval(&error, self.span));
        }
        for (name, _) in &args.named {
            if !def.params.iter().any(|p| &p.name == name) {
                let error = unexpected_argument(&def.name, name);
                self.warn(TemplateError::eval(&error, self.span));
            }
        }
        for (i, param) in def.params.iter().enumerate() {
            let value = match args.get(i, &param.name) {
                Some(v) => v.clone(),
                None => match &param.default {
                    Some(src) => match self.evaluate(src, EvalFlags::empty())? {
                        EvalOutcome::Evaluated(v) => v,
                        EvalOutcome::FullyDeferred(_) | EvalOutcome::PartiallyDeferred(_) => {
                            return Ok(None)
                        }
                        EvalOutcome::SyntaxError(message) => {
                            self.warn(TemplateError::syntax(message, self.span));
                            Value::None
                        }
                        EvalOutcome::Failed(error) => {
                            self.warn(TemplateError::eval(&error, self.span));
                            Value::None
                        }
                    },
                    None => Value::None,
                },
            };
            self.scopes.put(&param.name, value);
        }
        let start = self.counters;
        let mut text = String::new();
        self.render_nodes(&def.body, &mut text)?;
        Ok(Some(Region {
            text,
            deferred: self.counters.syntax > start.syntax,
            bindings_emitted: self.counters.bindings > start.bindings,
        }))
    }
}
