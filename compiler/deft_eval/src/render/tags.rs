//! Tag handlers.
//!
//! Each handler either acts (the tag's inputs resolved) or re-emits itself as
//! template source with everything known folded in, after deferring the
//! names the emitted source reads.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;

use deft_ir::{Expr, IfBranch, MacroDef, Node, SetTarget, TagKind};
use deft_parse::parse_expr_list;

use super::{Region, Renderer};
use crate::builtins::iter_items;
use crate::classify::ResolutionResult;
use crate::config::ConflictPolicy;
use crate::context::{Binding, DeferredValue, FrameKind, IGNORED_NAME};
use crate::errors::{EvalError, RegionError, TemplateError};
use crate::eval::{Interrupt, Partial};
use crate::speculate::SpeculationConfig;
use crate::Value;

const LOOP_NAME: &str = "loop";

/// Build `{% keyword targets ... %}` header text.
fn join_targets<T: std::fmt::Display>(targets: &[T]) -> String {
    let mut out = String::new();
    for (i, target) in targets.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{target}");
    }
    out
}

impl Renderer<'_> {
    fn speculation(&self, deferred_execution: bool) -> SpeculationConfig {
        SpeculationConfig {
            take_new_value: false,
            discard_session_bindings: true,
            partial_macro_evaluation: false,
            check_for_context_changes: self.engine.config.check_for_context_changes,
            deferred_execution,
        }
    }

    // Output

    pub(super) fn render_output(&mut self, src: &str, out: &mut String) -> Result<(), RegionError> {
        if !self.scopes.in_deferred_execution() {
            if let Some(text) = self.partial_macro_call(src)? {
                return Ok(self.push(out, &text)?);
            }
        }
        match self.resolve_expression(src)? {
            ResolutionResult::Resolved(value) => {
                let text = self.render_value(&value);
                Ok(self.push(out, &text)?)
            }
            ResolutionResult::Partial {
                text,
                deferred_words,
            }
            | ResolutionResult::Deferred {
                text,
                deferred_words,
            } => {
                self.defer_words(&deferred_words, &[], &[]);
                self.counters.syntax += 1;
                Ok(self.push(out, &format!("{{{{ {text} }}}}"))?)
            }
        }
    }

    /// Evaluate `{{ m(args) }}` with known arguments by running the body in
    /// place, keeping whatever part of it stays deferred.
    ///
    /// Returns `None` when the output is not such a call.
    fn partial_macro_call(&mut self, src: &str) -> Result<Option<String>, RegionError> {
        let Ok(expr) = self.parse_cached(src) else {
            return Ok(None);
        };
        let Expr::Call { callee, args } = expr.as_ref() else {
            return Ok(None);
        };
        let Expr::Name(name) = callee.as_ref() else {
            return Ok(None);
        };
        let Some(Binding::Value(Value::Macro(def))) = self.scopes.get(name).cloned() else {
            return Ok(None);
        };
        let call_args = match self.pure_call_args(args) {
            Ok(Some(call_args)) => call_args,
            Ok(None) | Err(Interrupt::Eval(_)) => return Ok(None),
            Err(Interrupt::Region(e)) => return Err(e),
        };
        let config = SpeculationConfig {
            take_new_value: self.engine.config.conflict_policy == ConflictPolicy::TakeNew,
            partial_macro_evaluation: true,
            ..self.speculation(false)
        };
        let spec = self.execute_in_child_scope(config, |r| r.invoke_macro(&def, &call_args))?;
        let Some(region) = spec.result else {
            return Ok(None);
        };
        if !region.deferred {
            return Ok(Some(region.text));
        }
        self.apply_speculation(spec.bindings, &spec.new_keys);
        if region.bindings_emitted {
            return Ok(Some(self.child_scope_wrap(&region.text)?));
        }
        Ok(Some(region.text))
    }

    // Set

    pub(super) fn render_set(
        &mut self,
        targets: &[SetTarget],
        value: &str,
        out: &mut String,
    ) -> Result<(), RegionError> {
        self.check_enabled(TagKind::Set)?;
        let resolution = if targets.len() == 1 {
            self.resolve_expression(value)?
        } else {
            self.resolve_composite(value)?
        };
        let values = match &resolution {
            ResolutionResult::Resolved(v) => match self.unpack(targets.len(), v) {
                Ok(values) => Some(values),
                Err(error) => {
                    self.warn(TemplateError::eval(&error, self.span));
                    return Ok(());
                }
            },
            _ => None,
        };
        let emit = values.is_none()
            || self.scopes.in_deferred_execution()
            || targets.iter().any(|t| self.target_is_deferred(t));
        if !emit {
            for (target, v) in targets.iter().zip(values.unwrap_or_default()) {
                self.assign(target, v);
            }
            return Ok(());
        }

        let (text, words) = match resolution {
            ResolutionResult::Resolved(_) => self.resolved_source(value, targets.len(), values.as_deref())?,
            ResolutionResult::Partial {
                text,
                deferred_words,
            }
            | ResolutionResult::Deferred {
                text,
                deferred_words,
            } => (text, deferred_words),
        };
        let used: Vec<String> = targets
            .iter()
            .filter(|t| t.attr.is_some())
            .map(|t| t.name.clone())
            .collect();
        self.defer_words(&words, &[], &used);

        let in_speculation = self.scopes.in_deferred_execution();
        match values {
            Some(values) if in_speculation => {
                for (target, v) in targets.iter().zip(values) {
                    if target.attr.is_none() {
                        self.scopes.put(&target.name, v);
                    }
                }
            }
            _ => {
                for target in targets.iter().filter(|t| t.attr.is_none()) {
                    self.scopes
                        .put_binding(&target.name, Binding::Deferred(DeferredValue::Empty));
                }
            }
        }
        self.counters.syntax += 1;
        self.counters.bindings += 1;
        let tag = format!("{{% set {} = {text} %}}", join_targets(targets));
        Ok(self.push(out, &tag)?)
    }

    /// Split a resolved value over `count` targets.
    fn unpack(&self, count: usize, value: &Value) -> Result<Vec<Value>, EvalError> {
        if count == 1 {
            return Ok(vec![value.clone()]);
        }
        let mut items = match value {
            Value::List(id) => self.heap.items(*id).to_vec(),
            other => return Err(EvalError::NotIterable(other.type_name())),
        };
        if items.len() == 1 {
            if let Value::List(id) = &items[0] {
                items = self.heap.items(*id).to_vec();
            }
        }
        if items.len() != count {
            return Err(EvalError::UnpackMismatch {
                expected: count,
                got: items.len(),
            });
        }
        Ok(items)
    }

    /// Whether assigning `target` must stay syntax: the key is deferred in
    /// this frame, or the namespace it writes into is deferred.
    fn target_is_deferred(&self, target: &SetTarget) -> bool {
        match target.attr {
            Some(_) => self.scopes.get(&target.name).is_some_and(Binding::is_deferred),
            None => self
                .scopes
                .current()
                .slot(&target.name)
                .is_some_and(|slot| slot.binding.is_deferred()),
        }
    }

    fn assign(&mut self, target: &SetTarget, value: Value) {
        let Some(attr) = &target.attr else {
            self.scopes.put(&target.name, value);
            return;
        };
        match self.scopes.get(&target.name).and_then(Binding::value).cloned() {
            Some(Value::Namespace(id)) => self.heap.set_entry(id, attr, value),
            other => {
                let type_name = other.as_ref().map_or("none", Value::type_name);
                let error = EvalError::AttributeAssignment {
                    attr: attr.clone(),
                    type_name,
                };
                self.warn(TemplateError::eval(&error, self.span));
            }
        }
    }

    /// Source text re-emitting a resolved assignment, and the names it reads.
    ///
    /// Containers reached through names stay symbolic so the assignment
    /// keeps aliasing its source in pass two.
    fn resolved_source(
        &mut self,
        src: &str,
        count: usize,
        values: Option<&[Value]>,
    ) -> Result<(String, BTreeSet<String>), RegionError> {
        let exprs: Vec<Expr> = if count == 1 {
            self.parse_cached(src).map(|e| vec![(*e).clone()]).unwrap_or_default()
        } else {
            parse_expr_list(src).unwrap_or_default()
        };
        let values = values.unwrap_or_default();
        let text = if exprs.len() == values.len() {
            let parts: Vec<String> = values
                .iter()
                .zip(&exprs)
                .map(|(v, e)| self.residualize(Partial::Known(v.clone()), e).to_string())
                .collect();
            parts.join(", ")
        } else {
            let parts: Option<Vec<String>> = values.iter().map(|v| self.heap.literal(v)).collect();
            parts.map(|p| p.join(", ")).unwrap_or_else(|| src.trim().to_string())
        };
        let words = self.find_deferred_words(&text);
        Ok((text, words))
    }

    // Do

    pub(super) fn render_do(&mut self, src: &str, out: &mut String) -> Result<(), RegionError> {
        self.check_enabled(TagKind::Do)?;
        match self.resolve_expression(src)? {
            ResolutionResult::Resolved(_) => Ok(()),
            ResolutionResult::Partial {
                text,
                deferred_words,
            }
            | ResolutionResult::Deferred {
                text,
                deferred_words,
            } => {
                self.defer_words(&deferred_words, &[], &[]);
                self.counters.syntax += 1;
                Ok(self.push(out, &format!("{{% do {text} %}}"))?)
            }
        }
    }

    // If

    pub(super) fn render_if(
        &mut self,
        branches: &[IfBranch],
        otherwise: Option<&[Node]>,
        out: &mut String,
    ) -> Result<(), RegionError> {
        self.check_enabled(TagKind::If)?;
        for (i, branch) in branches.iter().enumerate() {
            match self.resolve_expression(&branch.cond)? {
                ResolutionResult::Resolved(cond) => {
                    if self.heap.truthy(&cond) {
                        return Ok(self.render_nodes(&branch.body, out)?);
                    }
                }
                ResolutionResult::Partial {
                    text,
                    deferred_words,
                }
                | ResolutionResult::Deferred {
                    text,
                    deferred_words,
                } => {
                    self.defer_words(&deferred_words, &[], &[]);
                    return self.render_deferred_if(text, &branch.body, &branches[i + 1..], otherwise, out);
                }
            }
        }
        if let Some(otherwise) = otherwise {
            self.render_nodes(otherwise, out)?;
        }
        Ok(())
    }

    /// Re-emit an `if` from its first undecidable condition on. Later
    /// conditions that resolve prune or close the chain.
    fn render_deferred_if(
        &mut self,
        cond: String,
        body: &[Node],
        rest: &[IfBranch],
        otherwise: Option<&[Node]>,
        out: &mut String,
    ) -> Result<(), RegionError> {
        let mut arms: Vec<(Option<String>, &[Node])> = vec![(Some(cond), body)];
        let mut closed = false;
        for branch in rest {
            match self.resolve_pure(&branch.cond)? {
                ResolutionResult::Resolved(v) => {
                    if self.heap.truthy(&v) {
                        arms.push((None, &branch.body));
                        closed = true;
                        break;
                    }
                }
                ResolutionResult::Partial {
                    text,
                    deferred_words,
                }
                | ResolutionResult::Deferred {
                    text,
                    deferred_words,
                } => {
                    self.defer_words(&deferred_words, &[], &[]);
                    arms.push((Some(text), &branch.body));
                }
            }
        }
        if let (false, Some(otherwise)) = (closed, otherwise) {
            arms.push((None, otherwise));
        }

        let mut text = String::new();
        for (i, (cond, body)) in arms.into_iter().enumerate() {
            match (i, cond) {
                (0, Some(cond)) => {
                    let _ = write!(text, "{{% if {cond} %}}");
                }
                (_, Some(cond)) => {
                    let _ = write!(text, "{{% elif {cond} %}}");
                }
                (_, None) => text.push_str("{% else %}"),
            }
            let arm = self.speculative_block(body)?;
            text.push_str(&arm);
        }
        text.push_str("{% endif %}");
        self.counters.syntax += 1;
        Ok(self.push(out, &text)?)
    }

    /// Render a body in deferred execution mode and defer whatever it
    /// would have changed.
    fn speculative_block(&mut self, body: &[Node]) -> Result<String, RegionError> {
        let spec = self.execute_in_child_scope(self.speculation(true), |r| {
            let mut text = String::new();
            r.render_nodes(body, &mut text)?;
            Ok(Region {
                text,
                deferred: true,
                bindings_emitted: false,
            })
        })?;
        self.apply_speculation(spec.bindings, &spec.new_keys);
        Ok(spec.result.text)
    }

    // For

    pub(super) fn render_for(
        &mut self,
        targets: &[String],
        iter: &str,
        body: &[Node],
        otherwise: Option<&[Node]>,
        out: &mut String,
    ) -> Result<(), RegionError> {
        self.check_enabled(TagKind::For)?;
        match self.resolve_expression(iter)? {
            ResolutionResult::Resolved(items) => self.render_loop(targets, &items, body, otherwise, out),
            ResolutionResult::Partial {
                text,
                deferred_words,
            }
            | ResolutionResult::Deferred {
                text,
                deferred_words,
            } => {
                self.defer_words(&deferred_words, &[], &[]);
                self.render_deferred_loop(targets, &text, body, otherwise, out)
            }
        }
    }

    fn render_loop(
        &mut self,
        targets: &[String],
        items: &Value,
        body: &[Node],
        otherwise: Option<&[Node]>,
        out: &mut String,
    ) -> Result<(), RegionError> {
        let items = match iter_items(&self.heap, items, "for") {
            Ok(items) => items,
            Err(_) => {
                let error = EvalError::NotIterable(items.type_name());
                self.warn(TemplateError::eval(&error, self.span));
                Vec::new()
            }
        };
        if items.is_empty() {
            if let Some(otherwise) = otherwise {
                self.render_nodes(otherwise, out)?;
            }
            return Ok(());
        }
        let length = items.len();
        for (index, item) in items.into_iter().enumerate() {
            let start = self.counters;
            self.scopes.push_frame(FrameKind::Loop)?;
            let result = self.render_iteration(targets, item, index, length, body);
            let (_, absorbed) = self.scopes.pop_frame();
            self.pending.extend(absorbed);
            let text = result?;
            if self.counters.bindings > start.bindings {
                let wrapped = self.child_scope_wrap(&text)?;
                self.push(out, &wrapped)?;
            } else {
                self.push(out, &text)?;
            }
        }
        Ok(())
    }

    fn render_iteration(
        &mut self,
        targets: &[String],
        item: Value,
        index: usize,
        length: usize,
        body: &[Node],
    ) -> Result<String, RegionError> {
        self.bind_loop_targets(targets, item);
        let loop_value = self.loop_info(index, length);
        self.scopes.put_meta(LOOP_NAME, Binding::Value(loop_value));
        let mut text = String::new();
        self.render_nodes(body, &mut text)?;
        Ok(text)
    }

    fn bind_loop_targets(&mut self, targets: &[String], item: Value) {
        if let [target] = targets {
            if target == IGNORED_NAME {
                self.scopes.put_meta(target, Binding::Value(item));
            } else {
                self.scopes.put(target, item);
            }
            return;
        }
        match self.unpack(targets.len(), &item) {
            Ok(values) => {
                for (target, v) in targets.iter().zip(values) {
                    self.scopes.put(target, v);
                }
            }
            Err(error) => {
                self.warn(TemplateError::eval(&error, self.span));
                for target in targets {
                    self.scopes.put(target, Value::None);
                }
            }
        }
    }

    fn loop_info(&mut self, index: usize, length: usize) -> Value {
        let as_int = |n: usize| Value::Int(i64::try_from(n).unwrap_or(i64::MAX));
        self.heap.new_map(vec![
            ("index".to_string(), as_int(index + 1)),
            ("index0".to_string(), as_int(index)),
            ("revindex".to_string(), as_int(length - index)),
            ("revindex0".to_string(), as_int(length - index - 1)),
            ("first".to_string(), Value::Bool(index == 0)),
            ("last".to_string(), Value::Bool(index + 1 == length)),
            ("length".to_string(), as_int(length)),
        ])
    }

    /// Re-emit a loop over a deferred iterable.
    ///
    /// The body runs twice in deferred execution mode: the first run defers
    /// everything the body touches, so the second renders it against the
    /// state every iteration of pass two will see.
    fn render_deferred_loop(
        &mut self,
        targets: &[String],
        iter: &str,
        body: &[Node],
        otherwise: Option<&[Node]>,
        out: &mut String,
    ) -> Result<(), RegionError> {
        self.speculative_loop_body(targets, body)?;
        let body_text = self.speculative_loop_body(targets, body)?;
        let mut text = format!("{{% for {} in {iter} %}}{body_text}", join_targets(targets));
        if let Some(otherwise) = otherwise {
            let otherwise_text = self.speculative_block(otherwise)?;
            text.push_str("{% else %}");
            text.push_str(&otherwise_text);
        }
        text.push_str("{% endfor %}");
        self.counters.syntax += 1;
        Ok(self.push(out, &text)?)
    }

    fn speculative_loop_body(&mut self, targets: &[String], body: &[Node]) -> Result<String, RegionError> {
        let spec = self.execute_in_child_scope(self.speculation(true), |r| {
            for target in targets {
                r.scopes.put_meta(target, Binding::Deferred(DeferredValue::Empty));
            }
            r.scopes.put_meta(LOOP_NAME, Binding::Deferred(DeferredValue::Empty));
            let mut text = String::new();
            r.render_nodes(body, &mut text)?;
            Ok(Region {
                text,
                deferred: true,
                bindings_emitted: false,
            })
        })?;
        // Names the body binds are local to each iteration.
        self.apply_speculation(spec.bindings, &[]);
        Ok(spec.result.text)
    }

    // Macro, raw, autoescape

    pub(super) fn render_macro_def(&mut self, def: &Arc<MacroDef>, out: &mut String) -> Result<(), RegionError> {
        self.check_enabled(TagKind::Macro)?;
        self.scopes.put(&def.name, Value::Macro(Arc::clone(def)));
        if self.scopes.in_deferred_execution() {
            self.counters.syntax += 1;
            self.counters.bindings += 1;
            self.push(out, &def.to_string())?;
        }
        Ok(())
    }

    pub(super) fn render_raw(&mut self, text: &str, out: &mut String) -> Result<(), RegionError> {
        self.check_enabled(TagKind::Raw)?;
        let text = self.protect_raw(text.to_string());
        Ok(self.push(out, &text)?)
    }

    pub(super) fn render_autoescape(
        &mut self,
        enabled: bool,
        body: &[Node],
        out: &mut String,
    ) -> Result<(), RegionError> {
        self.check_enabled(TagKind::Autoescape)?;
        let parent = self.scopes.current().autoescape;
        let start = self.counters;
        self.scopes.push_frame(FrameKind::Block)?;
        self.scopes.current_mut().autoescape = enabled;
        let mut text = String::new();
        let result = self.render_nodes(body, &mut text);
        let (_, absorbed) = self.scopes.pop_frame();
        self.pending.extend(absorbed);
        result?;
        if self.counters.syntax > start.syntax && enabled != parent {
            text = format!("{{% autoescape {enabled} %}}{text}{{% endautoescape %}}");
        }
        Ok(self.push(out, &text)?)
    }
}
