//! Partial expression evaluator.
//!
//! Every sub-expression evaluates to either a known [`Value`] or a residual
//! [`Expr`]: the part that depends on deferred bindings, with everything
//! knowable already folded in. The residual prints back to source through
//! `Expr`'s `Display`, which is the text the renderer emits for pass two.
//!
//! # Inlining
//!
//! Known primitives are inlined as literals. Known containers are inlined
//! only when freshly built by the expression (`[a, 1]`, `x + [1]`): a
//! container reached through a name, attribute, index, filter or call keeps
//! its original sub-expression so its identity survives into pass two. The
//! exception is a sub-expression that ran a mutating method, which is inlined
//! so pass two does not repeat the mutation.
//!
//! # Pure mode
//!
//! Operands whose evaluation is conditional on something unknown (the right
//! side of `and`/`or` after a residual left side, both arms of a residual
//! conditional) and every expression in deferred execution mode are
//! evaluated in pure mode: mutating methods and macro calls are not run and
//! stay residual.

mod methods;
mod operators;

use std::rc::Rc;
use std::sync::Arc;

use bitflags::bitflags;
use deft_ir::{Arg, BinaryOp, Expr, Literal, MacroDef};
use deft_parse::parse_expr;
use deft_stack::ensure_sufficient_stack;

use crate::builtins::CallArgs;
use crate::context::Binding;
use crate::errors::{
    unknown_filter, unknown_function, unknown_test, EvalError, ReconstructError, RegionError,
    RenderError,
};
use crate::render::Renderer;
use crate::speculate::SpeculationConfig;
use crate::Value;

pub(crate) use methods::{call_method, is_mutating};

bitflags! {
    /// Evaluation options.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct EvalFlags: u8 {
        /// Never run mutating methods or macro calls.
        const PURE = 1 << 0;
    }
}

/// Result of evaluating one expression source.
#[derive(Clone, Debug, PartialEq)]
pub enum EvalOutcome {
    Evaluated(Value),
    /// The source did not parse; holds the parser message.
    SyntaxError(String),
    /// Nothing could be resolved; holds the original source.
    FullyDeferred(String),
    /// Some parts resolved; holds the residual source.
    PartiallyDeferred(String),
    Failed(EvalError),
}

/// Sub-expression result.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Partial {
    Known(Value),
    Residual(Expr),
}

impl Partial {
    #[inline]
    fn is_known(&self) -> bool {
        matches!(self, Partial::Known(_))
    }
}

/// Why evaluation stopped early.
#[derive(Debug)]
pub(crate) enum Interrupt {
    Eval(EvalError),
    Region(RegionError),
}

impl From<EvalError> for Interrupt {
    fn from(e: EvalError) -> Self {
        Interrupt::Eval(e)
    }
}

impl From<RegionError> for Interrupt {
    fn from(e: RegionError) -> Self {
        Interrupt::Region(e)
    }
}

impl From<RenderError> for Interrupt {
    fn from(e: RenderError) -> Self {
        Interrupt::Region(e.into())
    }
}

impl From<ReconstructError> for Interrupt {
    fn from(e: ReconstructError) -> Self {
        Interrupt::Region(e.into())
    }
}

type PartialResult = Result<Partial, Interrupt>;

/// Evaluated arguments of one call.
struct ArgParts {
    parts: Vec<(Option<String>, Partial)>,
}

impl ArgParts {
    fn all_known(&self) -> bool {
        self.parts.iter().all(|(_, p)| p.is_known())
    }

    /// Concrete arguments; callers check [`all_known`](Self::all_known) first.
    fn values(&self) -> CallArgs {
        let mut args = CallArgs::default();
        for (name, part) in &self.parts {
            let Partial::Known(v) = part else { continue };
            match name {
                Some(name) => args.named.push((name.clone(), v.clone())),
                None => args.positional.push(v.clone()),
            }
        }
        args
    }
}

/// Whether `expr` builds a new container rather than reaching an existing one.
fn builds_fresh(expr: &Expr) -> bool {
    matches!(expr, Expr::List(_) | Expr::Map(_) | Expr::Binary { .. })
}

/// Whether evaluating `expr` may run a mutating method.
fn runs_mutation(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(_) | Expr::Name(_) => false,
        Expr::List(items) => items.iter().any(runs_mutation),
        Expr::Map(entries) => entries
            .iter()
            .any(|(k, v)| runs_mutation(k) || runs_mutation(v)),
        Expr::Attr { target, .. } => runs_mutation(target),
        Expr::Index { target, index } => runs_mutation(target) || runs_mutation(index),
        Expr::Call { callee, args } => {
            let mutating = matches!(callee.as_ref(), Expr::Attr { name, .. } if is_mutating(name));
            mutating || runs_mutation(callee) || args.iter().any(|a| runs_mutation(&a.value))
        }
        Expr::Filter { target, args, .. } | Expr::Test { target, args, .. } => {
            runs_mutation(target) || args.iter().any(|a| runs_mutation(&a.value))
        }
        Expr::Unary { operand, .. } => runs_mutation(operand),
        Expr::Binary { left, right, .. } => runs_mutation(left) || runs_mutation(right),
        Expr::Cond {
            then,
            cond,
            otherwise,
        } => {
            runs_mutation(then)
                || runs_mutation(cond)
                || otherwise.as_deref().is_some_and(runs_mutation)
        }
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::None => Value::None,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(x) => Value::Float(*x),
        Literal::Str(s) => Value::str(s.as_str()),
    }
}

impl Renderer<'_> {
    /// Parse expression source, caching successful parses for the call.
    pub(crate) fn parse_cached(&mut self, src: &str) -> Result<Rc<Expr>, String> {
        if let Some(expr) = self.exprs.get(src) {
            return Ok(Rc::clone(expr));
        }
        let expr = Rc::new(parse_expr(src).map_err(|e| e.to_string())?);
        self.exprs.insert(src.to_string(), Rc::clone(&expr));
        Ok(expr)
    }

    /// Evaluate expression source as far as the current bindings allow.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn evaluate(&mut self, src: &str, flags: EvalFlags) -> Result<EvalOutcome, RegionError> {
        let expr = match self.parse_cached(src) {
            Ok(expr) => expr,
            Err(message) => return Ok(EvalOutcome::SyntaxError(message)),
        };
        let pure = flags.contains(EvalFlags::PURE) || self.scopes.in_deferred_execution();
        match self.eval_partial(&expr, pure) {
            Ok(Partial::Known(v)) => Ok(EvalOutcome::Evaluated(v)),
            Ok(Partial::Residual(residual)) => {
                if residual == *expr {
                    Ok(EvalOutcome::FullyDeferred(src.to_string()))
                } else {
                    Ok(EvalOutcome::PartiallyDeferred(residual.to_string()))
                }
            }
            Err(Interrupt::Eval(e)) => Ok(EvalOutcome::Failed(e)),
            Err(Interrupt::Region(e)) => Err(e),
        }
    }

    pub(crate) fn eval_partial(&mut self, expr: &Expr, pure: bool) -> PartialResult {
        ensure_sufficient_stack(|| self.eval_inner(expr, pure))
    }

    fn eval_inner(&mut self, expr: &Expr, pure: bool) -> PartialResult {
        match expr {
            Expr::Literal(lit) => Ok(Partial::Known(literal_value(lit))),
            Expr::Name(name) => Ok(self.lookup_name(name)),
            Expr::List(items) => self.eval_list(items, pure),
            Expr::Map(entries) => self.eval_map(entries, pure),
            Expr::Attr { target, name } => match self.eval_partial(target, pure)? {
                Partial::Known(v) => Ok(Partial::Known(self.get_attr(&v, name))),
                Partial::Residual(t) => Ok(Partial::Residual(Expr::attr(t, name.clone()))),
            },
            Expr::Index { target, index } => {
                let t = self.eval_partial(target, pure)?;
                let i = self.eval_partial(index, pure)?;
                match (t, i) {
                    (Partial::Known(t), Partial::Known(i)) => {
                        Ok(Partial::Known(self.get_index(&t, &i)))
                    }
                    (t, i) => Ok(Partial::Residual(Expr::Index {
                        target: Box::new(self.residualize(t, target)),
                        index: Box::new(self.residualize(i, index)),
                    })),
                }
            }
            Expr::Call { callee, args } => self.eval_call(callee, args, pure),
            Expr::Filter { target, name, args } => {
                let filter = self
                    .engine
                    .builtins
                    .filter(name)
                    .ok_or_else(|| unknown_filter(name))?;
                let t = self.eval_partial(target, pure)?;
                let parts = self.eval_args(args, pure)?;
                match t {
                    Partial::Known(v) if parts.all_known() => {
                        let call_args = parts.values();
                        Ok(Partial::Known(filter(&mut self.heap, &v, &call_args)?))
                    }
                    t => Ok(Partial::Residual(Expr::Filter {
                        target: Box::new(self.residualize(t, target)),
                        name: name.clone(),
                        args: self.residual_args(parts, args),
                    })),
                }
            }
            Expr::Test {
                target,
                name,
                args,
                negated,
            } => self.eval_test(expr, target, name, args, *negated, pure),
            Expr::Unary { op, operand } => match self.eval_partial(operand, pure)? {
                Partial::Known(v) => Ok(Partial::Known(operators::unary(&self.heap, *op, &v)?)),
                p => Ok(Partial::Residual(Expr::Unary {
                    op: *op,
                    operand: Box::new(self.residualize(p, operand)),
                })),
            },
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right, pure),
            Expr::Cond {
                then,
                cond,
                otherwise,
            } => match self.eval_partial(cond, pure)? {
                Partial::Known(c) => {
                    if self.heap.truthy(&c) {
                        self.eval_partial(then, pure)
                    } else {
                        match otherwise {
                            Some(otherwise) => self.eval_partial(otherwise, pure),
                            None => Ok(Partial::Known(Value::None)),
                        }
                    }
                }
                Partial::Residual(c) => {
                    let t = self.eval_partial(then, true)?;
                    let o = match otherwise {
                        Some(o) => Some(self.eval_partial(o, true)?),
                        None => None,
                    };
                    Ok(Partial::Residual(Expr::Cond {
                        then: Box::new(self.residualize(t, then)),
                        cond: Box::new(c),
                        otherwise: match (o, otherwise) {
                            (Some(o), Some(original)) => Some(Box::new(self.residualize(o, original))),
                            _ => None,
                        },
                    }))
                }
            },
        }
    }

    /// Scope lookup, then the function registry, then `None`.
    fn lookup_name(&self, name: &str) -> Partial {
        match self.scopes.get(name) {
            Some(Binding::Value(v)) => Partial::Known(v.clone()),
            Some(Binding::Deferred(_)) => Partial::Residual(Expr::name(name)),
            None => match self.engine.builtins.function(name) {
                Some((name, _)) => Partial::Known(Value::Function(name)),
                None => Partial::Known(Value::None),
            },
        }
    }

    fn eval_list(&mut self, items: &[Expr], pure: bool) -> PartialResult {
        let parts = items
            .iter()
            .map(|item| self.eval_partial(item, pure))
            .collect::<Result<Vec<_>, _>>()?;
        if parts.iter().all(Partial::is_known) {
            let values = parts
                .into_iter()
                .filter_map(|p| match p {
                    Partial::Known(v) => Some(v),
                    Partial::Residual(_) => None,
                })
                .collect();
            return Ok(Partial::Known(self.heap.new_list(values)));
        }
        let residual = parts
            .into_iter()
            .zip(items)
            .map(|(p, item)| self.residualize(p, item))
            .collect();
        Ok(Partial::Residual(Expr::List(residual)))
    }

    fn eval_map(&mut self, entries: &[(Expr, Expr)], pure: bool) -> PartialResult {
        let mut parts = Vec::with_capacity(entries.len());
        for (k, v) in entries {
            parts.push((self.eval_partial(k, pure)?, self.eval_partial(v, pure)?));
        }
        if parts.iter().all(|(k, v)| k.is_known() && v.is_known()) {
            let mut map = Vec::with_capacity(parts.len());
            for (k, v) in parts {
                if let (Partial::Known(k), Partial::Known(v)) = (k, v) {
                    let key = match k {
                        Value::Str(s) | Value::Markup(s) => s.to_string(),
                        other => self.heap.display(&other),
                    };
                    match map.iter_mut().find(|(existing, _): &&mut (String, Value)| *existing == key) {
                        Some(slot) => slot.1 = v,
                        None => map.push((key, v)),
                    }
                }
            }
            return Ok(Partial::Known(self.heap.new_map(map)));
        }
        let residual = parts
            .into_iter()
            .zip(entries)
            .map(|((k, v), (ke, ve))| (self.residualize(k, ke), self.residualize(v, ve)))
            .collect();
        Ok(Partial::Residual(Expr::Map(residual)))
    }

    fn eval_args(&mut self, args: &[Arg], pure: bool) -> Result<ArgParts, Interrupt> {
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            parts.push((arg.name.clone(), self.eval_partial(&arg.value, pure)?));
        }
        Ok(ArgParts { parts })
    }

    fn residual_args(&self, parts: ArgParts, args: &[Arg]) -> Vec<Arg> {
        parts
            .parts
            .into_iter()
            .zip(args)
            .map(|((name, part), arg)| Arg {
                name,
                value: self.residualize(part, &arg.value),
            })
            .collect()
    }

    /// Concrete arguments of a call, evaluated without side effects, or
    /// `None` when any of them is unknown.
    pub(crate) fn pure_call_args(&mut self, args: &[Arg]) -> Result<Option<CallArgs>, Interrupt> {
        let parts = self.eval_args(args, true)?;
        Ok(parts.all_known().then(|| parts.values()))
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Arg], pure: bool) -> PartialResult {
        if let Expr::Attr { target, name } = callee {
            return self.eval_method_call(target, name, args, pure);
        }
        let callee_part = self.eval_partial(callee, pure)?;
        let parts = self.eval_args(args, pure)?;
        let known_args = parts.all_known();
        match callee_part {
            Partial::Residual(c) => Ok(Partial::Residual(Expr::call(c, self.residual_args(parts, args)))),
            Partial::Known(Value::Function(name)) if known_args => {
                let call_args = parts.values();
                let (_, function) = self
                    .engine
                    .builtins
                    .function(name)
                    .ok_or_else(|| unknown_function(name))?;
                Ok(Partial::Known(function(&mut self.heap, &call_args)?))
            }
            Partial::Known(Value::Macro(def)) if known_args && !pure => {
                let call_args = parts.values();
                let residual = Expr::call(callee.clone(), self.residual_args(parts, args));
                self.call_macro_in_expression(&def, &call_args, residual)
            }
            Partial::Known(Value::Function(_) | Value::Macro(_)) => Ok(Partial::Residual(
                Expr::call(callee.clone(), self.residual_args(parts, args)),
            )),
            Partial::Known(Value::None) => match callee {
                Expr::Name(name) => Err(unknown_function(name).into()),
                _ => Err(EvalError::NotCallable("none").into()),
            },
            Partial::Known(other) => Err(EvalError::NotCallable(other.type_name()).into()),
        }
    }

    fn eval_method_call(
        &mut self,
        target: &Expr,
        method: &str,
        args: &[Arg],
        pure: bool,
    ) -> PartialResult {
        let receiver = self.eval_partial(target, pure)?;
        let parts = self.eval_args(args, pure)?;
        match receiver {
            Partial::Known(v) if parts.all_known() && !(pure && is_mutating(method)) => {
                let call_args = parts.values();
                Ok(Partial::Known(call_method(&mut self.heap, &v, method, &call_args)?))
            }
            receiver => {
                let target = self.residualize(receiver, target);
                Ok(Partial::Residual(Expr::call(
                    Expr::attr(target, method),
                    self.residual_args(parts, args),
                )))
            }
        }
    }

    /// Run a macro called from inside an expression.
    ///
    /// The body runs speculatively. If it resolves fully the call folds to
    /// its output; otherwise its effects are rolled back into deferred
    /// bindings and the call stays residual for pass two.
    fn call_macro_in_expression(
        &mut self,
        def: &Arc<MacroDef>,
        args: &CallArgs,
        residual: Expr,
    ) -> PartialResult {
        let config = SpeculationConfig {
            take_new_value: false,
            discard_session_bindings: true,
            partial_macro_evaluation: false,
            check_for_context_changes: self.engine.config.check_for_context_changes,
            deferred_execution: false,
        };
        let spec = self.execute_in_child_scope(config, |r| r.invoke_macro(def, args))?;
        match spec.result {
            Some(region) if !region.deferred => Ok(Partial::Known(Value::markup(region.text))),
            _ => {
                self.apply_speculation(spec.bindings, &spec.new_keys);
                Ok(Partial::Residual(residual))
            }
        }
    }

    fn eval_test(
        &mut self,
        expr: &Expr,
        target: &Expr,
        name: &str,
        args: &[Arg],
        negated: bool,
        pure: bool,
    ) -> PartialResult {
        if let (Expr::Name(var), "defined" | "undefined") = (target, name) {
            let defined = match self.scopes.get(var) {
                Some(Binding::Deferred(_)) => return Ok(Partial::Residual(expr.clone())),
                Some(Binding::Value(_)) => true,
                None => self.engine.builtins.function(var).is_some(),
            };
            let result = (name == "defined") == defined;
            return Ok(Partial::Known(Value::Bool(result != negated)));
        }
        let test = self
            .engine
            .builtins
            .test(name)
            .ok_or_else(|| unknown_test(name))?;
        let t = self.eval_partial(target, pure)?;
        let parts = self.eval_args(args, pure)?;
        match t {
            Partial::Known(v) if parts.all_known() => {
                let call_args = parts.values();
                let result = test(&self.heap, &v, &call_args)?;
                Ok(Partial::Known(Value::Bool(result != negated)))
            }
            t => Ok(Partial::Residual(Expr::Test {
                target: Box::new(self.residualize(t, target)),
                name: name.to_string(),
                args: self.residual_args(parts, args),
                negated,
            })),
        }
    }

    fn eval_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr, pure: bool) -> PartialResult {
        let l = self.eval_partial(left, pure)?;
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            return match l {
                Partial::Known(v) => {
                    let truthy = self.heap.truthy(&v);
                    if (op == BinaryOp::And) != truthy {
                        Ok(Partial::Known(v))
                    } else {
                        self.eval_partial(right, pure)
                    }
                }
                Partial::Residual(l) => {
                    let r = self.eval_partial(right, true)?;
                    Ok(Partial::Residual(Expr::binary(op, l, self.residualize(r, right))))
                }
            };
        }
        let r = self.eval_partial(right, pure)?;
        match (l, r) {
            (Partial::Known(l), Partial::Known(r)) => {
                Ok(Partial::Known(operators::binary(&mut self.heap, op, &l, &r)?))
            }
            (l, r) => Ok(Partial::Residual(Expr::binary(
                op,
                self.residualize(l, left),
                self.residualize(r, right),
            ))),
        }
    }

    /// Attribute access; missing attributes are `None`.
    fn get_attr(&self, target: &Value, name: &str) -> Value {
        match target {
            Value::Map(id) | Value::Namespace(id) => {
                self.heap.entry(*id, name).cloned().unwrap_or_default()
            }
            _ => Value::None,
        }
    }

    /// Subscript access; missing items are `None`.
    fn get_index(&self, target: &Value, index: &Value) -> Value {
        match (target, index) {
            (Value::List(id), Value::Int(i)) => {
                let items = self.heap.items(*id);
                resolve_index(*i, items.len())
                    .and_then(|i| items.get(i))
                    .cloned()
                    .unwrap_or_default()
            }
            (Value::Str(s) | Value::Markup(s), Value::Int(i)) => {
                let count = s.chars().count();
                resolve_index(*i, count)
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Value::str(c.to_string()))
                    .unwrap_or_default()
            }
            (Value::Map(id) | Value::Namespace(id), Value::Str(key)) => {
                self.heap.entry(*id, key).cloned().unwrap_or_default()
            }
            _ => Value::None,
        }
    }

    /// Residual form of a sub-result, given the expression that produced it.
    pub(crate) fn residualize(&self, part: Partial, original: &Expr) -> Expr {
        match part {
            Partial::Residual(e) => e,
            Partial::Known(v) => {
                let symbolic = matches!(v, Value::Macro(_))
                    || (v.is_container() && !builds_fresh(original) && !runs_mutation(original));
                if symbolic {
                    return original.clone();
                }
                self.heap.to_expr(&v).unwrap_or_else(|| original.clone())
            }
        }
    }
}

/// Python-style index: negative counts from the end.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let i = if index < 0 { index + len } else { index };
    if (0..len).contains(&i) {
        usize::try_from(i).ok()
    } else {
        None
    }
}
