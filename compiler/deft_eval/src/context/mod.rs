//! Scope chain for one render call.
//!
//! Frames live on a stack; frame `i`'s parent is frame `i - 1`. Lookups walk
//! from the innermost frame outward. Writes always land in the innermost
//! frame, matching the template language's scoping (a `set` inside a loop
//! body does not leak out of the iteration).
//!
//! # Deferred bindings
//!
//! A binding is either a concrete [`Value`] or a [`DeferredValue`]. Marking a
//! key deferred never edits an ancestor frame: when the visible binding lives
//! further out, a `Shadow` entry is written to the innermost frame instead.
//! When that frame is popped the parent absorbs the shadow (see
//! [`ScopeChain::pop_frame`]), so the deferral reaches the declaring frame
//! exactly when the renderer is back at that frame's level and can emit the
//! reconstruction there.

use deft_stack::{DepthBudget, DepthExceeded};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::Value;

/// Name the child-scope wrapper binds; never a user binding.
pub const IGNORED_NAME: &str = "__ignored__";

/// State of a binding whose value is not known to this pass.
#[derive(Clone, Debug, PartialEq)]
pub enum DeferredValue {
    /// Unknown, with nothing to reconstruct (host-deferred keys, targets of
    /// deferred assignments).
    Empty,
    /// Deferred where declared; holds the value as of deferral.
    WithOriginal(Value),
    /// Deferred from a child frame while declared in an ancestor.
    Shadow(Value),
}

impl DeferredValue {
    /// The retained value, if any.
    pub fn original(&self) -> Option<&Value> {
        match self {
            DeferredValue::Empty => None,
            DeferredValue::WithOriginal(v) | DeferredValue::Shadow(v) => Some(v),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Binding {
    Value(Value),
    Deferred(DeferredValue),
}

impl Binding {
    #[inline]
    pub fn is_deferred(&self) -> bool {
        matches!(self, Binding::Deferred(_))
    }

    /// The concrete value, if not deferred.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Binding::Value(v) => Some(v),
            Binding::Deferred(_) => None,
        }
    }
}

/// A binding plus its establishment order.
#[derive(Clone, Debug)]
pub struct Slot {
    pub binding: Binding,
    /// Monotonic across the whole call; lower was established first.
    pub seq: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    Root,
    Block,
    Loop,
    Macro,
    /// Bookkeeping frame around speculative execution.
    Speculative,
}

impl FrameKind {
    /// Whether entering this frame spends depth budget.
    #[inline]
    pub fn counts_depth(self) -> bool {
        !matches!(self, FrameKind::Root | FrameKind::Speculative)
    }
}

/// One scope frame.
#[derive(Debug)]
pub struct Frame {
    pub id: FrameId,
    pub kind: FrameKind,
    bindings: FxHashMap<String, Slot>,
    /// Engine-injected names (`loop`); never deferred or reconstructed.
    meta: FxHashSet<String>,
    /// Macros executing when this frame was entered, outermost first.
    pub macro_stack: Vec<String>,
    /// Tags re-emit themselves as syntax instead of acting.
    pub deferred_execution: bool,
    /// Keys bound by `put` during this call.
    pub session: FxHashSet<String>,
    pub autoescape: bool,
    /// Macro definitions already reconstructed at this level.
    pub emitted_macros: FxHashSet<String>,
}

impl Frame {
    fn new(id: FrameId, kind: FrameKind) -> Self {
        Frame {
            id,
            kind,
            bindings: FxHashMap::default(),
            meta: FxHashSet::default(),
            macro_stack: Vec::new(),
            deferred_execution: false,
            session: FxHashSet::default(),
            autoescape: false,
            emitted_macros: FxHashSet::default(),
        }
    }

    #[inline]
    pub fn slot(&self, key: &str) -> Option<&Slot> {
        self.bindings.get(key)
    }

    #[inline]
    pub fn is_meta(&self, key: &str) -> bool {
        self.meta.contains(key)
    }

    /// Bindings in establishment order.
    pub fn slots(&self) -> Vec<(&str, &Slot)> {
        let mut slots: Vec<_> = self
            .bindings
            .iter()
            .map(|(k, slot)| (k.as_str(), slot))
            .collect();
        slots.sort_by_key(|(_, slot)| slot.seq);
        slots
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Outcome of marking one key deferred.
#[derive(Clone, Debug, PartialEq)]
pub enum Deferral {
    /// Declared in the innermost frame: reconstruct here with this value.
    Local(Value),
    /// Declared further out: a shadow now hides it and the declaring frame
    /// reconstructs it when the chain unwinds.
    Shadowed,
}

/// The frame stack of one render call.
#[derive(Debug)]
pub struct ScopeChain {
    frames: Vec<Frame>,
    next_seq: u64,
    next_id: u32,
    depth: DepthBudget,
}

impl ScopeChain {
    pub fn new(autoescape: bool, max_depth: Option<usize>) -> Self {
        let mut root = Frame::new(FrameId(0), FrameKind::Root);
        root.autoescape = autoescape;
        ScopeChain {
            frames: vec![root],
            next_seq: 0,
            next_id: 1,
            depth: DepthBudget::new(max_depth),
        }
    }

    /// Enter a child frame. Inherits macro stack, execution mode and
    /// autoescape from the parent.
    pub fn push_frame(&mut self, kind: FrameKind) -> Result<FrameId, DepthExceeded> {
        if kind.counts_depth() {
            self.depth.enter()?;
        }
        let id = FrameId(self.next_id);
        self.next_id += 1;
        let parent = self.current();
        let mut frame = Frame::new(id, kind);
        frame.macro_stack.clone_from(&parent.macro_stack);
        frame.deferred_execution = parent.deferred_execution;
        frame.autoescape = parent.autoescape;
        self.frames.push(frame);
        Ok(id)
    }

    /// Enter a macro body frame.
    pub fn push_macro_frame(&mut self, name: &str) -> Result<FrameId, DepthExceeded> {
        let id = self.push_frame(FrameKind::Macro)?;
        self.current_mut().macro_stack.push(name.to_string());
        Ok(id)
    }

    /// Leave the innermost frame.
    ///
    /// Shadow entries of the popped frame are absorbed by the new innermost
    /// frame: where it declares the key, the binding becomes `WithOriginal`
    /// and is returned as a pending reconstruction; otherwise the shadow moves
    /// up one level. The popped frame is returned for inspection.
    pub fn pop_frame(&mut self) -> (Frame, Vec<(String, Value)>) {
        debug_assert!(self.frames.len() > 1, "cannot pop the root frame");
        let Some(frame) = self.frames.pop() else {
            unreachable!("frame stack is never empty")
        };
        if frame.kind.counts_depth() {
            self.depth.exit();
        }
        let mut pending = Vec::new();
        let mut shadows: Vec<_> = frame
            .bindings
            .iter()
            .filter_map(|(k, slot)| match &slot.binding {
                Binding::Deferred(DeferredValue::Shadow(v)) => Some((k.clone(), v.clone(), slot.seq)),
                _ => None,
            })
            .collect();
        shadows.sort_by_key(|(_, _, seq)| *seq);
        for (key, original, seq) in shadows {
            let declared_here = self.current().bindings.contains_key(&key);
            if declared_here {
                if let Some(slot) = self.current_mut().bindings.get_mut(&key) {
                    if let Binding::Value(_) = slot.binding {
                        slot.binding =
                            Binding::Deferred(DeferredValue::WithOriginal(original.clone()));
                        pending.push((key, original));
                    }
                }
            } else if self.frames.len() > 1 && self.find(&key).is_some() {
                self.current_mut().bindings.insert(
                    key,
                    Slot {
                        binding: Binding::Deferred(DeferredValue::Shadow(original)),
                        seq,
                    },
                );
            }
        }
        (frame, pending)
    }

    #[inline]
    pub fn current(&self) -> &Frame {
        let last = self.frames.len() - 1;
        &self.frames[last]
    }

    #[inline]
    pub fn current_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Index of the innermost frame.
    #[inline]
    pub fn current_index(&self) -> usize {
        self.frames.len() - 1
    }

    #[inline]
    pub fn frame(&self, index: usize) -> &Frame {
        &self.frames[index]
    }

    /// Frames from root to innermost.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Current region nesting.
    pub fn depth(&self) -> usize {
        self.depth.depth()
    }

    /// Find the visible slot for `key` and the index of its frame.
    pub fn find(&self, key: &str) -> Option<(usize, &Slot)> {
        self.frames
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, frame)| frame.bindings.get(key).map(|slot| (i, slot)))
    }

    /// Visible binding for `key`.
    pub fn get(&self, key: &str) -> Option<&Binding> {
        self.find(key).map(|(_, slot)| &slot.binding)
    }

    /// Whether the visible binding of `key` is a meta variable.
    pub fn is_meta(&self, key: &str) -> bool {
        self.find(key)
            .is_some_and(|(i, _)| self.frames[i].is_meta(key))
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Bind `key` in the innermost frame.
    pub fn put(&mut self, key: &str, value: Value) {
        self.put_binding(key, Binding::Value(value));
    }

    /// Bind `key` in the innermost frame with an explicit binding state.
    ///
    /// Rebinding keeps the original sequence number.
    pub fn put_binding(&mut self, key: &str, binding: Binding) {
        debug_assert!(key != IGNORED_NAME, "`{IGNORED_NAME}` is reserved");
        let seq = match self.current().bindings.get(key) {
            Some(slot) => slot.seq,
            None => self.next_seq(),
        };
        let frame = self.current_mut();
        frame.bindings.insert(key.to_string(), Slot { binding, seq });
        frame.session.insert(key.to_string());
    }

    /// Bind an engine-injected name in the innermost frame.
    pub fn put_meta(&mut self, key: &str, binding: Binding) {
        let seq = self.next_seq();
        let frame = self.current_mut();
        frame.bindings.insert(key.to_string(), Slot { binding, seq });
        frame.meta.insert(key.to_string());
    }

    /// Mark the visible binding of `key` deferred.
    ///
    /// Returns `None` when nothing changed: absent, already deferred, a meta
    /// variable, or bound to `None`.
    pub fn mark_deferred(&mut self, key: &str) -> Option<Deferral> {
        let (index, slot) = self.find(key)?;
        if self.frames[index].is_meta(key) {
            return None;
        }
        let value = match &slot.binding {
            Binding::Value(Value::None) | Binding::Deferred(_) => return None,
            Binding::Value(v) => v.clone(),
        };
        Some(self.mark_deferred_at(index, key, value))
    }

    /// Mark the binding of `key` declared in frame `index` deferred,
    /// retaining `original`.
    pub fn mark_deferred_at(&mut self, index: usize, key: &str, original: Value) -> Deferral {
        let current = self.current_index();
        if index == current {
            if let Some(slot) = self.frames[index].bindings.get_mut(key) {
                slot.binding = Binding::Deferred(DeferredValue::WithOriginal(original.clone()));
            }
            tracing::debug!(key, "deferred in declaring frame");
            return Deferral::Local(original);
        }
        let seq = self.frames[index].bindings.get(key).map_or(0, |slot| slot.seq);
        self.current_mut().bindings.insert(
            key.to_string(),
            Slot {
                binding: Binding::Deferred(DeferredValue::Shadow(original)),
                seq,
            },
        );
        tracing::debug!(key, declared_in = index, "deferred through shadow");
        Deferral::Shadowed
    }

    /// Whether frames `a` and `b` run inside the same macro calls.
    pub fn is_same_lexical_scope(&self, a: usize, b: usize) -> bool {
        self.frames[a].macro_stack == self.frames[b].macro_stack
    }

    /// Whether the innermost frame re-emits tags instead of running them.
    #[inline]
    pub fn in_deferred_execution(&self) -> bool {
        self.current().deferred_execution
    }

    /// Visible keys, innermost binding per name, in establishment order.
    pub fn visible(&self) -> Vec<(String, usize, Binding)> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for (i, frame) in self.frames.iter().enumerate().rev() {
            for (key, slot) in frame.slots() {
                if seen.insert(key.to_string()) {
                    out.push((slot.seq, key.to_string(), i, slot.binding.clone()));
                }
            }
        }
        out.sort_by_key(|(seq, ..)| *seq);
        out.into_iter().map(|(_, k, i, b)| (k, i, b)).collect()
    }
}

#[cfg(test)]
mod tests;
