//! Speculative execution and context diffing.
//!
//! A region whose effect pass one cannot decide (a branch of a deferred
//! condition, the body of a deferred loop, a macro body whose output may
//! stay partly deferred) runs in a pushed speculative frame. Before it runs,
//! every visible concrete binding is fingerprinted; afterwards the changed
//! ones are reported with the value pass two must start from, so the caller
//! can defer and reconstruct them.

use deft_ir::Expr;
use rustc_hash::FxHashSet;

use crate::context::{Binding, DeferredValue, FrameKind};
use crate::errors::{ReconstructError, RegionError};
use crate::render::Renderer;
use crate::Value;

/// How a speculative run is set up and diffed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpeculationConfig {
    /// Report the live value of a changed key rather than its prior value.
    pub take_new_value: bool,
    /// Report keys created by the child in `new_keys` instead of keeping them.
    pub discard_session_bindings: bool,
    /// The run is a partially evaluated macro call.
    pub partial_macro_evaluation: bool,
    /// Fingerprint and diff the context (full mode) rather than only report
    /// new keys (cheap mode).
    pub check_for_context_changes: bool,
    /// Run the child in deferred execution mode.
    pub deferred_execution: bool,
}

/// Outcome of a speculative run.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeculativeExecutionResult<T> {
    pub result: T,
    /// Changed keys and the value pass two must start from, in
    /// establishment order.
    pub bindings: Vec<(String, Value)>,
    /// Keys the child created or left unknown.
    pub new_keys: Vec<String>,
}

/// Result of a speculative region.
pub(crate) trait Speculative {
    /// Whether the region resolved without emitting deferred syntax.
    fn is_resolved(&self) -> bool;
}

/// Prior state of one key.
enum Snapshot {
    Value(Value),
    Literal(Expr),
}

struct Tracked {
    key: String,
    fingerprint: u64,
    snapshot: Option<Snapshot>,
}

impl Renderer<'_> {
    /// Run `f` in a child frame and report what it changed.
    ///
    /// Pending reconstructions queued inside the child are dropped with it;
    /// callers apply the reported bindings instead.
    #[tracing::instrument(level = "debug", skip_all)]
    pub(crate) fn execute_in_child_scope<T: Speculative>(
        &mut self,
        config: SpeculationConfig,
        f: impl FnOnce(&mut Self) -> Result<T, RegionError>,
    ) -> Result<SpeculativeExecutionResult<T>, RegionError> {
        let pending_mark = self.pending.len();
        let groups_mark = self.aliases.len();
        let visible_before: FxHashSet<String> = self
            .scopes
            .visible()
            .into_iter()
            .map(|(key, ..)| key)
            .collect();
        let tracked = if config.check_for_context_changes {
            self.track_bindings()
        } else {
            Vec::new()
        };

        self.scopes.push_frame(FrameKind::Speculative)?;
        if config.deferred_execution {
            self.scopes.current_mut().deferred_execution = true;
        }
        let outcome = f(self);
        let diff = match &outcome {
            Ok(result) if config.check_for_context_changes => {
                Some(self.diff_tracked(&config, &tracked, result.is_resolved()))
            }
            Ok(_) => Some(Ok(self.unreconstructed_sources(groups_mark))),
            Err(_) => None,
        };
        self.pending.truncate(pending_mark);
        let (child, absorbed) = self.scopes.pop_frame();
        self.pending.extend(absorbed);

        let result = outcome?;
        let (mut bindings, mut new_keys) = match diff {
            Some(diff) => diff?,
            None => (Vec::new(), Vec::new()),
        };
        for (key, slot) in child.slots() {
            if visible_before.contains(key) || child.is_meta(key) {
                continue;
            }
            match &slot.binding {
                Binding::Value(value) => {
                    if config.discard_session_bindings {
                        new_keys.push(key.to_string());
                    } else {
                        self.scopes.put(key, value.clone());
                    }
                }
                Binding::Deferred(DeferredValue::Empty | DeferredValue::WithOriginal(_)) => {
                    new_keys.push(key.to_string());
                }
                Binding::Deferred(DeferredValue::Shadow(_)) => {}
            }
        }
        new_keys.dedup();
        bindings.dedup_by(|a, b| a.0 == b.0);
        tracing::debug!(
            bindings = bindings.len(),
            new_keys = new_keys.len(),
            resolved = result.is_resolved(),
            partial_macro = config.partial_macro_evaluation,
            "speculation finished"
        );
        Ok(SpeculativeExecutionResult {
            result,
            bindings,
            new_keys,
        })
    }

    /// Defer what a speculative run reported.
    ///
    /// Every reported key takes its reported original before containment is
    /// followed, so a container reached through another keeps its own.
    pub(crate) fn apply_speculation(&mut self, bindings: Vec<(String, Value)>, new_keys: &[String]) {
        let lives: Vec<Value> = bindings
            .into_iter()
            .filter_map(|(key, original)| self.mark_binding(&key, Some(original)))
            .collect();
        for live in &lives {
            self.defer_containers(live);
        }
        self.defer_words(&Default::default(), new_keys, &[]);
    }

    fn track_bindings(&self) -> Vec<Tracked> {
        let snapshots = self.engine.config.snapshot_values;
        self.scopes
            .visible()
            .into_iter()
            .filter_map(|(key, index, binding)| {
                let Binding::Value(value) = binding else {
                    return None;
                };
                if self.scopes.frame(index).is_meta(&key) {
                    return None;
                }
                let snapshot = if value.is_container() {
                    snapshots
                        .then(|| self.heap.to_expr(&value))
                        .flatten()
                        .map(Snapshot::Literal)
                } else {
                    Some(Snapshot::Value(value.clone()))
                };
                Some(Tracked {
                    fingerprint: self.heap.fingerprint(&value),
                    key,
                    snapshot,
                })
            })
            .collect()
    }

    /// Compare tracked keys against the child's view.
    fn diff_tracked(
        &mut self,
        config: &SpeculationConfig,
        tracked: &[Tracked],
        resolved: bool,
    ) -> Result<(Vec<(String, Value)>, Vec<String>), ReconstructError> {
        let mut bindings = Vec::new();
        let mut new_keys = Vec::new();
        for t in tracked {
            let value = match self.scopes.get(&t.key) {
                None => continue,
                Some(Binding::Deferred(deferred)) => match deferred.original() {
                    Some(original) => original.clone(),
                    None => {
                        new_keys.push(t.key.clone());
                        continue;
                    }
                },
                Some(Binding::Value(live)) => {
                    if self.heap.fingerprint(live) == t.fingerprint {
                        continue;
                    }
                    if config.take_new_value || resolved {
                        live.clone()
                    } else {
                        match &t.snapshot {
                            Some(Snapshot::Value(prior)) => prior.clone(),
                            Some(Snapshot::Literal(expr)) => {
                                self.heap.from_literal(expr).ok_or_else(|| {
                                    ReconstructError::CannotReconstructValue { key: t.key.clone() }
                                })?
                            }
                            None => {
                                return Err(ReconstructError::CannotReconstructValue {
                                    key: t.key.clone(),
                                })
                            }
                        }
                    }
                }
            };
            bindings.push((t.key.clone(), value));
        }
        Ok((bindings, new_keys))
    }

    /// Cheap-mode report: alias sources registered since `groups_mark` that
    /// were never emitted.
    fn unreconstructed_sources(&self, groups_mark: usize) -> (Vec<(String, Value)>, Vec<String>) {
        let bindings = self.aliases.groups()[groups_mark..]
            .iter()
            .filter(|group| !group.reconstructed)
            .filter_map(|group| {
                let original = self.scopes.get(&group.source.name)?;
                let value = match original {
                    Binding::Value(v) => v.clone(),
                    Binding::Deferred(d) => d.original()?.clone(),
                };
                Some((group.source.name.clone(), value))
            })
            .collect();
        (bindings, Vec::new())
    }
}
