//! Deferred marking and alias resolution.
//!
//! Deferring a key whose value is a container also defers every other
//! visible key bound to the same heap object. Otherwise pass two would see
//! the container through one name as reconstructed and through another as
//! concrete, and a mutation through either name would no longer reach both.
//! The keys form an [`AliasGroup`]: one source, reconstructed as a literal,
//! and refs, reconstructed as `{% set ref = source %}`.
//!
//! Containment is followed too. Deferring a container also defers every
//! visible container that holds it or is held by it, so pass two reads a
//! mutation through any of those names. The reconstructor writes the shared
//! parts as references to the names that bind them.

use std::collections::BTreeSet;
use std::sync::Arc;

use deft_ir::{MacroDef, Node};
use smallvec::SmallVec;

use crate::classify::candidate_words;
use crate::context::{Binding, Deferral, DeferredValue, FrameId};
use crate::render::Renderer;
use crate::{ObjId, Value};

/// A binding site: a name in one frame.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeKey {
    pub frame: FrameId,
    pub name: String,
}

/// Keys that share one container.
#[derive(Clone, Debug, PartialEq)]
pub struct AliasGroup {
    pub object: ObjId,
    /// Established first; carries the literal.
    pub source: ScopeKey,
    pub refs: Vec<ScopeKey>,
    /// The source has been emitted.
    pub reconstructed: bool,
}

/// Alias groups of one render call, deduplicated by object.
#[derive(Clone, Debug, Default)]
pub struct AliasTable {
    groups: Vec<AliasGroup>,
}

impl AliasTable {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[AliasGroup] {
        &self.groups
    }

    pub fn group(&self, object: ObjId) -> Option<&AliasGroup> {
        self.groups.iter().find(|g| g.object == object)
    }

    /// Record `members` (source first) as aliases of `object`, merging with
    /// an existing group.
    pub fn register(&mut self, object: ObjId, members: &[ScopeKey]) {
        let Some((source, refs)) = members.split_first() else {
            return;
        };
        if let Some(group) = self.groups.iter_mut().find(|g| g.object == object) {
            for key in members {
                if group.source != *key && !group.refs.contains(key) {
                    group.refs.push(key.clone());
                }
            }
            return;
        }
        tracing::debug!(source = %source.name, refs = refs.len(), "alias group");
        self.groups.push(AliasGroup {
            object,
            source: source.clone(),
            refs: refs.to_vec(),
            reconstructed: false,
        });
    }

    /// The source `key` must be reconstructed from, if it is a ref.
    pub fn source_of(&self, key: &ScopeKey) -> Option<&ScopeKey> {
        self.groups
            .iter()
            .find(|g| g.refs.contains(key))
            .map(|g| &g.source)
    }

    pub fn mark_reconstructed(&mut self, source: &ScopeKey) {
        for group in &mut self.groups {
            if group.source == *source {
                group.reconstructed = true;
            }
        }
    }
}

/// One binding of the aliased object: frame index, name, sequence.
type Member = (usize, String, u64);

impl Renderer<'_> {
    /// Defer the names a tag depends on.
    ///
    /// `words` and `used` are always marked. `set_targets` are names the tag
    /// may have assigned. A target declared in the current lexical scope is
    /// marked with its aliases. One declared further out is shadowed alone,
    /// and the declaring frame picks it up on unwind. Unbound targets become
    /// `Empty` deferrals here.
    pub(crate) fn defer_words(
        &mut self,
        words: &BTreeSet<String>,
        set_targets: &[String],
        used: &[String],
    ) {
        for word in words.iter().chain(used) {
            self.defer_binding(word, None);
        }
        let current = self.scopes.current_index();
        for target in set_targets {
            let declared = self
                .scopes
                .find(target)
                .map(|(index, slot)| (index, slot.binding.value().is_some_and(|v| !v.is_none())));
            match declared {
                Some((index, true)) => {
                    if self.scopes.is_same_lexical_scope(index, current) {
                        self.defer_binding(target, None);
                    } else if let Some(value) = self
                        .scopes
                        .frame(index)
                        .slot(target)
                        .and_then(|slot| slot.binding.value())
                        .cloned()
                    {
                        self.mark_member(index, target, value);
                    }
                }
                Some((index, false)) if self.scopes.frame(index).is_meta(target) => {}
                Some((_, false)) | None => {
                    if !self.scopes.get(target).is_some_and(Binding::is_deferred) {
                        self.scopes
                            .put_binding(target, Binding::Deferred(DeferredValue::Empty));
                    }
                }
            }
        }
    }

    /// Defer the visible binding of `key`, retaining `original` (the live
    /// value when not given), together with its aliases.
    ///
    /// Locally declared members are queued on `pending` for reconstruction
    /// by the current node; the others are shadowed.
    pub(crate) fn defer_binding(&mut self, key: &str, original: Option<Value>) {
        if let Some(live) = self.mark_binding(key, original) {
            self.defer_containers(&live);
        }
    }

    /// Defer `key` and its aliases without following containment. Returns
    /// the live value when something was marked.
    pub(crate) fn mark_binding(&mut self, key: &str, original: Option<Value>) -> Option<Value> {
        let (index, slot) = self.scopes.find(key)?;
        if self.scopes.frame(index).is_meta(key) {
            return None;
        }
        let live = match &slot.binding {
            Binding::Value(v) => v.clone(),
            Binding::Deferred(_) => return None,
        };
        let original = original.unwrap_or_else(|| live.clone());
        if original.is_none() && live.is_none() {
            return None;
        }
        let members = match live.object() {
            Some(object) => self.alias_members(object),
            None => SmallVec::new(),
        };
        if members.len() > 1 {
            let keys: Vec<ScopeKey> = members
                .iter()
                .map(|(i, name, _)| ScopeKey {
                    frame: self.scopes.frame(*i).id,
                    name: name.clone(),
                })
                .collect();
            if let Some(object) = live.object() {
                self.aliases.register(object, &keys);
            }
            for (i, name, _) in members {
                let value = if name == key { original.clone() } else { live.clone() };
                self.mark_member(i, &name, value);
            }
        } else {
            self.mark_member(index, key, original);
        }
        if let Value::Macro(def) = &live {
            self.defer_macro_free_words(def);
        }
        Some(live)
    }

    /// Defer the visible containers that hold `live` or are held by it.
    pub(crate) fn defer_containers(&mut self, live: &Value) {
        let Some(object) = live.object() else {
            return;
        };
        let inner = self.heap.reachable(live);
        let related: Vec<String> = self
            .scopes
            .visible()
            .into_iter()
            .filter_map(|(name, index, binding)| {
                let value = binding.value()?;
                let id = value.object()?;
                let linked = id != object
                    && (inner.contains(&id) || self.heap.reachable(value).contains(&object));
                (linked && !self.scopes.frame(index).is_meta(&name)).then_some(name)
            })
            .collect();
        for name in related {
            self.defer_binding(&name, None);
        }
    }

    fn mark_member(&mut self, index: usize, name: &str, value: Value) {
        if let Deferral::Local(value) = self.scopes.mark_deferred_at(index, name, value) {
            self.pending.push((name.to_string(), value));
        }
    }

    /// Visible bindings of `object`, source first.
    ///
    /// A binding hidden by a nearer one of the same name is skipped: pass two
    /// cannot address it at this position.
    fn alias_members(&self, object: ObjId) -> SmallVec<[Member; 2]> {
        let mut members: SmallVec<[Member; 2]> = SmallVec::new();
        for (i, frame) in self.scopes.frames().iter().enumerate() {
            for (name, slot) in frame.slots() {
                let same = matches!(&slot.binding, Binding::Value(v) if v.object() == Some(object));
                if !same || frame.is_meta(name) {
                    continue;
                }
                let visible = self.scopes.find(name).is_some_and(|(found, _)| found == i);
                if visible {
                    members.push((i, name.to_string(), slot.seq));
                }
            }
        }
        members.sort_by_key(|(i, _, seq)| (*i, *seq));
        members
    }

    /// Defer the free names a macro body reads, so its definition can be
    /// re-emitted with everything it closes over.
    fn defer_macro_free_words(&mut self, def: &Arc<MacroDef>) {
        let mut sources = Vec::new();
        collect_sources(&def.body, &mut sources);
        for param in &def.params {
            if let Some(default) = &param.default {
                sources.push(default.as_str());
            }
        }
        let params: Vec<&str> = def.params.iter().map(|p| p.name.as_str()).collect();
        let words: BTreeSet<String> = sources
            .iter()
            .flat_map(|src| candidate_words(src))
            .map(|word| word.split('.').next().unwrap_or(word))
            .filter(|root| !params.contains(root) && *root != def.name)
            .map(str::to_string)
            .collect();
        for word in words {
            self.defer_binding(&word, None);
        }
    }
}

/// Expression sources of a node tree.
fn collect_sources<'a>(nodes: &'a [Node], out: &mut Vec<&'a str>) {
    for node in nodes {
        match node {
            Node::Text(_) | Node::Raw(_) => {}
            Node::Output { expr, .. } | Node::Do { expr, .. } => out.push(expr),
            Node::Set { value, .. } => out.push(value),
            Node::If {
                branches,
                otherwise,
                ..
            } => {
                for branch in branches {
                    out.push(&branch.cond);
                    collect_sources(&branch.body, out);
                }
                if let Some(otherwise) = otherwise {
                    collect_sources(otherwise, out);
                }
            }
            Node::For {
                iter,
                body,
                otherwise,
                ..
            } => {
                out.push(iter);
                collect_sources(body, out);
                if let Some(otherwise) = otherwise {
                    collect_sources(otherwise, out);
                }
            }
            Node::Macro(def) => {
                for param in &def.params {
                    if let Some(default) = &param.default {
                        out.push(default);
                    }
                }
                collect_sources(&def.body, out);
            }
            Node::Autoescape { body, .. } => collect_sources(body, out),
        }
    }
}
