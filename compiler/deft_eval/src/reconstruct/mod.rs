//! Reconstruction of deferred bindings as template source.
//!
//! Given bindings deferred at the current level, emit the tags that make
//! pass two start from the same state: macro definitions, one combined
//! `set` for plain values, one `set` per value that holds another
//! reconstructed container, then a `set` binding alias refs to their source.

use std::fmt::Write as _;

use deft_ir::TagKind;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::alias::ScopeKey;
use crate::errors::ReconstructError;
use crate::render::Renderer;
use crate::{ObjId, Value};

impl Renderer<'_> {
    /// Emit template source rebinding `bindings` in the current frame.
    pub(crate) fn reconstruct(&mut self, bindings: &[(String, Value)]) -> Result<String, ReconstructError> {
        let mut seen = Vec::with_capacity(bindings.len());
        let mut macros = Vec::new();
        let mut plain = Vec::new();
        let mut refs = Vec::new();
        let frame = self.scopes.current().id;
        for (name, value) in bindings {
            if seen.contains(&name.as_str()) {
                continue;
            }
            seen.push(name.as_str());
            if let Value::Macro(def) = value {
                macros.push((name.as_str(), def));
                continue;
            }
            let key = ScopeKey {
                frame,
                name: name.clone(),
            };
            match self.aliases.source_of(&key) {
                Some(source) if source.name != *name => refs.push((name.as_str(), source.name.clone())),
                _ => plain.push((name.as_str(), value)),
            }
        }
        if !macros.is_empty() {
            self.check_enabled(TagKind::Macro)?;
        }
        let aliased_macros = macros.iter().any(|(name, def)| *name != def.name);
        if !plain.is_empty() || !refs.is_empty() || aliased_macros {
            self.check_enabled(TagKind::Set)?;
        }

        let mut out = String::new();
        for (name, def) in &macros {
            if self.scopes.current_mut().emitted_macros.insert(def.name.clone()) {
                let _ = write!(out, "{def}");
            }
            if *name != def.name {
                refs.push((*name, def.name.clone()));
            }
        }
        let mut names: FxHashMap<ObjId, String> = FxHashMap::default();
        for (name, value) in &plain {
            if let Some(id) = value.object() {
                names.entry(id).or_insert_with(|| (*name).to_string());
            }
        }
        let (nested, plain): (Vec<_>, Vec<_>) = plain
            .into_iter()
            .partition(|(_, value)| !self.named_parts(value, &names).is_empty());
        if !plain.is_empty() {
            let mut literals = Vec::with_capacity(plain.len());
            for (name, value) in &plain {
                let literal = self.heap.literal(value).ok_or_else(|| {
                    ReconstructError::CannotReconstructValue {
                        key: (*name).to_string(),
                    }
                })?;
                literals.push(literal);
            }
            let names: Vec<&str> = plain.iter().map(|(name, _)| *name).collect();
            let _ = write!(out, "{{% set {} = {} %}}", names.join(", "), literals.join(", "));
        }
        self.write_nested(&mut out, nested.clone(), &plain, &names)?;
        if !refs.is_empty() {
            let names: Vec<&str> = refs.iter().map(|(name, _)| *name).collect();
            let sources: Vec<&str> = refs.iter().map(|(_, source)| source.as_str()).collect();
            let _ = write!(out, "{{% set {} = {} %}}", names.join(", "), sources.join(", "));
        }
        for (name, _) in plain.iter().chain(&nested) {
            self.aliases.mark_reconstructed(&ScopeKey {
                frame,
                name: (*name).to_string(),
            });
        }
        if !out.is_empty() {
            self.counters.syntax += 1;
            self.counters.bindings += 1;
            tracing::debug!(count = seen.len(), "reconstructed bindings");
        }
        Ok(out)
    }

    /// Containers inside `value`, other than itself, bound by one of `names`.
    fn named_parts(&self, value: &Value, names: &FxHashMap<ObjId, String>) -> Vec<ObjId> {
        let own = value.object();
        self.heap
            .reachable(value)
            .into_iter()
            .filter(|id| Some(*id) != own && names.contains_key(id))
            .collect()
    }

    /// Emit each nested value once every name it refers to is bound.
    fn write_nested(
        &self,
        out: &mut String,
        mut waiting: Vec<(&str, &Value)>,
        plain: &[(&str, &Value)],
        names: &FxHashMap<ObjId, String>,
    ) -> Result<(), ReconstructError> {
        let mut bound: FxHashSet<ObjId> = plain.iter().filter_map(|(_, v)| v.object()).collect();
        while !waiting.is_empty() {
            let ready = waiting.iter().position(|(_, value)| {
                self.named_parts(value, names)
                    .iter()
                    .all(|id| bound.contains(id))
            });
            let (name, value) = match ready {
                Some(i) => waiting.remove(i),
                None => {
                    return Err(ReconstructError::CannotReconstructValue {
                        key: waiting[0].0.to_string(),
                    })
                }
            };
            let literal = self
                .heap
                .to_expr_naming(value, names)
                .ok_or_else(|| ReconstructError::CannotReconstructValue {
                    key: name.to_string(),
                })?;
            let _ = write!(out, "{{% set {name} = {literal} %}}");
            bound.extend(value.object());
        }
        Ok(())
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
