//! `EngineBuilder` for creating engines with non-default settings.

use deft_ir::Data;
use rustc_hash::FxHashMap;

use super::Engine;
use crate::builtins::Builtins;
use crate::config::{ConflictPolicy, DisabledTags, EngineConfig};
use crate::shared::{SharedMutableRegistry, SharedRegistry};

/// Builder for [`Engine`].
///
/// Starts from [`EngineConfig::default`] and the standard builtins.
#[derive(Debug, Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    builtins: Option<Builtins>,
    globals: FxHashMap<String, Data>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn max_output_size(mut self, limit: Option<usize>) -> Self {
        self.config.max_output_size = limit;
        self
    }

    #[must_use]
    pub fn max_render_depth(mut self, limit: Option<usize>) -> Self {
        self.config.max_render_depth = limit;
        self
    }

    #[must_use]
    pub fn conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.config.conflict_policy = policy;
        self
    }

    /// Switch speculation between full diffing and new-key reporting.
    #[must_use]
    pub fn check_for_context_changes(mut self, enabled: bool) -> Self {
        self.config.check_for_context_changes = enabled;
        self
    }

    #[must_use]
    pub fn snapshot_values(mut self, enabled: bool) -> Self {
        self.config.snapshot_values = enabled;
        self
    }

    #[must_use]
    pub fn preserve_raw(mut self, enabled: bool) -> Self {
        self.config.preserve_raw = enabled;
        self
    }

    #[must_use]
    pub fn autoescape(mut self, enabled: bool) -> Self {
        self.config.autoescape = enabled;
        self
    }

    /// Disable tags. A region that would have to emit one is dropped.
    #[must_use]
    pub fn disable(mut self, tags: DisabledTags) -> Self {
        self.config.disabled |= tags;
        self
    }

    /// Use a custom builtin registry instead of [`Builtins::standard`].
    #[must_use]
    pub fn builtins(mut self, builtins: Builtins) -> Self {
        self.builtins = Some(builtins);
        self
    }

    #[must_use]
    pub fn global(mut self, key: impl Into<String>, value: impl Into<Data>) -> Self {
        self.globals.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            config: self.config,
            builtins: SharedRegistry::new(self.builtins.unwrap_or_else(Builtins::standard)),
            globals: SharedMutableRegistry::new(self.globals),
        }
    }
}
