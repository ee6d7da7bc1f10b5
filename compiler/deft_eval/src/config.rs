//! Engine configuration.
//!
//! `EngineConfig` is plain data handed to every render call. It is built
//! through [`EngineBuilder`](crate::EngineBuilder) and never changes once the
//! engine exists.

use bitflags::bitflags;
use deft_ir::TagKind;

bitflags! {
    /// Tags the host has switched off.
    ///
    /// A disabled tag used directly by a template is a region error, and so is
    /// reconstruction that would have to emit one.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DisabledTags: u8 {
        const SET = 1 << 0;
        const IF = 1 << 1;
        const FOR = 1 << 2;
        const MACRO = 1 << 3;
        const DO = 1 << 4;
        const RAW = 1 << 5;
        const AUTOESCAPE = 1 << 6;
    }
}

impl DisabledTags {
    /// The flag for one tag kind.
    pub const fn of(tag: TagKind) -> Self {
        match tag {
            TagKind::Set => DisabledTags::SET,
            TagKind::If => DisabledTags::IF,
            TagKind::For => DisabledTags::FOR,
            TagKind::Macro => DisabledTags::MACRO,
            TagKind::Do => DisabledTags::DO,
            TagKind::Raw => DisabledTags::RAW,
            TagKind::Autoescape => DisabledTags::AUTOESCAPE,
        }
    }

    #[inline]
    pub fn is_disabled(self, tag: TagKind) -> bool {
        self.contains(DisabledTags::of(tag))
    }
}

/// Which value wins when speculative output is kept and a binding changed.
///
/// Only applies where the speculative output is emitted in place (partial
/// macro evaluation). Branches of deferred conditions always keep the prior
/// value, since pass two replays them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Reconstruct the value from before the region ran.
    PreservePrior,
    /// Reconstruct the value the region left behind.
    #[default]
    TakeNew,
}

/// Render settings shared by every call on one engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum output size in bytes (`None` = unlimited).
    pub max_output_size: Option<usize>,
    /// Maximum nesting of loop, macro and block frames (`None` = unlimited).
    pub max_render_depth: Option<usize>,
    pub conflict_policy: ConflictPolicy,
    /// Fingerprint bindings around speculative regions. When off, only new
    /// bindings are reported (cheaper, misses in-place mutation).
    pub check_for_context_changes: bool,
    /// Keep literal snapshots of tracked values so in-place mutation can be
    /// rolled back during speculation.
    pub snapshot_values: bool,
    /// In partial renders, wrap resolved text that contains template markers
    /// in `{% raw %}` so a second pass leaves it alone.
    pub preserve_raw: bool,
    /// Autoescape state of the root frame.
    pub autoescape: bool,
    pub disabled: DisabledTags,
}

/// Default depth budget.
pub const DEFAULT_MAX_RENDER_DEPTH: usize = 128;

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_output_size: None,
            max_render_depth: Some(DEFAULT_MAX_RENDER_DEPTH),
            conflict_policy: ConflictPolicy::default(),
            check_for_context_changes: true,
            snapshot_values: true,
            preserve_raw: true,
            autoescape: false,
            disabled: DisabledTags::empty(),
        }
    }
}
