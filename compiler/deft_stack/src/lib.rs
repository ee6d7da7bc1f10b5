//! Stack safety and nesting limits for template rendering.
//!
//! Two separate guards live here:
//!
//! - [`ensure_sufficient_stack`] grows the native stack before recursing into
//!   deeply nested expressions or node trees (parser and renderer both use it).
//! - [`DepthBudget`] counts nested render regions (loop iterations, macro
//!   bodies, blocks) and refuses to go past a configured maximum. Running out
//!   of budget is a hard failure for the render call, never a truncation.
//!
//! The two are independent: the stack guard keeps the process alive, the
//! budget keeps the per-call work bounded.

use thiserror::Error;

/// Minimum stack space to keep available (100KB red zone).
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Ensure sufficient stack space is available before executing `f`.
///
/// On native targets, uses `stacker` to grow the stack if less than the red
/// zone remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM version - just call directly (WASM has its own stack management).
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

/// Returned when entering a region would exceed the depth budget.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("render depth exceeded the maximum of {limit}")]
pub struct DepthExceeded {
    /// The configured maximum.
    pub limit: usize,
}

/// Counter of nested render regions.
///
/// `None` as the maximum means unlimited (the stack guard still applies).
/// A failed [`enter`](Self::enter) leaves the depth unchanged.
#[derive(Clone, Debug, Default)]
pub struct DepthBudget {
    depth: usize,
    max: Option<usize>,
}

impl DepthBudget {
    /// Create a budget with the given limit.
    pub fn new(max: Option<usize>) -> Self {
        Self { depth: 0, max }
    }

    /// Enter one nested region.
    pub fn enter(&mut self) -> Result<(), DepthExceeded> {
        if let Some(limit) = self.max {
            if self.depth >= limit {
                return Err(DepthExceeded { limit });
            }
        }
        self.depth += 1;
        Ok(())
    }

    /// Leave the innermost region.
    pub fn exit(&mut self) {
        debug_assert!(self.depth > 0, "DepthBudget::exit() without enter()");
        self.depth = self.depth.saturating_sub(1);
    }

    /// Current nesting depth.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Configured maximum, if any.
    #[inline]
    pub fn max(&self) -> Option<usize> {
        self.max
    }
}
