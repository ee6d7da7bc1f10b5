//! Deft Eval - partial-evaluation renderer for deft templates.
//!
//! Renders a template against a context in which some keys are deferred
//! (unknown to this pass). Whatever depends on a deferred key is emitted as
//! template source instead of text, together with the bindings it needs, so
//! that a second render with the full context produces the same output a
//! single full render would have.
//!
//! # Architecture
//!
//! - `context`: the scope chain and deferred bindings
//! - `eval`: expression evaluation to a value or a residual expression
//! - `classify`: resolution results and the deferred-word scan
//! - `alias`: deferred marking and alias groups over shared containers
//! - `speculate`: speculative execution in a child frame and context diffs
//! - `reconstruct`: deferred bindings back to template source
//! - `render`: per-tag handlers and macro invocation
//! - `engine`: the public entry points
//!
//! # Tracing
//!
//! Enable tracing with environment variables:
//! - `RUST_LOG=deft_eval=debug` - render, speculation and alias events
//! - `RUST_LOG=deft_eval=trace` - per-expression evaluation (very verbose)

pub mod alias;
pub mod builtins;
pub mod classify;
pub mod config;
pub mod context;
pub mod diagnostics;
mod engine;
pub mod errors;
mod eval;
mod reconstruct;
mod render;
mod shared;
pub mod speculate;
pub mod value;

use std::sync::Once;

pub use builtins::{Builtins, CallArgs};
pub use classify::{candidate_words, ResolutionResult};
pub use config::{ConflictPolicy, DisabledTags, EngineConfig};
pub use engine::{Context, Engine, EngineBuilder, Rendered};
pub use errors::{
    ErrorKind, EvalError, ReconstructError, RegionError, RenderError, Severity, TemplateError,
};
pub use eval::{EvalFlags, EvalOutcome};
pub use render::Renderer;
pub use shared::{SharedMutableRegistry, SharedRegistry};
pub use value::{escape_html, Heap, HeapObject, ObjId, Value};

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber when `RUST_LOG` is set.
///
/// Safe to call more than once; only the first call has an effect.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init();
        }
    });
}
