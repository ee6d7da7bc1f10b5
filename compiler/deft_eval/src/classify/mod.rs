//! Expression word classifier.
//!
//! Turns an evaluator outcome into a [`ResolutionResult`] and, for anything
//! not fully resolved, finds which identifiers in the residual text still
//! depend on data this pass does not have.
//!
//! The word scan works on text, not trees: residual text is what pass two
//! will see, and the scan must agree with it. It tracks quotes so string
//! contents never produce words, and drops keywords, numbers, attribute tails
//! and named-argument keys.

use std::collections::BTreeSet;

use crate::context::Binding;
use crate::errors::{RegionError, TemplateError};
use crate::eval::{EvalFlags, EvalOutcome};
use crate::render::Renderer;
use crate::Value;

/// Words that are never variable references.
const RESERVED: &[&str] = &[
    "and", "or", "not", "in", "is", "if", "else", "elif", "true", "false", "none", "null", "True",
    "False", "None", "filter", "defined", "undefined",
];

/// How far an expression resolved.
#[derive(Clone, Debug, PartialEq)]
pub enum ResolutionResult {
    Resolved(Value),
    /// Some parts resolved; `text` is the residual source.
    Partial {
        text: String,
        deferred_words: BTreeSet<String>,
    },
    /// Nothing resolved; `text` is the original source.
    Deferred {
        text: String,
        deferred_words: BTreeSet<String>,
    },
}

impl ResolutionResult {
    #[inline]
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionResult::Resolved(_))
    }
}

#[inline]
fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b >= 0x80
}

#[inline]
pub fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

/// Identifier-like tokens outside string literals, in order of appearance.
///
/// Drops empty tokens, numbers, attribute tails (`.x`), reserved words and
/// named-argument keys (`key=` but not `key ==`).
pub fn candidate_words(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut words = Vec::new();
    let mut quote: Option<u8> = None;
    let mut start: Option<usize> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        if is_word_byte(b) {
            start.get_or_insert(i);
        } else {
            if let Some(s) = start.take() {
                push_word(text, s, i, &mut words);
            }
            if b == b'\'' || b == b'"' {
                quote = Some(b);
            }
        }
        i += 1;
    }
    if let Some(s) = start {
        push_word(text, s, bytes.len(), &mut words);
    }
    words
}

fn push_word<'a>(text: &'a str, start: usize, end: usize, words: &mut Vec<&'a str>) {
    let word = &text[start..end];
    let Some(first) = word.bytes().next() else {
        return;
    };
    if first.is_ascii_digit() || first == b'.' || is_reserved(word) {
        return;
    }
    let rest = text[end..].trim_start();
    if rest.starts_with('=') && !rest.starts_with("==") {
        return;
    }
    words.push(word);
}

/// Root segment of a dotted word.
#[inline]
fn root_of(word: &str) -> &str {
    word.split('.').next().unwrap_or(word)
}

impl Renderer<'_> {
    /// Root names in `text` that this pass cannot supply.
    pub fn find_deferred_words(&self, text: &str) -> BTreeSet<String> {
        let words: BTreeSet<String> = candidate_words(text)
            .into_iter()
            .map(root_of)
            .filter(|root| !root.is_empty() && self.needs_definition(root))
            .map(str::to_string)
            .collect();
        tracing::trace!(text, ?words, "classified");
        words
    }

    /// Whether `root` names something pass two must see defined.
    fn needs_definition(&self, root: &str) -> bool {
        match self.scopes.get(root) {
            Some(Binding::Deferred(_)) => true,
            Some(Binding::Value(v)) => !v.is_none(),
            None => false,
        }
    }

    /// Resolve one expression.
    pub fn resolve_expression(&mut self, src: &str) -> Result<ResolutionResult, RegionError> {
        self.resolve_with(src, EvalFlags::empty())
    }

    /// Resolve one expression without side effects.
    pub(crate) fn resolve_pure(&mut self, src: &str) -> Result<ResolutionResult, RegionError> {
        self.resolve_with(src, EvalFlags::PURE)
    }

    /// Resolve a comma-separated expression list as one list value. The
    /// residual text keeps the list shape without the brackets.
    pub(crate) fn resolve_composite(&mut self, chunk: &str) -> Result<ResolutionResult, RegionError> {
        let result = self.resolve_with(&format!("[{chunk}]"), EvalFlags::empty())?;
        Ok(match result {
            ResolutionResult::Partial {
                text,
                deferred_words,
            } => ResolutionResult::Partial {
                text: strip_brackets(&text).to_string(),
                deferred_words,
            },
            ResolutionResult::Deferred { deferred_words, .. } => ResolutionResult::Deferred {
                text: chunk.trim().to_string(),
                deferred_words,
            },
            resolved @ ResolutionResult::Resolved(_) => resolved,
        })
    }

    fn resolve_with(&mut self, src: &str, flags: EvalFlags) -> Result<ResolutionResult, RegionError> {
        Ok(match self.evaluate(src, flags)? {
            EvalOutcome::Evaluated(v) => ResolutionResult::Resolved(v),
            EvalOutcome::SyntaxError(message) => {
                self.warn(TemplateError::syntax(message, self.span));
                ResolutionResult::Resolved(Value::None)
            }
            EvalOutcome::Failed(error) => {
                self.warn(TemplateError::eval(&error, self.span));
                ResolutionResult::Resolved(Value::None)
            }
            EvalOutcome::PartiallyDeferred(text) => {
                let deferred_words = self.find_deferred_words(&text);
                ResolutionResult::Partial {
                    text,
                    deferred_words,
                }
            }
            EvalOutcome::FullyDeferred(text) => {
                let deferred_words = self.find_deferred_words(&text);
                ResolutionResult::Deferred {
                    text: text.trim().to_string(),
                    deferred_words,
                }
            }
        })
    }
}

fn strip_brackets(text: &str) -> &str {
    text.strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(text)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
