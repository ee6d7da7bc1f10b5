//! Builtin filters, tests and functions.
//!
//! The registry is built once per engine and shared read-only by every render
//! call. There is no global table: two engines can carry different builtins.
//!
//! # Module Structure
//!
//! - `filters`: `x|name(args)`
//! - `predicates`: `x is name(args)`
//! - `functions`: free functions callable by name (`range(3)`)

mod filters;
mod functions;
mod predicates;

pub(crate) use filters::iter_items;

use std::fmt;

use rustc_hash::FxHashMap;

use crate::errors::{unexpected_argument, wrong_arg_count, EvalError};
use crate::{Heap, Value};

/// Evaluated call arguments.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub named: Vec<(String, Value)>,
}

impl CallArgs {
    pub fn positional(values: Vec<Value>) -> Self {
        CallArgs {
            positional: values,
            named: Vec::new(),
        }
    }

    /// Argument at `index`, or passed by `name`.
    pub fn get(&self, index: usize, name: &str) -> Option<&Value> {
        self.positional.get(index).or_else(|| {
            self.named
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v)
        })
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// Reject calls passing more than `max` positional arguments or a named
    /// argument outside `names`.
    pub fn check(&self, callee: &str, max: usize, names: &[&str]) -> Result<(), EvalError> {
        if self.positional.len() > max {
            return Err(wrong_arg_count(callee, arity_text(max), self.positional.len()));
        }
        if let Some((name, _)) = self.named.iter().find(|(k, _)| !names.contains(&k.as_str())) {
            return Err(unexpected_argument(callee, name));
        }
        Ok(())
    }
}

fn arity_text(max: usize) -> &'static str {
    match max {
        0 => "no",
        1 => "at most 1",
        2 => "at most 2",
        _ => "at most 3",
    }
}

pub type FilterFn = fn(&mut Heap, &Value, &CallArgs) -> Result<Value, EvalError>;
pub type TestFn = fn(&Heap, &Value, &CallArgs) -> Result<bool, EvalError>;
pub type FunctionFn = fn(&mut Heap, &CallArgs) -> Result<Value, EvalError>;

/// Name-indexed builtin tables.
pub struct Builtins {
    filters: FxHashMap<&'static str, FilterFn>,
    tests: FxHashMap<&'static str, TestFn>,
    functions: FxHashMap<&'static str, FunctionFn>,
}

impl Builtins {
    /// Empty registry.
    pub fn empty() -> Self {
        Builtins {
            filters: FxHashMap::default(),
            tests: FxHashMap::default(),
            functions: FxHashMap::default(),
        }
    }

    /// Registry with the standard builtins.
    pub fn standard() -> Self {
        let mut builtins = Builtins::empty();
        filters::register(&mut builtins);
        predicates::register(&mut builtins);
        functions::register(&mut builtins);
        builtins
    }

    pub fn register_filter(&mut self, name: &'static str, f: FilterFn) {
        self.filters.insert(name, f);
    }

    pub fn register_test(&mut self, name: &'static str, f: TestFn) {
        self.tests.insert(name, f);
    }

    pub fn register_function(&mut self, name: &'static str, f: FunctionFn) {
        self.functions.insert(name, f);
    }

    pub fn filter(&self, name: &str) -> Option<FilterFn> {
        self.filters.get(name).copied()
    }

    pub fn test(&self, name: &str) -> Option<TestFn> {
        self.tests.get(name).copied()
    }

    /// Function by name, with the registry's own `'static` name.
    pub fn function(&self, name: &str) -> Option<(&'static str, FunctionFn)> {
        self.functions.get_key_value(name).map(|(k, f)| (*k, *f))
    }
}

impl Default for Builtins {
    fn default() -> Self {
        Builtins::standard()
    }
}

fn sorted_names<V>(map: &FxHashMap<&'static str, V>) -> Vec<&'static str> {
    let mut names: Vec<_> = map.keys().copied().collect();
    names.sort_unstable();
    names
}

impl fmt::Debug for Builtins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtins")
            .field("filters", &sorted_names(&self.filters))
            .field("tests", &sorted_names(&self.tests))
            .field("functions", &sorted_names(&self.functions))
            .finish()
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
