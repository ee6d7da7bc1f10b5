//! Per-call container arena.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use deft_ir::Data;
use rustc_hash::{FxHashSet, FxHasher};
use smallvec::SmallVec;

use super::{ObjId, Value};

/// Ids on the current traversal path, for cycle detection.
pub(super) type Path = SmallVec<[ObjId; 8]>;

/// A heap-allocated container.
#[derive(Clone, Debug, PartialEq)]
pub enum HeapObject {
    List(Vec<Value>),
    /// Ordered map with string keys.
    Map(Vec<(String, Value)>),
    Namespace(Vec<(String, Value)>),
}

/// Arena owning every container created during one render call.
///
/// Objects are never freed before the call ends; a render call is short and
/// the arena is dropped with it.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<HeapObject>,
}

impl Heap {
    pub fn new() -> Self {
        Heap::default()
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn alloc(&mut self, object: HeapObject) -> ObjId {
        let id = u32::try_from(self.objects.len()).unwrap_or(u32::MAX);
        self.objects.push(object);
        ObjId(id)
    }

    pub fn new_list(&mut self, items: Vec<Value>) -> Value {
        Value::List(self.alloc(HeapObject::List(items)))
    }

    pub fn new_map(&mut self, entries: Vec<(String, Value)>) -> Value {
        Value::Map(self.alloc(HeapObject::Map(entries)))
    }

    pub fn new_namespace(&mut self, entries: Vec<(String, Value)>) -> Value {
        Value::Namespace(self.alloc(HeapObject::Namespace(entries)))
    }

    #[inline]
    pub fn get(&self, id: ObjId) -> &HeapObject {
        &self.objects[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: ObjId) -> &mut HeapObject {
        &mut self.objects[id.index()]
    }

    /// Elements of a list (empty for other objects).
    pub fn items(&self, id: ObjId) -> &[Value] {
        match self.get(id) {
            HeapObject::List(items) => items,
            HeapObject::Map(_) | HeapObject::Namespace(_) => &[],
        }
    }

    /// Entries of a map or namespace (empty for lists).
    pub fn entries(&self, id: ObjId) -> &[(String, Value)] {
        match self.get(id) {
            HeapObject::Map(entries) | HeapObject::Namespace(entries) => entries,
            HeapObject::List(_) => &[],
        }
    }

    /// Entry lookup on a map or namespace.
    pub fn entry(&self, id: ObjId, key: &str) -> Option<&Value> {
        self.entries(id)
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Insert or replace an entry, keeping the position of existing keys.
    pub fn set_entry(&mut self, id: ObjId, key: &str, value: Value) {
        if let HeapObject::Map(entries) | HeapObject::Namespace(entries) = self.get_mut(id) {
            match entries.iter_mut().find(|(k, _)| k == key) {
                Some(slot) => slot.1 = value,
                None => entries.push((key.to_string(), value)),
            }
        }
    }

    /// Containers reachable from `value`, its own included.
    pub fn reachable(&self, value: &Value) -> FxHashSet<ObjId> {
        let mut seen = FxHashSet::default();
        let mut stack: Vec<ObjId> = value.object().into_iter().collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let children = match self.get(id) {
                HeapObject::List(items) => items.iter().filter_map(Value::object).collect::<Vec<_>>(),
                HeapObject::Map(entries) | HeapObject::Namespace(entries) => {
                    entries.iter().filter_map(|(_, v)| v.object()).collect()
                }
            };
            stack.extend(children);
        }
        seen
    }

    /// Copy host data into the arena.
    pub fn import(&mut self, data: &Data) -> Value {
        match data {
            Data::None => Value::None,
            Data::Bool(b) => Value::Bool(*b),
            Data::Int(n) => Value::Int(*n),
            Data::Float(x) => Value::Float(*x),
            Data::Str(s) => Value::str(s.as_str()),
            Data::List(items) => {
                let items = items.iter().map(|item| self.import(item)).collect();
                self.new_list(items)
            }
            Data::Map(entries) => {
                let entries = entries
                    .iter()
                    .map(|(k, v)| (k.clone(), self.import(v)))
                    .collect();
                self.new_map(entries)
            }
        }
    }

    /// Truthiness as templates see it.
    pub fn truthy(&self, value: &Value) -> bool {
        match value {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) | Value::Markup(s) => !s.is_empty(),
            Value::List(id) => !self.items(*id).is_empty(),
            Value::Map(id) => !self.entries(*id).is_empty(),
            Value::Namespace(_) | Value::Macro(_) | Value::Function(_) => true,
        }
    }

    /// Hash of a value's identity and deep content.
    ///
    /// Two fingerprints differ when a binding was rebound to another object
    /// or when a container it holds was mutated in place.
    pub fn fingerprint(&self, value: &Value) -> u64 {
        let mut hasher = FxHasher::default();
        self.hash_value(value, &mut hasher, &mut Path::new());
        hasher.finish()
    }

    fn hash_value(&self, value: &Value, h: &mut FxHasher, path: &mut Path) {
        std::mem::discriminant(value).hash(h);
        match value {
            Value::None => {}
            Value::Bool(b) => b.hash(h),
            Value::Int(n) => n.hash(h),
            Value::Float(x) => x.to_bits().hash(h),
            Value::Str(s) | Value::Markup(s) => s.hash(h),
            Value::Macro(def) => {
                def.name.hash(h);
                Arc::as_ptr(def).hash(h);
            }
            Value::Function(name) => name.hash(h),
            Value::List(id) | Value::Map(id) | Value::Namespace(id) => {
                id.hash(h);
                if path.contains(id) {
                    return;
                }
                path.push(*id);
                match self.get(*id) {
                    HeapObject::List(items) => {
                        items.len().hash(h);
                        for item in items {
                            self.hash_value(item, h, path);
                        }
                    }
                    HeapObject::Map(entries) | HeapObject::Namespace(entries) => {
                        entries.len().hash(h);
                        for (k, v) in entries {
                            k.hash(h);
                            self.hash_value(v, h, path);
                        }
                    }
                }
                path.pop();
            }
        }
    }

    /// Template-level equality: deep for lists and maps, numeric across
    /// int/float, textual across str/markup.
    pub fn deep_eq(&self, a: &Value, b: &Value) -> bool {
        self.eq_inner(a, b, &mut Path::new())
    }

    fn eq_inner(&self, a: &Value, b: &Value, path: &mut Path) -> bool {
        match (a, b) {
            (Value::None, Value::None) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Int(x), Value::Int(y)) => x == y,
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                a.as_f64() == b.as_f64()
            }
            (Value::Str(x) | Value::Markup(x), Value::Str(y) | Value::Markup(y)) => x == y,
            (Value::Macro(x), Value::Macro(y)) => Arc::ptr_eq(x, y),
            (Value::Function(x), Value::Function(y)) => x == y,
            (Value::Namespace(x), Value::Namespace(y)) => x == y,
            (Value::List(x), Value::List(y)) => {
                if x == y {
                    return true;
                }
                if path.contains(x) {
                    return false;
                }
                let (xs, ys) = (self.items(*x), self.items(*y));
                if xs.len() != ys.len() {
                    return false;
                }
                path.push(*x);
                let equal = xs.iter().zip(ys).all(|(l, r)| self.eq_inner(l, r, path));
                path.pop();
                equal
            }
            (Value::Map(x), Value::Map(y)) => {
                if x == y {
                    return true;
                }
                if path.contains(x) {
                    return false;
                }
                let (xs, ys) = (self.entries(*x), self.entries(*y));
                if xs.len() != ys.len() {
                    return false;
                }
                path.push(*x);
                let equal = xs.iter().all(|(k, v)| {
                    self.entry(*y, k)
                        .is_some_and(|other| self.eq_inner(v, other, path))
                });
                path.pop();
                equal
            }
            _ => false,
        }
    }

    /// Ordering for `<`-style comparison and sorting.
    ///
    /// Numbers compare numerically, text lexically, lists element-wise.
    /// Anything else is unordered.
    pub fn compare(&self, a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                a.as_f64()?.partial_cmp(&b.as_f64()?)
            }
            (Value::Str(x) | Value::Markup(x), Value::Str(y) | Value::Markup(y)) => Some(x.cmp(y)),
            (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
            (Value::List(x), Value::List(y)) => {
                let (xs, ys) = (self.items(*x), self.items(*y));
                for (l, r) in xs.iter().zip(ys) {
                    match self.compare(l, r)? {
                        Ordering::Equal => {}
                        other => return Some(other),
                    }
                }
                Some(xs.len().cmp(&ys.len()))
            }
            _ => None,
        }
    }
}
