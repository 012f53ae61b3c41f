//! Identity store: live objects keyed by identity, in insertion order.

use crate::record::Tracked;
use std::collections::{BTreeMap, HashMap};
use syncset_codec::Value;

struct Entry<T> {
    object: Tracked<T>,
    seq: u64,
}

/// Maps identities to live objects.
///
/// Lookups are O(1); iteration follows insertion order.
pub(crate) struct IdentityStore<T> {
    entries: HashMap<Value, Entry<T>>,
    order: BTreeMap<u64, Value>,
    next_seq: u64,
}

impl<T> IdentityStore<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }

    pub fn contains(&self, id: &Value) -> bool {
        self.entries.contains_key(id)
    }

    /// Returns true if `id` maps to exactly this instance.
    pub fn holds(&self, id: &Value, object: &Tracked<T>) -> bool {
        self.entries
            .get(id)
            .is_some_and(|entry| entry.object.ptr_eq(object))
    }

    pub fn get(&self, id: &Value) -> Option<&Tracked<T>> {
        self.entries.get(id).map(|entry| &entry.object)
    }

    /// Inserts a new mapping. Returns false, leaving the store untouched, if
    /// the identity is taken.
    pub fn insert(&mut self, id: Value, object: Tracked<T>) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, id.clone());
        self.entries.insert(id, Entry { object, seq });
        true
    }

    pub fn remove(&mut self, id: &Value) -> Option<Tracked<T>> {
        let entry = self.entries.remove(id)?;
        self.order.remove(&entry.seq);
        Some(entry.object)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn ids(&self) -> Vec<Value> {
        self.order.values().cloned().collect()
    }

    pub fn objects(&self) -> Vec<Tracked<T>> {
        self.order
            .values()
            .filter_map(|id| self.entries.get(id))
            .map(|entry| entry.object.clone())
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
