//! Side table of derived projections, keyed by identity.

use std::collections::HashMap;
use syncset_codec::Value;

/// The last projection computed for every tracked identity.
///
/// Entries are created on add and dropped when the identity leaves the
/// store. Comparisons are always against the most recent projection, not
/// the last one that produced a notification.
pub(crate) struct ProjectionTable<R> {
    entries: HashMap<Value, R>,
}

impl<R> ProjectionTable<R> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, id: Value, projection: R) {
        self.entries.insert(id, projection);
    }

    /// Removes and returns the projection for `id`.
    pub fn take(&mut self, id: &Value) -> Option<R> {
        self.entries.remove(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
