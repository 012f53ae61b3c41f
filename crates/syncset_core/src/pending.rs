//! Pending-change accumulators and the in-flight flush ledger.

use crate::payload::SyncPayload;
use crate::record::Tracked;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use syncset_codec::Value;

/// Sizes of the three accumulators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingCounts {
    /// Objects added and not yet transmitted.
    pub added: usize,
    /// Objects updated and not yet transmitted.
    pub updated: usize,
    /// Identities deleted and not yet transmitted.
    pub deleted: usize,
}

impl PendingCounts {
    /// Returns true if all three counts are zero.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Returns the sum of the three counts.
    pub fn total(&self) -> usize {
        self.added + self.updated + self.deleted
    }
}

/// Changes accumulated since the last flush.
///
/// Objects are de-duplicated by instance, deletions by identity.
pub(crate) struct PendingChanges<T> {
    added: Vec<Tracked<T>>,
    added_addrs: HashSet<usize>,
    updated: Vec<Tracked<T>>,
    updated_addrs: HashSet<usize>,
    deleted: Vec<Value>,
    deleted_ids: HashSet<Value>,
}

impl<T> PendingChanges<T> {
    pub fn new() -> Self {
        Self {
            added: Vec::new(),
            added_addrs: HashSet::new(),
            updated: Vec::new(),
            updated_addrs: HashSet::new(),
            deleted: Vec::new(),
            deleted_ids: HashSet::new(),
        }
    }

    pub fn push_added(&mut self, object: &Tracked<T>) {
        if self.added_addrs.insert(object.addr()) {
            self.added.push(object.clone());
        }
    }

    pub fn push_updated(&mut self, object: &Tracked<T>) {
        if self.updated_addrs.insert(object.addr()) {
            self.updated.push(object.clone());
        }
    }

    pub fn push_deleted(&mut self, id: Value) {
        if self.deleted_ids.insert(id.clone()) {
            self.deleted.push(id);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts().is_empty()
    }

    pub fn counts(&self) -> PendingCounts {
        PendingCounts {
            added: self.added.len(),
            updated: self.updated.len(),
            deleted: self.deleted.len(),
        }
    }

    /// Moves every accumulated change out, leaving the accumulators empty.
    pub fn take(&mut self) -> Self {
        std::mem::replace(self, Self::new())
    }
}

impl<T: Clone> PendingChanges<T> {
    /// Builds a payload from the current state of every accumulated object.
    pub fn into_payload(self) -> SyncPayload<T> {
        SyncPayload {
            added: self.added.iter().map(Tracked::snapshot).collect(),
            updated: self.updated.iter().map(Tracked::snapshot).collect(),
            deleted: self.deleted,
        }
    }
}

/// Identifies one call into the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlushId(pub(crate) u64);

impl FlushId {
    /// Returns the sequence number of the flush.
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FlushId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flush-{}", self.0)
    }
}

/// Tracks flushes handed to the transport but not yet acknowledged.
#[derive(Debug, Default)]
pub(crate) struct FlushLedger {
    outstanding: BTreeMap<FlushId, PendingCounts>,
    next: u64,
    started: u64,
    acknowledged: u64,
}

impl FlushLedger {
    pub fn open(&mut self, counts: PendingCounts) -> FlushId {
        self.next += 1;
        self.started += 1;
        let id = FlushId(self.next);
        self.outstanding.insert(id, counts);
        id
    }

    /// Closes a flush. Returns false if it was not outstanding.
    pub fn close(&mut self, id: FlushId) -> bool {
        let closed = self.outstanding.remove(&id).is_some();
        if closed {
            self.acknowledged += 1;
        }
        closed
    }

    pub fn outstanding(&self) -> Vec<FlushId> {
        self.outstanding.keys().copied().collect()
    }

    pub fn outstanding_counts(&self) -> PendingCounts {
        self.outstanding
            .values()
            .fold(PendingCounts::default(), |acc, counts| PendingCounts {
                added: acc.added + counts.added,
                updated: acc.updated + counts.updated,
                deleted: acc.deleted + counts.deleted,
            })
    }

    pub fn len(&self) -> usize {
        self.outstanding.len()
    }

    pub fn started(&self) -> u64 {
        self.started
    }

    pub fn acknowledged(&self) -> u64 {
        self.acknowledged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_record::Item;

    #[test]
    fn accumulators_dedupe_by_instance() {
        let mut pending = PendingChanges::new();
        let first = Tracked::new(Item::new(1, 0, false));
        let twin = Tracked::new(Item::new(1, 0, false));

        pending.push_added(&first);
        pending.push_added(&first.clone());
        pending.push_added(&twin);
        pending.push_updated(&first);
        pending.push_updated(&first);

        assert_eq!(
            pending.counts(),
            PendingCounts {
                added: 2,
                updated: 1,
                deleted: 0,
            }
        );
    }

    #[test]
    fn deletions_dedupe_by_identity() {
        let mut pending: PendingChanges<Item> = PendingChanges::new();
        pending.push_deleted(Value::Integer(1));
        pending.push_deleted(Value::Integer(1));
        pending.push_deleted(Value::Integer(2));
        assert_eq!(pending.counts().deleted, 2);
    }

    #[test]
    fn take_empties_and_snapshots_current_state() {
        let mut pending = PendingChanges::new();
        let object = Tracked::new(Item::new(1, 10, false));
        pending.push_added(&object);
        pending.push_updated(&object);
        pending.push_deleted(Value::Integer(3));

        object.write().a = 11;
        let batch = pending.take();
        assert!(pending.is_empty());

        // Writes after the snapshot do not leak into the payload.
        let payload = batch.into_payload();
        object.write().a = 12;

        assert_eq!(payload.added, vec![Item::new(1, 11, false)]);
        assert_eq!(payload.updated, vec![Item::new(1, 11, false)]);
        assert_eq!(payload.deleted, vec![Value::Integer(3)]);
    }

    #[test]
    fn ledger_tracks_outstanding_flushes() {
        let mut ledger = FlushLedger::default();
        let counts = PendingCounts {
            added: 1,
            updated: 2,
            deleted: 0,
        };
        let first = ledger.open(counts);
        let second = ledger.open(counts);
        assert!(first < second);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.outstanding_counts().updated, 4);

        assert!(ledger.close(first));
        assert!(!ledger.close(first));
        assert_eq!(ledger.outstanding(), vec![second]);
        assert_eq!(ledger.started(), 2);
        assert_eq!(ledger.acknowledged(), 1);
    }

    #[test]
    fn flush_id_display() {
        assert_eq!(FlushId(7).to_string(), "flush-7");
        assert_eq!(FlushId(7).sequence(), 7);
    }
}
