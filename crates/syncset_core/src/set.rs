//! The synchronized set.

use crate::config::SyncSetOptions;
use crate::error::{SyncResult, SyncSetError};
use crate::events::{EventBus, SetEvent};
use crate::payload::SyncPayload;
use crate::pending::{FlushId, FlushLedger, PendingChanges, PendingCounts};
use crate::projection::ProjectionTable;
use crate::record::{Identify, Record, Tracked};
use crate::store::IdentityStore;
use crate::transport::{FlushAck, Transport};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use syncset_codec::Value;
use tracing::{debug, trace, warn};

/// Outcome of a write routed through [`SyncedSet::set_field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The object is not (or no longer) in the set; the write was applied
    /// with no tracking side effect.
    Untracked,
    /// The projection did not change; nothing was queued or emitted.
    Suppressed,
    /// The projection changed; the object was queued as updated, a flush
    /// was attempted and an update notification emitted.
    Propagated,
}

/// Statistics about a set's traffic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetStats {
    /// Flushes handed to the transport.
    pub flushes_started: u64,
    /// Flushes the transport acknowledged.
    pub flushes_acknowledged: u64,
    /// Remote batches applied through `receive`.
    pub batches_received: u64,
    /// Tracked writes that changed the projection.
    pub writes_propagated: u64,
    /// Tracked writes whose projection was unchanged.
    pub writes_suppressed: u64,
    /// Writes to objects that are no longer in the set.
    pub writes_untracked: u64,
}

struct SetState<T, R> {
    store: IdentityStore<T>,
    projections: ProjectionTable<R>,
    pending: PendingChanges<T>,
    stats: SetStats,
}

impl<T, R> SetState<T, R> {
    fn remove(&mut self, id: &Value) -> Option<Tracked<T>> {
        let object = self.store.remove(id)?;
        self.projections.take(id);
        Some(object)
    }
}

/// A set of objects kept in sync with a remote peer.
///
/// The set tracks local adds, deletes, and tracked field writes, and hands
/// them to its [`Transport`] as [`SyncPayload`]s. Batches from the peer are
/// applied with [`SyncedSet::receive`] without being sent back.
///
/// A field write only counts as a change when the configured reducer's
/// projection of the object changes, so writes the projection ignores
/// produce no traffic and no notifications.
///
/// No internal lock is held while the transport, reducer, equality function
/// or listeners run, so a synchronous transport may deliver straight into a
/// peer that in turn delivers back into this set.
///
/// # Example
///
/// ```rust,ignore
/// let options = SyncSetOptions::from_reducer(|task: &Task| task.done).with_pick(["done"]);
/// let set = SyncedSet::new(options)?;
/// set.connect(Arc::new(my_transport));
///
/// let task = set.insert(Task::new("t1", "write docs"))?;
/// set.set_field(&task, "done", true)?; // queued and flushed as an update
/// set.delete(&task)?;
/// ```
pub struct SyncedSet<T: Record, R> {
    options: SyncSetOptions<T, R>,
    transport: RwLock<Option<Arc<dyn Transport<T>>>>,
    state: Mutex<SetState<T, R>>,
    ledger: Arc<Mutex<FlushLedger>>,
    events: EventBus<T>,
}

impl<T: Record, R: Send + 'static> SyncedSet<T, R> {
    /// Creates a set with no transport attached.
    ///
    /// Changes accumulate until a transport is attached with
    /// [`SyncedSet::connect`] and the next flush happens.
    pub fn new(options: SyncSetOptions<T, R>) -> SyncResult<Self> {
        options.validate()?;
        Ok(Self {
            options,
            transport: RwLock::new(None),
            state: Mutex::new(SetState {
                store: IdentityStore::new(),
                projections: ProjectionTable::new(),
                pending: PendingChanges::new(),
                stats: SetStats::default(),
            }),
            ledger: Arc::new(Mutex::new(FlushLedger::default())),
            events: EventBus::new(),
        })
    }

    /// Creates a set that flushes through `transport`.
    pub fn with_transport(
        options: SyncSetOptions<T, R>,
        transport: Arc<dyn Transport<T>>,
    ) -> SyncResult<Self> {
        let set = Self::new(options)?;
        set.connect(transport);
        Ok(set)
    }

    /// Attaches (or replaces) the transport.
    pub fn connect(&self, transport: Arc<dyn Transport<T>>) {
        *self.transport.write() = Some(transport);
    }

    /// Detaches the transport. Later changes accumulate until reconnected.
    pub fn disconnect(&self) {
        *self.transport.write() = None;
    }

    /// Returns true if a transport is attached.
    pub fn is_connected(&self) -> bool {
        self.transport.read().is_some()
    }

    /// Returns the options the set was created with.
    pub fn options(&self) -> &SyncSetOptions<T, R> {
        &self.options
    }

    /// Returns the notification bus.
    pub fn events(&self) -> &EventBus<T> {
        &self.events
    }

    fn identity_of(&self, object: &impl Identify) -> SyncResult<Value> {
        object
            .identity(&self.options.id_key)
            .ok_or_else(|| SyncSetError::MissingIdentity {
                key: self.options.id_key.clone(),
            })
    }

    /// Adds an object.
    ///
    /// `from_remote` marks objects applied from a peer's batch: they are
    /// stored and announced but never queued for transmission, which keeps
    /// a remote add from echoing back to its origin.
    ///
    /// # Errors
    ///
    /// [`SyncSetError::DuplicateIdentity`] if the identity is already in the
    /// set, [`SyncSetError::MissingIdentity`] if the object has none.
    pub fn add(&self, object: impl Into<Tracked<T>>, from_remote: bool) -> SyncResult<Tracked<T>> {
        let object = object.into();
        let id = self.identity_of(&object)?;
        let projection = object.with(|o| self.options.reduce(o));

        {
            let mut state = self.state.lock();
            if !state.store.insert(id.clone(), object.clone()) {
                return Err(SyncSetError::DuplicateIdentity { id });
            }
            state.projections.insert(id.clone(), projection);
            if !from_remote {
                state.pending.push_added(&object);
            }
        }

        debug!(id = %id, from_remote, "object added");
        if !from_remote {
            self.flush();
        }
        self.events.emit(SetEvent::Added(object.clone()));
        Ok(object)
    }

    /// Adds a local object; shorthand for `add(object, false)`.
    pub fn insert(&self, object: impl Into<Tracked<T>>) -> SyncResult<Tracked<T>> {
        self.add(object, false)
    }

    /// Writes a field of a tracked object.
    ///
    /// The write is always applied to the instance. If the instance is
    /// still the one the set holds for its identity, the projection is
    /// recomputed and compared with the previous one; only a change queues
    /// the object as updated, flushes, and emits an update notification.
    ///
    /// # Errors
    ///
    /// [`SyncSetError::IdentityImmutable`] for the identity field, or
    /// [`SyncSetError::Record`] if the record rejects the value.
    pub fn set_field(
        &self,
        object: &Tracked<T>,
        field: &str,
        value: impl Into<Value>,
    ) -> SyncResult<WriteOutcome> {
        if field == self.options.id_key {
            return Err(SyncSetError::IdentityImmutable {
                key: self.options.id_key.clone(),
            });
        }
        let id = self.identity_of(object)?;
        let tracked = self.state.lock().store.holds(&id, object);

        object.write().set_field(field, value.into())?;

        if !tracked {
            trace!(id = %id, field, "write to an object outside the set");
            self.state.lock().stats.writes_untracked += 1;
            return Ok(WriteOutcome::Untracked);
        }

        let next = object.with(|o| self.options.reduce(o));
        let prev = self.state.lock().projections.take(&id);
        let changed = prev
            .as_ref()
            .map_or(true, |prev| !self.options.projections_equal(prev, &next));

        {
            let mut state = self.state.lock();
            if !state.store.holds(&id, object) {
                // Removed while the projection was being compared.
                state.stats.writes_untracked += 1;
                return Ok(WriteOutcome::Untracked);
            }
            state.projections.insert(id.clone(), next);
            if changed {
                state.pending.push_updated(object);
                state.stats.writes_propagated += 1;
            } else {
                state.stats.writes_suppressed += 1;
            }
        }

        if !changed {
            trace!(id = %id, field, "projection unchanged, write suppressed");
            return Ok(WriteOutcome::Suppressed);
        }

        self.flush();
        self.events.emit(SetEvent::Updated {
            object: object.clone(),
            field: field.to_string(),
        });
        Ok(WriteOutcome::Propagated)
    }

    /// Deletes an object by identity.
    ///
    /// # Errors
    ///
    /// [`SyncSetError::IdentityNotFound`] if the identity is not in the set.
    pub fn delete(&self, object: &impl Identify) -> SyncResult<()> {
        let id = self.identity_of(object)?;

        let removed = {
            let mut state = self.state.lock();
            let removed = state.remove(&id);
            if removed.is_some() {
                state.pending.push_deleted(id.clone());
            }
            removed
        };
        let Some(removed) = removed else {
            return Err(SyncSetError::IdentityNotFound { id });
        };

        debug!(id = %id, "object deleted");
        self.flush();
        self.events.emit(SetEvent::Deleted(removed));
        Ok(())
    }

    /// Removes an identity without queuing or notifying.
    ///
    /// Returns false if the identity was not in the set.
    pub fn delete_by_id(&self, id: &Value) -> bool {
        self.state.lock().remove(id).is_some()
    }

    /// Returns true if an object with the same identity is in the set.
    pub fn has(&self, object: &impl Identify) -> bool {
        object
            .identity(&self.options.id_key)
            .is_some_and(|id| self.contains_id(&id))
    }

    /// Returns true if the identity is in the set.
    pub fn contains_id(&self, id: &Value) -> bool {
        self.state.lock().store.contains(id)
    }

    /// Applies a remote object's pick-list fields to the local instance.
    ///
    /// Each field goes through [`SyncedSet::set_field`], so the local
    /// projection decides whether the change is re-announced. Objects whose
    /// identity is unknown locally are dropped.
    pub fn update(&self, object: &T) -> SyncResult<()> {
        let Some(local) = object
            .identity(&self.options.id_key)
            .and_then(|id| self.get(&id))
        else {
            debug!("update for an unknown identity dropped");
            return Ok(());
        };

        for field in &self.options.pick {
            if let Some(value) = object.field(field) {
                self.set_field(&local, field, value)?;
            }
        }
        Ok(())
    }

    /// Applies a batch from the peer.
    ///
    /// Deletions apply first, then updates, then additions. Remote
    /// deletions emit no notification and remote additions are never
    /// queued for transmission. Every entry is attempted; the first error
    /// is returned.
    pub fn receive(&self, payload: SyncPayload<T>) -> SyncResult<()> {
        debug!(
            added = payload.added.len(),
            updated = payload.updated.len(),
            deleted = payload.deleted.len(),
            "receiving batch"
        );
        self.state.lock().stats.batches_received += 1;

        let mut first_error = None;

        for id in &payload.deleted {
            self.delete_by_id(id);
        }

        for object in &payload.updated {
            if let Err(e) = self.update(object) {
                warn!(error = %e, "failed to apply remote update");
                first_error.get_or_insert(e);
            }
        }

        for object in payload.added {
            if let Err(e) = self.add(object, true) {
                warn!(error = %e, "failed to apply remote add");
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Hands everything pending to the transport.
    ///
    /// The accumulators are snapshotted and emptied before the transport is
    /// called, so changes made while the flush is outstanding go into the
    /// next payload. Returns `None` if nothing was pending.
    ///
    /// # Errors
    ///
    /// [`SyncSetError::NotConnected`] if no transport is attached; pending
    /// changes are kept.
    pub fn send(&self) -> SyncResult<Option<FlushId>> {
        let transport = self.transport.read().clone();
        let Some(transport) = transport else {
            return Err(SyncSetError::NotConnected);
        };

        let batch = {
            let mut state = self.state.lock();
            if state.pending.is_empty() {
                return Ok(None);
            }
            state.pending.take()
        };

        let counts = batch.counts();
        let payload = batch.into_payload();
        let id = self.ledger.lock().open(counts);

        debug!(
            flush = %id,
            added = counts.added,
            updated = counts.updated,
            deleted = counts.deleted,
            "flushing changes"
        );
        transport.send(payload, FlushAck::new(id, &self.ledger));
        Ok(Some(id))
    }

    fn flush(&self) {
        match self.send() {
            Ok(_) => {}
            Err(SyncSetError::NotConnected) => {
                debug!("no transport attached, changes stay pending");
            }
            Err(e) => warn!(error = %e, "flush failed"),
        }
    }

    /// Returns the sizes of the accumulators.
    pub fn pending(&self) -> PendingCounts {
        self.state.lock().pending.counts()
    }

    /// Returns the flushes still waiting for acknowledgement.
    pub fn in_flight(&self) -> Vec<FlushId> {
        self.ledger.lock().outstanding()
    }

    /// Returns the combined sizes of all unacknowledged flushes.
    pub fn in_flight_counts(&self) -> PendingCounts {
        self.ledger.lock().outstanding_counts()
    }

    /// Returns true if nothing is pending and every flush was acknowledged.
    pub fn is_clean(&self) -> bool {
        self.pending().is_empty() && self.ledger.lock().len() == 0
    }

    /// Returns traffic statistics.
    pub fn stats(&self) -> SetStats {
        let mut stats = self.state.lock().stats.clone();
        let ledger = self.ledger.lock();
        stats.flushes_started = ledger.started();
        stats.flushes_acknowledged = ledger.acknowledged();
        stats
    }

    /// Returns the object with this identity.
    pub fn get(&self, id: &Value) -> Option<Tracked<T>> {
        self.state.lock().store.get(id).cloned()
    }

    /// Returns the number of objects.
    pub fn len(&self) -> usize {
        self.state.lock().store.len()
    }

    /// Returns true if the set holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns every identity, in insertion order.
    pub fn ids(&self) -> Vec<Value> {
        self.state.lock().store.ids()
    }

    /// Returns a handle to every object, in insertion order.
    pub fn values(&self) -> Vec<Tracked<T>> {
        self.state.lock().store.objects()
    }

    /// Iterates over a snapshot of the object handles.
    pub fn iter(&self) -> impl Iterator<Item = Tracked<T>> {
        self.values().into_iter()
    }

    /// Calls `f` for every object, in insertion order.
    pub fn for_each(&self, mut f: impl FnMut(&Tracked<T>)) {
        for object in self.values() {
            f(&object);
        }
    }

    /// Forgets every object.
    ///
    /// Nothing is queued or announced; the peer is not told. Pending
    /// changes and outstanding flushes are left alone.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.store.clear();
        state.projections.clear();
    }

    #[cfg(test)]
    pub(crate) fn projection_count(&self) -> usize {
        self.state.lock().projections.len()
    }
}
