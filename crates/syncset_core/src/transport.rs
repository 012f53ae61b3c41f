//! Transport layer abstraction for change batches.

use crate::error::SyncResult;
use crate::payload::SyncPayload;
use crate::pending::{FlushId, FlushLedger};
use crate::record::Record;
use crate::set::SyncedSet;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::warn;

/// A transport delivers change batches to the remote peer.
///
/// This trait is the only I/O boundary of a synchronized set. An
/// implementation is responsible for serialization and delivery, and must
/// eventually call [`FlushAck::complete`] once the payload has been sent or
/// queued. Until it does, the flush stays outstanding on the sending set.
pub trait Transport<T>: Send + Sync {
    /// Hands a payload to the transport.
    fn send(&self, payload: SyncPayload<T>, ack: FlushAck);
}

/// Completion handle for one flush.
///
/// Consumed by [`FlushAck::complete`], so a flush cannot be acknowledged
/// twice. Dropping the handle without completing it leaves the flush
/// outstanding.
pub struct FlushAck {
    id: FlushId,
    ledger: Weak<Mutex<FlushLedger>>,
    completed: bool,
}

impl FlushAck {
    pub(crate) fn new(id: FlushId, ledger: &Arc<Mutex<FlushLedger>>) -> Self {
        Self {
            id,
            ledger: Arc::downgrade(ledger),
            completed: false,
        }
    }

    /// Returns the flush this handle acknowledges.
    pub fn id(&self) -> FlushId {
        self.id
    }

    /// Acknowledges the flush.
    pub fn complete(mut self) {
        self.completed = true;
        if let Some(ledger) = self.ledger.upgrade() {
            ledger.lock().close(self.id);
        }
    }
}

impl Drop for FlushAck {
    fn drop(&mut self) {
        if !self.completed && self.ledger.strong_count() > 0 {
            warn!(flush = %self.id, "flush acknowledgement dropped without completion");
        }
    }
}

impl fmt::Debug for FlushAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlushAck")
            .field("id", &self.id)
            .field("completed", &self.completed)
            .finish()
    }
}

/// Adapts a closure into a transport.
pub struct FnTransport<F> {
    send: F,
}

impl<F> FnTransport<F> {
    /// Wraps `send`.
    pub fn new(send: F) -> Self {
        Self { send }
    }
}

impl<T, F> Transport<T> for FnTransport<F>
where
    F: Fn(SyncPayload<T>, FlushAck) + Send + Sync,
{
    fn send(&self, payload: SyncPayload<T>, ack: FlushAck) {
        (self.send)(payload, ack)
    }
}

/// A transport that drops every payload and acknowledges at once.
#[derive(Debug, Default)]
pub struct NullTransport {
    sent: AtomicU64,
}

impl NullTransport {
    /// Creates a new null transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of payloads received.
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }
}

impl<T> Transport<T> for NullTransport {
    fn send(&self, _payload: SyncPayload<T>, ack: FlushAck) {
        self.sent.fetch_add(1, Ordering::SeqCst);
        ack.complete();
    }
}

/// A transport that holds payloads until they are taken out.
///
/// Useful for deferring acknowledgement and for inspecting exactly what a
/// set transmitted.
pub struct QueuedTransport<T> {
    queue: Mutex<VecDeque<(SyncPayload<T>, FlushAck)>>,
}

impl<T> QueuedTransport<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Removes the oldest queued payload together with its ack.
    pub fn pop(&self) -> Option<(SyncPayload<T>, FlushAck)> {
        self.queue.lock().pop_front()
    }

    /// Returns the number of queued payloads.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl<T: Record> QueuedTransport<T> {
    /// Delivers every queued payload to `peer` in order, acknowledging each.
    ///
    /// Returns the number of payloads delivered. Payloads queued while
    /// delivering are delivered too.
    pub fn deliver_all<R: Send + 'static>(&self, peer: &SyncedSet<T, R>) -> SyncResult<usize> {
        let mut delivered = 0;
        while let Some((payload, ack)) = self.pop() {
            peer.receive(payload)?;
            ack.complete();
            delivered += 1;
        }
        Ok(delivered)
    }
}

impl<T> Default for QueuedTransport<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Transport<T> for QueuedTransport<T> {
    fn send(&self, payload: SyncPayload<T>, ack: FlushAck) {
        self.queue.lock().push_back((payload, ack));
    }
}

type Reencode<T> = fn(SyncPayload<T>) -> SyncResult<SyncPayload<T>>;

fn reencode_cbor<T: Serialize + DeserializeOwned>(
    payload: SyncPayload<T>,
) -> SyncResult<SyncPayload<T>> {
    SyncPayload::decode(&payload.encode()?)
}

/// Delivers payloads synchronously to a peer set in the same process.
///
/// The peer is held weakly so two sets can be wired to each other. Delivery
/// happens inside the sender's flush, so the peer's own flushes may re-enter
/// the sender; this is the mirrored setup used in tests and demos.
pub struct LoopbackTransport<T: Record, R> {
    peer: Weak<SyncedSet<T, R>>,
    reencode: Option<Reencode<T>>,
    delivered: AtomicU64,
}

impl<T: Record, R: Send + 'static> LoopbackTransport<T, R> {
    /// Creates a transport that hands payloads to `peer` as they are.
    pub fn new(peer: &Arc<SyncedSet<T, R>>) -> Self {
        Self {
            peer: Arc::downgrade(peer),
            reencode: None,
            delivered: AtomicU64::new(0),
        }
    }

    /// Returns the number of payloads delivered.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }
}

impl<T, R> LoopbackTransport<T, R>
where
    T: Record + Serialize + DeserializeOwned,
    R: Send + 'static,
{
    /// Creates a transport that passes every payload through the CBOR
    /// codec before delivery.
    pub fn over_cbor(peer: &Arc<SyncedSet<T, R>>) -> Self {
        Self {
            peer: Arc::downgrade(peer),
            reencode: Some(reencode_cbor::<T>),
            delivered: AtomicU64::new(0),
        }
    }
}

impl<T: Record, R: Send + 'static> Transport<T> for LoopbackTransport<T, R> {
    fn send(&self, payload: SyncPayload<T>, ack: FlushAck) {
        let Some(peer) = self.peer.upgrade() else {
            warn!(flush = %ack.id(), "loopback peer dropped, payload discarded");
            return;
        };

        let payload = match self.reencode {
            Some(reencode) => match reencode(payload) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(flush = %ack.id(), error = %e, "failed to re-encode payload");
                    return;
                }
            },
            None => payload,
        };

        if let Err(e) = peer.receive(payload) {
            warn!(flush = %ack.id(), error = %e, "peer rejected part of the payload");
        }
        self.delivered.fetch_add(1, Ordering::SeqCst);
        ack.complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_record::Item;

    fn ack() -> (Arc<Mutex<FlushLedger>>, FlushAck) {
        let ledger = Arc::new(Mutex::new(FlushLedger::default()));
        let id = ledger.lock().open(Default::default());
        let ack = FlushAck::new(id, &ledger);
        (ledger, ack)
    }

    #[test]
    fn complete_closes_the_flush() {
        let (ledger, ack) = ack();
        assert_eq!(ledger.lock().len(), 1);
        ack.complete();
        assert_eq!(ledger.lock().len(), 0);
        assert_eq!(ledger.lock().acknowledged(), 1);
    }

    #[test]
    fn dropped_ack_stays_outstanding() {
        let (ledger, ack) = ack();
        drop(ack);
        assert_eq!(ledger.lock().len(), 1);
    }

    #[test]
    fn ack_outliving_ledger_is_harmless() {
        let (ledger, ack) = ack();
        drop(ledger);
        ack.complete();
    }

    #[test]
    fn null_transport_acks() {
        let (ledger, ack) = ack();
        let transport = NullTransport::new();
        Transport::<Item>::send(&transport, SyncPayload::new(), ack);
        assert_eq!(transport.sent(), 1);
        assert_eq!(ledger.lock().len(), 0);
    }

    #[test]
    fn fn_transport_forwards() {
        let (ledger, ack) = ack();
        let seen = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&seen);
        let transport = FnTransport::new(move |payload: SyncPayload<Item>, ack: FlushAck| {
            counter.fetch_add(payload.len() as u64, Ordering::SeqCst);
            ack.complete();
        });

        let mut payload = SyncPayload::new();
        payload.added.push(Item::new(1, 0, false));
        transport.send(payload, ack);

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(ledger.lock().len(), 0);
    }

    #[test]
    fn queued_transport_holds_payloads() {
        let (ledger, ack) = ack();
        let transport = QueuedTransport::<Item>::new();
        assert!(transport.is_empty());

        transport.send(SyncPayload::new(), ack);
        assert_eq!(transport.len(), 1);
        assert_eq!(ledger.lock().len(), 1);

        let (_, ack) = transport.pop().unwrap();
        ack.complete();
        assert_eq!(ledger.lock().len(), 0);
        assert!(transport.pop().is_none());
    }
}
