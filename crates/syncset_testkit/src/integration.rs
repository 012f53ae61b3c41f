//! Mirrored set pairs and event recording.
//!
//! A mirrored pair is two sets whose loopback transports deliver into each
//! other synchronously, so every flush is received and acknowledged before
//! the mutating call returns.

use parking_lot::Mutex;
use std::sync::Arc;
use syncset_codec::Value;
use syncset_core::{
    EventKind, ListenerId, LoopbackTransport, Record, SetEvent, SyncResult, SyncSetOptions,
    SyncedSet,
};

/// Two sets wired to each other.
pub struct MirroredPair<T: Record, L, R> {
    /// The first set.
    pub left: Arc<SyncedSet<T, L>>,
    /// The second set.
    pub right: Arc<SyncedSet<T, R>>,
}

/// Creates two sets whose transports deliver payloads to each other as-is.
pub fn mirrored_pair<T, L, R>(
    left: SyncSetOptions<T, L>,
    right: SyncSetOptions<T, R>,
) -> SyncResult<MirroredPair<T, L, R>>
where
    T: Record,
    L: Send + 'static,
    R: Send + 'static,
{
    let pair = MirroredPair {
        left: Arc::new(SyncedSet::new(left)?),
        right: Arc::new(SyncedSet::new(right)?),
    };
    pair.left
        .connect(Arc::new(LoopbackTransport::new(&pair.right)));
    pair.right
        .connect(Arc::new(LoopbackTransport::new(&pair.left)));
    Ok(pair)
}

/// Creates two sets whose transports serialize every payload to CBOR and
/// back, so the receiver never shares instances with the sender.
pub fn mirrored_pair_over_cbor<T, L, R>(
    left: SyncSetOptions<T, L>,
    right: SyncSetOptions<T, R>,
) -> SyncResult<MirroredPair<T, L, R>>
where
    T: Record + serde::Serialize + serde::de::DeserializeOwned,
    L: Send + 'static,
    R: Send + 'static,
{
    let pair = MirroredPair {
        left: Arc::new(SyncedSet::new(left)?),
        right: Arc::new(SyncedSet::new(right)?),
    };
    pair.left
        .connect(Arc::new(LoopbackTransport::over_cbor(&pair.right)));
    pair.right
        .connect(Arc::new(LoopbackTransport::over_cbor(&pair.left)));
    Ok(pair)
}

impl<T: Record, L: Send + 'static, R: Send + 'static> MirroredPair<T, L, R> {
    /// Asserts both sides hold the same identities in the same order.
    pub fn assert_membership_mirrored(&self) {
        assert_eq!(
            self.left.ids(),
            self.right.ids(),
            "left and right sets hold different identities"
        );
    }

    /// Returns true if neither side has pending or unacknowledged changes.
    pub fn is_settled(&self) -> bool {
        self.left.is_clean() && self.right.is_clean()
    }
}

/// One recorded notification: kind, identity and (for updates) field.
pub type Recorded = (EventKind, Value, Option<String>);

/// Records every notification a set emits.
pub struct EventLog {
    entries: Arc<Mutex<Vec<Recorded>>>,
    listener: ListenerId,
}

impl EventLog {
    /// Starts recording the notifications of `set`.
    pub fn attach<T: Record, R: Send + 'static>(set: &SyncedSet<T, R>) -> Self {
        let entries: Arc<Mutex<Vec<Recorded>>> = Arc::default();
        let sink = Arc::clone(&entries);
        let id_key = set.options().id_key.clone();
        let listener = set.events().listen(move |event: &SetEvent<T>| {
            let id = event.object().field(&id_key).unwrap_or(Value::Null);
            let field = match event {
                SetEvent::Updated { field, .. } => Some(field.clone()),
                _ => None,
            };
            sink.lock().push((event.kind(), id, field));
        });
        Self { entries, listener }
    }

    /// Returns the id of the recording listener, for detaching it.
    pub fn listener(&self) -> ListenerId {
        self.listener
    }

    /// Returns everything recorded so far.
    pub fn entries(&self) -> Vec<Recorded> {
        self.entries.lock().clone()
    }

    /// Returns the recorded kinds, in order.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.entries().into_iter().map(|(kind, _, _)| kind).collect()
    }

    /// Returns the number of recorded notifications of `kind`.
    pub fn count(&self, kind: EventKind) -> usize {
        self.entries().iter().filter(|(k, _, _)| *k == kind).count()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
