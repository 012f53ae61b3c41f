//! Notifications for objects added to, updated in, or deleted from a set.
//!
//! Two delivery styles share one [`EventBus`]:
//! - callbacks registered with [`EventBus::on`] / [`EventBus::listen`],
//!   invoked synchronously inside the operation that caused the event
//! - channels returned by [`EventBus::subscribe`], which receive a clone of
//!   every event for later consumption
//!
//! # Usage
//!
//! ```rust,ignore
//! let id = set.events().on(EventKind::Update, |event| {
//!     if let SetEvent::Updated { field, .. } = event {
//!         println!("{field} changed");
//!     }
//! });
//!
//! let receiver = set.events().subscribe();
//! // ... mutate the set ...
//! while let Ok(event) = receiver.try_recv() {
//!     println!("{:?}", event.kind());
//! }
//!
//! set.events().off(id);
//! ```

use crate::record::Tracked;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

/// Kind of notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// An object entered the set.
    Add,
    /// A tracked write changed an object's projection.
    Update,
    /// An object was deleted locally.
    Delete,
}

/// A single notification.
pub enum SetEvent<T> {
    /// An object entered the set, locally or from a remote batch.
    Added(Tracked<T>),
    /// A tracked write changed the object's projection.
    Updated {
        /// The updated object.
        object: Tracked<T>,
        /// Name of the field whose write caused the change.
        field: String,
    },
    /// An object was deleted locally.
    Deleted(Tracked<T>),
}

impl<T> SetEvent<T> {
    /// Returns the kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            SetEvent::Added(_) => EventKind::Add,
            SetEvent::Updated { .. } => EventKind::Update,
            SetEvent::Deleted(_) => EventKind::Delete,
        }
    }

    /// Returns the object the event refers to.
    pub fn object(&self) -> &Tracked<T> {
        match self {
            SetEvent::Added(object) | SetEvent::Deleted(object) => object,
            SetEvent::Updated { object, .. } => object,
        }
    }
}

impl<T> Clone for SetEvent<T> {
    fn clone(&self) -> Self {
        match self {
            SetEvent::Added(object) => SetEvent::Added(object.clone()),
            SetEvent::Updated { object, field } => SetEvent::Updated {
                object: object.clone(),
                field: field.clone(),
            },
            SetEvent::Deleted(object) => SetEvent::Deleted(object.clone()),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SetEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetEvent::Added(object) => f.debug_tuple("Added").field(object).finish(),
            SetEvent::Updated { object, field } => f
                .debug_struct("Updated")
                .field("object", object)
                .field("field", field)
                .finish(),
            SetEvent::Deleted(object) => f.debug_tuple("Deleted").field(object).finish(),
        }
    }
}

/// Handle returned when registering a callback, used to remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback<T> = Arc<dyn Fn(&SetEvent<T>) + Send + Sync>;

struct Listener<T> {
    id: ListenerId,
    kind: Option<EventKind>,
    callback: Callback<T>,
}

/// Distributes set notifications to callbacks and channel subscribers.
///
/// The bus:
/// - Delivers in the order events are emitted
/// - Invokes callbacks without holding its own locks, so a callback may
///   register or remove listeners and mutate the set
/// - Drops channel subscribers whose receiver has gone away
pub struct EventBus<T> {
    listeners: RwLock<Vec<Listener<T>>>,
    subscribers: Mutex<Vec<Sender<SetEvent<T>>>>,
    next_id: AtomicU64,
}

impl<T> EventBus<T> {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a callback for one kind of event.
    pub fn on(
        &self,
        kind: EventKind,
        callback: impl Fn(&SetEvent<T>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.register(Some(kind), Arc::new(callback))
    }

    /// Registers a callback for every event.
    pub fn listen(&self, callback: impl Fn(&SetEvent<T>) + Send + Sync + 'static) -> ListenerId {
        self.register(None, Arc::new(callback))
    }

    fn register(&self, kind: Option<EventKind>, callback: Callback<T>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push(Listener { id, kind, callback });
        id
    }

    /// Removes a callback. Returns false if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|listener| listener.id != id);
        listeners.len() != before
    }

    /// Subscribes a channel that receives every future event.
    ///
    /// The receiver should be drained regularly to avoid unbounded growth.
    pub fn subscribe(&self) -> Receiver<SetEvent<T>> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Emits an event to all callbacks and subscribers.
    pub fn emit(&self, event: SetEvent<T>) {
        let kind = event.kind();
        let callbacks: Vec<Callback<T>> = self
            .listeners
            .read()
            .iter()
            .filter(|listener| listener.kind.map_or(true, |k| k == kind))
            .map(|listener| Arc::clone(&listener.callback))
            .collect();

        for callback in callbacks {
            callback(&event);
        }

        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Returns the number of registered callbacks.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Returns the number of live channel subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_record::Item;
    use std::sync::atomic::AtomicUsize;

    fn handle(id: i64) -> Tracked<Item> {
        Tracked::new(Item::new(id, 0, false))
    }

    #[test]
    fn callbacks_filter_by_kind() {
        let bus = EventBus::new();
        let adds = Arc::new(AtomicUsize::new(0));
        let all = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&adds);
        bus.on(EventKind::Add, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = Arc::clone(&all);
        bus.listen(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(SetEvent::Added(handle(1)));
        bus.emit(SetEvent::Deleted(handle(1)));

        assert_eq!(adds.load(Ordering::SeqCst), 1);
        assert_eq!(all.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn off_removes_callback() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = bus.listen(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(bus.listener_count(), 1);
        assert!(bus.off(id));
        assert!(!bus.off(id));
        assert_eq!(bus.listener_count(), 0);

        bus.emit(SetEvent::Added(handle(1)));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn subscribers_receive_in_order() {
        let bus = EventBus::new();
        let rx = bus.subscribe();

        bus.emit(SetEvent::Added(handle(1)));
        bus.emit(SetEvent::Updated {
            object: handle(1),
            field: "a".into(),
        });

        let first = rx.try_recv().unwrap();
        assert_eq!(first.kind(), EventKind::Add);
        let second = rx.try_recv().unwrap();
        assert_eq!(second.kind(), EventKind::Update);
        assert!(matches!(second, SetEvent::Updated { field, .. } if field == "a"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn subscriber_cleanup() {
        let bus: EventBus<Item> = EventBus::new();
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        drop(rx);
        bus.emit(SetEvent::Added(handle(1)));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn callback_may_register_listeners() {
        let bus = Arc::new(EventBus::new());
        let inner = Arc::clone(&bus);
        bus.on(EventKind::Add, move |_| {
            inner.listen(|_| {});
        });

        bus.emit(SetEvent::Added(handle(1)));
        assert_eq!(bus.listener_count(), 2);
    }

    #[test]
    fn event_object_accessor() {
        let object = handle(3);
        let event = SetEvent::Updated {
            object: object.clone(),
            field: "b".into(),
        };
        assert!(event.object().ptr_eq(&object));
        assert!(event.clone().object().ptr_eq(&object));
    }
}
