//! # SyncSet Core
//!
//! Bidirectional synchronization of object sets.
//!
//! This crate provides:
//! - [`SyncedSet`], an identity-keyed set that tracks local adds, deletes
//!   and field writes and flushes them to a peer
//! - Projection-gated change detection: a write only counts when the
//!   configured reducer's view of the object changes
//! - The [`Transport`] boundary plus loopback, queued and null transports
//! - Add / update / delete notifications via callbacks or channels
//!
//! ## Architecture
//!
//! Every mutation goes through one path:
//! 1. Update the identity store and the projection side table
//! 2. Queue the change in the pending accumulators
//! 3. Flush: snapshot the accumulators into a [`SyncPayload`] and hand it
//!    to the transport together with a [`FlushAck`]
//! 4. Emit the notification
//!
//! The peer applies the payload with [`SyncedSet::receive`]: deletions,
//! then pick-list updates, then additions flagged as remote so they are
//! not echoed back.
//!
//! ## Key Invariants
//!
//! - An identity maps to exactly one instance
//! - Remote additions never enter the outbound accumulators
//! - Writes the projection ignores produce no traffic and no notification
//! - Each queued change is transmitted in exactly one payload
//!
//! Conflicts are not reconciled: concurrent writes to the same field are
//! last-write-wins.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod events;
mod payload;
mod pending;
mod projection;
mod record;
mod set;
mod store;
mod transport;

#[cfg(test)]
mod test_record;

pub use config::{Equal, Reducer, SetSchema, SyncSetOptions, DEFAULT_ID_KEY};
pub use error::{RecordError, SyncResult, SyncSetError};
pub use events::{EventBus, EventKind, ListenerId, SetEvent};
pub use payload::SyncPayload;
pub use pending::{FlushId, PendingCounts};
pub use record::{Identify, Record, Tracked};
pub use set::{SetStats, SyncedSet, WriteOutcome};
pub use syncset_codec::Value;
pub use transport::{FlushAck, FnTransport, LoopbackTransport, NullTransport, QueuedTransport, Transport};
