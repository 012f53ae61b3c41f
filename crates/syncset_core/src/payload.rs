//! Change batches exchanged between peers.

use crate::error::SyncResult;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use syncset_codec::{from_cbor, to_cbor, Value};

/// One batch of changes handed to a transport.
///
/// `added` carries complete objects, `updated` carries complete objects of
/// which the receiver applies only its pick list, and `deleted` carries
/// identities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPayload<T> {
    /// Objects added locally since the last flush.
    pub added: Vec<T>,
    /// Objects whose projection changed since the last flush.
    pub updated: Vec<T>,
    /// Identities deleted locally since the last flush.
    pub deleted: Vec<Value>,
}

impl<T> SyncPayload<T> {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self {
            added: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
        }
    }

    /// Returns true if the payload carries no changes.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    /// Returns the total number of entries.
    pub fn len(&self) -> usize {
        self.added.len() + self.updated.len() + self.deleted.len()
    }
}

impl<T: Serialize> SyncPayload<T> {
    /// Encodes the payload to CBOR bytes.
    pub fn encode(&self) -> SyncResult<Vec<u8>> {
        Ok(to_cbor(self)?)
    }
}

impl<T: DeserializeOwned> SyncPayload<T> {
    /// Decodes a payload from CBOR bytes.
    pub fn decode(bytes: &[u8]) -> SyncResult<Self> {
        Ok(from_cbor(bytes)?)
    }
}

impl<T> Default for SyncPayload<T> {
    fn default() -> Self {
        Self::new()
    }
}
