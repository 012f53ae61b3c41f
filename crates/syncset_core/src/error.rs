//! Error types for synchronized sets.

use syncset_codec::{CodecError, Value};
use thiserror::Error;

/// Result type for synchronized set operations.
pub type SyncResult<T> = Result<T, SyncSetError>;

/// Errors raised by a [`Record`](crate::Record) when a field is accessed by name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The record has no field with this name.
    #[error("unknown field: {field}")]
    UnknownField {
        /// Field name.
        field: String,
    },

    /// The value cannot be stored in the field.
    #[error("field {field} expects {expected}, got {found}")]
    TypeMismatch {
        /// Field name.
        field: String,
        /// Expected value type.
        expected: &'static str,
        /// Type of the rejected value.
        found: &'static str,
    },
}

impl RecordError {
    /// Creates an unknown field error.
    pub fn unknown_field(field: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
        }
    }

    /// Creates a type mismatch error for `value`.
    pub fn type_mismatch(field: impl Into<String>, expected: &'static str, value: &Value) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            expected,
            found: value.type_name(),
        }
    }
}

/// Errors that can occur while operating a synchronized set.
#[derive(Error, Debug)]
pub enum SyncSetError {
    /// An object with the same identity is already in the set.
    #[error("object id to be added already in set: {id}")]
    DuplicateIdentity {
        /// The conflicting identity.
        id: Value,
    },

    /// No object with this identity is in the set.
    #[error("object id to be deleted not found in set: {id}")]
    IdentityNotFound {
        /// The missing identity.
        id: Value,
    },

    /// The object carries no value in its identity field.
    #[error("object has no identity in field {key}")]
    MissingIdentity {
        /// Configured identity field.
        key: String,
    },

    /// Tracked writes may not change the identity field.
    #[error("identity field {key} cannot be written through the set")]
    IdentityImmutable {
        /// Configured identity field.
        key: String,
    },

    /// The set options do not match the record type.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A field could not be read or written.
    #[error("record error: {0}")]
    Record(#[from] RecordError),

    /// A payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A flush was requested with no transport attached.
    #[error("no transport attached")]
    NotConnected,
}

impl SyncSetError {
    /// Returns true for the two identity conditions callers are expected to handle.
    pub fn is_identity_error(&self) -> bool {
        matches!(
            self,
            SyncSetError::DuplicateIdentity { .. } | SyncSetError::IdentityNotFound { .. }
        )
    }
}
