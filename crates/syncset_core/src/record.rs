//! Record trait and shared object handles.

use crate::error::RecordError;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;
use std::sync::Arc;
use syncset_codec::Value;

/// Trait for application types that can live in a synchronized set.
///
/// Fields are addressed by name so that the set can read the identity,
/// copy pick-list fields from remote updates, and route tracked writes.
///
/// # Example
///
/// ```rust
/// use syncset_codec::Value;
/// use syncset_core::{Record, RecordError};
///
/// #[derive(Clone)]
/// struct Note {
///     id: i64,
///     body: String,
/// }
///
/// impl Record for Note {
///     fn field_names() -> &'static [&'static str] {
///         &["id", "body"]
///     }
///
///     fn field(&self, name: &str) -> Option<Value> {
///         match name {
///             "id" => Some(Value::Integer(self.id)),
///             "body" => Some(Value::Text(self.body.clone())),
///             _ => None,
///         }
///     }
///
///     fn set_field(&mut self, name: &str, value: Value) -> Result<(), RecordError> {
///         match (name, value) {
///             ("id", Value::Integer(v)) => self.id = v,
///             ("body", Value::Text(v)) => self.body = v,
///             ("id", other) => return Err(RecordError::type_mismatch(name, "integer", &other)),
///             ("body", other) => return Err(RecordError::type_mismatch(name, "text", &other)),
///             _ => return Err(RecordError::unknown_field(name)),
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Record: Clone + Send + Sync + 'static {
    /// Returns the names of every field of the record.
    fn field_names() -> &'static [&'static str];

    /// Reads a field by name.
    fn field(&self, name: &str) -> Option<Value>;

    /// Writes a field by name.
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), RecordError>;
}

/// A shared handle to an object owned by a synchronized set.
///
/// The set and the application hold the same instance. Reads go through
/// [`Tracked::read`]; writes that should be tracked go through
/// [`SyncedSet::set_field`](crate::SyncedSet::set_field).
pub struct Tracked<T> {
    inner: Arc<RwLock<T>>,
}

impl<T> Tracked<T> {
    /// Wraps an object in a new handle.
    pub fn new(object: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(object)),
        }
    }

    /// Locks the object for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.read()
    }

    /// Runs `f` with a shared reference to the object.
    pub fn with<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        f(&self.inner.read())
    }

    /// Returns true if both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.inner.write()
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

impl<T: Clone> Tracked<T> {
    /// Clones the current state of the object.
    pub fn snapshot(&self) -> T {
        self.inner.read().clone()
    }
}

impl<T: Record> Tracked<T> {
    /// Reads a field of the object by name.
    pub fn field(&self, name: &str) -> Option<Value> {
        self.inner.read().field(name)
    }
}

impl<T> Clone for Tracked<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> From<T> for Tracked<T> {
    fn from(object: T) -> Self {
        Self::new(object)
    }
}

impl<T: fmt::Debug> fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tracked").field(&*self.inner.read()).finish()
    }
}

/// Anything whose identity can be read by field name.
///
/// Implemented for records and for handles to records, so membership
/// tests and deletes accept either.
pub trait Identify {
    /// Returns the value of the identity field, if present.
    fn identity(&self, key: &str) -> Option<Value>;
}

impl<T: Record> Identify for T {
    fn identity(&self, key: &str) -> Option<Value> {
        self.field(key).filter(|id| !id.is_null())
    }
}

impl<T: Record> Identify for Tracked<T> {
    fn identity(&self, key: &str) -> Option<Value> {
        self.read().identity(key)
    }
}
