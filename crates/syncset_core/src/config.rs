//! Configuration for synchronized sets.

use crate::error::{SyncResult, SyncSetError};
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default name of the identity field.
pub const DEFAULT_ID_KEY: &str = "id";

/// Computes the derived projection of an object.
pub type Reducer<T, R> = Arc<dyn Fn(&T) -> R + Send + Sync>;

/// Compares two projections; `true` means nothing observable changed.
pub type Equal<R> = Arc<dyn Fn(&R, &R) -> bool + Send + Sync>;

/// The static part of a set's configuration.
///
/// Unlike [`SyncSetOptions`] this holds no closures, so it can be loaded
/// from a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetSchema {
    /// Name of the identity field.
    pub id_key: String,
    /// Fields applied from incoming updates, in order.
    pub pick: Vec<String>,
}

impl Default for SetSchema {
    fn default() -> Self {
        Self {
            id_key: DEFAULT_ID_KEY.to_string(),
            pick: Vec::new(),
        }
    }
}

/// Configuration for a [`SyncedSet`](crate::SyncedSet).
pub struct SyncSetOptions<T, R> {
    /// Name of the identity field.
    pub id_key: String,
    /// Fields applied from incoming updates, in order.
    pub pick: Vec<String>,
    reducer: Reducer<T, R>,
    equal: Equal<R>,
}

impl<T, R> SyncSetOptions<T, R> {
    /// Creates options with the default identity key and an empty pick list.
    pub fn new(
        reducer: impl Fn(&T) -> R + Send + Sync + 'static,
        equal: impl Fn(&R, &R) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            id_key: DEFAULT_ID_KEY.to_string(),
            pick: Vec::new(),
            reducer: Arc::new(reducer),
            equal: Arc::new(equal),
        }
    }

    /// Creates options from a loaded schema.
    pub fn from_schema(
        schema: SetSchema,
        reducer: impl Fn(&T) -> R + Send + Sync + 'static,
        equal: impl Fn(&R, &R) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            id_key: schema.id_key,
            pick: schema.pick,
            reducer: Arc::new(reducer),
            equal: Arc::new(equal),
        }
    }

    /// Sets the identity field.
    pub fn with_id_key(mut self, key: impl Into<String>) -> Self {
        self.id_key = key.into();
        self
    }

    /// Sets the pick list.
    pub fn with_pick<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pick = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the static part of the configuration.
    pub fn schema(&self) -> SetSchema {
        SetSchema {
            id_key: self.id_key.clone(),
            pick: self.pick.clone(),
        }
    }

    /// Computes the projection of `object`.
    pub fn reduce(&self, object: &T) -> R {
        (self.reducer)(object)
    }

    /// Returns true if two projections are equal.
    pub fn projections_equal(&self, prev: &R, next: &R) -> bool {
        (self.equal)(prev, next)
    }
}

impl<T: 'static, R: PartialEq + 'static> SyncSetOptions<T, R> {
    /// Creates options whose projections are compared with `PartialEq`.
    pub fn from_reducer(reducer: impl Fn(&T) -> R + Send + Sync + 'static) -> Self {
        Self::new(reducer, |prev: &R, next: &R| prev == next)
    }
}

impl<T: Record, R> SyncSetOptions<T, R> {
    /// Checks the options against the fields of `T`.
    ///
    /// The identity key and every picked field must exist, and the pick list
    /// must not contain the identity key.
    pub fn validate(&self) -> SyncResult<()> {
        let fields = T::field_names();

        if !fields.contains(&self.id_key.as_str()) {
            return Err(SyncSetError::InvalidConfig(format!(
                "identity field {} is not a field of the record",
                self.id_key
            )));
        }

        for field in &self.pick {
            if field == &self.id_key {
                return Err(SyncSetError::InvalidConfig(format!(
                    "pick list contains the identity field {field}"
                )));
            }
            if !fields.contains(&field.as_str()) {
                return Err(SyncSetError::InvalidConfig(format!(
                    "picked field {field} is not a field of the record"
                )));
            }
        }

        Ok(())
    }
}

impl<T, R> Clone for SyncSetOptions<T, R> {
    fn clone(&self) -> Self {
        Self {
            id_key: self.id_key.clone(),
            pick: self.pick.clone(),
            reducer: Arc::clone(&self.reducer),
            equal: Arc::clone(&self.equal),
        }
    }
}

impl<T, R> fmt::Debug for SyncSetOptions<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncSetOptions")
            .field("id_key", &self.id_key)
            .field("pick", &self.pick)
            .finish_non_exhaustive()
    }
}
