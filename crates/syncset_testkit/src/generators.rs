//! Property-based test generators using proptest.
//!
//! Operations draw identities from a small pool so that sequences hit
//! duplicate adds, deletes of absent objects, and writes to deleted
//! objects often.

use crate::fixtures::Foo;
use proptest::prelude::*;

/// Number of distinct identities generated operations refer to.
pub const ID_POOL: u8 = 6;

/// One local mutation against a [`Foo`] set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOperation {
    /// Add a `Foo` with these fields.
    Add {
        /// Identity suffix.
        id: u8,
        /// Value of `a`.
        a: i64,
        /// Value of `b`.
        b: bool,
    },
    /// Delete the object with this identity.
    Delete {
        /// Identity suffix.
        id: u8,
    },
    /// Write `a` on the object with this identity.
    SetA {
        /// Identity suffix.
        id: u8,
        /// New value.
        a: i64,
    },
    /// Write `b` on the object with this identity.
    SetB {
        /// Identity suffix.
        id: u8,
        /// New value.
        b: bool,
    },
}

impl SetOperation {
    /// Returns the identity the operation refers to.
    pub fn id(&self) -> String {
        let n = match self {
            SetOperation::Add { id, .. }
            | SetOperation::Delete { id }
            | SetOperation::SetA { id, .. }
            | SetOperation::SetB { id, .. } => *id,
        };
        pool_id(n)
    }
}

/// Maps a pool index to a `Foo` identity.
pub fn pool_id(n: u8) -> String {
    format!("p{n}")
}

fn pool_index() -> impl Strategy<Value = u8> {
    0..ID_POOL
}

/// Strategy for `Foo` objects with identities from the pool.
pub fn foo_strategy() -> impl Strategy<Value = Foo> {
    (pool_index(), -1000i64..1000, any::<bool>()).prop_map(|(id, a, b)| Foo {
        id: pool_id(id),
        a,
        b,
    })
}

/// Strategy for a single operation.
pub fn set_operation_strategy() -> impl Strategy<Value = SetOperation> {
    prop_oneof![
        3 => (pool_index(), -1000i64..1000, any::<bool>())
            .prop_map(|(id, a, b)| SetOperation::Add { id, a, b }),
        2 => pool_index().prop_map(|id| SetOperation::Delete { id }),
        3 => (pool_index(), -3i64..3).prop_map(|(id, a)| SetOperation::SetA { id, a }),
        3 => (pool_index(), any::<bool>()).prop_map(|(id, b)| SetOperation::SetB { id, b }),
    ]
}

/// Strategy for a sequence of operations.
pub fn operation_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<SetOperation>> {
    prop::collection::vec(set_operation_strategy(), 0..=max_len)
}

/// Test configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
