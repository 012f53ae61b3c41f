//! # SyncSet Testkit
//!
//! Test utilities for SyncSet.
//!
//! This crate provides:
//! - Record fixtures with a ready-made `Record` implementation
//! - Mirrored pairs of sets wired to each other through loopback transports
//! - An event recorder for asserting on notifications
//! - Property-based test generators using proptest
//! - Tracing setup for tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use syncset_testkit::prelude::*;
//!
//! #[test]
//! fn mirrors_adds() {
//!     let pair = mirrored_pair(foo_options(["b"], "a"), foo_options(["a"], "b")).unwrap();
//!     let foo = pair.left.insert(Foo::new()).unwrap();
//!     assert!(pair.right.has(&foo));
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::init_tracing;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;

/// Installs a `tracing` subscriber for tests.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`. Output goes
/// through the test writer so it is captured per test. Safe to call from
/// every test; only the first call installs anything.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
