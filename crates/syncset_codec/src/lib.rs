//! # SyncSet Codec
//!
//! Dynamic field values and the CBOR wire codec for SyncSet.
//!
//! This crate provides:
//! - [`Value`], the dynamic type carried by record fields and identities
//! - [`to_cbor`] / [`from_cbor`] for any serde type, used by transports
//!   that move change batches across a process or network boundary
//!
//! ## Usage
//!
//! ```
//! use syncset_codec::{from_cbor, to_cbor, Value};
//!
//! let value = Value::Integer(42);
//! let bytes = to_cbor(&value).unwrap();
//!
//! let decoded: Value = from_cbor(&bytes).unwrap();
//! assert_eq!(value, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod value;

pub use error::{CodecError, CodecResult};
pub use value::Value;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a serde value to CBOR bytes.
///
/// # Errors
///
/// Returns [`CodecError::EncodingFailed`] if the value cannot be serialized.
pub fn to_cbor<T: Serialize + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(bytes)
}

/// Decodes a serde value from CBOR bytes.
///
/// The input must hold exactly one CBOR item.
///
/// # Errors
///
/// Returns [`CodecError::DecodingFailed`] for malformed input and
/// [`CodecError::TrailingBytes`] if anything follows the item.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    let mut reader = bytes;
    let value = ciborium::from_reader(&mut reader)
        .map_err(|e| CodecError::decoding_failed(e.to_string()))?;
    if !reader.is_empty() {
        return Err(CodecError::TrailingBytes {
            remaining: reader.len(),
        });
    }
    Ok(value)
}
