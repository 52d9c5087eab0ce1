//! Wire marshalling boundary.
//!
//! Tokens and scheme data objects cross process boundaries as JSON. Any
//! failure to parse or reconstruct a structure surfaces as
//! [`MslError::Encoding`], naming the kind of object that was malformed.

use msl_core::{MslError, MslResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{MasterToken, ServiceToken, UserIdToken};

/// A structure that crosses the wire.
pub trait WireObject: Serialize + DeserializeOwned {
    /// Human-readable name used in encoding errors.
    const KIND: &'static str;
}

impl WireObject for MasterToken {
    const KIND: &'static str = "master token";
}

impl WireObject for UserIdToken {
    const KIND: &'static str = "user ID token";
}

impl WireObject for ServiceToken {
    const KIND: &'static str = "service token";
}

/// Encode to wire bytes.
///
/// # Errors
///
/// Returns [`MslError::Encoding`] if the value cannot be serialized.
pub fn encode<T: WireObject>(value: &T) -> MslResult<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| MslError::encoding(format!("cannot encode {}: {e}", T::KIND)))
}

/// Decode from wire bytes.
///
/// # Errors
///
/// Returns [`MslError::Encoding`] if the bytes are not a well-formed `T`.
pub fn decode<T: WireObject>(bytes: &[u8]) -> MslResult<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| MslError::encoding(format!("malformed {}: {e}", T::KIND)))
}

/// Encode to a JSON value, for embedding in scheme data.
///
/// # Errors
///
/// Returns [`MslError::Encoding`] if the value cannot be serialized.
pub fn to_value<T: WireObject>(value: &T) -> MslResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| MslError::encoding(format!("cannot encode {}: {e}", T::KIND)))
}

/// Decode from a JSON value embedded in scheme data.
///
/// # Errors
///
/// Returns [`MslError::Encoding`] if the value is not a well-formed `T`.
pub fn from_value<T: WireObject>(value: Value) -> MslResult<T> {
    serde_json::from_value(value)
        .map_err(|e| MslError::encoding(format!("malformed {}: {e}", T::KIND)))
}
