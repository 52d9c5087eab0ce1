//! Canonical signing data for tokens.
//!
//! Every token signs a byte string built here rather than its wire encoding,
//! so re-encoding a token never invalidates its signature.
//!
//! Format (v1):
//! - 1 byte: version (0x01)
//! - length-prefixed token kind tag
//! - the token's fields in declaration order, each either fixed-width
//!   little-endian or 4-byte-length-prefixed
//! - optional fields carry a one-byte presence flag
//! - timestamps are seconds (i64) followed by subsecond nanos (u32)

use msl_core::Timestamp;

/// Version of the signing data format.
/// Increment this when the signing data structure changes.
const SIGNING_DATA_VERSION: u8 = 0x01;

/// Builder for a token's signing data.
pub(crate) struct SigningData {
    buf: Vec<u8>,
}

impl SigningData {
    pub(crate) fn new(kind: &str) -> Self {
        let mut data = Self {
            buf: Vec::with_capacity(256),
        };
        data.buf.push(SIGNING_DATA_VERSION);
        data.bytes(kind.as_bytes())
    }

    /// Length-prefixed bytes. Token fields are far below `u32::MAX` bytes.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn bytes(mut self, bytes: &[u8]) -> Self {
        self.buf
            .extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(bytes);
        self
    }

    pub(crate) fn str(self, s: &str) -> Self {
        self.bytes(s.as_bytes())
    }

    pub(crate) fn u64(mut self, n: u64) -> Self {
        self.buf.extend_from_slice(&n.to_le_bytes());
        self
    }

    pub(crate) fn opt_u64(mut self, n: Option<u64>) -> Self {
        match n {
            Some(n) => {
                self.buf.push(0x01);
                self.u64(n)
            },
            None => {
                self.buf.push(0x00);
                self
            },
        }
    }

    pub(crate) fn timestamp(mut self, ts: Timestamp) -> Self {
        self.buf.extend_from_slice(&ts.unix_seconds().to_le_bytes());
        self.buf
            .extend_from_slice(&ts.0.timestamp_subsec_nanos().to_le_bytes());
        self
    }

    /// Optional opaque JSON payload, signed over its compact serialization.
    pub(crate) fn opt_json(mut self, value: Option<&serde_json::Value>) -> Self {
        match value {
            Some(v) => {
                self.buf.push(0x01);
                self.str(&v.to_string())
            },
            None => {
                self.buf.push(0x00);
                self
            },
        }
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.buf
    }
}
