//! Common value types.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MslError, MslResult};

/// Largest integer the protocol carries on the wire (2^53).
///
/// Serial numbers, sequence numbers and non-replayable IDs all live in
/// `0..=MAX_LONG_VALUE`.
pub const MAX_LONG_VALUE: u64 = 9_007_199_254_740_992;

/// Check that `value` is within `0..=MAX_LONG_VALUE`.
///
/// # Errors
///
/// Returns [`MslError::Encoding`] naming `field` if the value is out of range.
pub fn check_range(field: &str, value: u64) -> MslResult<u64> {
    if value > MAX_LONG_VALUE {
        return Err(MslError::encoding(format!(
            "{field} {value} is out of range (max {MAX_LONG_VALUE})"
        )));
    }
    Ok(value)
}

/// UTC timestamp used for token issuance, renewal windows and expiration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Get the current timestamp.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a timestamp from a `DateTime<Utc>`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Create a timestamp from whole seconds since the Unix epoch.
    #[must_use]
    pub fn from_unix_seconds(secs: i64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(Self)
    }

    /// Seconds since the Unix epoch.
    #[must_use]
    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    /// This timestamp shifted by `delta`, saturating at the representable bounds.
    #[must_use]
    pub fn offset(&self, delta: Duration) -> Self {
        self.0
            .checked_add_signed(delta)
            .map_or(*self, Self)
    }

    /// Check if this timestamp is in the past.
    #[must_use]
    pub fn is_past(&self) -> bool {
        self.0 < Utc::now()
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range() {
        assert_eq!(check_range("serial", 0).unwrap(), 0);
        assert_eq!(check_range("serial", MAX_LONG_VALUE).unwrap(), MAX_LONG_VALUE);
        let err = check_range("serial", MAX_LONG_VALUE.saturating_add(1)).unwrap_err();
        assert!(err.to_string().contains("serial"));
    }

    #[test]
    fn test_offset_and_ordering() {
        let now = Timestamp::now();
        let later = now.offset(Duration::hours(1));
        let earlier = now.offset(Duration::hours(-1));
        assert!(earlier < now && now < later);
        assert!(earlier.is_past());
    }

    #[test]
    fn test_unix_seconds_roundtrip() {
        let ts = Timestamp::from_unix_seconds(1_700_000_000).unwrap();
        assert_eq!(ts.unix_seconds(), 1_700_000_000);
    }

    #[test]
    fn test_serde_roundtrip() {
        let ts = Timestamp::now();
        let json = serde_json::to_string(&ts).unwrap();
        let parsed: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, parsed);
    }
}
