//! Format versioning for durable snapshots.
//!
//! Snapshots are wrapped in [`Versioned`] so a reader can refuse data written
//! by an incompatible format before attempting to interpret it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MslError, MslResult};

/// Semantic format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version {
    /// Major version - breaking format changes.
    pub major: u32,
    /// Minor version - additive, backwards compatible fields.
    pub minor: u32,
    /// Patch version - no format change.
    pub patch: u32,
}

impl Version {
    /// Creates a new version.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Whether a reader at `self` can interpret data written at `written`.
    ///
    /// The major versions must match and the data must not come from a newer
    /// minor version than the reader knows about.
    #[must_use]
    pub fn can_read(&self, written: &Self) -> bool {
        self.major == written.major && written.minor <= self.minor
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Data tagged with the format version it was written at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned<T> {
    /// The format version of `data`.
    pub version: Version,
    /// The versioned data.
    pub data: T,
}

impl<T> Versioned<T> {
    /// Tag `data` with `version`.
    pub fn new(version: Version, data: T) -> Self {
        Self { version, data }
    }

    /// Unwrap the data if a reader at `reader` can interpret it.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::SnapshotVersion`] if the versions are incompatible.
    pub fn into_compatible(self, reader: Version) -> MslResult<T> {
        if reader.can_read(&self.version) {
            Ok(self.data)
        } else {
            Err(MslError::SnapshotVersion {
                found: self.version.to_string(),
                expected: reader.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_can_read() {
        let reader = Version::new(1, 1, 0);
        assert!(reader.can_read(&Version::new(1, 0, 0)));
        assert!(reader.can_read(&Version::new(1, 1, 7)));
        assert!(!reader.can_read(&Version::new(1, 2, 0)));
        assert!(!reader.can_read(&Version::new(2, 0, 0)));
    }

    #[test]
    fn versioned_into_compatible() {
        let data = Versioned::new(Version::new(1, 0, 0), 42);
        assert_eq!(data.into_compatible(Version::new(1, 0, 0)).unwrap(), 42);

        let future = Versioned::new(Version::new(2, 0, 0), 42);
        assert!(matches!(
            future.into_compatible(Version::new(1, 0, 0)),
            Err(MslError::SnapshotVersion { .. })
        ));
    }

    #[test]
    fn versioned_serde_shape() {
        let v = Versioned::new(Version::new(1, 0, 0), "x");
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["version"]["major"], 1);
        assert_eq!(json["data"], "x");
    }
}
