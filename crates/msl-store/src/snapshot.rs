//! Durable store snapshots.
//!
//! A snapshot holds every token and non-replayable counter, never crypto
//! contexts. It is written as version-tagged JSON; the version is checked
//! before the body is interpreted. Where the bytes go is up to a
//! [`SnapshotBackend`].

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use msl_core::{MslError, MslResult, Version, Versioned};
use msl_tokens::{MasterToken, ServiceToken, UserIdToken};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::simple::{SimpleTrustStore, StoreOptions};
use crate::store::TrustStore;

/// Snapshot format written by this build.
pub const SNAPSHOT_FORMAT: Version = Version::new(1, 0, 0);

/// The durable contents of a trust store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Master tokens, one per serial number.
    #[serde(default)]
    pub master_tokens: Vec<MasterToken>,
    /// User-ID tokens keyed by user ID.
    #[serde(default)]
    pub user_id_tokens: BTreeMap<String, UserIdToken>,
    /// Service tokens.
    #[serde(default)]
    pub service_tokens: Vec<ServiceToken>,
    /// Next non-replayable ID per master token serial number.
    #[serde(default)]
    pub non_replayable_ids: BTreeMap<u64, u64>,
}

impl StoreSnapshot {
    /// Whether the snapshot holds no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.master_tokens.is_empty()
            && self.user_id_tokens.is_empty()
            && self.service_tokens.is_empty()
    }

    /// Encode as version-tagged JSON.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::Persistence`] if serialization fails.
    pub fn to_bytes(&self) -> MslResult<Vec<u8>> {
        serde_json::to_vec_pretty(&Versioned::new(SNAPSHOT_FORMAT, self))
            .map_err(|e| MslError::Persistence(format!("cannot encode snapshot: {e}")))
    }

    /// Decode version-tagged JSON.
    ///
    /// # Errors
    ///
    /// Returns [`MslError::SnapshotVersion`] if the snapshot was written by an
    /// incompatible format, or [`MslError::Persistence`] if it is malformed.
    pub fn from_bytes(bytes: &[u8]) -> MslResult<Self> {
        let versioned: Versioned<serde_json::Value> = serde_json::from_slice(bytes)
            .map_err(|e| MslError::Persistence(format!("malformed snapshot: {e}")))?;
        let body = versioned.into_compatible(SNAPSHOT_FORMAT)?;
        serde_json::from_value(body)
            .map_err(|e| MslError::Persistence(format!("malformed snapshot: {e}")))
    }
}

/// Opaque byte persistence for snapshots.
pub trait SnapshotBackend: Send + Sync {
    /// Replace the stored snapshot with `bytes`.
    fn save(&self, bytes: &[u8]) -> MslResult<()>;

    /// The stored snapshot, or `None` if nothing has been saved.
    fn load(&self) -> MslResult<Option<Vec<u8>>>;
}

/// Snapshot stored in a single file, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct FileSnapshotBackend {
    path: PathBuf,
}

impl FileSnapshotBackend {
    /// A backend writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The snapshot file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, action: &str, e: impl std::fmt::Display) -> MslError {
        MslError::Persistence(format!("cannot {action} {}: {e}", self.path.display()))
    }
}

impl SnapshotBackend for FileSnapshotBackend {
    fn save(&self, bytes: &[u8]) -> MslResult<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| self.io_error("create directory for", e))?;

        // Write beside the target and rename over it; the temp file is
        // deleted on drop if anything fails before the rename.
        let mut tmp =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| self.io_error("write", e))?;
        tmp.write_all(bytes)
            .map_err(|e| self.io_error("write", e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| self.io_error("sync", e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.io_error("replace", e.error))?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "Snapshot written");
        Ok(())
    }

    fn load(&self) -> MslResult<Option<Vec<u8>>> {
        match fs::metadata(&self.path) {
            Ok(meta) if meta.is_file() => fs::read(&self.path)
                .map(Some)
                .map_err(|e| self.io_error("read", e)),
            Ok(_) => Err(MslError::Persistence(format!(
                "{} exists but is not a regular file",
                self.path.display()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error("stat", e)),
        }
    }
}

/// Snapshot held in memory, for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemorySnapshotBackend {
    bytes: Mutex<Option<Vec<u8>>>,
}

impl MemorySnapshotBackend {
    /// An empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotBackend for MemorySnapshotBackend {
    fn save(&self, bytes: &[u8]) -> MslResult<()> {
        let mut slot = self
            .bytes
            .lock()
            .map_err(|e| MslError::Internal(format!("snapshot lock poisoned: {e}")))?;
        *slot = Some(bytes.to_vec());
        Ok(())
    }

    fn load(&self) -> MslResult<Option<Vec<u8>>> {
        let slot = self
            .bytes
            .lock()
            .map_err(|e| MslError::Internal(format!("snapshot lock poisoned: {e}")))?;
        Ok(slot.clone())
    }
}

/// Write a snapshot of `store` to `backend`.
///
/// # Errors
///
/// Returns [`MslError::Persistence`] if encoding or writing fails.
pub fn save_store(store: &dyn TrustStore, backend: &dyn SnapshotBackend) -> MslResult<()> {
    backend.save(&store.snapshot()?.to_bytes()?)
}

/// Rebuild a store from `backend`, or create an empty one if nothing was saved.
///
/// # Errors
///
/// Returns [`MslError::Persistence`] or [`MslError::SnapshotVersion`] if the
/// saved snapshot cannot be read or restored.
pub fn load_store(
    backend: &dyn SnapshotBackend,
    options: StoreOptions,
) -> MslResult<SimpleTrustStore> {
    match backend.load()? {
        Some(bytes) => SimpleTrustStore::from_snapshot(StoreSnapshot::from_bytes(&bytes)?, options),
        None => SimpleTrustStore::with_options(options),
    }
}
