//! Prelude module - commonly used types for convenient import.
//!
//! Use `use msl_store::prelude::*;` to import all essential types.

// Store interface and implementations
pub use crate::{LoggingTrustStore, SimpleTrustStore, StoreOptions, TrustStore};

// Persistence
pub use crate::{FileSnapshotBackend, SnapshotBackend, StoreSnapshot, load_store, save_store};
