//! MSL Store - the trust store.
//!
//! The store is the single source of truth for one local entity's trust
//! material:
//! - master tokens, one per serial number
//! - crypto contexts, one per master token serial number ([`CryptoContextCache`])
//! - non-replayable ID counters ([`NonReplayableCounter`])
//! - user-ID tokens keyed by user ID
//! - service tokens keyed by name and bindings ([`ServiceTokenKey`])
//!
//! Callers depend on the [`TrustStore`] trait. [`SimpleTrustStore`] is the
//! in-memory implementation and [`LoggingTrustStore`] wraps any store with
//! `tracing` events.
//!
//! Persistence is explicit. [`TrustStore::snapshot`] produces a
//! [`StoreSnapshot`] (no crypto contexts), [`SimpleTrustStore::from_snapshot`]
//! rebuilds a store from one, and a [`SnapshotBackend`] moves the bytes.
//!
//! # Example
//!
//! ```
//! use msl_crypto::KeyPair;
//! use msl_store::{SimpleTrustStore, TrustStore};
//! use msl_tokens::MasterToken;
//!
//! let store = SimpleTrustStore::new();
//! let mt = MasterToken::builder("server", "client-1")
//!     .serial_number(1)
//!     .sign(&KeyPair::generate())
//!     .unwrap();
//! store.add_master_token(mt.clone()).unwrap();
//!
//! assert_eq!(store.non_replayable_id(&mt).unwrap(), 0);
//! assert_eq!(store.non_replayable_id(&mt).unwrap(), 1);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod cache;
mod counter;
mod logging;
mod simple;
mod snapshot;
mod store;

pub use cache::CryptoContextCache;
pub use counter::NonReplayableCounter;
pub use logging::LoggingTrustStore;
pub use simple::{ServiceTokenKey, SimpleTrustStore, StoreOptions};
pub use snapshot::{
    FileSnapshotBackend, MemorySnapshotBackend, SNAPSHOT_FORMAT, SnapshotBackend, StoreSnapshot,
    load_store, save_store,
};
pub use store::TrustStore;
