//! MSL Entity - the per-entity trust context.
//!
//! [`EntityTrust`] ties one entity's [`TrustConfig`](msl_config::TrustConfig),
//! trust store and scheme resolver together:
//! - the configuration is validated before anything else is built
//! - configured schemes must all have a registered factory
//! - the store is loaded from its snapshot file, or started empty
//! - [`EntityTrust::save_store`] writes the snapshot back
//!
//! # Example
//!
//! ```
//! use msl_config::TrustConfig;
//! use msl_entity::EntityTrust;
//!
//! let config = TrustConfig {
//!     entity_id: "client-1".to_owned(),
//!     ..TrustConfig::default()
//! };
//! let entity = EntityTrust::open(config).unwrap();
//! assert!(entity.store().get_master_token().unwrap().is_none());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod entity;

pub use entity::{EntityTrust, EntityTrustBuilder, preferences_from};
