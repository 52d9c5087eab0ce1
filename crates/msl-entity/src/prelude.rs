//! Prelude module - commonly used types for convenient import.
//!
//! Use `use msl_entity::prelude::*;` to import all essential types.

// Entity context
pub use crate::{EntityTrust, EntityTrustBuilder};
