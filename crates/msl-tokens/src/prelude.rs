//! Prelude module - commonly used types for convenient import.
//!
//! Use `use msl_tokens::prelude::*;` to import all essential types.

// Tokens
pub use crate::{MasterToken, MasterTokenId, MslUser, ServiceToken, UserIdToken};

// Builders
pub use crate::{MasterTokenBuilder, ServiceTokenBuilder, UserIdTokenBuilder};

// Wire marshalling
pub use crate::WireObject;
