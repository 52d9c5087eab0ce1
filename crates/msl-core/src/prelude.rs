//! Prelude module - commonly used types for convenient import.
//!
//! Use `use msl_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{ErrorKind, MslError, MslResult, SchemeFamily};

// Common types
pub use crate::{MAX_LONG_VALUE, Timestamp};

// Versioning
pub use crate::{Version, Versioned};
