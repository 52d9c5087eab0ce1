//! MSL Core - Foundation types shared by the trust-management crates.
//!
//! This crate provides:
//! - The error taxonomy ([`MslError`], [`ErrorKind`]) surfaced by the token
//!   model, the trust store and the scheme resolver
//! - [`Timestamp`] and the protocol's integer bound [`MAX_LONG_VALUE`]
//! - Format versioning for durable snapshots ([`Version`], [`Versioned`])
//!
//! It has no dependencies on other internal crates.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod error;
pub mod types;
pub mod version;

pub use error::{ErrorKind, MslError, MslResult, SchemeFamily};
pub use types::{MAX_LONG_VALUE, Timestamp, check_range};
pub use version::{Version, Versioned};
