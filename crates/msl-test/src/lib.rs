//! MSL Test - shared test utilities for the trust-management crates.
//!
//! This crate provides token fixtures, mock scheme factories and a recording
//! crypto context that can be used across crates as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! msl-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use msl_store::TrustStore;
//! use msl_test::{master_token, store_with_master_token, user_id_token};
//!
//! #[test]
//! fn test_user_binding() {
//!     let (store, mt) = store_with_master_token(1);
//!     store.add_user_id_token("alice", user_id_token(&mt, 1, "alice")).unwrap();
//!     assert!(store.get_user_id_token("alice").unwrap().is_some());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
