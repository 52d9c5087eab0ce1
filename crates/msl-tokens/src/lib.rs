//! MSL Tokens - the token model of the trust core.
//!
//! Three kinds of signed, immutable tokens:
//! - [`MasterToken`] - an entity's authenticated session state, identified by
//!   serial number and versioned by sequence number
//! - [`UserIdToken`] - a user identity bound to one master token line
//! - [`ServiceToken`] - an opaque application payload, optionally bound to a
//!   master token line and a user-ID token
//!
//! Tokens are built with a builder that validates internal consistency and
//! signs the result. Decoding (see [`wire`]) runs the same checks, so a token
//! value is always well formed. Signatures are checked with `verify`.
//!
//! # Example
//!
//! ```
//! use msl_crypto::KeyPair;
//! use msl_tokens::{MasterToken, MslUser, UserIdToken};
//!
//! let issuer = KeyPair::generate();
//! let mt = MasterToken::builder("server", "client-1")
//!     .serial_number(1)
//!     .sign(&issuer)
//!     .unwrap();
//! let uit = UserIdToken::builder(&mt, MslUser::new("alice"))
//!     .sign(&issuer)
//!     .unwrap();
//!
//! assert!(uit.is_bound_to(&mt));
//! assert!(mt.verify(&issuer.public_key()).is_ok());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod master_token;
mod service_token;
mod signing;
mod user;
mod user_id_token;
pub mod wire;

pub use master_token::{MasterToken, MasterTokenBuilder, MasterTokenId};
pub use service_token::{ServiceToken, ServiceTokenBuilder};
pub use user::MslUser;
pub use user_id_token::{UserIdToken, UserIdTokenBuilder};
pub use wire::WireObject;
