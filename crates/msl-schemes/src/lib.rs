//! MSL Schemes - scheme registries and resolution.
//!
//! Authentication and key exchange mechanisms are pluggable. Each one is a
//! factory registered under its scheme name in one of three families:
//! - entity authentication ([`EntityAuthFactory`])
//! - user authentication ([`UserAuthFactory`])
//! - key exchange ([`KeyExchangeFactory`])
//!
//! The [`SchemeResolver`] picks factories by configured name, orders key
//! exchange factories by configured preference, and checks that a presented
//! user-ID token belongs to the master token it arrived with before any user
//! authentication factory runs.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use msl_schemes::{SchemeContext, SchemeParameters, SchemePreferences, SchemeResolver};
//! use msl_store::SimpleTrustStore;
//!
//! let resolver = SchemeResolver::with_builtin(SchemePreferences {
//!     entity_auth: Some("NONE".into()),
//!     ..SchemePreferences::default()
//! })
//! .unwrap();
//! resolver.validate().unwrap();
//!
//! let ctx = SchemeContext::new("client-1", Arc::new(SimpleTrustStore::new()));
//! let data = resolver.entity_auth_data(&ctx, &SchemeParameters::new()).unwrap();
//! assert_eq!(data.identity, "client-1");
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod names;

mod builtin;
mod data;
mod factory;
mod registry;
mod resolver;
mod user_id_token_auth;

pub use builtin::{PARAM_USER_ID, UnauthenticatedFactory, UserIdTokenAuthFactory};
pub use data::{EntityAuthData, KeyRequestData, KeyResponseData, SchemeParameters, UserAuthData};
pub use factory::{
    EntityAuthFactory, KeyExchangeFactory, SchemeContext, SchemeFactory, UserAuthFactory,
};
pub use registry::{EntityAuthRegistry, KeyExchangeRegistry, SchemeRegistry, UserAuthRegistry};
pub use resolver::{SchemePreferences, SchemeResolver};
pub use user_id_token_auth::UserIdTokenAuthData;
