//! Prelude module - commonly used types for convenient import.
//!
//! Use `use msl_schemes::prelude::*;` to import all essential types.

// Resolution
pub use crate::{SchemeContext, SchemePreferences, SchemeResolver};

// Factory traits
pub use crate::{EntityAuthFactory, KeyExchangeFactory, SchemeFactory, UserAuthFactory};

// Scheme data
pub use crate::{
    EntityAuthData, KeyRequestData, KeyResponseData, SchemeParameters, UserAuthData,
    UserIdTokenAuthData,
};
