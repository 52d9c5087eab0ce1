//! Prelude module - commonly used types for convenient import.
//!
//! Use `use msl_crypto::prelude::*;` to import all essential types.

// Errors
pub use crate::{CryptoError, CryptoResult};

// Crypto contexts
pub use crate::{
    CryptoContext, MacCryptoContext, NullCryptoContext, SharedCryptoContext, SigningCryptoContext,
};

// Keys, signatures and hashing
pub use crate::{ContentHash, KeyPair, PublicKey, Signature};
